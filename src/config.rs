//! Client configuration

use std::time::Duration;

/// Base URL used when none is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";

/// Difficulty reported while the local snapshot is still empty.
pub const DEFAULT_DIFFICULTY: u32 = 3;

/// Configuration for the synchronization controller
#[derive(Debug, Clone)]
pub struct SyncConfig {
	/// Root URL of the ledger service.
	pub base_url: String,
	/// Interval between background pending-pool refreshes. Values under 100 ms are raised to
	/// 100 ms when the poll starts.
	pub poll_interval: Duration,
	/// Difficulty reported by the derived stats when no block is known.
	pub default_difficulty: u32,
}

impl Default for SyncConfig {
	fn default() -> Self {
		Self {
			base_url: DEFAULT_BASE_URL.to_string(),
			poll_interval: Duration::from_secs(5),
			default_difficulty: DEFAULT_DIFFICULTY,
		}
	}
}

impl SyncConfig {
	pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
		self.base_url = base_url.into();
		self
	}

	pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
		self.poll_interval = poll_interval;
		self
	}
}
