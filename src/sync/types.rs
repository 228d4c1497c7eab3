use crate::gateway::{Block, GatewayError};

use serde::Serialize;

/// Outcome of a user-triggered mutation (`add_transaction`, `mine`).
///
/// These actions never return an error to the caller; failures are folded into
/// `success: false` with the message the caller should display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionOutcome {
	pub success: bool,
	pub message: String,
	/// The newly sealed block, set only by a successful `mine`.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub block: Option<Block>,
}

impl ActionOutcome {
	pub fn success(message: impl Into<String>) -> Self {
		Self {
			success: true,
			message: message.into(),
			block: None,
		}
	}

	pub fn failure(message: impl Into<String>) -> Self {
		Self {
			success: false,
			message: message.into(),
			block: None,
		}
	}

	pub fn sealed(block: Block) -> Self {
		let message = format!(
			"block #{} sealed with {} transactions",
			block.index,
			block.transaction_count()
		);
		Self {
			success: true,
			message,
			block: Some(block),
		}
	}
}

/// Errors surfaced by the synchronization controller
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
	#[error(transparent)]
	Gateway(#[from] GatewayError),

	#[error("validation error")]
	Validation { reason: &'static str },
}
