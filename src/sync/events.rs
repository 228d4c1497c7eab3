//! Event system for ledger synchronization.
//!
//! The controller emits a [`SyncEvent`] after every state write that a consumer may want to react
//! to beyond re-reading the state: a replaced snapshot, a replaced pending pool, a connectivity
//! flip, a sealed block, or a failed action. Events are delivered to every registered
//! [`SyncEventHandler`] in registration order, after the write they describe is visible.

use crate::sync::SyncError;

use tracing::{debug, info, warn};

/// Events that occur during synchronization
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
	/// The ledger snapshot was replaced
	LedgerReplaced { blocks: usize },
	/// The pending pool was replaced
	PendingReplaced { entries: usize },
	/// The connectivity flag changed value
	ConnectivityChanged { connected: bool },
	/// The server sealed a new block and the state reflects it
	BlockSealed {
		index: u64,
		hash: String,
		transactions: usize,
	},
	/// A user-triggered action failed
	ActionFailed {
		action: &'static str,
		message: String,
	},
}

/// Trait for handling sync events.
///
/// Handlers run synchronously on the task that produced the event and must not block.
pub trait SyncEventHandler: Send + Sync {
	/// Handle a sync event.
	fn handle(&self, event: &SyncEvent) -> Result<(), SyncError>;

	/// Get the name of this handler for logging and diagnostics.
	fn name(&self) -> &'static str;
}

/// Event dispatcher that manages multiple event handlers.
#[derive(Default)]
pub struct EventDispatcher {
	handlers: Vec<Box<dyn SyncEventHandler>>,
}

impl EventDispatcher {
	/// Create a new, empty event dispatcher.
	pub fn new() -> Self {
		Self::default()
	}

	/// Register a new event handler.
	///
	/// Handlers are called in the order they are registered.
	pub fn register_handler(&mut self, handler: Box<dyn SyncEventHandler>) {
		self.handlers.push(handler);
	}

	pub fn with_handler(mut self, handler: Box<dyn SyncEventHandler>) -> Self {
		self.register_handler(handler);
		self
	}

	/// Dispatch an event to all registered handlers.
	///
	/// Errors from handlers are logged, but do not stop other handlers from running.
	pub fn dispatch(&self, event: &SyncEvent) {
		for handler in &self.handlers {
			if let Err(e) = handler.handle(event) {
				tracing::error!("Handler {} failed to process event: {}", handler.name(), e);
			}
		}
	}
}

/// Writes every event to the tracing subscriber.
pub struct LoggingEventHandler;

impl SyncEventHandler for LoggingEventHandler {
	fn handle(&self, event: &SyncEvent) -> Result<(), SyncError> {
		match event {
			SyncEvent::LedgerReplaced { blocks } => debug!("Ledger snapshot now has {} blocks", blocks),
			SyncEvent::PendingReplaced { entries } => {
				debug!("Pending pool now has {} entries", entries)
			}
			SyncEvent::ConnectivityChanged { connected: true } => info!("Ledger service reachable"),
			SyncEvent::ConnectivityChanged { connected: false } => {
				warn!("Ledger service unreachable, showing last known snapshot")
			}
			SyncEvent::BlockSealed {
				index,
				hash,
				transactions,
			} => info!(
				"Block #{} sealed ({} transactions, hash {})",
				index, transactions, hash
			),
			SyncEvent::ActionFailed { action, message } => warn!("{} failed: {}", action, message),
		}
		Ok(())
	}

	fn name(&self) -> &'static str {
		"logging"
	}
}
