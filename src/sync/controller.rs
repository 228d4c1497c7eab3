//! Synchronization controller and the only caller of the gateway.
//!
//! `SyncController` owns the client state, keeps it fresh with a background pending-pool poll,
//! and exposes the four user actions:
//! - `refresh`: fetch ledger and pending pool concurrently, apply each result independently in
//!   a single state write
//! - `add_transaction`: validate and submit an entry, replacing the pool with the server's copy
//! - `mine`: ask the server to seal a block, then refresh before reporting success
//! - `search`: pass a query through and return the server's matches or its error
//!
//! Ledger fetch failures only flip the connectivity flag; pending fetch failures are swallowed
//! and leave the previous pool in place. Mutating actions never return an error, they report an
//! [`ActionOutcome`]. Search and validation errors are returned to the caller.

use crate::config::SyncConfig;
use crate::gateway::{Block, LedgerGateway, SearchMatch, ValidationReport};
use crate::sync::{
	ActionOutcome, SyncError,
	events::{EventDispatcher, SyncEvent},
	poller::Poller,
	state::{BusyFlag, ClientState, DerivedStats, StateStore, Ticket},
};

use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Message returned for an accepted entry.
pub const ACCEPTED_MESSAGE: &str = "accepted";

/// State and collaborators shared between the controller and its poller.
struct ControllerCore<G> {
	gateway: G,
	store: StateStore,
	events: EventDispatcher,
	config: SyncConfig,
}

impl<G: LedgerGateway> ControllerCore<G> {
	/// Fetch ledger and pending pool concurrently, then publish both in one state write.
	async fn refresh(&self) {
		let ledger_ticket = self.store.issue_ledger();
		let pending_ticket = self.store.issue_pending();
		let (chain, pending) =
			futures::future::join(self.gateway.fetch_ledger(), self.gateway.fetch_pending()).await;

		let chain = chain.inspect_err(|e| warn!("Failed to fetch ledger: {}", e)).ok();
		let pending = pending
			.inspect_err(|e| debug!("Ignoring pending pool fetch failure: {}", e))
			.ok();

		let applied = self
			.store
			.apply_refresh(ledger_ticket, chain, pending_ticket, pending);

		match applied.ledger {
			Some(ledger) => {
				if let Some(connected) = ledger.connectivity_changed {
					self.events.dispatch(&SyncEvent::ConnectivityChanged { connected });
				}
				if ledger.replaced {
					self.events.dispatch(&SyncEvent::LedgerReplaced {
						blocks: ledger.blocks,
					});
				}
			}
			None => debug!("Discarded ledger response superseded by a later fetch"),
		}
		if let Some(entries) = applied.pending {
			self.events.dispatch(&SyncEvent::PendingReplaced { entries });
		}
	}

	async fn refresh_pending(&self) {
		let ticket = self.store.issue_pending();
		match self.gateway.fetch_pending().await {
			Ok(pending) => self.replace_pending(ticket, pending),
			// The ledger fetch is the connectivity signal; a stale pool is tolerated.
			Err(e) => debug!("Ignoring pending pool fetch failure: {}", e),
		}
	}

	fn replace_pending(&self, ticket: Ticket, pending: Vec<String>) {
		let entries = pending.len();
		if self.store.apply_pending(ticket, pending) {
			self.events.dispatch(&SyncEvent::PendingReplaced { entries });
		} else {
			debug!("Discarded pending pool response superseded by a later fetch");
		}
	}

	fn action_failed(&self, action: &'static str, message: &str) -> ActionOutcome {
		self.events.dispatch(&SyncEvent::ActionFailed {
			action,
			message: message.to_string(),
		});
		ActionOutcome::failure(message)
	}
}

/// Owner of all client-visible ledger state.
///
/// Consumers read state through [`snapshot`](Self::snapshot), [`stats`](Self::stats) or
/// [`subscribe`](Self::subscribe), and change it only through the action methods.
pub struct SyncController<G: LedgerGateway> {
	core: Arc<ControllerCore<G>>,
	poller: Poller,
}

impl<G: LedgerGateway> SyncController<G> {
	/// Create the controller, load the initial state, and start the background poll.
	///
	/// The initial refresh fetches ledger and pending pool; the poll then refreshes the pending
	/// pool every `config.poll_interval` until [`shutdown`](Self::shutdown) or drop.
	pub async fn start(gateway: G, config: SyncConfig, events: EventDispatcher) -> Self {
		let core = Arc::new(ControllerCore {
			gateway,
			store: StateStore::new(),
			events,
			config,
		});

		core.refresh().await;
		info!(
			"Initial sync complete: {} blocks, {} pending",
			core.store.read(|state| state.chain.len()),
			core.store.read(|state| state.pending.len())
		);

		let poll_core = Arc::clone(&core);
		let poller = Poller::spawn("pending pool", core.config.poll_interval, move || {
			let core = Arc::clone(&poll_core);
			async move { core.refresh_pending().await }
		});

		Self { core, poller }
	}

	/// Stop the background poll and wait for it to exit.
	pub async fn shutdown(mut self) {
		self.poller.stop().await;
		info!("Sync controller stopped");
	}

	/// Fetch ledger and pending pool concurrently and apply each result independently.
	///
	/// Both results are published together, so subscribers never observe a new ledger paired
	/// with the pool from before the refresh.
	pub async fn refresh(&self) {
		self.core.refresh().await;
	}

	/// Submit a new entry to the pending pool.
	///
	/// Whitespace-only input is rejected locally without contacting the service. On success the
	/// pool is replaced with the one the server returned.
	pub async fn add_transaction(&self, data: &str) -> ActionOutcome {
		let _busy = self.core.store.busy(BusyFlag::Submitting);

		let data = data.trim();
		if data.is_empty() {
			let err = SyncError::Validation {
				reason: "entry is empty",
			};
			debug!("Rejected entry before submission: {:?}", err);
			return self.core.action_failed("add transaction", &err.to_string());
		}

		let ticket = self.core.store.issue_pending();
		match self.core.gateway.submit_entry(data).await {
			Ok(pending) => {
				info!("Entry accepted, pending pool has {} entries", pending.len());
				self.core.replace_pending(ticket, pending);
				ActionOutcome::success(ACCEPTED_MESSAGE)
			}
			Err(e) => self.core.action_failed("add transaction", &e.to_string()),
		}
	}

	/// Ask the service to seal the pending pool into a new block.
	///
	/// On success the full state is refreshed before this returns, and the sealing flag is
	/// cleared only after that refresh. On failure the state is left untouched.
	pub async fn mine(&self) -> ActionOutcome {
		let _busy = self.core.store.busy(BusyFlag::Sealing);

		info!("Requesting block seal");
		let block = match self.core.gateway.seal_block().await {
			Ok(block) => block,
			Err(e) => return self.core.action_failed("mine", &e.to_string()),
		};

		self.core.refresh().await;

		self.core.events.dispatch(&SyncEvent::BlockSealed {
			index: block.index,
			hash: block.hash.clone(),
			transactions: block.transaction_count(),
		});
		ActionOutcome::sealed(block)
	}

	/// Search sealed entries on the service.
	///
	/// # Errors
	/// Returns the gateway failure; search has no state to fall back to.
	pub async fn search(&self, query: &str) -> Result<Vec<SearchMatch>, SyncError> {
		debug!("Searching ledger for {:?}", query);
		let results = self.core.gateway.search(query).await.inspect_err(|e| {
			warn!("Search for {:?} failed: {}", query, e);
		})?;
		Ok(results)
	}

	/// Ask the service to verify its chain.
	///
	/// # Errors
	/// Returns the gateway failure unchanged.
	pub async fn validate(&self) -> Result<ValidationReport, SyncError> {
		let report = self.core.gateway.validate_ledger().await.inspect_err(|e| {
			warn!("Chain validation request failed: {}", e);
		})?;
		Ok(report)
	}

	/// Copy of the full client state.
	pub fn snapshot(&self) -> ClientState {
		self.core.store.current()
	}

	/// Summary figures, recomputed from the current state.
	pub fn stats(&self) -> DerivedStats {
		self.core
			.store
			.read(|state| DerivedStats::from_state(state, self.core.config.default_difficulty))
	}

	/// Receiver notified after every state write.
	///
	/// A [`refresh`](Self::refresh) is one write carrying both the ledger and the pending pool.
	/// Busy-flag changes, submissions and background polls are separate writes.
	pub fn subscribe(&self) -> watch::Receiver<ClientState> {
		self.core.store.subscribe()
	}

	pub fn chain(&self) -> Vec<Block> {
		self.core.store.read(|state| state.chain.clone())
	}

	pub fn pending(&self) -> Vec<String> {
		self.core.store.read(|state| state.pending.clone())
	}

	pub fn is_connected(&self) -> bool {
		self.core.store.read(|state| state.connected)
	}

	pub fn is_submitting(&self) -> bool {
		self.core.store.read(|state| state.submitting)
	}

	pub fn is_sealing(&self) -> bool {
		self.core.store.read(|state| state.sealing)
	}

	pub fn config(&self) -> &SyncConfig {
		&self.core.config
	}
}
