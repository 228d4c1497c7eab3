//! Client-visible ledger state and the store that owns it.
//!
//! `ClientState` is the single value consumers read: the ledger snapshot, the pending pool,
//! connectivity and the two busy flags. It lives inside a `tokio::sync::watch` channel so every
//! mutation both updates the value and wakes subscribers. Each mutation is a short synchronous
//! closure; nothing holds the state across an await point.
//!
//! Ledger and pending-pool writes are gated by issue order. A fetch takes a [`Ticket`] before it
//! goes out, and its response is applied only if no later-issued fetch of the same entity has
//! already been applied. A slow response can therefore never overwrite a fresher one.

use crate::gateway::Block;

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::watch;

/// Everything a consumer may display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientState {
	/// Ledger snapshot, genesis first.
	pub chain: Vec<Block>,
	/// Entries waiting for the next sealed block.
	pub pending: Vec<String>,
	/// False only while the most recent ledger fetch has failed.
	pub connected: bool,
	/// An entry submission is in flight.
	pub submitting: bool,
	/// A block sealing request is in flight.
	pub sealing: bool,
}

impl Default for ClientState {
	fn default() -> Self {
		Self {
			chain: Vec::new(),
			pending: Vec::new(),
			connected: true,
			submitting: false,
			sealing: false,
		}
	}
}

/// Summary figures derived from a [`ClientState`]. Recomputed on every read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DerivedStats {
	pub blocks: usize,
	pub transactions: usize,
	pub difficulty: u32,
	pub pending: usize,
}

impl DerivedStats {
	pub fn from_state(state: &ClientState, default_difficulty: u32) -> Self {
		Self {
			blocks: state.chain.len(),
			transactions: state.chain.iter().map(Block::transaction_count).sum(),
			difficulty: state
				.chain
				.last()
				.map(|block| block.difficulty)
				.unwrap_or(default_difficulty),
			pending: state.pending.len(),
		}
	}
}

/// Issue-order position of a fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct Ticket(u64);

#[derive(Debug, Default)]
struct Sequencer {
	issued: AtomicU64,
	applied: AtomicU64,
}

impl Sequencer {
	fn issue(&self) -> Ticket {
		Ticket(self.issued.fetch_add(1, Ordering::SeqCst) + 1)
	}

	/// Marks `ticket` as applied unless a later one already was.
	///
	/// Only called from inside a watch mutation closure, which serializes callers.
	fn claim(&self, ticket: Ticket) -> bool {
		if ticket.0 <= self.applied.load(Ordering::SeqCst) {
			return false;
		}
		self.applied.store(ticket.0, Ordering::SeqCst);
		true
	}
}

/// Which of the two independent busy flags a guard controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BusyFlag {
	Submitting,
	Sealing,
}

/// Result of applying a ledger fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct LedgerApplied {
	/// The snapshot was replaced, as opposed to kept after a failure.
	pub replaced: bool,
	pub blocks: usize,
	/// New connectivity value, when this write changed it.
	pub connectivity_changed: Option<bool>,
}

/// Result of applying a combined ledger and pending-pool refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RefreshApplied {
	/// `None` when the ledger result was stale.
	pub ledger: Option<LedgerApplied>,
	/// Size of the new pool, when it was replaced.
	pub pending: Option<usize>,
}

/// Owner of the client state.
#[derive(Debug)]
pub(crate) struct StateStore {
	state: watch::Sender<ClientState>,
	ledger_seq: Sequencer,
	pending_seq: Sequencer,
}

impl StateStore {
	pub fn new() -> Self {
		let (state, _) = watch::channel(ClientState::default());
		Self {
			state,
			ledger_seq: Sequencer::default(),
			pending_seq: Sequencer::default(),
		}
	}

	pub fn current(&self) -> ClientState {
		self.state.borrow().clone()
	}

	pub fn read<R>(&self, f: impl FnOnce(&ClientState) -> R) -> R {
		f(&self.state.borrow())
	}

	pub fn subscribe(&self) -> watch::Receiver<ClientState> {
		self.state.subscribe()
	}

	pub fn issue_ledger(&self) -> Ticket {
		self.ledger_seq.issue()
	}

	pub fn issue_pending(&self) -> Ticket {
		self.pending_seq.issue()
	}

	/// Apply both halves of a full refresh in a single state write. `None` means that fetch
	/// failed.
	///
	/// Each half is gated by its own ticket and applied independently of the other. A ledger
	/// success replaces the snapshot and marks the client connected; a ledger failure marks it
	/// disconnected and keeps the previous snapshot. A failed pending fetch leaves the pool
	/// untouched and does not affect connectivity. Subscribers are woken once and never see
	/// only one half applied.
	pub fn apply_refresh(
		&self,
		ledger_ticket: Ticket,
		chain: Option<Vec<Block>>,
		pending_ticket: Ticket,
		pending: Option<Vec<String>>,
	) -> RefreshApplied {
		let mut applied = RefreshApplied {
			ledger: None,
			pending: None,
		};
		self.state.send_if_modified(|state| {
			applied.ledger = self.write_ledger(state, ledger_ticket, chain);
			if let Some(pending) = pending {
				if self.pending_seq.claim(pending_ticket) {
					applied.pending = Some(pending.len());
					state.pending = pending;
				}
			}
			applied.ledger.is_some() || applied.pending.is_some()
		});
		applied
	}

	/// Ledger half of a write. Must run inside a watch mutation closure.
	fn write_ledger(
		&self,
		state: &mut ClientState,
		ticket: Ticket,
		chain: Option<Vec<Block>>,
	) -> Option<LedgerApplied> {
		if !self.ledger_seq.claim(ticket) {
			return None;
		}
		let was_connected = state.connected;
		let replaced = chain.is_some();
		state.connected = replaced;
		if let Some(chain) = chain {
			state.chain = chain;
		}
		Some(LedgerApplied {
			replaced,
			blocks: state.chain.len(),
			connectivity_changed: (was_connected != state.connected).then_some(state.connected),
		})
	}

	/// Replace the pending pool. Returns false if the write was stale.
	pub fn apply_pending(&self, ticket: Ticket, pending: Vec<String>) -> bool {
		self.state.send_if_modified(|state| {
			if !self.pending_seq.claim(ticket) {
				return false;
			}
			state.pending = pending;
			true
		})
	}

	pub fn set_busy(&self, flag: BusyFlag, busy: bool) {
		self.state.send_modify(|state| match flag {
			BusyFlag::Submitting => state.submitting = busy,
			BusyFlag::Sealing => state.sealing = busy,
		});
	}

	/// Raise `flag` until the returned guard is dropped.
	pub fn busy(&self, flag: BusyFlag) -> BusyGuard<'_> {
		self.set_busy(flag, true);
		BusyGuard { store: self, flag }
	}
}

/// Clears its busy flag when dropped, on every exit path of an action.
pub(crate) struct BusyGuard<'a> {
	store: &'a StateStore,
	flag: BusyFlag,
}

impl Drop for BusyGuard<'_> {
	fn drop(&mut self) {
		self.store.set_busy(self.flag, false);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::Utc;

	fn block(index: u64, transactions: &[&str], difficulty: u32) -> Block {
		Block {
			index,
			timestamp: Utc::now(),
			transactions: transactions.iter().map(|t| t.to_string()).collect(),
			nonce: 0,
			difficulty,
			merkle_root: None,
			prev_hash: crate::gateway::GENESIS_PREV_HASH.to_string(),
			hash: format!("000{}", index),
		}
	}

	#[test]
	fn test_stats_for_empty_state() {
		let stats = DerivedStats::from_state(&ClientState::default(), 3);
		assert_eq!(
			stats,
			DerivedStats {
				blocks: 0,
				transactions: 0,
				difficulty: 3,
				pending: 0,
			}
		);
	}

	#[test]
	fn test_stats_sum_transactions_and_use_newest_difficulty() {
		let state = ClientState {
			chain: vec![
				block(0, &["genesis"], 3),
				block(1, &["a", "b"], 3),
				block(2, &["c", "d", "e"], 4),
			],
			pending: vec!["f".to_string()],
			..ClientState::default()
		};

		let stats = DerivedStats::from_state(&state, 3);
		assert_eq!(stats.blocks, 3);
		assert_eq!(stats.transactions, 6);
		assert_eq!(stats.difficulty, 4);
		assert_eq!(stats.pending, 1);
	}

	fn apply_ledger(
		store: &StateStore,
		ticket: Ticket,
		chain: Option<Vec<Block>>,
	) -> Option<LedgerApplied> {
		let pending = store.issue_pending();
		store.apply_refresh(ticket, chain, pending, None).ledger
	}

	#[test]
	fn test_ledger_failure_keeps_snapshot() {
		let store = StateStore::new();
		let first = store.issue_ledger();
		apply_ledger(&store, first, Some(vec![block(0, &["g"], 3)]));

		let second = store.issue_ledger();
		let applied = apply_ledger(&store, second, None).unwrap();

		let state = store.current();
		assert!(!state.connected);
		assert_eq!(state.chain.len(), 1);
		assert_eq!(applied.connectivity_changed, Some(false));
	}

	#[test]
	fn test_earlier_issued_pending_write_is_dropped() {
		let store = StateStore::new();
		let older = store.issue_pending();
		let newer = store.issue_pending();

		assert!(store.apply_pending(newer, vec!["fresh".to_string()]));
		assert!(!store.apply_pending(older, vec!["stale".to_string()]));

		assert_eq!(store.current().pending, vec!["fresh".to_string()]);
	}

	#[test]
	fn test_stale_ledger_failure_does_not_flip_connectivity() {
		let store = StateStore::new();
		let older = store.issue_ledger();
		let newer = store.issue_ledger();

		assert!(apply_ledger(&store, newer, Some(vec![])).is_some());
		assert!(apply_ledger(&store, older, None).is_none());
		assert!(store.current().connected);
	}

	#[test]
	fn test_busy_guard_clears_flag() {
		let store = StateStore::new();
		{
			let _guard = store.busy(BusyFlag::Sealing);
			assert!(store.current().sealing);
			assert!(!store.current().submitting);
		}
		assert!(!store.current().sealing);
	}

	#[test]
	fn test_subscribers_see_writes() {
		let store = StateStore::new();
		let mut rx = store.subscribe();
		assert!(!rx.has_changed().unwrap());

		let ticket = store.issue_pending();
		store.apply_pending(ticket, vec!["x".to_string()]);

		assert!(rx.has_changed().unwrap());
		assert_eq!(rx.borrow_and_update().pending.len(), 1);
	}

	#[test]
	fn test_refresh_publishes_both_halves_in_one_write() {
		let store = StateStore::new();
		let mut rx = store.subscribe();

		let ledger = store.issue_ledger();
		let pending = store.issue_pending();
		let applied = store.apply_refresh(
			ledger,
			Some(vec![block(0, &["g"], 3)]),
			pending,
			Some(vec!["a".to_string()]),
		);

		assert_eq!(applied.pending, Some(1));
		assert_eq!(applied.ledger.map(|l| l.blocks), Some(1));

		// A single notification carries both the ledger and the pool.
		assert!(rx.has_changed().unwrap());
		let seen = rx.borrow_and_update().clone();
		assert_eq!(seen.chain.len(), 1);
		assert_eq!(seen.pending, vec!["a".to_string()]);
		assert!(!rx.has_changed().unwrap());
	}

	#[test]
	fn test_refresh_halves_are_gated_independently() {
		let store = StateStore::new();
		let ledger = store.issue_ledger();
		let stale_pending = store.issue_pending();
		let submitted = store.issue_pending();
		assert!(store.apply_pending(submitted, vec!["submitted".to_string()]));

		let applied = store.apply_refresh(
			ledger,
			Some(vec![block(0, &["g"], 3)]),
			stale_pending,
			Some(vec![]),
		);

		assert!(applied.ledger.is_some());
		assert_eq!(applied.pending, None);
		let state = store.current();
		assert_eq!(state.chain.len(), 1);
		assert_eq!(state.pending, vec!["submitted".to_string()]);
	}

	#[test]
	fn test_refresh_with_failed_pending_keeps_pool() {
		let store = StateStore::new();
		let seed = store.issue_pending();
		store.apply_pending(seed, vec!["kept".to_string()]);

		let ledger = store.issue_ledger();
		let pending = store.issue_pending();
		let applied = store.apply_refresh(ledger, None, pending, None);

		assert_eq!(
			applied.ledger.and_then(|l| l.connectivity_changed),
			Some(false)
		);
		assert_eq!(applied.pending, None);
		let state = store.current();
		assert!(!state.connected);
		assert_eq!(state.pending, vec!["kept".to_string()]);
	}
}
