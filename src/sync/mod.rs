//! Ledger Synchronization Module
//!
//! This module owns everything the client knows about the remote ledger and coordinates every
//! request made against it. It is composed of several submodules:
//!
//! - `controller`: The `SyncController`, sole caller of the gateway and owner of client state.
//! - `state`: The client state value, derived stats, and the store that gates writes by issue order.
//! - `events`: Event types and handler traits used to observe state changes.
//! - `poller`: The cancellable repeating task behind the background pending-pool refresh.
//! - `types`: Action outcomes and controller errors.

/// Main coordinator for state and actions
pub mod controller;
/// Event system for observing state changes
pub mod events;
/// Background refresh task
mod poller;
/// Client state and its store
mod state;
/// Outcome and error types
mod types;

pub use controller::*;
pub use events::{EventDispatcher, LoggingEventHandler, SyncEvent, SyncEventHandler};
pub use state::{ClientState, DerivedStats};
pub use types::*;
