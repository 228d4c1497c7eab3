//! Client-side synchronization for a remote append-only ledger service.
//!
//! The [`gateway`] module talks HTTP to the service; the [`sync`] module owns the client-visible
//! state and is the only caller of the gateway. Front ends read state and invoke actions through
//! [`sync::SyncController`] and nothing else.

pub mod config;
pub mod gateway;
pub mod sync;
pub mod utils;

pub use config::SyncConfig;
pub use gateway::{Block, GatewayError, LedgerGateway, LedgerServiceClient, SearchMatch};
pub use sync::{ActionOutcome, ClientState, DerivedStats, SyncController, SyncError};
