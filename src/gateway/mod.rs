//! Remote service gateway for the ledger service
//!
//! This module turns each remote capability of the ledger service (chain, pending pool,
//! entry submission, sealing, search and validation) into a single async call. Every call
//! is one HTTP round trip and resolves to either a typed payload or a [`GatewayError`].
//! The synchronization controller is the only component that talks to the gateway.

/// HTTP client for the ledger service
mod client;
/// Type definitions for service payloads and errors
mod types;

pub use client::LedgerServiceClient;
pub use types::*;

/// One operation per remote capability of the ledger service.
///
/// The controller depends on this trait rather than on the HTTP client so it can be
/// driven by an in-memory implementation.
#[async_trait::async_trait]
pub trait LedgerGateway: Send + Sync + 'static {
	/// Fetch the full chain, genesis first.
	async fn fetch_ledger(&self) -> Result<Vec<Block>, GatewayError>;

	/// Fetch the entries waiting for the next block.
	async fn fetch_pending(&self) -> Result<Vec<String>, GatewayError>;

	/// Submit an entry and return the pending pool as the server now sees it.
	async fn submit_entry(&self, data: &str) -> Result<Vec<String>, GatewayError>;

	/// Ask the server to seal the pending pool into a new block.
	async fn seal_block(&self) -> Result<Block, GatewayError>;

	/// Search sealed entries. Matching rules belong to the server.
	async fn search(&self, query: &str) -> Result<Vec<SearchMatch>, GatewayError>;

	/// Ask the server to verify the integrity of its chain.
	async fn validate_ledger(&self) -> Result<ValidationReport, GatewayError>;
}
