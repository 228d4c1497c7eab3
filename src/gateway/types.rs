//! Types exchanged with the remote ledger service

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Previous-hash value carried by the genesis block.
pub const GENESIS_PREV_HASH: &str =
    "0000000000000000000000000000000000000000000000000000000000000000";

/// A sealed block as returned by the service.
///
/// Every field is assigned by the server. The client never recomputes the hash
/// or checks the proof of work; it only displays what it was given.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    /// Position in the chain, 0 for genesis.
    pub index: u64,
    /// Instant the server created the block.
    pub timestamp: DateTime<Utc>,
    /// Entries sealed into this block, in submission order.
    #[serde(default)]
    pub transactions: Vec<String>,
    /// Nonce that satisfied the difficulty target.
    pub nonce: u64,
    /// Number of leading zero hex digits required of the hash.
    pub difficulty: u32,
    /// Merkle root over `transactions`, when the server provides one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merkle_root: Option<String>,
    /// Hash of the previous block, or [`GENESIS_PREV_HASH`].
    pub prev_hash: String,
    /// Hash of this block.
    pub hash: String,
}

impl Block {
    /// Whether this block is the chain's first block.
    pub fn is_genesis(&self) -> bool {
        self.index == 0 && self.prev_hash == GENESIS_PREV_HASH
    }

    /// Number of entries sealed into this block.
    pub fn transaction_count(&self) -> usize {
        self.transactions.len()
    }
}

/// A single search hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchMatch {
    /// Index of the block holding the matching entry.
    pub block_index: u64,
    /// The matching entry, verbatim.
    pub transaction: String,
}

/// Result of asking the service to verify its chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid: bool,
    #[serde(default)]
    pub message: Option<String>,
}

/// Decode a list field that the service may send as `null` when it is empty.
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Payload of `GET /chain`.
#[derive(Debug, Deserialize)]
pub(crate) struct ChainPayload {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub chain: Vec<Block>,
}

/// Payload of `GET /pending` and `POST /add-transaction`.
#[derive(Debug, Deserialize)]
pub(crate) struct PendingPayload {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub pending: Vec<String>,
}

/// Payload of `GET /search`.
#[derive(Debug, Deserialize)]
pub(crate) struct SearchPayload {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub results: Vec<SearchMatch>,
}

/// Body of `POST /add-transaction`.
#[derive(Debug, Serialize)]
pub(crate) struct SubmitEntryRequest<'a> {
    pub data: &'a str,
}

/// Error body the service sends alongside a non-success status.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorPayload {
    pub error: Option<String>,
}

/// Errors raised by the gateway.
///
/// Transport, status and decode failures are all terminal for the call that
/// produced them; callers treat them as one kind and only use the message.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("{message}")]
    Service { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid service URL: {0}")]
    InvalidUrl(String),
}

impl GatewayError {
    /// Build a service error from a status and the raw response body.
    ///
    /// Uses the body's `error` field when present, otherwise a generic
    /// message derived from the status.
    pub(crate) fn from_response(status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<ErrorPayload>(body)
            .ok()
            .and_then(|payload| payload.error)
            .filter(|message| !message.is_empty())
            .unwrap_or_else(|| format!("server error {}", status));

        GatewayError::Service { status, message }
    }
}
