//!
//! HTTP client for the remote ledger service.
//!
//! Each method maps to exactly one endpoint of the service and performs a single round trip.
//! Non-success responses are normalized into [`GatewayError::Service`] using the `error` field
//! of the body when the service sends one. No timeout or retry is applied: a call waits until
//! the service answers or the transport fails.

use super::LedgerGateway;
use super::types::*;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

/// Ledger service HTTP client
#[derive(Clone, Debug)]
pub struct LedgerServiceClient {
	/// The underlying HTTP client.
	http_client: Client,
	/// Base URL every path is appended to, without a trailing slash.
	base_url: String,
}

impl LedgerServiceClient {
	/// Create a new service client.
	///
	/// # Arguments
	/// * `base_url` - The root of the service, e.g. `http://localhost:8080`.
	///
	/// # Returns
	/// A new `LedgerServiceClient`, or `GatewayError::InvalidUrl` if `base_url` does not parse.
	pub fn new(base_url: &str) -> Result<Self, GatewayError> {
		Url::parse(base_url).map_err(|e| GatewayError::InvalidUrl(format!("{}: {}", base_url, e)))?;

		let http_client = Client::builder().build()?;

		Ok(Self {
			http_client,
			base_url: base_url.trim_end_matches('/').to_string(),
		})
	}

	/// The base URL requests are sent to.
	pub fn base_url(&self) -> &str {
		&self.base_url
	}

	fn endpoint(&self, path: &str) -> Result<Url, GatewayError> {
		let raw = format!("{}{}", self.base_url, path);
		Url::parse(&raw).map_err(|e| GatewayError::InvalidUrl(format!("{}: {}", raw, e)))
	}

	/// Execute a request against the service.
	///
	/// # Arguments
	/// * `method` - HTTP method.
	/// * `url` - Fully built endpoint URL.
	/// * `body` - Optional JSON document sent as the request body.
	///
	/// # Returns
	/// The decoded success payload, or a `GatewayError` describing why there is none.
	async fn execute<T: DeserializeOwned>(
		&self,
		method: Method,
		url: Url,
		body: Option<serde_json::Value>,
	) -> Result<T, GatewayError> {
		debug!("{} {}", method, url);

		let mut request = self
			.http_client
			.request(method.clone(), url.clone())
			.header(CONTENT_TYPE, "application/json");
		if let Some(body) = body {
			request = request.json(&body);
		}

		let response = request.send().await?;
		let status = response.status();
		let text = response.text().await?;

		if !status.is_success() {
			let err = GatewayError::from_response(status.as_u16(), &text);
			warn!("{} {} failed with status {}: {}", method, url, status, err);
			return Err(err);
		}

		Ok(serde_json::from_str(&text)?)
	}
}

#[async_trait::async_trait]
impl LedgerGateway for LedgerServiceClient {
	async fn fetch_ledger(&self) -> Result<Vec<Block>, GatewayError> {
		let payload: ChainPayload = self
			.execute(Method::GET, self.endpoint("/chain")?, None)
			.await?;
		Ok(payload.chain)
	}

	async fn fetch_pending(&self) -> Result<Vec<String>, GatewayError> {
		let payload: PendingPayload = self
			.execute(Method::GET, self.endpoint("/pending")?, None)
			.await?;
		Ok(payload.pending)
	}

	async fn submit_entry(&self, data: &str) -> Result<Vec<String>, GatewayError> {
		let body = serde_json::to_value(SubmitEntryRequest { data })?;
		let payload: PendingPayload = self
			.execute(Method::POST, self.endpoint("/add-transaction")?, Some(body))
			.await?;
		Ok(payload.pending)
	}

	async fn seal_block(&self) -> Result<Block, GatewayError> {
		self.execute(Method::POST, self.endpoint("/mine")?, None)
			.await
	}

	async fn search(&self, query: &str) -> Result<Vec<SearchMatch>, GatewayError> {
		let mut url = self.endpoint("/search")?;
		url.query_pairs_mut().append_pair("q", query);

		let payload: SearchPayload = self.execute(Method::GET, url, None).await?;
		Ok(payload.results)
	}

	async fn validate_ledger(&self) -> Result<ValidationReport, GatewayError> {
		self.execute(Method::GET, self.endpoint("/validate")?, None)
			.await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;
	use wiremock::matchers::{body_json, header, method, path, query_param};
	use wiremock::{Mock, MockServer, ResponseTemplate};

	fn block_json(index: u64, transactions: &[&str]) -> serde_json::Value {
		json!({
			"index": index,
			"timestamp": "2025-03-01T12:00:00Z",
			"transactions": transactions,
			"merkleRoot": "ab12",
			"prevHash": GENESIS_PREV_HASH,
			"hash": format!("000{}", index),
			"nonce": 17,
			"difficulty": 3
		})
	}

	#[test]
	fn test_rejects_invalid_base_url() {
		let err = LedgerServiceClient::new("not a url").unwrap_err();
		assert!(matches!(err, GatewayError::InvalidUrl(_)));
	}

	#[test]
	fn test_trailing_slash_is_trimmed() {
		let client = LedgerServiceClient::new("http://localhost:8080/").unwrap();
		assert_eq!(client.base_url(), "http://localhost:8080");
	}

	#[tokio::test]
	async fn test_fetch_ledger() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.and(path("/chain"))
			.and(header("content-type", "application/json"))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({
				"chain": [block_json(0, &["l22-6559"]), block_json(1, &["A sends 1"])],
				"length": 2
			})))
			.expect(1)
			.mount(&server)
			.await;

		let client = LedgerServiceClient::new(&server.uri()).unwrap();
		let chain = client.fetch_ledger().await.unwrap();

		assert_eq!(chain.len(), 2);
		assert_eq!(chain[1].index, 1);
		assert_eq!(chain[1].transactions, vec!["A sends 1".to_string()]);
	}

	#[tokio::test]
	async fn test_submit_entry_sends_data_document() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.and(path("/add-transaction"))
			.and(body_json(json!({ "data": "Alice sends 5" })))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({
				"message": "Transaction added to pending pool",
				"pending": ["Alice sends 5"]
			})))
			.expect(1)
			.mount(&server)
			.await;

		let client = LedgerServiceClient::new(&server.uri()).unwrap();
		let pending = client.submit_entry("Alice sends 5").await.unwrap();

		assert_eq!(pending, vec!["Alice sends 5".to_string()]);
	}

	#[tokio::test]
	async fn test_seal_block_surfaces_server_message() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.and(path("/mine"))
			.respond_with(
				ResponseTemplate::new(400)
					.set_body_json(json!({ "error": "no pending transactions to mine" })),
			)
			.mount(&server)
			.await;

		let client = LedgerServiceClient::new(&server.uri()).unwrap();
		let err = client.seal_block().await.unwrap_err();

		match err {
			GatewayError::Service { status, message } => {
				assert_eq!(status, 400);
				assert_eq!(message, "no pending transactions to mine");
			}
			other => panic!("unexpected error: {other:?}"),
		}
	}

	#[tokio::test]
	async fn test_status_fallback_without_body() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.and(path("/pending"))
			.respond_with(ResponseTemplate::new(503))
			.mount(&server)
			.await;

		let client = LedgerServiceClient::new(&server.uri()).unwrap();
		let err = client.fetch_pending().await.unwrap_err();

		assert_eq!(err.to_string(), "server error 503");
	}

	#[tokio::test]
	async fn test_search_encodes_query_and_keeps_results() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.and(path("/search"))
			.and(query_param("q", "alice & bob"))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({
				"query": "alice & bob",
				"results": [{ "blockIndex": 2, "transaction": "Alice & Bob split 5" }]
			})))
			.expect(1)
			.mount(&server)
			.await;

		let client = LedgerServiceClient::new(&server.uri()).unwrap();
		let results = client.search("alice & bob").await.unwrap();

		assert_eq!(
			results,
			vec![SearchMatch {
				block_index: 2,
				transaction: "Alice & Bob split 5".to_string(),
			}]
		);
	}

	#[tokio::test]
	async fn test_search_without_hits_returns_empty_list() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.and(path("/search"))
			.and(query_param("q", "zzz"))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({
				"query": "zzz",
				"results": null
			})))
			.expect(1)
			.mount(&server)
			.await;

		let client = LedgerServiceClient::new(&server.uri()).unwrap();
		let results = client.search("zzz").await.unwrap();

		assert!(results.is_empty());
	}

	#[tokio::test]
	async fn test_null_pending_pool_is_empty() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.and(path("/pending"))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({ "pending": null })))
			.mount(&server)
			.await;

		let client = LedgerServiceClient::new(&server.uri()).unwrap();
		assert!(client.fetch_pending().await.unwrap().is_empty());
	}

	#[tokio::test]
	async fn test_validate_ledger() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.and(path("/validate"))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({
				"valid": true,
				"message": "Chain integrity verified"
			})))
			.mount(&server)
			.await;

		let client = LedgerServiceClient::new(&server.uri()).unwrap();
		let report = client.validate_ledger().await.unwrap();

		assert!(report.valid);
		assert_eq!(report.message.as_deref(), Some("Chain integrity verified"));
	}

	#[tokio::test]
	async fn test_malformed_success_body_is_an_error() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.and(path("/chain"))
			.respond_with(ResponseTemplate::new(200).set_body_string("not json"))
			.mount(&server)
			.await;

		let client = LedgerServiceClient::new(&server.uri()).unwrap();
		let err = client.fetch_ledger().await.unwrap_err();

		assert!(matches!(err, GatewayError::Decode(_)));
	}

	#[tokio::test]
	async fn test_unreachable_service_is_an_error() {
		// Nothing listens on the discard port.
		let client = LedgerServiceClient::new("http://127.0.0.1:9").unwrap();
		assert!(client.fetch_ledger().await.is_err());
	}
}
