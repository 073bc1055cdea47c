//! JSON-RPC wallet provider over HTTP.
//!
//! Forwards every request to an EIP-1193-compatible endpoint: a wallet
//! bridge, or a development node such as Anvil or Hardhat with unlocked
//! accounts. Transport failures surface as `ProviderUnavailable`, and a
//! JSON-RPC error with code 4001 as `UserRejected`.

use crate::{WalletError, WalletProvider};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Registry name of this implementation.
pub const NAME: &str = "rpc";

const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

/// HTTP JSON-RPC provider.
pub struct RpcWallet {
	client: reqwest::Client,
	url: String,
	next_id: AtomicU64,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
	#[serde(default)]
	result: Option<Value>,
	#[serde(default)]
	error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
	code: i64,
	message: String,
}

impl RpcWallet {
	pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, WalletError> {
		let client = reqwest::Client::builder()
			.timeout(timeout)
			.build()
			.map_err(|e| WalletError::Implementation(format!("HTTP client: {}", e)))?;
		Ok(Self {
			client,
			url: url.into(),
			next_id: AtomicU64::new(1),
		})
	}
}

/// Extracts the result of a JSON-RPC response body.
fn into_result(response: RpcResponse) -> Result<Value, WalletError> {
	if let Some(error) = response.error {
		return Err(WalletError::from_rpc(error.code, error.message));
	}
	// `null` is a legitimate result (e.g. wallet_addEthereumChain).
	Ok(response.result.unwrap_or(Value::Null))
}

#[async_trait]
impl WalletProvider for RpcWallet {
	async fn request(&self, method: &str, params: Value) -> Result<Value, WalletError> {
		let id = self.next_id.fetch_add(1, Ordering::Relaxed);
		let body = json!({
			"jsonrpc": "2.0",
			"id": id,
			"method": method,
			"params": params,
		});

		let response = self
			.client
			.post(&self.url)
			.json(&body)
			.send()
			.await
			.map_err(|e| {
				if e.is_connect() || e.is_timeout() {
					WalletError::ProviderUnavailable(format!("{}: {}", self.url, e))
				} else {
					WalletError::Implementation(e.to_string())
				}
			})?;

		let status = response.status();
		let parsed: RpcResponse = response.json().await.map_err(|e| {
			WalletError::InvalidResponse(format!("HTTP {} from {}: {}", status, self.url, e))
		})?;

		tracing::trace!(method, id, "JSON-RPC response received");
		into_result(parsed)
	}
}

/// Factory for the `rpc` implementation.
///
/// Configuration parameters:
/// - `url`: JSON-RPC endpoint (required)
/// - `timeout_seconds`: request timeout, defaults to 30
pub fn create_wallet(config: &toml::Value) -> Result<Box<dyn WalletProvider>, WalletError> {
	let url = config
		.get("url")
		.and_then(|v| v.as_str())
		.ok_or_else(|| WalletError::Implementation("rpc wallet requires 'url'".to_string()))?;

	let timeout = config
		.get("timeout_seconds")
		.and_then(|v| v.as_integer())
		.map(|v| v.max(1) as u64)
		.unwrap_or(DEFAULT_TIMEOUT_SECONDS);

	Ok(Box::new(RpcWallet::new(url, Duration::from_secs(timeout))?))
}

#[cfg(test)]
mod tests {
	use super::*;

	fn parse(body: &str) -> Result<Value, WalletError> {
		into_result(serde_json::from_str(body).unwrap())
	}

	#[test]
	fn test_result_extraction() {
		assert_eq!(
			parse(r#"{"jsonrpc":"2.0","id":1,"result":"0x27d8"}"#).unwrap(),
			json!("0x27d8")
		);
		assert_eq!(
			parse(r#"{"jsonrpc":"2.0","id":1,"result":null}"#).unwrap(),
			Value::Null
		);
	}

	#[test]
	fn test_error_extraction() {
		let err = parse(
			r#"{"jsonrpc":"2.0","id":1,"error":{"code":4001,"message":"User rejected the request."}}"#,
		)
		.unwrap_err();
		assert!(matches!(err, WalletError::UserRejected(m) if m.contains("rejected")));

		let err = parse(
			r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32601,"message":"Method not found"}}"#,
		)
		.unwrap_err();
		assert!(matches!(err, WalletError::Rpc { code: -32601, .. }));
	}

	#[test]
	fn test_factory_requires_url() {
		let config: toml::Value = toml::from_str("timeout_seconds = 5").unwrap();
		assert!(matches!(
			create_wallet(&config),
			Err(WalletError::Implementation(_))
		));

		let config: toml::Value = toml::from_str("url = \"http://127.0.0.1:8545\"").unwrap();
		assert!(create_wallet(&config).is_ok());
	}

	#[tokio::test]
	async fn test_unreachable_endpoint_is_unavailable() {
		// Port 1 on loopback refuses connections.
		let wallet = RpcWallet::new("http://127.0.0.1:1", Duration::from_secs(2)).unwrap();
		let err = wallet.request("eth_chainId", json!([])).await.unwrap_err();
		assert!(matches!(err, WalletError::ProviderUnavailable(_)));
	}
}
