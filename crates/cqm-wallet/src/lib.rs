//! Wallet access for the CQM relay toolkit.
//!
//! Everything that talks to a wallet or chain goes through one narrow
//! capability, [`WalletProvider::request`], modelled on the EIP-1193
//! `request({ method, params })` call browsers expose. Concrete providers are
//! adapters around a transport (HTTP JSON-RPC, an in-process key); the
//! [`WalletService`] turns the untyped capability into the typed operations
//! the rest of the toolkit uses, and [`token::TokenClient`] speaks the token
//! contract's ABI over it.

use alloy_primitives::{Address, Bytes, B256};
use async_trait::async_trait;
use cqm_signing::TypedDataDocument;
use cqm_types::{ChainDescriptor, TokenDescriptor};
use serde_json::{json, Value};
use std::sync::Arc;
use thiserror::Error;

pub mod implementations {
	pub mod local;
	pub mod rpc;
}
pub mod token;

/// EIP-1193 error code for a request the user declined.
pub const USER_REJECTED_CODE: i64 = 4001;

/// Errors that can occur while talking to a wallet.
#[derive(Debug, Error)]
pub enum WalletError {
	/// No wallet could be reached.
	#[error("Wallet provider unavailable: {0}")]
	ProviderUnavailable(String),
	/// The user declined the signature or transaction.
	#[error("Request rejected by user: {0}")]
	UserRejected(String),
	/// The wallet answered with a JSON-RPC error.
	#[error("RPC error {code}: {message}")]
	Rpc { code: i64, message: String },
	/// The wallet answered with something that is not the expected shape.
	#[error("Invalid response: {0}")]
	InvalidResponse(String),
	/// The provider does not implement the requested method.
	#[error("Unsupported method: {0}")]
	UnsupportedMethod(String),
	/// Error inside the provider implementation.
	#[error("Implementation error: {0}")]
	Implementation(String),
}

impl WalletError {
	/// Maps a JSON-RPC error object to a wallet error.
	pub fn from_rpc(code: i64, message: impl Into<String>) -> Self {
		let message = message.into();
		if code == USER_REJECTED_CODE {
			WalletError::UserRejected(message)
		} else {
			WalletError::Rpc { code, message }
		}
	}
}

/// The single capability a wallet exposes.
#[async_trait]
pub trait WalletProvider: Send + Sync {
	/// Sends one request and returns its JSON result.
	async fn request(&self, method: &str, params: Value) -> Result<Value, WalletError>;
}

#[async_trait]
impl<T: WalletProvider + ?Sized> WalletProvider for Arc<T> {
	async fn request(&self, method: &str, params: Value) -> Result<Value, WalletError> {
		(**self).request(method, params).await
	}
}

/// Factory signature every provider implementation exposes.
pub type WalletFactory = fn(&toml::Value) -> Result<Box<dyn WalletProvider>, WalletError>;

/// All built-in provider implementations as `(name, factory)` pairs.
pub fn get_all_implementations() -> Vec<(&'static str, WalletFactory)> {
	use implementations::{local, rpc};

	vec![
		(rpc::NAME, rpc::create_wallet as WalletFactory),
		(local::NAME, local::create_wallet as WalletFactory),
	]
}

/// Creates the provider registered under `name`.
pub fn create_wallet(
	name: &str,
	config: &toml::Value,
) -> Result<Box<dyn WalletProvider>, WalletError> {
	let factory = get_all_implementations()
		.into_iter()
		.find(|(n, _)| *n == name)
		.map(|(_, f)| f)
		.ok_or_else(|| {
			WalletError::ProviderUnavailable(format!("Unknown wallet implementation '{}'", name))
		})?;
	factory(config)
}

/// Typed wallet operations on top of a [`WalletProvider`].
pub struct WalletService {
	provider: Box<dyn WalletProvider>,
}

impl WalletService {
	pub fn new(provider: Box<dyn WalletProvider>) -> Self {
		Self { provider }
	}

	/// Raw access to the underlying capability.
	pub async fn request(&self, method: &str, params: Value) -> Result<Value, WalletError> {
		tracing::debug!(method, "Wallet request");
		self.provider.request(method, params).await
	}

	/// Accounts the wallet exposes.
	pub async fn accounts(&self) -> Result<Vec<Address>, WalletError> {
		let result = self.request("eth_accounts", json!([])).await?;
		serde_json::from_value(result)
			.map_err(|e| WalletError::InvalidResponse(format!("eth_accounts: {}", e)))
	}

	/// First exposed account, the one actions run as.
	pub async fn primary_account(&self) -> Result<Address, WalletError> {
		self.accounts().await?.into_iter().next().ok_or_else(|| {
			WalletError::ProviderUnavailable("Wallet exposes no accounts".to_string())
		})
	}

	/// Chain the wallet is currently connected to.
	pub async fn chain_id(&self) -> Result<u64, WalletError> {
		let result = self.request("eth_chainId", json!([])).await?;
		parse_quantity(&result)
	}

	/// Asks the wallet to add `chain` (`wallet_addEthereumChain`).
	pub async fn add_chain(&self, chain: &ChainDescriptor) -> Result<(), WalletError> {
		let params = serde_json::to_value(chain)
			.map_err(|e| WalletError::Implementation(e.to_string()))?;
		self.request("wallet_addEthereumChain", json!([params]))
			.await?;
		tracing::info!(chain_id = chain.chain_id, name = %chain.chain_name, "Chain added to wallet");
		Ok(())
	}

	/// Asks the wallet to track `token` (`wallet_watchAsset`).
	///
	/// Returns whether the user accepted.
	pub async fn watch_asset(&self, token: &TokenDescriptor) -> Result<bool, WalletError> {
		let result = self
			.request("wallet_watchAsset", token.watch_asset_params())
			.await?;
		Ok(result.as_bool().unwrap_or(false))
	}

	/// Asks `signer` to sign `document` (`eth_signTypedData_v4`).
	///
	/// Returns the `0x`-prefixed 65-byte signature.
	pub async fn sign_typed_data(
		&self,
		signer: Address,
		document: &TypedDataDocument,
	) -> Result<String, WalletError> {
		let params = json!([signer.to_checksum(None), document.to_json()]);
		let result = self.request("eth_signTypedData_v4", params).await?;
		result.as_str().map(str::to_string).ok_or_else(|| {
			WalletError::InvalidResponse("eth_signTypedData_v4 did not return a string".into())
		})
	}

	/// Read-only contract call against the latest block.
	pub async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, WalletError> {
		let params = json!([{ "to": to.to_checksum(None), "data": data }, "latest"]);
		let result = self.request("eth_call", params).await?;
		serde_json::from_value(result)
			.map_err(|e| WalletError::InvalidResponse(format!("eth_call: {}", e)))
	}

	/// Submits a transaction from `from` and returns its hash.
	pub async fn send_transaction(
		&self,
		from: Address,
		to: Address,
		data: Bytes,
	) -> Result<B256, WalletError> {
		let params = json!([{
			"from": from.to_checksum(None),
			"to": to.to_checksum(None),
			"data": data,
		}]);
		let result = self.request("eth_sendTransaction", params).await?;
		serde_json::from_value(result)
			.map_err(|e| WalletError::InvalidResponse(format!("eth_sendTransaction: {}", e)))
	}
}

/// Parses a JSON-RPC hex quantity such as `"0x27d8"`.
pub fn parse_quantity(value: &Value) -> Result<u64, WalletError> {
	let raw = value
		.as_str()
		.ok_or_else(|| WalletError::InvalidResponse(format!("Expected hex quantity, got {}", value)))?;
	u64::from_str_radix(cqm_types::without_0x_prefix(raw), 16)
		.map_err(|e| WalletError::InvalidResponse(format!("Invalid quantity '{}': {}", raw, e)))
}
