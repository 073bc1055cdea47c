//! In-process wallet backed by a local private key.
//!
//! Answers the account, chain and typed-data signing methods itself, so a
//! transfer can be signed on a headless machine. Chain and asset onboarding
//! requests are accepted and remembered. Transactions are signed here as
//! EIP-155 legacy transactions and submitted raw through the upstream
//! endpoint, which also serves contract calls and every other method.

use super::rpc::RpcWallet;
use crate::{WalletError, WalletProvider};
use alloy_consensus::{SignableTransaction, TxEnvelope, TxLegacy};
use alloy_dyn_abi::TypedData;
use alloy_eips::eip2718::Encodable2718;
use alloy_primitives::{Address, Bytes, TxKind, U128, U256, U64};
use alloy_signer::SignerSync;
use alloy_signer_local::PrivateKeySigner;
use async_trait::async_trait;
use cqm_types::{ChainDescriptor, SecretString, TokenDescriptor};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::sync::RwLock;

/// Registry name of this implementation.
pub const NAME: &str = "local";

/// EIP-1193 error code for a request naming an account this wallet does not hold.
const UNAUTHORIZED_CODE: i64 = 4100;

/// Onboarding requests the local wallet has accepted.
#[derive(Debug, Default, Clone)]
pub struct Onboarding {
	pub chains: Vec<ChainDescriptor>,
	pub assets: Vec<TokenDescriptor>,
}

/// `eth_sendTransaction` parameter object. Omitted quantities are filled in
/// from the upstream node.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransactionRequest {
	from: Address,
	to: Address,
	#[serde(default, alias = "input")]
	data: Bytes,
	value: Option<U256>,
	nonce: Option<U64>,
	gas: Option<U64>,
	gas_price: Option<U128>,
}

pub struct LocalWallet {
	signer: PrivateKeySigner,
	chain_id: u64,
	upstream: Option<Box<dyn WalletProvider>>,
	onboarding: RwLock<Onboarding>,
}

impl LocalWallet {
	pub fn new(private_key: &SecretString, chain_id: u64) -> Result<Self, WalletError> {
		let signer = private_key
			.with_exposed(|key| key.parse::<PrivateKeySigner>())
			.map_err(|e| WalletError::Implementation(format!("Invalid private key: {}", e)))?;
		let signer = alloy_signer::Signer::with_chain_id(signer, Some(chain_id));
		Ok(Self {
			signer,
			chain_id,
			upstream: None,
			onboarding: RwLock::new(Onboarding::default()),
		})
	}

	/// Submits transactions through `upstream` and forwards every method this
	/// wallet does not answer itself.
	pub fn with_upstream(mut self, upstream: impl WalletProvider + 'static) -> Self {
		self.upstream = Some(Box::new(upstream));
		self
	}

	pub fn address(&self) -> Address {
		self.signer.address()
	}

	/// Snapshot of accepted `wallet_addEthereumChain` / `wallet_watchAsset` requests.
	pub async fn onboarding(&self) -> Onboarding {
		self.onboarding.read().await.clone()
	}

	fn ensure_managed(&self, account: Address) -> Result<(), WalletError> {
		if account != self.address() {
			return Err(WalletError::from_rpc(
				UNAUTHORIZED_CODE,
				format!("Account {} is not managed by this wallet", account),
			));
		}
		Ok(())
	}

	fn upstream(&self) -> Result<&dyn WalletProvider, WalletError> {
		self.upstream.as_deref().ok_or_else(|| {
			WalletError::ProviderUnavailable(
				"local wallet has no rpc_url to reach the chain".to_string(),
			)
		})
	}

	fn sign_typed_data(&self, params: &Value) -> Result<Value, WalletError> {
		let requested: Address = params
			.get(0)
			.cloned()
			.ok_or_else(|| WalletError::InvalidResponse("Missing signer address".into()))
			.and_then(|v| {
				serde_json::from_value(v)
					.map_err(|e| WalletError::InvalidResponse(format!("Invalid signer: {}", e)))
			})?;
		self.ensure_managed(requested)?;

		// Browsers pass the document as a JSON string; accept an object too.
		let typed_data: TypedData = match params.get(1) {
			Some(Value::String(raw)) => serde_json::from_str(raw),
			Some(other) => serde_json::from_value(other.clone()),
			None => return Err(WalletError::InvalidResponse("Missing typed data".into())),
		}
		.map_err(|e| WalletError::InvalidResponse(format!("Invalid typed data: {}", e)))?;

		let hash = typed_data
			.eip712_signing_hash()
			.map_err(|e| WalletError::InvalidResponse(format!("Cannot hash typed data: {}", e)))?;
		let signature = self
			.signer
			.sign_hash_sync(&hash)
			.map_err(|e| WalletError::Implementation(format!("Signing failed: {}", e)))?;

		tracing::debug!(signer = %self.address(), digest = %hash, "Signed typed data");
		Ok(Value::String(format!(
			"0x{}",
			hex::encode(signature.as_bytes())
		)))
	}

	/// Fills, signs and submits an `eth_sendTransaction` request.
	async fn send_transaction(&self, params: Value) -> Result<Value, WalletError> {
		let request: TransactionRequest = params
			.get(0)
			.cloned()
			.map(serde_json::from_value)
			.transpose()
			.map_err(|e| WalletError::InvalidResponse(format!("Invalid transaction: {}", e)))?
			.ok_or_else(|| WalletError::InvalidResponse("Missing transaction".into()))?;
		self.ensure_managed(request.from)?;
		let upstream = self.upstream()?;

		let value = request.value.unwrap_or_default();
		let nonce = match request.nonce {
			Some(nonce) => nonce,
			None => {
				let params = json!([request.from.to_checksum(None), "pending"]);
				quantity(upstream, "eth_getTransactionCount", params).await?
			},
		};
		let gas_price = match request.gas_price {
			Some(price) => price,
			None => quantity(upstream, "eth_gasPrice", json!([])).await?,
		};
		let gas = match request.gas {
			Some(gas) => gas,
			None => {
				let params = json!([{
					"from": request.from.to_checksum(None),
					"to": request.to.to_checksum(None),
					"data": request.data,
					"value": value,
				}]);
				quantity(upstream, "eth_estimateGas", params).await?
			},
		};

		let mut tx = TxLegacy {
			chain_id: Some(self.chain_id),
			nonce: nonce.to(),
			gas_price: gas_price.to(),
			gas_limit: gas.to(),
			to: TxKind::Call(request.to),
			value,
			input: request.data,
		};
		let signature = alloy_network::TxSignerSync::sign_transaction_sync(&self.signer, &mut tx)
			.map_err(|e| WalletError::Implementation(format!("Signing failed: {}", e)))?;
		let raw = Bytes::from(TxEnvelope::from(tx.into_signed(signature)).encoded_2718());

		tracing::debug!(
			from = %request.from,
			to = %request.to,
			nonce = %nonce,
			gas = %gas,
			"Submitting locally signed transaction"
		);
		upstream.request("eth_sendRawTransaction", json!([raw])).await
	}
}

#[async_trait]
impl WalletProvider for LocalWallet {
	async fn request(&self, method: &str, params: Value) -> Result<Value, WalletError> {
		match method {
			"eth_accounts" | "eth_requestAccounts" => {
				Ok(json!([self.address().to_checksum(None)]))
			},
			"eth_chainId" => Ok(json!(format!("0x{:x}", self.chain_id))),
			"eth_signTypedData_v4" => self.sign_typed_data(&params),
			"eth_sendTransaction" => self.send_transaction(params).await,
			"wallet_addEthereumChain" => {
				let chain: ChainDescriptor = params
					.get(0)
					.cloned()
					.map(serde_json::from_value)
					.transpose()
					.map_err(|e| WalletError::InvalidResponse(format!("Invalid chain: {}", e)))?
					.ok_or_else(|| WalletError::InvalidResponse("Missing chain".into()))?;
				self.onboarding.write().await.chains.push(chain);
				Ok(Value::Null)
			},
			"wallet_watchAsset" => {
				let token: TokenDescriptor = params
					.get("options")
					.cloned()
					.map(serde_json::from_value)
					.transpose()
					.map_err(|e| WalletError::InvalidResponse(format!("Invalid asset: {}", e)))?
					.ok_or_else(|| WalletError::InvalidResponse("Missing asset options".into()))?;
				self.onboarding.write().await.assets.push(token);
				Ok(Value::Bool(true))
			},
			_ => match &self.upstream {
				Some(upstream) => upstream.request(method, params).await,
				None => Err(WalletError::UnsupportedMethod(method.to_string())),
			},
		}
	}
}

async fn quantity<T: DeserializeOwned>(
	upstream: &dyn WalletProvider,
	method: &str,
	params: Value,
) -> Result<T, WalletError> {
	let result = upstream.request(method, params).await?;
	serde_json::from_value(result)
		.map_err(|e| WalletError::InvalidResponse(format!("{}: {}", method, e)))
}

/// Factory for the `local` implementation.
///
/// Configuration parameters:
/// - `private_key`: hex private key (required)
/// - `chain_id`: chain reported by `eth_chainId` (required)
/// - `rpc_url`: endpoint that receives signed transactions and forwarded
///   methods (optional; without it the wallet can only sign)
pub fn create_wallet(config: &toml::Value) -> Result<Box<dyn WalletProvider>, WalletError> {
	let private_key = config
		.get("private_key")
		.and_then(|v| v.as_str())
		.map(SecretString::from)
		.filter(|key| !key.is_empty())
		.ok_or_else(|| {
			WalletError::Implementation(
				"local wallet requires a non-empty 'private_key'".to_string(),
			)
		})?;
	let chain_id = config
		.get("chain_id")
		.and_then(|v| v.as_integer())
		.filter(|id| *id > 0)
		.ok_or_else(|| {
			WalletError::Implementation("local wallet requires a positive 'chain_id'".to_string())
		})? as u64;

	let mut wallet = LocalWallet::new(&private_key, chain_id)?;
	if let Some(url) = config.get("rpc_url").and_then(|v| v.as_str()) {
		wallet = wallet.with_upstream(RpcWallet::new(url, Duration::from_secs(30))?);
	}
	Ok(Box::new(wallet))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::test_support::ScriptedProvider;
	use crate::token::{ICqmToken, TokenClient};
	use crate::WalletService;
	use alloy_eips::eip2718::Decodable2718;
	use alloy_primitives::B256;
	use alloy_sol_types::SolCall;
	use cqm_signing::{split_signature, verify_document, TypedDataBuilder};
	use cqm_types::{NativeCurrency, TokenDomain, TransferAuthorization};
	use std::sync::Arc;

	const KEY: &str = "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";
	const ADDRESS: &str = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8";

	fn wallet() -> LocalWallet {
		LocalWallet::new(&SecretString::from(KEY), 31337).unwrap()
	}

	#[tokio::test]
	async fn test_accounts_and_chain() {
		let wallet = wallet();
		assert_eq!(
			wallet.request("eth_accounts", json!([])).await.unwrap(),
			json!([ADDRESS])
		);
		assert_eq!(
			wallet.request("eth_chainId", json!([])).await.unwrap(),
			json!("0x7a69")
		);
	}

	#[tokio::test]
	async fn test_signature_verifies_against_document() {
		let wallet = wallet();
		let doc = TypedDataBuilder::new(TokenDomain {
			name: "CQMToken".to_string(),
			version: "1".to_string(),
			chain_id: 31337,
			verifying_contract: Address::repeat_byte(0x42),
		})
		.transfer(&TransferAuthorization {
			from: wallet.address(),
			to: Address::repeat_byte(0xbb),
			amount: U256::from(20u64),
			nonce: U256::ZERO,
			deadline: 2_000,
		});

		let signature = wallet
			.request("eth_signTypedData_v4", json!([ADDRESS, doc.to_json()]))
			.await
			.unwrap();
		let signature = signature.as_str().unwrap();

		assert_eq!(signature.len(), 132);
		assert_eq!(verify_document(&doc, signature, 1_000), Ok(wallet.address()));
	}

	#[tokio::test]
	async fn test_foreign_account_is_refused() {
		let params = json!([Address::repeat_byte(0x01), "{}"]);
		let err = wallet()
			.request("eth_signTypedData_v4", params)
			.await
			.unwrap_err();
		assert!(matches!(err, WalletError::Rpc { code: 4100, .. }));
	}

	#[tokio::test]
	async fn test_onboarding_is_recorded() {
		let wallet = wallet();
		let chain = ChainDescriptor {
			chain_id: 10200,
			chain_name: "Gnosis Chiado Testnet".to_string(),
			native_currency: NativeCurrency {
				name: "XDAI".to_string(),
				symbol: "XDAI".to_string(),
				decimals: 18,
			},
			rpc_urls: vec!["https://rpc.chiadochain.net".to_string()],
			block_explorer_urls: vec![],
		};
		let token = TokenDescriptor {
			address: Address::repeat_byte(0x42),
			symbol: "CQM".to_string(),
			decimals: 18,
			image: String::new(),
		};

		wallet
			.request("wallet_addEthereumChain", json!([chain.clone()]))
			.await
			.unwrap();
		let accepted = wallet
			.request("wallet_watchAsset", token.watch_asset_params())
			.await
			.unwrap();
		assert_eq!(accepted, json!(true));

		let onboarding = wallet.onboarding().await;
		assert_eq!(onboarding.chains, vec![chain]);
		assert_eq!(onboarding.assets, vec![token]);
	}

	#[tokio::test]
	async fn test_calls_without_upstream_are_unsupported() {
		let err = wallet()
			.request("eth_call", json!([]))
			.await
			.unwrap_err();
		assert!(matches!(err, WalletError::UnsupportedMethod(m) if m == "eth_call"));
	}

	fn chain_node() -> Arc<ScriptedProvider> {
		Arc::new(
			ScriptedProvider::default()
				.respond("eth_getTransactionCount", json!("0x7"))
				.respond("eth_gasPrice", json!("0x3b9aca00"))
				.respond("eth_estimateGas", json!("0x186a0"))
				.respond(
					"eth_sendRawTransaction",
					json!(B256::repeat_byte(0x11).to_string()),
				),
		)
	}

	#[tokio::test]
	async fn test_meta_transfer_is_signed_and_sent_raw() {
		let node = chain_node();
		let wallet = LocalWallet::new(&SecretString::from(KEY), 10200)
			.unwrap()
			.with_upstream(Arc::clone(&node));
		let service = WalletService::new(Box::new(wallet));
		let token_address = Address::repeat_byte(0x42);

		let auth = TransferAuthorization {
			from: Address::repeat_byte(0xaa),
			to: Address::repeat_byte(0xbb),
			amount: U256::from(20u64),
			nonce: U256::ZERO,
			deadline: 1_700_000_000,
		};
		let parts = split_signature(&format!("0x{}{}1c", "ab".repeat(32), "cd".repeat(32))).unwrap();
		let relayer = service.primary_account().await.unwrap();

		let hash = TokenClient::new(&service, token_address)
			.meta_transfer(relayer, &auth, &parts)
			.await
			.unwrap();
		assert_eq!(hash, B256::repeat_byte(0x11));

		let calls = node.calls.lock().unwrap();
		let methods: Vec<&str> = calls.iter().map(|(m, _)| m.as_str()).collect();
		assert_eq!(
			methods,
			vec![
				"eth_getTransactionCount",
				"eth_gasPrice",
				"eth_estimateGas",
				"eth_sendRawTransaction"
			]
		);
		assert_eq!(calls[0].1, json!([ADDRESS, "pending"]));

		let raw: Bytes = serde_json::from_value(calls[3].1[0].clone()).unwrap();
		let envelope = TxEnvelope::decode_2718(&mut raw.as_ref()).unwrap();
		let signed = envelope.as_legacy().unwrap();
		let tx = signed.tx();
		assert_eq!(tx.chain_id, Some(10200));
		assert_eq!(tx.nonce, 7);
		assert_eq!(tx.gas_price, 1_000_000_000);
		assert_eq!(tx.gas_limit, 100_000);
		assert_eq!(tx.to, TxKind::Call(token_address));
		assert_eq!(tx.value, U256::ZERO);

		let recovered = signed
			.signature()
			.recover_address_from_prehash(&tx.signature_hash())
			.unwrap();
		assert_eq!(recovered, relayer);

		let call = ICqmToken::metaTransferCall::abi_decode(&tx.input, true).unwrap();
		assert_eq!(call.from, auth.from);
		assert_eq!(call.to, auth.to);
		assert_eq!(call.amount, auth.amount);
		assert_eq!(call.v, 28);
		assert_eq!(call.r, parts.r);
	}

	#[tokio::test]
	async fn test_given_quantities_are_not_refetched() {
		let node = chain_node();
		let wallet = wallet().with_upstream(Arc::clone(&node));
		let params = json!([{
			"from": ADDRESS,
			"to": Address::repeat_byte(0x42),
			"data": "0x",
			"nonce": "0x2",
			"gas": "0x5208",
			"gasPrice": "0x1",
		}]);

		wallet.request("eth_sendTransaction", params).await.unwrap();

		let calls = node.calls.lock().unwrap();
		assert_eq!(calls.len(), 1);
		assert_eq!(calls[0].0, "eth_sendRawTransaction");
	}

	#[tokio::test]
	async fn test_transactions_need_managed_account_and_upstream() {
		let node = chain_node();
		let foreign = json!([{ "from": Address::repeat_byte(0x01), "to": Address::repeat_byte(0x42) }]);
		let err = wallet()
			.with_upstream(Arc::clone(&node))
			.request("eth_sendTransaction", foreign)
			.await
			.unwrap_err();
		assert!(matches!(err, WalletError::Rpc { code: 4100, .. }));
		assert!(node.calls.lock().unwrap().is_empty());

		let own = json!([{ "from": ADDRESS, "to": Address::repeat_byte(0x42) }]);
		let err = wallet()
			.request("eth_sendTransaction", own)
			.await
			.unwrap_err();
		assert!(matches!(err, WalletError::ProviderUnavailable(_)));
	}

	#[test]
	fn test_factory_validation() {
		let missing_key: toml::Value = toml::from_str("chain_id = 1").unwrap();
		assert!(create_wallet(&missing_key).is_err());

		let blank_key: toml::Value = toml::from_str("private_key = \"\"\nchain_id = 1").unwrap();
		let err = create_wallet(&blank_key).err().unwrap();
		assert!(err.to_string().contains("non-empty 'private_key'"));

		let zero_chain: toml::Value =
			toml::from_str(&format!("private_key = \"{}\"\nchain_id = 0", KEY)).unwrap();
		assert!(create_wallet(&zero_chain).is_err());

		let ok: toml::Value =
			toml::from_str(&format!("private_key = \"{}\"\nchain_id = 10200", KEY)).unwrap();
		assert!(create_wallet(&ok).is_ok());
	}
}
