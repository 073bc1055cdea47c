//! Client for the CQM token contract.
//!
//! The contract is an external collaborator: this module only encodes calls
//! to its public functions and decodes their return values. Allowance, nonce
//! and deadline enforcement all happen on-chain.

use crate::{WalletError, WalletService};
use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_sol_types::{sol, SolCall};
use cqm_signing::SignatureParts;
use cqm_types::TransferAuthorization;

sol! {
	/// Public surface of the CQM token used by the relay.
	interface ICqmToken {
		function nonces(address owner) external view returns (uint256);
		function balanceOf(address account) external view returns (uint256);
		function transfer(address to, uint256 amount) external returns (bool);
		function metaTransfer(address from, address to, uint256 amount, uint256 deadline, uint8 v, bytes32 r, bytes32 s) external;
		function permit(address owner, address spender, uint256 value, uint256 deadline, uint8 v, bytes32 r, bytes32 s) external;
	}
}

/// Calldata for `metaTransfer` executing `auth` with `signature`.
pub fn meta_transfer_calldata(auth: &TransferAuthorization, signature: &SignatureParts) -> Bytes {
	ICqmToken::metaTransferCall {
		from: auth.from,
		to: auth.to,
		amount: auth.amount,
		deadline: U256::from(auth.deadline),
		v: signature.v,
		r: signature.r,
		s: signature.s,
	}
	.abi_encode()
	.into()
}

/// Token contract bound to one address, reached through a wallet.
pub struct TokenClient<'a> {
	wallet: &'a WalletService,
	address: Address,
}

impl<'a> TokenClient<'a> {
	pub fn new(wallet: &'a WalletService, address: Address) -> Self {
		Self { wallet, address }
	}

	pub fn address(&self) -> Address {
		self.address
	}

	/// Current meta-transfer/permit nonce of `owner`.
	pub async fn nonces(&self, owner: Address) -> Result<U256, WalletError> {
		let data = ICqmToken::noncesCall { owner }.abi_encode();
		let output = self.wallet.call(self.address, data.into()).await?;
		ICqmToken::noncesCall::abi_decode_returns(&output, true)
			.map(|ret| ret._0)
			.map_err(|e| WalletError::InvalidResponse(format!("nonces: {}", e)))
	}

	pub async fn balance_of(&self, account: Address) -> Result<U256, WalletError> {
		let data = ICqmToken::balanceOfCall { account }.abi_encode();
		let output = self.wallet.call(self.address, data.into()).await?;
		ICqmToken::balanceOfCall::abi_decode_returns(&output, true)
			.map(|ret| ret._0)
			.map_err(|e| WalletError::InvalidResponse(format!("balanceOf: {}", e)))
	}

	/// Plain ERC-20 transfer sent from `from`.
	pub async fn transfer(
		&self,
		from: Address,
		to: Address,
		amount: U256,
	) -> Result<B256, WalletError> {
		let data = ICqmToken::transferCall { to, amount }.abi_encode();
		let hash = self
			.wallet
			.send_transaction(from, self.address, data.into())
			.await?;
		tracing::info!(%from, %to, %amount, tx = %hash, "Transfer submitted");
		Ok(hash)
	}

	/// Relays a signed transfer, paying gas from `relayer`.
	pub async fn meta_transfer(
		&self,
		relayer: Address,
		auth: &TransferAuthorization,
		signature: &SignatureParts,
	) -> Result<B256, WalletError> {
		let data = meta_transfer_calldata(auth, signature);
		let hash = self
			.wallet
			.send_transaction(relayer, self.address, data)
			.await?;
		tracing::info!(
			from = %auth.from,
			to = %auth.to,
			amount = %auth.amount,
			tx = %hash,
			"Meta-transfer submitted"
		);
		Ok(hash)
	}

	/// Submits an EIP-2612 permit, paying gas from `relayer`.
	pub async fn permit(
		&self,
		relayer: Address,
		owner: Address,
		spender: Address,
		value: U256,
		deadline: u64,
		signature: &SignatureParts,
	) -> Result<B256, WalletError> {
		let data = ICqmToken::permitCall {
			owner,
			spender,
			value,
			deadline: U256::from(deadline),
			v: signature.v,
			r: signature.r,
			s: signature.s,
		}
		.abi_encode();
		let hash = self
			.wallet
			.send_transaction(relayer, self.address, data.into())
			.await?;
		tracing::info!(%owner, %spender, %value, tx = %hash, "Permit submitted");
		Ok(hash)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::test_support::ScriptedProvider;
	use serde_json::json;
	use std::sync::Arc;

	fn token_address() -> Address {
		Address::repeat_byte(0x42)
	}

	fn word(value: u64) -> String {
		format!("0x{:064x}", value)
	}

	#[tokio::test]
	async fn test_nonces_round_trip() {
		let provider = Arc::new(ScriptedProvider::default().respond("eth_call", json!(word(3))));
		let wallet = WalletService::new(Box::new(Arc::clone(&provider)));
		let token = TokenClient::new(&wallet, token_address());

		let owner = Address::repeat_byte(0xaa);
		assert_eq!(token.nonces(owner).await.unwrap(), U256::from(3u64));

		let calls = provider.calls.lock().unwrap();
		let (method, params) = &calls[0];
		assert_eq!(method, "eth_call");
		assert_eq!(params[1], "latest");

		let data: Bytes = serde_json::from_value(params[0]["data"].clone()).unwrap();
		let decoded = ICqmToken::noncesCall::abi_decode(&data, true).unwrap();
		assert_eq!(decoded.owner, owner);
	}

	#[tokio::test]
	async fn test_short_return_is_invalid() {
		let provider = Arc::new(ScriptedProvider::default().respond("eth_call", json!("0x")));
		let wallet = WalletService::new(Box::new(Arc::clone(&provider)));
		let token = TokenClient::new(&wallet, token_address());

		assert!(matches!(
			token.balance_of(Address::repeat_byte(0xaa)).await,
			Err(WalletError::InvalidResponse(_))
		));
	}

	#[tokio::test]
	async fn test_meta_transfer_encodes_signature_parts() {
		let tx_hash = format!("0x{}", "ab".repeat(32));
		let provider = Arc::new(
			ScriptedProvider::default().respond("eth_sendTransaction", json!(tx_hash)),
		);
		let wallet = WalletService::new(Box::new(Arc::clone(&provider)));
		let token = TokenClient::new(&wallet, token_address());

		let auth = TransferAuthorization {
			from: Address::repeat_byte(0xaa),
			to: Address::repeat_byte(0xbb),
			amount: U256::from(20u64),
			nonce: U256::ZERO,
			deadline: 1_700_000_000,
		};
		let sig = SignatureParts {
			r: B256::repeat_byte(0x11),
			s: B256::repeat_byte(0x22),
			v: 28,
		};
		let relayer = Address::repeat_byte(0xcc);

		let hash = token.meta_transfer(relayer, &auth, &sig).await.unwrap();
		assert_eq!(hash, B256::repeat_byte(0xab));

		let calls = provider.calls.lock().unwrap();
		let tx = &calls[0].1[0];
		let from: Address = serde_json::from_value(tx["from"].clone()).unwrap();
		let to: Address = serde_json::from_value(tx["to"].clone()).unwrap();
		assert_eq!(from, relayer);
		assert_eq!(to, token_address());

		let data: Bytes = serde_json::from_value(tx["data"].clone()).unwrap();
		let call = ICqmToken::metaTransferCall::abi_decode(&data, true).unwrap();
		assert_eq!(call.from, auth.from);
		assert_eq!(call.to, auth.to);
		assert_eq!(call.amount, auth.amount);
		assert_eq!(call.deadline, U256::from(1_700_000_000u64));
		assert_eq!(call.v, 28);
		assert_eq!(call.r, sig.r);
		assert_eq!(call.s, sig.s);
	}

	#[tokio::test]
	async fn test_transfer_encodes_recipient_and_amount() {
		let provider = Arc::new(ScriptedProvider::default().respond(
			"eth_sendTransaction",
			json!(B256::repeat_byte(0x01).to_string()),
		));
		let wallet = WalletService::new(Box::new(Arc::clone(&provider)));
		let token = TokenClient::new(&wallet, token_address());

		let from = Address::repeat_byte(0xaa);
		let to = Address::repeat_byte(0xbb);
		let amount = U256::from(5_000_000_000_000_000_000u128);
		let hash = token.transfer(from, to, amount).await.unwrap();
		assert_eq!(hash, B256::repeat_byte(0x01));

		let calls = provider.calls.lock().unwrap();
		let tx = &calls[0].1[0];
		let sender: Address = serde_json::from_value(tx["from"].clone()).unwrap();
		assert_eq!(sender, from);

		let data: Bytes = serde_json::from_value(tx["data"].clone()).unwrap();
		assert_eq!(&data[..4], ICqmToken::transferCall::SELECTOR.as_slice());
		let call = ICqmToken::transferCall::abi_decode(&data, true).unwrap();
		assert_eq!(call.to, to);
		assert_eq!(call.amount, amount);
	}

	#[tokio::test]
	async fn test_permit_encodes_signature_parts() {
		let provider = Arc::new(ScriptedProvider::default().respond(
			"eth_sendTransaction",
			json!(B256::repeat_byte(0x02).to_string()),
		));
		let wallet = WalletService::new(Box::new(Arc::clone(&provider)));
		let token = TokenClient::new(&wallet, token_address());

		let owner = Address::repeat_byte(0xaa);
		let spender = Address::repeat_byte(0xdd);
		let sig = SignatureParts {
			r: B256::repeat_byte(0x33),
			s: B256::repeat_byte(0x44),
			v: 27,
		};

		token
			.permit(owner, owner, spender, U256::MAX, 1_800_000_000, &sig)
			.await
			.unwrap();

		let calls = provider.calls.lock().unwrap();
		let data: Bytes = serde_json::from_value(calls[0].1[0]["data"].clone()).unwrap();
		let call = ICqmToken::permitCall::abi_decode(&data, true).unwrap();
		assert_eq!(call.owner, owner);
		assert_eq!(call.spender, spender);
		assert_eq!(call.value, U256::MAX);
		assert_eq!(call.deadline, U256::from(1_800_000_000u64));
		assert_eq!(call.v, 27);
		assert_eq!(call.r, sig.r);
		assert_eq!(call.s, sig.s);
	}
}
