//! Authorization payloads signed off-chain by a token holder.
//!
//! A `TransferAuthorization` lets a relayer move tokens on behalf of the
//! signer through the token's `metaTransfer` entry point, while a
//! `PermitAuthorization` grants an EIP-2612 allowance. Both are scoped to a
//! single token contract on a single chain by a `TokenDomain`.

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

/// EIP-712 domain of the token contract.
///
/// The four fields make up the domain separator the contract computes at
/// deployment, so they must match the on-chain values exactly for a
/// signature to verify.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TokenDomain {
	/// Contract name used in the domain separator (e.g. "CQMToken").
	pub name: String,
	/// Domain version string (e.g. "1").
	pub version: String,
	/// Chain the contract is deployed on.
	pub chain_id: u64,
	/// Address of the token contract verifying the signature.
	pub verifying_contract: Address,
}

/// Off-chain authorization for a single meta-transfer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TransferAuthorization {
	/// Token holder whose balance is debited. Must be the signer.
	pub from: Address,
	/// Recipient of the tokens.
	pub to: Address,
	/// Amount in token base units.
	pub amount: U256,
	/// Signer's contract nonce at signing time.
	pub nonce: U256,
	/// Unix timestamp (seconds) after which the contract rejects the transfer.
	pub deadline: u64,
}

impl TransferAuthorization {
	/// Returns true once `now` has reached the deadline.
	pub fn is_expired(&self, now: u64) -> bool {
		self.deadline <= now
	}
}

/// Off-chain EIP-2612 allowance grant.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PermitAuthorization {
	pub owner: Address,
	pub spender: Address,
	pub value: U256,
	pub nonce: U256,
	pub deadline: u64,
}

impl PermitAuthorization {
	/// Returns true once `now` has reached the deadline.
	pub fn is_expired(&self, now: u64) -> bool {
		self.deadline <= now
	}
}
