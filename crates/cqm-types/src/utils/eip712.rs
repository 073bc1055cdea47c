//! EIP-712 hashing primitives shared by the signing crate.
//!
//! These helpers provide:
//! - The canonical type strings for the token's domain and messages
//! - Domain separator computation
//! - Final digest computation (0x1901 || domainSeparator || structHash)
//! - A minimal ABI encoder for the static field types the messages use

use crate::TokenDomain;
use alloy_primitives::{keccak256, Address, B256, U256};

pub const DOMAIN_TYPE: &str =
	"EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)";
pub const TRANSFER_TYPE: &str =
	"Transfer(address from,address to,uint256 amount,uint256 nonce,uint256 deadline)";
pub const PERMIT_TYPE: &str =
	"Permit(address owner,address spender,uint256 value,uint256 nonce,uint256 deadline)";

/// Computes the domain separator
/// `keccak256(abi.encode(typeHash, keccak(name), keccak(version), chainId, verifyingContract))`.
pub fn compute_domain_hash(domain: &TokenDomain) -> B256 {
	let mut enc = Eip712AbiEncoder::new();
	enc.push_b256(&keccak256(DOMAIN_TYPE.as_bytes()));
	enc.push_string(&domain.name);
	enc.push_string(&domain.version);
	enc.push_u64(domain.chain_id);
	enc.push_address(&domain.verifying_contract);
	keccak256(enc.finish())
}

/// Computes the final EIP-712 digest: keccak256(0x1901 || domainHash || structHash).
pub fn compute_final_digest(domain_hash: &B256, struct_hash: &B256) -> B256 {
	let mut out = Vec::with_capacity(2 + 32 + 32);
	out.extend_from_slice(&[0x19, 0x01]);
	out.extend_from_slice(domain_hash.as_slice());
	out.extend_from_slice(struct_hash.as_slice());
	keccak256(out)
}

/// Minimal ABI encoder for static types used in EIP-712 struct hashing.
///
/// Every push appends one 32-byte word.
#[derive(Debug, Default)]
pub struct Eip712AbiEncoder {
	buf: Vec<u8>,
}

impl Eip712AbiEncoder {
	pub fn new() -> Self {
		Self { buf: Vec::with_capacity(6 * 32) }
	}

	pub fn push_b256(&mut self, v: &B256) {
		self.buf.extend_from_slice(v.as_slice());
	}

	pub fn push_address(&mut self, addr: &Address) {
		let mut word = [0u8; 32];
		word[12..].copy_from_slice(addr.as_slice());
		self.buf.extend_from_slice(&word);
	}

	pub fn push_u256(&mut self, v: U256) {
		self.buf.extend_from_slice(&v.to_be_bytes::<32>());
	}

	pub fn push_u64(&mut self, v: u64) {
		self.push_u256(U256::from(v));
	}

	/// Dynamic `string` members are encoded as the hash of their bytes.
	pub fn push_string(&mut self, s: &str) {
		self.push_b256(&keccak256(s.as_bytes()));
	}

	pub fn finish(self) -> Vec<u8> {
		self.buf
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn domain() -> TokenDomain {
		TokenDomain {
			name: "CQMToken".to_string(),
			version: "1".to_string(),
			chain_id: 10200,
			verifying_contract: Address::repeat_byte(0x42),
		}
	}

	#[test]
	fn test_encoder_word_layout() {
		let mut enc = Eip712AbiEncoder::new();
		enc.push_address(&Address::repeat_byte(0xff));
		enc.push_u64(1);
		let out = enc.finish();

		assert_eq!(out.len(), 64);
		assert!(out[..12].iter().all(|b| *b == 0));
		assert!(out[12..32].iter().all(|b| *b == 0xff));
		assert!(out[32..63].iter().all(|b| *b == 0));
		assert_eq!(out[63], 1);
	}

	#[test]
	fn test_domain_hash_binds_every_field() {
		let base = compute_domain_hash(&domain());
		assert_eq!(base, compute_domain_hash(&domain()));

		let mut other_chain = domain();
		other_chain.chain_id = 31337;
		assert_ne!(base, compute_domain_hash(&other_chain));

		let mut other_version = domain();
		other_version.version = "2".to_string();
		assert_ne!(base, compute_domain_hash(&other_version));

		let mut other_contract = domain();
		other_contract.verifying_contract = Address::repeat_byte(0x43);
		assert_ne!(base, compute_domain_hash(&other_contract));
	}

	#[test]
	fn test_final_digest_is_prefixed_hash() {
		let d = B256::repeat_byte(0x01);
		let s = B256::repeat_byte(0x02);

		let mut preimage = vec![0x19, 0x01];
		preimage.extend_from_slice(d.as_slice());
		preimage.extend_from_slice(s.as_slice());
		assert_eq!(compute_final_digest(&d, &s), keccak256(preimage));
	}
}
