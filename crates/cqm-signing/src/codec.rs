//! Splitting and joining of 65-byte ECDSA signatures.
//!
//! Wallets return `eth_signTypedData_v4` signatures as a single hex string
//! `r || s || v`, while the token contract takes the three components as
//! separate arguments. Some signers encode `v` as the raw recovery id (0/1)
//! instead of 27/28; splitting normalizes that.

use alloy_primitives::B256;
use cqm_types::without_0x_prefix;
use thiserror::Error;

/// Hex length of a 65-byte signature without prefix.
const SIGNATURE_HEX_LEN: usize = 130;

/// Errors that can occur while decoding a signature string.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
	/// The hex payload is not exactly 65 bytes.
	#[error("Invalid signature length: expected 130 hex characters, got {actual}")]
	InvalidLength { actual: usize },
	/// The payload contains characters that are not hex digits.
	#[error("Invalid signature hex: {0}")]
	InvalidHex(String),
}

/// The `(r, s, v)` components the contract's `metaTransfer` and `permit` take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignatureParts {
	pub r: B256,
	pub s: B256,
	/// Recovery byte, 27 or 28 for well-formed signatures.
	pub v: u8,
}

impl SignatureParts {
	/// Raw `r || s || v` bytes.
	pub fn to_bytes(&self) -> [u8; 65] {
		let mut out = [0u8; 65];
		out[..32].copy_from_slice(self.r.as_slice());
		out[32..64].copy_from_slice(self.s.as_slice());
		out[64] = self.v;
		out
	}

	/// Recovery parity derived from `v`, or `None` if `v` is not 27/28.
	pub fn y_parity(&self) -> Option<bool> {
		match self.v {
			27 => Some(false),
			28 => Some(true),
			_ => None,
		}
	}
}

/// Splits a hex signature (with or without `0x`) into its components.
///
/// The first 32 bytes are `r`, the next 32 are `s` and the final byte is `v`.
/// A `v` below 27 gets 27 added.
pub fn split_signature(signature: &str) -> Result<SignatureParts, SignatureError> {
	let digits = without_0x_prefix(signature);
	if digits.len() != SIGNATURE_HEX_LEN {
		return Err(SignatureError::InvalidLength {
			actual: digits.len(),
		});
	}

	let bytes = hex::decode(digits).map_err(|e| SignatureError::InvalidHex(e.to_string()))?;

	let mut v = bytes[64];
	if v < 27 {
		v += 27;
	}

	Ok(SignatureParts {
		r: B256::from_slice(&bytes[..32]),
		s: B256::from_slice(&bytes[32..64]),
		v,
	})
}

/// Joins components back into a `0x`-prefixed lowercase hex signature.
pub fn join_signature(parts: &SignatureParts) -> String {
	format!("0x{}", hex::encode(parts.to_bytes()))
}
