//! Signer recovery and pre-submission checks for signed documents.
//!
//! A relayer that scans a packet can check it locally before spending gas:
//! the deadline must still be ahead and the signature must recover to the
//! account that is debited. Nonce freshness can only be checked against the
//! contract and is left to it.

use crate::codec::{split_signature, SignatureError};
use crate::typed_data::TypedDataDocument;
use alloy_primitives::{Address, PrimitiveSignature, B256, U256};
use thiserror::Error;

/// Reasons a signed document is rejected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum VerifyError {
	#[error(transparent)]
	Signature(#[from] SignatureError),
	#[error("Authorization expired at {deadline} (now {now})")]
	Expired { deadline: u64, now: u64 },
	#[error("Signature recovers to {recovered}, expected {expected}")]
	SignerMismatch {
		expected: Address,
		recovered: Address,
	},
	#[error("Signer recovery failed: {0}")]
	Recovery(String),
}

/// Recovers the address that signed `digest`.
pub fn recover_signer(digest: &B256, signature: &str) -> Result<Address, VerifyError> {
	let parts = split_signature(signature)?;
	let y_parity = parts
		.y_parity()
		.ok_or_else(|| VerifyError::Recovery(format!("Unsupported recovery byte {}", parts.v)))?;

	let sig = PrimitiveSignature::new(
		U256::from_be_bytes(parts.r.0),
		U256::from_be_bytes(parts.s.0),
		y_parity,
	);
	sig.recover_address_from_prehash(digest)
		.map_err(|e| VerifyError::Recovery(e.to_string()))
}

/// Checks that `signature` authorizes `document` at time `now`.
///
/// Returns the recovered signer on success.
pub fn verify_document(
	document: &TypedDataDocument,
	signature: &str,
	now: u64,
) -> Result<Address, VerifyError> {
	if document.message.is_expired(now) {
		return Err(VerifyError::Expired {
			deadline: document.message.deadline(),
			now,
		});
	}

	let recovered = recover_signer(&document.signing_hash(), signature)?;
	let expected = document.message.signer();
	if recovered != expected {
		tracing::warn!(%expected, %recovered, "Signature does not match signer");
		return Err(VerifyError::SignerMismatch {
			expected,
			recovered,
		});
	}

	Ok(recovered)
}
