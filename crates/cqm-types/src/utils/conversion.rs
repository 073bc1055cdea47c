//! Parsing of the textual forms addresses and integers arrive in.
//!
//! QR payloads and CLI arguments carry addresses as hex and amounts as
//! decimal strings. These helpers turn them into alloy primitives and
//! report which value was rejected.

use alloy_primitives::{Address, U256};
use thiserror::Error;

/// Errors raised when a textual value cannot be parsed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConversionError {
	#[error("Invalid address '{value}': {reason}")]
	InvalidAddress { value: String, reason: String },
	#[error("Invalid integer '{value}': {reason}")]
	InvalidInteger { value: String, reason: String },
}

/// Parses a `0x`-prefixed, 20-byte hex address.
///
/// Mixed-case input is accepted without checksum validation; the wallet
/// that produced the address is trusted to have done that.
pub fn parse_address(value: &str) -> Result<Address, ConversionError> {
	let trimmed = value.trim();
	if !trimmed.starts_with("0x") && !trimmed.starts_with("0X") {
		return Err(ConversionError::InvalidAddress {
			value: value.to_string(),
			reason: "missing 0x prefix".to_string(),
		});
	}
	trimmed
		.parse::<Address>()
		.map_err(|e| ConversionError::InvalidAddress {
			value: value.to_string(),
			reason: e.to_string(),
		})
}

/// Parses an unsigned 256-bit integer in decimal or `0x` hex.
pub fn parse_u256(value: &str) -> Result<U256, ConversionError> {
	let trimmed = value.trim();
	let parsed = match trimmed
		.strip_prefix("0x")
		.or_else(|| trimmed.strip_prefix("0X"))
	{
		Some(hex_digits) => U256::from_str_radix(hex_digits, 16),
		None => U256::from_str_radix(trimmed, 10),
	};
	parsed.map_err(|e| ConversionError::InvalidInteger {
		value: value.to_string(),
		reason: e.to_string(),
	})
}
