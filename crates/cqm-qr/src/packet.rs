//! The `from:to:amount:nonce:deadline:signature` wire format.
//!
//! Fields are never escaped: addresses, decimal integers and hex signatures
//! cannot contain `:`. Decoding only checks the field count; turning the
//! strings into typed values is a separate, explicit step
//! ([`SignedTransferPacket::authorization`]) so a scanner can show what it
//! read even when it is not a valid transfer.

use cqm_types::{parse_address, parse_u256, ConversionError, TransferAuthorization};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const SEPARATOR: char = ':';
const FIELD_COUNT: usize = 6;

/// Errors raised while reading a packet.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PacketError {
	/// The payload does not split into exactly six fields.
	#[error("Malformed packet: expected 6 colon-separated fields, found {found}")]
	MalformedPacket { found: usize },
	/// A field could not be interpreted as part of a transfer.
	#[error("Invalid packet field '{field}': {reason}")]
	InvalidField { field: &'static str, reason: String },
}

/// The six raw fields of a QR payload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SignedTransferPacket {
	pub from: String,
	pub to: String,
	pub amount: String,
	pub nonce: String,
	pub deadline: String,
	/// Hex signature, carried exactly as the signer returned it.
	pub signature: String,
}

impl SignedTransferPacket {
	/// Packs a typed authorization and its signature.
	pub fn new(auth: &TransferAuthorization, signature: &str) -> Self {
		Self {
			from: auth.from.to_checksum(None),
			to: auth.to.to_checksum(None),
			amount: auth.amount.to_string(),
			nonce: auth.nonce.to_string(),
			deadline: auth.deadline.to_string(),
			signature: signature.to_string(),
		}
	}

	/// Wire representation of the packet.
	pub fn encode(&self) -> String {
		[
			self.from.as_str(),
			self.to.as_str(),
			self.amount.as_str(),
			self.nonce.as_str(),
			self.deadline.as_str(),
			self.signature.as_str(),
		]
		.join(":")
	}

	/// Parses the transfer fields into typed values.
	pub fn authorization(&self) -> Result<TransferAuthorization, PacketError> {
		Ok(TransferAuthorization {
			from: parse_address(&self.from).map_err(|e| invalid("from", e))?,
			to: parse_address(&self.to).map_err(|e| invalid("to", e))?,
			amount: parse_u256(&self.amount).map_err(|e| invalid("amount", e))?,
			nonce: parse_u256(&self.nonce).map_err(|e| invalid("nonce", e))?,
			deadline: self
				.deadline
				.trim()
				.parse::<u64>()
				.map_err(|e| PacketError::InvalidField {
					field: "deadline",
					reason: e.to_string(),
				})?,
		})
	}
}

fn invalid(field: &'static str, err: ConversionError) -> PacketError {
	PacketError::InvalidField {
		field,
		reason: err.to_string(),
	}
}

impl fmt::Display for SignedTransferPacket {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.encode())
	}
}

impl FromStr for SignedTransferPacket {
	type Err = PacketError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		decode_packet(s)
	}
}

/// Encodes `auth` and `signature` into a QR payload string.
pub fn encode_packet(auth: &TransferAuthorization, signature: &str) -> String {
	SignedTransferPacket::new(auth, signature).encode()
}

/// Splits a QR payload into its six fields.
pub fn decode_packet(payload: &str) -> Result<SignedTransferPacket, PacketError> {
	let fields: Vec<&str> = payload.split(SEPARATOR).collect();
	if fields.len() != FIELD_COUNT {
		tracing::debug!(found = fields.len(), "Rejecting malformed QR payload");
		return Err(PacketError::MalformedPacket {
			found: fields.len(),
		});
	}

	Ok(SignedTransferPacket {
		from: fields[0].to_string(),
		to: fields[1].to_string(),
		amount: fields[2].to_string(),
		nonce: fields[3].to_string(),
		deadline: fields[4].to_string(),
		signature: fields[5].to_string(),
	})
}
