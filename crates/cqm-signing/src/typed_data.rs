//! EIP-712 typed-data documents for CQM transfers and permits.
//!
//! A [`TypedDataDocument`] is what gets handed to a wallet through
//! `eth_signTypedData_v4`. Its JSON form has the four keys `types`,
//! `primaryType`, `domain` and `message`, always in that order with fields in
//! declaration order, so identical inputs produce byte-identical requests.
//! The same document computes the digest the contract will recover against.

use alloy_primitives::{keccak256, Address, B256};
use cqm_types::utils::{
	compute_domain_hash, compute_final_digest, Eip712AbiEncoder, PERMIT_TYPE, TRANSFER_TYPE,
};
use cqm_types::{PermitAuthorization, TokenDomain, TransferAuthorization};
use serde::Serialize;
use std::collections::BTreeMap;

/// One member of an EIP-712 struct type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TypedField {
	pub name: &'static str,
	#[serde(rename = "type")]
	pub kind: &'static str,
}

const fn field(name: &'static str, kind: &'static str) -> TypedField {
	TypedField { name, kind }
}

pub const EIP712_DOMAIN_FIELDS: &[TypedField] = &[
	field("name", "string"),
	field("version", "string"),
	field("chainId", "uint256"),
	field("verifyingContract", "address"),
];

pub const TRANSFER_FIELDS: &[TypedField] = &[
	field("from", "address"),
	field("to", "address"),
	field("amount", "uint256"),
	field("nonce", "uint256"),
	field("deadline", "uint256"),
];

pub const PERMIT_FIELDS: &[TypedField] = &[
	field("owner", "address"),
	field("spender", "address"),
	field("value", "uint256"),
	field("nonce", "uint256"),
	field("deadline", "uint256"),
];

/// The message being signed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypedMessage {
	Transfer(TransferAuthorization),
	Permit(PermitAuthorization),
}

impl TypedMessage {
	pub fn primary_type(&self) -> &'static str {
		match self {
			TypedMessage::Transfer(_) => "Transfer",
			TypedMessage::Permit(_) => "Permit",
		}
	}

	fn fields(&self) -> &'static [TypedField] {
		match self {
			TypedMessage::Transfer(_) => TRANSFER_FIELDS,
			TypedMessage::Permit(_) => PERMIT_FIELDS,
		}
	}

	/// The account that has to produce the signature.
	pub fn signer(&self) -> Address {
		match self {
			TypedMessage::Transfer(t) => t.from,
			TypedMessage::Permit(p) => p.owner,
		}
	}

	pub fn deadline(&self) -> u64 {
		match self {
			TypedMessage::Transfer(t) => t.deadline,
			TypedMessage::Permit(p) => p.deadline,
		}
	}

	pub fn is_expired(&self, now: u64) -> bool {
		match self {
			TypedMessage::Transfer(t) => t.is_expired(now),
			TypedMessage::Permit(p) => p.is_expired(now),
		}
	}

	/// `hashStruct(message)` for the primary type.
	pub fn struct_hash(&self) -> B256 {
		let mut enc = Eip712AbiEncoder::new();
		match self {
			TypedMessage::Transfer(t) => {
				enc.push_b256(&keccak256(TRANSFER_TYPE.as_bytes()));
				enc.push_address(&t.from);
				enc.push_address(&t.to);
				enc.push_u256(t.amount);
				enc.push_u256(t.nonce);
				enc.push_u64(t.deadline);
			},
			TypedMessage::Permit(p) => {
				enc.push_b256(&keccak256(PERMIT_TYPE.as_bytes()));
				enc.push_address(&p.owner);
				enc.push_address(&p.spender);
				enc.push_u256(p.value);
				enc.push_u256(p.nonce);
				enc.push_u64(p.deadline);
			},
		}
		keccak256(enc.finish())
	}

	fn to_wire(&self) -> WireMessage {
		match self {
			TypedMessage::Transfer(t) => WireMessage::Transfer {
				from: t.from.to_checksum(None),
				to: t.to.to_checksum(None),
				amount: t.amount.to_string(),
				nonce: t.nonce.to_string(),
				deadline: t.deadline.to_string(),
			},
			TypedMessage::Permit(p) => WireMessage::Permit {
				owner: p.owner.to_checksum(None),
				spender: p.spender.to_checksum(None),
				value: p.value.to_string(),
				nonce: p.nonce.to_string(),
				deadline: p.deadline.to_string(),
			},
		}
	}
}

/// A complete EIP-712 signing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypedDataDocument {
	pub domain: TokenDomain,
	pub message: TypedMessage,
}

impl TypedDataDocument {
	pub fn primary_type(&self) -> &'static str {
		self.message.primary_type()
	}

	pub fn domain_separator(&self) -> B256 {
		compute_domain_hash(&self.domain)
	}

	/// The 32-byte digest a wallet signs for this document.
	pub fn signing_hash(&self) -> B256 {
		compute_final_digest(&self.domain_separator(), &self.message.struct_hash())
	}

	/// Serializes the request body. Stable for identical documents.
	pub fn to_json(&self) -> String {
		// Plain structs of strings and integers cannot fail to serialize.
		serde_json::to_string(&self.to_wire()).unwrap_or_default()
	}

	pub fn to_json_pretty(&self) -> String {
		serde_json::to_string_pretty(&self.to_wire()).unwrap_or_default()
	}

	pub fn to_value(&self) -> serde_json::Value {
		serde_json::to_value(self.to_wire()).unwrap_or_default()
	}

	fn to_wire(&self) -> WireDocument<'_> {
		let mut types = BTreeMap::new();
		types.insert("EIP712Domain", EIP712_DOMAIN_FIELDS);
		types.insert(self.primary_type(), self.message.fields());

		WireDocument {
			types,
			primary_type: self.primary_type(),
			domain: WireDomain {
				name: &self.domain.name,
				version: &self.domain.version,
				chain_id: self.domain.chain_id,
				verifying_contract: self.domain.verifying_contract.to_checksum(None),
			},
			message: self.message.to_wire(),
		}
	}
}

#[derive(Serialize)]
struct WireDocument<'a> {
	types: BTreeMap<&'static str, &'static [TypedField]>,
	#[serde(rename = "primaryType")]
	primary_type: &'static str,
	domain: WireDomain<'a>,
	message: WireMessage,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireDomain<'a> {
	name: &'a str,
	version: &'a str,
	chain_id: u64,
	verifying_contract: String,
}

#[derive(Serialize)]
#[serde(untagged)]
enum WireMessage {
	Transfer {
		from: String,
		to: String,
		amount: String,
		nonce: String,
		deadline: String,
	},
	Permit {
		owner: String,
		spender: String,
		value: String,
		nonce: String,
		deadline: String,
	},
}

/// Builds documents bound to one token domain.
#[derive(Debug, Clone)]
pub struct TypedDataBuilder {
	domain: TokenDomain,
}

impl TypedDataBuilder {
	pub fn new(domain: TokenDomain) -> Self {
		Self { domain }
	}

	/// Document for a `Transfer` meta-transfer authorization.
	pub fn transfer(&self, auth: &TransferAuthorization) -> TypedDataDocument {
		tracing::debug!(
			from = %auth.from,
			to = %auth.to,
			amount = %auth.amount,
			nonce = %auth.nonce,
			deadline = auth.deadline,
			"Building transfer typed data"
		);
		TypedDataDocument {
			domain: self.domain.clone(),
			message: TypedMessage::Transfer(auth.clone()),
		}
	}

	/// Document for an EIP-2612 `Permit`.
	pub fn permit(&self, permit: &PermitAuthorization) -> TypedDataDocument {
		tracing::debug!(
			owner = %permit.owner,
			spender = %permit.spender,
			value = %permit.value,
			nonce = %permit.nonce,
			deadline = permit.deadline,
			"Building permit typed data"
		);
		TypedDataDocument {
			domain: self.domain.clone(),
			message: TypedMessage::Permit(permit.clone()),
		}
	}
}
