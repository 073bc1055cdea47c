//! Chain and token descriptors used to onboard a wallet.
//!
//! These mirror the parameter objects of the `wallet_addEthereumChain`
//! (EIP-3085) and `wallet_watchAsset` (EIP-747) wallet methods, so their serde
//! representation is the exact JSON a wallet expects.

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

/// Native currency of a chain, as displayed by the wallet.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct NativeCurrency {
	pub name: String,
	pub symbol: String,
	pub decimals: u8,
}

/// A chain the wallet should be able to switch to.
///
/// # Fields
///
/// * `chain_id` - Numeric chain id, serialized as a `0x`-prefixed hex quantity
/// * `chain_name` - Human readable name shown in the wallet
/// * `native_currency` - Gas token of the chain
/// * `rpc_urls` - JSON-RPC endpoints, first one is preferred
/// * `block_explorer_urls` - Explorer base URLs
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainDescriptor {
	#[serde(with = "hex_quantity")]
	pub chain_id: u64,
	pub chain_name: String,
	pub native_currency: NativeCurrency,
	pub rpc_urls: Vec<String>,
	#[serde(default)]
	pub block_explorer_urls: Vec<String>,
}

/// An ERC-20 token the wallet should track.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TokenDescriptor {
	pub address: Address,
	pub symbol: String,
	pub decimals: u8,
	#[serde(default)]
	pub image: String,
}

impl TokenDescriptor {
	/// Builds the `params` object of a `wallet_watchAsset` request.
	pub fn watch_asset_params(&self) -> serde_json::Value {
		serde_json::json!({
			"type": "ERC20",
			"options": {
				"address": self.address.to_checksum(None),
				"symbol": self.symbol,
				"decimals": self.decimals,
				"image": self.image,
			}
		})
	}
}

/// Serializes chain ids the way wallets expect them: `0x`-prefixed hex.
mod hex_quantity {
	use serde::{de::Error, Deserialize, Deserializer, Serializer};

	pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_str(&format!("0x{:x}", value))
	}

	pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
		let raw = String::deserialize(deserializer)?;
		let digits = crate::without_0x_prefix(&raw);
		u64::from_str_radix(digits, 16)
			.map_err(|e| D::Error::custom(format!("Invalid chain id '{}': {}", raw, e)))
	}
}
