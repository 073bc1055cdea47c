//! Common types for the CQM relay toolkit.
//!
//! This crate defines the data model shared by every other crate: the
//! transfer and permit authorizations a user signs, the EIP-712 domain they
//! are bound to, and the chain/token descriptors handed to a wallet.

/// Signed-message payloads and their EIP-712 domain.
pub mod authorization;
/// Chain and token descriptors for wallet onboarding requests.
pub mod networks;
/// Zeroizing string wrapper for private keys.
pub mod secret_string;
/// Utility functions for formatting, conversion and EIP-712 hashing.
pub mod utils;

pub use authorization::{PermitAuthorization, TokenDomain, TransferAuthorization};
pub use networks::{ChainDescriptor, NativeCurrency, TokenDescriptor};
pub use secret_string::SecretString;
pub use utils::{
	current_timestamp, format_token_amount, parse_address, parse_u256, without_0x_prefix,
	ConversionError,
};

pub use alloy_primitives::{Address, Bytes, B256, U256};
