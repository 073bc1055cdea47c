//! Utility functions for common type conversions and transformations.

pub mod conversion;
pub mod eip712;
pub mod formatting;
pub mod helpers;

pub use conversion::{parse_address, parse_u256, ConversionError};
pub use eip712::{
	compute_domain_hash, compute_final_digest, Eip712AbiEncoder, DOMAIN_TYPE, PERMIT_TYPE,
	TRANSFER_TYPE,
};
pub use formatting::{format_token_amount, without_0x_prefix};
pub use helpers::current_timestamp;
