//! String formatting helpers for hex values and token amounts.

use alloy_primitives::U256;

/// Strips a leading `0x` or `0X`, if any.
pub fn without_0x_prefix(hex_str: &str) -> &str {
	hex_str
		.strip_prefix("0x")
		.or_else(|| hex_str.strip_prefix("0X"))
		.unwrap_or(hex_str)
}

/// Renders a base-unit token amount as a decimal string.
///
/// `20000000000000000000` with 18 decimals becomes `"20"`, and
/// `1500000` with 6 decimals becomes `"1.5"`. Trailing zeros of the
/// fractional part are dropped.
pub fn format_token_amount(amount: U256, decimals: u8) -> String {
	if decimals == 0 {
		return amount.to_string();
	}

	let scale = U256::from(10u64).pow(U256::from(decimals));
	let (whole, fraction) = amount.div_rem(scale);
	if fraction.is_zero() {
		return whole.to_string();
	}

	let fraction = format!("{:0>width$}", fraction.to_string(), width = decimals as usize);
	format!("{}.{}", whole, fraction.trim_end_matches('0'))
}
