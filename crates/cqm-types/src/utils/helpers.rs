//! Helper utilities for common operations.

/// Current UNIX timestamp in seconds, or 0 if the clock is before the epoch.
pub fn current_timestamp() -> u64 {
	std::time::SystemTime::now()
		.duration_since(std::time::UNIX_EPOCH)
		.map(|d| d.as_secs())
		.unwrap_or(0)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_current_timestamp_is_recent() {
		// 2023-11-14, well before any machine running these tests.
		assert!(current_timestamp() > 1_700_000_000);
	}
}
