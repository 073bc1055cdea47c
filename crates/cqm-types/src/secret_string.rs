//! Private key text held for the local wallet.
//!
//! The buffer is wiped on drop and never shows up in `Debug` output.

use std::fmt;
use zeroize::Zeroizing;

pub struct SecretString(Zeroizing<String>);

impl SecretString {
	/// Lends the key to `f`; the only way to read it.
	pub fn with_exposed<F, R>(&self, f: F) -> R
	where
		F: FnOnce(&str) -> R,
	{
		f(&self.0)
	}

	/// True for a blank key, e.g. an unset `${CQM_PRIVATE_KEY:-}`.
	pub fn is_empty(&self) -> bool {
		self.0.trim().is_empty()
	}
}

impl From<&str> for SecretString {
	fn from(key: &str) -> Self {
		Self(Zeroizing::new(key.to_owned()))
	}
}

impl fmt::Debug for SecretString {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("SecretString(<redacted>)")
	}
}
