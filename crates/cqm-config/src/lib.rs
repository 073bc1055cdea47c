//! Configuration for the CQM relay toolkit.
//!
//! Configuration is a TOML file describing the chain to onboard, the token
//! and its EIP-712 domain, the wallet implementation to use, and signing/QR
//! preferences. Values may reference environment variables as `${VAR}` or
//! `${VAR:-default}`.
//!
//! ## Modular Configuration Support
//!
//! A file may pull in others with `include = ["wallet.toml"]`. Each
//! top-level section must be defined in exactly one file.

mod loader;

use cqm_types::{Address, ChainDescriptor, NativeCurrency, TokenDescriptor, TokenDomain};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	#[error("Configuration error: {0}")]
	Parse(String),
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Only the message; the default rendering repeats the whole input.
		ConfigError::Parse(err.message().to_string())
	}
}

/// Error-correction levels accepted in `[qr]`.
pub const QR_LEVELS: &[&str] = &["low", "medium", "quartile", "high"];

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Chain the wallet is asked to add.
	pub chain: ChainConfig,
	/// Token contract and its EIP-712 domain.
	pub token: TokenConfig,
	/// Wallet implementation selection.
	pub wallet: WalletConfig,
	#[serde(default)]
	pub signing: SigningConfig,
	#[serde(default)]
	pub qr: QrConfig,
}

/// Chain parameters for `wallet_addEthereumChain`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChainConfig {
	pub chain_id: u64,
	pub chain_name: String,
	pub native_currency: NativeCurrency,
	pub rpc_urls: Vec<String>,
	#[serde(default)]
	pub block_explorer_urls: Vec<String>,
}

impl ChainConfig {
	pub fn descriptor(&self) -> ChainDescriptor {
		ChainDescriptor {
			chain_id: self.chain_id,
			chain_name: self.chain_name.clone(),
			native_currency: self.native_currency.clone(),
			rpc_urls: self.rpc_urls.clone(),
			block_explorer_urls: self.block_explorer_urls.clone(),
		}
	}
}

/// The token contract.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TokenConfig {
	pub address: Address,
	pub symbol: String,
	pub decimals: u8,
	/// Icon URL passed to `wallet_watchAsset`.
	#[serde(default)]
	pub image: String,
	/// EIP-712 domain name. Must equal the name the contract was deployed with.
	pub domain_name: String,
	/// EIP-712 domain version.
	#[serde(default = "default_domain_version")]
	pub domain_version: String,
}

impl TokenConfig {
	pub fn descriptor(&self) -> TokenDescriptor {
		TokenDescriptor {
			address: self.address,
			symbol: self.symbol.clone(),
			decimals: self.decimals,
			image: self.image.clone(),
		}
	}
}

fn default_domain_version() -> String {
	"1".to_string()
}

/// Wallet implementation selection.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WalletConfig {
	/// Which implementation to use.
	pub primary: String,
	/// Implementation name to raw TOML settings.
	pub implementations: HashMap<String, toml::Value>,
}

impl WalletConfig {
	/// Settings of the primary implementation.
	pub fn primary_config(&self) -> Option<&toml::Value> {
		self.implementations.get(&self.primary)
	}
}

/// Signing preferences.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SigningConfig {
	/// Lifetime of a signed authorization, in seconds. Defaults to one day.
	#[serde(default = "default_deadline_seconds")]
	pub deadline_seconds: u64,
}

impl Default for SigningConfig {
	fn default() -> Self {
		Self {
			deadline_seconds: default_deadline_seconds(),
		}
	}
}

fn default_deadline_seconds() -> u64 {
	24 * 60 * 60
}

/// QR rendering preferences.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QrConfig {
	/// One of [`QR_LEVELS`].
	#[serde(default = "default_error_correction")]
	pub error_correction: String,
	/// Minimum SVG width/height in pixels.
	#[serde(default = "default_min_dimension")]
	pub min_dimension: u32,
}

impl Default for QrConfig {
	fn default() -> Self {
		Self {
			error_correction: default_error_correction(),
			min_dimension: default_min_dimension(),
		}
	}
}

fn default_error_correction() -> String {
	"medium".to_string()
}

fn default_min_dimension() -> u32 {
	300
}

/// Replaces `${VAR}` and `${VAR:-default}` with environment values.
///
/// Input is capped at 1MB.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut missing = None;
	let resolved = re.replace_all(input, |caps: &regex::Captures<'_>| {
		let name = &caps[1];
		match (std::env::var(name), caps.get(2)) {
			(Ok(value), _) => value,
			(Err(_), Some(default)) => default.as_str().to_string(),
			(Err(_), None) => {
				missing.get_or_insert_with(|| name.to_string());
				String::new()
			},
		}
	});

	match missing {
		Some(name) => Err(ConfigError::Validation(format!(
			"Environment variable '{}' not found",
			name
		))),
		None => Ok(resolved.into_owned()),
	}
}

impl Config {
	/// Loads a configuration file and its includes.
	pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let path = path.as_ref();
		let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
		let file_name = path.file_name().ok_or_else(|| {
			ConfigError::Validation(format!("Invalid path: {}", path.display()))
		})?;

		let mut loader = loader::ConfigLoader::new(base_dir);
		loader.load_config(file_name).await
	}

	/// EIP-712 domain of the configured token.
	pub fn token_domain(&self) -> TokenDomain {
		TokenDomain {
			name: self.token.domain_name.clone(),
			version: self.token.domain_version.clone(),
			chain_id: self.chain.chain_id,
			verifying_contract: self.token.address,
		}
	}

	fn validate(&self) -> Result<(), ConfigError> {
		// Chain
		if self.chain.chain_id == 0 {
			return Err(ConfigError::Validation(
				"chain.chain_id must be greater than 0".into(),
			));
		}
		if self.chain.chain_name.trim().is_empty() {
			return Err(ConfigError::Validation(
				"chain.chain_name cannot be empty".into(),
			));
		}
		let symbol_len = self.chain.native_currency.symbol.len();
		if !(2..=6).contains(&symbol_len) {
			return Err(ConfigError::Validation(format!(
				"chain.native_currency.symbol must be 2-6 characters, got '{}'",
				self.chain.native_currency.symbol
			)));
		}
		if self.chain.rpc_urls.is_empty() {
			return Err(ConfigError::Validation(
				"chain.rpc_urls must list at least one URL".into(),
			));
		}
		for url in self
			.chain
			.rpc_urls
			.iter()
			.chain(self.chain.block_explorer_urls.iter())
		{
			if !url.starts_with("https://") && !url.starts_with("http://") {
				return Err(ConfigError::Validation(format!(
					"'{}' is not an http(s) URL",
					url
				)));
			}
		}

		// Token
		if self.token.address == Address::ZERO {
			return Err(ConfigError::Validation(
				"token.address cannot be the zero address".into(),
			));
		}
		if self.token.symbol.trim().is_empty() {
			return Err(ConfigError::Validation("token.symbol cannot be empty".into()));
		}
		if self.token.decimals > 36 {
			return Err(ConfigError::Validation(
				"token.decimals cannot exceed 36".into(),
			));
		}
		if self.token.domain_name.is_empty() || self.token.domain_version.is_empty() {
			return Err(ConfigError::Validation(
				"token.domain_name and token.domain_version are required".into(),
			));
		}

		// Wallet
		if self.wallet.implementations.is_empty() {
			return Err(ConfigError::Validation(
				"At least one wallet implementation must be configured".into(),
			));
		}
		if self.wallet.primary_config().is_none() {
			return Err(ConfigError::Validation(format!(
				"Primary wallet '{}' not found in implementations",
				self.wallet.primary
			)));
		}

		// Signing
		if self.signing.deadline_seconds < 60 {
			return Err(ConfigError::Validation(
				"signing.deadline_seconds must be at least 60".into(),
			));
		}
		if self.signing.deadline_seconds > 30 * 24 * 60 * 60 {
			return Err(ConfigError::Validation(
				"signing.deadline_seconds cannot exceed 30 days".into(),
			));
		}

		// QR
		if !QR_LEVELS.contains(&self.qr.error_correction.as_str()) {
			return Err(ConfigError::Validation(format!(
				"qr.error_correction must be one of {:?}, got '{}'",
				QR_LEVELS, self.qr.error_correction
			)));
		}
		if !(64..=4096).contains(&self.qr.min_dimension) {
			return Err(ConfigError::Validation(
				"qr.min_dimension must be between 64 and 4096".into(),
			));
		}

		Ok(())
	}
}

/// Parses and validates a TOML string, resolving environment variables first.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}

/// Minimal valid configuration for tests in this and dependent crates.
#[cfg(any(test, feature = "testing"))]
pub const TEST_CONFIG: &str = r#"
[chain]
chain_id = 10200
chain_name = "Gnosis Chiado Testnet"
rpc_urls = ["https://rpc.chiadochain.net"]
block_explorer_urls = ["https://blockscout.chiadochain.net"]

[chain.native_currency]
name = "XDAI"
symbol = "XDAI"
decimals = 18

[token]
address = "0xF988A1b6d4C00832ed3570a4e50DdA4357a22F7D"
symbol = "CQM"
decimals = 18
domain_name = "CQMToken"

[wallet]
primary = "local"

[wallet.implementations.local]
private_key = "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d"
chain_id = 10200
"#;

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_env_var_resolution() {
		std::env::set_var("CQM_TEST_HOST", "localhost");
		std::env::set_var("CQM_TEST_PORT", "8545");

		let input = "url = \"http://${CQM_TEST_HOST}:${CQM_TEST_PORT}\"";
		let result = resolve_env_vars(input).unwrap();
		assert_eq!(result, "url = \"http://localhost:8545\"");

		std::env::remove_var("CQM_TEST_HOST");
		std::env::remove_var("CQM_TEST_PORT");
	}

	#[test]
	fn test_env_var_with_default() {
		let input = "key = \"${CQM_MISSING_VAR:-0xdefault}\"";
		assert_eq!(resolve_env_vars(input).unwrap(), "key = \"0xdefault\"");
	}

	#[test]
	fn test_missing_env_var_error() {
		let err = resolve_env_vars("key = \"${CQM_MISSING_VAR}\"").unwrap_err();
		assert!(err.to_string().contains("CQM_MISSING_VAR"));
	}

	#[test]
	fn test_defaults_applied() {
		let config: Config = TEST_CONFIG.parse().unwrap();
		assert_eq!(config.token.domain_version, "1");
		assert_eq!(config.signing.deadline_seconds, 86400);
		assert_eq!(config.qr.error_correction, "medium");
		assert_eq!(config.qr.min_dimension, 300);
		assert!(config.token.image.is_empty());

		let domain = config.token_domain();
		assert_eq!(domain.name, "CQMToken");
		assert_eq!(domain.chain_id, 10200);
		assert_eq!(domain.verifying_contract, config.token.address);

		assert_eq!(config.chain.descriptor().chain_id, 10200);
		assert_eq!(config.token.descriptor().symbol, "CQM");
	}

	#[test]
	fn test_malformed_token_address_rejected() {
		let input = TEST_CONFIG.replace(
			"0xF988A1b6d4C00832ed3570a4e50DdA4357a22F7D",
			"0xF988A1b6d4C00832",
		);
		assert!(matches!(
			Config::from_str(&input),
			Err(ConfigError::Parse(_))
		));
	}

	#[test]
	fn test_zero_token_address_rejected() {
		let input = TEST_CONFIG.replace(
			"0xF988A1b6d4C00832ed3570a4e50DdA4357a22F7D",
			"0x0000000000000000000000000000000000000000",
		);
		let err = Config::from_str(&input).unwrap_err();
		assert!(err.to_string().contains("zero address"));
	}

	#[test]
	fn test_unknown_primary_wallet_rejected() {
		let input = TEST_CONFIG.replace("primary = \"local\"", "primary = \"rpc\"");
		let err = Config::from_str(&input).unwrap_err();
		assert!(err
			.to_string()
			.contains("Primary wallet 'rpc' not found in implementations"));
	}

	#[test]
	fn test_native_symbol_length() {
		let input = TEST_CONFIG.replace("symbol = \"XDAI\"", "symbol = \"X\"");
		let err = Config::from_str(&input).unwrap_err();
		assert!(err.to_string().contains("2-6 characters"));
	}

	#[test]
	fn test_rpc_url_scheme() {
		let input = TEST_CONFIG.replace("https://rpc.chiadochain.net", "ws://rpc.chiadochain.net");
		let err = Config::from_str(&input).unwrap_err();
		assert!(err.to_string().contains("ws://rpc.chiadochain.net"));
	}

	#[test]
	fn test_signing_and_qr_bounds() {
		let short = format!("{}\n[signing]\ndeadline_seconds = 10\n", TEST_CONFIG);
		assert!(Config::from_str(&short).is_err());

		let bad_level = format!("{}\n[qr]\nerror_correction = \"ultra\"\n", TEST_CONFIG);
		let err = Config::from_str(&bad_level).unwrap_err();
		assert!(err.to_string().contains("ultra"));

		let ok = format!(
			"{}\n[qr]\nerror_correction = \"high\"\nmin_dimension = 512\n",
			TEST_CONFIG
		);
		let config = Config::from_str(&ok).unwrap();
		assert_eq!(config.qr.error_correction, "high");
		assert_eq!(config.qr.min_dimension, 512);
	}
}
