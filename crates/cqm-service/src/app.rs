//! User actions of the `cqm` tool.
//!
//! Each public method on [`RelayApp`] is one action: it runs to completion or
//! fails with an [`AppError`], and a failure leaves nothing half-done.

use cqm_config::{Config, ConfigError};
use cqm_qr::{
	decode_packet, ErrorCorrection, PacketError, QrError, QrRenderer, SignedTransferPacket,
};
use cqm_signing::{
	split_signature, verify_document, SignatureError, SignatureParts, TypedDataBuilder,
	TypedDataDocument, VerifyError,
};
use cqm_types::{
	current_timestamp, format_token_amount, Address, ChainDescriptor, PermitAuthorization,
	TransferAuthorization, B256, U256,
};
use cqm_wallet::token::TokenClient;
use cqm_wallet::{WalletError, WalletService};
use std::path::Path;
use thiserror::Error;

/// Any failure of a user action.
#[derive(Debug, Error)]
pub enum AppError {
	#[error(transparent)]
	Config(#[from] ConfigError),
	#[error(transparent)]
	Wallet(#[from] WalletError),
	#[error(transparent)]
	Signature(#[from] SignatureError),
	#[error(transparent)]
	Verify(#[from] VerifyError),
	#[error(transparent)]
	Packet(#[from] PacketError),
	#[error(transparent)]
	Qr(#[from] QrError),
	#[error("Wallet is on chain {actual}, configuration expects {expected}")]
	ChainMismatch { expected: u64, actual: u64 },
}

/// A scanned packet that passed local checks.
#[derive(Debug, Clone)]
pub struct DecodedTransfer {
	pub packet: SignedTransferPacket,
	pub authorization: TransferAuthorization,
	pub signature: SignatureParts,
	/// Address the signature recovers to; equals `authorization.from`.
	pub signer: Address,
}

pub struct RelayApp {
	config: Config,
	wallet: WalletService,
	builder: TypedDataBuilder,
	renderer: QrRenderer,
}

impl RelayApp {
	/// Builds the app with the wallet implementation named in `[wallet]`.
	pub fn from_config(config: Config) -> Result<Self, AppError> {
		let settings = config.wallet.primary_config().ok_or_else(|| {
			ConfigError::Validation(format!(
				"Primary wallet '{}' not found in implementations",
				config.wallet.primary
			))
		})?;
		let provider = cqm_wallet::create_wallet(&config.wallet.primary, settings)?;
		tracing::info!(implementation = %config.wallet.primary, "Loaded wallet");
		Self::new(config, WalletService::new(provider))
	}

	pub fn new(config: Config, wallet: WalletService) -> Result<Self, AppError> {
		let level: ErrorCorrection = config.qr.error_correction.parse()?;
		Ok(Self {
			builder: TypedDataBuilder::new(config.token_domain()),
			renderer: QrRenderer::new(level, config.qr.min_dimension),
			config,
			wallet,
		})
	}

	fn token(&self) -> TokenClient<'_> {
		TokenClient::new(&self.wallet, self.config.token.address)
	}

	/// Refuses to sign while the wallet points at another chain; the
	/// signature would be bound to the wrong domain.
	async fn ensure_chain(&self) -> Result<(), AppError> {
		let expected = self.config.chain.chain_id;
		let actual = self.wallet.chain_id().await?;
		if actual != expected {
			return Err(AppError::ChainMismatch { expected, actual });
		}
		Ok(())
	}

	fn deadline(&self) -> u64 {
		current_timestamp() + self.config.signing.deadline_seconds
	}

	/// Asks the wallet to add the configured chain.
	pub async fn add_chain(&self) -> Result<ChainDescriptor, AppError> {
		let chain = self.config.chain.descriptor();
		self.wallet.add_chain(&chain).await?;
		Ok(chain)
	}

	/// Asks the wallet to track the token. Returns whether the user accepted.
	pub async fn watch_token(&self) -> Result<bool, AppError> {
		let accepted = self
			.wallet
			.watch_asset(&self.config.token.descriptor())
			.await?;
		if !accepted {
			tracing::warn!(token = %self.config.token.symbol, "Wallet declined to watch token");
		}
		Ok(accepted)
	}

	/// Checksummed token contract address.
	pub fn token_address(&self) -> String {
		self.config.token.address.to_checksum(None)
	}

	/// Authorization for sending `amount` base units to `to` from the wallet's
	/// primary account.
	///
	/// The nonce is read from the contract unless given. The deadline is
	/// `signing.deadline_seconds` from now.
	pub async fn authorization(
		&self,
		to: Address,
		amount: U256,
		nonce: Option<U256>,
	) -> Result<TransferAuthorization, AppError> {
		let from = self.wallet.primary_account().await?;
		let nonce = match nonce {
			Some(nonce) => nonce,
			None => self.token().nonces(from).await?,
		};
		Ok(TransferAuthorization {
			from,
			to,
			amount,
			nonce,
			deadline: self.deadline(),
		})
	}

	/// EIP-712 document the wallet is asked to sign for `auth`.
	pub fn typed_data(&self, auth: &TransferAuthorization) -> TypedDataDocument {
		self.builder.transfer(auth)
	}

	/// Has the wallet sign `auth` and packs the result for a QR code.
	pub async fn sign_transfer(
		&self,
		auth: &TransferAuthorization,
	) -> Result<SignedTransferPacket, AppError> {
		self.ensure_chain().await?;
		let document = self.typed_data(auth);
		let signature = self.wallet.sign_typed_data(auth.from, &document).await?;

		// A wallet signing a different domain would produce a packet the
		// contract rejects; catch it here.
		verify_document(&document, &signature, current_timestamp())?;

		let packet = SignedTransferPacket::new(auth, &signature);
		tracing::info!(
			from = %auth.from,
			to = %auth.to,
			amount = %auth.amount,
			nonce = %auth.nonce,
			"Signed transfer"
		);
		Ok(packet)
	}

	/// Reads a scanned payload and checks its deadline and signature.
	pub fn decode(&self, payload: &str) -> Result<DecodedTransfer, AppError> {
		let packet = decode_packet(payload)?;
		let authorization = packet.authorization()?;
		let signature = split_signature(&packet.signature)?;
		let signer = verify_document(
			&self.typed_data(&authorization),
			&packet.signature,
			current_timestamp(),
		)?;
		Ok(DecodedTransfer {
			packet,
			authorization,
			signature,
			signer,
		})
	}

	/// Submits a scanned transfer, paying gas from the wallet's primary account.
	pub async fn relay(&self, payload: &str) -> Result<B256, AppError> {
		let decoded = self.decode(payload)?;
		let relayer = self.wallet.primary_account().await?;
		let hash = self
			.token()
			.meta_transfer(relayer, &decoded.authorization, &decoded.signature)
			.await?;
		Ok(hash)
	}

	/// Plain token transfer from the wallet's primary account.
	pub async fn transfer(&self, to: Address, amount: U256) -> Result<B256, AppError> {
		let from = self.wallet.primary_account().await?;
		Ok(self.token().transfer(from, to, amount).await?)
	}

	/// Signs a `Permit` letting `spender` move `value` of the primary
	/// account's tokens, then submits it from the same account.
	pub async fn permit(
		&self,
		spender: Address,
		value: U256,
		nonce: Option<U256>,
	) -> Result<B256, AppError> {
		self.ensure_chain().await?;
		let owner = self.wallet.primary_account().await?;
		let nonce = match nonce {
			Some(nonce) => nonce,
			None => self.token().nonces(owner).await?,
		};
		let permit = PermitAuthorization {
			owner,
			spender,
			value,
			nonce,
			deadline: self.deadline(),
		};

		let document = self.builder.permit(&permit);
		let signature = self.wallet.sign_typed_data(owner, &document).await?;
		verify_document(&document, &signature, current_timestamp())?;
		let parts = split_signature(&signature)?;

		let hash = self
			.token()
			.permit(owner, owner, spender, value, permit.deadline, &parts)
			.await?;
		Ok(hash)
	}

	/// Token balance of `account` (the primary account if `None`), formatted
	/// with the token's decimals and symbol.
	pub async fn balance(&self, account: Option<Address>) -> Result<String, AppError> {
		let account = match account {
			Some(account) => account,
			None => self.wallet.primary_account().await?,
		};
		let balance = self.token().balance_of(account).await?;
		Ok(format!(
			"{} {}",
			format_token_amount(balance, self.config.token.decimals),
			self.config.token.symbol
		))
	}

	pub fn qr_terminal(&self, payload: &str) -> Result<String, AppError> {
		Ok(self.renderer.terminal(payload)?)
	}

	pub fn qr_svg(&self, payload: &str, path: &Path) -> Result<(), AppError> {
		Ok(self.renderer.save_svg(payload, path)?)
	}
}
