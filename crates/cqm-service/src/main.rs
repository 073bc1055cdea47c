//! Command-line entry point for the CQM relay toolkit.
//!
//! Each subcommand is one user action: onboard the chain and token into a
//! wallet, sign a transfer into a QR payload, check and relay a scanned
//! payload through the token's `metaTransfer`, or send and permit tokens
//! directly from the wallet's account.

use clap::{Parser, Subcommand};
use cqm_config::Config;
use cqm_types::{parse_address, parse_u256, Address, U256};
use std::path::PathBuf;

mod app;

use app::{AppError, DecodedTransfer, RelayApp};

/// Command-line arguments for the `cqm` tool.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config.toml", env = "CQM_CONFIG")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "warn")]
	log_level: String,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Ask the wallet to add the configured chain
	AddChain,
	/// Ask the wallet to track the configured token
	WatchToken,
	/// Print the token contract address
	Address,
	/// Print the EIP-712 document a transfer would be signed as
	TypedData {
		#[command(flatten)]
		transfer: TransferArgs,
	},
	/// Sign a transfer and print its QR payload
	Sign {
		#[command(flatten)]
		transfer: TransferArgs,
		/// Also write the QR code as SVG
		#[arg(long)]
		svg: Option<PathBuf>,
		/// Also draw the QR code in the terminal
		#[arg(long)]
		show: bool,
	},
	/// Check a scanned payload and print its fields
	Decode { payload: String },
	/// Render a payload as a QR code
	Qr {
		payload: String,
		/// Write SVG here instead of drawing in the terminal
		#[arg(long)]
		svg: Option<PathBuf>,
	},
	/// Check a scanned payload and submit it with metaTransfer
	Relay { payload: String },
	/// Send tokens from the wallet's account
	Transfer {
		#[arg(value_parser = parse_address)]
		to: Address,
		/// Amount in base units
		#[arg(value_parser = parse_u256)]
		amount: U256,
	},
	/// Sign a permit for a spender and submit it
	Permit {
		#[arg(value_parser = parse_address)]
		spender: Address,
		/// Allowance in base units
		#[arg(value_parser = parse_u256)]
		value: U256,
		/// Nonce to sign; read from the contract when omitted
		#[arg(long, value_parser = parse_u256)]
		nonce: Option<U256>,
	},
	/// Print a token balance
	Balance {
		/// Account to query; defaults to the wallet's account
		#[arg(value_parser = parse_address)]
		account: Option<Address>,
	},
}

#[derive(clap::Args, Debug)]
struct TransferArgs {
	/// Recipient address
	#[arg(value_parser = parse_address)]
	to: Address,
	/// Amount in base units
	#[arg(value_parser = parse_u256)]
	amount: U256,
	/// Nonce to sign; read from the contract when omitted
	#[arg(long, value_parser = parse_u256)]
	nonce: Option<U256>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	use tracing_subscriber::{fmt, EnvFilter};

	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
	fmt()
		.with_env_filter(env_filter)
		.with_target(true)
		.with_writer(std::io::stderr)
		.init();

	let config = Config::from_file(&args.config).await?;
	tracing::info!(
		chain_id = config.chain.chain_id,
		token = %config.token.symbol,
		"Loaded configuration"
	);

	let app = RelayApp::from_config(config)?;
	if let Err(e) = run(&app, args.command).await {
		tracing::error!(error = %e, "Action failed");
		eprintln!("Error: {}", e);
		std::process::exit(1);
	}
	Ok(())
}

async fn run(app: &RelayApp, command: Command) -> Result<(), AppError> {
	match command {
		Command::AddChain => {
			let chain = app.add_chain().await?;
			println!("Added chain {} ({})", chain.chain_name, chain.chain_id);
		},
		Command::WatchToken => {
			if app.watch_token().await? {
				println!("Token added to wallet");
			} else {
				println!("Wallet did not add the token");
			}
		},
		Command::Address => println!("{}", app.token_address()),
		Command::TypedData { transfer } => {
			let auth = app
				.authorization(transfer.to, transfer.amount, transfer.nonce)
				.await?;
			println!("{}", app.typed_data(&auth).to_json_pretty());
		},
		Command::Sign {
			transfer,
			svg,
			show,
		} => {
			let auth = app
				.authorization(transfer.to, transfer.amount, transfer.nonce)
				.await?;
			let payload = app.sign_transfer(&auth).await?.encode();
			if let Some(path) = svg {
				app.qr_svg(&payload, &path)?;
			}
			if show {
				println!("{}", app.qr_terminal(&payload)?);
			}
			println!("{}", payload);
		},
		Command::Decode { payload } => print_decoded(&app.decode(&payload)?),
		Command::Qr { payload, svg } => match svg {
			Some(path) => app.qr_svg(&payload, &path)?,
			None => println!("{}", app.qr_terminal(&payload)?),
		},
		Command::Relay { payload } => {
			let hash = app.relay(&payload).await?;
			println!("Submitted {}", hash);
		},
		Command::Transfer { to, amount } => {
			let hash = app.transfer(to, amount).await?;
			println!("Submitted {}", hash);
		},
		Command::Permit {
			spender,
			value,
			nonce,
		} => {
			let hash = app.permit(spender, value, nonce).await?;
			println!("Submitted {}", hash);
		},
		Command::Balance { account } => println!("{}", app.balance(account).await?),
	}
	Ok(())
}

fn print_decoded(decoded: &DecodedTransfer) {
	let auth = &decoded.authorization;
	let deadline = chrono::DateTime::from_timestamp(auth.deadline as i64, 0)
		.map(|time| time.to_rfc3339())
		.unwrap_or_else(|| auth.deadline.to_string());

	println!("from:      {}", auth.from);
	println!("to:        {}", auth.to);
	println!("amount:    {}", auth.amount);
	println!("nonce:     {}", auth.nonce);
	println!("deadline:  {}", deadline);
	println!("v:         {}", decoded.signature.v);
	println!("r:         {}", decoded.signature.r);
	println!("s:         {}", decoded.signature.s);
	println!("signer:    {}", decoded.signer);
	println!("payload:   {}", decoded.packet);
}
