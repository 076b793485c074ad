//! Token transfer CLI.
//!
//! ```text
//! token-transfer [--config transfer.toml] send --to 0x.. --amount 1.5
//! token-transfer status 0x<tx hash>
//! token-transfer check-network
//! ```
//!
//! The signing key is read from `TRANSFER_PRIVATE_KEY`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use token_transfer::blockchain::units::{format_units, parse_units};
use token_transfer::blockchain::LocalWallet;
use token_transfer::config::{load_config, TransferConfig};
use token_transfer::observability::{logging, metrics};
use token_transfer::status::{HttpStatusClient, PollOutcome, StatusPoller, StatusSource};
use token_transfer::transfer::{LifecycleState, TransferEvent, TransferLifecycle, TransferRequest};
use token_transfer::wallet::WalletProvider;

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "token-transfer")]
#[command(about = "Send ERC-20 tokens and follow them until they settle", long_about = None)]
struct Cli {
    /// TOML configuration file. Defaults plus environment overrides when absent.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send tokens and follow the transfer to completion
    Send {
        /// Recipient address (0x-prefixed)
        #[arg(long)]
        to: String,
        /// Human-readable amount, e.g. 1.5
        #[arg(long)]
        amount: String,
    },
    /// Follow an already broadcast transaction through the status backend
    Status {
        /// Transaction hash
        hash: String,
    },
    /// Connect the wallet and check it is on the expected network
    CheckNetwork,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    logging::init_logging(&config.observability.log_level);
    metrics::set_enabled(config.observability.metrics_enabled);

    tracing::info!(
        network = %config.network.display_name,
        chain_id = config.network.expected_chain_id,
        backend = %config.backend.base_url,
        "Configuration loaded"
    );

    let result = match cli.command {
        Commands::Send { to, amount } => send(config, to, amount).await,
        Commands::Status { hash } => status(config, hash).await,
        Commands::CheckNetwork => check_network(config).await,
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn build_lifecycle(config: TransferConfig) -> CliResult<Arc<TransferLifecycle>> {
    let wallet: Option<Arc<dyn WalletProvider>> = match LocalWallet::from_env(&config.network) {
        Ok(wallet) => Some(Arc::new(wallet)),
        Err(e) => {
            tracing::warn!(error = %e, "No wallet available");
            None
        }
    };
    let status: Arc<dyn StatusSource> = Arc::new(HttpStatusClient::from_config(&config.backend)?);

    Ok(TransferLifecycle::new(Arc::new(config), wallet, status)?)
}

async fn send(config: TransferConfig, to: String, amount: String) -> CliResult<bool> {
    let lifecycle = build_lifecycle(config)?;
    let connected = lifecycle.connect().await?;

    let decimals = connected.token.decimals;
    if let Some(warning) = &connected.warning {
        eprintln!("Warning: {}", warning);
    }
    if let Ok(units) = parse_units(&amount, decimals) {
        println!("Sending {} tokens to {}", format_units(units, decimals), to);
    }

    let mut events = lifecycle.events();
    let explorer = lifecycle.clone();
    let printer = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    if print_progress(&explorer, &event) {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Progress output fell behind");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
        explorer.record()
    });

    let submitted = tokio::select! {
        result = lifecycle.submit(TransferRequest::new(to, amount)) => result,
        _ = tokio::signal::ctrl_c() => {
            lifecycle.shutdown();
            printer.abort();
            eprintln!("Interrupted; the transaction may still settle.");
            return Ok(false);
        }
    };

    if let Err(e) = submitted {
        printer.abort();
        eprintln!("Error: {}", e);
        return Ok(false);
    }

    let record = tokio::select! {
        record = printer => record?,
        _ = tokio::signal::ctrl_c() => {
            lifecycle.shutdown();
            eprintln!("Interrupted; stopped following the transfer.");
            return Ok(false);
        }
    };

    lifecycle.shutdown();
    if let Some(error) = &record.last_error {
        eprintln!("Error: {}", error);
    }
    Ok(record.state == LifecycleState::Success)
}

/// Print one step. Returns true once the transfer has settled.
fn print_progress(lifecycle: &TransferLifecycle, event: &TransferEvent) -> bool {
    match event {
        TransferEvent::Started { .. } => false,
        TransferEvent::StateChanged { to, .. } => {
            println!("State: {}", to);
            to.is_terminal()
        }
        TransferEvent::Broadcast { tx_hash, .. } => {
            println!("Transaction: {}", lifecycle.config().explorer_tx_url(&tx_hash.to_string()));
            false
        }
        TransferEvent::Checked { attempt, status, .. } => {
            println!("Check {}: {}", attempt, status.as_deref().unwrap_or("<missing>"));
            false
        }
    }
}

async fn status(config: TransferConfig, hash: String) -> CliResult<bool> {
    let client: Arc<dyn StatusSource> = Arc::new(HttpStatusClient::from_config(&config.backend)?);
    let poller = StatusPoller::from_config(client, &config.backend);
    let cancel = CancellationToken::new();

    println!("Transaction: {}", config.explorer_tx_url(&hash));

    let outcome = tokio::select! {
        outcome = poller.poll(&hash, &cancel, |check| {
            let label = check.status.as_ref().map(|s| s.label().to_string());
            println!("Check {}: {}", check.attempt, label.as_deref().unwrap_or("<missing>"));
        }) => outcome,
        _ = tokio::signal::ctrl_c() => {
            cancel.cancel();
            None
        }
    };

    match outcome {
        Some(PollOutcome::Success) => {
            println!("State: success");
            Ok(true)
        }
        Some(PollOutcome::Failed) => {
            println!("State: failed");
            Ok(false)
        }
        Some(PollOutcome::Error(e)) => {
            println!("State: error");
            eprintln!("Error: {}", e);
            Ok(false)
        }
        None => {
            eprintln!("Interrupted.");
            Ok(false)
        }
    }
}

async fn check_network(config: TransferConfig) -> CliResult<bool> {
    let lifecycle = build_lifecycle(config)?;

    let result = lifecycle.connect().await;
    lifecycle.shutdown();

    match result {
        Ok(connected) => {
            let guard_name = &lifecycle.config().network.display_name;
            let account = connected
                .session
                .account
                .map(|a| a.to_string())
                .unwrap_or_default();
            println!("Connected to {} as {}", guard_name, account);
            println!("Token decimals: {}", connected.token.decimals);
            if let Some(warning) = &connected.warning {
                eprintln!("Warning: {}", warning);
            }
            Ok(true)
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            Ok(false)
        }
    }
}
