//! # tally CLI entry point
//!
//! Parses command-line arguments, initializes logging, and dispatches to
//! subcommand handlers. Ctrl-C cancels the running command.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use tally_billing::CostCalculator;
use tally_cli::account::{
    run_commit, run_ledger, run_quote, run_register, QuoteArgs, UploadArgs, UserArgs,
};
use tally_cli::backend::{open_accountant, open_directory};
use tally_cli::command_context;
use tally_cli::config::TallyConfig;
use tally_cli::pricing::{run_cost, run_empty_ledger, CostArgs};

/// Deduplicated storage accounting for content-addressed uploads.
#[derive(Parser, Debug)]
#[command(name = "tally", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to a YAML configuration file.
    #[arg(long, global = true, env = "TALLY_CONFIG")]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Bytes an upload would newly cost a user, and the price.
    Quote(QuoteArgs),

    /// Record an upload in the user's ledger.
    Commit(UploadArgs),

    /// Price a known size on a tier.
    Cost(CostArgs),

    /// Print a user's current ledger.
    Ledger(UserArgs),

    /// Create a directory entry for a user.
    Register(UserArgs),

    /// Print the canonical empty ledger digest.
    EmptyLedger,
}

fn init_tracing(verbose: u8, json: bool) {
    let fallback = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn run(cli: Cli, shutdown: CancellationToken) -> Result<u8> {
    let mut out = std::io::stdout().lock();

    match &cli.command {
        Commands::Cost(args) => return run_cost(args, &mut out),
        Commands::EmptyLedger => return run_empty_ledger(&mut out),
        _ => {}
    }

    let config = TallyConfig::load(cli.config.as_deref())?;
    let ctx = command_context(config.timeout_secs, &shutdown);

    match &cli.command {
        Commands::Quote(args) => {
            let accountant = open_accountant(&config).await?;
            let calculator = CostCalculator::new(config.tier_table()?);
            run_quote(args, &accountant, &calculator, &ctx, &mut out).await
        }
        Commands::Commit(args) => {
            let accountant = open_accountant(&config).await?;
            run_commit(args, &accountant, &ctx, &mut out).await
        }
        Commands::Ledger(args) => {
            let accountant = open_accountant(&config).await?;
            run_ledger(args, &accountant, &ctx, &mut out).await
        }
        Commands::Register(args) => {
            let directory = open_directory(&config).await?;
            run_register(args, &directory, &mut out).await
        }
        Commands::Cost(_) | Commands::EmptyLedger => Ok(0),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);
    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "tally starting");

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, cancelling");
            signal.cancel();
        }
    });

    match run(cli, shutdown).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}
