use alerter::FanoutNotifier;
use anyhow::Context;
use api_client::{CoinGeckoUniverse, SeriesSampler, build_sources};
use clap::{Parser, Subcommand};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Table};
use configuration::{Config, load_config};
use engine::Engine;
use ledger::LedgerStore;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// The main entry point for the Sentinel divergence scanner.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Secrets may live in a .env file; it is optional.
    if let Err(e) = dotenvy::dotenv()
        && !e.not_found()
    {
        eprintln!("Failed to read .env file: {e}");
    }

    // Parse command-line arguments
    let cli = Cli::parse();
    let config = load_config(&cli.config, cli.config_required())
        .with_context(|| format!("failed to load configuration from {}", cli.config.display()))?;
    let _log_guard = configuration::logging::init(&config.log)?;

    // Execute the appropriate command
    match cli.command {
        Commands::Run => handle_run(config).await,
        Commands::Status => handle_status(&config),
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Scans top coins for RSI divergences and tracks simulated leveraged positions.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, short, default_value = DEFAULT_CONFIG)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

const DEFAULT_CONFIG: &str = "config.toml";

impl Cli {
    /// The default file may be absent; an explicitly named one must exist.
    fn config_required(&self) -> bool {
        self.config != PathBuf::from(DEFAULT_CONFIG)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate open positions, scan for new entries and persist the ledger. Meant for a scheduler.
    Run,
    /// Print the ledger: balance, win/loss record and open positions.
    Status,
}

// ==============================================================================
// Command Logic
// ==============================================================================

/// Wires the live services into the engine and performs one run.
async fn handle_run(config: Config) -> anyhow::Result<()> {
    let timeout = Duration::from_secs(config.data.request_timeout_secs);

    let sources = build_sources(&config.data).context("failed to build market data sources")?;
    let sampler = SeriesSampler::new(sources, timeout);
    tracing::info!(venues = ?sampler.venues(), "Market data sources ready.");

    let client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .context("failed to build HTTP client")?;
    let universe = CoinGeckoUniverse::new(client, config.data.coingecko_url.clone(), &config.scanner.denylist);
    let notifier = FanoutNotifier::from_config(&config.alerts, timeout).context("failed to build notifiers")?;

    let engine = Engine::new(config, sampler, Arc::new(universe), Arc::new(notifier))?;
    let report = engine.run_once().await.context("run failed")?;

    println!("{}", report.summary.message());
    Ok(())
}

/// Renders the persisted ledger as a table.
fn handle_status(config: &Config) -> anyhow::Result<()> {
    let store = LedgerStore::new(config.ledger.path.clone());
    let Some(ledger) = store.read()? else {
        println!("No ledger at {} yet.", store.path().display());
        return Ok(());
    };

    println!(
        "Balance: {} | Wins: {} | Losses: {} | Open: {}",
        events::format_amount(ledger.balance),
        ledger.wins,
        ledger.losses,
        ledger.open_positions()
    );
    if ledger.positions.is_empty() {
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec![
        "Symbol", "Side", "Venue", "Entry", "Stop", "TP1", "TP2", "TP3", "Hit",
    ]);
    for (symbol, position) in &ledger.positions {
        let hit = match (position.tp1_hit(), position.tp2_hit()) {
            (true, true) => "TP1+TP2",
            (true, false) => "TP1",
            (false, true) => "TP2",
            (false, false) => "-",
        };
        table.add_row(vec![
            Cell::new(symbol),
            Cell::new(position.side()),
            Cell::new(position.venue()),
            Cell::new(events::format_price(position.entry())),
            Cell::new(events::format_price(position.stop_loss())),
            Cell::new(events::format_price(position.take_profit_1())),
            Cell::new(events::format_price(position.take_profit_2())),
            Cell::new(events::format_price(position.take_profit_3())),
            Cell::new(hit),
        ]);
    }
    println!("{table}");
    Ok(())
}
