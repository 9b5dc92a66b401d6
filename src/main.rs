//! Crypto autobot - main entry point
//!
//! Wires everything together: config + credentials, the SQLite trade
//! ledger, the one-shot exchange-filter load (fatal if it fails), the
//! trading engine, and the dashboard API. Ctrl-C requests a cooperative
//! engine stop before the process exits.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crypto_autobot::api::{self, AppState};
use crypto_autobot::binance::{BinanceClient, Credentials};
use crypto_autobot::{BotEngine, Config, EventSink, TradeLedger};

#[derive(Parser, Debug)]
#[command(name = "crypto-autobot")]
#[command(about = "Automated Binance spot trading bot with a realtime dashboard API", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to JSON configuration file (defaults + .env otherwise)
    #[arg(short, long)]
    config: Option<String>,

    /// Dashboard API port (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Cycle interval in seconds (overrides config)
    #[arg(long)]
    interval: Option<u64>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn setup_logging(verbose: bool) -> Result<()> {
    std::fs::create_dir_all("logs")?;

    let log_filename = format!(
        "autobot_{}.log",
        chrono::Local::now().format("%Y-%m-%d_%H-%M-%S")
    );
    let log_path = PathBuf::from("logs").join(&log_filename);

    // filter out noisy HTTP internals
    let level = if verbose { "debug" } else { "info" };
    let filter_str = format!(
        "{},hyper=warn,hyper_util=warn,reqwest=warn,rustls=warn,h2=warn,tower_http=warn",
        level
    );
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));

    let file_appender = tracing_appender::rolling::never("logs", &log_filename);

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_line_number(true)
        .with_file(true)
        .with_ansi(true);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(file_appender)
        .with_target(true)
        .with_line_number(true)
        .with_file(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    info!("Logging initialized");
    info!("Log file: {}", log_path.display());

    Ok(())
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path))?,
        None => Config::from_env(),
    };
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(interval) = cli.interval {
        config.trading.cycle_seconds = interval;
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?;

    runtime.block_on(run_async(config))
}

async fn run_async(config: Config) -> Result<()> {
    // fatal before trading: no credentials, no bot
    let (api_key, api_secret) = config.require_credentials()?;
    let credentials = Credentials::new(api_key, api_secret);

    if config.exchange.testnet {
        info!("Running against the Binance spot TESTNET");
    } else {
        warn!("LIVE TRADING MODE - REAL MONEY AT RISK!");
    }

    let client = Arc::new(BinanceClient::new(
        credentials,
        config.exchange.testnet,
        Duration::from_secs(config.exchange.timeout_secs),
    ));

    let ledger = TradeLedger::open(&config.server.db_path)
        .context("Failed to open the trade ledger")?;
    info!("Trade ledger ready at {}", config.server.db_path);

    // fatal before trading: without step filters every order risks
    // rejection, so the bot refuses to start
    info!("Loading exchange filters from Binance...");
    let filters = client
        .load_exchange_filters()
        .await
        .context("Failed to load instrument filters; refusing to trade without them")?;

    let events = EventSink::new();
    let engine = BotEngine::new(client.clone(), ledger.clone(), events.clone(), filters, &config);

    engine.clone().start();
    info!(
        "Trading {} on a {}s cycle, {} bars of {} candles",
        config.trading.pairs.join(", "),
        config.trading.cycle_seconds,
        config.trading.lookback,
        config.trading.interval
    );

    let state = AppState {
        engine: engine.clone(),
        client,
        ledger,
        events,
    };

    tokio::select! {
        result = api::serve(state, config.server.port) => {
            result.context("Dashboard API server failed")?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl-C received, stopping the engine...");
            engine.stop();
        }
    }

    info!("Shutdown complete.");
    Ok(())
}
