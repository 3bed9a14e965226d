//! Herald CLI
//!
//! Relays notification events from an NDJSON stream to a Telegram bot.

mod logging;
mod resolver;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use herald_config::Config;
use herald_event::Event;
use herald_telegram::{BotApi, Dispatcher, HttpMediaFetcher};
use resolver::ConfigResolver;
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "herald")]
#[command(about = "Relay notification events to a Telegram bot", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long)]
    config: Option<String>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Relay events from an NDJSON file, or stdin with "-"
    Run {
        /// Event stream path
        #[arg(default_value = "-")]
        events: String,
    },

    /// Validate the configured bot token against the Bot API
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    let log_level = config
        .core
        .log_level
        .clone()
        .unwrap_or_else(|| cli.log_level.clone());
    let data_dir = data_dir(&config)?;
    logging::init_logging(&data_dir.join("logs"), &log_level)?;

    match cli.command {
        Commands::Run { events } => run(&config, &events).await,
        Commands::Check => check(&config).await,
    }
}

fn load_config(path: Option<&str>) -> Result<Config> {
    let path = path
        .map(PathBuf::from)
        .or_else(Config::default_path)
        .context("no config path available")?;
    Config::load(&path).with_context(|| format!("loading config from {}", path.display()))
}

fn data_dir(config: &Config) -> Result<PathBuf> {
    if let Some(dir) = &config.core.data_dir {
        return Ok(PathBuf::from(dir));
    }
    dirs::data_dir()
        .map(|dir| dir.join("herald"))
        .context("no data directory available")
}

fn bot_api(config: &Config) -> BotApi {
    let mut api = BotApi::new(&config.telegram.bot_token);
    if let Some(base) = &config.telegram.api_base {
        api = api.with_api_base(base);
    }
    api
}

async fn run(config: &Config, events_path: &str) -> Result<()> {
    let raw = if events_path == "-" {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("reading events from stdin")?;
        buffer
    } else {
        std::fs::read_to_string(events_path)
            .with_context(|| format!("reading events from {}", events_path))?
    };

    let events = Event::from_ndjson(&raw)?;
    if events.is_empty() {
        info!("no events to relay");
        return Ok(());
    }

    let fetcher = HttpMediaFetcher::new(config.telegram.fetch_timeout_secs.unwrap_or(180));
    let resolver = Arc::new(ConfigResolver::from_config(&config.telegram));
    let dispatcher = Dispatcher::new(bot_api(config), fetcher, resolver);

    let reports = dispatcher.process(&events).await;

    let delivered = reports.iter().filter(|r| r.succeeded()).count();
    let diagnostics: usize = reports.iter().map(|r| r.errors.len()).sum();
    info!(
        events = reports.len(),
        delivered,
        diagnostics,
        "relay batch finished"
    );

    Ok(())
}

async fn check(config: &Config) -> Result<()> {
    if bot_api(config).get_me().await? {
        println!("Bot token is valid");
        Ok(())
    } else {
        anyhow::bail!("Bot API rejected the configured token");
    }
}
