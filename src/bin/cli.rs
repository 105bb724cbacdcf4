//! JOBO Bot CLI
//!
//! Scrapes the configured ticket sources once and announces new or changed
//! events on Telegram. Meant to be run periodically (cron, systemd timer).

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use jobo_bot::{
    config::{load_config, load_validated},
    error::Result,
    models::Config,
    notify::{Dispatcher, TelegramSink},
    pipeline,
    sources,
    storage::LocalStorage,
    utils::http,
};

/// JOBO Bot - ticket listing watcher
#[derive(Parser, Debug)]
#[command(
    name = "jobo-bot",
    version,
    about = "Announces new and changed JOBO events on Telegram"
)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "data/config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scrape all sources, update the store and notify
    Run,

    /// Show what a run would send, without sending or storing anything
    Preview,

    /// Validate the configuration file
    Validate,

    /// Show event store info
    Info,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Run => {
            let config = load_validated(&cli.config)?;
            log::info!("Loaded configuration from {}", cli.config.display());

            let store = LocalStorage::open(&config.store.path).await?;
            log::info!("Event store: {}", store.path().display());
            let client = http::create_async_client(&config.http)?;
            let sources = sources::build_sources(&config, &client);
            if sources.is_empty() {
                log::warn!("No sources enabled, nothing to do");
                return Ok(());
            }

            let sink = TelegramSink::new(&config.telegram)?;
            let mut dispatcher = Dispatcher::from_config(sink, &config);
            let summary = pipeline::run_once(&sources, &store, &mut dispatcher).await?;

            if dispatcher.escalations() > 0 {
                log::warn!("{} problems reported to the operator", dispatcher.escalations());
            }
            log::info!(
                "{} Telegram calls, {} extended pauses",
                dispatcher.limiter().calls(),
                dispatcher.limiter().extended_pauses()
            );
            if !summary.has_news() {
                log::info!("Nothing new");
            }
        }

        Command::Preview => {
            let config = load_config(&cli.config)?;
            let store = LocalStorage::open(&config.store.path).await?;
            let client = http::create_async_client(&config.http)?;
            let sources = sources::build_sources(&config, &client);

            let items = pipeline::run_preview(&sources, &store).await?;
            if items.is_empty() {
                println!("Nothing new.");
            }
            for item in &items {
                println!("[{}] {} ({})", item.kind, item.event, item.source);
                if !item.changed_fields.is_empty() {
                    println!("  changed: {}", item.changed_fields.join(", "));
                }
                if let Some(photo) = &item.message.photo_url {
                    println!("  photo: {photo}");
                }
                for line in item.message.body.lines() {
                    println!("  | {line}");
                }
                println!();
            }
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            let config = match load_validated(&cli.config) {
                Ok(config) => config,
                Err(e) => {
                    log::error!("Config validation failed: {}", e);
                    return Err(e);
                }
            };
            log::info!("✓ Config OK");
            for source in config.enabled_sources() {
                log::info!("  source enabled: {}", source.kind());
            }
        }

        Command::Info => {
            let config = Config::load_or_default(&cli.config);
            let path = &config.store.path;
            log::info!("Event store: {}", path.display());

            if !path.exists() {
                log::info!("No events stored yet.");
                return Ok(());
            }

            let data = LocalStorage::new(path).load().await?;
            let delivered = data
                .events
                .iter()
                .filter(|r| r.event.message_id.is_some())
                .count();
            let sold_out = data.events.iter().filter(|r| r.event.is_sold_out()).count();

            log::info!("Events: {}", data.count);
            log::info!("  announced: {}", delivered);
            log::info!("  not announced: {}", data.events.len() - delivered);
            log::info!("  sold out: {}", sold_out);
            log::info!("Last updated: {}", data.updated_at);
        }
    }

    Ok(())
}
