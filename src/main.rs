#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

use adrotor::api::AdsClient;
use adrotor::config::Config;
use adrotor::selector::HeadlineSelector;
use adrotor::store::OutcomeStore;
use adrotor::{daemon, rotation};
use anyhow::Result;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// `adrotor` - headline rotation for rejected Snapchat ads.
#[derive(Parser, Debug)]
#[command(name = "adrotor")]
#[command(version = "0.1.0")]
#[command(about = "Rotates headlines on active, review-rejected ad creatives.", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Execute exactly one rotation cycle and exit
    Run,

    /// Run rotation cycles on a fixed interval until shutdown
    Daemon,

    /// Print the outcome audit trail for one creative
    History {
        /// Creative identifier to look up
        creative_id: String,
    },

    /// Write a default config.toml and exit
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let cli = Cli::parse();
    let mut config = Config::load_or_init()?;
    config.apply_env_overrides();

    match cli.command {
        Commands::Run => run_once(config).await,
        Commands::Daemon => daemon::run(config).await,
        Commands::History { creative_id } => print_history(&config, &creative_id).await,
        Commands::Init => {
            println!("Config written to {}", config.config_path.display());
            Ok(())
        }
    }
}

async fn run_once(config: Config) -> Result<()> {
    config.validate()?;
    let client = AdsClient::new(&config);
    let store = OutcomeStore::open(&config.store_path()).await?;
    let mut selector = HeadlineSelector::new(config.corpus_path());
    let cancel = CancellationToken::new();

    rotation::cycle::run_cycle(&config, &client, &store, &mut selector, &cancel).await;
    Ok(())
}

async fn print_history(config: &Config, creative_id: &str) -> Result<()> {
    let store = OutcomeStore::open(&config.store_path()).await?;
    let records = store.history(creative_id).await?;

    if records.is_empty() {
        println!("No recorded outcomes for creative {creative_id}");
        return Ok(());
    }

    for record in records {
        let error = record.error_message.as_deref().unwrap_or("-");
        println!(
            "{}  {}  {:?} -> {:?}  {}",
            record.timestamp, record.status, record.prior_headline, record.new_headline, error
        );
    }
    Ok(())
}
