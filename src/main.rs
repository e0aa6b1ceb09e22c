use std::fs;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ots_lifecycle::config::LifecycleConfig;
use ots_lifecycle::explorer::EsploraClient;
use ots_lifecycle::extract;
use ots_lifecycle::resolver::BlockResolver;

#[derive(Parser)]
#[command(author, version, about = "Timestamp proof lifecycle tooling")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a default configuration file
    GenerateConfig {
        #[arg(short, long, default_value = "config/lifecycle.toml")]
        path: PathBuf,
    },
    /// Resolve block hash, height and time through the configured explorer
    Resolve {
        #[arg(short, long, default_value = "config/lifecycle.toml")]
        config: PathBuf,
        #[arg(long)]
        txid: Option<String>,
        #[arg(long)]
        height: Option<u64>,
        #[arg(long)]
        hash: Option<String>,
    },
    /// Extract a transaction id and block height from a proof description
    Extract {
        /// File holding the description text
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::GenerateConfig { path } => generate_config(path)?,
        Commands::Resolve {
            config,
            txid,
            height,
            hash,
        } => resolve(config, txid, height, hash).await?,
        Commands::Extract { file } => extract_file(file)?,
    }

    Ok(())
}

fn generate_config(path: PathBuf) -> Result<()> {
    let config = LifecycleConfig::default();
    config.save(&path)?;
    info!(?path, "wrote default configuration");
    Ok(())
}

async fn resolve(
    config_path: PathBuf,
    txid: Option<String>,
    height: Option<u64>,
    hash: Option<String>,
) -> Result<()> {
    if txid.is_none() && height.is_none() && hash.is_none() {
        return Err(anyhow!("pass at least one of --txid, --height or --hash"));
    }
    let config = if config_path.exists() {
        LifecycleConfig::load(&config_path)?
    } else {
        LifecycleConfig::default()
    };
    let explorer = EsploraClient::from_config(&config.explorer)?;
    info!(endpoint = %explorer.endpoint(), "resolving block metadata");
    let resolver = BlockResolver::new(explorer);

    let resolution = tokio::select! {
        resolution = resolver.resolve(txid.as_deref(), hash.as_deref(), height) => resolution,
        _ = signal::ctrl_c() => {
            info!("shutdown signal received");
            return Ok(());
        }
    };

    println!("{}", serde_json::to_string_pretty(&resolution)?);
    Ok(())
}

fn extract_file(path: PathBuf) -> Result<()> {
    let text = fs::read_to_string(&path)
        .with_context(|| format!("failed to read description from {}", path.display()))?;
    let found = extract::extract(Some(&text));
    println!("{}", serde_json::to_string_pretty(&found)?);
    Ok(())
}
