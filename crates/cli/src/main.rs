//! Command-line client for Canopy.

use anyhow::{Context, Result};
use canopy_core::{DagLayout, GatewayConfig, Multihash};
use canopy_gateway::{ChunkedStore, GatewayRegistry, GatewayRole};
use clap::{Args, Parser, Subcommand};
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "canopyctl")]
#[command(about = "Store and fetch content-addressed blocks through public gateways")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    config: ConfigArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone)]
struct ConfigArgs {
    /// Config file path
    #[arg(long, global = true, env = "CANOPY_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Store a file and print its address
    Put {
        /// File to store ("-" reads stdin)
        file: PathBuf,
        /// Also print a trusted gateway URL for the address
        #[arg(long, default_value_t = false)]
        url: bool,
    },
    /// Fetch the payload stored under an address
    Get {
        /// Base-58 address
        address: String,
        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Compute the address of a file without contacting any gateway
    Hash {
        /// File to hash ("-" reads stdin)
        file: PathBuf,
        /// Chunk size in bytes (overrides config)
        #[arg(long)]
        chunk_size: Option<usize>,
    },
    /// Print a trusted gateway URL for an address
    Url {
        /// Base-58 address
        address: String,
    },
    /// List configured gateways and their state
    Gateways,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so `get` can stream payloads on stdout
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let Cli { config, command } = Cli::parse();
    let config = load_config(config.config.as_deref())?;

    match command {
        Commands::Put { file, url } => handle_put(&config, &file, url).await,
        Commands::Get { address, output } => handle_get(&config, &address, output.as_deref()).await,
        Commands::Hash { file, chunk_size } => {
            handle_hash(&file, chunk_size.unwrap_or(config.chunk_size)).await
        }
        Commands::Url { address } => handle_url(&config, &address),
        Commands::Gateways => handle_gateways(&config),
    }
}

fn default_config_path() -> Option<PathBuf> {
    let base = match std::env::var_os("XDG_CONFIG_HOME") {
        Some(path) => PathBuf::from(path),
        None => PathBuf::from(std::env::var_os("HOME")?).join(".config"),
    };
    Some(base.join("canopy").join("config.toml"))
}

/// Load gateway configuration from a TOML file and `CANOPY_` env vars.
///
/// An explicit path must exist; the default path is optional.
fn load_config(explicit: Option<&Path>) -> Result<GatewayConfig> {
    let mut figment = Figment::new();

    match explicit {
        Some(path) => {
            if !path.exists() {
                anyhow::bail!("config file not found: {}", path.display());
            }
            figment = figment.merge(Toml::file(path));
        }
        None => {
            if let Some(path) = default_config_path().filter(|p| p.exists()) {
                tracing::debug!(path = %path.display(), "Loading config");
                figment = figment.merge(Toml::file(path));
            }
        }
    }

    figment = figment.merge(Env::prefixed("CANOPY_").split("__"));

    let config: GatewayConfig = figment
        .extract()
        .context("failed to load configuration")?;
    config.validate().context("invalid configuration")?;
    Ok(config)
}

async fn read_input(file: &Path) -> Result<Vec<u8>> {
    if file == Path::new("-") {
        let mut data = Vec::new();
        tokio::io::stdin()
            .read_to_end(&mut data)
            .await
            .context("failed to read stdin")?;
        return Ok(data);
    }
    tokio::fs::read(file)
        .await
        .with_context(|| format!("failed to read {}", file.display()))
}

fn parse_address(address: &str) -> Result<Multihash> {
    address
        .parse()
        .with_context(|| format!("invalid address: {address}"))
}

async fn handle_put(config: &GatewayConfig, file: &Path, url: bool) -> Result<()> {
    let data = read_input(file).await?;
    let store = ChunkedStore::from_config(config)?;

    let result = store.put(&data).await.context("put failed")?;
    tracing::info!(address = %result.address, bytes = data.len(), "Stored");

    println!("{}", result.address);
    if url {
        println!("{}", store.registry().trusted_url(&result.address)?);
    }
    Ok(())
}

async fn handle_get(config: &GatewayConfig, address: &str, output: Option<&Path>) -> Result<()> {
    let address = parse_address(address)?;
    let store = ChunkedStore::from_config(config)?;

    let data = store.get(&address).await.context("get failed")?;

    match output {
        Some(path) => {
            tokio::fs::write(path, &data)
                .await
                .with_context(|| format!("failed to write {}", path.display()))?;
            tracing::info!(address = %address, bytes = data.len(), path = %path.display(), "Fetched");
        }
        None => {
            let mut stdout = tokio::io::stdout();
            stdout.write_all(&data).await?;
            stdout.flush().await?;
        }
    }
    Ok(())
}

async fn handle_hash(file: &Path, chunk_size: usize) -> Result<()> {
    let data = read_input(file).await?;
    let layout = DagLayout::build(&data, chunk_size)?;
    println!("{}", layout.address());
    Ok(())
}

fn handle_url(config: &GatewayConfig, address: &str) -> Result<()> {
    let address = parse_address(address)?;
    let registry = GatewayRegistry::from_config(config)?;
    println!("{}", registry.trusted_url(&address)?);
    Ok(())
}

fn handle_gateways(config: &GatewayConfig) -> Result<()> {
    let registry = GatewayRegistry::from_config(config)?;
    println!(
        "Cooldown after failure: {}s",
        registry.cooldown().as_secs()
    );

    for role in [GatewayRole::Read, GatewayRole::TrustedRead, GatewayRole::Write] {
        println!("\n{role}:");
        let endpoints = registry.endpoints(role);
        if endpoints.is_empty() {
            println!("  (none)");
        }
        for status in endpoints {
            let state = if status.active { "active" } else { "cooling down" };
            println!("  {} [{state}]", status.url);
        }
    }
    Ok(())
}
