use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tokio::net::TcpListener;

use platewise::{
    Client, MemoryStore, RedisStore,
    config::{PlatewiseConfig, StoreBackend},
    http::{self, AppState},
};

#[derive(Parser)]
#[command(name = "platewise")]
#[command(version)]
#[command(about = "Restaurant discovery and review API")]
#[command(subcommand_required = true, arg_required_else_help = true)]
struct Cli {
    #[command(flatten)]
    store: StoreArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct StoreArgs {
    /// Path to platewise.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Redis connection URL (overrides [redis] url)
    #[arg(long, env = "REDIS_URL", global = true)]
    redis_url: Option<String>,

    /// Keep everything in process memory instead of Redis
    #[arg(long, global = true)]
    memory: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    Serve {
        /// Address to listen on (overrides [server] bind)
        #[arg(long, env = "PLATEWISE_BIND")]
        bind: Option<String>,
    },

    /// Create the search index of every collection and exit
    EnsureIndexes,
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let cli = Cli::parse();
    if let Err(err) = execute(cli).await {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}

async fn execute(cli: Cli) -> Result<()> {
    let config = PlatewiseConfig::discover(cli.store.config.as_deref())?;
    let client = connect(&cli.store, &config).await?;
    client.ensure_indexes().await.context("Failed to create search indexes")?;

    match cli.command {
        Commands::Serve { bind } => {
            let address = bind.unwrap_or_else(|| config.server.bind.clone());
            log::info!("Binding to {address}");
            let listener = TcpListener::bind(&address)
                .await
                .with_context(|| format!("Failed to bind {address}"))?;
            let app = http::router(AppState::new(client)).layer(http::cors(config.server.cors_max_age()));
            http::serve(listener, app).await?;
        }
        Commands::EnsureIndexes => {
            println!("Search indexes are up to date");
        }
    }
    Ok(())
}

async fn connect(args: &StoreArgs, config: &PlatewiseConfig) -> Result<Client> {
    let prefix = config.store.key_prefix.clone();
    if args.memory || config.store.backend == StoreBackend::Memory {
        log::warn!("Using the in-memory store; data is lost on exit");
        return Ok(Client::new(Arc::new(MemoryStore::new()), prefix));
    }

    let url = match &args.redis_url {
        Some(url) => url.clone(),
        None => config.redis.resolved_url()?,
    };
    let store = RedisStore::connect(&url)
        .await
        .with_context(|| format!("Failed to connect to Redis at {url}"))?;
    log::info!("Connected to Redis");
    Ok(Client::new(Arc::new(store), prefix))
}
