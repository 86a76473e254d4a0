use anyhow::Result;
use arc_swap::ArcSwap;
use chatgate_config::{Config, ConfigWatcher, LogConfig, LogFormat};
use chatgate_proxy::AppState;
use clap::{Parser, Subcommand};
use std::{path::PathBuf, sync::Arc};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "chatgate", about = "chatgate — chat streaming gateway for the worker editor")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the gateway server.
    Serve {
        /// Path to the YAML configuration file. Watched for changes.
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,
        /// Override the listening port (default: 7000).
        #[arg(short, long)]
        port: Option<u16>,
        /// Override the listening address (default: 127.0.0.1).
        #[arg(long)]
        host: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config, port, host } => cmd_serve(config, port, host).await,
    }
}

fn init_tracing(log: &LogConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match log.format {
        LogFormat::Pretty => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

async fn cmd_serve(
    config_path: Option<PathBuf>,
    port: Option<u16>,
    host: Option<String>,
) -> Result<()> {
    let (config, watcher) = if let Some(path) = config_path {
        let watcher =
            Arc::new(ConfigWatcher::new(path).map_err(|e| anyhow::anyhow!("config error: {e}"))?);
        (watcher.arc(), Some(watcher))
    } else {
        let config = Config::from_env().map_err(|e| anyhow::anyhow!("config error: {e}"))?;
        (Arc::new(ArcSwap::from_pointee(config)), None)
    };

    let snapshot = config.load_full();
    init_tracing(&snapshot.log);
    if let Some(watcher) = watcher {
        watcher.watch();
    }

    let addr = format!(
        "{}:{}",
        host.as_deref().unwrap_or(&snapshot.host),
        port.unwrap_or(snapshot.port)
    );
    let state = AppState::new(config);
    let app = chatgate_proxy::make_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(
        addr = %addr,
        model = %snapshot.chat.default_model,
        transcription = snapshot.transcription.api_key.is_some(),
        "chatgate listening"
    );
    axum::serve(listener, app).await?;
    Ok(())
}
