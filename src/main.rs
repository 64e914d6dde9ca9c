use std::path::PathBuf;

use anyhow::Context;
use chartpng::ServerConfig;
use clap::Parser;
use tracing_subscriber::EnvFilter;

/// HTTP service that renders URL-encoded chart descriptions to PNG
#[derive(Parser, Debug)]
#[command(name = "chartpng")]
#[command(version)]
#[command(about = "Serve chart images over HTTP", long_about = None)]
struct Args {
    /// Server config file (TOML or YAML)
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Port to listen on (overrides PORT and the config file)
    #[arg(short, long)]
    port: Option<u16>,

    /// Address to bind
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => ServerConfig::load(path).map_err(anyhow::Error::msg)?,
        None => ServerConfig::default(),
    };
    let mut config = config
        .with_env_port(std::env::var("PORT").ok().as_deref())
        .map_err(anyhow::Error::msg)?;
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(bind) = args.bind {
        config.bind = bind;
    }

    chartpng::server::serve(config)
        .await
        .context("chart server failed")
}
