//! ExoSeekr backend - main entry point

use clap::Parser;
use exoseekr::server::{run_server, ServerConfig};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "exoseekr", about = "Exoplanet transit classification service")]
struct Cli {
    /// Bind address
    #[arg(long)]
    host: Option<String>,

    /// Bind port
    #[arg(short, long)]
    port: Option<u16>,

    /// Project root for relative data/model paths
    #[arg(long)]
    project_root: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "exoseekr=info,tower_http=info".into()),
        )
        .init();

    let cli = Cli::parse();

    let mut config = match cli.project_root {
        Some(root) => ServerConfig::with_project_root(root),
        None => ServerConfig::default(),
    };
    if let Some(host) = cli.host {
        config.host = host;
    }
    if let Some(port) = cli.port {
        config.port = port;
    }

    run_server(config).await
}
