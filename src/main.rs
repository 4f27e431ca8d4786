use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use apt_cache_proxy::config::ProxyConfig;
use apt_cache_proxy::{tracing as proxy_tracing, AppState};

#[derive(Parser)]
#[command(name = "apt-cache-proxy", about = "Caching reverse proxy for APT repository mirrors")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Override the configured listen address; may be repeated for multiple listeners.
    #[arg(short, long)]
    listen: Vec<SocketAddr>,
}

#[tokio::main]
async fn main() -> ExitCode {
    proxy_tracing::init_tracing();

    let args = Args::parse();

    let mut config = match ProxyConfig::load(&args.config) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("failed to load configuration from {}: {err}", args.config.display());
            return ExitCode::FAILURE;
        }
    };

    if !args.listen.is_empty() {
        config.listen = args.listen;
    }

    let state = match AppState::new(config) {
        Ok(state) => Arc::new(state),
        Err(err) => {
            eprintln!("failed to initialize cache directories: {err}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(err) = apt_cache_proxy::serve(state).await {
        eprintln!("server error: {err}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
