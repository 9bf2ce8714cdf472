//! TenantVault server
//!
//! Routes every request to the storage of the tenant named in `X-User-ID`.
//!
//! Usage:
//! ```bash
//! # With config file
//! tenantvault-server --config config.yaml
//!
//! # Environment variables override the file, flags override both
//! TENANTVAULT_STORAGE_BACKEND=local TENANTVAULT_STORAGE_ROOT=./data \
//!   tenantvault-server --config config.yaml --port 9000
//!
//! # Print the effective configuration and exit
//! tenantvault-server --config config.yaml check-config
//! ```
//!
//! Test with:
//! ```bash
//! curl -H "X-User-ID: alice" -F key=notes.txt -F file=@notes.txt \
//!   http://localhost:8787/files
//! curl -H "X-User-ID: alice" "http://localhost:8787/files?key=notes.txt"
//! curl -H "X-User-ID: alice" -H "Content-Type: application/json" \
//!   -d '{"key":"theme","value":"dark"}' http://localhost:8787/data
//! curl -H "X-User-ID: alice" http://localhost:8787/stats
//! ```

mod app;
mod config;

use anyhow::Context;
use clap::{Parser, Subcommand};
use config::{LogFormat, LoggingConfig, ServerConfig};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// TenantVault - per-tenant file and data storage behind one HTTP endpoint
#[derive(Parser)]
#[command(name = "tenantvault-server")]
#[command(about = "Multi-tenant storage dispatcher", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to configuration file (YAML or TOML)
    #[arg(
        short,
        long,
        value_name = "FILE",
        env = "TENANTVAULT_CONFIG",
        global = true
    )]
    config: Option<String>,

    /// Address to bind (overrides config and TENANTVAULT_HOST)
    #[arg(long, value_name = "HOST", global = true)]
    host: Option<String>,

    /// Port to bind (overrides config and TENANTVAULT_PORT)
    #[arg(short, long, value_name = "PORT", global = true)]
    port: Option<u16>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server (default if no command specified)
    Serve,
    /// Load and validate the configuration, then print it
    CheckConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => ServerConfig::from_file(path)?,
        None => ServerConfig::default(),
    };
    config.merge_env();
    if let Some(host) = cli.host {
        config.host = host;
    }
    if let Some(port) = cli.port {
        config.port = port;
    }
    config.validate().context("invalid configuration")?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(config).await,
        Commands::CheckConfig => check_config(&config),
    }
}

fn check_config(config: &ServerConfig) -> anyhow::Result<()> {
    let rendered = serde_yaml::to_string(config).context("failed to render configuration")?;
    println!("# configuration is valid\n{}", rendered);
    Ok(())
}

/// `RUST_LOG` wins over the configured level when set
fn init_logging(logging: &LoggingConfig) -> anyhow::Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&logging.level)
            .with_context(|| format!("invalid log level '{}'", logging.level))?,
    };

    match logging.format {
        LogFormat::Text => {
            let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        LogFormat::Json => {
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter)
                .json()
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }
    Ok(())
}

async fn serve(config: ServerConfig) -> anyhow::Result<()> {
    init_logging(&config.logging)?;

    info!("Initializing TenantVault");
    let app = app::build_app(&config)?;

    let listener = TcpListener::bind((config.host.as_str(), config.port))
        .await
        .with_context(|| format!("failed to bind {}:{}", config.host, config.port))?;
    let addr = listener.local_addr()?;

    info!("✅ TenantVault listening on http://{}", addr);
    info!("   Tenant API:  http://{}/ (requires X-User-ID)", addr);
    info!("   Health:      http://{}/healthz", addr);
    info!("   Readiness:   http://{}/readyz", addr);
    info!("   Metrics:     http://{}/metrics", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("TenantVault stopped");
    Ok(())
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, draining in-flight requests");
}
