//! Adgate - HTTP gateway to Active Directory
//!
//! Exposes users, groups and organizational units over a small REST API
//! guarded by HMAC-signed requests.

use adgate_api::GatewayServer;
use adgate_core::config::{AdgateConfig, LoggingConfig};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "adgate")]
#[command(author = "Adgate Team")]
#[command(version = adgate_core::VERSION)]
#[command(about = "HTTP gateway to Active Directory", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Configuration file path
    #[arg(short, long, global = true, env = "ADGATE_CONFIG")]
    config: Option<String>,

    /// Bind address
    #[arg(long, env = "ADGATE_BIND_ADDRESS")]
    bind: Option<String>,

    /// Port number
    #[arg(short, long, env = "ADGATE_PORT")]
    port: Option<u16>,

    /// Shared HMAC secret
    #[arg(long, env = "ADGATE_SECRET", hide_env_values = true)]
    secret: Option<String>,

    /// LDAP server URL
    #[arg(long, env = "ADGATE_LDAP_URL")]
    ldap_url: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "ADGATE_LOG_LEVEL")]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the gateway (default)
    Server,

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    if let Some(Commands::Version) = cli.command {
        println!("adgate {}", adgate_core::VERSION);
        return Ok(());
    }

    let mut config = match &cli.config {
        Some(path) => {
            let mut config = AdgateConfig::from_file(path)?;
            config.apply_env();
            config
        }
        None => AdgateConfig::from_env(),
    };

    // Override with CLI args
    if let Some(bind) = cli.bind {
        config.server.bind_address = bind;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(secret) = cli.secret {
        config.auth.secret = secret;
    }
    if let Some(url) = cli.ldap_url {
        config.directory.url = url;
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }

    init_logging(&config.logging);
    run_server(config).await
}

fn init_logging(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let registry = tracing_subscriber::registry().with(filter);

    if logging.format.eq_ignore_ascii_case("json") {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().with_target(true)).init();
    }
}

async fn run_server(config: AdgateConfig) -> anyhow::Result<()> {
    info!("Starting Adgate {}", adgate_core::VERSION);
    info!(
        backend = ?config.directory.backend,
        url = %config.directory.url,
        base_dn = %config.directory.base_dn,
        "Directory"
    );

    let directory = adgate_directory::from_config(&config.directory);
    GatewayServer::new(config, directory).run().await?;

    Ok(())
}
