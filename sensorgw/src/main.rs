//! sensorgw: entry point.
//!
//! ```text
//! sensorgw                    Connect using sensorgw.toml (or defaults)
//! sensorgw --config <path>    Load a custom config TOML
//! sensorgw --host h --port p  Override the application server address
//! sensorgw --gen-config       Write default config to stdout
//! sensorgw --gen-config <p>   Write default config to a file
//! ```
//!
//! Events are printed to stdout as JSON lines; requests are read from
//! stdin the same way. Logs go to stderr.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use sensorgw::config::GatewayConfig;
use sensorgw::relay::{TracingSink, forward_events, serve_until};
use sensorgw_core::GatewayClient;

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "sensorgw", about = "Sensor network gateway client")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "sensorgw.toml")]
    config: PathBuf,

    /// Application server host, overriding the config file.
    #[arg(long)]
    host: Option<String>,

    /// Application server port, overriding the config file.
    #[arg(long)]
    port: Option<u16>,

    /// Write the default configuration to PATH (stdout if omitted or "-")
    /// and exit.
    #[arg(long, value_name = "PATH", num_args = 0..=1, default_missing_value = "-")]
    gen_config: Option<PathBuf>,
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Some(path) = cli.gen_config {
        if path.as_os_str() == "-" {
            println!("{}", GatewayConfig::default_toml()?);
        } else {
            GatewayConfig::write_default(&path)?;
            println!("Default config written to {}.", path.display());
        }
        return Ok(());
    }

    let mut config = GatewayConfig::load(&cli.config);
    if let Some(host) = cli.host {
        config.appsrv.host = host;
    }
    if let Some(port) = cli.port {
        config.appsrv.port = port;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    info!("sensorgw v{}", env!("CARGO_PKG_VERSION"));
    info!("application server: {}", config.connection_info());

    let (handle, client) = GatewayClient::spawn(
        config.connection_info(),
        config.client_options(),
        Arc::new(TracingSink),
    );

    let events = tokio::spawn(forward_events(handle.subscribe(), tokio::io::stdout()));

    serve_until(tokio::io::stdin(), &handle, async {
        tokio::signal::ctrl_c().await.ok();
    })
    .await;
    info!("Ctrl-C received, shutting down");

    client.abort();
    events.abort();
    Ok(())
}
