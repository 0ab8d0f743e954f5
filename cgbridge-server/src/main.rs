//! cgbridge-server entry point.
//!
//! ```text
//! cgbridge-server                   Serve with ./cgbridge.toml (or defaults)
//! cgbridge-server --config <path>   Load a custom config TOML
//! cgbridge-server --gen-config      Write default config to stdout
//! cgbridge-server --phone <number>  Phone number for first-run login
//! cgbridge-server --no-autostart    Wait for POST /start
//! ```

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cgbridge_server::config::BridgeConfig;
use cgbridge_server::service::BridgeService;

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "cgbridge-server", about = "REST bridge to a live cloud-gaming session")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "cgbridge.toml")]
    config: PathBuf,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,

    /// Phone number for first-run login (without country prefix).
    #[arg(long)]
    phone: Option<String>,

    /// Do not start a session until `POST /start`.
    #[arg(long)]
    no_autostart: bool,
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // --gen-config: dump defaults and exit.
    if cli.gen_config {
        let text = toml::to_string_pretty(&BridgeConfig::default())?;
        println!("{text}");
        return Ok(());
    }

    let mut config = BridgeConfig::load(&cli.config);
    if let Some(phone) = cli.phone {
        config.session.phone_number = phone;
    }
    if cli.no_autostart {
        config.session.autostart = false;
    }

    // Init tracing.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    if config.logging.file.is_empty() {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    } else {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.logging.file)?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init();
    }

    info!("cgbridge-server v{}", env!("CARGO_PKG_VERSION"));
    info!("game: {}", config.session.game_id);
    info!("screen: {}x{}", config.session.width, config.session.height);
    info!("signaling: {}", config.signaling.url);

    let service = BridgeService::new(config);
    let stop = service.stop_handle();

    // Ctrl-C handler.
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Ctrl-C received, shutting down");
        stop.cancel();
    });

    service.run().await?;

    Ok(())
}
