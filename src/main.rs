//! Duck Search: a small web front-end for DuckDuckGo
//!
//! This is the main entry point for the application.

use anyhow::Result;
use duck_search::{
    config,
    gateway::DuckDuckGo,
    network::HttpClient,
    web::{create_router, AppState},
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, reload, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging; the filter is swapped once settings are known
    let from_env = EnvFilter::try_from_default_env().ok();
    let explicit_filter = from_env.is_some();
    let (filter, filter_handle) =
        reload::Layer::new(from_env.unwrap_or_else(|| EnvFilter::new("info")));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .init();

    let mut config_path = None;
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                print_usage();
                return Ok(());
            }
            "-V" | "--version" => {
                println!("duck-search {}", duck_search::VERSION);
                return Ok(());
            }
            "-c" | "--config" => match args.next() {
                Some(path) => config_path = Some(PathBuf::from(path)),
                None => anyhow::bail!("--config needs a file argument"),
            },
            other => anyhow::bail!("unknown argument: {} (see --help)", other),
        }
    }

    // Load configuration
    let settings = match config_path {
        Some(path) => config::load_file(path)?,
        None => config::load()?,
    };

    // RUST_LOG takes precedence over the debug flag
    if settings.general.debug && !explicit_filter {
        if let Err(e) = filter_handle.modify(|filter| *filter = EnvFilter::new("debug")) {
            warn!("Could not enable debug logging: {}", e);
        }
    }

    info!("Starting Duck Search v{}", duck_search::VERSION);
    info!("Loaded configuration for instance: {}", settings.general.instance_name);

    // Initialize HTTP client
    let client = HttpClient::with_settings(&settings.outgoing)?;
    let gateway = Arc::new(DuckDuckGo::new(client, &settings.outgoing.duckduckgo));
    info!("Search gateway initialized");

    // Create application state
    let addr = SocketAddr::new(settings.server.bind_address.parse()?, settings.server.port);
    let state = AppState::new(settings, gateway)?;

    let app = create_router(state);

    info!("Starting server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Print usage information
fn print_usage() {
    println!(
        r#"
Duck Search v{}
A small web front-end for DuckDuckGo with result filtering and CSV/Excel export

USAGE:
    duck-search [OPTIONS]

OPTIONS:
    -c, --config <FILE>    Path to configuration file
    -h, --help             Print help information
    -V, --version          Print version information

ENVIRONMENT VARIABLES:
    DUCK_SEARCH_SETTINGS_PATH  Path to settings.yml
    DUCK_SEARCH_DEBUG          Enable debug logging (true/false)
    DUCK_SEARCH_PORT           Server port
    DUCK_SEARCH_BIND_ADDRESS   Bind address
    DUCK_SEARCH_REGION         Default region (primary_locale/global)
    RUST_LOG                   Log filter, overrides the debug setting
"#,
        duck_search::VERSION
    );
}
