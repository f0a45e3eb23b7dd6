//! toolgate server binary.
//!
//! Usage:
//!   toolgate
//!   toolgate --config-dir ./config --port 8080

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use toolgate::{App, AppContext, ConfigBuilder};

#[derive(Parser, Debug)]
#[command(name = "toolgate")]
#[command(version)]
#[command(about = "API-key gated web search and URL scraping server", long_about = None)]
struct Cli {
    /// Directory holding web_search.yaml and url_scraper.yaml
    #[arg(long, env = "TOOLGATE_CONFIG_DIR")]
    config_dir: Option<PathBuf>,

    /// Address to bind (overrides TOOLGATE_HOST)
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on (overrides TOOLGATE_PORT)
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut builder = ConfigBuilder::new().from_env();
    if let Some(dir) = cli.config_dir {
        builder = builder.with_config_dir(dir);
    }
    if let Some(host) = cli.host {
        builder = builder.with_host(host);
    }
    if let Some(port) = cli.port {
        builder = builder.with_port(port);
    }
    let config = builder.build()?;

    toolgate::init_tracing_with_config(&config);
    tracing::info!(
        web_search_limit = config.tools.web_search.rate_limit.max_requests,
        web_search_window_secs = config.tools.web_search.rate_limit.time_window_seconds,
        url_scraper_limit = config.tools.url_scraper.rate_limit.max_requests,
        url_scraper_window_secs = config.tools.url_scraper.rate_limit.time_window_seconds,
        api_key_configured = config.auth.api_key.is_some(),
        "Starting toolgate"
    );

    let context = AppContext::from_config(&config)?;
    App::builder()
        .with_config(config)
        .with_context(context)
        .with_tool_routes()
        .build()
        .serve()
        .await?;

    Ok(())
}
