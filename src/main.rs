mod config;
mod fetcher;
mod matcher;
mod model;
mod normalizer;
mod parser;
mod pipeline;
mod report;
mod roster;
mod storage;

use config::load_config;
use fetcher::HttpFetcher;
use storage::SqliteStorage;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG_PATH: &str = "config.json";

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Set panic hook to log details about any panic
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("😱 Panic occurred: {:?}", panic_info);
    }));

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = match load_config(&config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Config load error ({}): {}", config_path, e);
            std::process::exit(1);
        }
    };

    let fetcher = match HttpFetcher::new(
        &config.user_agent,
        config.request_timeout(),
        config.request_interval(),
    ) {
        Ok(f) => f,
        Err(e) => {
            error!("Failed to create HTTP client: {}", e);
            std::process::exit(1);
        }
    };

    let storage = match SqliteStorage::new(&config.database_path.to_string_lossy()) {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to initialize storage: {}", e);
            std::process::exit(1);
        }
    };

    info!("Catalog: {}", config.catalog_host);
    info!("Stages: {:?}", config.stages);
    if let Some(limit) = config.limit {
        info!("Limit: {} items per stage", limit);
    }

    match pipeline::run(&config, &fetcher, &storage).await {
        Ok(summary) => {
            info!("✅ Workflow completed: {:?}", summary);
            if summary.scrape_failures + summary.search_failures + summary.check_failures > 0 {
                warn!(
                    "{} scrapes, {} searches and {} availability checks failed",
                    summary.scrape_failures, summary.search_failures, summary.check_failures
                );
            }
        }
        Err(e) => {
            error!("❌ Workflow aborted: {}", e);
            std::process::exit(1);
        }
    }
}
