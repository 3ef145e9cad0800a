#![cfg(not(tarpaulin_include))]

use prodlog::app;
use prodlog::config::AppConfig;
use std::env;

/// Main entry point for the production log web server
///
/// Settings come from `PRODLOG_*` environment variables; the first command
/// line argument, when given, overrides the bind address.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut config = AppConfig::from_env();
    if let Some(bind_addr) = env::args().nth(1) {
        config = config.with_bind_addr(bind_addr);
    }

    app::run(config).await
}
