use anyhow::Result;
use colored::Colorize;
use nse_live_premiums::{api_server_axum, logging, AppConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::from_env();
    logging::init_logging(&config.log_dir)?;
    config.validate()?;

    println!("{}", "=".repeat(60).blue());
    println!("{}", "NSE Live Premiums".green().bold());
    println!("{}", "=".repeat(60).blue());
    println!("{} Symbol: {}", "→".cyan(), config.symbol.yellow());
    println!(
        "{} Cache TTL: {}s, refresh every {}s",
        "→".cyan(),
        config.cache_ttl.as_secs(),
        config.refresh_interval.as_secs()
    );
    println!("🚀 Server running → http://{}:{}", config.host, config.port);
    println!("📋 Available endpoints:");
    println!("   GET  /fetch-live?sellCall=26500&sellPut=25900&hedgeCall=27500&hedgePut=24900&expiry=20250227");
    println!("   GET  /fetch-premiums?call=26500&put=25900");
    println!();

    api_server_axum::start_server(&config).await
}
