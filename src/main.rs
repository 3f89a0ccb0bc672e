use std::process::ExitCode;

use chrono::Utc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use price_scraper::{fetch_prices, FetchOutcome, NextEnergyScraper, ScraperConfig};

#[tokio::main]
async fn main() -> ExitCode {
    // ログ設定
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match ScraperConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut scraper = NextEnergyScraper::new(config.clone());

    match fetch_prices(&config, &mut scraper, Utc::now()).await {
        Ok(FetchOutcome::Skipped { tomorrow }) => {
            info!("Nothing to do, prices for {} already stored", tomorrow);
            ExitCode::SUCCESS
        }
        Ok(FetchOutcome::NoData { captured }) => {
            info!("Finished without new prices ({} response(s) captured)", captured);
            ExitCode::SUCCESS
        }
        Ok(FetchOutcome::Saved { days, records, .. }) => {
            info!("Saved {} records for {:?}", records, days);
            ExitCode::SUCCESS
        }
        Err(e) if e.is_session_failure() => {
            error!("Browser session failed: {}", e);
            ExitCode::FAILURE
        }
        Err(e) => {
            error!("Price fetch failed: {}", e);
            ExitCode::FAILURE
        }
    }
}
