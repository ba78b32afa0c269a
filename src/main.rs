use anyhow::Context;
use immo_scout::scrapers::{ImmowebScraper, SearchEndpoint};
use immo_scout::{CrawlState, Crawler, Settings};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("🏠 Immo Scout - Immoweb listing crawler");
    info!("========================================");

    let settings = Settings::new().context("Failed to load configuration")?;

    let scraper = ImmowebScraper::new(&settings.crawler).context("Failed to create HTTP client")?;
    let endpoint =
        SearchEndpoint::parse(&settings.crawler.base_url).context("Invalid crawler.base_url")?;
    let crawler = Crawler::new(scraper, endpoint, settings.crawler.clone());

    let state = CrawlState::new();
    let report = crawler.run(&state).await;
    report.log_summary();

    let table = state
        .finish()
        .context("Collected records do not share one column set")?;

    info!("✅ Collected {} unique properties", table.rows.len());

    table
        .save_csv(&settings.output.csv_path)
        .with_context(|| format!("Failed to write {}", settings.output.csv_path.display()))?;
    info!("💾 Saved properties to {}", settings.output.csv_path.display());

    if let Some(json_path) = &settings.output.json_path {
        table
            .save_json(json_path)
            .with_context(|| format!("Failed to write {}", json_path.display()))?;
        info!("💾 Saved properties to {}", json_path.display());
    }

    Ok(())
}
