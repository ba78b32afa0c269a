use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;

use crate::scrapers::types::FeedKind;

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Run configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub crawler: CrawlerSettings,
    pub output: OutputSettings,
}

/// Crawl behaviour
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerSettings {
    /// Site root that search paths are appended to
    pub base_url: String,
    /// Identity header sent with every request
    pub user_agent: String,
    /// Upper bound on concurrent detail page fetches
    pub workers: usize,
    pub request_timeout_secs: u64,
    /// Pause between two listing pages of the same feed
    pub page_delay_ms: u64,
    /// Stop a feed after this many pages even if it still has links
    pub max_pages: Option<u32>,
    pub feeds: Vec<FeedKind>,
    pub concurrent_feeds: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputSettings {
    pub csv_path: PathBuf,
    pub json_path: Option<PathBuf>,
}

impl Settings {
    /// Load defaults, then `config/default.*`, then `config/{IMMO_SCOUT_ENV}.*`
    /// when that variable is set, then `IMMO_SCOUT__*` environment variables
    pub fn new() -> Result<Self, ConfigError> {
        let env = std::env::var("IMMO_SCOUT_ENV").ok();

        let mut builder = Self::defaults()?;
        for name in config_files(env.as_deref()) {
            builder = builder.add_source(File::with_name(&name).required(false));
        }

        builder
            .add_source(
                Environment::with_prefix("IMMO_SCOUT")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("crawler.feeds"),
            )
            .build()?
            .try_deserialize()
    }

    fn defaults() -> Result<config::builder::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        let feeds: Vec<String> = FeedKind::DEFAULT_FEEDS
            .iter()
            .map(|feed| feed.to_string())
            .collect();

        Config::builder()
            .set_default("crawler.base_url", "https://www.immoweb.be/en")?
            .set_default("crawler.user_agent", DEFAULT_USER_AGENT)?
            .set_default("crawler.workers", 10)?
            .set_default("crawler.request_timeout_secs", 30)?
            .set_default("crawler.page_delay_ms", 100)?
            .set_default("crawler.feeds", feeds)?
            .set_default("crawler.concurrent_feeds", false)?
            .set_default("output.csv_path", "properties.csv")
    }
}

/// Config file stems in load order, each read at most once
fn config_files(env: Option<&str>) -> Vec<String> {
    let mut files = vec!["config/default".to_string()];
    if let Some(env) = env.filter(|env| !env.is_empty() && *env != "default") {
        files.push(format!("config/{}", env));
    }
    files
}

impl CrawlerSettings {
    pub fn worker_count(&self) -> usize {
        self.workers.max(1)
    }
}

impl Default for CrawlerSettings {
    fn default() -> Self {
        Self {
            base_url: "https://www.immoweb.be/en".to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            workers: 10,
            request_timeout_secs: 30,
            page_delay_ms: 100,
            max_pages: None,
            feeds: FeedKind::DEFAULT_FEEDS.to_vec(),
            concurrent_feeds: false,
        }
    }
}
