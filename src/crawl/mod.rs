//! Crawl orchestration: feeds, pages, detail batches.

pub mod dedup;
pub mod driver;
pub mod pool;
pub mod report;

pub use dedup::Deduplicator;
pub use driver::PaginationDriver;
pub use pool::{BatchResult, FetchPool};
pub use report::{BatchStats, CrawlReport, FeedReport, FeedStop};

use futures::future::join_all;
use std::time::Duration;
use tracing::info;

use crate::error::SchemaError;
use crate::models::NormalizedRecord;
use crate::scrapers::immoweb::SearchEndpoint;
use crate::scrapers::traits::DocumentFetcher;
use crate::settings::CrawlerSettings;
use crate::sink::{RecordSink, SerializedTable};

/// Shared state of one run: the seen-URL set and the collected records
#[derive(Default)]
pub struct CrawlState {
    pub seen: Deduplicator,
    pub records: RecordSink<NormalizedRecord>,
}

impl CrawlState {
    pub fn new() -> Self {
        Self::default()
    }

    /// End the run and lay the collected records out as a table
    pub fn finish(self) -> Result<SerializedTable, SchemaError> {
        info!(
            "Closing crawl with {} unique links seen and {} records",
            self.seen.len(),
            self.records.len()
        );
        self.records.flush()
    }
}

/// Runs every configured feed against one site
pub struct Crawler<F> {
    fetcher: F,
    endpoint: SearchEndpoint,
    settings: CrawlerSettings,
}

impl<F: DocumentFetcher> Crawler<F> {
    pub fn new(fetcher: F, endpoint: SearchEndpoint, settings: CrawlerSettings) -> Self {
        Self {
            fetcher,
            endpoint,
            settings,
        }
    }

    /// Crawl all feeds into `state`.
    ///
    /// A feed that fails does not stop the others; its error is kept in the
    /// report.
    pub async fn run(&self, state: &CrawlState) -> CrawlReport {
        let pool = FetchPool::new(&self.fetcher, &state.seen, self.settings.worker_count());
        let driver = PaginationDriver::new(&self.fetcher, &self.endpoint, &pool, &state.records)
            .with_page_delay(Duration::from_millis(self.settings.page_delay_ms))
            .with_max_pages(self.settings.max_pages);

        info!(
            "Crawling {} feeds with {} workers{}",
            self.settings.feeds.len(),
            pool.workers(),
            if self.settings.concurrent_feeds {
                " (feeds in parallel)"
            } else {
                ""
            }
        );

        let mut report = CrawlReport::default();

        if self.settings.concurrent_feeds {
            let outcomes = join_all(self.settings.feeds.iter().map(|feed| driver.run_feed(*feed))).await;
            report.feeds = self.settings.feeds.iter().copied().zip(outcomes).collect();
        } else {
            for feed in &self.settings.feeds {
                let outcome = driver.run_feed(*feed).await;
                report.feeds.push((*feed, outcome));
            }
        }

        report
    }
}
