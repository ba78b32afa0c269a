use chrono::{DateTime, Utc};
use std::ops::AddAssign;
use tracing::{error, info};

use crate::error::CrawlError;
use crate::scrapers::types::FeedKind;

/// Counters for one batch of detail links
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchStats {
    /// Links found on the listing page
    pub discovered: usize,
    /// Links already admitted earlier in the run
    pub duplicates: usize,
    /// Detail pages retrieved successfully
    pub fetched: usize,
    /// Records produced
    pub extracted: usize,
    /// Admitted links that produced no record
    pub failed: usize,
}

impl AddAssign for BatchStats {
    fn add_assign(&mut self, other: Self) {
        self.discovered += other.discovered;
        self.duplicates += other.duplicates;
        self.fetched += other.fetched;
        self.extracted += other.extracted;
        self.failed += other.failed;
    }
}

/// Why a feed stopped paginating
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedStop {
    /// A listing page had no links
    Exhausted { empty_page: u32 },
    /// A listing page after the first could not be fetched
    PageFetchFailed { page: u32, reason: &'static str },
    /// The configured page cap was reached
    PageLimit { max_pages: u32 },
}

/// Outcome of one feed traversal
#[derive(Debug, Clone)]
pub struct FeedReport {
    pub feed: FeedKind,
    /// Listing pages fetched, including the final empty one
    pub pages: u32,
    pub stats: BatchStats,
    pub stop: FeedStop,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Per-feed outcomes of a whole run, in configured feed order
#[derive(Debug, Default)]
pub struct CrawlReport {
    pub feeds: Vec<(FeedKind, Result<FeedReport, CrawlError>)>,
}

impl CrawlReport {
    /// Counters summed over every feed that completed
    pub fn totals(&self) -> BatchStats {
        let mut totals = BatchStats::default();
        for (_, outcome) in &self.feeds {
            if let Ok(report) = outcome {
                totals += report.stats;
            }
        }
        totals
    }

    pub fn failed_feeds(&self) -> usize {
        self.feeds.iter().filter(|(_, outcome)| outcome.is_err()).count()
    }

    pub fn log_summary(&self) {
        for (feed, outcome) in &self.feeds {
            match outcome {
                Ok(report) => info!(
                    "{}: {} pages, {} discovered, {} duplicates, {} fetched, {} extracted, {} failed ({:?}, {}s)",
                    feed,
                    report.pages,
                    report.stats.discovered,
                    report.stats.duplicates,
                    report.stats.fetched,
                    report.stats.extracted,
                    report.stats.failed,
                    report.stop,
                    (report.finished_at - report.started_at).num_seconds(),
                ),
                Err(e) => error!("{}: feed aborted: {}", feed, e),
            }
        }

        let totals = self.totals();
        info!(
            "Run complete: {} extracted, {} failed, {} feeds aborted",
            totals.extracted,
            totals.failed,
            self.failed_feeds()
        );
    }
}
