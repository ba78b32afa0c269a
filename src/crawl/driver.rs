use chrono::Utc;
use std::time::Duration;
use tracing::{info, warn};

use crate::crawl::pool::FetchPool;
use crate::crawl::report::{BatchStats, FeedReport, FeedStop};
use crate::error::{CrawlError, FetchError};
use crate::models::NormalizedRecord;
use crate::scrapers::immoweb::SearchEndpoint;
use crate::scrapers::listing::extract_links;
use crate::scrapers::traits::DocumentFetcher;
use crate::scrapers::types::{FeedKind, ListingPageRef};
use crate::sink::RecordSink;

/// Result of looking at one listing page
enum PageOutcome {
    Links(Vec<url::Url>),
    Empty,
    Failed(FetchError),
}

/// Walks the pages of a feed until one comes back without links
pub struct PaginationDriver<'a> {
    fetcher: &'a dyn DocumentFetcher,
    endpoint: &'a SearchEndpoint,
    pool: &'a FetchPool<'a>,
    sink: &'a RecordSink<NormalizedRecord>,
    page_delay: Duration,
    max_pages: Option<u32>,
}

impl<'a> PaginationDriver<'a> {
    pub fn new(
        fetcher: &'a dyn DocumentFetcher,
        endpoint: &'a SearchEndpoint,
        pool: &'a FetchPool<'a>,
        sink: &'a RecordSink<NormalizedRecord>,
    ) -> Self {
        Self {
            fetcher,
            endpoint,
            pool,
            sink,
            page_delay: Duration::ZERO,
            max_pages: None,
        }
    }

    pub fn with_page_delay(mut self, delay: Duration) -> Self {
        self.page_delay = delay;
        self
    }

    pub fn with_max_pages(mut self, max_pages: Option<u32>) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Traverse one feed from page 1.
    ///
    /// Each page's links are fully processed before the next page is
    /// requested. An unreachable first page is an error for this feed. A later
    /// page failure ends the feed like an empty page would, but is reported as
    /// such.
    pub async fn run_feed(&self, feed: FeedKind) -> Result<FeedReport, CrawlError> {
        let started_at = Utc::now();
        let sale_type = feed.sale_type();
        let mut stats = BatchStats::default();
        let mut pages = 0;
        let mut page = ListingPageRef::first(feed);

        info!("Starting feed {} via {}", feed, self.fetcher.source_name());

        let stop = loop {
            if let Some(max_pages) = self.max_pages {
                if page.page > max_pages {
                    break FeedStop::PageLimit { max_pages };
                }
            }

            info!(feed = %feed, page = page.page, "Scraping listing page");

            let links = match self.fetch_page(page).await? {
                PageOutcome::Links(links) => links,
                PageOutcome::Empty => {
                    pages += 1;
                    info!(feed = %feed, page = page.page, "No listings on page, feed exhausted");
                    break FeedStop::Exhausted {
                        empty_page: page.page,
                    };
                }
                PageOutcome::Failed(e) if page.page == 1 => {
                    return Err(CrawlError::FirstPageUnreachable { feed, source: e });
                }
                PageOutcome::Failed(e) => {
                    warn!(feed = %feed, page = page.page, reason = e.reason(), "Listing page failed, ending feed: {}", e);
                    break FeedStop::PageFetchFailed {
                        page: page.page,
                        reason: e.reason(),
                    };
                }
            };
            pages += 1;

            let batch = self.pool.process_batch(links, sale_type).await;
            info!(
                feed = %feed,
                page = page.page,
                "Extracted {} of {} listings ({} already seen)",
                batch.stats.extracted,
                batch.stats.discovered,
                batch.stats.duplicates
            );
            stats += batch.stats;
            self.sink.extend(batch.records);

            page = page.next();
            if !self.page_delay.is_zero() {
                tokio::time::sleep(self.page_delay).await;
            }
        };

        Ok(FeedReport {
            feed,
            pages,
            stats,
            stop,
            started_at,
            finished_at: Utc::now(),
        })
    }

    async fn fetch_page(&self, page: ListingPageRef) -> Result<PageOutcome, CrawlError> {
        let url = self.endpoint.page_url(page)?;

        let document = match self.fetcher.fetch(&url).await {
            Ok(document) => document,
            Err(e) => return Ok(PageOutcome::Failed(e)),
        };

        let links = extract_links(&document);
        if links.is_empty() {
            Ok(PageOutcome::Empty)
        } else {
            Ok(PageOutcome::Links(links))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawl::dedup::Deduplicator;
    use crate::scrapers::types::Document;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use url::Url;

    /// Serves `links_per_page[n - 1]` cards on page n and nothing afterwards
    struct FakeSite {
        links_per_page: Vec<usize>,
        failing_page: Option<u32>,
        requested: Mutex<Vec<String>>,
    }

    impl FakeSite {
        fn new(links_per_page: Vec<usize>) -> Self {
            Self {
                links_per_page,
                failing_page: None,
                requested: Mutex::new(Vec::new()),
            }
        }

        fn listing_requests(&self) -> Vec<String> {
            self.requested
                .lock()
                .iter()
                .filter(|url| url.contains("/search/"))
                .cloned()
                .collect()
        }

        fn detail_requests(&self) -> usize {
            self.requested
                .lock()
                .iter()
                .filter(|url| url.contains("/classified/"))
                .count()
        }
    }

    #[async_trait]
    impl DocumentFetcher for FakeSite {
        async fn fetch(&self, url: &Url) -> Result<Document, FetchError> {
            self.requested.lock().push(url.to_string());

            if url.path().contains("/classified/") {
                let body = r#"<script>window.classified = {"flags":{"isForSale":true}};</script>"#;
                return Ok(Document::new(url.clone(), body));
            }

            let page: u32 = url
                .query_pairs()
                .find(|(key, _)| key == "page")
                .and_then(|(_, value)| value.parse().ok())
                .unwrap_or(1);

            if self.failing_page == Some(page) {
                return Err(FetchError::HttpStatus {
                    url: url.to_string(),
                    status: 503,
                });
            }

            let count = self.links_per_page.get(page as usize - 1).copied().unwrap_or(0);
            let cards: String = (0..count)
                .map(|i| {
                    format!(
                        r#"<a class="card__title-link" href="/en/classified/house/for-sale/x/1000/{}{}">c</a>"#,
                        page, i
                    )
                })
                .collect();
            Ok(Document::new(url.clone(), format!("<html><body>{}</body></html>", cards)))
        }

        fn source_name(&self) -> &'static str {
            "fake"
        }
    }

    async fn run(site: &FakeSite, max_pages: Option<u32>) -> Result<FeedReport, CrawlError> {
        let endpoint = SearchEndpoint::parse("https://www.immoweb.be/en").unwrap();
        let seen = Deduplicator::new();
        let sink = RecordSink::new();
        let pool = FetchPool::new(site, &seen, 4);
        let driver = PaginationDriver::new(site, &endpoint, &pool, &sink).with_max_pages(max_pages);
        let report = driver.run_feed(FeedKind::SaleHouse).await;
        if let Ok(report) = &report {
            assert_eq!(sink.len(), report.stats.extracted);
        }
        report
    }

    #[tokio::test]
    async fn test_stops_on_first_empty_page() {
        let site = FakeSite::new(vec![3]);
        let report = run(&site, None).await.unwrap();

        assert_eq!(report.pages, 2);
        assert_eq!(report.stop, FeedStop::Exhausted { empty_page: 2 });
        assert_eq!(report.stats.extracted, 3);
        assert_eq!(site.detail_requests(), 3);
        assert_eq!(site.listing_requests().len(), 2);
    }

    #[tokio::test]
    async fn test_walks_pages_in_order() {
        let site = FakeSite::new(vec![2, 2, 1]);
        let report = run(&site, None).await.unwrap();

        assert_eq!(report.pages, 4);
        let pages: Vec<String> = site
            .listing_requests()
            .iter()
            .map(|url| {
                Url::parse(url)
                    .unwrap()
                    .query_pairs()
                    .find(|(key, _)| key == "page")
                    .map(|(_, value)| value.into_owned())
                    .unwrap()
            })
            .collect();
        assert_eq!(pages, vec!["1", "2", "3", "4"]);
    }

    #[tokio::test]
    async fn test_page_limit() {
        let site = FakeSite::new(vec![1, 1, 1, 1]);
        let report = run(&site, Some(2)).await.unwrap();

        assert_eq!(report.pages, 2);
        assert_eq!(report.stop, FeedStop::PageLimit { max_pages: 2 });
        assert_eq!(site.listing_requests().len(), 2);
    }

    #[tokio::test]
    async fn test_unreachable_first_page_is_fatal() {
        let mut site = FakeSite::new(vec![3]);
        site.failing_page = Some(1);

        let err = run(&site, None).await.unwrap_err();
        assert!(matches!(
            err,
            CrawlError::FirstPageUnreachable {
                feed: FeedKind::SaleHouse,
                ..
            }
        ));
        assert_eq!(site.detail_requests(), 0);
    }

    #[tokio::test]
    async fn test_later_page_failure_ends_feed() {
        let mut site = FakeSite::new(vec![2, 2, 2]);
        site.failing_page = Some(2);

        let report = run(&site, None).await.unwrap();
        assert_eq!(
            report.stop,
            FeedStop::PageFetchFailed {
                page: 2,
                reason: "http_status"
            }
        );
        assert_eq!(report.pages, 1);
        assert_eq!(report.stats.extracted, 2);
    }
}
