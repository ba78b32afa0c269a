use crate::error::{CrawlError, FetchError};
use crate::models::SaleType;
use crate::scrapers::traits::DocumentFetcher;
use crate::scrapers::types::{Document, ListingPageRef};
use crate::settings::CrawlerSettings;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// HTTP document fetcher for Immoweb
pub struct ImmowebScraper {
    client: Client,
}

impl ImmowebScraper {
    /// Create a fetcher that sends the configured identity header and timeout
    pub fn new(settings: &CrawlerSettings) -> Result<Self, CrawlError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .user_agent(settings.user_agent.as_str())
            .build()
            .map_err(CrawlError::Client)?;

        Ok(Self { client })
    }
}

#[async_trait]
impl DocumentFetcher for ImmowebScraper {
    async fn fetch(&self, url: &Url) -> Result<Document, FetchError> {
        debug!("Fetching URL: {}", url);

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|source| FetchError::Network {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        // Relative links resolve against wherever redirects ended up
        let final_url = response.url().clone();
        let body = response.text().await.map_err(|source| FetchError::Network {
            url: url.to_string(),
            source,
        })?;

        if body.trim().is_empty() {
            return Err(FetchError::EmptyBody {
                url: url.to_string(),
            });
        }

        debug!("Downloaded {} bytes of HTML from {}", body.len(), final_url);

        Ok(Document::new(final_url, body))
    }

    fn source_name(&self) -> &'static str {
        "Immoweb"
    }
}

/// Builds search result URLs for each feed page
#[derive(Debug, Clone)]
pub struct SearchEndpoint {
    base_url: Url,
}

impl SearchEndpoint {
    pub fn new(base_url: Url) -> Self {
        Self { base_url }
    }

    pub fn parse(base_url: &str) -> Result<Self, CrawlError> {
        Ok(Self::new(Url::parse(base_url)?))
    }

    /// `{base}/search/{category}/for-{sale|rent}?countries=BE&...&page={n}`
    pub fn page_url(&self, page: ListingPageRef) -> Result<Url, url::ParseError> {
        let path = format!(
            "{}/search/{}/for-{}",
            self.base_url.as_str().trim_end_matches('/'),
            page.feed.category(),
            page.feed.sale_type(),
        );

        let page_number = page.page.to_string();
        let mut params = vec![("countries", "BE")];
        if page.feed.sale_type() == SaleType::Rent {
            params.push(("priceType", "MONTHLY_RENTAL_PRICE"));
        }
        params.push(("page", page_number.as_str()));
        params.push(("orderBy", "relevance"));

        Url::parse_with_params(&path, &params)
    }
}
