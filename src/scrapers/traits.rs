use crate::error::FetchError;
use crate::scrapers::types::Document;
use async_trait::async_trait;
use url::Url;

/// Retrieves documents from a listing site.
///
/// Failures come back as [`FetchError`] values. Implementations never retry.
#[async_trait]
pub trait DocumentFetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<Document, FetchError>;

    /// Name of the origin, used in logs
    fn source_name(&self) -> &'static str;
}
