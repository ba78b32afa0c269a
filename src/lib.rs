//! Crawler for paginated real-estate listings.
//!
//! Listing pages of each feed are walked in order, detail pages are fetched
//! with bounded concurrency, and the listing payload embedded in every detail
//! page is normalized into a flat [`models::NormalizedRecord`]. Each listing is
//! recorded at most once per run.

pub mod crawl;
pub mod error;
pub mod models;
pub mod scrapers;
pub mod settings;
pub mod sink;

pub use crawl::{CrawlReport, CrawlState, Crawler};
pub use error::{CrawlError, ExtractError, FetchError, SchemaError};
pub use models::{NormalizedRecord, SaleType};
pub use settings::Settings;
