pub mod classified;
pub mod immoweb;
pub mod listing;
pub mod traits;
pub mod types;

pub use classified::{extract_record, RawListingPayload};
pub use immoweb::{ImmowebScraper, SearchEndpoint};
pub use listing::extract_links;
pub use traits::DocumentFetcher;
pub use types::{Document, FeedKind, ListingPageRef};
