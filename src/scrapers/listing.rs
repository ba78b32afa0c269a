use crate::scrapers::types::Document;
use once_cell::sync::Lazy;
use scraper::Selector;
use tracing::{debug, warn};
use url::Url;

static CARD_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a.card__title-link").expect("static card selector"));

/// Listings of this kind have no per-unit payload on their detail page
const NEW_PROJECT_MARKER: &str = "new-real-estate-project";

/// Collect detail page URLs from a search results page, in document order.
///
/// An empty result is not an error. The pagination driver reads it as the
/// end of the feed.
pub fn extract_links(document: &Document) -> Vec<Url> {
    let html = document.parse();
    let mut links = Vec::new();

    for card in html.select(&CARD_SELECTOR) {
        let Some(href) = card.value().attr("href") else {
            continue;
        };

        if href.contains(NEW_PROJECT_MARKER) {
            debug!("Skipping new development project: {}", href);
            continue;
        }

        match document.url.join(href.trim()) {
            Ok(url) => links.push(url),
            Err(e) => warn!("Ignoring unparsable listing link '{}': {}", href, e),
        }
    }

    debug!("Found {} listing links on {}", links.len(), document.url);
    links
}
