use scraper::Html;
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

use crate::models::SaleType;

/// One paginated listing stream (property category x transaction kind)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum FeedKind {
    SaleHouse,
    SaleApartment,
    SaleHouseAndApartment,
    RentHouse,
    RentApartment,
    RentHouseAndApartment,
}

impl FeedKind {
    /// Feeds crawled when nothing else is configured
    pub const DEFAULT_FEEDS: [FeedKind; 4] = [
        FeedKind::SaleHouse,
        FeedKind::SaleApartment,
        FeedKind::RentHouse,
        FeedKind::RentApartment,
    ];

    pub fn sale_type(&self) -> SaleType {
        match self {
            FeedKind::SaleHouse | FeedKind::SaleApartment | FeedKind::SaleHouseAndApartment => {
                SaleType::Sale
            }
            FeedKind::RentHouse | FeedKind::RentApartment | FeedKind::RentHouseAndApartment => {
                SaleType::Rent
            }
        }
    }

    /// Category segment of the search path
    pub fn category(&self) -> &'static str {
        match self {
            FeedKind::SaleHouse | FeedKind::RentHouse => "house",
            FeedKind::SaleApartment | FeedKind::RentApartment => "apartment",
            FeedKind::SaleHouseAndApartment | FeedKind::RentHouseAndApartment => {
                "house-and-apartment"
            }
        }
    }
}

impl fmt::Display for FeedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.sale_type(), self.category())
    }
}

/// A single page of a feed, numbered from 1
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListingPageRef {
    pub feed: FeedKind,
    pub page: u32,
}

impl ListingPageRef {
    pub fn first(feed: FeedKind) -> Self {
        Self { feed, page: 1 }
    }

    pub fn next(&self) -> Self {
        Self {
            feed: self.feed,
            page: self.page + 1,
        }
    }
}

/// A fetched page with a non-empty body.
///
/// The HTML tree is built on demand with [`Document::parse`] because
/// `scraper::Html` is not `Send` and cannot be held across an await.
#[derive(Debug, Clone)]
pub struct Document {
    pub url: Url,
    pub body: String,
}

impl Document {
    pub fn new(url: Url, body: impl Into<String>) -> Self {
        Self {
            url,
            body: body.into(),
        }
    }

    pub fn parse(&self) -> Html {
        Html::parse_document(&self.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feed_names_round_trip_through_config_form() {
        let feed: FeedKind = serde_json::from_str("\"rent-house-and-apartment\"").unwrap();
        assert_eq!(feed, FeedKind::RentHouseAndApartment);
        assert_eq!(feed.to_string(), "rent-house-and-apartment");
        assert_eq!(FeedKind::SaleApartment.to_string(), "sale-apartment");
    }

    #[test]
    fn test_page_refs_advance_within_feed() {
        let first = ListingPageRef::first(FeedKind::RentApartment);
        let second = first.next();
        assert_eq!(first.page, 1);
        assert_eq!(second.page, 2);
        assert_eq!(second.feed, FeedKind::RentApartment);
    }
}
