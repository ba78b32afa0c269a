//! Extraction of the listing payload embedded in detail pages.
//!
//! Detail pages assign the listing to `window.classified` inside a script
//! block. Exactly one JSON value is decoded from the assignment, whatever
//! follows it in the same block, and projected onto [`NormalizedRecord`]
//! through null-safe path lookups.

use crate::error::ExtractError;
use crate::models::{NormalizedRecord, SaleType};
use crate::scrapers::types::Document;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Selector;
use serde_json::Value;
use tracing::debug;

static SCRIPT_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("script").expect("static script selector"));

static ASSIGNMENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"window\.classified\s*=\s*").expect("static assignment regex"));

/// Flags under `flags` that name the transaction kind. Exactly one must be set.
const SALE_TYPE_FLAGS: [(&str, SaleType); 2] =
    [("isForSale", SaleType::Sale), ("isForRent", SaleType::Rent)];

/// Decode the object assigned to `window.classified` in one script, if any.
///
/// Mentions of the name that are not an object assignment are skipped.
/// Decoding stops at the end of the first JSON value.
fn decode_assignment(script: &str) -> Option<Result<Value, serde_json::Error>> {
    let rest = ASSIGNMENT_RE
        .find_iter(script)
        .map(|found| &script[found.end()..])
        .find(|rest| rest.starts_with('{'))?;

    serde_json::Deserializer::from_str(rest)
        .into_iter::<Value>()
        .next()
}

/// Untyped decoded listing payload
#[derive(Debug, Clone, PartialEq)]
pub struct RawListingPayload(Value);

impl RawListingPayload {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Locate and decode the payload in a detail page
    pub fn from_document(document: &Document) -> Result<Self, ExtractError> {
        let html = document.parse();

        let value = html
            .select(&SCRIPT_SELECTOR)
            .map(|element| element.text().collect::<String>())
            .find_map(|script| decode_assignment(&script))
            .ok_or(ExtractError::MarkerNotFound)??;

        Ok(Self(value))
    }

    /// Follow a dotted path. Missing keys, non-object intermediates and JSON
    /// nulls all come back as `None`.
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        path.split('.')
            .try_fold(&self.0, |node, key| node.get(key))
            .filter(|value| !value.is_null())
    }

    pub fn text(&self, path: &str) -> Option<String> {
        match self.lookup(path)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn number(&self, path: &str) -> Option<f64> {
        self.lookup(path)?.as_f64()
    }

    pub fn count(&self, path: &str) -> Option<u32> {
        let value = self.lookup(path)?;
        value
            .as_u64()
            .or_else(|| value.as_f64().filter(|x| x.fract() == 0.0 && *x >= 0.0).map(|x| x as u64))
            .and_then(|n| u32::try_from(n).ok())
    }

    /// Absent or non-boolean values read as false
    pub fn flag(&self, path: &str) -> bool {
        self.lookup(path).and_then(Value::as_bool).unwrap_or(false)
    }

    /// The single transaction kind flagged in the payload
    pub fn sale_type(&self) -> Result<SaleType, ExtractError> {
        let set: Vec<_> = SALE_TYPE_FLAGS
            .iter()
            .filter(|(name, _)| self.flag(&format!("flags.{}", name)))
            .collect();

        match set.as_slice() {
            [(_, sale_type)] => Ok(*sale_type),
            _ => Err(ExtractError::AmbiguousSaleTypeFlags {
                set_flags: set.iter().map(|(name, _)| name.to_string()).collect(),
            }),
        }
    }

    /// Project the payload onto the flat record schema.
    ///
    /// `feed_sale_type` picks the price and furnishing branch. It comes from the
    /// feed the listing was found on, not from the payload.
    pub fn normalize(&self, feed_sale_type: SaleType) -> Result<NormalizedRecord, ExtractError> {
        let sale_type = self.sale_type()?;
        if sale_type != feed_sale_type {
            debug!(
                "Payload flags {} but listing was found on a {} feed",
                sale_type, feed_sale_type
            );
        }

        let transaction = match feed_sale_type {
            SaleType::Sale => "transaction.sale",
            SaleType::Rent => "transaction.rental",
        };

        let has_terrace = self.flag("property.hasTerrace");
        let has_garden = self.flag("property.hasGarden");

        Ok(NormalizedRecord {
            locality: self.text("property.location.locality"),
            postal_code: self.text("property.location.postalCode"),
            price: self.number(&format!("{}.price", transaction)),
            property_type: self.text("property.type"),
            property_subtype: self.text("property.subtype"),
            sale_type,
            bedroom_count: self.count("property.bedroomCount"),
            living_area: self.number("property.netHabitableSurface"),
            has_fully_equipped_kitchen: self
                .text("property.kitchen.type")
                .is_some_and(|kind| kind.ends_with("HYPER_EQUIPPED")),
            is_furnished: self.flag(&format!("{}.isFurnished", transaction)),
            has_open_fire: self.flag("property.fireplaceExists"),
            has_terrace,
            terrace_area: has_terrace
                .then(|| self.number("property.terraceSurface"))
                .flatten(),
            has_garden,
            garden_area: has_garden
                .then(|| self.number("property.gardenSurface"))
                .flatten(),
            land_surface: self.number("property.land.surface"),
            facade_count: self.count("property.building.facadeCount"),
            has_swimming_pool: self.flag("property.hasSwimmingPool"),
            building_condition: self.text("property.building.condition"),
        })
    }
}

/// Decode and normalize the listing embedded in a detail page
pub fn extract_record(
    document: &Document,
    feed_sale_type: SaleType,
) -> Result<NormalizedRecord, ExtractError> {
    RawListingPayload::from_document(document)?.normalize(feed_sale_type)
}
