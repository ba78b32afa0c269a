use std::fmt;

use crate::sink::{Cell, TableRow};

/// Transaction kind of a listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SaleType {
    Sale,
    Rent,
}

impl SaleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SaleType::Sale => "sale",
            SaleType::Rent => "rent",
        }
    }
}

impl fmt::Display for SaleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Flat listing record, one per unique detail page.
///
/// Every field is always present. Data missing from the source stays `None`
/// so that all records share one column set.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRecord {
    pub locality: Option<String>,
    pub postal_code: Option<String>,
    pub price: Option<f64>,
    pub property_type: Option<String>,
    pub property_subtype: Option<String>,
    pub sale_type: SaleType,
    pub bedroom_count: Option<u32>,
    pub living_area: Option<f64>,
    pub has_fully_equipped_kitchen: bool,
    pub is_furnished: bool,
    pub has_open_fire: bool,
    pub has_terrace: bool,
    /// `None` whenever `has_terrace` is false
    pub terrace_area: Option<f64>,
    pub has_garden: bool,
    /// `None` whenever `has_garden` is false
    pub garden_area: Option<f64>,
    pub land_surface: Option<f64>,
    pub facade_count: Option<u32>,
    pub has_swimming_pool: bool,
    pub building_condition: Option<String>,
}

impl NormalizedRecord {
    /// Column names in export order
    pub const COLUMNS: [&'static str; 19] = [
        "locality",
        "postal_code",
        "price",
        "property_type",
        "property_subtype",
        "sale_type",
        "bedroom_count",
        "living_area",
        "has_fully_equipped_kitchen",
        "is_furnished",
        "has_open_fire",
        "has_terrace",
        "terrace_area",
        "has_garden",
        "garden_area",
        "land_surface",
        "facade_count",
        "has_swimming_pool",
        "building_condition",
    ];
}

impl TableRow for NormalizedRecord {
    fn cells(&self) -> Vec<(&'static str, Cell)> {
        let values = [
            Cell::from(self.locality.clone()),
            Cell::from(self.postal_code.clone()),
            Cell::from(self.price),
            Cell::from(self.property_type.clone()),
            Cell::from(self.property_subtype.clone()),
            Cell::Text(self.sale_type.to_string()),
            Cell::from(self.bedroom_count),
            Cell::from(self.living_area),
            Cell::Bool(self.has_fully_equipped_kitchen),
            Cell::Bool(self.is_furnished),
            Cell::Bool(self.has_open_fire),
            Cell::Bool(self.has_terrace),
            Cell::from(self.terrace_area),
            Cell::Bool(self.has_garden),
            Cell::from(self.garden_area),
            Cell::from(self.land_surface),
            Cell::from(self.facade_count),
            Cell::Bool(self.has_swimming_pool),
            Cell::from(self.building_condition.clone()),
        ];

        Self::COLUMNS.into_iter().zip(values).collect()
    }
}
