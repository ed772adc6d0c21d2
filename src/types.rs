//! Shared domain types used across the cart, pricing and realtime modules.

use serde::{Deserialize, Serialize};

/// A WGS-84 coordinate pair.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// A single line inside a category cart.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub id: String,
    pub name: String,
    pub unit_price: f64,
    /// Always >= 1; a quantity driven to zero removes the line instead.
    pub quantity: u32,
    pub image_ref: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offer_percent: Option<f64>,
}

impl CartLine {
    pub fn line_total(&self) -> f64 {
        self.unit_price * f64::from(self.quantity)
    }
}

/// One cart per category, bound to exactly one vendor.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CategoryCart {
    pub category_id: String,
    pub category_name: String,
    pub vendor_id: String,
    pub vendor_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor_location: Option<GeoPoint>,
    pub lines: Vec<CartLine>,
}

impl CategoryCart {
    /// Sum of `unit_price * quantity` over all lines.
    pub fn subtotal(&self) -> f64 {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    pub fn total_items(&self) -> u32 {
        self.lines.iter().map(|line| line.quantity).sum()
    }
}

/// Candidate item for [`crate::cart::CartLedger::add_line`].
///
/// Category and vendor ids are optional here because catalog entries can be
/// incomplete; the ledger rejects items missing either one.
#[derive(Debug, Clone)]
pub struct ItemInput {
    pub id: String,
    pub name: String,
    pub unit_price: f64,
    pub image_ref: String,
    pub offer_percent: Option<f64>,
    pub category_id: Option<String>,
    pub vendor_id: Option<String>,
    pub vendor_name: Option<String>,
    pub vendor_location: Option<GeoPoint>,
}

/// Admin-configured delivery pricing tier: a distance band with a flat fee
/// and an optional free-delivery subtotal threshold.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryTier {
    pub id: String,
    pub name: String,
    pub min_distance_km: f64,
    pub max_distance_km: f64,
    pub flat_fee: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_order_for_free_delivery: Option<f64>,
    pub is_active: bool,
}

/// Vendor roster entry used to seed the realtime vendor snapshot before any
/// delta arrives.
#[derive(Debug, Clone, PartialEq)]
pub struct VendorSeed {
    pub id: String,
    pub name: String,
    pub is_open: bool,
    pub location: Option<GeoPoint>,
}

/// Product roster entry used to seed the availability snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductSeed {
    pub id: String,
    pub name: String,
    pub is_available: bool,
    pub stock: Option<i64>,
}

/// Live availability state for one product.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProductAvailability {
    pub is_available: bool,
    pub stock: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subtotal_sums_price_times_quantity() {
        let cart = CategoryCart {
            category_id: "roti".to_string(),
            category_name: "Roti".to_string(),
            vendor_id: "v1".to_string(),
            vendor_name: "Annapurna Kitchen".to_string(),
            vendor_location: None,
            lines: vec![
                CartLine {
                    id: "p1".to_string(),
                    name: "Tawa Roti".to_string(),
                    unit_price: 12.0,
                    quantity: 4,
                    image_ref: "roti.jpg".to_string(),
                    offer_percent: None,
                },
                CartLine {
                    id: "p2".to_string(),
                    name: "Butter Naan".to_string(),
                    unit_price: 35.0,
                    quantity: 2,
                    image_ref: "naan.jpg".to_string(),
                    offer_percent: Some(10.0),
                },
            ],
        };

        assert_eq!(cart.subtotal(), 12.0 * 4.0 + 35.0 * 2.0);
        assert_eq!(cart.total_items(), 6);
    }
}
