//! Typed client for the collaborator read endpoints.
//!
//! The backend serializes decimal columns as JSON strings
//! (`"minDistance": "2.00"`); conversion to `f64` happens here so the rest
//! of the crate only ever sees numeric domain types.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::consts::LOCAL_API_URL;
use crate::errors::Error;
use crate::prelude::*;
use crate::types::{DeliveryTier, GeoPoint, ProductSeed, VendorSeed};

use super::req::HttpClient;

#[derive(Debug)]
pub struct CatalogClient {
    pub http_client: HttpClient,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct DeliveryTierWire {
    id: String,
    name: String,
    min_distance: String,
    max_distance: String,
    price: f64,
    #[serde(default)]
    min_order_amount: Option<f64>,
    is_active: bool,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct VendorWire {
    id: String,
    name: String,
    #[serde(default = "default_true")]
    is_active: bool,
    #[serde(default)]
    latitude: Option<String>,
    #[serde(default)]
    longitude: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct ProductWire {
    id: String,
    name: String,
    #[serde(default = "default_true")]
    is_available: bool,
    #[serde(default)]
    stock: Option<i64>,
}

#[derive(Serialize, Debug)]
struct PincodeRequest<'a> {
    pincode: &'a str,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct PincodeResponse {
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    latitude: Option<f64>,
    #[serde(default)]
    longitude: Option<f64>,
}

fn default_true() -> bool {
    true
}

fn parse_decimal(value: &str) -> Result<f64> {
    value
        .trim()
        .parse::<f64>()
        .map_err(|_| Error::DecimalString(value.to_string()))
}

/// Decimal-string coordinate pair; either side missing or unparseable means
/// the vendor simply has no usable location.
fn parse_location(latitude: Option<&str>, longitude: Option<&str>) -> Option<GeoPoint> {
    let latitude = latitude?.trim().parse::<f64>().ok()?;
    let longitude = longitude?.trim().parse::<f64>().ok()?;
    Some(GeoPoint::new(latitude, longitude))
}

impl TryFrom<DeliveryTierWire> for DeliveryTier {
    type Error = Error;

    fn try_from(wire: DeliveryTierWire) -> Result<DeliveryTier> {
        Ok(DeliveryTier {
            min_distance_km: parse_decimal(&wire.min_distance)?,
            max_distance_km: parse_decimal(&wire.max_distance)?,
            id: wire.id,
            name: wire.name,
            flat_fee: wire.price,
            min_order_for_free_delivery: wire.min_order_amount,
            is_active: wire.is_active,
        })
    }
}

impl From<VendorWire> for VendorSeed {
    fn from(wire: VendorWire) -> VendorSeed {
        let location = parse_location(wire.latitude.as_deref(), wire.longitude.as_deref());
        if location.is_none() && (wire.latitude.is_some() || wire.longitude.is_some()) {
            warn!(vendor = %wire.id, "Discarding unusable vendor coordinates");
        }
        VendorSeed {
            id: wire.id,
            name: wire.name,
            is_open: wire.is_active,
            location,
        }
    }
}

impl From<ProductWire> for ProductSeed {
    fn from(wire: ProductWire) -> ProductSeed {
        ProductSeed {
            id: wire.id,
            name: wire.name,
            is_available: wire.is_available,
            stock: wire.stock,
        }
    }
}

impl CatalogClient {
    pub fn new(client: Option<Client>, base_url: Option<String>) -> Self {
        let client = client.unwrap_or_default();
        let base_url = base_url.unwrap_or_else(|| LOCAL_API_URL.to_string());
        Self {
            http_client: HttpClient::new(client, base_url),
        }
    }

    /// Admin-configured delivery tiers, in the order the admin arranged
    /// them (tier matching is order-sensitive).
    pub async fn delivery_tiers(&self) -> Result<Vec<DeliveryTier>> {
        let text = self.http_client.get("/api/delivery-settings").await?;
        let wire: Vec<DeliveryTierWire> =
            serde_json::from_str(&text).map_err(|e| Error::JsonParse(e.to_string()))?;
        wire.into_iter().map(DeliveryTier::try_from).collect()
    }

    /// Vendor roster used to seed the realtime vendor snapshot.
    pub async fn vendor_roster(&self) -> Result<Vec<VendorSeed>> {
        let text = self.http_client.get("/api/vendors").await?;
        let wire: Vec<VendorWire> =
            serde_json::from_str(&text).map_err(|e| Error::JsonParse(e.to_string()))?;
        Ok(wire.into_iter().map(VendorSeed::from).collect())
    }

    /// Product roster used to seed the availability snapshot.
    pub async fn product_roster(&self) -> Result<Vec<ProductSeed>> {
        let text = self.http_client.get("/api/products").await?;
        let wire: Vec<ProductWire> =
            serde_json::from_str(&text).map_err(|e| Error::JsonParse(e.to_string()))?;
        Ok(wire.into_iter().map(ProductSeed::from).collect())
    }

    /// Resolve a postal pincode to coordinates for the pricing engine.
    pub async fn geocode_pincode(&self, pincode: &str) -> Result<GeoPoint> {
        let body = serde_json::to_string(&PincodeRequest { pincode })
            .map_err(|e| Error::JsonParse(e.to_string()))?;
        let text = self.http_client.post("/api/validate-pincode", body).await?;
        let response: PincodeResponse =
            serde_json::from_str(&text).map_err(|e| Error::JsonParse(e.to_string()))?;

        if !response.success {
            return Err(Error::Rejected(
                response
                    .message
                    .unwrap_or_else(|| "Invalid pincode".to_string()),
            ));
        }
        match (response.latitude, response.longitude) {
            (Some(latitude), Some(longitude)) => Ok(GeoPoint::new(latitude, longitude)),
            _ => Err(Error::Rejected(
                "Pincode response carried no coordinates".to_string(),
            )),
        }
    }
}
