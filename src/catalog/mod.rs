//! Read-only collaborator endpoints: admin delivery tiers, vendor/product
//! rosters and pincode geocoding. Only the response shapes matter here.

mod catalog_client;
mod req;

pub use catalog_client::CatalogClient;
pub use req::HttpClient;
