#![deny(unreachable_pub)]

// Core modules
mod consts;
mod errors;
mod prelude;

// Feature modules
pub mod cart;
pub mod catalog;
pub mod pricing;
pub mod types;
pub mod ws;

// Re-exports
pub use cart::{CartLedger, DerivedCartView, LedgerSnapshot, PricingContext, StateStore};
pub use catalog::CatalogClient;
pub use consts::{
    LEDGER_SCHEMA_VERSION, LEDGER_SNAPSHOT_KEY, LOCAL_API_URL, LOCAL_WS_URL, USER_LATITUDE_KEY,
    USER_LONGITUDE_KEY,
};
pub use errors::{CartError, Error};
pub use pricing::{haversine_km, quote, quote_at_distance, DeliveryQuote};
pub use types::{
    CartLine, CategoryCart, DeliveryTier, GeoPoint, ItemInput, ProductAvailability, ProductSeed,
    VendorSeed,
};
pub use ws::{
    ChannelConfig, ChannelEvent, ClientRole, ConnectionState, LiveSnapshot, ReconnectPolicy,
    SyncChannel,
};
