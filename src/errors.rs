use thiserror::Error;

/// Infrastructure error type shared across the crate.
#[derive(Error, Debug, Clone)]
pub enum Error {
    /// Client HTTP error (4xx)
    #[error("Client error: status code: {status_code}, error message: {error_message}")]
    ClientRequest {
        status_code: u16,
        error_message: String,
    },

    /// Server HTTP error (5xx)
    #[error("Server error: status code: {status_code}, error message: {error_message}")]
    ServerRequest {
        status_code: u16,
        error_message: String,
    },

    /// Generic request error
    #[error("Generic request error: {0}")]
    GenericRequest(String),

    /// JSON parse error
    #[error("Json parse error: {0}")]
    JsonParse(String),

    /// Decimal-string field could not be parsed as a number
    #[error("Invalid decimal string: {0}")]
    DecimalString(String),

    /// Collaborator rejected the request with a domain message
    #[error("Rejected: {0}")]
    Rejected(String),

    /// Subscriber handle not found
    #[error("Subscriber not found")]
    SubscriberNotFound,
}

/// Expected business rejections from cart mutations.
///
/// These are returned as plain values so callers can render them; a rejected
/// mutation never partially updates the ledger.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CartError {
    /// Item carried no category id
    #[error("Item is missing a category id")]
    MissingCategory,

    /// Item carried no vendor id
    #[error("Item is missing a vendor id")]
    MissingVendor,

    /// The category's cart is already bound to a different vendor
    #[error("Cart for this category already belongs to {vendor_name}")]
    VendorConflict { vendor_name: String },
}
