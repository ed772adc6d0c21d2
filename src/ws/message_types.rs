//! Wire types for the realtime feed.
//!
//! Every inbound frame is a JSON envelope `{ "type": string, "data": object }`.
//! The envelope is validated at this boundary into a tagged union; event
//! types we don't model collapse into [`ServerEvent::Unknown`] and are
//! ignored, never treated as errors. Extra fields inside known payloads are
//! ignored as well.

use serde::Deserialize;

use crate::errors::Error;
use crate::prelude::*;

/// Domain events we don't consume directly but forward opaquely (by type
/// name) to the channel's invalidation hook, so the app can refresh whatever
/// caches hang off them.
const PASSTHROUGH_EVENTS: &[&str] = &["subscription_update", "wallet_updated", "order_status_update"];

#[derive(Deserialize, Debug)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: serde_json::Value,
}

/// A vendor opened or closed their kitchen.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VendorStatusUpdate {
    pub id: String,
    pub name: String,
    #[serde(rename = "isActive")]
    pub is_open: bool,
}

/// A product's availability or stock changed.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProductAvailabilityUpdate {
    pub id: String,
    pub name: String,
    pub is_available: bool,
    #[serde(default)]
    pub stock: Option<i64>,
}

/// Validated inbound event.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    /// Server-side handshake ack sent right after accepting the connection.
    Connected,
    VendorStatus(VendorStatusUpdate),
    ProductAvailability(ProductAvailabilityUpdate),
    /// Recognized domain event we don't consume; carries the wire type name.
    Passthrough { kind: String },
    /// Anything else. Ignored.
    Unknown,
}

impl ServerEvent {
    /// Parse one inbound text frame.
    ///
    /// Fails only on malformed JSON or on a known event type whose payload
    /// doesn't match its schema; unknown event types parse successfully into
    /// [`ServerEvent::Unknown`].
    pub fn parse(text: &str) -> Result<ServerEvent> {
        let envelope: Envelope =
            serde_json::from_str(text).map_err(|e| Error::JsonParse(e.to_string()))?;

        let event = match envelope.kind.as_str() {
            "connected" => ServerEvent::Connected,
            "vendor_status_update" => ServerEvent::VendorStatus(
                serde_json::from_value(envelope.data)
                    .map_err(|e| Error::JsonParse(e.to_string()))?,
            ),
            "product_availability_update" => ServerEvent::ProductAvailability(
                serde_json::from_value(envelope.data)
                    .map_err(|e| Error::JsonParse(e.to_string()))?,
            ),
            kind if PASSTHROUGH_EVENTS.contains(&kind) => ServerEvent::Passthrough {
                kind: kind.to_string(),
            },
            _ => ServerEvent::Unknown,
        };
        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_vendor_status_update() {
        let text = r#"{"type":"vendor_status_update","data":{"id":"v1","name":"Annapurna","isActive":false}}"#;
        let event = ServerEvent::parse(text).unwrap();
        assert_eq!(
            event,
            ServerEvent::VendorStatus(VendorStatusUpdate {
                id: "v1".to_string(),
                name: "Annapurna".to_string(),
                is_open: false,
            })
        );
    }

    #[test]
    fn parses_product_availability_with_optional_stock() {
        let text = r#"{"type":"product_availability_update","data":{"id":"p1","name":"Thali","isAvailable":true,"stock":4}}"#;
        match ServerEvent::parse(text).unwrap() {
            ServerEvent::ProductAvailability(update) => {
                assert!(update.is_available);
                assert_eq!(update.stock, Some(4));
            }
            other => panic!("unexpected event {other:?}"),
        }

        let text = r#"{"type":"product_availability_update","data":{"id":"p1","name":"Thali","isAvailable":false}}"#;
        match ServerEvent::parse(text).unwrap() {
            ServerEvent::ProductAvailability(update) => assert_eq!(update.stock, None),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn extra_fields_are_ignored() {
        let text = r#"{"type":"vendor_status_update","data":{"id":"v1","name":"Annapurna","isActive":true,"rating":4.7},"ts":123}"#;
        assert!(matches!(
            ServerEvent::parse(text).unwrap(),
            ServerEvent::VendorStatus(_)
        ));
    }

    #[test]
    fn unknown_type_is_not_an_error() {
        let text = r#"{"type":"new_order","data":{"id":"o1"}}"#;
        assert_eq!(ServerEvent::parse(text).unwrap(), ServerEvent::Unknown);
    }

    #[test]
    fn passthrough_events_carry_their_kind() {
        let text = r#"{"type":"subscription_update","data":{"id":"s1","status":"active"}}"#;
        assert_eq!(
            ServerEvent::parse(text).unwrap(),
            ServerEvent::Passthrough {
                kind: "subscription_update".to_string()
            }
        );
    }

    #[test]
    fn handshake_ack_has_no_data() {
        let text = r#"{"type":"connected","message":"WebSocket connection established"}"#;
        assert_eq!(ServerEvent::parse(text).unwrap(), ServerEvent::Connected);
    }

    #[test]
    fn malformed_payload_for_known_type_is_an_error() {
        let text = r#"{"type":"vendor_status_update","data":{"id":"v1"}}"#;
        assert!(ServerEvent::parse(text).is_err());
    }

    #[test]
    fn non_json_frame_is_an_error() {
        assert!(ServerEvent::parse("pong").is_err());
    }
}
