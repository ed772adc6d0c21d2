//! Delivery pricing engine.
//!
//! A pure function from (coordinates, subtotal, admin tier list) to a fee
//! decision. Every degraded input maps to a sentinel tier name instead of an
//! error so the caller always has a renderable price state.

use crate::types::{DeliveryTier, GeoPoint};

/// Sentinel tier name when the admin has configured no tiers at all.
pub const TIER_NONE_CONFIGURED: &str = "No delivery settings configured";
/// Sentinel tier name when tiers exist but none is active.
pub const TIER_NONE_ACTIVE: &str = "No active delivery settings";
/// Sentinel tier name when no active tier's range contains the distance.
/// Checkout must be blocked while this is the matched tier.
pub const TIER_OUTSIDE_ZONE: &str = "Outside delivery zone";
/// Sentinel tier name when user or vendor coordinates are missing.
pub const TIER_LOCATION_REQUIRED: &str = "Location required for delivery fee";

/// Outcome of a delivery pricing decision.
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryQuote {
    /// Haversine distance in km, rounded to 2 decimals. `None` when either
    /// coordinate pair was missing.
    pub distance_km: Option<f64>,
    pub delivery_fee: f64,
    pub free_delivery_eligible: bool,
    /// How much more subtotal would unlock free delivery, when a threshold
    /// is configured and not yet met.
    pub amount_for_free_delivery: Option<f64>,
    pub tier_name: Option<String>,
    /// Free-delivery threshold of the matched tier (0 when outside zone).
    pub min_order_amount: Option<f64>,
}

impl DeliveryQuote {
    fn sentinel(name: &str) -> Self {
        Self {
            distance_km: None,
            delivery_fee: 0.0,
            free_delivery_eligible: false,
            amount_for_free_delivery: None,
            tier_name: Some(name.to_string()),
            min_order_amount: None,
        }
    }
}

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two coordinates in km, rounded to 2
/// decimals.
pub fn haversine_km(from: GeoPoint, to: GeoPoint) -> f64 {
    let d_lat = (to.latitude - from.latitude).to_radians();
    let d_lon = (to.longitude - from.longitude).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + from.latitude.to_radians().cos()
            * to.latitude.to_radians().cos()
            * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();

    round2(EARTH_RADIUS_KM * c)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Price a cart against the admin tier list.
///
/// Tier selection is the first active tier whose inclusive `[min, max]`
/// range contains the distance, scanned in list order. Overlapping ranges
/// are a data-quality issue on the admin side; the first match wins
/// deterministically.
pub fn quote(
    user: Option<GeoPoint>,
    vendor: Option<GeoPoint>,
    subtotal: f64,
    tiers: &[DeliveryTier],
) -> DeliveryQuote {
    let (user, vendor) = match (user, vendor) {
        (Some(user), Some(vendor)) => (user, vendor),
        _ => return DeliveryQuote::sentinel(TIER_LOCATION_REQUIRED),
    };

    let distance = haversine_km(user, vendor);
    let mut result = quote_at_distance(distance, subtotal, tiers);
    result.distance_km = Some(distance);
    result
}

/// Tier matching with a precomputed distance; split out so callers holding a
/// distance (and the tests) don't need coordinates.
pub fn quote_at_distance(distance_km: f64, subtotal: f64, tiers: &[DeliveryTier]) -> DeliveryQuote {
    if tiers.is_empty() {
        return DeliveryQuote::sentinel(TIER_NONE_CONFIGURED);
    }

    let mut active = tiers.iter().filter(|tier| tier.is_active).peekable();
    if active.peek().is_none() {
        return DeliveryQuote::sentinel(TIER_NONE_ACTIVE);
    }

    let matched = active
        .find(|tier| distance_km >= tier.min_distance_km && distance_km <= tier.max_distance_km);

    let Some(tier) = matched else {
        let mut out = DeliveryQuote::sentinel(TIER_OUTSIDE_ZONE);
        out.min_order_amount = Some(0.0);
        return out;
    };

    let threshold = tier.min_order_for_free_delivery.unwrap_or(0.0);
    let free = tier.flat_fee == 0.0 || (threshold > 0.0 && subtotal >= threshold);

    DeliveryQuote {
        distance_km: None,
        delivery_fee: if free { 0.0 } else { tier.flat_fee },
        free_delivery_eligible: free,
        amount_for_free_delivery: if !free && threshold > 0.0 {
            Some(threshold - subtotal)
        } else {
            None
        },
        tier_name: Some(tier.name.clone()),
        min_order_amount: Some(threshold),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tier(
        name: &str,
        min_km: f64,
        max_km: f64,
        fee: f64,
        free_at: Option<f64>,
        active: bool,
    ) -> DeliveryTier {
        DeliveryTier {
            id: format!("tier-{name}"),
            name: name.to_string(),
            min_distance_km: min_km,
            max_distance_km: max_km,
            flat_fee: fee,
            min_order_for_free_delivery: free_at,
            is_active: active,
        }
    }

    fn two_band_tiers() -> Vec<DeliveryTier> {
        vec![
            tier("Nearby", 0.0, 2.0, 20.0, Some(200.0), true),
            tier("City", 2.0, 5.0, 40.0, Some(300.0), true),
        ]
    }

    #[test]
    fn haversine_matches_known_distance() {
        // Connaught Place -> Hauz Khas, roughly 9.6 km.
        let cp = GeoPoint::new(28.6315, 77.2167);
        let hk = GeoPoint::new(28.5494, 77.2001);
        let d = haversine_km(cp, hk);
        assert!((9.0..10.5).contains(&d), "unexpected distance {d}");
        // Rounded to 2 decimals.
        assert_eq!(d, round2(d));
    }

    #[test]
    fn haversine_zero_for_same_point() {
        let p = GeoPoint::new(28.6139, 77.209);
        assert_eq!(haversine_km(p, p), 0.0);
    }

    #[test]
    fn subtotal_above_threshold_is_free() {
        let q = quote_at_distance(1.5, 250.0, &two_band_tiers());
        assert_eq!(q.tier_name.as_deref(), Some("Nearby"));
        assert_eq!(q.delivery_fee, 0.0);
        assert!(q.free_delivery_eligible);
        assert_eq!(q.amount_for_free_delivery, None);
    }

    #[test]
    fn subtotal_below_threshold_charges_flat_fee() {
        let q = quote_at_distance(1.5, 100.0, &two_band_tiers());
        assert_eq!(q.tier_name.as_deref(), Some("Nearby"));
        assert_eq!(q.delivery_fee, 20.0);
        assert!(!q.free_delivery_eligible);
        assert_eq!(q.amount_for_free_delivery, Some(100.0));
        assert_eq!(q.min_order_amount, Some(200.0));
    }

    #[test]
    fn threshold_boundary_is_inclusive() {
        let q = quote_at_distance(1.0, 200.0, &two_band_tiers());
        assert!(q.free_delivery_eligible);
        assert_eq!(q.delivery_fee, 0.0);

        let q = quote_at_distance(1.0, 199.0, &two_band_tiers());
        assert!(!q.free_delivery_eligible);
        assert_eq!(q.amount_for_free_delivery, Some(1.0));
    }

    #[test]
    fn zero_fee_tier_is_always_free() {
        let tiers = vec![tier("Free zone", 0.0, 3.0, 0.0, None, true)];
        let q = quote_at_distance(2.0, 1.0, &tiers);
        assert!(q.free_delivery_eligible);
        assert_eq!(q.delivery_fee, 0.0);
    }

    #[test]
    fn outside_all_ranges_is_out_of_zone() {
        let q = quote_at_distance(10.0, 500.0, &two_band_tiers());
        assert_eq!(q.tier_name.as_deref(), Some(TIER_OUTSIDE_ZONE));
        assert_eq!(q.delivery_fee, 0.0);
        assert!(!q.free_delivery_eligible);
        assert_eq!(q.min_order_amount, Some(0.0));
    }

    #[test]
    fn no_tiers_configured_sentinel() {
        let q = quote_at_distance(1.0, 100.0, &[]);
        assert_eq!(q.tier_name.as_deref(), Some(TIER_NONE_CONFIGURED));
        assert_eq!(q.delivery_fee, 0.0);
    }

    #[test]
    fn all_tiers_inactive_sentinel() {
        let tiers = vec![tier("Nearby", 0.0, 2.0, 20.0, None, false)];
        let q = quote_at_distance(1.0, 100.0, &tiers);
        assert_eq!(q.tier_name.as_deref(), Some(TIER_NONE_ACTIVE));
    }

    #[test]
    fn missing_coordinates_sentinel() {
        let user = Some(GeoPoint::new(28.6, 77.2));
        let q = quote(user, None, 100.0, &two_band_tiers());
        assert_eq!(q.tier_name.as_deref(), Some(TIER_LOCATION_REQUIRED));
        assert_eq!(q.distance_km, None);
        assert_eq!(q.delivery_fee, 0.0);

        let q = quote(None, None, 100.0, &two_band_tiers());
        assert_eq!(q.tier_name.as_deref(), Some(TIER_LOCATION_REQUIRED));
    }

    #[test]
    fn boundary_distance_matches_first_tier_in_order() {
        // 2.0 km sits in both bands; list order decides.
        let q = quote_at_distance(2.0, 100.0, &two_band_tiers());
        assert_eq!(q.tier_name.as_deref(), Some("Nearby"));
        assert_eq!(q.delivery_fee, 20.0);
    }

    #[test]
    fn inactive_tiers_are_skipped_during_matching() {
        let tiers = vec![
            tier("Disabled", 0.0, 5.0, 5.0, None, false),
            tier("Fallback", 0.0, 5.0, 30.0, None, true),
        ];
        let q = quote_at_distance(1.0, 100.0, &tiers);
        assert_eq!(q.tier_name.as_deref(), Some("Fallback"));
        assert_eq!(q.delivery_fee, 30.0);
    }

    #[test]
    fn fee_is_constant_within_a_tier() {
        let tiers = two_band_tiers();
        let near = quote_at_distance(2.1, 100.0, &tiers);
        let far = quote_at_distance(4.9, 100.0, &tiers);
        assert_eq!(near.delivery_fee, far.delivery_fee);
        assert_eq!(near.tier_name, far.tier_name);
    }

    #[test]
    fn quote_carries_rounded_distance() {
        let user = GeoPoint::new(28.6139, 77.209);
        let vendor = GeoPoint::new(28.6239, 77.219);
        let q = quote(Some(user), Some(vendor), 100.0, &two_band_tiers());
        let d = q.distance_km.expect("distance computed");
        assert_eq!(d, round2(d));
        assert_eq!(q.tier_name.as_deref(), Some("Nearby"));
    }
}
