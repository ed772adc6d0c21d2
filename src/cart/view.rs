//! On-demand cart view derivation.
//!
//! A derived view is never stored: it recombines the current ledger state
//! with the pricing engine's output (using live user coordinates and the
//! latest admin tier list) and, when a live snapshot is available, annotates
//! the cart with vendor open/closed and per-line availability flags.

use crate::pricing::{self, DeliveryQuote};
use crate::types::{CategoryCart, DeliveryTier, GeoPoint};
use crate::ws::LiveSnapshot;

use super::ledger::CartLedger;
use super::storage::StateStore;

/// Inputs the pricing engine needs beyond the cart itself.
#[derive(Debug, Clone, Default)]
pub struct PricingContext {
    pub user_location: Option<GeoPoint>,
    pub tiers: Vec<DeliveryTier>,
}

impl PricingContext {
    /// Build a context from the tier list plus the store's read-only
    /// location keys.
    pub fn from_store(store: &StateStore, tiers: Vec<DeliveryTier>) -> Self {
        Self {
            user_location: store.load_user_location(),
            tiers,
        }
    }
}

/// Fully priced, annotated projection of one category cart.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedCartView {
    pub category_id: String,
    pub category_name: String,
    pub vendor_id: String,
    pub vendor_name: String,
    pub subtotal: f64,
    pub distance_km: Option<f64>,
    pub delivery_fee: f64,
    pub free_delivery_eligible: bool,
    pub amount_for_free_delivery: Option<f64>,
    pub tier_name: Option<String>,
    pub min_order_amount: Option<f64>,
    /// `None` until the live snapshot knows this vendor.
    pub vendor_open: Option<bool>,
    /// Line ids the live snapshot currently marks unavailable.
    pub unavailable_line_ids: Vec<String>,
}

impl DerivedCartView {
    fn from_parts(cart: &CategoryCart, quote: DeliveryQuote, live: Option<&LiveSnapshot>) -> Self {
        let vendor_open = live.and_then(|snapshot| snapshot.is_vendor_open(&cart.vendor_id));
        let unavailable_line_ids = live
            .map(|snapshot| {
                cart.lines
                    .iter()
                    .filter(|line| {
                        snapshot
                            .product_availability(&line.id)
                            .is_some_and(|p| !p.is_available)
                    })
                    .map(|line| line.id.clone())
                    .collect()
            })
            .unwrap_or_default();

        Self {
            category_id: cart.category_id.clone(),
            category_name: cart.category_name.clone(),
            vendor_id: cart.vendor_id.clone(),
            vendor_name: cart.vendor_name.clone(),
            subtotal: cart.subtotal(),
            distance_km: quote.distance_km,
            delivery_fee: quote.delivery_fee,
            free_delivery_eligible: quote.free_delivery_eligible,
            amount_for_free_delivery: quote.amount_for_free_delivery,
            tier_name: quote.tier_name,
            min_order_amount: quote.min_order_amount,
            vendor_open,
            unavailable_line_ids,
        }
    }
}

impl CartLedger {
    /// Price one category cart. Pure: reads the ledger, never mutates it.
    pub fn derive_view(&self, category_id: &str, ctx: &PricingContext) -> Option<DerivedCartView> {
        self.derive_view_with(category_id, ctx, None)
    }

    /// Price one category cart and annotate it from a live snapshot.
    pub fn derive_view_with(
        &self,
        category_id: &str,
        ctx: &PricingContext,
        live: Option<&LiveSnapshot>,
    ) -> Option<DerivedCartView> {
        let cart = self.cart(category_id)?;
        Some(derive_one(cart, ctx, live))
    }

    /// Price every cart in ledger order.
    pub fn derive_views(
        &self,
        ctx: &PricingContext,
        live: Option<&LiveSnapshot>,
    ) -> Vec<DerivedCartView> {
        self.carts()
            .iter()
            .map(|cart| derive_one(cart, ctx, live))
            .collect()
    }
}

fn derive_one(
    cart: &CategoryCart,
    ctx: &PricingContext,
    live: Option<&LiveSnapshot>,
) -> DerivedCartView {
    let quote = pricing::quote(
        ctx.user_location,
        cart.vendor_location,
        cart.subtotal(),
        &ctx.tiers,
    );
    DerivedCartView::from_parts(cart, quote, live)
}
