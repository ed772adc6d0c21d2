//! In-memory vendor/product snapshots fed by the realtime channel.
//!
//! Snapshots are rebuilt from scratch every process start: a one-time roster
//! read seeds each map, then realtime deltas overwrite entries in place, so
//! replaying a duplicate event is a no-op. Whether an update is worth
//! surfacing to the user (as opposed to just recording) is decided here:
//! until the roster for an entity type has been applied, updates are stored
//! silently, which keeps the initial full-roster push from looking like a
//! burst of spurious open/closed transitions.

use std::collections::HashMap;

use crate::types::{ProductAvailability, ProductSeed, VendorSeed};

use super::message_types::{ProductAvailabilityUpdate, ServerEvent, VendorStatusUpdate};

/// Lifecycle of the underlying connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No subscribers; nothing is or will be connected.
    Idle,
    Connecting,
    Open,
    /// Dropped or unreachable; the worker may still be scheduling retries.
    Closed,
}

/// What subscribers receive on every fan-out, in place of raw wire payloads.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    ConnectionChanged(ConnectionState),
    /// A snapshot map changed (or was re-confirmed) without anything the
    /// user needs to be told about. Re-read via the snapshot getters.
    SnapshotRefreshed,
    /// A vendor genuinely flipped open/closed after its roster was seeded.
    VendorTransition {
        vendor_id: String,
        name: String,
        is_open: bool,
    },
    /// A product genuinely flipped availability after first being seen.
    ProductTransition {
        product_id: String,
        name: String,
        is_available: bool,
    },
}

/// Read-only copy of the live state handed to view layers.
#[derive(Debug, Clone)]
pub struct LiveSnapshot {
    pub connection: ConnectionState,
    pub vendors: HashMap<String, bool>,
    pub products: HashMap<String, ProductAvailability>,
}

impl LiveSnapshot {
    pub fn is_vendor_open(&self, vendor_id: &str) -> Option<bool> {
        self.vendors.get(vendor_id).copied()
    }

    pub fn product_availability(&self, product_id: &str) -> Option<ProductAvailability> {
        self.products.get(product_id).copied()
    }
}

/// The mutable state behind the channel. Only the sync channel writes here.
#[derive(Debug)]
pub(crate) struct LiveState {
    pub(crate) connection: ConnectionState,
    vendors: HashMap<String, bool>,
    products: HashMap<String, ProductAvailability>,
    vendors_seeded: bool,
    products_seeded: bool,
}

impl LiveState {
    pub(crate) fn new() -> Self {
        Self {
            connection: ConnectionState::Idle,
            vendors: HashMap::new(),
            products: HashMap::new(),
            vendors_seeded: false,
            products_seeded: false,
        }
    }

    pub(crate) fn snapshot(&self) -> LiveSnapshot {
        LiveSnapshot {
            connection: self.connection,
            vendors: self.vendors.clone(),
            products: self.products.clone(),
        }
    }

    /// Seed vendor statuses from the roster read; marks the vendor map as
    /// authoritative so later deltas become notify-worthy.
    pub(crate) fn seed_vendors(&mut self, seeds: &[VendorSeed]) {
        for seed in seeds {
            self.vendors.insert(seed.id.clone(), seed.is_open);
        }
        self.vendors_seeded = true;
    }

    pub(crate) fn seed_products(&mut self, seeds: &[ProductSeed]) {
        for seed in seeds {
            self.products.insert(
                seed.id.clone(),
                ProductAvailability {
                    is_available: seed.is_available,
                    stock: seed.stock,
                },
            );
        }
        self.products_seeded = true;
    }

    /// Apply a snapshot-carrying event, returning the event to fan out.
    ///
    /// The map write always happens (plain overwrite, idempotent on replay);
    /// the return value distinguishes a user-visible transition from a bare
    /// refresh.
    pub(crate) fn apply(&mut self, event: &ServerEvent) -> Option<ChannelEvent> {
        match event {
            ServerEvent::VendorStatus(update) => Some(self.apply_vendor(update)),
            ServerEvent::ProductAvailability(update) => Some(self.apply_product(update)),
            _ => None,
        }
    }

    fn apply_vendor(&mut self, update: &VendorStatusUpdate) -> ChannelEvent {
        let previous = self.vendors.insert(update.id.clone(), update.is_open);

        let noteworthy =
            self.vendors_seeded && previous.is_some_and(|was_open| was_open != update.is_open);
        if noteworthy {
            ChannelEvent::VendorTransition {
                vendor_id: update.id.clone(),
                name: update.name.clone(),
                is_open: update.is_open,
            }
        } else {
            ChannelEvent::SnapshotRefreshed
        }
    }

    fn apply_product(&mut self, update: &ProductAvailabilityUpdate) -> ChannelEvent {
        let next = ProductAvailability {
            is_available: update.is_available,
            stock: update.stock,
        };
        let previous = self.products.insert(update.id.clone(), next);

        let noteworthy = self.products_seeded
            && previous.is_some_and(|p| p.is_available != update.is_available);
        if noteworthy {
            ChannelEvent::ProductTransition {
                product_id: update.id.clone(),
                name: update.name.clone(),
                is_available: update.is_available,
            }
        } else {
            ChannelEvent::SnapshotRefreshed
        }
    }
}
