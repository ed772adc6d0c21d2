//! The cart ledger: an ordered set of category carts, at most one per
//! category, each bound to exactly one vendor.
//!
//! All mutations are synchronous and single-writer. Expected business
//! rejections come back as [`CartError`] values and leave the ledger
//! untouched. Every call that actually changes the ledger triggers a
//! best-effort full-snapshot write; storage failures are logged and
//! swallowed so the in-memory ledger stays authoritative for the session.

use tracing::{debug, warn};

use crate::errors::CartError;
use crate::types::{CartLine, CategoryCart, ItemInput};

use super::storage::{LedgerSnapshot, StateStore};

#[derive(Debug, Default)]
pub struct CartLedger {
    carts: Vec<CategoryCart>,
    store: Option<StateStore>,
}

impl CartLedger {
    /// In-memory ledger with no durable backing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ledger backed by `store`, restored wholesale from the persisted
    /// snapshot when one exists.
    pub fn with_store(store: StateStore) -> Self {
        let carts = match store.load_ledger() {
            Ok(Some(snapshot)) => snapshot.carts,
            Ok(None) => Vec::new(),
            Err(err) => {
                warn!("Could not restore ledger snapshot: {err}");
                Vec::new()
            }
        };
        Self {
            carts,
            store: Some(store),
        }
    }

    /// Add one unit of `item` to its category cart.
    ///
    /// Creates the cart on first add, increments the line when the item is
    /// already present, appends a new line otherwise. Fails without mutating
    /// when the item is missing ids or the category is bound to a different
    /// vendor.
    pub fn add_line(&mut self, item: ItemInput, category_name: &str) -> Result<(), CartError> {
        let Some(category_id) = item.category_id.clone() else {
            return Err(CartError::MissingCategory);
        };
        let Some(vendor_id) = item.vendor_id.clone() else {
            return Err(CartError::MissingVendor);
        };

        if let Some(cart) = self.carts.iter().find(|c| c.category_id == category_id) {
            if cart.vendor_id != vendor_id {
                return Err(CartError::VendorConflict {
                    vendor_name: cart.vendor_name.clone(),
                });
            }
        }

        let line = CartLine {
            id: item.id,
            name: item.name,
            unit_price: item.unit_price,
            quantity: 1,
            image_ref: item.image_ref,
            offer_percent: item.offer_percent,
        };

        match self
            .carts
            .iter()
            .position(|c| c.category_id == category_id)
        {
            None => {
                self.carts.push(CategoryCart {
                    category_id,
                    category_name: category_name.to_string(),
                    vendor_id,
                    vendor_name: item.vendor_name.unwrap_or_default(),
                    vendor_location: item.vendor_location,
                    lines: vec![line],
                });
            }
            Some(cart_index) => {
                let cart = &mut self.carts[cart_index];
                match cart.lines.iter().position(|l| l.id == line.id) {
                    Some(line_index) => cart.lines[line_index].quantity += 1,
                    None => cart.lines.push(line),
                }
            }
        }

        self.persist();
        Ok(())
    }

    /// Replace a line's quantity. `qty <= 0` behaves as [`Self::remove_line`];
    /// repeating a call with the same quantity is a no-op after the first.
    pub fn set_quantity(&mut self, category_id: &str, item_id: &str, qty: i64) {
        if qty <= 0 {
            self.remove_line(category_id, item_id);
            return;
        }
        let qty = qty as u32;

        let mut changed = false;
        if let Some(cart) = self.carts.iter_mut().find(|c| c.category_id == category_id) {
            if let Some(line) = cart.lines.iter_mut().find(|l| l.id == item_id) {
                if line.quantity != qty {
                    line.quantity = qty;
                    changed = true;
                }
            }
        }

        if changed {
            self.persist();
        }
    }

    /// Remove a line; a cart whose last line goes away is dropped entirely,
    /// so the ledger never holds zero-line carts.
    pub fn remove_line(&mut self, category_id: &str, item_id: &str) {
        let mut changed = false;
        if let Some(cart) = self.carts.iter_mut().find(|c| c.category_id == category_id) {
            let before = cart.lines.len();
            cart.lines.retain(|l| l.id != item_id);
            changed = cart.lines.len() != before;
        }
        self.carts.retain(|c| !c.lines.is_empty());

        if changed {
            self.persist();
        }
    }

    /// Drop one category's cart (used after order placement).
    pub fn clear_category(&mut self, category_id: &str) {
        let before = self.carts.len();
        self.carts.retain(|c| c.category_id != category_id);
        if self.carts.len() != before {
            self.persist();
        }
    }

    /// Drop every cart (logout or full reset).
    pub fn clear_all(&mut self) {
        if !self.carts.is_empty() {
            self.carts.clear();
            self.persist();
        }
    }

    pub fn cart(&self, category_id: &str) -> Option<&CategoryCart> {
        self.carts.iter().find(|c| c.category_id == category_id)
    }

    pub fn carts(&self) -> &[CategoryCart] {
        &self.carts
    }

    pub fn is_empty(&self) -> bool {
        self.carts.is_empty()
    }

    /// Item count across one category, or across the whole ledger.
    pub fn total_items(&self, category_id: Option<&str>) -> u32 {
        match category_id {
            Some(id) => self.cart(id).map_or(0, CategoryCart::total_items),
            None => self.carts.iter().map(CategoryCart::total_items).sum(),
        }
    }

    pub fn subtotal(&self, category_id: &str) -> f64 {
        self.cart(category_id).map_or(0.0, CategoryCart::subtotal)
    }

    /// Current persisted form of the ledger.
    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot::new(self.carts.clone())
    }

    /// Replace the whole ledger from a snapshot (startup restore path).
    pub fn restore(&mut self, snapshot: LedgerSnapshot) {
        self.carts = snapshot.carts;
    }

    // Fire-and-forget: the caller never learns about storage failures.
    fn persist(&self) {
        let Some(store) = &self.store else {
            return;
        };
        if let Err(err) = store.save_ledger(&self.snapshot()) {
            warn!("Ledger snapshot write failed: {err}");
        } else {
            debug!(carts = self.carts.len(), "Ledger snapshot persisted");
        }
    }
}
