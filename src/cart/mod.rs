//! Cart ledger: per-category carts with a one-vendor-per-category invariant,
//! durable whole-snapshot persistence and on-demand view derivation.

mod ledger;
mod storage;
mod view;

pub use ledger::CartLedger;
pub use storage::{LedgerSnapshot, StateStore};
pub use view::{DerivedCartView, PricingContext};
