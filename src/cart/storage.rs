//! Durable storage for the cart ledger.
//!
//! The ledger persists as a single schema-versioned JSON snapshot under one
//! key, overwritten wholesale after every mutation and restored wholesale at
//! startup. Writes go to a `.tmp` file first and are renamed into place so a
//! crash never leaves a torn snapshot. Two further read-only keys supply the
//! last known user coordinates.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::consts::{
    LEDGER_SCHEMA_VERSION, LEDGER_SNAPSHOT_KEY, USER_LATITUDE_KEY, USER_LONGITUDE_KEY,
};
use crate::types::{CategoryCart, GeoPoint};

/// Persisted form of the ledger.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LedgerSnapshot {
    /// Guards future layout migrations; mismatched snapshots are discarded.
    pub schema_version: u32,
    pub carts: Vec<CategoryCart>,
}

impl LedgerSnapshot {
    pub fn new(carts: Vec<CategoryCart>) -> Self {
        Self {
            schema_version: LEDGER_SCHEMA_VERSION,
            carts,
        }
    }
}

/// File-backed key/value store for the cart slice of client state.
///
/// One file per key under a base directory.
#[derive(Debug)]
pub struct StateStore {
    base_dir: PathBuf,
}

impl StateStore {
    /// Create a store rooted at `base_dir`, creating the directory if needed.
    pub fn new(base_dir: impl Into<PathBuf>) -> io::Result<Self> {
        let base_dir = base_dir.into();
        fs::create_dir_all(&base_dir)?;
        Ok(Self { base_dir })
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.base_dir.join(format!("{key}.json"))
    }

    /// Atomically overwrite the ledger snapshot.
    pub fn save_ledger(&self, snapshot: &LedgerSnapshot) -> io::Result<()> {
        let path = self.key_path(LEDGER_SNAPSHOT_KEY);
        let tmp_path = path.with_extension("json.tmp");

        let json = serde_json::to_string(snapshot)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, format!("JSON serialize: {e}")))?;

        fs::write(&tmp_path, &json)?;
        fs::rename(&tmp_path, &path)?;

        debug!(
            carts = snapshot.carts.len(),
            "Ledger snapshot saved to {}",
            path.display()
        );
        Ok(())
    }

    /// Load the persisted ledger snapshot.
    ///
    /// Returns `Ok(None)` when no snapshot exists or when the stored schema
    /// version doesn't match the current one.
    pub fn load_ledger(&self) -> io::Result<Option<LedgerSnapshot>> {
        let path = self.key_path(LEDGER_SNAPSHOT_KEY);
        if !path.exists() {
            return Ok(None);
        }

        let json = fs::read_to_string(&path)?;
        let snapshot: LedgerSnapshot = serde_json::from_str(&json).map_err(|e| {
            io::Error::new(io::ErrorKind::InvalidData, format!("JSON deserialize: {e}"))
        })?;

        if snapshot.schema_version != LEDGER_SCHEMA_VERSION {
            warn!(
                found = snapshot.schema_version,
                expected = LEDGER_SCHEMA_VERSION,
                "Discarding ledger snapshot with unknown schema version"
            );
            return Ok(None);
        }

        info!(
            carts = snapshot.carts.len(),
            "Restored ledger snapshot from {}",
            path.display()
        );
        Ok(Some(snapshot))
    }

    /// Last known user coordinates, if both read-only keys are present and
    /// parseable. These keys are written by the address flow, not by us.
    pub fn load_user_location(&self) -> Option<GeoPoint> {
        let latitude = self.read_coordinate(USER_LATITUDE_KEY)?;
        let longitude = self.read_coordinate(USER_LONGITUDE_KEY)?;
        Some(GeoPoint::new(latitude, longitude))
    }

    fn read_coordinate(&self, key: &str) -> Option<f64> {
        let path = self.key_path(key);
        let text = fs::read_to_string(&path).ok()?;
        match text.trim().parse::<f64>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(key = key, "Unparseable coordinate value in {}", path.display());
                None
            }
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }
}
