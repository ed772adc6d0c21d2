pub const LOCAL_API_URL: &str = "http://localhost:5000";
pub const LOCAL_WS_URL: &str = "ws://localhost:5000/ws";

/// Storage key holding the full ledger snapshot.
pub const LEDGER_SNAPSHOT_KEY: &str = "cart-storage";
/// Read-only storage keys supplying the last known user coordinates.
pub const USER_LATITUDE_KEY: &str = "user-latitude";
pub const USER_LONGITUDE_KEY: &str = "user-longitude";

/// Bumped whenever the persisted ledger layout changes; snapshots written
/// under a different version are discarded on load.
pub const LEDGER_SCHEMA_VERSION: u32 = 1;
