//! Realtime sync channel: a single persistent websocket connection with
//! multi-subscriber fan-out, exponential-backoff reconnection and idempotent
//! snapshot application.

mod backoff;
mod live_state;
pub mod message_types;
mod sync_channel;

pub use backoff::ReconnectPolicy;
pub use live_state::{ChannelEvent, ConnectionState, LiveSnapshot};
pub use sync_channel::{ChannelConfig, ClientRole, SyncChannel};
