//! The realtime sync channel: one persistent websocket connection shared by
//! any number of observers.
//!
//! `SyncChannel` is an explicitly constructed, long-lived service object.
//! Observers subscribe with a callback and get back an opaque handle; they
//! never touch the socket. The first subscriber spawns a connection worker,
//! the last unsubscribe tears it down (cancelling any pending retry), and a
//! dropped connection is retried with exponential backoff until the retry
//! budget runs out, after which the channel just stays `Closed`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::protocol};
use tracing::{debug, info, warn};

use crate::errors::Error;
use crate::prelude::*;
use crate::types::{ProductAvailability, ProductSeed, VendorSeed};

use super::backoff::{ReconnectPolicy, RetryBudget};
use super::live_state::{ChannelEvent, ConnectionState, LiveSnapshot, LiveState};
use super::message_types::ServerEvent;

/// Client role sent as a connection parameter; the backend scopes broadcast
/// fan-out by role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientRole {
    Browser,
    Customer,
    Vendor,
    Courier,
    Admin,
}

impl ClientRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClientRole::Browser => "browser",
            ClientRole::Customer => "customer",
            ClientRole::Vendor => "vendor",
            ClientRole::Courier => "courier",
            ClientRole::Admin => "admin",
        }
    }
}

/// Connection settings for [`SyncChannel`].
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Websocket endpoint, e.g. `ws://localhost:5000/ws`.
    pub url: String,
    pub role: ClientRole,
    /// Required for authenticated roles; browser connections go without.
    pub auth_token: Option<String>,
    pub reconnect: ReconnectPolicy,
}

impl ChannelConfig {
    pub fn browser(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            role: ClientRole::Browser,
            auth_token: None,
            reconnect: ReconnectPolicy::default(),
        }
    }

    fn endpoint_url(&self) -> String {
        let mut url = format!("{}?type={}", self.url, self.role.as_str());
        if let Some(token) = &self.auth_token {
            url.push_str("&token=");
            url.push_str(token);
        }
        url
    }
}

type SubscriberCallback = dyn Fn(&ChannelEvent) + Send + Sync;
type InvalidateHook = dyn Fn(&str) + Send + Sync;

enum WorkerCommand {
    /// Preempt a pending backoff sleep (or force-close an open socket) and
    /// connect again right away.
    ReconnectNow,
}

struct WorkerLink {
    commands: UnboundedSender<WorkerCommand>,
    join: JoinHandle<()>,
}

pub struct SyncChannel {
    config: ChannelConfig,
    state: Mutex<LiveState>,
    subscribers: Mutex<HashMap<u64, Arc<SubscriberCallback>>>,
    next_subscriber_id: AtomicU64,
    invalidate: Mutex<Option<Arc<InvalidateHook>>>,
    worker: Mutex<Option<WorkerLink>>,
}

impl SyncChannel {
    pub fn new(config: ChannelConfig) -> Arc<Self> {
        Arc::new(Self {
            config,
            state: Mutex::new(LiveState::new()),
            subscribers: Mutex::new(HashMap::new()),
            next_subscriber_id: AtomicU64::new(0),
            invalidate: Mutex::new(None),
            worker: Mutex::new(None),
        })
    }

    /// Register an observer. The first subscriber brings the connection up,
    /// so this must be called from within a Tokio runtime.
    ///
    /// The callback runs on the connection worker task, synchronously after
    /// each snapshot mutation; read current state through the snapshot
    /// getters, not the event alone.
    pub fn subscribe<F>(self: &Arc<Self>, callback: F) -> u64
    where
        F: Fn(&ChannelEvent) + Send + Sync + 'static,
    {
        let id = self.next_subscriber_id.fetch_add(1, Ordering::SeqCst);
        self.subscribers
            .lock()
            .expect("subscriber lock poisoned")
            .insert(id, Arc::new(callback));

        self.ensure_worker();
        id
    }

    /// Drop an observer; tearing out the last one closes the connection and
    /// cancels any scheduled retry.
    pub fn unsubscribe(&self, handle: u64) -> Result<()> {
        let remaining = {
            let mut subscribers = self.subscribers.lock().expect("subscriber lock poisoned");
            if subscribers.remove(&handle).is_none() {
                return Err(Error::SubscriberNotFound);
            }
            subscribers.len()
        };

        if remaining == 0 {
            self.teardown();
        }
        Ok(())
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().expect("subscriber lock poisoned").len()
    }

    /// Ask for an immediate reconnect, preempting any pending backoff timer
    /// rather than stacking a second one. If the worker already exhausted
    /// its retry budget it is restarted with a fresh budget.
    pub fn reconnect_now(self: &Arc<Self>) {
        let sent = {
            let worker = self.worker.lock().expect("worker lock poisoned");
            match worker.as_ref() {
                Some(link) => link.commands.send(WorkerCommand::ReconnectNow).is_ok(),
                None => false,
            }
        };

        if !sent && self.subscriber_count() > 0 {
            info!("Reconnect requested after worker gave up; restarting worker");
            self.respawn_worker();
        }
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.state.lock().expect("state lock poisoned").connection
    }

    /// Read-only copy of the current vendor/product snapshots.
    pub fn live_snapshot(&self) -> LiveSnapshot {
        self.state.lock().expect("state lock poisoned").snapshot()
    }

    pub fn is_vendor_open(&self, vendor_id: &str) -> Option<bool> {
        self.live_snapshot().is_vendor_open(vendor_id)
    }

    pub fn product_availability(&self, product_id: &str) -> Option<ProductAvailability> {
        self.live_snapshot().product_availability(product_id)
    }

    /// Seed the vendor snapshot from the roster read. Deltas arriving before
    /// this are recorded but never surfaced as transitions.
    pub fn apply_vendor_roster(&self, seeds: &[VendorSeed]) {
        {
            let mut state = self.state.lock().expect("state lock poisoned");
            state.seed_vendors(seeds);
        }
        debug!(vendors = seeds.len(), "Vendor roster applied");
        self.fan_out(&ChannelEvent::SnapshotRefreshed);
    }

    pub fn apply_product_roster(&self, seeds: &[ProductSeed]) {
        {
            let mut state = self.state.lock().expect("state lock poisoned");
            state.seed_products(seeds);
        }
        debug!(products = seeds.len(), "Product roster applied");
        self.fan_out(&ChannelEvent::SnapshotRefreshed);
    }

    /// Hook invoked with the wire type name of recognized domain events this
    /// core doesn't consume (cache invalidation and the like).
    pub fn set_invalidate_hook<F>(&self, hook: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        *self.invalidate.lock().expect("invalidate lock poisoned") = Some(Arc::new(hook));
    }

    fn ensure_worker(self: &Arc<Self>) {
        let mut worker = self.worker.lock().expect("worker lock poisoned");
        let alive = worker.as_ref().is_some_and(|link| !link.join.is_finished());
        if alive {
            return;
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let join = tokio::spawn(run_worker(Arc::clone(self), rx));
        *worker = Some(WorkerLink { commands: tx, join });
    }

    fn respawn_worker(self: &Arc<Self>) {
        {
            let mut worker = self.worker.lock().expect("worker lock poisoned");
            if let Some(link) = worker.take() {
                link.join.abort();
            }
        }
        self.ensure_worker();
    }

    fn teardown(&self) {
        let link = self.worker.lock().expect("worker lock poisoned").take();
        if let Some(link) = link {
            link.join.abort();
            debug!("Connection worker stopped; no subscribers remain");
        }
        self.transition(ConnectionState::Idle);
    }

    /// Move the connection state machine, fanning the change out to
    /// subscribers. No-op when the state is unchanged.
    fn transition(&self, next: ConnectionState) {
        {
            let mut state = self.state.lock().expect("state lock poisoned");
            if state.connection == next {
                return;
            }
            state.connection = next;
        }
        info!(state = ?next, "Sync channel connection state changed");
        self.fan_out(&ChannelEvent::ConnectionChanged(next));
    }

    /// Route one inbound text frame: mutate the snapshot, then notify every
    /// subscriber exactly once. Parse failures and unknown event types are
    /// logged and dropped, never raised.
    fn ingest(&self, text: &str) {
        let event = match ServerEvent::parse(text) {
            Ok(event) => event,
            Err(err) => {
                warn!("Dropping undecodable frame: {err}");
                return;
            }
        };

        match &event {
            ServerEvent::Connected => debug!("Handshake ack received"),
            ServerEvent::Unknown => debug!("Ignoring unrecognized event type"),
            ServerEvent::Passthrough { kind } => {
                let hook = self
                    .invalidate
                    .lock()
                    .expect("invalidate lock poisoned")
                    .clone();
                if let Some(hook) = hook {
                    hook(kind);
                }
            }
            _ => {
                let fan_out_event = {
                    let mut state = self.state.lock().expect("state lock poisoned");
                    state.apply(&event)
                };
                if let Some(fan_out_event) = fan_out_event {
                    self.fan_out(&fan_out_event);
                }
            }
        }
    }

    fn fan_out(&self, event: &ChannelEvent) {
        let callbacks: Vec<Arc<SubscriberCallback>> = self
            .subscribers
            .lock()
            .expect("subscriber lock poisoned")
            .values()
            .cloned()
            .collect();
        for callback in callbacks {
            callback(event);
        }
    }

    fn handle_frame(&self, frame: protocol::Message) {
        match frame {
            protocol::Message::Text(text) => self.ingest(&text),
            protocol::Message::Ping(_) | protocol::Message::Pong(_) => {}
            protocol::Message::Close(_) => debug!("Server sent close frame"),
            other => debug!("Ignoring non-text frame: {other:?}"),
        }
    }
}

/// Connection lifecycle loop. Runs while subscribers exist; aborted by the
/// channel on teardown.
async fn run_worker(channel: Arc<SyncChannel>, mut commands: UnboundedReceiver<WorkerCommand>) {
    let mut budget = RetryBudget::new(channel.config.reconnect.clone());
    let url = channel.config.endpoint_url();

    loop {
        channel.transition(ConnectionState::Connecting);

        let delay = match connect_async(url.as_str()).await {
            Ok((stream, _)) => {
                budget.record_open();
                channel.transition(ConnectionState::Open);

                let (mut writer, mut reader) = stream.split();
                loop {
                    tokio::select! {
                        frame = reader.next() => match frame {
                            Some(Ok(frame)) => channel.handle_frame(frame),
                            Some(Err(err)) => {
                                warn!("Websocket read error: {err}");
                                break;
                            }
                            None => {
                                warn!("Websocket closed by remote");
                                break;
                            }
                        },
                        command = commands.recv() => match command {
                            Some(WorkerCommand::ReconnectNow) => {
                                info!("Manual reconnect; closing current connection");
                                if let Err(err) = writer.send(protocol::Message::Close(None)).await {
                                    debug!("Error sending close frame: {err}");
                                }
                                break;
                            }
                            None => return,
                        },
                    }
                }
                channel.transition(ConnectionState::Closed);
                budget.reconnect_delay()
            }
            Err(err) => {
                channel.transition(ConnectionState::Closed);
                match budget.record_failure() {
                    Some(delay) => {
                        warn!(failures = budget.failures(), "Could not connect to websocket: {err}");
                        delay
                    }
                    None => {
                        // Out of budget: stop silently, observable only as a
                        // persistently Closed state.
                        warn!(
                            failures = budget.failures(),
                            "Reconnect budget exhausted; giving up: {err}"
                        );
                        return;
                    }
                }
            }
        };

        debug!(delay_ms = delay.as_millis() as u64, "Scheduling reconnect");
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            command = commands.recv() => match command {
                Some(WorkerCommand::ReconnectNow) => {
                    info!("Manual reconnect; skipping scheduled backoff");
                }
                None => return,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_channel() -> Arc<SyncChannel> {
        SyncChannel::new(ChannelConfig::browser("ws://127.0.0.1:9/ws"))
    }

    fn collect_events(channel: &Arc<SyncChannel>) -> (u64, Arc<Mutex<Vec<ChannelEvent>>>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let handle = channel.subscribe(move |event| {
            sink.lock().unwrap().push(event.clone());
        });
        (handle, events)
    }

    fn vendor_frame(id: &str, is_open: bool) -> String {
        format!(
            r#"{{"type":"vendor_status_update","data":{{"id":"{id}","name":"Vendor {id}","isActive":{is_open}}}}}"#
        )
    }

    #[tokio::test]
    async fn endpoint_url_carries_role_and_token() {
        let config = ChannelConfig {
            url: "ws://localhost:5000/ws".to_string(),
            role: ClientRole::Vendor,
            auth_token: Some("t0ken".to_string()),
            reconnect: ReconnectPolicy::default(),
        };
        assert_eq!(config.endpoint_url(), "ws://localhost:5000/ws?type=vendor&token=t0ken");

        let config = ChannelConfig::browser("ws://localhost:5000/ws");
        assert_eq!(config.endpoint_url(), "ws://localhost:5000/ws?type=browser");
    }

    #[tokio::test]
    async fn every_accepted_event_fans_out_once_per_subscriber() {
        let channel = test_channel();
        let (h1, events_a) = collect_events(&channel);
        let (h2, events_b) = collect_events(&channel);

        channel.ingest(&vendor_frame("v1", true));

        assert_eq!(events_a.lock().unwrap().len(), 1);
        assert_eq!(events_b.lock().unwrap().len(), 1);
        assert_eq!(channel.is_vendor_open("v1"), Some(true));

        channel.unsubscribe(h1).unwrap();
        channel.ingest(&vendor_frame("v1", true));
        assert_eq!(events_a.lock().unwrap().len(), 1, "removed subscriber stays quiet");
        assert_eq!(events_b.lock().unwrap().len(), 2);

        channel.unsubscribe(h2).unwrap();
    }

    #[tokio::test]
    async fn transitions_only_surface_after_roster_seed() {
        let channel = test_channel();
        let (handle, events) = collect_events(&channel);

        // Pre-seed burst: applied, but no transitions.
        channel.ingest(&vendor_frame("v1", true));
        channel.ingest(&vendor_frame("v1", false));
        assert!(events
            .lock()
            .unwrap()
            .iter()
            .all(|e| matches!(e, ChannelEvent::SnapshotRefreshed)));
        assert_eq!(channel.is_vendor_open("v1"), Some(false));

        channel.apply_vendor_roster(&[VendorSeed {
            id: "v1".to_string(),
            name: "Vendor v1".to_string(),
            is_open: false,
            location: None,
        }]);

        events.lock().unwrap().clear();
        channel.ingest(&vendor_frame("v1", true));
        assert_eq!(
            events.lock().unwrap().as_slice(),
            &[ChannelEvent::VendorTransition {
                vendor_id: "v1".to_string(),
                name: "Vendor v1".to_string(),
                is_open: true,
            }]
        );

        channel.unsubscribe(handle).unwrap();
    }

    #[tokio::test]
    async fn passthrough_events_hit_the_invalidate_hook_only() {
        let channel = test_channel();
        let (handle, events) = collect_events(&channel);

        let invalidated = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&invalidated);
        channel.set_invalidate_hook(move |kind| sink.lock().unwrap().push(kind.to_string()));

        channel.ingest(r#"{"type":"subscription_update","data":{"id":"s1"}}"#);
        channel.ingest(r#"{"type":"totally_new_thing","data":{}}"#);
        channel.ingest("not json at all");

        assert_eq!(invalidated.lock().unwrap().as_slice(), &["subscription_update".to_string()]);
        assert!(events.lock().unwrap().is_empty(), "no subscriber fan-out for passthrough");

        channel.unsubscribe(handle).unwrap();
    }

    #[tokio::test]
    async fn unsubscribing_last_observer_returns_to_idle() {
        let channel = test_channel();
        let (handle, _events) = collect_events(&channel);
        assert_eq!(channel.subscriber_count(), 1);

        channel.unsubscribe(handle).unwrap();
        assert_eq!(channel.subscriber_count(), 0);
        assert_eq!(channel.connection_state(), ConnectionState::Idle);

        assert!(matches!(
            channel.unsubscribe(handle),
            Err(Error::SubscriberNotFound)
        ));
    }

    #[tokio::test]
    async fn connection_transitions_fan_out() {
        let channel = test_channel();
        let (handle, events) = collect_events(&channel);

        channel.transition(ConnectionState::Connecting);
        channel.transition(ConnectionState::Open);
        channel.transition(ConnectionState::Open); // duplicate: no event
        channel.transition(ConnectionState::Closed);

        let seen: Vec<ChannelEvent> = events.lock().unwrap().clone();
        assert_eq!(
            seen,
            vec![
                ChannelEvent::ConnectionChanged(ConnectionState::Connecting),
                ChannelEvent::ConnectionChanged(ConnectionState::Open),
                ChannelEvent::ConnectionChanged(ConnectionState::Closed),
            ]
        );

        channel.unsubscribe(handle).unwrap();
    }
}
