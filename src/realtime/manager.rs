use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::de::DeserializeOwned;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::ports::TimeProvider;
use crate::ports::transport::{Transport, TransportChannel, TransportEvent};
use crate::realtime::subscribers::{SubscriberMap, SubscriptionHandle};
use crate::types::frame::{self, WireFrame, parse_frame};

#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// Fixed at construction; the composition root owns the
    /// one-instance-per-process guarantee.
    pub url: String,
    pub base_reconnect_delay: Duration,
    pub max_reconnect_delay: Duration,
    pub max_reconnect_attempts: u32,
    /// Application-level ping cadence while connected. Detects half-open
    /// connections; a pong timeout is deliberately not enforced here.
    pub heartbeat_interval: Duration,
}

impl ManagerConfig {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            base_reconnect_delay: Duration::from_secs(1),
            max_reconnect_delay: Duration::from_secs(30),
            max_reconnect_attempts: 5,
            heartbeat_interval: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Connected,
    Disconnected,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendError {
    /// The frame was dropped: sends are never buffered while disconnected.
    NotConnected,
    /// `connection.*` event types are emitted locally, never written out.
    ReservedType,
    Serialize(String),
}

impl std::fmt::Display for SendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SendError::NotConnected => f.write_str("not connected; frame dropped"),
            SendError::ReservedType => f.write_str("reserved connection event type"),
            SendError::Serialize(message) => write!(f, "failed to encode frame: {message}"),
        }
    }
}

impl std::error::Error for SendError {}

/// Owns at most one live transport connection, multiplexes it to any number
/// of subscribers, and recovers from non-normal closures with exponential
/// backoff. Cloning yields another handle to the same connection.
#[derive(Clone)]
pub struct ConnectionManager<T, P> {
    transport: T,
    time: P,
    config: Arc<ManagerConfig>,
    subscribers: Arc<SubscriberMap>,
    shared: Arc<Mutex<Shared>>,
}

struct Shared {
    state: ConnectionState,
    attempts: u32,
    /// Bumped by every connect cycle and by `disconnect()`; tasks carry the
    /// generation they were spawned under and stand down when it is stale.
    generation: u64,
    outbound: Option<mpsc::Sender<String>>,
    driver: Option<JoinHandle<()>>,
    reconnect: Option<JoinHandle<()>>,
    heartbeat: Option<JoinHandle<()>>,
}

impl Shared {
    fn new() -> Self {
        Self {
            state: ConnectionState::Disconnected,
            attempts: 0,
            generation: 0,
            outbound: None,
            driver: None,
            reconnect: None,
            heartbeat: None,
        }
    }
}

impl<T: Transport, P: TimeProvider> ConnectionManager<T, P> {
    #[must_use]
    pub fn new(transport: T, time: P, config: ManagerConfig) -> Self {
        Self {
            transport,
            time,
            config: Arc::new(config),
            subscribers: Arc::new(SubscriberMap::new()),
            shared: Arc::new(Mutex::new(Shared::new())),
        }
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.shared.lock().expect("manager lock").state
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Registers interest in a named message type, including the reserved
    /// `connection.*` events emitted by the manager itself.
    pub fn subscribe(
        &self,
        message_type: &str,
        handler: impl Fn(&serde_json::Value) + Send + Sync + 'static,
    ) -> SubscriptionHandle {
        SubscriberMap::register(&self.subscribers, message_type, handler)
    }

    /// As `subscribe`, but validates each payload against `D` at the
    /// dispatch boundary.
    pub fn subscribe_typed<D: DeserializeOwned>(
        &self,
        message_type: &str,
        handler: impl Fn(D) + Send + Sync + 'static,
    ) -> SubscriptionHandle {
        SubscriberMap::register_typed(&self.subscribers, message_type, handler)
    }

    /// Idempotent: a no-op while a connection is open or being established.
    /// An explicit call also restarts a manager whose reconnect attempts
    /// were exhausted.
    pub fn connect(&self) {
        let generation = {
            let mut shared = self.shared.lock().expect("manager lock");
            if matches!(
                shared.state,
                ConnectionState::Connecting | ConnectionState::Connected
            ) {
                return;
            }
            shared.state = ConnectionState::Connecting;
            shared.attempts = 0;
            shared.generation += 1;
            shared.generation
        };
        self.spawn_driver(generation);
    }

    /// Normal closure: cancels any pending reconnect and the heartbeat, and
    /// never triggers reconnection. Safe to call in any state, repeatedly.
    pub fn disconnect(&self) {
        let (was_active, handles) = {
            let mut shared = self.shared.lock().expect("manager lock");
            let was_active = shared.driver.is_some()
                || shared.reconnect.is_some()
                || shared.state != ConnectionState::Disconnected;
            shared.generation += 1;
            shared.state = ConnectionState::Disconnected;
            shared.attempts = 0;
            // Dropping the sender asks the transport for a normal closure.
            shared.outbound = None;
            (
                was_active,
                [
                    shared.driver.take(),
                    shared.reconnect.take(),
                    shared.heartbeat.take(),
                ],
            )
        };
        if !was_active {
            return;
        }
        for handle in handles.into_iter().flatten() {
            handle.abort();
        }
        self.emit(frame::CONNECTION_CLOSE, serde_json::json!({"normal": true}));
    }

    /// Writes `{type, data, timestamp}` to the transport. Only valid while
    /// connected: otherwise the frame is dropped with a warning, never
    /// queued for later.
    pub fn send(&self, message_type: &str, data: serde_json::Value) -> Result<(), SendError> {
        if WireFrame::is_reserved_type(message_type) {
            tracing::warn!(message_type, "dropping send of reserved event type");
            return Err(SendError::ReservedType);
        }
        let outbound = {
            let shared = self.shared.lock().expect("manager lock");
            match shared.state {
                ConnectionState::Connected => shared.outbound.clone(),
                _ => None,
            }
        };
        let Some(outbound) = outbound else {
            tracing::warn!(message_type, "dropping send while not connected");
            return Err(SendError::NotConnected);
        };

        let envelope = WireFrame::new(message_type, data, self.time.now_millis());
        let text = serde_json::to_string(&envelope)
            .map_err(|error| SendError::Serialize(error.to_string()))?;
        if outbound.try_send(text).is_err() {
            tracing::warn!(message_type, "dropping send: transport backpressured");
            return Err(SendError::NotConnected);
        }
        Ok(())
    }

    fn spawn_driver(&self, generation: u64) {
        let manager = self.clone();
        let handle = tokio::spawn(async move { manager.run_connect_cycle(generation).await });
        let mut shared = self.shared.lock().expect("manager lock");
        if shared.generation == generation {
            shared.driver = Some(handle);
        } else {
            handle.abort();
        }
    }

    async fn run_connect_cycle(&self, generation: u64) {
        match self.transport.connect(&self.config.url).await {
            Ok(channel) => self.run_connected(generation, channel).await,
            Err(error) => {
                {
                    let mut shared = self.shared.lock().expect("manager lock");
                    if shared.generation != generation {
                        return;
                    }
                    shared.state = ConnectionState::Error;
                }
                tracing::warn!(%error, url = %self.config.url, "transport connect failed");
                self.emit(
                    frame::CONNECTION_ERROR,
                    serde_json::json!({"error": error.to_string()}),
                );
                self.finish_close(generation, false);
            }
        }
    }

    async fn run_connected(&self, generation: u64, channel: TransportChannel) {
        let TransportChannel {
            outbound,
            mut events,
        } = channel;
        {
            let mut shared = self.shared.lock().expect("manager lock");
            if shared.generation != generation {
                // disconnect() raced the dial; let the channel drop.
                return;
            }
            shared.state = ConnectionState::Connected;
            shared.attempts = 0;
            shared.outbound = Some(outbound.clone());
            shared.heartbeat = Some(self.spawn_heartbeat(outbound));
        }
        self.emit(frame::CONNECTION_OPEN, serde_json::Value::Null);

        while let Some(event) = events.recv().await {
            match event {
                TransportEvent::Frame(text) => match parse_frame(&text) {
                    Ok(inbound) => {
                        self.subscribers.dispatch(&inbound);
                    }
                    Err(error) => {
                        tracing::error!(%error, "dropping malformed inbound frame");
                    }
                },
                TransportEvent::Error(message) => {
                    {
                        let mut shared = self.shared.lock().expect("manager lock");
                        if shared.generation != generation {
                            return;
                        }
                        shared.state = ConnectionState::Error;
                    }
                    self.emit(
                        frame::CONNECTION_ERROR,
                        serde_json::json!({"error": message}),
                    );
                }
                TransportEvent::Closed { normal } => {
                    self.finish_close(generation, normal);
                    return;
                }
            }
        }
        // Event channel ended without a close notification.
        self.finish_close(generation, false);
    }

    fn spawn_heartbeat(&self, outbound: mpsc::Sender<String>) -> JoinHandle<()> {
        let manager = self.clone();
        tokio::spawn(async move {
            loop {
                manager.time.sleep(manager.config.heartbeat_interval).await;
                let ping = WireFrame::new(
                    frame::PING,
                    serde_json::Value::Null,
                    manager.time.now_millis(),
                );
                let Ok(text) = serde_json::to_string(&ping) else {
                    return;
                };
                if outbound.send(text).await.is_err() {
                    return;
                }
            }
        })
    }

    fn finish_close(&self, generation: u64, normal: bool) {
        {
            let mut shared = self.shared.lock().expect("manager lock");
            if shared.generation != generation {
                return;
            }
            shared.state = ConnectionState::Disconnected;
            shared.outbound = None;
            shared.driver = None;
            if let Some(heartbeat) = shared.heartbeat.take() {
                heartbeat.abort();
            }
        }
        self.emit(
            frame::CONNECTION_CLOSE,
            serde_json::json!({"normal": normal}),
        );
        if !normal {
            self.schedule_reconnect(generation);
        }
    }

    fn schedule_reconnect(&self, generation: u64) {
        let scheduled = {
            let mut shared = self.shared.lock().expect("manager lock");
            if shared.generation != generation {
                return;
            }
            if shared.attempts >= self.config.max_reconnect_attempts {
                None
            } else {
                shared.attempts += 1;
                Some((shared.attempts, backoff_delay(&self.config, shared.attempts)))
            }
        };
        let Some((attempt, delay)) = scheduled else {
            tracing::error!(
                attempts = self.config.max_reconnect_attempts,
                "reconnect attempts exhausted; giving up"
            );
            self.emit(
                frame::CONNECTION_FAILED,
                serde_json::json!({"attempts": self.config.max_reconnect_attempts}),
            );
            return;
        };

        tracing::info!(attempt, delay_ms = delay.as_millis() as u64, "scheduling reconnect");
        let manager = self.clone();
        let handle = tokio::spawn(async move {
            manager.time.sleep(delay).await;
            let next_generation = {
                let mut shared = manager.shared.lock().expect("manager lock");
                if shared.generation != generation {
                    return;
                }
                shared.reconnect = None;
                shared.state = ConnectionState::Connecting;
                shared.generation += 1;
                shared.generation
            };
            manager.spawn_driver(next_generation);
        });
        let mut shared = self.shared.lock().expect("manager lock");
        if shared.generation == generation {
            shared.reconnect = Some(handle);
        } else {
            handle.abort();
        }
    }

    fn emit(&self, frame_type: &str, data: serde_json::Value) {
        let envelope = WireFrame::new(frame_type, data, self.time.now_millis());
        self.subscribers.dispatch(&envelope);
    }
}

fn backoff_delay(config: &ManagerConfig, attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(16);
    config
        .base_reconnect_delay
        .saturating_mul(1u32 << exponent)
        .min(config.max_reconnect_delay)
}
