//! Realtime Channel Module
//!
//! Owns one persistent push connection to the server's `/api/ws`
//! endpoint: a connection state machine, exponential-backoff
//! reconnection, a 30-second heartbeat, and a publish/subscribe fan-out
//! of file-system events to registered listeners. Cache invalidation is
//! wired by the caller: register a listener and call into the cache
//! store from it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

use crate::error::{ChannelError, Result};
use crate::realtime::backoff::{
    ReconnectPolicy, DEFAULT_BASE_DELAY, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_DELAY,
};
use crate::realtime::event::{ClientMessage, FileSystemEvent};

// == Constants ==
/// Listener key receiving every event regardless of its kind.
pub const WILDCARD: &str = "*";

/// Interval between heartbeat pings once connected.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;
type WsStream = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

// == Connection Status ==
/// Externally observable channel state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
    Error,
}

// == Channel Config ==
/// Connection endpoint and timing knobs for the realtime channel.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Full websocket URL (`ws://` or `wss://`)
    pub url: String,
    /// First reconnect delay
    pub base_delay: Duration,
    /// Reconnect delay ceiling
    pub max_delay: Duration,
    /// Automatic reconnect attempts before giving up
    pub max_reconnect_attempts: u32,
    /// Heartbeat ping interval
    pub heartbeat_interval: Duration,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            url: "ws://localhost/api/ws".to_string(),
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            max_reconnect_attempts: DEFAULT_MAX_ATTEMPTS,
            heartbeat_interval: HEARTBEAT_INTERVAL,
        }
    }
}

impl ChannelConfig {
    /// Resolves the endpoint for a page origin: `wss` when the page is
    /// served over HTTPS, `ws` otherwise, always at `/api/ws`.
    pub fn for_origin(host: &str, secure: bool) -> Self {
        let scheme = if secure { "wss" } else { "ws" };
        Self {
            url: format!("{scheme}://{host}/api/ws"),
            ..Self::default()
        }
    }
}

// == Listener Handle ==
/// Handle returned by `add_event_listener`, used for removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type EventCallback = Arc<dyn Fn(&FileSystemEvent) -> anyhow::Result<()> + Send + Sync>;

/// Message queued toward the connection task.
enum Outbound {
    Frame(ClientMessage),
    /// Send a normal-closure frame and end the session.
    Shutdown,
}

/// How a connection session ended.
enum SessionEnd {
    /// The websocket handshake failed
    HandshakeFailed,
    /// Close code other than 1000, stream error, or silent EOF
    Abnormal,
    /// Server closed with code 1000
    NormalClose,
    /// `disconnect()` was called
    Manual,
    /// Superseded by a newer `connect()`/`disconnect()` generation
    Cancelled,
}

// == Realtime Channel ==
/// Resilient realtime push channel. Cheap to clone; clones share the
/// same connection and listener registry.
#[derive(Clone)]
pub struct RealtimeChannel {
    shared: Arc<ChannelShared>,
}

struct ChannelShared {
    config: ChannelConfig,
    status_tx: watch::Sender<ConnectionStatus>,
    /// Suppresses auto-reconnect after an explicit `disconnect()`
    manual_disconnect: AtomicBool,
    /// Cancellation token: pending reconnect timers compare their
    /// captured generation at fire time and abort when stale
    generation: AtomicU64,
    policy: Mutex<ReconnectPolicy>,
    /// Remembered folder subscription intent, replayed on reconnect
    current_folder: Mutex<Option<i64>>,
    last_event: Mutex<Option<FileSystemEvent>>,
    listeners: Mutex<HashMap<String, Vec<(ListenerId, EventCallback)>>>,
    next_listener_id: AtomicU64,
    /// Sender toward the active connection task, when one exists
    outbound: Mutex<Option<mpsc::UnboundedSender<Outbound>>>,
}

impl RealtimeChannel {
    // == Constructor ==
    /// Creates a channel for the given endpoint. The URL scheme is
    /// validated here, before any connection is made.
    pub fn new(config: ChannelConfig) -> Result<Self> {
        if !config.url.starts_with("ws://") && !config.url.starts_with("wss://") {
            return Err(ChannelError::InvalidUrl(config.url));
        }

        let (status_tx, _status_rx) = watch::channel(ConnectionStatus::Disconnected);
        let policy = ReconnectPolicy::new(
            config.base_delay,
            config.max_delay,
            config.max_reconnect_attempts,
        );

        Ok(Self {
            shared: Arc::new(ChannelShared {
                config,
                status_tx,
                manual_disconnect: AtomicBool::new(false),
                generation: AtomicU64::new(0),
                policy: Mutex::new(policy),
                current_folder: Mutex::new(None),
                last_event: Mutex::new(None),
                listeners: Mutex::new(HashMap::new()),
                next_listener_id: AtomicU64::new(1),
                outbound: Mutex::new(None),
            }),
        })
    }

    // == Connect ==
    /// Opens the push connection. No-op when already connected or a
    /// connection attempt is in flight. Supersedes any pending
    /// reconnect timer.
    pub fn connect(&self) {
        let status = *self.shared.status_tx.borrow();
        if status == ConnectionStatus::Connected || status == ConnectionStatus::Connecting {
            debug!(?status, "realtime channel connect skipped");
            return;
        }

        self.shared.manual_disconnect.store(false, Ordering::SeqCst);
        let generation = self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.shared.set_status(ConnectionStatus::Connecting);

        let shared = self.shared.clone();
        tokio::spawn(async move {
            ChannelShared::drive(shared, generation).await;
        });
    }

    // == Disconnect ==
    /// Closes the connection with normal-closure semantics and suppresses
    /// any automatic reconnect, including timers already scheduled.
    pub fn disconnect(&self) {
        info!("realtime channel manual disconnect");
        self.shared.manual_disconnect.store(true, Ordering::SeqCst);
        self.shared.generation.fetch_add(1, Ordering::SeqCst);
        self.shared.policy.lock().unwrap().reset();

        if let Some(tx) = self.shared.outbound.lock().unwrap().take() {
            let _ = tx.send(Outbound::Shutdown);
        }
        self.shared.set_status(ConnectionStatus::Disconnected);
    }

    // == Set Current Folder ==
    /// Remembers which folder the client is browsing and, when
    /// connected, tells the server immediately. The remembered intent is
    /// replayed automatically after every successful reconnect, since
    /// the server keeps no session state across connections.
    pub fn set_current_folder(&self, folder_id: Option<i64>) {
        *self.shared.current_folder.lock().unwrap() = folder_id;

        if self.is_connected() {
            self.shared.send(ClientMessage::SetFolder { folder_id });
        } else {
            debug!(?folder_id, "not connected; folder intent remembered");
        }
    }

    /// The remembered folder subscription intent.
    pub fn current_folder(&self) -> Option<i64> {
        *self.shared.current_folder.lock().unwrap()
    }

    // == Listener Registration ==
    /// Registers a callback for a specific event kind (its wire name,
    /// e.g. `"upload"`) or for [`WILDCARD`] to receive every event.
    pub fn add_event_listener<F>(&self, kind: &str, callback: F) -> ListenerId
    where
        F: Fn(&FileSystemEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let id = ListenerId(self.shared.next_listener_id.fetch_add(1, Ordering::SeqCst));
        self.shared
            .listeners
            .lock()
            .unwrap()
            .entry(kind.to_string())
            .or_default()
            .push((id, Arc::new(callback)));
        debug!(kind = %kind, id = id.0, "event listener registered");
        id
    }

    /// Removes a listener by the handle returned at registration.
    pub fn remove_event_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.shared.listeners.lock().unwrap();
        let mut removed = false;
        listeners.retain(|_, entries| {
            let before = entries.len();
            entries.retain(|(entry_id, _)| *entry_id != id);
            removed |= entries.len() != before;
            !entries.is_empty()
        });
        removed
    }

    // == Observability ==
    /// Current connection state snapshot.
    pub fn status(&self) -> ConnectionStatus {
        *self.shared.status_tx.borrow()
    }

    /// Receiver notified on every state transition.
    pub fn subscribe_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.shared.status_tx.subscribe()
    }

    pub fn is_connected(&self) -> bool {
        self.status() == ConnectionStatus::Connected
    }

    /// Clone of the most recently received event, if any.
    pub fn last_event(&self) -> Option<FileSystemEvent> {
        self.shared.last_event.lock().unwrap().clone()
    }
}

impl ChannelShared {
    fn set_status(&self, status: ConnectionStatus) {
        self.status_tx.send_replace(status);
    }

    /// True once this task's generation has been superseded by a later
    /// `connect()`/`disconnect()`.
    fn cancelled(&self, generation: u64) -> bool {
        self.manual_disconnect.load(Ordering::SeqCst)
            || self.generation.load(Ordering::SeqCst) != generation
    }

    /// Queues a frame toward the active connection; a guarded no-op when
    /// there is none.
    fn send(&self, msg: ClientMessage) {
        match &*self.outbound.lock().unwrap() {
            Some(tx) => {
                if tx.send(Outbound::Frame(msg)).is_err() {
                    debug!("outbound queue closed; frame dropped");
                }
            }
            None => debug!("send skipped; channel disconnected"),
        }
    }

    /// Connection driver: one session per iteration, sleeping out the
    /// backoff delay between attempts. Returns when the session ended on
    /// purpose, the attempt cap is exhausted, or the task is superseded.
    async fn drive(shared: Arc<ChannelShared>, generation: u64) {
        loop {
            match shared.run_session(generation).await {
                SessionEnd::Manual | SessionEnd::NormalClose => {
                    shared.set_status(ConnectionStatus::Disconnected);
                    return;
                }
                SessionEnd::Cancelled => return,
                SessionEnd::Abnormal => shared.set_status(ConnectionStatus::Disconnected),
                SessionEnd::HandshakeFailed => shared.set_status(ConnectionStatus::Error),
            }

            let delay = match shared.policy.lock().unwrap().next_delay() {
                Some(delay) => delay,
                None => {
                    warn!("reconnect attempts exhausted; waiting for explicit connect");
                    return;
                }
            };
            let attempt = shared.policy.lock().unwrap().attempts();
            info!(attempt, delay_ms = delay.as_millis() as u64, "reconnect scheduled");

            tokio::time::sleep(delay).await;
            // Cancellation is checked at fire time, so a disposed channel
            // cannot be revived by a timer that was already pending.
            if shared.cancelled(generation) {
                debug!("pending reconnect cancelled");
                return;
            }
            shared.set_status(ConnectionStatus::Connecting);
        }
    }

    /// One websocket session: handshake, intent replay, then the
    /// read/write/heartbeat loop until the connection ends.
    async fn run_session(self: &Arc<Self>, generation: u64) -> SessionEnd {
        info!(url = %self.config.url, "connecting realtime channel");
        let ws = match connect_async(self.config.url.as_str()).await {
            Ok((ws, _response)) => ws,
            Err(err) => {
                error!(error = %err, "realtime connection failed");
                return SessionEnd::HandshakeFailed;
            }
        };

        if self.cancelled(generation) {
            return SessionEnd::Cancelled;
        }

        let (mut sink, mut stream) = ws.split();
        let (tx, rx) = mpsc::unbounded_channel::<Outbound>();
        *self.outbound.lock().unwrap() = Some(tx.clone());
        // A disconnect() racing the handshake may have emptied the
        // outbound slot before this session published its sender; a
        // second check after publishing keeps a stale session from
        // flipping the status back to connected.
        if self.cancelled(generation) {
            return self.finish_session(SessionEnd::Cancelled, generation, &tx);
        }
        self.policy.lock().unwrap().reset();
        self.set_status(ConnectionStatus::Connected);
        info!("realtime channel connected");

        // Restate the subscription intent: the server holds no session
        // state across reconnects.
        let folder = *self.current_folder.lock().unwrap();
        if let Some(folder_id) = folder {
            debug!(folder_id, "replaying folder subscription");
            if !send_frame(&mut sink, &ClientMessage::SetFolder { folder_id: Some(folder_id) }).await
            {
                return self.finish_session(SessionEnd::Abnormal, generation, &tx);
            }
        }

        let end = self.session_loop(&mut sink, &mut stream, rx).await;
        self.finish_session(end, generation, &tx)
    }

    /// Read incoming frames, flush queued outbound frames, and tick the
    /// heartbeat, until the session ends.
    async fn session_loop(
        self: &Arc<Self>,
        sink: &mut WsSink,
        stream: &mut WsStream,
        mut rx: mpsc::UnboundedReceiver<Outbound>,
    ) -> SessionEnd {
        let mut heartbeat = tokio::time::interval(self.config.heartbeat_interval);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // An interval's first tick completes immediately; consume it so
        // pings start one full interval after connect.
        heartbeat.tick().await;

        loop {
            tokio::select! {
                frame = stream.next() => match frame {
                    Some(Ok(Message::Text(text))) => self.handle_frame(&text),
                    Some(Ok(Message::Close(close))) => {
                        let normal = close
                            .as_ref()
                            .map_or(false, |frame| frame.code == CloseCode::Normal);
                        info!(?close, "server closed realtime channel");
                        return if normal { SessionEnd::NormalClose } else { SessionEnd::Abnormal };
                    }
                    // Binary and transport-level control frames are not
                    // part of the protocol
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        warn!(error = %err, "realtime stream error");
                        return SessionEnd::Abnormal;
                    }
                    None => return SessionEnd::Abnormal,
                },
                queued = rx.recv() => match queued {
                    Some(Outbound::Frame(msg)) => {
                        if !send_frame(sink, &msg).await {
                            return SessionEnd::Abnormal;
                        }
                    }
                    Some(Outbound::Shutdown) | None => {
                        let close = CloseFrame {
                            code: CloseCode::Normal,
                            reason: "Manual disconnect".into(),
                        };
                        let _ = sink.send(Message::Close(Some(close))).await;
                        return SessionEnd::Manual;
                    }
                },
                _ = heartbeat.tick() => {
                    if !send_frame(sink, &ClientMessage::Ping).await {
                        return SessionEnd::Abnormal;
                    }
                }
            }
        }
    }

    /// Releases the outbound slot (if still owned by this session) and
    /// reclassifies the outcome when the channel was disposed meanwhile.
    fn finish_session(
        &self,
        end: SessionEnd,
        generation: u64,
        tx: &mpsc::UnboundedSender<Outbound>,
    ) -> SessionEnd {
        let mut outbound = self.outbound.lock().unwrap();
        if outbound
            .as_ref()
            .map_or(false, |existing| existing.same_channel(tx))
        {
            *outbound = None;
        }
        drop(outbound);

        if self.manual_disconnect.load(Ordering::SeqCst) {
            return SessionEnd::Manual;
        }
        if self.cancelled(generation) {
            return SessionEnd::Cancelled;
        }
        end
    }

    /// Parses an incoming text frame and fans it out. A malformed frame
    /// is logged and discarded; the channel stays alive.
    fn handle_frame(&self, text: &str) {
        let event = match serde_json::from_str::<FileSystemEvent>(text) {
            Ok(event) => event,
            Err(err) => {
                warn!(error = %err, "failed to parse realtime frame");
                return;
            }
        };

        debug!(kind = event.kind.as_str(), folder_id = ?event.folder_id, "realtime event");
        *self.last_event.lock().unwrap() = Some(event.clone());
        self.dispatch(&event);
    }

    /// Invokes kind-specific listeners then wildcard listeners. Failures
    /// are logged per listener and never abort the remaining dispatch.
    fn dispatch(&self, event: &FileSystemEvent) {
        let callbacks: Vec<(ListenerId, EventCallback)> = {
            let listeners = self.listeners.lock().unwrap();
            [event.kind.as_str(), WILDCARD]
                .iter()
                .filter_map(|key| listeners.get(*key))
                .flatten()
                .map(|(id, cb)| (*id, cb.clone()))
                .collect()
        };

        for (id, callback) in callbacks {
            if let Err(err) = callback(event) {
                warn!(listener = id.0, error = %err, "event listener failed");
            }
        }
    }
}

/// Encodes and sends one client frame. Returns false when the transport
/// failed and the session should end.
async fn send_frame(sink: &mut WsSink, msg: &ClientMessage) -> bool {
    let text = match serde_json::to_string(msg) {
        Ok(text) => text,
        Err(err) => {
            error!(error = %err, "failed to encode outbound frame");
            return true;
        }
    };

    match sink.send(Message::Text(text)).await {
        Ok(()) => true,
        Err(err) => {
            warn!(error = %err, "failed to send frame");
            false
        }
    }
}
