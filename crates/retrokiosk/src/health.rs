//! Connection health monitor.
//!
//! Owns the health-check WebSocket: opens it, pings it, counts failures
//! and reconnects after a fixed delay. The socket itself lives in a
//! spawned driver task per connection attempt; the monitor talks to it
//! through channels and tags every event with the attempt's generation so
//! late events from an abandoned socket are ignored.
//!
//! ```text
//!            open                 close / error (loaded, < max)
//! Connecting ────▶ Open ───────────────────────────▶ Reconnecting
//!     ▲                                                  │ 5s
//!     └──────────────────────────────────────────────────┘
//!
//! failures == max  ──▶ Failed        close()  ──▶ Closed
//! ```

use std::sync::Arc;
use std::time::Duration;

use retrokiosk_protocol::{Codec, Envelope, JsonCodec, MessageKind};
use retrokiosk_tick::IntervalTimer;
use retrokiosk_transport::{Connection, Connector};
use tokio::sync::mpsc;
use tokio::time::{self, Instant};
use url::Url;

// ---------------------------------------------------------------------------
// HealthConfig
// ---------------------------------------------------------------------------

/// Tuning for the health monitor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthConfig {
    /// Period of `health_status_check` pings while open.
    pub ping_interval: Duration,
    /// Fixed wait before each reconnect. Does not grow.
    pub reconnect_delay: Duration,
    /// Consecutive post-load failures that end the session.
    pub max_failures: u32,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            ping_interval: Duration::from_secs(30),
            reconnect_delay: Duration::from_secs(5),
            max_failures: 3,
        }
    }
}

impl HealthConfig {
    /// Ensures at least one failure is tolerated before giving up is
    /// possible, and that timers have non-zero periods.
    pub fn validated(mut self) -> Self {
        if self.max_failures == 0 {
            tracing::warn!("max_failures of 0, using 1");
            self.max_failures = 1;
        }
        if self.ping_interval.is_zero() {
            self.ping_interval = HealthConfig::default().ping_interval;
        }
        self
    }
}

// ---------------------------------------------------------------------------
// ConnectionState
// ---------------------------------------------------------------------------

/// Lifecycle of the health-check connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No token yet; nothing has been dialed.
    Idle,
    Connecting,
    Open,
    /// Waiting out the reconnect delay.
    Reconnecting,
    /// Shut down on purpose.
    Closed,
    /// Gave up after too many failures. Terminal.
    Failed,
}

impl ConnectionState {
    /// Returns `true` if moving to `target` is a legal transition.
    pub fn can_transition_to(self, target: Self) -> bool {
        use ConnectionState::*;
        matches!(
            (self, target),
            (Idle | Reconnecting | Closed, Connecting)
                | (Connecting, Open)
                | (Connecting | Open, Reconnecting)
                | (Connecting | Open, Failed)
                | (Idle | Connecting | Open | Reconnecting, Closed)
        )
    }

    /// Whether a token refresh may trigger an immediate reconnect.
    pub fn accepts_token_refresh(self) -> bool {
        matches!(self, Self::Reconnecting | Self::Closed)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Open => write!(f, "Open"),
            Self::Reconnecting => write!(f, "Reconnecting"),
            Self::Closed => write!(f, "Closed"),
            Self::Failed => write!(f, "Failed"),
        }
    }
}

/// Why the monitor gave up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionLoss {
    /// The last failure was the socket closing.
    Closed,
    /// The last failure was a socket or dial error.
    Error,
}

impl ConnectionLoss {
    /// The session-end reason reported to the host.
    pub fn reason(self) -> &'static str {
        match self {
            Self::Closed => "Connection lost",
            Self::Error => "Connection error",
        }
    }
}

// ---------------------------------------------------------------------------
// Socket driver
// ---------------------------------------------------------------------------

#[derive(Debug)]
enum SocketEventKind {
    Opened,
    Message(String),
    Closed,
    Error(String),
}

#[derive(Debug)]
struct SocketEvent {
    generation: u64,
    kind: SocketEventKind,
}

/// Dials `url` and shuttles frames until the socket ends or the monitor
/// drops `outbound`. Emits at most one terminal event (`Closed`/`Error`).
async fn drive_socket<C: Connector>(
    connector: Arc<C>,
    url: String,
    generation: u64,
    events: mpsc::UnboundedSender<SocketEvent>,
    mut outbound: mpsc::UnboundedReceiver<String>,
) {
    let emit = |kind| {
        let _ = events.send(SocketEvent { generation, kind });
    };

    let conn = match connector.connect(&url).await {
        Ok(conn) => conn,
        Err(e) => {
            emit(SocketEventKind::Error(e.to_string()));
            return;
        }
    };
    emit(SocketEventKind::Opened);

    loop {
        tokio::select! {
            frame = outbound.recv() => match frame {
                Some(text) => {
                    if let Err(e) = conn.send(&text).await {
                        emit(SocketEventKind::Error(e.to_string()));
                        return;
                    }
                }
                None => {
                    // Monitor let go of this attempt.
                    let _ = conn.close().await;
                    tracing::debug!(id = %conn.id(), "socket closed by monitor");
                    return;
                }
            },
            incoming = conn.recv() => match incoming {
                Ok(Some(text)) => emit(SocketEventKind::Message(text)),
                Ok(None) => {
                    emit(SocketEventKind::Closed);
                    return;
                }
                Err(e) => {
                    emit(SocketEventKind::Error(e.to_string()));
                    return;
                }
            },
        }
    }
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

// ---------------------------------------------------------------------------
// ConnectionMonitor
// ---------------------------------------------------------------------------

/// Owns the health-check connection for one session.
///
/// Poll [`next_loss`](Self::next_loss) from the controller's `select!`
/// loop. It handles opens, responses, pings and reconnects internally and
/// only returns when the failure limit is reached.
pub struct ConnectionMonitor<C> {
    connector: Arc<C>,
    config: HealthConfig,
    codec: JsonCodec,
    state: ConnectionState,
    url: Option<Url>,
    loaded: bool,
    failures: u32,
    attempts: u64,
    /// Bumped on every dial and on close; events from older generations
    /// are stale.
    generation: u64,
    outbound: Option<mpsc::UnboundedSender<String>>,
    events_tx: mpsc::UnboundedSender<SocketEvent>,
    events_rx: mpsc::UnboundedReceiver<SocketEvent>,
    reconnect_at: Option<Instant>,
    pings: IntervalTimer,
}

impl<C: Connector> ConnectionMonitor<C> {
    pub fn new(connector: C, config: HealthConfig) -> Self {
        let config = config.validated();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            connector: Arc::new(connector),
            pings: IntervalTimer::new(config.ping_interval),
            config,
            codec: JsonCodec,
            state: ConnectionState::Idle,
            url: None,
            loaded: false,
            failures: 0,
            attempts: 0,
            generation: 0,
            outbound: None,
            events_tx,
            events_rx,
            reconnect_at: None,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Consecutive failures counted since the last health response.
    pub fn failures(&self) -> u32 {
        self.failures
    }

    /// Number of dials made so far.
    pub fn attempts(&self) -> u64 {
        self.attempts
    }

    pub fn config(&self) -> &HealthConfig {
        &self.config
    }

    /// Starts counting failures. Before this, drops are retried but
    /// never counted.
    pub fn mark_loaded(&mut self) {
        self.loaded = true;
    }

    /// Opens the first connection. Ignored unless `Idle`.
    pub fn start(&mut self, url: Url) -> bool {
        if self.state != ConnectionState::Idle {
            tracing::debug!(state = %self.state, "monitor already started");
            return false;
        }
        self.url = Some(url);
        self.dial();
        true
    }

    /// Swaps in a URL with a fresh token and reconnects right away.
    /// Only honoured while `Reconnecting` or `Closed`.
    pub fn refresh(&mut self, url: Url) -> bool {
        if !self.state.accepts_token_refresh() {
            tracing::debug!(state = %self.state, "token refresh ignored");
            return false;
        }
        self.url = Some(url);
        self.reconnect_at = None;
        self.dial();
        true
    }

    /// Drops the socket and cancels pings and any pending reconnect.
    /// Idempotent; a `Failed` monitor stays `Failed`.
    pub fn close(&mut self) {
        self.teardown_socket();
        self.reconnect_at = None;
        self.generation += 1;
        if self.state.can_transition_to(ConnectionState::Closed) {
            self.transition(ConnectionState::Closed);
        }
    }

    /// Drives the connection until the failure limit is hit.
    ///
    /// Cancel-safe: every await point leaves the monitor consistent, so
    /// dropping this future inside `select!` loses nothing.
    pub async fn next_loss(&mut self) -> ConnectionLoss {
        loop {
            tokio::select! {
                Some(event) = self.events_rx.recv() => {
                    if let Some(loss) = self.on_socket_event(event) {
                        return loss;
                    }
                }
                () = sleep_until_opt(self.reconnect_at) => {
                    self.reconnect_at = None;
                    if self.state == ConnectionState::Reconnecting {
                        self.dial();
                    }
                }
                _ = self.pings.tick() => self.send_ping(),
            }
        }
    }

    // -- internals ----------------------------------------------------------

    fn transition(&mut self, target: ConnectionState) {
        if !self.state.can_transition_to(target) {
            tracing::warn!(from = %self.state, to = %target, "illegal connection transition");
            return;
        }
        tracing::debug!(from = %self.state, to = %target, "connection state");
        self.state = target;
    }

    fn dial(&mut self) {
        let Some(url) = self.url.clone() else {
            tracing::debug!("no socket url, not dialing");
            return;
        };
        if !self.state.can_transition_to(ConnectionState::Connecting) {
            tracing::debug!(state = %self.state, "not dialing");
            return;
        }
        self.transition(ConnectionState::Connecting);
        self.generation += 1;
        self.attempts += 1;

        let (out_tx, out_rx) = mpsc::unbounded_channel();
        self.outbound = Some(out_tx);
        tracing::debug!(attempt = self.attempts, "dialing health socket");
        tokio::spawn(drive_socket(
            Arc::clone(&self.connector),
            url.into(),
            self.generation,
            self.events_tx.clone(),
            out_rx,
        ));
    }

    fn teardown_socket(&mut self) {
        self.outbound = None;
        self.pings.stop();
    }

    fn on_socket_event(&mut self, event: SocketEvent) -> Option<ConnectionLoss> {
        if event.generation != self.generation {
            tracing::trace!(generation = event.generation, "stale socket event");
            return None;
        }
        match event.kind {
            SocketEventKind::Opened => {
                self.transition(ConnectionState::Open);
                self.pings.start();
                tracing::info!(attempt = self.attempts, "health socket open");
                None
            }
            SocketEventKind::Message(text) => {
                self.on_message(&text);
                None
            }
            SocketEventKind::Closed => {
                tracing::warn!(failures = self.failures, "health socket closed");
                self.on_failure(ConnectionLoss::Closed)
            }
            SocketEventKind::Error(reason) => {
                tracing::warn!(failures = self.failures, reason = %reason, "health socket error");
                self.on_failure(ConnectionLoss::Error)
            }
        }
    }

    fn on_message(&mut self, text: &str) {
        let envelope: Envelope = match self.codec.decode(text) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::warn!(error = %e, "undecodable socket frame ignored");
                return;
            }
        };
        match envelope.kind() {
            MessageKind::HealthStatusCheckResponse => {
                if self.loaded && self.failures > 0 {
                    tracing::debug!(failures = self.failures, "health restored");
                    self.failures = 0;
                }
            }
            other => tracing::debug!(kind = %other, "socket message ignored"),
        }
    }

    fn on_failure(&mut self, loss: ConnectionLoss) -> Option<ConnectionLoss> {
        self.teardown_socket();

        if self.loaded {
            self.failures += 1;
            if self.failures >= self.config.max_failures {
                tracing::warn!(failures = self.failures, "health check failure limit reached");
                self.transition(ConnectionState::Failed);
                return Some(loss);
            }
        }

        self.transition(ConnectionState::Reconnecting);
        self.reconnect_at = Some(Instant::now() + self.config.reconnect_delay);
        tracing::info!(
            failures = self.failures,
            delay_ms = self.config.reconnect_delay.as_millis() as u64,
            "reconnect scheduled"
        );
        None
    }

    fn send_ping(&mut self) {
        if self.state != ConnectionState::Open {
            return;
        }
        let frame = match self.codec.encode(&Envelope::health_check()) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(error = %e, "could not encode health check");
                return;
            }
        };
        if let Some(outbound) = &self.outbound {
            if outbound.send(frame).is_err() {
                tracing::debug!("socket driver gone, ping dropped");
            } else {
                tracing::trace!("health check sent");
            }
        }
    }
}
