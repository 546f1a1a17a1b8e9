//! Connection manager for the live game channel.
//!
//! The [`ConnectionManager`] owns at most one transport handle for one game
//! session. It opens the handle with bounded, timed attempts and exponential
//! backoff, delivers decoded frames to typed subscribers, and transparently
//! reconnects when an open channel drops without `disconnect()` being called.
//!
//! # Generations
//!
//! Every connect cycle is stamped with a generation number and a cancellation
//! token. Attempt results, backoff expiries and pump shutdowns all re-check the
//! generation under the state lock before touching anything; `disconnect()`
//! bumps the generation and cancels the token synchronously, so work belonging
//! to an abandoned cycle can never mutate state or reach subscribers afterwards.

use super::events::{LifecycleEvent, SubscriptionId, Subscribers};
use super::state::ConnectionState;
use crate::config::ClientConfig;
use crate::error::{ClientError, TransportError};
use crate::messaging::{DecodeError, InboundMessage, OutboundMessage};
use crate::transport::{CloseInfo, Connector, Frame, Transport, WebSocketConnector};
use crate::types::{GameAction, GameEnd, GameState, PlayerAction};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

type Outcome = Option<Result<(), ClientError>>;

/// Mutable connection bookkeeping. Only ever locked briefly, never across an await.
struct Core {
    state: ConnectionState,
    session_id: Option<String>,
    attempt_count: u32,
    generation: u64,
    cancel: CancellationToken,
    /// Queue feeding the pump task that owns the open transport
    outbound: Option<mpsc::UnboundedSender<String>>,
    /// Pump task of the current handle
    pump: Option<JoinHandle<()>>,
    /// Pump tasks that were told to close but may not have finished yet
    closing: Vec<JoinHandle<()>>,
    /// Result of the running connect cycle, shared by every caller waiting on it
    outcome: Option<watch::Receiver<Outcome>>,
}

impl Core {
    fn new() -> Self {
        Self {
            state: ConnectionState::Idle,
            session_id: None,
            attempt_count: 0,
            generation: 0,
            cancel: CancellationToken::new(),
            outbound: None,
            pump: None,
            closing: Vec::new(),
            outcome: None,
        }
    }

    /// Cancels the running cycle and resets to Idle.
    ///
    /// Returns the session that was open, if any, so the caller can report the
    /// close once the lock is released.
    fn teardown(&mut self) -> Option<String> {
        self.cancel.cancel();
        self.generation = self.generation.wrapping_add(1);
        self.outbound = None;
        self.closing.retain(|handle| !handle.is_finished());
        if let Some(pump) = self.pump.take() {
            self.closing.push(pump);
        }

        let was_open = self.state == ConnectionState::Open;
        let session = self.session_id.take();
        self.state = ConnectionState::Idle;
        self.attempt_count = 0;
        self.outcome = None;

        if was_open {
            session
        } else {
            None
        }
    }
}

struct Inner {
    config: ClientConfig,
    connector: Arc<dyn Connector>,
    subscribers: Subscribers,
    core: Mutex<Core>,
}

/// Manages one logical real-time connection to a game session.
///
/// Cloning is cheap; all clones drive the same connection.
///
/// # Example
///
/// ```rust,no_run
/// use arena_client::{ClientConfig, ConnectionManager};
///
/// # async fn example() -> Result<(), arena_client::ClientError> {
/// let manager = ConnectionManager::new(ClientConfig::from_env());
/// manager.on_game_state(|state| println!("round {}", state.round));
/// manager.connect("game-42").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ConnectionManager {
    inner: Arc<Inner>,
}

impl fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let core = self.inner.core.lock();
        f.debug_struct("ConnectionManager")
            .field("state", &core.state)
            .field("session_id", &core.session_id)
            .field("attempt_count", &core.attempt_count)
            .field("generation", &core.generation)
            .finish()
    }
}

impl ConnectionManager {
    /// Creates a manager that connects over WebSockets.
    pub fn new(config: ClientConfig) -> Self {
        Self::with_connector(config, Arc::new(WebSocketConnector))
    }

    /// Creates a manager using a custom transport connector.
    pub fn with_connector(config: ClientConfig, connector: Arc<dyn Connector>) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                connector,
                subscribers: Subscribers::default(),
                core: Mutex::new(Core::new()),
            }),
        }
    }

    /// Settings this manager was built with.
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        self.inner.core.lock().state
    }

    /// Session the manager is bound to; `None` after `disconnect()`.
    pub fn session_id(&self) -> Option<String> {
        self.inner.core.lock().session_id.clone()
    }

    /// Consecutive failed attempts in the running cycle. Zero once open.
    pub fn attempt_count(&self) -> u32 {
        self.inner.core.lock().attempt_count
    }

    /// Whether the channel is open and `send()` would be accepted.
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    /// Endpoint URL used for `session_id`.
    pub fn endpoint_url(&self, session_id: &str) -> String {
        self.inner.config.endpoint_url(session_id)
    }

    /// Connects to `session_id`, resolving once the channel is open.
    ///
    /// * Already open on the same session: returns immediately.
    /// * A cycle for the same session is in flight: waits for its outcome.
    /// * Anything else is torn down first; the previous handle is fully closed
    ///   before the first new attempt is made.
    ///
    /// The cycle runs on its own task, so dropping the returned future does not
    /// abandon it; use [`disconnect`](Self::disconnect) for that.
    pub async fn connect(&self, session_id: &str) -> Result<(), ClientError> {
        if session_id.trim().is_empty() {
            return Err(ClientError::InvalidSession);
        }

        let (outcome, replaced) = {
            let mut core = self.inner.core.lock();

            let in_flight = if core.session_id.as_deref() == Some(session_id) {
                match core.state {
                    ConnectionState::Open => {
                        debug!("Already connected to session {}, nothing to do", session_id);
                        return Ok(());
                    }
                    ConnectionState::Connecting
                    | ConnectionState::Closing
                    | ConnectionState::Reconnecting => core.outcome.clone(),
                    ConnectionState::Idle | ConnectionState::Failed => None,
                }
            } else {
                None
            };

            if let Some(outcome) = in_flight {
                debug!("Joining in-flight connect cycle for session {}", session_id);
                (outcome, None)
            } else {
                self.start_cycle(&mut core, session_id)
            }
        };

        if let Some(old_session) = replaced {
            info!("🔌 Leaving session {} for {}", old_session, session_id);
            self.inner.emit_closed_by_owner(old_session);
        }

        wait_for_outcome(outcome).await
    }

    /// Tears down whatever is running and spawns a fresh connect cycle.
    ///
    /// Returns the outcome receiver and the session that was open before, if any.
    fn start_cycle(
        &self,
        core: &mut Core,
        session_id: &str,
    ) -> (watch::Receiver<Outcome>, Option<String>) {
        let replaced = core.teardown();
        let previous = std::mem::take(&mut core.closing);

        let generation = core.generation;
        let token = CancellationToken::new();
        core.cancel = token.clone();
        core.session_id = Some(session_id.to_string());
        core.state = ConnectionState::Connecting;

        let (tx, rx) = watch::channel(None);
        core.outcome = Some(rx.clone());

        let cycle = Cycle {
            inner: self.inner.clone(),
            generation,
            token,
            session_id: session_id.to_string(),
            url: self.inner.config.endpoint_url(session_id),
            reconnecting: false,
        };
        tokio::spawn(cycle.run(previous, 0, tx));

        (rx, replaced)
    }

    /// Closes the connection and cancels every pending attempt and backoff timer.
    ///
    /// Never blocks and never fails; calling it when idle does nothing. The
    /// transport handle is closed asynchronously by its pump task, and the next
    /// `connect()` waits for that close to finish.
    pub fn disconnect(&self) {
        let closed_session = {
            let mut core = self.inner.core.lock();
            if core.session_id.is_none() && core.state == ConnectionState::Idle {
                return;
            }
            debug!(
                "Disconnecting from session {:?} (state: {})",
                core.session_id, core.state
            );
            core.teardown()
        };

        if let Some(session_id) = closed_session {
            info!("🔌 Disconnected from session {}", session_id);
            self.inner.emit_closed_by_owner(session_id);
        }
    }

    /// Disconnects and waits until every transport handle has been closed.
    pub async fn shutdown(&self) {
        self.disconnect();
        let pending = std::mem::take(&mut self.inner.core.lock().closing);
        for handle in pending {
            let _ = handle.await;
        }
    }

    /// Sends `{"type": kind, "data": payload}` over the open channel.
    ///
    /// Returns `false` without side effects unless the connection is open, and
    /// `false` if the payload cannot be serialized.
    pub fn send<T: Serialize + ?Sized>(&self, kind: &str, payload: &T) -> bool {
        let outbound = {
            let core = self.inner.core.lock();
            if core.state != ConnectionState::Open {
                warn!("Cannot send '{}' while connection is {}", kind, core.state);
                return false;
            }
            match core.outbound.clone() {
                Some(outbound) => outbound,
                None => return false,
            }
        };

        let text = match OutboundMessage::new(kind, payload).to_json() {
            Ok(text) => text,
            Err(e) => {
                error!("Failed to serialize '{}' message: {}", kind, e);
                return false;
            }
        };

        debug!("📤 Sending {} message ({} bytes)", kind, text.len());
        outbound.send(text).is_ok()
    }

    /// Sends a player action as a `game_action` message.
    pub fn send_action(&self, action: &PlayerAction) -> bool {
        self.send(crate::messaging::types::GAME_ACTION, action)
    }

    /// Handler for `game_state` snapshots.
    pub fn on_game_state<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&GameState) + Send + Sync + 'static,
    {
        self.inner.subscribers.on_game_state(handler)
    }

    /// Handler for `game_action` broadcasts.
    pub fn on_game_action<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&GameAction) + Send + Sync + 'static,
    {
        self.inner.subscribers.on_game_action(handler)
    }

    /// Handler for the `game_end` message.
    pub fn on_game_end<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&GameEnd) + Send + Sync + 'static,
    {
        self.inner.subscribers.on_game_end(handler)
    }

    /// Handler for `error` messages reported by the server.
    pub fn on_server_error<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.inner.subscribers.on_server_error(handler)
    }

    /// Handler for open/close/reconnect/failure notifications.
    pub fn on_lifecycle<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&LifecycleEvent) + Send + Sync + 'static,
    {
        self.inner.subscribers.on_lifecycle(handler)
    }

    /// Removes a handler registered with any of the `on_*` methods.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.subscribers.remove(id)
    }

    /// Number of registered handlers across every message kind.
    pub fn subscription_count(&self) -> usize {
        self.inner.subscribers.len()
    }
}

async fn wait_for_outcome(mut outcome: watch::Receiver<Outcome>) -> Result<(), ClientError> {
    let result = match outcome.wait_for(Option::is_some).await {
        Ok(result) => result.clone(),
        // The cycle task went away without reporting
        Err(_) => None,
    };
    result.unwrap_or(Err(ClientError::Cancelled))
}

impl Inner {
    fn emit_closed_by_owner(&self, session_id: String) {
        self.subscribers.emit_lifecycle(&LifecycleEvent::Closed {
            session_id,
            code: None,
            reason: None,
            expected: true,
        });
    }

    /// Applies `state` if `generation` is still current.
    fn transition(&self, generation: u64, state: ConnectionState) -> bool {
        let mut core = self.core.lock();
        if core.generation != generation {
            return false;
        }
        core.state = state;
        true
    }

    /// Moves an open channel to `Closing` after it dropped on its own.
    ///
    /// The fresh outcome is installed under the same lock, so a `connect()`
    /// arriving while the handle closes waits for the recovery rather than
    /// the cycle that opened the dropped channel. Returns `None` if stale.
    fn begin_close(&self, generation: u64) -> Option<watch::Sender<Outcome>> {
        let mut core = self.core.lock();
        if core.generation != generation {
            return None;
        }
        let (tx, rx) = watch::channel(None);
        core.state = ConnectionState::Closing;
        core.outbound = None;
        core.outcome = Some(rx);
        Some(tx)
    }

    /// Records a failed attempt. Returns false if the cycle is stale.
    fn record_failure(&self, generation: u64, failures: u32) -> bool {
        let mut core = self.core.lock();
        if core.generation != generation {
            return false;
        }
        core.attempt_count = failures;
        true
    }

    /// Settles a cycle in `Failed` and notifies lifecycle subscribers.
    fn fail(&self, generation: u64, session_id: &str, attempts: u32, reason: String) -> bool {
        {
            let mut core = self.core.lock();
            if core.generation != generation {
                return false;
            }
            core.state = ConnectionState::Failed;
            core.outbound = None;
            core.cancel.cancel();
        }

        error!("❌ Giving up on session {}: {}", session_id, reason);
        self.subscribers.emit_lifecycle(&LifecycleEvent::Failed {
            session_id: session_id.to_string(),
            attempts,
            reason,
        });
        true
    }

    /// Decodes one inbound frame and hands it to subscribers.
    fn handle_frame(&self, token: &CancellationToken, text: &str) {
        if token.is_cancelled() {
            return;
        }

        match InboundMessage::decode(text) {
            Ok(message) => {
                if let InboundMessage::Error(payload) = &message {
                    warn!("⚠️ Server reported an error: {}", payload);
                }
                let handled = self.subscribers.dispatch(&message);
                debug!("📥 {} message delivered to {} handler(s)", message.kind(), handled);
            }
            Err(DecodeError::UnknownKind(kind)) => {
                warn!("Ignoring message with unknown type '{}'", kind);
            }
            Err(e) => {
                warn!("Dropping undecodable message: {}", e);
            }
        }
    }
}

/// One connect cycle: bounded attempts with backoff, ending in Open or Failed.
struct Cycle {
    inner: Arc<Inner>,
    generation: u64,
    token: CancellationToken,
    session_id: String,
    url: String,
    /// Whether this cycle replaces a channel that was open before
    reconnecting: bool,
}

impl Cycle {
    async fn run(
        self,
        previous: Vec<JoinHandle<()>>,
        initial_failures: u32,
        outcome: watch::Sender<Outcome>,
    ) {
        // Old handles must be fully closed before a new one is opened
        for handle in previous {
            let _ = handle.await;
        }

        let result = self.establish(initial_failures).await;
        match &result {
            Ok(()) => {}
            Err(ClientError::Cancelled) => {
                debug!("Connect cycle for session {} was cancelled", self.session_id)
            }
            Err(e) => warn!("Connect cycle for session {} failed: {}", self.session_id, e),
        }
        outcome.send_replace(Some(result));
    }

    async fn establish(&self, initial_failures: u32) -> Result<(), ClientError> {
        let config = &self.inner.config;
        let max_attempts = config.max_attempts.max(1);
        let mut failures = initial_failures;
        let mut attempts = 0u32;

        loop {
            if failures > 0 {
                let delay = config.backoff.delay(failures);

                if self.reconnecting {
                    if !self.inner.transition(self.generation, ConnectionState::Reconnecting) {
                        return Err(ClientError::Cancelled);
                    }
                    self.inner.subscribers.emit_lifecycle(&LifecycleEvent::Reconnecting {
                        session_id: self.session_id.clone(),
                        attempt: failures,
                        delay,
                    });
                }

                info!(
                    "⏳ Retrying session {} in {:?} (failure {} of at most {})",
                    self.session_id, delay, failures, max_attempts
                );
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = self.token.cancelled() => return Err(ClientError::Cancelled),
                }
            }

            if !self.inner.transition(self.generation, ConnectionState::Connecting) {
                return Err(ClientError::Cancelled);
            }

            attempts += 1;
            info!(
                "🔗 Connecting to {} (attempt {}/{})",
                self.url, attempts, max_attempts
            );

            let opened = tokio::select! {
                result = tokio::time::timeout(config.attempt_timeout, self.inner.connector.open(&self.url)) => result,
                _ = self.token.cancelled() => return Err(ClientError::Cancelled),
            };

            match opened {
                Ok(Ok(transport)) => return self.install(transport).await,
                Ok(Err(TransportError::Unsupported(reason))) => {
                    self.inner
                        .fail(self.generation, &self.session_id, attempts, reason.clone());
                    return Err(ClientError::TransportUnavailable(reason));
                }
                Ok(Err(e)) => warn!("Attempt {} for session {} failed: {}", attempts, self.session_id, e),
                Err(_) => warn!(
                    "Attempt {} for session {} timed out after {:?}",
                    attempts, self.session_id, config.attempt_timeout
                ),
            }

            failures += 1;
            if !self.inner.record_failure(self.generation, failures) {
                return Err(ClientError::Cancelled);
            }

            if attempts >= max_attempts {
                let reason = format!("no successful open after {attempts} attempts");
                return if self.inner.fail(self.generation, &self.session_id, attempts, reason) {
                    Err(ClientError::AttemptsExhausted { attempts })
                } else {
                    Err(ClientError::Cancelled)
                };
            }
        }
    }

    /// Makes a freshly opened transport the live handle, unless the cycle went stale.
    async fn install(&self, transport: Box<dyn Transport>) -> Result<(), ClientError> {
        let stale = {
            let mut core = self.inner.core.lock();
            if core.generation != self.generation || self.token.is_cancelled() {
                Some(transport)
            } else {
                let (tx, rx) = mpsc::unbounded_channel();
                core.state = ConnectionState::Open;
                core.attempt_count = 0;
                core.outbound = Some(tx);

                let pump = Pump {
                    inner: self.inner.clone(),
                    generation: self.generation,
                    token: self.token.clone(),
                    session_id: self.session_id.clone(),
                    url: self.url.clone(),
                };
                core.pump = Some(tokio::spawn(pump.run(transport, rx)));
                None
            }
        };

        if let Some(mut transport) = stale {
            debug!("Discarding handle opened for an abandoned cycle");
            let _ = transport.close().await;
            return Err(ClientError::Cancelled);
        }

        info!("✅ Connected to session {}", self.session_id);
        self.inner.subscribers.emit_lifecycle(&LifecycleEvent::Opened {
            session_id: self.session_id.clone(),
        });
        Ok(())
    }
}

/// Task that exclusively owns an open transport.
struct Pump {
    inner: Arc<Inner>,
    generation: u64,
    token: CancellationToken,
    session_id: String,
    url: String,
}

impl Pump {
    async fn run(self, mut transport: Box<dyn Transport>, mut outbound: mpsc::UnboundedReceiver<String>) {
        let close = loop {
            tokio::select! {
                biased;

                _ = self.token.cancelled() => {
                    if let Err(e) = transport.close().await {
                        debug!("Error while closing handle for session {}: {}", self.session_id, e);
                    }
                    debug!("Handle for session {} closed by owner", self.session_id);
                    return;
                }

                Some(text) = outbound.recv() => {
                    if let Err(e) = transport.send(text).await {
                        warn!("Send on session {} failed: {}", self.session_id, e);
                        break None;
                    }
                }

                frame = transport.recv() => match frame {
                    Ok(Frame::Text(text)) => self.inner.handle_frame(&self.token, &text),
                    Ok(Frame::Closed(info)) => break info,
                    Err(e) => {
                        warn!("Transport error on session {}: {}", self.session_id, e);
                        break None;
                    }
                },
            }
        };

        let Some(outcome) = self.inner.begin_close(self.generation) else {
            let _ = transport.close().await;
            return;
        };
        let _ = transport.close().await;
        drop(outbound);

        self.after_unexpected_close(close, outcome);
    }

    /// Routes an unexpected close either into a reconnect cycle or to `Failed`.
    ///
    /// `outcome` was installed by [`Inner::begin_close`]; it is resolved by the
    /// reconnect cycle, or here once a terminal close has settled in `Failed`.
    fn after_unexpected_close(self, close: Option<CloseInfo>, outcome: watch::Sender<Outcome>) {
        let code = close.as_ref().map(|info| info.code);
        let reason = close.map(|info| info.reason);
        let terminal = code.filter(|code| self.inner.config.terminal_close_codes.contains(code));

        let terminal_outcome = {
            let mut core = self.inner.core.lock();
            if core.generation != self.generation || core.session_id.is_none() {
                return;
            }
            // This task is the pump; nothing left to join
            core.pump = None;

            if terminal.is_none() {
                core.attempt_count = 1;
                core.state = ConnectionState::Reconnecting;

                let cycle = Cycle {
                    inner: self.inner.clone(),
                    generation: self.generation,
                    token: self.token.clone(),
                    session_id: self.session_id.clone(),
                    url: self.url.clone(),
                    reconnecting: true,
                };
                tokio::spawn(cycle.run(Vec::new(), 1, outcome));
                None
            } else {
                Some(outcome)
            }
        };

        warn!(
            "📴 Session {} closed unexpectedly (code: {:?}, reason: {:?})",
            self.session_id, code, reason
        );
        self.inner.subscribers.emit_lifecycle(&LifecycleEvent::Closed {
            session_id: self.session_id.clone(),
            code,
            reason,
            expected: false,
        });

        if let (Some(code), Some(outcome)) = (terminal, terminal_outcome) {
            let error = ClientError::TerminalClose { code };
            if self.inner.fail(self.generation, &self.session_id, 0, error.to_string()) {
                outcome.send_replace(Some(Err(error)));
            }
        }
    }
}
