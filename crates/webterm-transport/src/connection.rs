//! Connection lifecycle and reconnection state machine.

use tracing::{debug, error, info, warn};

use webterm_core::{Endpoint, Error, FrameCodec, Geometry, ReconnectPolicy, Result};

use crate::socket::{ConnectionId, Connector, Socket};
use crate::timer::{Scheduler, TimerKind};

/// Why the connection is closed for good.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// Torn down by the owner
    Manual,
    /// Reconnect attempts exhausted
    Exhausted,
}

/// State of the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Not started
    Idle,
    /// Socket opening
    Connecting,
    /// Socket open; input and resize frames flow
    Open,
    /// Waiting for the backoff timer before the next attempt
    Reconnecting,
    /// No further connection will be made
    Closed(CloseReason),
}

/// User-visible connection notices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// An established connection dropped; recovery starts
    ConnectionLost,
    /// A reconnect attempt is starting
    Reconnecting {
        /// 1-based attempt number
        attempt: u32,
        /// Attempts allowed by the policy
        max_attempts: u32,
    },
    /// Connection re-established after a loss
    Reconnected,
    /// Recovery gave up
    Failed {
        /// Attempts made
        attempts: u32,
    },
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Notice::ConnectionLost => write!(f, "Connection lost, reconnecting..."),
            Notice::Reconnecting {
                attempt,
                max_attempts,
            } => write!(f, "Reconnecting (attempt {attempt}/{max_attempts})..."),
            Notice::Reconnected => write!(f, "Reconnected"),
            Notice::Failed { attempts } => write!(
                f,
                "Connection failed after {attempts} attempts. Reload the session to continue."
            ),
        }
    }
}

/// Owns the socket and drives the reconnection state machine.
pub struct ConnectionManager {
    endpoint: Endpoint,
    policy: ReconnectPolicy,
    connector: Box<dyn Connector>,
    state: ConnectionState,
    socket: Option<Box<dyn Socket>>,
    current: Option<ConnectionId>,
    next_id: ConnectionId,
    attempts: u32,
    /// Set from the first loss until the next successful open
    recovering: bool,
    manual_close: bool,
    notices: Vec<Notice>,
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("endpoint", &self.endpoint)
            .field("state", &self.state)
            .field("current", &self.current)
            .field("attempts", &self.attempts)
            .field("recovering", &self.recovering)
            .finish_non_exhaustive()
    }
}

impl ConnectionManager {
    /// Create a manager in the `Idle` state.
    pub fn new(endpoint: Endpoint, policy: ReconnectPolicy, connector: Box<dyn Connector>) -> Self {
        Self {
            endpoint,
            policy,
            connector,
            state: ConnectionState::Idle,
            socket: None,
            current: None,
            next_id: ConnectionId::first(),
            attempts: 0,
            recovering: false,
            manual_close: false,
            notices: Vec::new(),
        }
    }

    /// Current state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Whether frames can be sent.
    pub fn is_open(&self) -> bool {
        self.state == ConnectionState::Open
    }

    /// Reconnect attempts made since the last successful open.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Id of the live socket, if any.
    pub fn current_id(&self) -> Option<ConnectionId> {
        self.current
    }

    /// Whether `id` is the live socket.
    pub fn is_current(&self, id: ConnectionId) -> bool {
        self.current == Some(id)
    }

    /// The endpoint sockets are opened against.
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Take the notices emitted since the last call.
    pub fn drain_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// `Idle -> Connecting`.
    pub fn connect(&mut self, scheduler: &mut dyn Scheduler) {
        if self.state != ConnectionState::Idle {
            warn!(
                "connect() ignored: endpoint={}, state={:?}",
                self.endpoint, self.state
            );
            return;
        }
        self.open_socket(scheduler);
    }

    /// Handle the open event of socket `id`.
    ///
    /// Returns true if this moved the connection to `Open`.
    pub fn handle_open(&mut self, id: ConnectionId) -> bool {
        if !self.is_current(id) || self.state != ConnectionState::Connecting {
            debug!("Ignoring open of stale socket {}", id);
            return false;
        }

        self.state = ConnectionState::Open;
        self.attempts = 0;
        if self.recovering {
            self.recovering = false;
            info!("Reconnected: endpoint={}, socket={}", self.endpoint, id);
            self.notices.push(Notice::Reconnected);
        } else {
            info!("Connected: endpoint={}, socket={}", self.endpoint, id);
        }
        true
    }

    /// Handle an error reported by socket `id`.
    ///
    /// Errors are always followed by a close event, which drives recovery.
    pub fn handle_error(&mut self, id: ConnectionId, message: &str) {
        if self.is_current(id) {
            warn!("Socket error: socket={}, {}", id, message);
        } else {
            debug!("Error from stale socket {}: {}", id, message);
        }
    }

    /// Handle the close event of socket `id`.
    pub fn handle_close(&mut self, id: ConnectionId, scheduler: &mut dyn Scheduler) {
        if self.manual_close {
            debug!("Socket {} closed after teardown", id);
            return;
        }
        if !self.is_current(id) {
            debug!("Ignoring close of stale socket {}", id);
            return;
        }

        match self.state {
            ConnectionState::Open | ConnectionState::Connecting => {
                info!(
                    "Socket closed: socket={}, state={:?}, attempts={}",
                    id, self.state, self.attempts
                );
                self.socket = None;
                self.current = None;
                self.schedule_retry(scheduler);
            }
            state => debug!("Close of socket {} ignored in state {:?}", id, state),
        }
    }

    /// Handle the reconnect timer: `Reconnecting -> Connecting`.
    pub fn handle_reconnect_timer(&mut self, scheduler: &mut dyn Scheduler) {
        if self.state != ConnectionState::Reconnecting {
            debug!("Reconnect timer ignored in state {:?}", self.state);
            return;
        }

        self.attempts += 1;
        info!(
            "Reconnect attempt {}/{}: endpoint={}",
            self.attempts, self.policy.max_attempts, self.endpoint
        );
        self.notices.push(Notice::Reconnecting {
            attempt: self.attempts,
            max_attempts: self.policy.max_attempts,
        });
        self.open_socket(scheduler);
    }

    /// Send terminal input. Dropped unless `Open`.
    ///
    /// Returns whether a frame was sent.
    pub fn send_input(&mut self, data: &str) -> Result<bool> {
        if !self.is_open() {
            debug!(
                "Dropping {} bytes of input in state {:?}",
                data.len(),
                self.state
            );
            return Ok(false);
        }
        let frame = FrameCodec::encode_input(data)?;
        self.send(frame)
    }

    /// Send a resize frame. Dropped unless `Open`.
    ///
    /// Returns whether a frame was sent.
    pub fn send_resize(&mut self, geometry: Geometry) -> Result<bool> {
        if !self.is_open() {
            debug!("Dropping resize to {} in state {:?}", geometry, self.state);
            return Ok(false);
        }
        debug!("Sending resize: {}", geometry);
        let frame = FrameCodec::encode_resize(geometry)?;
        self.send(frame)
    }

    /// Close for good. Safe to call more than once.
    pub fn teardown(&mut self, scheduler: &mut dyn Scheduler) {
        scheduler.cancel(TimerKind::Reconnect);
        // Must be set before closing so the resulting close event is not
        // taken for a drop.
        self.manual_close = true;
        if let Some(mut socket) = self.socket.take() {
            socket.close();
        }
        self.current = None;

        if self.state != ConnectionState::Closed(CloseReason::Manual) {
            info!(
                "Connection torn down: endpoint={}, state={:?}",
                self.endpoint, self.state
            );
            self.state = ConnectionState::Closed(CloseReason::Manual);
        }
    }

    fn send(&mut self, frame: String) -> Result<bool> {
        let socket = self.socket.as_mut().ok_or(Error::NotConnected)?;
        socket.send_text(frame)?;
        Ok(true)
    }

    fn open_socket(&mut self, scheduler: &mut dyn Scheduler) {
        let id = self.next_id;
        self.next_id = id.next();
        self.state = ConnectionState::Connecting;
        self.current = Some(id);

        debug!("Opening socket {}: endpoint={}", id, self.endpoint);
        match self.connector.connect(&self.endpoint, id) {
            Ok(socket) => self.socket = Some(socket),
            Err(e) => {
                warn!("Failed to open socket {}: {}", id, e);
                self.current = None;
                self.schedule_retry(scheduler);
            }
        }
    }

    fn schedule_retry(&mut self, scheduler: &mut dyn Scheduler) {
        if !self.recovering {
            self.recovering = true;
            self.notices.push(Notice::ConnectionLost);
        }

        if !self.policy.allows(self.attempts) {
            error!(
                "Giving up after {} reconnect attempts: endpoint={}",
                self.attempts, self.endpoint
            );
            scheduler.cancel(TimerKind::Reconnect);
            self.state = ConnectionState::Closed(CloseReason::Exhausted);
            self.notices.push(Notice::Failed {
                attempts: self.attempts,
            });
            return;
        }

        let delay = self.policy.delay_for(self.attempts);
        info!(
            "Scheduling reconnect in {}ms (attempt {}/{})",
            delay.as_millis(),
            self.attempts + 1,
            self.policy.max_attempts
        );
        self.state = ConnectionState::Reconnecting;
        scheduler.arm(TimerKind::Reconnect, delay);
    }
}
