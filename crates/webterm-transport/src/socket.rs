//! Socket seam between the connection state machine and the network.

use webterm_core::{Endpoint, InboundFrame, Result};

/// Identifies one socket opened by the connection manager.
///
/// Events tagged with an id other than the current one belong to a socket
/// that has already been replaced or closed and are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Id of the first socket.
    pub fn first() -> Self {
        Self(1)
    }

    /// The id following this one.
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// Numeric value.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Something that happened on a socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketEvent {
    /// Handshake completed
    Opened,
    /// Frame received from the server
    Frame(InboundFrame),
    /// Socket reported an error; a `Closed` event follows
    Error(String),
    /// Socket is closed, cleanly or not
    Closed,
}

/// An open or opening socket.
pub trait Socket: Send {
    /// Queue a text frame.
    fn send_text(&mut self, text: String) -> Result<()>;

    /// Start closing the socket.
    fn close(&mut self);
}

/// Opens sockets.
///
/// `connect` returns immediately; the outcome is reported later through
/// [`SocketEvent`]s tagged with `id`.
pub trait Connector: Send {
    /// Begin opening a socket to `endpoint`.
    fn connect(&mut self, endpoint: &Endpoint, id: ConnectionId) -> Result<Box<dyn Socket>>;
}
