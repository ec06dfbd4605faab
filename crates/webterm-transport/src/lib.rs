//! # webterm-transport
//!
//! Terminal transport layer for the webterm client.
//!
//! This crate provides:
//! - Connection lifecycle with exponential-backoff reconnection
//! - Debounced resize synchronisation and the post-connect redraw-kick
//! - Routing of PTY output to the surface and download directives to a sink
//! - A tokio runtime driver with a tokio-tungstenite connector
//!
//! ## Architecture
//!
//! This is Layer 1 in the architecture - it depends on webterm-core. The
//! state machines are synchronous and driven by [`TransportEvent`]s, so they
//! can be tested without a network; [`runtime`] wires them to tokio.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod connection;
pub mod download;
pub mod resize;
pub mod runtime;
pub mod socket;
pub mod surface;
pub mod testing;
pub mod timer;
pub mod transport;
pub mod ws;

// Re-export commonly used types
pub use connection::{CloseReason, ConnectionManager, ConnectionState, Notice};
pub use download::HttpDownloader;
pub use resize::ResizeCoordinator;
pub use runtime::{TokioScheduler, TransportHandle, TransportRuntime};
pub use socket::{ConnectionId, Connector, Socket, SocketEvent};
pub use surface::RenderSurface;
pub use timer::{Scheduler, TimerKind, TimerSlots, TimerToken};
pub use transport::{
    DownloadSink, LogDownloads, LogNotices, NoticeSink, TerminalTransport, TransportEvent,
    TransportOptions,
};
pub use ws::WsConnector;
