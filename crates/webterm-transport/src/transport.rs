//! Terminal transport: the composition root.

use tracing::{debug, info, warn};

use webterm_core::{
    ClientConfig, Endpoint, FrameCodec, OobDirective, OobExtractor, ReconnectPolicy,
    ResizeSettings,
};

use crate::connection::{ConnectionManager, ConnectionState, Notice};
use crate::resize::ResizeCoordinator;
use crate::socket::{ConnectionId, Connector, SocketEvent};
use crate::surface::RenderSurface;
use crate::timer::{Scheduler, TimerKind, TimerToken};

/// Everything the transport reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Event from socket `id`
    Socket {
        /// Socket the event belongs to
        id: ConnectionId,
        /// What happened
        event: SocketEvent,
    },
    /// A timer fired
    Timer {
        /// Which timer
        kind: TimerKind,
        /// Which arming of it
        token: TimerToken,
    },
    /// The render surface changed size
    SurfaceChanged,
    /// A download requested by the remote side failed
    DownloadFailed {
        /// Name the file would have been saved under
        filename: String,
        /// Error text, shown inline
        message: String,
    },
}

impl TransportEvent {
    /// Shorthand for a socket event.
    pub fn socket(id: ConnectionId, event: SocketEvent) -> Self {
        Self::Socket { id, event }
    }
}

/// Receives connection notices.
pub trait NoticeSink: Send {
    /// Show or record `notice`.
    fn notify(&mut self, notice: Notice);
}

impl NoticeSink for tokio::sync::mpsc::UnboundedSender<Notice> {
    fn notify(&mut self, notice: Notice) {
        if self.send(notice).is_err() {
            debug!("Notice receiver dropped");
        }
    }
}

/// Notice sink that only logs.
#[derive(Debug, Default)]
pub struct LogNotices;

impl NoticeSink for LogNotices {
    fn notify(&mut self, notice: Notice) {
        info!("{}", notice);
    }
}

/// Receives download directives found in the output stream.
pub trait DownloadSink: Send {
    /// Start fetching the file named by `directive`.
    fn request(&mut self, directive: OobDirective);
}

/// Download sink that only logs.
#[derive(Debug, Default)]
pub struct LogDownloads;

impl DownloadSink for LogDownloads {
    fn request(&mut self, directive: OobDirective) {
        warn!(
            "No download handler; ignoring download of '{}' ({})",
            directive.filename, directive.path
        );
    }
}

/// Tunables of a transport.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransportOptions {
    /// Reconnect backoff
    pub policy: ReconnectPolicy,
    /// Resize debounce and redraw-kick timing
    pub resize: ResizeSettings,
}

impl From<&ClientConfig> for TransportOptions {
    fn from(config: &ClientConfig) -> Self {
        Self {
            policy: config.reconnect,
            resize: config.resize,
        }
    }
}

/// A terminal session's connection to its remote PTY.
///
/// Owns the connection manager, the resize coordinator, the render surface
/// and the timers, and routes every [`TransportEvent`] to them. Dropping the
/// transport tears it down.
pub struct TerminalTransport {
    connection: ConnectionManager,
    resize: ResizeCoordinator,
    extractor: OobExtractor,
    surface: Box<dyn RenderSurface>,
    scheduler: Box<dyn Scheduler>,
    downloads: Box<dyn DownloadSink>,
    notices: Box<dyn NoticeSink>,
}

impl TerminalTransport {
    /// Create a transport; nothing is opened until [`start`](Self::start).
    pub fn new(
        endpoint: Endpoint,
        options: TransportOptions,
        surface: Box<dyn RenderSurface>,
        connector: Box<dyn Connector>,
        scheduler: Box<dyn Scheduler>,
    ) -> Self {
        Self {
            connection: ConnectionManager::new(endpoint, options.policy, connector),
            resize: ResizeCoordinator::new(options.resize),
            extractor: OobExtractor::new(),
            surface,
            scheduler,
            downloads: Box::new(LogDownloads),
            notices: Box::new(LogNotices),
        }
    }

    /// Route connection notices to `notices`.
    pub fn with_notices(mut self, notices: Box<dyn NoticeSink>) -> Self {
        self.notices = notices;
        self
    }

    /// Route download directives to `downloads`.
    pub fn with_downloads(mut self, downloads: Box<dyn DownloadSink>) -> Self {
        self.downloads = downloads;
        self
    }

    /// Open the connection.
    pub fn start(&mut self) {
        info!("Starting transport: endpoint={}", self.connection.endpoint());
        self.connection.connect(self.scheduler.as_mut());
        self.flush_notices();
    }

    /// Connection state.
    pub fn state(&self) -> ConnectionState {
        self.connection.state()
    }

    /// Reconnect attempts since the last successful open.
    pub fn attempts(&self) -> u32 {
        self.connection.attempts()
    }

    /// Focus the render surface.
    pub fn focus(&mut self) {
        self.surface.focus();
    }

    /// Send keystrokes to the remote shell.
    ///
    /// Input is dropped, not queued, while the connection is not open.
    /// Returns whether it was sent.
    pub fn send_input(&mut self, text: &str) -> bool {
        match self.connection.send_input(text) {
            Ok(sent) => sent,
            Err(e) => {
                warn!("Failed to send input: {}", e);
                false
            }
        }
    }

    /// The surface changed size.
    pub fn surface_changed(&mut self) {
        self.resize.surface_changed(self.scheduler.as_mut());
    }

    /// Process one event.
    pub fn handle_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Socket { id, event } => self.handle_socket(id, event),
            TransportEvent::Timer { kind, token } => self.handle_timer(kind, token),
            TransportEvent::SurfaceChanged => self.surface_changed(),
            TransportEvent::DownloadFailed { filename, message } => {
                warn!("Download of '{}' failed: {}", filename, message);
                let line = format!("\r\n\x1b[31m{message}\x1b[0m\r\n");
                self.surface.write(line.as_bytes());
            }
        }
        self.flush_notices();
    }

    /// Close the connection and cancel every timer. Safe to call repeatedly.
    pub fn teardown(&mut self) {
        self.resize.teardown(self.scheduler.as_mut());
        self.connection.teardown(self.scheduler.as_mut());
        self.flush_notices();
    }

    fn handle_socket(&mut self, id: ConnectionId, event: SocketEvent) {
        match event {
            SocketEvent::Opened => {
                if self.connection.handle_open(id) {
                    self.resize.handle_open(
                        self.surface.as_mut(),
                        &mut self.connection,
                        self.scheduler.as_mut(),
                    );
                }
            }
            SocketEvent::Frame(frame) => {
                if !self.connection.is_current(id) {
                    debug!("Dropping frame from stale socket {}", id);
                    return;
                }
                self.render(&FrameCodec::decode_inbound(frame));
            }
            SocketEvent::Error(message) => self.connection.handle_error(id, &message),
            SocketEvent::Closed => self
                .connection
                .handle_close(id, self.scheduler.as_mut()),
        }
    }

    fn handle_timer(&mut self, kind: TimerKind, token: TimerToken) {
        if !self.scheduler.claim(kind, token) {
            debug!("Ignoring stale {:?} timer", kind);
            return;
        }
        match kind {
            TimerKind::Reconnect => self
                .connection
                .handle_reconnect_timer(self.scheduler.as_mut()),
            TimerKind::ResizeDebounce => {
                self.resize
                    .handle_debounce(self.surface.as_mut(), &mut self.connection);
            }
            TimerKind::RedrawRestore => self
                .resize
                .handle_restore(self.surface.as_mut(), &mut self.connection),
        }
    }

    fn render(&mut self, bytes: &[u8]) {
        let extraction = self.extractor.extract(bytes);
        if let Some(directive) = extraction.directive {
            info!(
                "Download requested: path='{}', filename='{}'",
                directive.path, directive.filename
            );
            self.downloads.request(directive);
        }
        if !extraction.stripped.is_empty() {
            self.surface.write(&extraction.stripped);
        }
    }

    fn flush_notices(&mut self) {
        for notice in self.connection.drain_notices() {
            self.notices.notify(notice);
        }
    }
}

impl std::fmt::Debug for TerminalTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TerminalTransport")
            .field("connection", &self.connection)
            .field("resize", &self.resize)
            .finish_non_exhaustive()
    }
}

impl Drop for TerminalTransport {
    fn drop(&mut self) {
        self.teardown();
    }
}
