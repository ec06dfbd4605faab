//! Tokio event loop driving a [`TerminalTransport`].
//!
//! One task owns the transport and handles one event at a time, whether it
//! comes from a socket task, a timer or the public handle.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use url::Url;

use webterm_core::Endpoint;

use crate::download::HttpDownloader;
use crate::surface::RenderSurface;
use crate::timer::{Scheduler, TimerKind, TimerSlots, TimerToken};
use crate::transport::{NoticeSink, TerminalTransport, TransportEvent, TransportOptions};
use crate::ws::WsConnector;

/// Scheduler backed by `tokio::time::sleep` tasks.
#[derive(Debug)]
pub struct TokioScheduler {
    slots: TimerSlots,
    tasks: HashMap<TimerKind, JoinHandle<()>>,
    events: mpsc::UnboundedSender<TransportEvent>,
}

impl TokioScheduler {
    /// Create a scheduler delivering fires to `events`.
    pub fn new(events: mpsc::UnboundedSender<TransportEvent>) -> Self {
        Self {
            slots: TimerSlots::new(),
            tasks: HashMap::new(),
            events,
        }
    }
}

impl Scheduler for TokioScheduler {
    fn arm(&mut self, kind: TimerKind, delay: Duration) -> TimerToken {
        if let Some(previous) = self.tasks.remove(&kind) {
            previous.abort();
        }
        let token = self.slots.arm(kind);
        let events = self.events.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = events.send(TransportEvent::Timer { kind, token });
        });
        self.tasks.insert(kind, task);
        debug!("Armed {:?} timer for {}ms", kind, delay.as_millis());
        token
    }

    fn cancel(&mut self, kind: TimerKind) {
        if let Some(task) = self.tasks.remove(&kind) {
            task.abort();
        }
        if self.slots.cancel(kind).is_some() {
            debug!("Cancelled {:?} timer", kind);
        }
    }

    fn claim(&mut self, kind: TimerKind, token: TimerToken) -> bool {
        let claimed = self.slots.claim(kind, token);
        if claimed {
            self.tasks.remove(&kind);
        }
        claimed
    }

    fn is_armed(&self, kind: TimerKind) -> bool {
        self.slots.is_armed(kind)
    }
}

impl Drop for TokioScheduler {
    fn drop(&mut self) {
        for (_, task) in self.tasks.drain() {
            task.abort();
        }
    }
}

#[derive(Debug)]
enum Command {
    Input(String),
    Focus,
    SurfaceChanged,
    Shutdown,
}

/// Handle to a running transport.
///
/// Cheap to clone. Commands sent after the transport stopped are ignored.
#[derive(Debug, Clone)]
pub struct TransportHandle {
    commands: mpsc::UnboundedSender<Command>,
}

impl TransportHandle {
    /// Focus the render surface.
    pub fn focus(&self) {
        self.send(Command::Focus);
    }

    /// Send keystrokes; dropped while the connection is down.
    pub fn send_input(&self, text: impl Into<String>) {
        self.send(Command::Input(text.into()));
    }

    /// Report that the render surface changed size.
    pub fn surface_changed(&self) {
        self.send(Command::SurfaceChanged);
    }

    /// Tear the transport down and stop its task.
    pub fn shutdown(&self) {
        self.send(Command::Shutdown);
    }

    /// Whether the transport task is still accepting commands.
    pub fn is_running(&self) -> bool {
        !self.commands.is_closed()
    }

    fn send(&self, command: Command) {
        if self.commands.send(command).is_err() {
            debug!("Transport task has stopped; command dropped");
        }
    }
}

/// Everything needed to run a transport on tokio.
pub struct TransportRuntime {
    endpoint: Endpoint,
    options: TransportOptions,
    download_origin: Option<Url>,
    download_directory: PathBuf,
}

impl TransportRuntime {
    /// Create a runtime for `endpoint`.
    pub fn new(endpoint: Endpoint, options: TransportOptions) -> Self {
        Self {
            endpoint,
            options,
            download_origin: None,
            download_directory: PathBuf::from("."),
        }
    }

    /// Fetch downloads from `origin` instead of the socket's HTTP origin.
    pub fn with_download_origin(mut self, origin: Url) -> Self {
        self.download_origin = Some(origin);
        self
    }

    /// Save downloads into `directory`.
    pub fn with_download_directory(mut self, directory: PathBuf) -> Self {
        self.download_directory = directory;
        self
    }

    /// Start the transport on the current tokio runtime.
    pub fn spawn(
        self,
        surface: Box<dyn RenderSurface>,
        notices: Box<dyn NoticeSink>,
    ) -> (TransportHandle, JoinHandle<()>) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (command_tx, command_rx) = mpsc::unbounded_channel();

        let origin = self
            .download_origin
            .unwrap_or_else(|| self.endpoint.http_origin());
        let downloads = HttpDownloader::new(origin, self.download_directory, event_tx.clone());

        let transport = TerminalTransport::new(
            self.endpoint,
            self.options,
            surface,
            Box::new(WsConnector::new(event_tx.clone())),
            Box::new(TokioScheduler::new(event_tx)),
        )
        .with_notices(notices)
        .with_downloads(Box::new(downloads));

        let task = tokio::spawn(run(transport, event_rx, command_rx));
        (
            TransportHandle {
                commands: command_tx,
            },
            task,
        )
    }
}

async fn run(
    mut transport: TerminalTransport,
    mut events: mpsc::UnboundedReceiver<TransportEvent>,
    mut commands: mpsc::UnboundedReceiver<Command>,
) {
    transport.start();

    loop {
        tokio::select! {
            Some(event) = events.recv() => transport.handle_event(event),
            command = commands.recv() => match command {
                Some(Command::Input(text)) => {
                    transport.send_input(&text);
                }
                Some(Command::Focus) => transport.focus(),
                Some(Command::SurfaceChanged) => transport.surface_changed(),
                Some(Command::Shutdown) | None => break,
            },
        }
    }

    transport.teardown();
    info!("Transport stopped");
}
