//! Shared-state test doubles.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use webterm_core::{Endpoint, Error, Geometry, OobDirective, ProposedDimensions, Result};

use crate::connection::Notice;
use crate::socket::{ConnectionId, Connector, Socket};
use crate::surface::RenderSurface;
use crate::timer::{Scheduler, TimerKind, TimerSlots, TimerToken};
use crate::transport::{DownloadSink, NoticeSink, TransportEvent};

#[derive(Debug, Default)]
struct Timers {
    slots: TimerSlots,
    delays: HashMap<TimerKind, Duration>,
    history: Vec<(TimerKind, Duration)>,
}

/// Scheduler whose timers only fire when the test says so.
#[derive(Debug, Clone, Default)]
pub struct ManualScheduler {
    inner: Arc<Mutex<Timers>>,
}

impl ManualScheduler {
    /// Create a scheduler with nothing armed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay of the pending timer of `kind`.
    pub fn pending_delay(&self, kind: TimerKind) -> Option<Duration> {
        let timers = self.inner.lock().unwrap();
        timers
            .slots
            .pending(kind)
            .and_then(|_| timers.delays.get(&kind).copied())
    }

    /// Every delay `kind` has been armed with, oldest first.
    pub fn armed_delays(&self, kind: TimerKind) -> Vec<Duration> {
        let timers = self.inner.lock().unwrap();
        timers
            .history
            .iter()
            .filter(|(armed, _)| *armed == kind)
            .map(|(_, delay)| *delay)
            .collect()
    }

    /// Number of pending timers across all kinds.
    pub fn armed_count(&self) -> usize {
        self.inner.lock().unwrap().slots.armed_count()
    }

    /// The event the pending timer of `kind` would deliver when it fires.
    pub fn fire(&self, kind: TimerKind) -> Option<TransportEvent> {
        let timers = self.inner.lock().unwrap();
        timers
            .slots
            .pending(kind)
            .map(|token| TransportEvent::Timer { kind, token })
    }
}

impl Scheduler for ManualScheduler {
    fn arm(&mut self, kind: TimerKind, delay: Duration) -> TimerToken {
        let mut timers = self.inner.lock().unwrap();
        timers.delays.insert(kind, delay);
        timers.history.push((kind, delay));
        timers.slots.arm(kind)
    }

    fn cancel(&mut self, kind: TimerKind) {
        let mut timers = self.inner.lock().unwrap();
        timers.slots.cancel(kind);
        timers.delays.remove(&kind);
    }

    fn claim(&mut self, kind: TimerKind, token: TimerToken) -> bool {
        self.inner.lock().unwrap().slots.claim(kind, token)
    }

    fn is_armed(&self, kind: TimerKind) -> bool {
        self.inner.lock().unwrap().slots.is_armed(kind)
    }
}

#[derive(Debug, Default)]
struct Network {
    connects: Vec<ConnectionId>,
    sent: Vec<(ConnectionId, String)>,
    closed: Vec<ConnectionId>,
    fail_connects: bool,
}

/// Connector that records sockets instead of opening them.
///
/// Open, frame and close events are injected by the test as
/// [`TransportEvent`]s using [`MockConnector::last_id`].
#[derive(Debug, Clone, Default)]
pub struct MockConnector {
    inner: Arc<Mutex<Network>>,
}

impl MockConnector {
    /// Create a connector with no sockets.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent `connect` calls fail synchronously.
    pub fn fail_connects(&self, fail: bool) {
        self.inner.lock().unwrap().fail_connects = fail;
    }

    /// Number of `connect` calls, failed ones included.
    pub fn connect_count(&self) -> usize {
        self.inner.lock().unwrap().connects.len()
    }

    /// Id passed to the latest `connect` call.
    pub fn last_id(&self) -> Option<ConnectionId> {
        self.inner.lock().unwrap().connects.last().copied()
    }

    /// Text frames sent on any socket, oldest first.
    pub fn sent_frames(&self) -> Vec<String> {
        self.inner
            .lock()
            .unwrap()
            .sent
            .iter()
            .map(|(_, frame)| frame.clone())
            .collect()
    }

    /// Text frames sent on socket `id`.
    pub fn sent_on(&self, id: ConnectionId) -> Vec<String> {
        self.inner
            .lock()
            .unwrap()
            .sent
            .iter()
            .filter(|(sent_id, _)| *sent_id == id)
            .map(|(_, frame)| frame.clone())
            .collect()
    }

    /// Forget recorded frames.
    pub fn clear_sent(&self) {
        self.inner.lock().unwrap().sent.clear();
    }

    /// Sockets closed by the client.
    pub fn closed_ids(&self) -> Vec<ConnectionId> {
        self.inner.lock().unwrap().closed.clone()
    }
}

impl Connector for MockConnector {
    fn connect(&mut self, _endpoint: &Endpoint, id: ConnectionId) -> Result<Box<dyn Socket>> {
        let mut network = self.inner.lock().unwrap();
        network.connects.push(id);
        if network.fail_connects {
            return Err(Error::Connection("connection refused".to_string()));
        }
        Ok(Box::new(MockSocket {
            id,
            network: Arc::clone(&self.inner),
        }))
    }
}

struct MockSocket {
    id: ConnectionId,
    network: Arc<Mutex<Network>>,
}

impl Socket for MockSocket {
    fn send_text(&mut self, text: String) -> Result<()> {
        self.network.lock().unwrap().sent.push((self.id, text));
        Ok(())
    }

    fn close(&mut self) {
        self.network.lock().unwrap().closed.push(self.id);
    }
}

#[derive(Debug)]
struct Screen {
    geometry: Geometry,
    proposal: Option<ProposedDimensions>,
    written: Vec<u8>,
    resizes: Vec<Geometry>,
    focus_count: usize,
}

/// Render surface that records what it is asked to do.
#[derive(Debug, Clone)]
pub struct MockSurface {
    inner: Arc<Mutex<Screen>>,
}

impl MockSurface {
    /// Create a surface showing `geometry` that proposes the same size.
    pub fn new(geometry: Geometry) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Screen {
                geometry,
                proposal: Some(ProposedDimensions::new(geometry.cols(), geometry.rows())),
                written: Vec::new(),
                resizes: Vec::new(),
                focus_count: 0,
            })),
        }
    }

    /// Change what `propose_dimensions` returns.
    pub fn set_proposal(&self, proposal: Option<ProposedDimensions>) {
        self.inner.lock().unwrap().proposal = proposal;
    }

    /// Bytes written so far.
    pub fn written(&self) -> Vec<u8> {
        self.inner.lock().unwrap().written.clone()
    }

    /// Written bytes as lossy UTF-8.
    pub fn written_text(&self) -> String {
        String::from_utf8_lossy(&self.written()).into_owned()
    }

    /// Geometries applied through `resize`, oldest first.
    pub fn resizes(&self) -> Vec<Geometry> {
        self.inner.lock().unwrap().resizes.clone()
    }

    /// How often `focus` was called.
    pub fn focus_count(&self) -> usize {
        self.inner.lock().unwrap().focus_count
    }
}

impl RenderSurface for MockSurface {
    fn write(&mut self, bytes: &[u8]) {
        self.inner.lock().unwrap().written.extend_from_slice(bytes);
    }

    fn propose_dimensions(&self) -> Option<ProposedDimensions> {
        self.inner.lock().unwrap().proposal
    }

    fn resize(&mut self, geometry: Geometry) {
        let mut screen = self.inner.lock().unwrap();
        screen.geometry = geometry;
        screen.resizes.push(geometry);
    }

    fn geometry(&self) -> Geometry {
        self.inner.lock().unwrap().geometry
    }

    fn focus(&mut self) {
        self.inner.lock().unwrap().focus_count += 1;
    }
}

/// Notice sink that keeps every notice.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotices {
    inner: Arc<Mutex<Vec<Notice>>>,
}

impl RecordingNotices {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Notices received so far.
    pub fn notices(&self) -> Vec<Notice> {
        self.inner.lock().unwrap().clone()
    }
}

impl NoticeSink for RecordingNotices {
    fn notify(&mut self, notice: Notice) {
        self.inner.lock().unwrap().push(notice);
    }
}

/// Download sink that keeps every directive.
#[derive(Debug, Clone, Default)]
pub struct RecordingDownloads {
    inner: Arc<Mutex<Vec<OobDirective>>>,
}

impl RecordingDownloads {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Directives received so far.
    pub fn requests(&self) -> Vec<OobDirective> {
        self.inner.lock().unwrap().clone()
    }
}

impl DownloadSink for RecordingDownloads {
    fn request(&mut self, directive: OobDirective) {
        self.inner.lock().unwrap().push(directive);
    }
}
