//! Transport behaviour driven through injected events.
//!
//! Timers, sockets and the surface are test doubles, so every test controls
//! exactly when the network opens, closes and when timers fire.

use std::time::Duration;

use webterm_core::{Endpoint, Geometry, InboundFrame, OobDirective, ProposedDimensions};
use webterm_transport::testing::{
    ManualScheduler, MockConnector, MockSurface, RecordingDownloads, RecordingNotices,
};
use webterm_transport::{
    CloseReason, ConnectionState, Notice, SocketEvent, TerminalTransport,
    TimerKind, TransportEvent, TransportOptions,
};

struct Harness {
    transport: TerminalTransport,
    connector: MockConnector,
    scheduler: ManualScheduler,
    surface: MockSurface,
    notices: RecordingNotices,
    downloads: RecordingDownloads,
}

impl Harness {
    fn new() -> Self {
        let connector = MockConnector::new();
        let scheduler = ManualScheduler::new();
        let surface = MockSurface::new(Geometry::new(80, 24).unwrap());
        let notices = RecordingNotices::new();
        let downloads = RecordingDownloads::new();

        let transport = TerminalTransport::new(
            Endpoint::for_session("http://localhost:8080", "session-1").unwrap(),
            TransportOptions::default(),
            Box::new(surface.clone()),
            Box::new(connector.clone()),
            Box::new(scheduler.clone()),
        )
        .with_notices(Box::new(notices.clone()))
        .with_downloads(Box::new(downloads.clone()));

        Self {
            transport,
            connector,
            scheduler,
            surface,
            notices,
            downloads,
        }
    }

    fn current(&self) -> webterm_transport::ConnectionId {
        self.connector.last_id().expect("a socket was opened")
    }

    fn open(&mut self) {
        let id = self.current();
        self.transport
            .handle_event(TransportEvent::socket(id, SocketEvent::Opened));
    }

    fn close(&mut self) {
        let id = self.current();
        self.transport
            .handle_event(TransportEvent::socket(id, SocketEvent::Closed));
    }

    fn output(&mut self, bytes: &[u8]) {
        let id = self.current();
        self.transport.handle_event(TransportEvent::socket(
            id,
            SocketEvent::Frame(InboundFrame::Binary(bytes.to_vec())),
        ));
    }

    fn fire(&mut self, kind: TimerKind) {
        let event = self
            .scheduler
            .fire(kind)
            .unwrap_or_else(|| panic!("{kind:?} timer is not armed"));
        self.transport.handle_event(event);
    }

    /// Start, open and finish the initial redraw-kick; forget sent frames.
    fn connected() -> Self {
        let mut harness = Self::new();
        harness.transport.start();
        harness.open();
        harness.fire(TimerKind::RedrawRestore);
        harness.connector.clear_sent();
        harness
    }
}

fn resize_frame(cols: u16, rows: u16) -> String {
    format!(r#"{{"type":"resize","cols":{cols},"rows":{rows}}}"#)
}

#[test]
fn test_open_declares_geometry_with_redraw_kick() {
    let mut harness = Harness::new();
    harness.transport.start();
    assert_eq!(harness.transport.state(), ConnectionState::Connecting);

    harness.open();
    assert_eq!(harness.transport.state(), ConnectionState::Open);
    assert_eq!(harness.connector.sent_frames(), vec![resize_frame(79, 24)]);

    harness.fire(TimerKind::RedrawRestore);
    assert_eq!(
        harness.connector.sent_frames(),
        vec![resize_frame(79, 24), resize_frame(80, 24)]
    );
    assert!(harness.notices.notices().is_empty());
}

#[test]
fn test_backoff_schedule_and_exhaustion() {
    let mut harness = Harness::connected();
    harness.close();

    // Ten attempts, every one of them failing
    for _ in 0..10 {
        harness.fire(TimerKind::Reconnect);
        harness.close();
    }

    let delays: Vec<u64> = harness
        .scheduler
        .armed_delays(TimerKind::Reconnect)
        .iter()
        .map(|d| d.as_millis() as u64)
        .collect();
    assert_eq!(
        delays,
        vec![1000, 2000, 4000, 8000, 16000, 30000, 30000, 30000, 30000, 30000]
    );

    // Initial socket plus ten reconnect attempts, no eleventh
    assert_eq!(harness.connector.connect_count(), 11);
    assert!(harness.scheduler.fire(TimerKind::Reconnect).is_none());
    assert_eq!(
        harness.transport.state(),
        ConnectionState::Closed(CloseReason::Exhausted)
    );

    let notices = harness.notices.notices();
    let failed: Vec<&Notice> = notices
        .iter()
        .filter(|n| matches!(n, Notice::Failed { .. }))
        .collect();
    assert_eq!(failed, vec![&Notice::Failed { attempts: 10 }]);
    assert_eq!(notices.first(), Some(&Notice::ConnectionLost));
    assert_eq!(
        notices
            .iter()
            .filter(|n| matches!(n, Notice::ConnectionLost))
            .count(),
        1
    );
    assert!(notices.contains(&Notice::Reconnecting {
        attempt: 10,
        max_attempts: 10
    }));
}

#[test]
fn test_input_blocked_after_exhaustion() {
    let mut harness = Harness::connected();
    harness.close();
    for _ in 0..10 {
        harness.fire(TimerKind::Reconnect);
        harness.close();
    }

    assert!(!harness.transport.send_input("ls\r"));
    assert!(harness.connector.sent_frames().is_empty());
}

#[test]
fn test_input_dropped_while_reconnecting() {
    let mut harness = Harness::connected();
    harness.close();
    assert_eq!(harness.transport.state(), ConnectionState::Reconnecting);

    assert!(!harness.transport.send_input("rm -rf build\r"));
    assert!(harness.connector.sent_frames().is_empty());

    // Nothing is replayed once the connection is back
    harness.fire(TimerKind::Reconnect);
    assert!(!harness.transport.send_input("x"));
    harness.open();
    let sent = harness.connector.sent_frames();
    assert!(sent.iter().all(|frame| !frame.contains("rm -rf")));
}

#[test]
fn test_input_sent_when_open() {
    let mut harness = Harness::connected();
    assert!(harness.transport.send_input("echo hi\r"));

    let frames = harness.connector.sent_frames();
    let value: serde_json::Value = serde_json::from_str(&frames[0]).unwrap();
    assert_eq!(value["type"], "input");
    assert_eq!(value["data"], "echo hi\r");
}

#[test]
fn test_reconnect_end_to_end() {
    let mut harness = Harness::new();
    harness.transport.start();
    harness.open();
    harness.fire(TimerKind::RedrawRestore);
    assert_eq!(harness.connector.sent_frames().last(), Some(&resize_frame(80, 24)));
    harness.connector.clear_sent();

    // Server drops the connection
    harness.close();
    assert_eq!(harness.transport.state(), ConnectionState::Reconnecting);
    assert_eq!(harness.notices.notices(), vec![Notice::ConnectionLost]);
    assert_eq!(
        harness.scheduler.pending_delay(TimerKind::Reconnect),
        Some(Duration::from_millis(1000))
    );

    harness.fire(TimerKind::Reconnect);
    assert_eq!(harness.transport.state(), ConnectionState::Connecting);
    assert_eq!(harness.transport.attempts(), 1);

    harness.open();
    assert_eq!(harness.transport.state(), ConnectionState::Open);
    assert_eq!(harness.transport.attempts(), 0);
    assert_eq!(harness.connector.sent_frames(), vec![resize_frame(79, 24)]);
    assert_eq!(
        harness.scheduler.pending_delay(TimerKind::RedrawRestore),
        Some(Duration::from_millis(75))
    );

    harness.fire(TimerKind::RedrawRestore);
    assert_eq!(
        harness.connector.sent_frames(),
        vec![resize_frame(79, 24), resize_frame(80, 24)]
    );
    assert_eq!(
        harness.notices.notices(),
        vec![
            Notice::ConnectionLost,
            Notice::Reconnecting {
                attempt: 1,
                max_attempts: 10
            },
            Notice::Reconnected,
        ]
    );
}

#[test]
fn test_teardown_twice_schedules_nothing() {
    let mut harness = Harness::connected();
    harness.close();
    assert!(harness.scheduler.armed_count() > 0);

    harness.transport.teardown();
    harness.transport.teardown();

    assert_eq!(harness.scheduler.armed_count(), 0);
    assert_eq!(
        harness.transport.state(),
        ConnectionState::Closed(CloseReason::Manual)
    );

    // Surface changes after teardown arm nothing either
    harness.transport.surface_changed();
    assert_eq!(harness.scheduler.armed_count(), 0);
}

#[test]
fn test_teardown_close_event_is_not_a_drop() {
    let mut harness = Harness::connected();
    let id = harness.current();

    harness.transport.teardown();
    assert_eq!(harness.connector.closed_ids(), vec![id]);

    harness
        .transport
        .handle_event(TransportEvent::socket(id, SocketEvent::Closed));
    assert_eq!(harness.scheduler.armed_count(), 0);
    assert!(harness.notices.notices().is_empty());
    assert_eq!(harness.connector.connect_count(), 1);
}

#[test]
fn test_restore_skipped_after_teardown() {
    let mut harness = Harness::new();
    harness.transport.start();
    harness.open();
    let restore = harness.scheduler.fire(TimerKind::RedrawRestore).unwrap();

    harness.transport.teardown();
    harness.transport.handle_event(restore);

    assert_eq!(harness.connector.sent_frames(), vec![resize_frame(79, 24)]);
}

#[test]
fn test_debounced_resize() {
    let mut harness = Harness::connected();
    harness
        .surface
        .set_proposal(Some(ProposedDimensions::new(120, 40)));

    harness.transport.handle_event(TransportEvent::SurfaceChanged);
    let stale = harness.scheduler.fire(TimerKind::ResizeDebounce).unwrap();
    harness.transport.handle_event(TransportEvent::SurfaceChanged);

    // The first arming was replaced; its fire does nothing
    harness.transport.handle_event(stale);
    assert!(harness.connector.sent_frames().is_empty());

    harness.fire(TimerKind::ResizeDebounce);
    assert_eq!(harness.connector.sent_frames(), vec![resize_frame(120, 40)]);
    assert_eq!(
        harness.surface.resizes().last(),
        Some(&Geometry::new(120, 40).unwrap())
    );
}

#[test]
fn test_degenerate_dimensions_never_sent() {
    let mut harness = Harness::connected();
    let resizes_before = harness.surface.resizes().len();
    harness
        .surface
        .set_proposal(Some(ProposedDimensions::new(1, 40)));

    harness.transport.surface_changed();
    harness.fire(TimerKind::ResizeDebounce);

    assert!(harness.connector.sent_frames().is_empty());
    assert_eq!(harness.surface.resizes().len(), resizes_before);
    assert_eq!(
        webterm_transport::RenderSurface::geometry(&harness.surface),
        Geometry::new(80, 24).unwrap()
    );
}

#[test]
fn test_resize_not_sent_while_reconnecting() {
    let mut harness = Harness::connected();
    harness.close();
    harness
        .surface
        .set_proposal(Some(ProposedDimensions::new(100, 30)));

    harness.transport.surface_changed();
    harness.fire(TimerKind::ResizeDebounce);

    assert!(harness.connector.sent_frames().is_empty());
    assert_eq!(
        harness.surface.resizes().last(),
        Some(&Geometry::new(100, 30).unwrap())
    );
}

#[test]
fn test_output_rendered_and_directive_forwarded() {
    let mut harness = Harness::connected();
    harness.output(b"hello\x1b]FILE;download:path=/tmp/a.txt,name=a.txt\x07world");

    assert_eq!(harness.surface.written_text(), "helloworld");
    assert_eq!(
        harness.downloads.requests(),
        vec![OobDirective {
            path: "/tmp/a.txt".to_string(),
            filename: "a.txt".to_string(),
        }]
    );
}

#[test]
fn test_output_from_stale_socket_is_dropped() {
    let mut harness = Harness::connected();
    let old = harness.current();
    harness.close();
    harness.fire(TimerKind::Reconnect);

    harness.transport.handle_event(TransportEvent::socket(
        old,
        SocketEvent::Frame(InboundFrame::Binary(b"late".to_vec())),
    ));
    assert_eq!(harness.surface.written_text(), "");
}

#[test]
fn test_download_failure_written_inline() {
    let mut harness = Harness::connected();
    harness.transport.handle_event(TransportEvent::DownloadFailed {
        filename: "a.txt".to_string(),
        message: "Download failed (404): file not found".to_string(),
    });

    let text = harness.surface.written_text();
    assert!(text.contains("Download failed (404): file not found"));
    assert_eq!(harness.transport.state(), ConnectionState::Open);
}

#[test]
fn test_focus_reaches_surface() {
    let mut harness = Harness::new();
    harness.transport.focus();
    harness.transport.focus();
    assert_eq!(harness.surface.focus_count(), 2);
}

#[test]
fn test_drop_tears_down() {
    let harness = Harness::connected();
    let connector = harness.connector.clone();
    let scheduler = harness.scheduler.clone();
    let id = harness.current();

    drop(harness);

    assert_eq!(connector.closed_ids(), vec![id]);
    assert_eq!(scheduler.armed_count(), 0);
}
