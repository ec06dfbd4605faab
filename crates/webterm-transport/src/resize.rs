//! Keeps local and remote terminal geometry equal.

use tracing::{debug, warn};

use webterm_core::{Geometry, ResizeSettings};

use crate::connection::ConnectionManager;
use crate::surface::RenderSurface;
use crate::timer::{Scheduler, TimerKind};

/// Debounces surface size changes into resize frames and performs the
/// redraw-kick after every (re)connection.
///
/// Full-screen programs only repaint on a real geometry change, so after a
/// reconnect at unchanged size the coordinator first declares one column
/// less and then restores the true width.
#[derive(Debug)]
pub struct ResizeCoordinator {
    settings: ResizeSettings,
    /// Geometry the redraw-kick restores when its timer fires
    pending_restore: Option<Geometry>,
    torn_down: bool,
}

impl ResizeCoordinator {
    /// Create a coordinator.
    pub fn new(settings: ResizeSettings) -> Self {
        Self {
            settings,
            pending_restore: None,
            torn_down: false,
        }
    }

    /// Geometry waiting to be restored by the redraw-kick.
    pub fn pending_restore(&self) -> Option<Geometry> {
        self.pending_restore
    }

    /// The surface changed size; (re)start the quiet period.
    pub fn surface_changed(&mut self, scheduler: &mut dyn Scheduler) {
        if self.torn_down {
            return;
        }
        scheduler.arm(TimerKind::ResizeDebounce, self.settings.debounce());
    }

    /// The quiet period elapsed: fit the surface and declare the result.
    ///
    /// Returns the applied geometry, or `None` if the proposal was unusable.
    pub fn handle_debounce(
        &mut self,
        surface: &mut dyn RenderSurface,
        connection: &mut ConnectionManager,
    ) -> Option<Geometry> {
        if self.torn_down {
            return None;
        }

        let geometry = Self::fit(surface)?;
        if self.pending_restore.is_some() {
            // A redraw-kick is in flight; restore to the new size instead.
            self.pending_restore = Some(geometry);
        }
        if connection.is_open() {
            Self::declare(connection, geometry);
        }
        Some(geometry)
    }

    /// The connection reached `Open`: fit, then start the redraw-kick.
    pub fn handle_open(
        &mut self,
        surface: &mut dyn RenderSurface,
        connection: &mut ConnectionManager,
        scheduler: &mut dyn Scheduler,
    ) {
        if self.torn_down {
            return;
        }

        let target = Self::fit(surface).unwrap_or_else(|| surface.geometry());
        match target.narrowed() {
            Some(narrowed) => {
                debug!("Redraw-kick: {} then {}", narrowed, target);
                surface.resize(narrowed);
                Self::declare(connection, narrowed);
                self.pending_restore = Some(target);
                scheduler.arm(TimerKind::RedrawRestore, self.settings.redraw_delay());
            }
            None => {
                // Too narrow to kick without going below the floor
                Self::declare(connection, target);
            }
        }
    }

    /// The redraw-kick delay elapsed: restore the true geometry.
    pub fn handle_restore(
        &mut self,
        surface: &mut dyn RenderSurface,
        connection: &mut ConnectionManager,
    ) {
        let Some(target) = self.pending_restore.take() else {
            return;
        };
        if self.torn_down || !connection.is_open() {
            debug!("Skipping redraw-kick restore to {}", target);
            return;
        }
        surface.resize(target);
        Self::declare(connection, target);
    }

    /// Cancel pending timers; later calls do nothing.
    pub fn teardown(&mut self, scheduler: &mut dyn Scheduler) {
        self.torn_down = true;
        self.pending_restore = None;
        scheduler.cancel(TimerKind::ResizeDebounce);
        scheduler.cancel(TimerKind::RedrawRestore);
    }

    fn fit(surface: &mut dyn RenderSurface) -> Option<Geometry> {
        let proposed = surface.propose_dimensions()?;
        match Geometry::try_from(proposed) {
            Ok(geometry) => {
                surface.resize(geometry);
                Some(geometry)
            }
            Err(_) => {
                debug!(
                    "Ignoring proposed dimensions {}x{}",
                    proposed.cols, proposed.rows
                );
                None
            }
        }
    }

    fn declare(connection: &mut ConnectionManager, geometry: Geometry) {
        if let Err(e) = connection.send_resize(geometry) {
            warn!("Failed to send resize to {}: {}", geometry, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ManualScheduler, MockConnector, MockSurface};
    use webterm_core::{Endpoint, ProposedDimensions, ReconnectPolicy};

    fn open_connection(connector: &MockConnector, scheduler: &mut ManualScheduler) -> ConnectionManager {
        let endpoint = Endpoint::parse("ws://localhost/ws/s").unwrap();
        let mut connection =
            ConnectionManager::new(endpoint, ReconnectPolicy::default(), Box::new(connector.clone()));
        connection.connect(scheduler);
        connection.handle_open(connector.last_id().unwrap());
        connection
    }

    #[test]
    fn test_surface_changed_arms_debounce() {
        let mut scheduler = ManualScheduler::new();
        let mut coordinator = ResizeCoordinator::new(ResizeSettings::default());

        coordinator.surface_changed(&mut scheduler);
        coordinator.surface_changed(&mut scheduler);

        assert!(scheduler.is_armed(TimerKind::ResizeDebounce));
        assert_eq!(scheduler.armed_delays(TimerKind::ResizeDebounce).len(), 2);
    }

    #[test]
    fn test_debounce_sends_resize_when_open() {
        let connector = MockConnector::new();
        let mut scheduler = ManualScheduler::new();
        let mut connection = open_connection(&connector, &mut scheduler);
        let surface = MockSurface::new(Geometry::new(80, 24).unwrap());
        surface.set_proposal(Some(ProposedDimensions::new(100, 30)));
        let mut coordinator = ResizeCoordinator::new(ResizeSettings::default());

        let applied = coordinator.handle_debounce(&mut surface.clone(), &mut connection);

        assert_eq!(applied, Some(Geometry::new(100, 30).unwrap()));
        assert_eq!(surface.geometry(), Geometry::new(100, 30).unwrap());
        assert_eq!(
            connector.sent_frames(),
            vec![r#"{"type":"resize","cols":100,"rows":30}"#]
        );
    }

    #[test]
    fn test_degenerate_proposal_is_ignored() {
        let connector = MockConnector::new();
        let mut scheduler = ManualScheduler::new();
        let mut connection = open_connection(&connector, &mut scheduler);
        let surface = MockSurface::new(Geometry::new(80, 24).unwrap());
        surface.set_proposal(Some(ProposedDimensions::new(1, 40)));
        let mut coordinator = ResizeCoordinator::new(ResizeSettings::default());

        let applied = coordinator.handle_debounce(&mut surface.clone(), &mut connection);

        assert_eq!(applied, None);
        assert_eq!(surface.geometry(), Geometry::new(80, 24).unwrap());
        assert!(surface.resizes().is_empty());
        assert!(connector.sent_frames().is_empty());
    }

    #[test]
    fn test_open_performs_redraw_kick() {
        let connector = MockConnector::new();
        let mut scheduler = ManualScheduler::new();
        let mut connection = open_connection(&connector, &mut scheduler);
        let surface = MockSurface::new(Geometry::new(80, 24).unwrap());
        surface.set_proposal(Some(ProposedDimensions::new(80, 24)));
        let mut coordinator = ResizeCoordinator::new(ResizeSettings::default());

        coordinator.handle_open(&mut surface.clone(), &mut connection, &mut scheduler);
        assert_eq!(
            connector.sent_frames(),
            vec![r#"{"type":"resize","cols":79,"rows":24}"#]
        );
        assert_eq!(
            scheduler.armed_delays(TimerKind::RedrawRestore),
            vec![std::time::Duration::from_millis(75)]
        );

        coordinator.handle_restore(&mut surface.clone(), &mut connection);
        assert_eq!(
            connector.sent_frames(),
            vec![
                r#"{"type":"resize","cols":79,"rows":24}"#,
                r#"{"type":"resize","cols":80,"rows":24}"#
            ]
        );
        assert_eq!(surface.geometry(), Geometry::new(80, 24).unwrap());
    }

    #[test]
    fn test_restore_skipped_when_connection_dropped() {
        let connector = MockConnector::new();
        let mut scheduler = ManualScheduler::new();
        let mut connection = open_connection(&connector, &mut scheduler);
        let surface = MockSurface::new(Geometry::new(80, 24).unwrap());
        let mut coordinator = ResizeCoordinator::new(ResizeSettings::default());

        coordinator.handle_open(&mut surface.clone(), &mut connection, &mut scheduler);
        connection.handle_close(connector.last_id().unwrap(), &mut scheduler);
        coordinator.handle_restore(&mut surface.clone(), &mut connection);

        assert_eq!(connector.sent_frames().len(), 1);
        assert_eq!(coordinator.pending_restore(), None);
    }

    #[test]
    fn test_narrow_surface_skips_kick() {
        let connector = MockConnector::new();
        let mut scheduler = ManualScheduler::new();
        let mut connection = open_connection(&connector, &mut scheduler);
        let surface = MockSurface::new(Geometry::new(2, 10).unwrap());
        let mut coordinator = ResizeCoordinator::new(ResizeSettings::default());

        coordinator.handle_open(&mut surface.clone(), &mut connection, &mut scheduler);

        assert_eq!(
            connector.sent_frames(),
            vec![r#"{"type":"resize","cols":2,"rows":10}"#]
        );
        assert!(!scheduler.is_armed(TimerKind::RedrawRestore));
    }

    #[test]
    fn test_teardown_cancels_timers() {
        let connector = MockConnector::new();
        let mut scheduler = ManualScheduler::new();
        let mut connection = open_connection(&connector, &mut scheduler);
        let surface = MockSurface::new(Geometry::new(80, 24).unwrap());
        let mut coordinator = ResizeCoordinator::new(ResizeSettings::default());

        coordinator.handle_open(&mut surface.clone(), &mut connection, &mut scheduler);
        coordinator.surface_changed(&mut scheduler);
        coordinator.teardown(&mut scheduler);

        assert!(!scheduler.is_armed(TimerKind::RedrawRestore));
        assert!(!scheduler.is_armed(TimerKind::ResizeDebounce));

        coordinator.surface_changed(&mut scheduler);
        assert!(!scheduler.is_armed(TimerKind::ResizeDebounce));
    }
}
