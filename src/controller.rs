//! Application controller.
//!
//! Owns the camera lifecycle state machine and runs the capture → detect →
//! render cycle. The UI event loop drives it: `tick_due` says when the next
//! cycle should run, `tick` runs it. Nothing in this module touches the GUI
//! toolkit, which keeps the whole state machine testable with stub sources
//! and backends.
//!
//! The controller is responsible for:
//! - Holding the only reference to the camera and the detector
//! - Enforcing the Idle/Active transitions (start/stop/close)
//! - Isolating per-cycle failures so one bad frame never ends the app
//!
//! The controller MUST NOT:
//! - Run cycles while Idle
//! - Release the camera while a tick could still be delivered

use anyhow::{Context, Result};
use std::time::{Duration, Instant};

use crate::capture::{FrameSource, SourceStats};
use crate::detect::DetectorBackend;
use crate::render::{render, RenderedFrame};

/// Camera lifecycle state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CameraState {
    Idle,
    Active,
}

/// Minimum spacing between skipped-cycle warnings.
const ERROR_LOG_INTERVAL: Duration = Duration::from_secs(5);
/// Spacing between steady-state health lines.
const HEALTH_LOG_INTERVAL: Duration = Duration::from_secs(5);

pub struct Controller {
    source: Box<dyn FrameSource>,
    detector: Box<dyn DetectorBackend>,
    state: CameraState,
    tick_interval: Duration,
    last_tick: Option<Instant>,
    latest: Option<(RenderedFrame, usize)>,
    frame_serial: u64,
    last_error_log: Option<Instant>,
    last_health_log: Option<Instant>,
}

impl Controller {
    pub fn new(
        source: Box<dyn FrameSource>,
        detector: Box<dyn DetectorBackend>,
        tick_interval: Duration,
    ) -> Self {
        Self {
            source,
            detector,
            state: CameraState::Idle,
            tick_interval,
            last_tick: None,
            latest: None,
            frame_serial: 0,
            last_error_log: None,
            last_health_log: None,
        }
    }

    pub fn state(&self) -> CameraState {
        self.state
    }

    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    /// Most recent rendered frame and its colony count.
    pub fn latest(&self) -> Option<&(RenderedFrame, usize)> {
        self.latest.as_ref()
    }

    /// Displayed colony count; zero until the first cycle completes.
    pub fn count(&self) -> usize {
        self.latest.as_ref().map_or(0, |(_, count)| *count)
    }

    /// Monotonic counter bumped whenever a new rendered frame lands. The UI
    /// re-uploads its texture only when this moves.
    pub fn frame_serial(&self) -> u64 {
        self.frame_serial
    }

    pub fn source_stats(&self) -> SourceStats {
        self.source.stats()
    }

    /// Start the camera and arm the tick schedule.
    ///
    /// No-op while Active. On failure the camera stays released, the state
    /// stays Idle, and the error is returned for the UI to display; a later
    /// retry is allowed.
    pub fn start(&mut self) -> Result<()> {
        if self.state == CameraState::Active {
            return Ok(());
        }
        self.source.start().context("camera start failed")?;
        self.state = CameraState::Active;
        self.last_tick = None;
        log::info!("Controller: camera active ({})", self.source.stats().device);
        Ok(())
    }

    /// Disarm the tick schedule, then release the camera.
    ///
    /// No-op while Idle. Runs on the event-loop thread, so no tick can be
    /// delivered between disarm and release.
    pub fn stop(&mut self) {
        if self.state == CameraState::Idle {
            return;
        }
        self.state = CameraState::Idle;
        self.last_tick = None;
        self.source.stop();
        log::info!("Controller: camera idle");
    }

    /// Teardown path for Close and process exit. Safe to call repeatedly.
    pub fn shutdown(&mut self) {
        self.stop();
    }

    /// Whether a cycle is due. Always false while Idle; the first cycle after
    /// `start` is due immediately.
    pub fn tick_due(&self, now: Instant) -> bool {
        if self.state != CameraState::Active {
            return false;
        }
        match self.last_tick {
            Some(last) => now.duration_since(last) >= self.tick_interval,
            None => true,
        }
    }

    /// Run one capture → detect → render cycle.
    ///
    /// A stale tick delivered while Idle is ignored. `None` frames skip the
    /// cycle silently; capture and inference errors skip the cycle with a
    /// rate-limited warning. In every skip case the previous frame and count
    /// stay on display.
    pub fn tick(&mut self) {
        if self.state != CameraState::Active {
            return;
        }
        self.last_tick = Some(Instant::now());

        match self.run_cycle() {
            Ok(Some((rendered, count))) => {
                self.latest = Some((rendered, count));
                self.frame_serial += 1;
            }
            Ok(None) => {}
            Err(err) => {
                let due = self
                    .last_error_log
                    .map_or(true, |at| at.elapsed() >= ERROR_LOG_INTERVAL);
                if due {
                    log::warn!("Controller: cycle skipped: {:#}", err);
                    self.last_error_log = Some(Instant::now());
                }
            }
        }

        let health_due = self
            .last_health_log
            .map_or(true, |at| at.elapsed() >= HEALTH_LOG_INTERVAL);
        if health_due {
            let stats = self.source.stats();
            log::debug!(
                "Controller: {} frames from {} ({}x{}), count {}",
                stats.frames_captured,
                stats.device,
                stats.width,
                stats.height,
                self.count()
            );
            self.last_health_log = Some(Instant::now());
        }
    }

    fn run_cycle(&mut self) -> Result<Option<(RenderedFrame, usize)>> {
        let Some(frame) = self.source.capture_frame().context("capture failed")? else {
            return Ok(None);
        };
        let frame = frame.into_rgb8();
        let detections = self.detector.detect(&frame).context("inference failed")?;
        Ok(Some(render(&frame, &detections)))
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::StubBackend;
    use crate::frame::Frame;

    struct OneFrameSource {
        running: bool,
    }

    impl FrameSource for OneFrameSource {
        fn start(&mut self) -> Result<()> {
            self.running = true;
            Ok(())
        }

        fn stop(&mut self) {
            self.running = false;
        }

        fn capture_frame(&mut self) -> Result<Option<Frame>> {
            if self.running {
                Ok(Some(Frame::rgb8(vec![128u8; 4 * 4 * 3], 4, 4)?))
            } else {
                Ok(None)
            }
        }

        fn is_running(&self) -> bool {
            self.running
        }

        fn stats(&self) -> SourceStats {
            SourceStats {
                frames_captured: 0,
                device: "test".to_string(),
                width: 4,
                height: 4,
            }
        }
    }

    fn controller() -> Controller {
        Controller::new(
            Box::new(OneFrameSource { running: false }),
            Box::new(StubBackend::new()),
            Duration::from_millis(100),
        )
    }

    #[test]
    fn ticks_are_never_due_while_idle() {
        let ctrl = controller();
        assert_eq!(ctrl.state(), CameraState::Idle);
        assert!(!ctrl.tick_due(Instant::now()));
    }

    #[test]
    fn first_tick_after_start_is_due_immediately() -> Result<()> {
        let mut ctrl = controller();
        ctrl.start()?;
        assert!(ctrl.tick_due(Instant::now()));
        Ok(())
    }

    #[test]
    fn ticks_respect_the_interval() -> Result<()> {
        let mut ctrl = controller();
        ctrl.start()?;
        ctrl.tick();

        // Immediately after a tick the next one is not yet due.
        assert!(!ctrl.tick_due(Instant::now()));
        assert!(ctrl.tick_due(Instant::now() + Duration::from_millis(150)));
        Ok(())
    }

    #[test]
    fn stop_disarms_the_schedule() -> Result<()> {
        let mut ctrl = controller();
        ctrl.start()?;
        ctrl.tick();
        ctrl.stop();

        assert_eq!(ctrl.state(), CameraState::Idle);
        assert!(!ctrl.tick_due(Instant::now() + Duration::from_secs(1)));
        Ok(())
    }

    #[test]
    fn successful_cycle_publishes_a_frame() -> Result<()> {
        let mut ctrl = controller();
        ctrl.start()?;
        assert!(ctrl.latest().is_none());
        assert_eq!(ctrl.count(), 0);

        ctrl.tick();
        assert!(ctrl.latest().is_some());
        assert_eq!(ctrl.frame_serial(), 1);
        Ok(())
    }
}
