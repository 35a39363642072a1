//! Camera frame sources.
//!
//! This module provides the sources a kiosk can capture plate frames from:
//! - USB/V4L2 devices (feature: camera-v4l2)
//! - Still images looped from disk (`still://` paths)
//! - Synthetic plate scenes (`stub://` paths, testing and bench rigs)
//!
//! A source is responsible for:
//! - Acquiring and releasing the underlying device
//! - Surfacing acquisition failures so the UI can report them
//! - Producing `Frame` instances at roughly the configured rate
//!
//! A source MUST NOT:
//! - Block longer than one capture interval in `capture_frame`
//! - Hand out frames after `stop` has released the device

use anyhow::{anyhow, Result};

use crate::config::CameraSettings;
use crate::frame::{buffer_len, Frame, PixelFormat};

mod still;
#[cfg(feature = "camera-v4l2")]
mod v4l2;

use still::StillSource;
#[cfg(feature = "camera-v4l2")]
use v4l2::V4l2Source;

/// Scheme prefix selecting the synthetic plate scene.
pub const STUB_SCHEME: &str = "stub://";
/// Scheme prefix selecting a looped still image.
pub const STILL_SCHEME: &str = "still://";

/// A source of camera frames.
///
/// `start` and `stop` are idempotent. `capture_frame` returns `Ok(None)` when
/// no frame is ready or the source is stopped; both are expected conditions,
/// not errors.
pub trait FrameSource {
    /// Acquire the device and make frames available. No-op when already
    /// started. An `Err` means the device could not be acquired; the source
    /// remains stopped and `start` may be retried.
    fn start(&mut self) -> Result<()>;

    /// Release the device. No-op when already stopped.
    fn stop(&mut self);

    /// Most recent available frame, or `None` when nothing is ready.
    fn capture_frame(&mut self) -> Result<Option<Frame>>;

    /// Whether the source currently holds its device.
    fn is_running(&self) -> bool;

    /// Capture statistics.
    fn stats(&self) -> SourceStats;
}

/// Statistics for a frame source.
#[derive(Clone, Debug)]
pub struct SourceStats {
    pub frames_captured: u64,
    pub device: String,
    /// Active capture resolution, which may differ from the requested one
    /// when the device negotiates its own format.
    pub width: u32,
    pub height: u32,
}

/// Production frame source, selected by the configured device string.
pub struct CameraSource {
    backend: CaptureBackend,
}

enum CaptureBackend {
    Synthetic(SyntheticSource),
    Still(StillSource),
    #[cfg(feature = "camera-v4l2")]
    Device(V4l2Source),
}

impl CameraSource {
    pub fn new(settings: &CameraSettings) -> Result<Self> {
        if settings.device.trim().is_empty() {
            return Err(anyhow!("camera device must not be empty"));
        }
        if settings.device.starts_with(STUB_SCHEME) {
            Ok(Self {
                backend: CaptureBackend::Synthetic(SyntheticSource::new(settings.clone())),
            })
        } else if let Some(path) = settings.device.strip_prefix(STILL_SCHEME) {
            Ok(Self {
                backend: CaptureBackend::Still(StillSource::new(path, settings.clone())),
            })
        } else {
            #[cfg(feature = "camera-v4l2")]
            {
                Ok(Self {
                    backend: CaptureBackend::Device(V4l2Source::new(settings.clone())),
                })
            }
            #[cfg(not(feature = "camera-v4l2"))]
            {
                Err(anyhow!(
                    "camera device capture requires the camera-v4l2 feature"
                ))
            }
        }
    }
}

impl FrameSource for CameraSource {
    fn start(&mut self) -> Result<()> {
        match &mut self.backend {
            CaptureBackend::Synthetic(source) => source.start(),
            CaptureBackend::Still(source) => source.start(),
            #[cfg(feature = "camera-v4l2")]
            CaptureBackend::Device(source) => source.start(),
        }
    }

    fn stop(&mut self) {
        match &mut self.backend {
            CaptureBackend::Synthetic(source) => source.stop(),
            CaptureBackend::Still(source) => source.stop(),
            #[cfg(feature = "camera-v4l2")]
            CaptureBackend::Device(source) => source.stop(),
        }
    }

    fn capture_frame(&mut self) -> Result<Option<Frame>> {
        match &mut self.backend {
            CaptureBackend::Synthetic(source) => source.capture_frame(),
            CaptureBackend::Still(source) => source.capture_frame(),
            #[cfg(feature = "camera-v4l2")]
            CaptureBackend::Device(source) => source.capture_frame(),
        }
    }

    fn is_running(&self) -> bool {
        match &self.backend {
            CaptureBackend::Synthetic(source) => source.is_running(),
            CaptureBackend::Still(source) => source.is_running(),
            #[cfg(feature = "camera-v4l2")]
            CaptureBackend::Device(source) => source.is_running(),
        }
    }

    fn stats(&self) -> SourceStats {
        match &self.backend {
            CaptureBackend::Synthetic(source) => source.stats(),
            CaptureBackend::Still(source) => source.stats(),
            #[cfg(feature = "camera-v4l2")]
            CaptureBackend::Device(source) => source.stats(),
        }
    }
}

// ----------------------------------------------------------------------------
// Synthetic plate scene (stub://) for tests and camera-less development
// ----------------------------------------------------------------------------

struct SyntheticSource {
    settings: CameraSettings,
    started: bool,
    frame_count: u64,
}

impl SyntheticSource {
    fn new(settings: CameraSettings) -> Self {
        Self {
            settings,
            started: false,
            frame_count: 0,
        }
    }

    fn start(&mut self) -> Result<()> {
        if self.started {
            return Ok(());
        }
        self.started = true;
        log::info!(
            "CameraSource: started {} (synthetic, {}x{})",
            self.settings.device,
            self.settings.width,
            self.settings.height
        );
        Ok(())
    }

    fn stop(&mut self) {
        if self.started {
            self.started = false;
            log::info!("CameraSource: stopped {} (synthetic)", self.settings.device);
        }
    }

    fn capture_frame(&mut self) -> Result<Option<Frame>> {
        if !self.started {
            return Ok(None);
        }
        self.frame_count += 1;
        let pixels = self.generate_plate_pixels()?;
        let frame = Frame::rgb8(pixels, self.settings.width, self.settings.height)?;
        Ok(Some(frame))
    }

    /// Generate an agar-plate-like scene: a light dish on a dark bench with
    /// a handful of dark colony dots. The dot count drifts slowly so longer
    /// runs see the displayed count change.
    fn generate_plate_pixels(&mut self) -> Result<Vec<u8>> {
        use rand::{Rng, SeedableRng};

        let width = self.settings.width as usize;
        let height = self.settings.height as usize;
        let mut pixels = vec![0u8; buffer_len(
            self.settings.width,
            self.settings.height,
            PixelFormat::Rgb8,
        )?];

        let cx = width as f32 / 2.0;
        let cy = height as f32 / 2.0;
        let dish_radius = (width.min(height) as f32) * 0.45;

        for y in 0..height {
            for x in 0..width {
                let dx = x as f32 - cx;
                let dy = y as f32 - cy;
                let inside = dx * dx + dy * dy <= dish_radius * dish_radius;
                let shade = if inside { 210 } else { 40 };
                let offset = (y * width + x) * 3;
                pixels[offset] = shade;
                pixels[offset + 1] = shade;
                pixels[offset + 2] = shade;
            }
        }

        // Colony positions are seeded from the slow-moving scene epoch so the
        // dots stay put for ~5 s at 10 fps, then the layout changes.
        let epoch = self.frame_count / 50;
        let mut rng = rand::rngs::StdRng::seed_from_u64(epoch);
        let colonies = 3 + (rng.gen::<u64>() % 6) as usize;
        for _ in 0..colonies {
            let angle = rng.gen::<f32>() * std::f32::consts::TAU;
            let dist = rng.gen::<f32>() * dish_radius * 0.8;
            let px = (cx + angle.cos() * dist) as usize;
            let py = (cy + angle.sin() * dist) as usize;
            stamp_dot(&mut pixels, width, height, px, py, 4);
        }

        Ok(pixels)
    }

    fn is_running(&self) -> bool {
        self.started
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            device: self.settings.device.clone(),
            width: self.settings.width,
            height: self.settings.height,
        }
    }
}

fn stamp_dot(pixels: &mut [u8], width: usize, height: usize, cx: usize, cy: usize, radius: usize) {
    let r = radius as isize;
    for dy in -r..=r {
        for dx in -r..=r {
            if dx * dx + dy * dy > r * r {
                continue;
            }
            let x = cx as isize + dx;
            let y = cy as isize + dy;
            if x < 0 || y < 0 || x >= width as isize || y >= height as isize {
                continue;
            }
            let offset = (y as usize * width + x as usize) * 3;
            pixels[offset] = 70;
            pixels[offset + 1] = 60;
            pixels[offset + 2] = 50;
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn stub_settings() -> CameraSettings {
        CameraSettings {
            device: "stub://plate".to_string(),
            width: 64,
            height: 48,
            target_fps: 10,
            warmup_ms: 0,
        }
    }

    #[test]
    fn synthetic_source_produces_frames() -> Result<()> {
        let mut source = CameraSource::new(&stub_settings())?;
        source.start()?;

        let frame = source.capture_frame()?.ok_or_else(|| anyhow!("no frame"))?;
        assert_eq!(frame.width, 64);
        assert_eq!(frame.height, 48);
        assert_eq!(frame.format, PixelFormat::Rgb8);
        assert_eq!(frame.data.len(), 64 * 48 * 3);

        Ok(())
    }

    #[test]
    fn capture_before_start_returns_none() -> Result<()> {
        let mut source = CameraSource::new(&stub_settings())?;
        assert!(source.capture_frame()?.is_none());
        Ok(())
    }

    #[test]
    fn capture_after_stop_returns_none() -> Result<()> {
        let mut source = CameraSource::new(&stub_settings())?;
        source.start()?;
        assert!(source.capture_frame()?.is_some());

        source.stop();
        assert!(source.capture_frame()?.is_none());
        Ok(())
    }

    #[test]
    fn start_and_stop_are_idempotent() -> Result<()> {
        let mut source = CameraSource::new(&stub_settings())?;
        source.start()?;
        source.start()?;
        assert!(source.is_running());

        source.stop();
        source.stop();
        assert!(!source.is_running());
        Ok(())
    }

    #[test]
    fn synthetic_scene_contains_dish_and_colonies() -> Result<()> {
        let mut source = CameraSource::new(&stub_settings())?;
        source.start()?;
        let frame = source.capture_frame()?.ok_or_else(|| anyhow!("no frame"))?;

        // Center pixel sits on the dish, corner on the bench.
        let center = ((24 * 64 + 32) * 3) as usize;
        assert!(frame.data[center] > 100);
        assert!(frame.data[0] < 100);
        Ok(())
    }

    #[test]
    fn stats_count_captured_frames() -> Result<()> {
        let mut source = CameraSource::new(&stub_settings())?;
        source.start()?;
        source.capture_frame()?;
        source.capture_frame()?;

        let stats = source.stats();
        assert_eq!(stats.frames_captured, 2);
        assert_eq!(stats.device, "stub://plate");
        Ok(())
    }
}
