//! Still image frame source.
//!
//! Loops a plate photo from disk (`still://<path>`) so the kiosk pipeline can
//! run on machines with no camera attached. The photo is decoded once at
//! start and handed out as a fresh frame on every capture.

use anyhow::{Context, Result};
use image::GenericImageView;

use super::SourceStats;
use crate::config::CameraSettings;
use crate::frame::Frame;

pub(crate) struct StillSource {
    path: String,
    settings: CameraSettings,
    frame: Option<Frame>,
    frame_count: u64,
}

impl StillSource {
    pub(crate) fn new(path: &str, settings: CameraSettings) -> Self {
        Self {
            path: path.to_string(),
            settings,
            frame: None,
            frame_count: 0,
        }
    }

    pub(crate) fn start(&mut self) -> Result<()> {
        if self.frame.is_some() {
            return Ok(());
        }
        let image = image::open(&self.path)
            .with_context(|| format!("decode still image {}", self.path))?;
        let (width, height) = image.dimensions();
        let rgb = image.into_rgb8();
        self.frame = Some(Frame::rgb8(rgb.into_raw(), width, height)?);
        log::info!(
            "CameraSource: started {} (still image, {}x{})",
            self.settings.device,
            width,
            height
        );
        Ok(())
    }

    pub(crate) fn stop(&mut self) {
        if self.frame.take().is_some() {
            log::info!("CameraSource: stopped {} (still image)", self.settings.device);
        }
    }

    pub(crate) fn capture_frame(&mut self) -> Result<Option<Frame>> {
        match &self.frame {
            Some(frame) => {
                self.frame_count += 1;
                Ok(Some(frame.clone()))
            }
            None => Ok(None),
        }
    }

    pub(crate) fn is_running(&self) -> bool {
        self.frame.is_some()
    }

    pub(crate) fn stats(&self) -> SourceStats {
        let (width, height) = match &self.frame {
            Some(frame) => (frame.width, frame.height),
            None => (self.settings.width, self.settings.height),
        };
        SourceStats {
            frames_captured: self.frame_count,
            device: self.settings.device.clone(),
            width,
            height,
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
