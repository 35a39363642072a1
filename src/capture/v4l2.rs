//! V4L2 device frame source.
//!
//! Captures plate frames from a local V4L2 device node (e.g. /dev/video0).
//! The device is opened on `start`, configured for RGB capture at the target
//! rate, warmed up by draining frames for the configured settle time, and
//! released on `stop`.

use anyhow::{anyhow, Context, Result};
use ouroboros::self_referencing;
use std::time::Instant;

use super::SourceStats;
use crate::config::CameraSettings;
use crate::frame::{buffer_len, Frame, PixelFormat};

pub(crate) struct V4l2Source {
    settings: CameraSettings,
    state: Option<DeviceState>,
    frame_count: u64,
    active_width: u32,
    active_height: u32,
    active_format: PixelFormat,
}

#[self_referencing]
struct DeviceState {
    device: v4l::Device,
    #[borrows(mut device)]
    #[covariant]
    stream: v4l::prelude::MmapStream<'this, v4l::Device>,
}

impl V4l2Source {
    pub(crate) fn new(settings: CameraSettings) -> Self {
        Self {
            active_width: settings.width,
            active_height: settings.height,
            active_format: PixelFormat::Rgb8,
            settings,
            state: None,
            frame_count: 0,
        }
    }

    pub(crate) fn start(&mut self) -> Result<()> {
        use v4l::buffer::Type;
        use v4l::video::Capture;

        if self.state.is_some() {
            return Ok(());
        }

        let mut device = v4l::Device::with_path(&self.settings.device)
            .with_context(|| format!("open v4l2 device {}", self.settings.device))?;
        let mut format = device.format().context("read v4l2 format")?;
        format.width = self.settings.width;
        format.height = self.settings.height;
        format.fourcc = v4l::FourCC::new(b"RGB3");

        let format = match device.set_format(&format) {
            Ok(format) => format,
            Err(err) => {
                log::warn!(
                    "CameraSource: failed to set format on {}: {}",
                    self.settings.device,
                    err
                );
                device
                    .format()
                    .context("read v4l2 format after set failure")?
            }
        };

        if self.settings.target_fps > 0 {
            let params = v4l::video::capture::Parameters::with_fps(self.settings.target_fps);
            if let Err(err) = device.set_params(&params) {
                log::warn!(
                    "CameraSource: failed to set fps on {}: {}",
                    self.settings.device,
                    err
                );
            }
        }

        self.active_width = format.width;
        self.active_height = format.height;
        self.active_format = match &format.fourcc.repr {
            b"RGB3" => PixelFormat::Rgb8,
            b"AB24" | b"XB24" => PixelFormat::Rgba8,
            _ => {
                return Err(anyhow!(
                    "device {} delivers unsupported pixel format {}",
                    self.settings.device,
                    format.fourcc
                ))
            }
        };

        let mut state = DeviceStateTryBuilder {
            device,
            stream_builder: |device| {
                v4l::prelude::MmapStream::with_buffers(device, Type::VideoCapture, 4)
                    .map_err(|err| anyhow::Error::new(err).context("create v4l2 buffer stream"))
            },
        }
        .try_build()?;

        self.warm_up(&mut state);
        self.state = Some(state);

        log::info!(
            "CameraSource: started {} ({}x{} @ {} fps)",
            self.settings.device,
            self.active_width,
            self.active_height,
            self.settings.target_fps
        );
        Ok(())
    }

    /// Drain and discard frames until the settle time elapses, so the first
    /// displayed frame is past auto-exposure startup.
    fn warm_up(&self, state: &mut DeviceState) {
        use v4l::io::traits::CaptureStream;

        let warmup = self.settings.warmup();
        if warmup.is_zero() {
            return;
        }
        log::info!(
            "CameraSource: warming up {} for {} ms",
            self.settings.device,
            warmup.as_millis()
        );
        let deadline = Instant::now() + warmup;
        while Instant::now() < deadline {
            if let Err(err) = state.with_mut(|fields| fields.stream.next()) {
                log::warn!("CameraSource: warm-up capture failed: {}", err);
                break;
            }
        }
    }

    pub(crate) fn stop(&mut self) {
        if self.state.take().is_some() {
            log::info!("CameraSource: stopped {}", self.settings.device);
        }
    }

    pub(crate) fn capture_frame(&mut self) -> Result<Option<Frame>> {
        use v4l::io::traits::CaptureStream;

        let Some(state) = self.state.as_mut() else {
            return Ok(None);
        };
        let (buf, _meta) = state
            .with_mut(|fields| fields.stream.next())
            .map_err(|err| anyhow::Error::new(err).context("capture v4l2 frame"))?;

        // Mapped buffers may carry trailing padding beyond the pixel data.
        let expected = buffer_len(self.active_width, self.active_height, self.active_format)?;
        if buf.len() < expected {
            return Err(anyhow!(
                "short v4l2 buffer: expected {} bytes, got {}",
                expected,
                buf.len()
            ));
        }

        self.frame_count += 1;
        let frame = Frame::new(
            buf[..expected].to_vec(),
            self.active_width,
            self.active_height,
            self.active_format,
        )?;
        Ok(Some(frame))
    }

    pub(crate) fn is_running(&self) -> bool {
        self.state.is_some()
    }

    pub(crate) fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            device: self.settings.device.clone(),
            width: self.active_width,
            height: self.active_height,
        }
    }
}
