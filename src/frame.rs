//! Pixel frame container and normalization.
//!
//! This module provides `Frame`, the owned pixel buffer that flows from a
//! capture backend through detection and rendering.
//!
//! A `Frame` is responsible for:
//! - Carrying pixel data together with its dimensions and layout
//! - Validating that the buffer length matches the declared geometry
//! - Normalizing 4-channel capture output down to tightly packed RGB
//!
//! A `Frame` is NOT retained across cycles: the controller consumes one frame
//! per tick and drops it after rendering.

use anyhow::{anyhow, Result};

/// Pixel layout of a frame buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelFormat {
    /// Tightly packed 3-byte RGB.
    Rgb8,
    /// Tightly packed 4-byte RGBA; alpha is dropped during normalization.
    Rgba8,
}

impl PixelFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Rgb8 => 3,
            PixelFormat::Rgba8 => 4,
        }
    }
}

/// One captured frame. Produced by a capture backend, consumed by one
/// detect/render cycle.
#[derive(Clone, Debug)]
pub struct Frame {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
}

impl Frame {
    /// Wrap a pixel buffer, validating that its length matches the geometry.
    pub fn new(data: Vec<u8>, width: u32, height: u32, format: PixelFormat) -> Result<Self> {
        let expected = buffer_len(width, height, format)?;
        if data.len() != expected {
            return Err(anyhow!(
                "frame length mismatch for {}x{} {:?}: expected {}, got {}",
                width,
                height,
                format,
                expected,
                data.len()
            ));
        }
        Ok(Self {
            data,
            width,
            height,
            format,
        })
    }

    /// Convenience constructor for tightly packed RGB data.
    pub fn rgb8(data: Vec<u8>, width: u32, height: u32) -> Result<Self> {
        Self::new(data, width, height, PixelFormat::Rgb8)
    }

    /// Normalize to tightly packed RGB, dropping the alpha channel when the
    /// capture backend produced 4-channel output.
    pub fn into_rgb8(self) -> Frame {
        match self.format {
            PixelFormat::Rgb8 => self,
            PixelFormat::Rgba8 => {
                let mut rgb = Vec::with_capacity(self.data.len() / 4 * 3);
                for px in self.data.chunks_exact(4) {
                    rgb.extend_from_slice(&px[..3]);
                }
                Frame {
                    data: rgb,
                    width: self.width,
                    height: self.height,
                    format: PixelFormat::Rgb8,
                }
            }
        }
    }
}

/// Expected buffer length for a geometry, guarding against dimension overflow.
pub(crate) fn buffer_len(width: u32, height: u32, format: PixelFormat) -> Result<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(format.bytes_per_pixel()))
        .ok_or_else(|| anyhow!("frame dimensions overflow"))
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_validates_buffer_length() {
        let ok = Frame::rgb8(vec![0u8; 12], 2, 2);
        assert!(ok.is_ok());

        let short = Frame::rgb8(vec![0u8; 11], 2, 2);
        assert!(short.is_err());
    }

    #[test]
    fn rgba_normalizes_to_rgb() -> Result<()> {
        let rgba = vec![
            10, 20, 30, 255, //
            40, 50, 60, 255, //
        ];
        let frame = Frame::new(rgba, 2, 1, PixelFormat::Rgba8)?;
        let rgb = frame.into_rgb8();

        assert_eq!(rgb.format, PixelFormat::Rgb8);
        assert_eq!(rgb.data, vec![10, 20, 30, 40, 50, 60]);
        assert_eq!((rgb.width, rgb.height), (2, 1));
        Ok(())
    }

    #[test]
    fn rgb_normalization_is_identity() -> Result<()> {
        let data = vec![1u8, 2, 3, 4, 5, 6];
        let frame = Frame::rgb8(data.clone(), 2, 1)?;
        let rgb = frame.into_rgb8();
        assert_eq!(rgb.data, data);
        Ok(())
    }

    #[test]
    fn oversized_dimensions_are_rejected() {
        assert!(buffer_len(u32::MAX, u32::MAX, PixelFormat::Rgb8).is_err());
    }
}
