use anyhow::{anyhow, Result};

use crate::detect::backend::DetectorBackend;
use crate::detect::result::Detection;
use crate::frame::{Frame, PixelFormat};

/// Components smaller than this many pixels are treated as sensor noise.
const MIN_BLOB_AREA: usize = 12;
/// Components larger than this are scenery (dish rim, bench, shadows).
const MAX_BLOB_AREA: usize = 5_000;
/// Frames with less luminance spread than this are considered empty.
const MIN_LUMA_SPREAD: u8 = 16;

/// Heuristic backend: counts dark blobs against a lighter plate.
///
/// Runs anywhere with no model artifact. Thresholds the luminance plane at
/// the midpoint of its range, then boxes each connected dark component whose
/// area falls inside a plausible colony size band.
pub struct BlobBackend {
    min_area: usize,
    max_area: usize,
}

impl BlobBackend {
    pub fn new() -> Self {
        Self {
            min_area: MIN_BLOB_AREA,
            max_area: MAX_BLOB_AREA,
        }
    }
}

impl Default for BlobBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl DetectorBackend for BlobBackend {
    fn name(&self) -> &'static str {
        "blob"
    }

    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>> {
        if frame.format != PixelFormat::Rgb8 {
            return Err(anyhow!("blob backend expects tightly packed RGB frames"));
        }
        let width = frame.width as usize;
        let height = frame.height as usize;

        let luma: Vec<u8> = frame.data.chunks_exact(3).map(luminance).collect();

        let min = luma.iter().copied().min().unwrap_or(0);
        let max = luma.iter().copied().max().unwrap_or(0);
        if max - min < MIN_LUMA_SPREAD {
            return Ok(Vec::new());
        }
        let threshold = min + (max - min) / 2;

        let mut visited = vec![false; luma.len()];
        let mut detections = Vec::new();
        let mut stack = Vec::new();

        for start in 0..luma.len() {
            if visited[start] || luma[start] >= threshold {
                continue;
            }

            // Flood-fill one dark component, tracking its bounding box.
            let mut area = 0usize;
            let (mut x1, mut y1) = (width, height);
            let (mut x2, mut y2) = (0usize, 0usize);
            stack.push(start);
            visited[start] = true;
            while let Some(index) = stack.pop() {
                area += 1;
                let x = index % width;
                let y = index / width;
                x1 = x1.min(x);
                y1 = y1.min(y);
                x2 = x2.max(x);
                y2 = y2.max(y);

                let mut neighbors = [None; 4];
                if x > 0 {
                    neighbors[0] = Some(index - 1);
                }
                if x + 1 < width {
                    neighbors[1] = Some(index + 1);
                }
                if y > 0 {
                    neighbors[2] = Some(index - width);
                }
                if y + 1 < height {
                    neighbors[3] = Some(index + width);
                }
                for neighbor in neighbors.into_iter().flatten() {
                    if !visited[neighbor] && luma[neighbor] < threshold {
                        visited[neighbor] = true;
                        stack.push(neighbor);
                    }
                }
            }

            if area >= self.min_area && area <= self.max_area {
                detections.push(Detection::new(
                    x1 as f32,
                    y1 as f32,
                    (x2 + 1) as f32,
                    (y2 + 1) as f32,
                ));
            }
        }

        Ok(detections)
    }
}

fn luminance(px: &[u8]) -> u8 {
    let weighted =
        299 * u32::from(px[0]) + 587 * u32::from(px[1]) + 114 * u32::from(px[2]);
    (weighted / 1000) as u8
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
