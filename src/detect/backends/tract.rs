#![cfg(feature = "backend-tract")]

use anyhow::{anyhow, Context, Result};
use tract_onnx::prelude::*;

use crate::config::DetectorSettings;
use crate::detect::backend::DetectorBackend;
use crate::detect::result::{non_max_suppress, Detection};
use crate::frame::{Frame, PixelFormat};

/// Tract-based backend for ONNX colony detection.
///
/// Loads a local model file once and performs inference on RGB frames. The
/// model is expected to take a square `[1, 3, S, S]` input and produce a
/// YOLO-style `[1, 4 + classes, N]` output of center-format boxes. Frames are
/// stretched to the model input; decoded boxes are scaled back to frame
/// pixels, thresholded, and suppressed before being returned.
pub struct TractBackend {
    model: TypedSimplePlan<TypedModel>,
    input_size: u32,
    confidence_threshold: f32,
    iou_threshold: f32,
    max_detections: usize,
}

impl TractBackend {
    /// Load an ONNX model from disk and prepare it for inference.
    pub fn new(settings: &DetectorSettings) -> Result<Self> {
        let model_path = settings.model_path.as_path();
        let size = settings.input_size as usize;
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(f32::datum_type(), tvec!(1, 3, size, size)),
            )
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        Ok(Self {
            model,
            input_size: settings.input_size,
            confidence_threshold: settings.confidence_threshold,
            iou_threshold: settings.iou_threshold,
            max_detections: settings.max_detections,
        })
    }

    /// Stretch the frame to the square model input, scaling channels to 0..1.
    fn build_input(&self, frame: &Frame) -> Result<Tensor> {
        if frame.format != PixelFormat::Rgb8 {
            return Err(anyhow!("tract backend expects tightly packed RGB frames"));
        }
        if frame.width == 0 || frame.height == 0 {
            return Err(anyhow!("empty frame"));
        }

        let size = self.input_size as usize;
        let src_w = frame.width as usize;
        let src_h = frame.height as usize;
        let pixels = &frame.data;

        let input =
            tract_ndarray::Array4::from_shape_fn((1, 3, size, size), |(_, channel, y, x)| {
                let src_x = x * src_w / size;
                let src_y = y * src_h / size;
                let idx = (src_y * src_w + src_x) * 3 + channel;
                pixels[idx] as f32 / 255.0
            });

        Ok(input.into_tensor())
    }
}

impl DetectorBackend for TractBackend {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>> {
        let input = self.build_input(frame)?;
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("ONNX inference failed")?;
        let output = outputs
            .get(0)
            .ok_or_else(|| anyhow!("model produced no outputs"))?;
        let view = output
            .to_array_view::<f32>()
            .context("model output tensor was not f32")?;

        let detections = decode_boxes(
            view,
            frame.width as f32,
            frame.height as f32,
            self.input_size as f32,
            self.confidence_threshold,
        )?;
        let mut kept = non_max_suppress(detections, self.iou_threshold);
        kept.truncate(self.max_detections);
        Ok(kept)
    }

    /// Run one throwaway inference so the first live cycle does not pay the
    /// plan's cold-start cost.
    fn warm_up(&mut self) -> Result<()> {
        let size = self.input_size as usize;
        let zeros = tract_ndarray::Array4::<f32>::zeros((1, 3, size, size));
        self.model
            .run(tvec!(zeros.into_tensor().into()))
            .context("model warm-up inference failed")?;
        Ok(())
    }
}

/// Decode a YOLO-style `[1, 4 + classes, N]` tensor into frame-space boxes.
///
/// Rows 0..4 are center-format geometry in model input coordinates; remaining
/// rows are per-class scores. A candidate's score is its best class score.
fn decode_boxes(
    view: tract_ndarray::ArrayViewD<f32>,
    frame_w: f32,
    frame_h: f32,
    input_size: f32,
    confidence_threshold: f32,
) -> Result<Vec<Detection>> {
    let shape = view.shape();
    if shape.len() != 3 || shape[0] != 1 || shape[1] < 5 {
        return Err(anyhow!(
            "unexpected model output shape {:?} (want [1, 4 + classes, N])",
            shape
        ));
    }
    let rows = shape[1];
    let anchors = shape[2];
    let scale_x = frame_w / input_size;
    let scale_y = frame_h / input_size;

    let mut detections = Vec::new();
    for i in 0..anchors {
        let mut score = f32::NEG_INFINITY;
        for row in 4..rows {
            score = score.max(view[[0, row, i]]);
        }
        if !score.is_finite() || score < confidence_threshold {
            continue;
        }

        let cx = view[[0, 0, i]];
        let cy = view[[0, 1, i]];
        let w = view[[0, 2, i]];
        let h = view[[0, 3, i]];

        let x1 = ((cx - w / 2.0) * scale_x).clamp(0.0, frame_w);
        let y1 = ((cy - h / 2.0) * scale_y).clamp(0.0, frame_h);
        let x2 = ((cx + w / 2.0) * scale_x).clamp(0.0, frame_w);
        let y2 = ((cy + h / 2.0) * scale_y).clamp(0.0, frame_h);
        if x2 <= x1 || y2 <= y1 {
            continue;
        }

        detections.push(Detection::with_score(x1, y1, x2, y2, score));
    }

    Ok(detections)
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_scales_boxes_to_frame_space() -> Result<()> {
        // Three anchors: confident, below threshold, degenerate width.
        let data = [
            (50.0, 50.0, 20.0, 20.0, 0.9),
            (10.0, 10.0, 8.0, 8.0, 0.05),
            (70.0, 70.0, 0.0, 10.0, 0.8),
        ];
        let output = tract_ndarray::Array3::from_shape_fn((1, 5, 3), |(_, row, i)| {
            let (cx, cy, w, h, score) = data[i];
            [cx, cy, w, h, score][row]
        });

        let detections = decode_boxes(output.view().into_dyn(), 200.0, 100.0, 100.0, 0.25)?;
        assert_eq!(detections.len(), 1);

        let d = &detections[0];
        assert_eq!((d.x1, d.y1, d.x2, d.y2), (80.0, 40.0, 120.0, 60.0));
        assert_eq!(d.score, Some(0.9));
        Ok(())
    }

    #[test]
    fn decode_clamps_boxes_to_frame_bounds() -> Result<()> {
        let output = tract_ndarray::Array3::from_shape_fn((1, 5, 1), |(_, row, _)| {
            [5.0f32, 5.0, 30.0, 30.0, 0.9][row]
        });

        let detections = decode_boxes(output.view().into_dyn(), 100.0, 100.0, 100.0, 0.25)?;
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].x1, 0.0);
        assert_eq!(detections[0].y1, 0.0);
        Ok(())
    }

    #[test]
    fn decode_rejects_unexpected_shapes() {
        let output = tract_ndarray::Array3::<f32>::zeros((1, 3, 4));
        assert!(decode_boxes(output.view().into_dyn(), 100.0, 100.0, 100.0, 0.25).is_err());
    }
}
