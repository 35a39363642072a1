//! Frame rendering.
//!
//! Pure overlay pass: copies the input frame, burns one outline per detection
//! into the copy, and reports the colony count. The caller owns getting the
//! result onto a texture; this module never touches the GUI.

use crate::detect::Detection;
use crate::frame::Frame;

/// Outline color for detected colonies.
pub const BOX_COLOR: [u8; 3] = [0, 255, 0];
/// Outline thickness in pixels.
pub const BOX_THICKNESS: u32 = 2;

/// An RGB frame with detection outlines burned in, ready for display.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderedFrame {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Draw detection outlines onto a copy of `frame`.
///
/// Returns the annotated frame and `detections.len()`. Boxes are clamped to
/// the frame; boxes entirely outside it or with degenerate geometry are
/// skipped visually but still counted. The input frame is never mutated, and
/// zero detections yield a pixel-identical copy.
pub fn render(frame: &Frame, detections: &[Detection]) -> (RenderedFrame, usize) {
    let rgb = frame.clone().into_rgb8();
    let width = rgb.width;
    let height = rgb.height;
    let mut data = rgb.data;

    for detection in detections {
        if let Some(rect) = clamp_box(detection, width, height) {
            draw_rect(&mut data, width, height, rect, BOX_COLOR, BOX_THICKNESS);
        }
    }

    (
        RenderedFrame {
            data,
            width,
            height,
        },
        detections.len(),
    )
}

/// Clamp a detection into pixel bounds. Returns `None` for boxes that are
/// degenerate or lie entirely outside the frame.
fn clamp_box(detection: &Detection, width: u32, height: u32) -> Option<[u32; 4]> {
    if width == 0 || height == 0 {
        return None;
    }
    if detection.x2 <= detection.x1 || detection.y2 <= detection.y1 {
        return None;
    }
    if detection.x2 <= 0.0
        || detection.y2 <= 0.0
        || detection.x1 >= width as f32
        || detection.y1 >= height as f32
    {
        return None;
    }
    let clamp = |v: f32, max: u32| -> u32 { v.max(0.0).min((max - 1) as f32) as u32 };
    Some([
        clamp(detection.x1, width),
        clamp(detection.y1, height),
        clamp(detection.x2, width),
        clamp(detection.y2, height),
    ])
}

/// Draw a rectangle border of the given thickness, growing inward.
fn draw_rect(
    data: &mut [u8],
    width: u32,
    height: u32,
    rect: [u32; 4],
    color: [u8; 3],
    thickness: u32,
) {
    let [x0, y0, x1, y1] = rect;
    for t in 0..thickness {
        let xx0 = x0.saturating_add(t);
        let yy0 = y0.saturating_add(t);
        let xx1 = x1.saturating_sub(t);
        let yy1 = y1.saturating_sub(t);
        if xx0 >= width || yy0 >= height || xx1 >= width || yy1 >= height || xx0 > xx1 || yy0 > yy1
        {
            continue;
        }
        for x in xx0..=xx1 {
            put_pixel(data, width, x, yy0, color);
            put_pixel(data, width, x, yy1, color);
        }
        for y in yy0..=yy1 {
            put_pixel(data, width, xx0, y, color);
            put_pixel(data, width, xx1, y, color);
        }
    }
}

fn put_pixel(data: &mut [u8], width: u32, x: u32, y: u32, color: [u8; 3]) {
    let offset = (y as usize * width as usize + x as usize) * 3;
    data[offset..offset + 3].copy_from_slice(&color);
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::PixelFormat;
    use anyhow::Result;

    fn gray_frame(width: u32, height: u32) -> Frame {
        Frame::rgb8(vec![128u8; (width * height * 3) as usize], width, height).unwrap()
    }

    fn pixel(rendered: &RenderedFrame, x: u32, y: u32) -> [u8; 3] {
        let offset = (y as usize * rendered.width as usize + x as usize) * 3;
        [
            rendered.data[offset],
            rendered.data[offset + 1],
            rendered.data[offset + 2],
        ]
    }

    #[test]
    fn zero_detections_copy_is_pixel_identical() {
        let frame = gray_frame(32, 24);
        let (rendered, count) = render(&frame, &[]);

        assert_eq!(count, 0);
        assert_eq!(rendered.data, frame.data);
    }

    #[test]
    fn input_frame_is_never_mutated() {
        let frame = gray_frame(32, 24);
        let original = frame.data.clone();
        let _ = render(&frame, &[Detection::new(4.0, 4.0, 20.0, 20.0)]);
        assert_eq!(frame.data, original);
    }

    #[test]
    fn outlines_are_drawn_at_box_edges() {
        let frame = gray_frame(32, 24);
        let detections = vec![Detection::new(4.0, 4.0, 20.0, 16.0)];
        let (rendered, count) = render(&frame, &detections);

        assert_eq!(count, 1);
        // Outer edge and the second thickness ring are colored.
        assert_eq!(pixel(&rendered, 4, 4), BOX_COLOR);
        assert_eq!(pixel(&rendered, 12, 4), BOX_COLOR);
        assert_eq!(pixel(&rendered, 12, 5), BOX_COLOR);
        assert_eq!(pixel(&rendered, 4, 10), BOX_COLOR);
        // Interior stays untouched.
        assert_eq!(pixel(&rendered, 12, 10), [128, 128, 128]);
    }

    #[test]
    fn count_reflects_every_detection() {
        let frame = gray_frame(64, 48);
        let detections = vec![
            Detection::new(2.0, 2.0, 10.0, 10.0),
            Detection::new(20.0, 4.0, 30.0, 14.0),
            Detection::new(40.0, 20.0, 55.0, 40.0),
        ];
        let (_, count) = render(&frame, &detections);
        assert_eq!(count, 3);
    }

    #[test]
    fn out_of_frame_box_is_counted_but_not_drawn() {
        let frame = gray_frame(32, 24);
        let detections = vec![Detection::new(-40.0, -40.0, -10.0, -10.0)];
        let (rendered, count) = render(&frame, &detections);

        assert_eq!(count, 1);
        assert_eq!(rendered.data, frame.data);
    }

    #[test]
    fn degenerate_box_is_counted_but_not_drawn() {
        let frame = gray_frame(32, 24);
        let detections = vec![Detection::new(10.0, 10.0, 10.0, 20.0)];
        let (rendered, count) = render(&frame, &detections);

        assert_eq!(count, 1);
        assert_eq!(rendered.data, frame.data);
    }

    #[test]
    fn partially_visible_box_is_clamped() {
        let frame = gray_frame(32, 24);
        let detections = vec![Detection::new(-10.0, -10.0, 8.0, 8.0)];
        let (rendered, count) = render(&frame, &detections);

        assert_eq!(count, 1);
        assert_eq!(pixel(&rendered, 0, 0), BOX_COLOR);
        assert_eq!(pixel(&rendered, 8, 8), BOX_COLOR);
    }

    #[test]
    fn rgba_input_is_normalized_before_drawing() -> Result<()> {
        let frame = Frame::new(vec![128u8; 32 * 24 * 4], 32, 24, PixelFormat::Rgba8)?;
        let (rendered, _) = render(&frame, &[]);
        assert_eq!(rendered.data.len(), 32 * 24 * 3);
        Ok(())
    }
}
