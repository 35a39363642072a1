use anyhow::Result;

use crate::detect::result::Detection;
use crate::frame::Frame;

/// Detector backend trait.
///
/// A backend turns one normalized RGB frame into a list of colony bounding
/// boxes. The reported count for a cycle is exactly the length of that list;
/// backends apply their own confidence thresholding and suppression before
/// returning.
///
/// `detect` errors are recoverable: the controller logs them, skips the
/// cycle, and keeps the previous display. A backend must stay usable after
/// returning an error.
pub trait DetectorBackend: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Run detection on a frame. Callers pass tightly packed RGB data.
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>>;

    /// Optional warm-up hook, run once before the first cycle.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}
