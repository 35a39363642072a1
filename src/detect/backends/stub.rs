use anyhow::Result;

use crate::detect::backend::DetectorBackend;
use crate::detect::result::Detection;
use crate::frame::Frame;

/// Stub backend for testing. Plays back a scripted sequence of detection
/// lists, repeating the final entry once the script runs out. An empty
/// script reports zero colonies forever.
pub struct StubBackend {
    script: Vec<Vec<Detection>>,
    cursor: usize,
}

impl StubBackend {
    pub fn new() -> Self {
        Self {
            script: Vec::new(),
            cursor: 0,
        }
    }

    pub fn with_script(script: Vec<Vec<Detection>>) -> Self {
        Self { script, cursor: 0 }
    }
}

impl Default for StubBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl DetectorBackend for StubBackend {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn detect(&mut self, _frame: &Frame) -> Result<Vec<Detection>> {
        if self.script.is_empty() {
            return Ok(Vec::new());
        }
        let index = self.cursor.min(self.script.len() - 1);
        if self.cursor < self.script.len() {
            self.cursor += 1;
        }
        Ok(self.script[index].clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stub_backend_replays_script() -> Result<()> {
        let frame = Frame::rgb8(vec![0u8; 12], 2, 2)?;
        let mut backend = StubBackend::with_script(vec![
            vec![Detection::new(0.0, 0.0, 1.0, 1.0)],
            vec![
                Detection::new(0.0, 0.0, 1.0, 1.0),
                Detection::new(1.0, 1.0, 2.0, 2.0),
            ],
        ]);

        assert_eq!(backend.detect(&frame)?.len(), 1);
        assert_eq!(backend.detect(&frame)?.len(), 2);
        // Script exhausted: the last entry repeats.
        assert_eq!(backend.detect(&frame)?.len(), 2);
        Ok(())
    }

    #[test]
    fn empty_script_reports_no_colonies() -> Result<()> {
        let frame = Frame::rgb8(vec![0u8; 12], 2, 2)?;
        let mut backend = StubBackend::new();
        assert!(backend.detect(&frame)?.is_empty());
        Ok(())
    }
}
