//! Colony detection.
//!
//! A `DetectorBackend` turns one RGB frame into a list of colony bounding
//! boxes. Three backends exist:
//! - `tract`: ONNX model inference (feature: backend-tract)
//! - `blob`: model-free dark-blob heuristic
//! - `stub`: scripted results for tests
//!
//! Backends are selected by name through `create_backend`; the model-backed
//! backend loads its artifact at construction so a missing or invalid model
//! fails fast at startup instead of mid-run.

use anyhow::{anyhow, Result};

mod backend;
mod backends;
mod result;

pub use backend::DetectorBackend;
pub use backends::{BlobBackend, StubBackend};
#[cfg(feature = "backend-tract")]
pub use backends::TractBackend;
pub use result::{non_max_suppress, Detection};

use crate::config::DetectorSettings;

/// Build the configured detector backend.
pub fn create_backend(settings: &DetectorSettings) -> Result<Box<dyn DetectorBackend>> {
    match settings.backend.as_str() {
        "stub" => Ok(Box::new(StubBackend::new())),
        "blob" => Ok(Box::new(BlobBackend::new())),
        "tract" => {
            #[cfg(feature = "backend-tract")]
            {
                Ok(Box::new(TractBackend::new(settings)?))
            }
            #[cfg(not(feature = "backend-tract"))]
            {
                Err(anyhow!(
                    "detector backend 'tract' requires the backend-tract feature"
                ))
            }
        }
        other => Err(anyhow!("unknown detector backend '{}'", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn settings(backend: &str) -> DetectorSettings {
        DetectorSettings {
            backend: backend.to_string(),
            model_path: PathBuf::from("does-not-exist.onnx"),
            input_size: 640,
            confidence_threshold: 0.25,
            iou_threshold: 0.45,
            max_detections: 300,
        }
    }

    #[test]
    fn factory_builds_named_backends() -> Result<()> {
        assert_eq!(create_backend(&settings("stub"))?.name(), "stub");
        assert_eq!(create_backend(&settings("blob"))?.name(), "blob");
        Ok(())
    }

    #[test]
    fn factory_rejects_unknown_backend() {
        assert!(create_backend(&settings("maskrcnn")).is_err());
    }

    #[test]
    fn tract_backend_fails_fast_on_missing_model() {
        // Either the model file is missing (feature on) or the feature is
        // compiled out; both must surface at construction time.
        assert!(create_backend(&settings("tract")).is_err());
    }
}
