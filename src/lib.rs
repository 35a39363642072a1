//! CFU counting kiosk.
//!
//! Captures a live feed of an agar plate, runs colony detection on every
//! scheduled frame, and shows the annotated feed with a running count on a
//! small fixed touchscreen.
//!
//! # Architecture
//!
//! Data flows leaf to root through five parts:
//!
//! - `capture`: frame sources (V4L2 device, looped still image, synthetic scene)
//! - `detect`: detector backends (ONNX via tract, blob heuristic, scripted stub)
//! - `render`: pure overlay pass producing the annotated frame and the count
//! - `controller`: Idle/Active lifecycle plus the per-tick capture/detect/render cycle
//! - `ui`: egui kiosk shell with the video panel, count label, and three buttons
//!
//! Everything runs on the UI event-loop thread. The controller owns the
//! camera and the detector exclusively, so no state is shared across
//! threads and no cycle can interleave with a lifecycle transition.

pub mod capture;
pub mod config;
pub mod controller;
pub mod detect;
pub mod frame;
pub mod render;
pub mod ui;

pub use capture::{CameraSource, FrameSource, SourceStats};
pub use config::{CameraSettings, DetectorSettings, DisplaySettings, KioskConfig};
pub use controller::{CameraState, Controller};
pub use detect::{create_backend, BlobBackend, Detection, DetectorBackend, StubBackend};
#[cfg(feature = "backend-tract")]
pub use detect::TractBackend;
pub use frame::{Frame, PixelFormat};
pub use render::RenderedFrame;
pub use ui::KioskApp;
