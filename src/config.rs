use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_CONFIG_FILE: &str = "cfu-counter.toml";

const DEFAULT_CAMERA_DEVICE: &str = "/dev/video0";
const DEFAULT_CAMERA_WIDTH: u32 = 640;
const DEFAULT_CAMERA_HEIGHT: u32 = 480;
const DEFAULT_CAMERA_FPS: u32 = 10;
const DEFAULT_WARMUP_MS: u64 = 2_000;

const DEFAULT_DETECTOR_BACKEND: &str = "blob";
const DEFAULT_MODEL_PATH: &str = "best.onnx";
const DEFAULT_MODEL_INPUT_SIZE: u32 = 640;
const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.25;
const DEFAULT_IOU_THRESHOLD: f32 = 0.45;
const DEFAULT_MAX_DETECTIONS: usize = 300;

const DEFAULT_DISPLAY_WIDTH: u32 = 480;
const DEFAULT_DISPLAY_HEIGHT: u32 = 320;

/// Backend names accepted by `[detector] backend`.
pub const KNOWN_BACKENDS: &[&str] = &["stub", "blob", "tract"];

#[derive(Debug, Deserialize, Default)]
struct KioskConfigFile {
    camera: Option<CameraConfigFile>,
    detector: Option<DetectorConfigFile>,
    display: Option<DisplayConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct CameraConfigFile {
    device: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    target_fps: Option<u32>,
    warmup_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct DetectorConfigFile {
    backend: Option<String>,
    model_path: Option<PathBuf>,
    input_size: Option<u32>,
    confidence_threshold: Option<f32>,
    iou_threshold: Option<f32>,
    max_detections: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
struct DisplayConfigFile {
    width: Option<u32>,
    height: Option<u32>,
    fullscreen: Option<bool>,
}

/// Resolved kiosk configuration: defaults, overridden by an optional TOML
/// file, overridden by environment variables, then validated.
#[derive(Debug, Clone)]
pub struct KioskConfig {
    pub camera: CameraSettings,
    pub detector: DetectorSettings,
    pub display: DisplaySettings,
}

#[derive(Debug, Clone)]
pub struct CameraSettings {
    /// Device path: a V4L2 node, `stub://` for the synthetic scene, or
    /// `still://<image>` to loop a photo from disk.
    pub device: String,
    pub width: u32,
    pub height: u32,
    pub target_fps: u32,
    /// Post-acquisition settle time; frames are discarded during warm-up.
    pub warmup_ms: u64,
}

#[derive(Debug, Clone)]
pub struct DetectorSettings {
    pub backend: String,
    pub model_path: PathBuf,
    /// Square model input edge in pixels.
    pub input_size: u32,
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
    pub max_detections: usize,
}

#[derive(Debug, Clone)]
pub struct DisplaySettings {
    pub width: u32,
    pub height: u32,
    pub fullscreen: bool,
}

impl CameraSettings {
    /// Interval between scheduled capture cycles.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(u64::from(1000 / self.target_fps.max(1)))
    }

    pub fn warmup(&self) -> Duration {
        Duration::from_millis(self.warmup_ms)
    }
}

impl KioskConfig {
    /// Load configuration.
    ///
    /// Path precedence: explicit path argument, then `CFU_CONFIG`, then
    /// `cfu-counter.toml` in the working directory when present. Environment
    /// overrides are applied after the file, then the result is validated.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let env_path = std::env::var("CFU_CONFIG").ok().map(PathBuf::from);
        let path = config_path
            .map(Path::to_path_buf)
            .or(env_path)
            .or_else(|| {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                default.exists().then_some(default)
            });
        let file_cfg = match path.as_deref() {
            Some(path) => Some(read_config_file(path)?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: KioskConfigFile) -> Self {
        let camera = CameraSettings {
            device: file
                .camera
                .as_ref()
                .and_then(|camera| camera.device.clone())
                .unwrap_or_else(|| DEFAULT_CAMERA_DEVICE.to_string()),
            width: file
                .camera
                .as_ref()
                .and_then(|camera| camera.width)
                .unwrap_or(DEFAULT_CAMERA_WIDTH),
            height: file
                .camera
                .as_ref()
                .and_then(|camera| camera.height)
                .unwrap_or(DEFAULT_CAMERA_HEIGHT),
            target_fps: file
                .camera
                .as_ref()
                .and_then(|camera| camera.target_fps)
                .unwrap_or(DEFAULT_CAMERA_FPS),
            warmup_ms: file
                .camera
                .as_ref()
                .and_then(|camera| camera.warmup_ms)
                .unwrap_or(DEFAULT_WARMUP_MS),
        };
        let detector = DetectorSettings {
            backend: file
                .detector
                .as_ref()
                .and_then(|detector| detector.backend.clone())
                .unwrap_or_else(|| DEFAULT_DETECTOR_BACKEND.to_string()),
            model_path: file
                .detector
                .as_ref()
                .and_then(|detector| detector.model_path.clone())
                .unwrap_or_else(|| PathBuf::from(DEFAULT_MODEL_PATH)),
            input_size: file
                .detector
                .as_ref()
                .and_then(|detector| detector.input_size)
                .unwrap_or(DEFAULT_MODEL_INPUT_SIZE),
            confidence_threshold: file
                .detector
                .as_ref()
                .and_then(|detector| detector.confidence_threshold)
                .unwrap_or(DEFAULT_CONFIDENCE_THRESHOLD),
            iou_threshold: file
                .detector
                .as_ref()
                .and_then(|detector| detector.iou_threshold)
                .unwrap_or(DEFAULT_IOU_THRESHOLD),
            max_detections: file
                .detector
                .as_ref()
                .and_then(|detector| detector.max_detections)
                .unwrap_or(DEFAULT_MAX_DETECTIONS),
        };
        let display = DisplaySettings {
            width: file
                .display
                .as_ref()
                .and_then(|display| display.width)
                .unwrap_or(DEFAULT_DISPLAY_WIDTH),
            height: file
                .display
                .as_ref()
                .and_then(|display| display.height)
                .unwrap_or(DEFAULT_DISPLAY_HEIGHT),
            fullscreen: file
                .display
                .and_then(|display| display.fullscreen)
                .unwrap_or(false),
        };
        Self {
            camera,
            detector,
            display,
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(device) = std::env::var("CFU_CAMERA_DEVICE") {
            if !device.trim().is_empty() {
                self.camera.device = device;
            }
        }
        if let Ok(fps) = std::env::var("CFU_CAMERA_FPS") {
            let fps: u32 = fps
                .parse()
                .map_err(|_| anyhow!("CFU_CAMERA_FPS must be an integer frame rate"))?;
            self.camera.target_fps = fps;
        }
        if let Ok(backend) = std::env::var("CFU_DETECTOR_BACKEND") {
            if !backend.trim().is_empty() {
                self.detector.backend = backend;
            }
        }
        if let Ok(path) = std::env::var("CFU_MODEL_PATH") {
            if !path.trim().is_empty() {
                self.detector.model_path = PathBuf::from(path);
            }
        }
        Ok(())
    }

    fn validate(&mut self) -> Result<()> {
        if self.camera.width == 0 || self.camera.height == 0 {
            return Err(anyhow!("camera resolution must be non-zero"));
        }
        if self.camera.target_fps == 0 {
            return Err(anyhow!("camera target_fps must be greater than zero"));
        }
        self.detector.backend = self.detector.backend.to_lowercase();
        if !KNOWN_BACKENDS.contains(&self.detector.backend.as_str()) {
            return Err(anyhow!(
                "unknown detector backend '{}' (expected one of: {})",
                self.detector.backend,
                KNOWN_BACKENDS.join(", ")
            ));
        }
        if self.detector.input_size == 0 {
            return Err(anyhow!("detector input_size must be greater than zero"));
        }
        if !(0.0..=1.0).contains(&self.detector.confidence_threshold) {
            return Err(anyhow!("confidence_threshold must be within 0.0..=1.0"));
        }
        if !(0.0..=1.0).contains(&self.detector.iou_threshold) {
            return Err(anyhow!("iou_threshold must be within 0.0..=1.0"));
        }
        if self.detector.max_detections == 0 {
            return Err(anyhow!("max_detections must be greater than zero"));
        }
        if self.display.width == 0 || self.display.height == 0 {
            return Err(anyhow!("display resolution must be non-zero"));
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<KioskConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = toml::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}
