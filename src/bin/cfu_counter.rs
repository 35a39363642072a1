//! cfu-counter - touchscreen CFU counting kiosk
//!
//! This binary:
//! 1. Loads the kiosk config (file, then environment overrides)
//! 2. Builds the detector backend and warms it up
//! 3. Builds the camera source for the configured device
//! 4. Hands both to the egui event loop as a single controller
//!
//! Startup is fail-fast: a bad config, an unknown backend, or a missing
//! model aborts before the window opens. After that, capture and
//! inference failures are per-cycle and never exit the process.

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::path::PathBuf;

use cfu_counter::{create_backend, CameraSource, Controller, KioskApp, KioskConfig};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Path to the kiosk config file (TOML). Falls back to CFU_CONFIG,
    /// then to cfu-counter.toml in the working directory.
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = KioskConfig::load(args.config.as_deref())?;
    log::info!(
        "camera {} {}x{} @ {} fps, detector '{}'",
        config.camera.device,
        config.camera.width,
        config.camera.height,
        config.camera.target_fps,
        config.detector.backend
    );

    let mut detector = create_backend(&config.detector)?;
    detector.warm_up().with_context(|| {
        format!(
            "warm-up failed for detector backend '{}'",
            detector.name()
        )
    })?;

    let source = CameraSource::new(&config.camera)?;
    let controller = Controller::new(
        Box::new(source),
        detector,
        config.camera.tick_interval(),
    );

    let mut viewport = egui::ViewportBuilder::default()
        .with_inner_size([
            config.display.width as f32,
            config.display.height as f32,
        ])
        .with_resizable(false)
        .with_title("CFU Counter");
    if config.display.fullscreen {
        viewport = viewport.with_fullscreen(true);
    }
    let native_options = eframe::NativeOptions {
        viewport,
        ..Default::default()
    };

    eframe::run_native(
        "CFU Counter",
        native_options,
        Box::new(move |cc| {
            cc.egui_ctx.set_theme(egui::Theme::Dark);
            Ok(Box::new(KioskApp::new(controller)))
        }),
    )
    .map_err(|e| anyhow!("kiosk event loop failed: {e}"))
}
