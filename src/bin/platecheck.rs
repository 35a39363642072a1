//! platecheck - one-shot colony count for a stored plate photo
//!
//! Runs the configured detector over a single image without opening the
//! kiosk UI. Useful for validating a model against archived plates and
//! for smoke-testing a device before it ships.

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use image::GenericImageView;
use serde::Serialize;
use std::path::PathBuf;

use cfu_counter::render::render;
use cfu_counter::{create_backend, Detection, Frame, KioskConfig};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Plate photo to analyze (JPEG or PNG).
    image: PathBuf,
    /// Path to the kiosk config file (TOML).
    #[arg(long)]
    config: Option<PathBuf>,
    /// Detector backend override (stub|blob|tract).
    #[arg(long)]
    backend: Option<String>,
    /// Write the annotated frame to this path (format from extension).
    #[arg(long)]
    out: Option<PathBuf>,
    /// Write a JSON report (count plus boxes) to this path.
    #[arg(long)]
    report: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct PlateReport {
    image: String,
    backend: String,
    count: usize,
    detections: Vec<Detection>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut config = KioskConfig::load(args.config.as_deref())?;
    if let Some(backend) = &args.backend {
        config.detector.backend = backend.to_lowercase();
    }

    let mut detector = create_backend(&config.detector)?;
    detector.warm_up().with_context(|| {
        format!(
            "warm-up failed for detector backend '{}'",
            detector.name()
        )
    })?;

    let decoded = image::open(&args.image)
        .with_context(|| format!("failed to open image {}", args.image.display()))?;
    let (width, height) = decoded.dimensions();
    let frame = Frame::rgb8(decoded.into_rgb8().into_raw(), width, height)?;

    let detections = detector.detect(&frame)?;
    let (rendered, count) = render(&frame, &detections);
    println!("{}: {} colonies", args.image.display(), count);

    if let Some(out) = &args.out {
        let annotated =
            image::RgbImage::from_raw(rendered.width, rendered.height, rendered.data)
                .ok_or_else(|| anyhow!("annotated frame has inconsistent dimensions"))?;
        annotated
            .save(out)
            .with_context(|| format!("failed to write {}", out.display()))?;
        println!("annotated image written to {}", out.display());
    }

    if let Some(report_path) = &args.report {
        let report = PlateReport {
            image: args.image.display().to_string(),
            backend: detector.name().to_string(),
            count,
            detections,
        };
        let json = serde_json::to_vec_pretty(&report)?;
        std::fs::write(report_path, json)
            .with_context(|| format!("failed to write {}", report_path.display()))?;
        println!("report written to {}", report_path.display());
    }

    Ok(())
}
