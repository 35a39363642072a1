//! Kiosk UI shell.
//!
//! Fixed touchscreen layout driven by the egui event loop: the plate video
//! panel, the running colony count, and Start/Stop/Close buttons. Every
//! `update` pass dispatches a due controller tick, re-uploads the video
//! texture when a new rendered frame landed, then draws the layout. The
//! event loop is the only thread, so the controller's state machine is never
//! touched concurrently.

use std::time::Instant;

use egui::{Color32, ColorImage, FontId, RichText, TextureHandle, Vec2};

use crate::controller::{CameraState, Controller};
use crate::render::RenderedFrame;

const COUNT_LABEL_PREFIX: &str = "Number of CFUs";
const STATUS_ERROR_COLOR: Color32 = Color32::from_rgb(220, 80, 80);

/// Actions the widgets of one frame can emit.
enum UiCommand {
    StartCamera,
    StopCamera,
    CloseApp,
}

pub struct KioskApp {
    controller: Controller,
    texture: Option<TextureHandle>,
    uploaded_serial: u64,
    error: Option<String>,
}

impl KioskApp {
    pub fn new(controller: Controller) -> Self {
        Self {
            controller,
            texture: None,
            uploaded_serial: 0,
            error: None,
        }
    }

    /// Upload the latest rendered frame into the display texture when a new
    /// one has landed since the previous pass.
    fn sync_texture(&mut self, ctx: &egui::Context) {
        if self.controller.frame_serial() == self.uploaded_serial {
            return;
        }
        if let Some((rendered, _)) = self.controller.latest() {
            let color_image = rgb_to_color_image(rendered);
            match &mut self.texture {
                Some(tex) => {
                    tex.set(color_image, egui::TextureOptions::default());
                }
                None => {
                    self.texture = Some(ctx.load_texture(
                        "plate_frame",
                        color_image,
                        egui::TextureOptions::default(),
                    ));
                }
            }
            self.uploaded_serial = self.controller.frame_serial();
        }
    }

    fn render_view(&mut self, ctx: &egui::Context) -> Option<UiCommand> {
        let mut command = None;

        egui::CentralPanel::default().show(ctx, |ui| {
            let width = ui.available_width();
            let video_height = ui.available_height() * 0.68;

            match &self.texture {
                Some(texture) => {
                    ui.image((texture.id(), egui::vec2(width, video_height)));
                }
                None => {
                    let message = match self.controller.state() {
                        CameraState::Active => "Waiting for frames...",
                        CameraState::Idle => "Camera Off",
                    };
                    render_placeholder(ui, width, video_height, message);
                }
            }

            ui.add_space(6.0);
            ui.vertical_centered(|ui| {
                ui.label(
                    RichText::new(count_label(self.controller.count()))
                        .font(FontId::proportional(22.0))
                        .color(Color32::WHITE),
                );
                if let Some((text, color)) = self.status_line() {
                    ui.label(
                        RichText::new(text)
                            .font(FontId::proportional(11.0))
                            .color(color),
                    );
                }
            });

            ui.add_space(6.0);
            ui.horizontal(|ui| {
                let button_width = (width - 24.0) / 3.0;
                let button_size = [button_width, 34.0];
                if ui
                    .add_sized(button_size, egui::Button::new("Start Camera"))
                    .clicked()
                {
                    command = Some(UiCommand::StartCamera);
                }
                if ui
                    .add_sized(button_size, egui::Button::new("Stop Camera"))
                    .clicked()
                {
                    command = Some(UiCommand::StopCamera);
                }
                if ui
                    .add_sized(button_size, egui::Button::new("Close App"))
                    .clicked()
                {
                    command = Some(UiCommand::CloseApp);
                }
            });
        });

        command
    }

    /// Status line content: the last start failure, else steady-state
    /// capture info while the camera runs.
    fn status_line(&self) -> Option<(String, Color32)> {
        if let Some(error) = &self.error {
            return Some((error.clone(), STATUS_ERROR_COLOR));
        }
        if self.controller.state() == CameraState::Active {
            let stats = self.controller.source_stats();
            return Some((
                format!("{} ({}x{})", stats.device, stats.width, stats.height),
                Color32::GRAY,
            ));
        }
        None
    }

    fn handle_command(&mut self, ctx: &egui::Context, command: UiCommand) {
        match command {
            UiCommand::StartCamera => match self.controller.start() {
                Ok(()) => {
                    self.error = None;
                    ctx.request_repaint();
                }
                Err(err) => {
                    log::warn!("KioskApp: start failed: {:#}", err);
                    self.error = Some(format!("{:#}", err));
                }
            },
            UiCommand::StopCamera => {
                self.controller.stop();
            }
            UiCommand::CloseApp => {
                self.controller.shutdown();
                ctx.send_viewport_cmd(egui::ViewportCommand::Close);
            }
        }
    }
}

impl eframe::App for KioskApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if self.controller.tick_due(Instant::now()) {
            self.controller.tick();
        }
        self.sync_texture(ctx);

        let command = self.render_view(ctx);
        if let Some(command) = command {
            self.handle_command(ctx, command);
        }

        // While the camera runs, the schedule keeps the loop alive; while
        // idle, input events are the only reason to repaint.
        if self.controller.state() == CameraState::Active {
            ctx.request_repaint_after(self.controller.tick_interval());
        }
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        log::info!("KioskApp: shutting down");
        self.controller.shutdown();
    }
}

/// Text shown under the video panel for a given colony count.
pub fn count_label(count: usize) -> String {
    format!("{}: {}", COUNT_LABEL_PREFIX, count)
}

/// Convert a rendered RGB frame to an egui color image.
pub fn rgb_to_color_image(frame: &RenderedFrame) -> ColorImage {
    let pixels: Vec<Color32> = frame
        .data
        .chunks_exact(3)
        .map(|rgb| Color32::from_rgb(rgb[0], rgb[1], rgb[2]))
        .collect();

    ColorImage {
        size: [frame.width as usize, frame.height as usize],
        pixels,
        source_size: Vec2::new(frame.width as f32, frame.height as f32),
    }
}

fn render_placeholder(ui: &mut egui::Ui, width: f32, height: f32, text: &str) {
    egui::Frame::new()
        .fill(Color32::from_rgb(30, 34, 42))
        .corner_radius(6.0)
        .show(ui, |ui| {
            ui.set_min_size(Vec2::new(width, height));
            ui.vertical_centered(|ui| {
                ui.add_space(height / 2.0 - 14.0);
                ui.label(
                    RichText::new(text)
                        .font(FontId::proportional(18.0))
                        .color(Color32::GRAY),
                );
            });
        });
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_image_preserves_geometry_and_pixels() {
        let rendered = RenderedFrame {
            data: vec![255, 0, 0, 0, 255, 0],
            width: 2,
            height: 1,
        };
        let image = rgb_to_color_image(&rendered);

        assert_eq!(image.size, [2, 1]);
        assert_eq!(image.pixels[0], Color32::from_rgb(255, 0, 0));
        assert_eq!(image.pixels[1], Color32::from_rgb(0, 255, 0));
    }

    #[test]
    fn count_label_spells_out_the_unit() {
        assert_eq!(count_label(0), "Number of CFUs: 0");
        assert_eq!(count_label(42), "Number of CFUs: 42");
    }
}
