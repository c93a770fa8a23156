use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use eframe::egui;
use log::{error, info};

use crate::app::app_core::FlailMeterApp;
use crate::utils::now_millis;

pub struct CaptureHandler;

impl CaptureHandler {
    /// Ask the viewport for a screenshot; it arrives as an input event next frame
    pub fn request(app: &mut FlailMeterApp, ctx: &egui::Context, label: &str) {
        if app.state.capture.pending.is_some() {
            return;
        }
        app.state.capture.pending = Some(label.to_string());
        ctx.send_viewport_cmd(egui::ViewportCommand::Screenshot(egui::UserData::default()));
    }

    pub fn handle_screenshots(app: &mut FlailMeterApp, ctx: &egui::Context) {
        let screenshots: Vec<Arc<egui::ColorImage>> = ctx.input(|i| {
            i.raw
                .events
                .iter()
                .filter_map(|event| match event {
                    egui::Event::Screenshot { image, .. } => Some(Arc::clone(image)),
                    _ => None,
                })
                .collect()
        });

        for screenshot in screenshots {
            let Some(label) = app.state.capture.pending.take() else {
                continue;
            };
            let directory = app.config.get_config().get_capture_directory();
            match save_png(&directory, &label, &screenshot) {
                Ok(path) => {
                    info!("Saved capture to {}", path.display());
                    app.state.set_status(format!("Saved {}", path.display()));
                    app.state.capture.last_saved = Some(path);
                }
                Err(e) => {
                    error!("Failed to save capture: {}", e);
                    app.state.show_info("Capture failed", e.to_string());
                }
            }
        }
    }
}

fn capture_file_name(label: &str, timestamp_ms: i64) -> String {
    let label: String = label
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect();
    format!("{}_{}.png", label, timestamp_ms)
}

fn save_png(directory: &Path, label: &str, screenshot: &egui::ColorImage) -> Result<PathBuf, Box<dyn std::error::Error>> {
    fs::create_dir_all(directory)?;
    let path = directory.join(capture_file_name(label, now_millis()));
    let [width, height] = screenshot.size;
    let rgba: Vec<u8> = screenshot.pixels.iter().flat_map(|pixel| pixel.to_array()).collect();
    image::save_buffer(
        &path,
        &rgba,
        width as u32,
        height as u32,
        image::ColorType::Rgba8,
    )?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_names_are_sanitized() {
        assert_eq!(capture_file_name("Final Result", 42), "final_result_42.png");
    }

    #[test]
    fn screenshot_is_written_as_png() {
        let dir = tempfile::tempdir().unwrap();
        let screenshot = egui::ColorImage::from_rgba_unmultiplied([4, 2], &[200u8; 32]);
        let path = save_png(dir.path(), "result", &screenshot).unwrap();
        assert!(path.exists());
        assert_eq!(image::image_dimensions(&path).unwrap(), (4, 2));
    }
}
