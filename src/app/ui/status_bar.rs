use std::time::Instant;

use eframe::egui;

use crate::app::app_core::FlailMeterApp;
use crate::app::handlers::{CalibrationHandler, HistoryHandler};
use crate::sensor::{SensorChannel, SensorSource};
use crate::utils::format_timestamp;

pub fn render_status_bar(app: &mut FlailMeterApp, ctx: &egui::Context) {
    egui::TopBottomPanel::top("status_bar")
        .min_height(40.0)
        .show(ctx, |ui| {
            ui.add_space(5.0);
            ui.horizontal(|ui| {
                ui.label("State:");
                let state = app.session.state();
                let color = if state.is_measuring() {
                    egui::Color32::from_rgb(0, 150, 0)
                } else if state.is_ready() {
                    egui::Color32::from_rgb(0, 100, 200)
                } else {
                    egui::Color32::from_rgb(120, 120, 120)
                };
                ui.colored_label(color, state.name());

                ui.separator();
                render_calibration(app, ui);

                ui.separator();
                for channel in SensorChannel::ALL {
                    let available = app.source.is_available(channel);
                    let (mark, color) = if available {
                        ("●", egui::Color32::from_rgb(0, 150, 0))
                    } else {
                        ("○", egui::Color32::from_rgb(150, 0, 0))
                    };
                    let last = match app.source.last_timestamp(channel) {
                        Some(ts) => format_timestamp(ts),
                        None => "never".to_string(),
                    };
                    ui.colored_label(color, format!("{} {} ({})", mark, channel, app.source.received(channel)))
                        .on_hover_text(format!("Last sample: {}", last));
                }

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    let history_button_text = if app.state.history.show_history_panel {
                        "📊 Hide History"
                    } else {
                        "📊 Show History"
                    };
                    if ui.button(history_button_text).clicked() {
                        app.state.history.show_history_panel = !app.state.history.show_history_panel;
                        if app.state.history.show_history_panel {
                            HistoryHandler::refresh(app);
                        }
                    }

                    if !app.state.messages.status.is_empty() {
                        ui.colored_label(egui::Color32::from_rgb(0, 100, 200), &app.state.messages.status);
                    }
                });
            });
            ui.add_space(5.0);
        });
}

fn render_calibration(app: &mut FlailMeterApp, ui: &mut egui::Ui) {
    if app.calibrator.is_pending() {
        match app.calibrator.progress(Instant::now()) {
            Some(progress) => {
                ui.label("Calibrating…");
                ui.add(egui::ProgressBar::new(progress).desired_width(150.0));
            }
            None => {
                ui.label("Waiting for a resting sample…");
            }
        }
        if ui.button("Cancel").clicked() {
            CalibrationHandler::cancel(app);
        }
        return;
    }

    let calibrated = app.calibrator.gravity().is_calibrated();
    if calibrated {
        ui.colored_label(egui::Color32::from_rgb(0, 150, 0), "Calibrated");
    } else {
        ui.colored_label(egui::Color32::from_rgb(255, 165, 0), "Not calibrated");
    }

    let measuring = app.session.state().is_measuring();
    let label = if calibrated { "Recalibrate" } else { "Calibrate" };
    if ui.add_enabled(!measuring, egui::Button::new(label)).clicked() {
        CalibrationHandler::start(app);
    }
}
