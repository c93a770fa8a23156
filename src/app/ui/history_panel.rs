use eframe::egui;
use egui::Color32;

use crate::app::app_core::FlailMeterApp;
use crate::app::handlers::HistoryHandler;
use crate::plotter::history_plot;
use crate::utils::format_timestamp;

pub fn render_history_panel(app: &mut FlailMeterApp, ctx: &egui::Context) {
    if !app.state.history.show_history_panel {
        return;
    }

    egui::SidePanel::left("history_panel")
        .resizable(true)
        .default_width(app.state.history.panel_width)
        .width_range(250.0..=600.0)
        .show(ctx, |ui| {
            ui.heading("📊 Saved Sessions");
            ui.add_space(10.0);

            render_session_list(app, ui);
            ui.separator();
            ui.add_space(5.0);

            if app.state.history.selected_session.is_some() {
                render_selected_session(app, ui);
            } else {
                ui.centered_and_justified(|ui| {
                    ui.colored_label(Color32::GRAY, "Select a session to view its samples");
                });
            }
        });

    render_delete_confirmation(app, ctx);
}

fn render_delete_confirmation(app: &mut FlailMeterApp, ctx: &egui::Context) {
    let Some(name) = app.state.history.session_to_delete.clone() else {
        return;
    };

    egui::Window::new("Delete session")
        .collapsible(false)
        .resizable(false)
        .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
        .show(ctx, |ui| {
            ui.label(format!("Delete session '{}'?", name));
            ui.add_space(10.0);
            ui.colored_label(Color32::from_rgb(200, 100, 100), "⚠ This cannot be undone");
            ui.add_space(10.0);

            ui.horizontal(|ui| {
                if ui.button("Cancel").clicked() {
                    app.state.history.session_to_delete = None;
                }
                ui.add_space(20.0);
                if ui.button("🗑 Delete").clicked() {
                    app.state.history.session_to_delete = None;
                    HistoryHandler::delete(app, &name);
                }
            });
        });
}

fn render_session_list(app: &mut FlailMeterApp, ui: &mut egui::Ui) {
    ui.horizontal(|ui| {
        ui.label(format!("{} sessions", app.state.history.session_names.len()));
        if ui.button("🔄 Refresh").clicked() {
            HistoryHandler::refresh(app);
        }
    });

    if app.state.history.session_names.is_empty() {
        ui.colored_label(Color32::GRAY, "Record in simple mode and save to build a history");
        return;
    }

    let selected = app.state.history.selected_session.as_ref().map(|s| s.name.clone());
    let mut clicked = None;
    egui::ScrollArea::vertical()
        .id_salt("session_list")
        .max_height(200.0)
        .show(ui, |ui| {
            for name in &app.state.history.session_names {
                let is_selected = selected.as_deref() == Some(name.as_str());
                if ui.selectable_label(is_selected, name).clicked() {
                    clicked = Some(name.clone());
                }
            }
        });

    if let Some(name) = clicked {
        HistoryHandler::select(app, &name);
    }
}

fn render_selected_session(app: &mut FlailMeterApp, ui: &mut egui::Ui) {
    let Some(record) = app.state.history.selected_session.as_ref() else {
        return;
    };

    ui.strong(&record.name);
    egui::Grid::new("session_details").num_columns(2).show(ui, |ui| {
        ui.label("Saved:");
        ui.label(format_timestamp(record.timestamp));
        ui.end_row();
        ui.label("Samples:");
        ui.label(record.sample_count().to_string());
        ui.end_row();
        ui.label("Max acceleration:");
        ui.label(format!("{:.2} m/s²", record.max_acceleration));
        ui.end_row();
    });

    ui.add_space(5.0);
    history_plot(ui, "session_history", &record.raw_samples, &app.config.get_config().plot);

    ui.add_space(5.0);
    ui.horizontal(|ui| {
        if ui.button("Close").clicked() {
            app.state.history.selected_session = None;
        }
        if ui.button("🗑 Delete").clicked() {
            app.state.history.session_to_delete = app.state.history.selected_session.as_ref().map(|s| s.name.clone());
        }
    });
}
