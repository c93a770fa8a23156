use eframe::egui;

use crate::app::app_core::FlailMeterApp;
use crate::app::handlers::{CaptureHandler, HistoryHandler, MeasurementHandler};
use crate::motion::{EnergyLevel, MeasurementState, ParameterSource};
use crate::types::{GradeLevel, MeasurementResult, PresetCatalog};

pub fn render_main_panel(app: &mut FlailMeterApp, ctx: &egui::Context) {
    egui::CentralPanel::default().show(ctx, |ui| {
        render_mode_controls(app, ui);
        ui.separator();
        ui.add_space(10.0);

        let state = app.session.state();
        match state {
            MeasurementState::Ready | MeasurementState::InfantryReady | MeasurementState::CavalryReady => {
                render_ready(app, ui, state)
            }
            MeasurementState::Measuring
            | MeasurementState::InfantryMeasuring
            | MeasurementState::CavalryMeasuring => render_measuring(app, ui, state),
            MeasurementState::Result | MeasurementState::InfantryResult | MeasurementState::CavalryResult => {
                render_result(app, ui, ctx, state)
            }
            MeasurementState::FinalResult => render_comparison(app, ui, ctx),
        }
    });
}

fn render_mode_controls(app: &mut FlailMeterApp, ui: &mut egui::Ui) {
    let measuring = app.session.state().is_measuring();

    ui.horizontal(|ui| {
        ui.label("Mode:");
        let current = app.session.options().parameter_source;
        for (source, label) in [
            (ParameterSource::Fixed, "Simple"),
            (ParameterSource::UserInput, "Custom flail"),
            (ParameterSource::Preset, "Compare flails"),
        ] {
            let response = ui.add_enabled(!measuring, egui::Button::selectable(current == source, label));
            if response.clicked() && current != source {
                MeasurementHandler::set_parameter_source(app, source);
            }
        }

        ui.separator();
        ui.label("Grade:");
        for grade in [GradeLevel::Elementary, GradeLevel::Secondary] {
            if ui
                .add_enabled(!measuring, egui::Button::selectable(app.state.grade_level == grade, grade.key()))
                .clicked()
            {
                app.state.grade_level = grade;
                app.session.set_grade_level(grade);
            }
        }
    });
}

fn render_ready(app: &mut FlailMeterApp, ui: &mut egui::Ui, state: MeasurementState) {
    match app.session.options().parameter_source {
        ParameterSource::Fixed => {
            let params = app.session.options().fixed_params;
            ui.label(format!("Mass {} kg, length {} m", params.mass, params.total_length));
        }
        ParameterSource::UserInput => {
            let input = app.session.user_input_mut();
            egui::Grid::new("parameter_form").num_columns(2).show(ui, |ui| {
                ui.label("Mass (kg):");
                ui.add(egui::TextEdit::singleline(&mut input.mass).desired_width(80.0));
                ui.end_row();
                ui.label("Total length (m):");
                ui.add(egui::TextEdit::singleline(&mut input.total_length).desired_width(80.0));
                ui.end_row();
            });
        }
        ParameterSource::Preset => {
            if let Some(flail_type) = state.flail_type() {
                let preset = PresetCatalog::get(flail_type);
                ui.heading(preset.name);
                ui.label(preset.description());
                ui.label(format!("Total length {} m", preset.total_length));
            }
        }
    }

    ui.add_space(10.0);
    if ui.button("▶ Start").clicked() {
        MeasurementHandler::start(app);
    }
}

fn render_measuring(app: &mut FlailMeterApp, ui: &mut egui::Ui, state: MeasurementState) {
    let params = app.session.active_params();
    let (live, magnitudes, corrected, dropped) = {
        let aggregator = app.session.aggregator().borrow();
        (
            aggregator.live(),
            aggregator.magnitude_history().clone(),
            (aggregator.latest_corrected(), aggregator.latest_magnitude()),
            aggregator.dropped_samples(),
        )
    };

    ui.horizontal(|ui| {
        if ui.button("⏹ Stop").clicked() {
            MeasurementHandler::stop(app);
        }
        if state == MeasurementState::Measuring {
            let label = if app.session.is_recording() { "⏺ Stop recording" } else { "⏺ Record" };
            if ui.button(label).clicked() {
                MeasurementHandler::toggle_recording(app);
            }
            if app.session.is_recording() {
                ui.label(format!("{} samples", app.session.aggregator().borrow().recorded().len()));
            }
        }
    });
    ui.add_space(8.0);

    egui::Grid::new("live_readings").num_columns(2).show(ui, |ui| {
        ui.label("Angular velocity:");
        ui.label(format!("{:.2} rad/s", live.angular_velocity));
        ui.end_row();
        ui.label("Kinetic energy:");
        ui.label(format!("{:.3} J", live.kinetic_energy));
        ui.end_row();
        ui.label("Max energy:");
        ui.label(format!("{:.3} J", live.max_energy));
        ui.end_row();
        ui.label("Max acceleration:");
        ui.label(format!("{:.2} m/s²", live.max_acceleration));
        ui.end_row();
        if let (Some(v), magnitude) = corrected {
            ui.label("Acceleration magnitude:");
            ui.label(format!("{:.2} m/s²", magnitude));
            ui.end_row();
            ui.label("Acceleration (gravity removed):");
            ui.monospace(format!("{:+7.2} {:+7.2} {:+7.2}", v.x, v.y, v.z));
            ui.end_row();
        }
    });
    if dropped > 0 {
        ui.colored_label(egui::Color32::from_rgb(255, 165, 0), format!("{} invalid samples ignored", dropped));
    }

    ui.add_space(6.0);
    ui.monospace(format!(
        "E = ½ · m · (ω · L)² = ½ · {} · ({:.2} · {})² = {:.3} J",
        params.mass, live.angular_velocity, params.total_length, live.kinetic_energy
    ));
    if app.state.grade_level == GradeLevel::Elementary {
        ui.heading(EnergyLevel::from_energy(live.kinetic_energy).label());
    }

    ui.add_space(8.0);
    app.plot.ui(ui, &magnitudes, &app.config.get_config().plot);
}

fn render_result_grid(ui: &mut egui::Ui, id: &str, result: &MeasurementResult) {
    egui::Grid::new(id).num_columns(2).show(ui, |ui| {
        ui.label("Max energy:");
        ui.strong(format!("{:.3} J", result.max_energy));
        ui.end_row();
        ui.label("Max angular velocity:");
        ui.label(format!("{:.2} rad/s", result.max_angular_velocity));
        ui.end_row();
        ui.label("Max tip speed:");
        ui.label(format!("{:.2} m/s", result.max_tip_speed));
        ui.end_row();
        ui.label("Max acceleration:");
        ui.label(format!("{:.2} m/s²", result.max_acceleration));
        ui.end_row();
    });
}

fn render_result(app: &mut FlailMeterApp, ui: &mut egui::Ui, ctx: &egui::Context, state: MeasurementState) {
    let result = match state.flail_type() {
        Some(flail_type) => app.session.result_for(flail_type),
        None => app.session.last_result(),
    };

    if let Some(flail_type) = state.flail_type() {
        ui.heading(format!("{} result", PresetCatalog::get(flail_type).name));
    } else {
        ui.heading("Result");
    }
    if let Some(result) = result {
        render_result_grid(ui, "result_grid", &result);
        if app.state.grade_level == GradeLevel::Elementary {
            ui.label(EnergyLevel::from_energy(result.max_energy).label());
        }
    }

    if state == MeasurementState::Result && !app.session.recorded_samples().is_empty() {
        ui.add_space(8.0);
        ui.horizontal(|ui| {
            ui.label("Session name:");
            ui.add(
                egui::TextEdit::singleline(&mut app.state.history.session_name_input)
                    .desired_width(160.0)
                    .hint_text("optional"),
            );
            if ui.button("💾 Save recording").clicked() {
                HistoryHandler::save_recording(app);
            }
        });
    }

    ui.add_space(10.0);
    ui.horizontal(|ui| {
        match state {
            MeasurementState::InfantryResult => {
                if ui.button("Next: cavalry flail").clicked() {
                    MeasurementHandler::proceed(app);
                }
            }
            MeasurementState::CavalryResult => {
                if ui.button("Compare").clicked() {
                    MeasurementHandler::finalize(app);
                }
            }
            _ => {}
        }
        if ui.button("↺ Start over").clicked() {
            MeasurementHandler::reset(app);
        }
        if ui.button("📷 Capture").clicked() {
            CaptureHandler::request(app, ctx, state.name());
        }
    });
    render_last_capture(app, ui);
}

fn render_last_capture(app: &FlailMeterApp, ui: &mut egui::Ui) {
    if let Some(path) = &app.state.capture.last_saved {
        ui.weak(format!("Last capture: {}", path.display()));
    }
}

fn render_comparison(app: &mut FlailMeterApp, ui: &mut egui::Ui, ctx: &egui::Context) {
    let Some(comparison) = app.session.comparison() else {
        return;
    };

    ui.heading(format!(
        "The {} flail wins by {:.3} J",
        comparison.winner, comparison.difference
    ));
    ui.add_space(8.0);

    ui.columns(2, |columns| {
        for (column, (flail_type, preset)) in columns.iter_mut().zip(PresetCatalog::all()) {
            column.strong(preset.name);
            render_result_grid(column, flail_type.key(), comparison.result_for(flail_type));
        }
    });

    ui.add_space(10.0);
    ui.horizontal(|ui| {
        if ui.button("↺ Start over").clicked() {
            MeasurementHandler::reset(app);
        }
        if ui.button("📷 Capture").clicked() {
            CaptureHandler::request(app, ctx, "comparison");
        }
    });
    render_last_capture(app, ui);
}
