use eframe::egui;

use crate::app::app_core::FlailMeterApp;

pub fn render_info_modal(app: &mut FlailMeterApp, ctx: &egui::Context) {
    let Some(message) = app.state.messages.modal.clone() else {
        return;
    };

    let mut acknowledged = false;
    let response = egui::Modal::new(egui::Id::new("info_modal")).show(ctx, |ui| {
        ui.set_width(320.0);
        ui.heading(&message.title);
        ui.add_space(8.0);
        ui.label(&message.body);
        ui.add_space(12.0);
        if ui.button("OK").clicked() {
            acknowledged = true;
        }
    });

    if acknowledged || response.should_close() {
        app.state.dismiss_info();
    }
}
