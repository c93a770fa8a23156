use std::time::{Duration, Instant};

use eframe::{egui, Frame};
use log::info;

use super::handlers::{CalibrationHandler, CaptureHandler};
use super::state::AppState;
use crate::config::ConfigManager;
use crate::database::KeyValueStore;
use crate::motion::{load_gravity_offset, GravityCalibrator, GravityCell, MeasurementSession};
use crate::plotter::LivePlot;
use crate::sensor::{ChannelSensorSource, SensorChannel, SensorSource};
use crate::upload::ResultSink;

pub struct FlailMeterApp {
    pub state: AppState,
    pub config: ConfigManager,
    pub source: ChannelSensorSource,
    pub store: Box<dyn KeyValueStore>,
    pub calibrator: GravityCalibrator,
    pub session: MeasurementSession,
    pub plot: LivePlot,
}

impl FlailMeterApp {
    pub fn new(
        config: ConfigManager,
        source: ChannelSensorSource,
        store: Box<dyn KeyValueStore>,
        sink: Box<dyn ResultSink>,
    ) -> Self {
        let app_config = config.get_config().clone();

        let offset = load_gravity_offset(store.as_ref());
        match offset {
            Some(offset) => info!(
                "Loaded gravity offset ({:.3}, {:.3}, {:.3})",
                offset.x, offset.y, offset.z
            ),
            None => info!("No stored gravity offset, calibration required"),
        }
        let gravity = GravityCell::new(offset);

        let calibrator = GravityCalibrator::new(gravity.clone(), app_config.settle_duration());
        let mut session = MeasurementSession::new(app_config.session_options(), gravity, sink);
        *session.user_input_mut() = app_config.default_user_input();

        let mut app = Self {
            state: AppState::new(app_config.measurement.grade_level),
            config,
            source,
            store,
            calibrator,
            session,
            plot: LivePlot::new(app_config.plot.history_len),
        };

        for channel in SensorChannel::ALL {
            app.source.set_update_interval(channel, app_config.update_interval());
        }
        super::handlers::HistoryHandler::refresh(&mut app);

        info!("FlailMeter started, parameter source {:?}", app_config.measurement.parameter_source);
        app
    }

    /// Drain sensor samples into subscribers and advance timers
    fn process_sensors(&mut self) {
        self.source.pump();
        CalibrationHandler::poll(self, Instant::now());

        if self.session.state().is_measuring() {
            let energy = self.session.aggregator().borrow().live().kinetic_energy;
            self.plot.push_energy(energy);
        }
    }
}

impl eframe::App for FlailMeterApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut Frame) {
        ctx.set_visuals(egui::Visuals::light());

        self.process_sensors();

        crate::app::ui::render_status_bar(self, ctx);
        crate::app::ui::render_history_panel(self, ctx);
        crate::app::ui::render_main_panel(self, ctx);
        crate::app::ui::render_info_modal(self, ctx);

        CaptureHandler::handle_screenshots(self, ctx);

        ctx.request_repaint_after(Duration::from_millis(50));
    }
}
