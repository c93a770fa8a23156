use log::warn;

use crate::app::app_core::FlailMeterApp;
use crate::motion::{ParameterSource, SessionError};
use crate::utils::now_millis;

pub struct MeasurementHandler;

impl MeasurementHandler {
    pub fn start(app: &mut FlailMeterApp) {
        app.plot.clear();
        match app.session.start(&mut app.source) {
            Ok(()) => app.state.set_status("Measuring… swing the flail"),
            Err(e) => Self::report(app, e),
        }
    }

    pub fn stop(app: &mut FlailMeterApp) {
        if let Some(result) = app.session.stop(&mut app.source, now_millis()) {
            app.state
                .set_status(format!("Max energy {:.3} J", result.max_energy));
        }
    }

    pub fn proceed(app: &mut FlailMeterApp) {
        app.plot.clear();
        if let Err(e) = app.session.proceed() {
            Self::report(app, e);
        }
    }

    pub fn finalize(app: &mut FlailMeterApp) {
        match app.session.finalize() {
            Ok(comparison) => app.state.set_status(format!(
                "{} flail wins by {:.3} J",
                comparison.winner, comparison.difference
            )),
            Err(e) => Self::report(app, e),
        }
    }

    pub fn reset(app: &mut FlailMeterApp) {
        app.plot.clear();
        app.session.reset(&mut app.source);
        app.state.set_status("");
    }

    pub fn set_parameter_source(app: &mut FlailMeterApp, parameter_source: ParameterSource) {
        app.plot.clear();
        app.session.set_parameter_source(&mut app.source, parameter_source);
        app.config.get_config_mut().measurement.parameter_source = parameter_source;
        if let Err(e) = app.config.save() {
            warn!("Failed to persist parameter source: {}", e);
        }
    }

    pub fn toggle_recording(app: &mut FlailMeterApp) {
        let enable = !app.session.is_recording();
        if let Err(e) = app.session.set_recording(enable) {
            Self::report(app, e);
        }
    }

    /// Precondition and capability errors need acknowledgement; the rest
    /// are programming slips and only logged.
    fn report(app: &mut FlailMeterApp, error: SessionError) {
        match error {
            SessionError::NotCalibrated => app.state.show_info("Calibration needed", error.to_string()),
            SessionError::SensorUnavailable(_) => app.state.show_info("Sensor unavailable", error.to_string()),
            SessionError::InvalidParameters => app.state.show_info("Check the values", error.to_string()),
            SessionError::InvalidTransition { .. } | SessionError::MissingResult(_) => {
                warn!("Measurement action rejected: {}", error);
                app.state.set_status(error.to_string());
            }
        }
    }
}
