use std::time::Instant;

use log::info;

use crate::app::app_core::FlailMeterApp;
use crate::motion::{CalibrationError, CalibrationStatus};

pub struct CalibrationHandler;

impl CalibrationHandler {
    pub fn start(app: &mut FlailMeterApp) {
        match app.calibrator.calibrate(&mut app.source) {
            Ok(()) => app.state.set_status("Hold the device still…"),
            Err(CalibrationError::SensorUnavailable) => {
                app.state.show_info(
                    "Sensor unavailable",
                    "The accelerometer is not available on this device, so it cannot be calibrated.",
                );
            }
            Err(CalibrationError::AlreadyInProgress) => {
                info!("Calibration already running, request ignored");
            }
        }
    }

    pub fn cancel(app: &mut FlailMeterApp) {
        app.calibrator.cancel(&mut app.source);
        app.state.set_status("Calibration cancelled");
    }

    pub fn poll(app: &mut FlailMeterApp, now: Instant) {
        if let CalibrationStatus::Completed(_) = app.calibrator.poll(now, app.store.as_ref()) {
            app.state.set_status("Calibration complete");
            app.state.show_info(
                "Calibration complete",
                "Gravity has been measured. You can start measuring now.",
            );
        }
    }
}
