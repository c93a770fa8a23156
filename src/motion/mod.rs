pub mod params;
pub mod aggregator;
pub mod calibration;
pub mod session;

pub use params::{MotionParams, ParameterSource, UserInput};
pub use aggregator::{EnergyLevel, GravityCell, LiveMeasurementState, MotionAggregator, ParamsCell, SharedAggregator};
pub use calibration::{
    load_gravity_offset, save_gravity_offset, CalibrationError, CalibrationStatus, GravityCalibrator, GRAVITY_OFFSET_KEY,
};
pub use session::{MeasurementSession, MeasurementState, SessionOptions, UploadPolicy};

use thiserror::Error;

use crate::sensor::SensorChannel;
use crate::types::FlailType;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    #[error("Calibrate the sensor before measuring")]
    NotCalibrated,

    #[error("The {0} is not available on this device")]
    SensorUnavailable(SensorChannel),

    #[error("Enter a mass and a length greater than zero")]
    InvalidParameters,

    #[error("Cannot {action} while {state}")]
    InvalidTransition { action: &'static str, state: &'static str },

    #[error("No {0} result has been measured")]
    MissingResult(FlailType),
}
