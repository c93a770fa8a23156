pub mod calibration;
pub mod capture;
pub mod history;
pub mod measurement;

pub use calibration::CalibrationHandler;
pub use capture::CaptureHandler;
pub use history::HistoryHandler;
pub use measurement::MeasurementHandler;
