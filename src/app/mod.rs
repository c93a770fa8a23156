pub mod app_core;
pub mod handlers;
pub mod state;
pub mod ui;

pub use app_core::FlailMeterApp;
