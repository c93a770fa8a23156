use log::{error, warn};

use crate::app::app_core::FlailMeterApp;
use crate::database::{HistoryError, SessionHistory};
use crate::types::SaveResult;
use crate::utils::now_millis;

pub struct HistoryHandler;

impl HistoryHandler {
    pub fn refresh(app: &mut FlailMeterApp) {
        match SessionHistory::new(app.store.as_ref()).list() {
            Ok(names) => app.state.history.session_names = names,
            Err(e) => warn!("Failed to list saved sessions: {}", e),
        }
    }

    pub fn save_recording(app: &mut FlailMeterApp) -> SaveResult {
        let samples = app.session.recorded_samples();
        let max_acceleration = app.session.aggregator().borrow().live().max_acceleration;
        let name = app.state.history.session_name_input.trim().to_string();
        let name = (!name.is_empty()).then_some(name.as_str());

        let result = match SessionHistory::new(app.store.as_ref()).save(name, &samples, max_acceleration, now_millis()) {
            Ok(record) => {
                app.session.clear_recording();
                app.state.history.session_name_input.clear();
                let count = record.sample_count();
                SaveResult::success(record.name, count)
            }
            Err(HistoryError::NothingToSave) => {
                app.state.show_info("Nothing to save", "Record some samples first.");
                SaveResult::error(HistoryError::NothingToSave.to_string())
            }
            Err(e) => {
                error!("Failed to save session: {}", e);
                SaveResult::error(e.to_string())
            }
        };

        if result.is_success() {
            let name = result.session_name.as_deref().unwrap_or_default();
            app.state.set_status(format!("Saved '{}' ({} samples)", name, result.samples_saved));
        } else if let Some(e) = &result.error {
            app.state.set_status(format!("Save failed: {}", e));
        }
        Self::refresh(app);
        result
    }

    pub fn delete(app: &mut FlailMeterApp, name: &str) {
        match SessionHistory::new(app.store.as_ref()).delete(name) {
            Ok(true) => {
                app.state.set_status(format!("Deleted '{}'", name));
                if app.state.history.selected_session.as_ref().is_some_and(|s| s.name == name) {
                    app.state.history.selected_session = None;
                }
            }
            Ok(false) => warn!("Saved session '{}' not found", name),
            Err(e) => {
                error!("Failed to delete session '{}': {}", name, e);
                app.state.set_status(format!("Delete failed: {}", e));
            }
        }
        Self::refresh(app);
    }

    pub fn select(app: &mut FlailMeterApp, name: &str) {
        match SessionHistory::new(app.store.as_ref()).load(name) {
            Ok(Some(record)) => app.state.history.selected_session = Some(record),
            Ok(None) => {
                warn!("Saved session '{}' not found", name);
                app.state.history.selected_session = None;
            }
            Err(e) => error!("Failed to load session '{}': {}", name, e),
        }
    }
}
