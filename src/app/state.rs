use std::path::PathBuf;

use crate::types::{GradeLevel, SessionRecord};

/// Message shown in a modal that the user has to acknowledge
#[derive(Debug, Clone, PartialEq)]
pub struct InfoMessage {
    pub title: String,
    pub body: String,
}

impl InfoMessage {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MessageState {
    pub modal: Option<InfoMessage>,
    pub status: String,
}

#[derive(Debug, Clone)]
pub struct HistoryState {
    pub show_history_panel: bool,
    pub panel_width: f32,
    pub session_names: Vec<String>,
    pub selected_session: Option<SessionRecord>,
    pub session_name_input: String,
    /// Session awaiting delete confirmation
    pub session_to_delete: Option<String>,
}

impl Default for HistoryState {
    fn default() -> Self {
        Self {
            show_history_panel: false,
            panel_width: 300.0,
            session_names: Vec::new(),
            selected_session: None,
            session_name_input: String::new(),
            session_to_delete: None,
        }
    }
}

/// Screen capture of a result view
#[derive(Debug, Clone, Default)]
pub struct CaptureState {
    /// Label for the screenshot we are waiting on
    pub pending: Option<String>,
    pub last_saved: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub messages: MessageState,
    pub history: HistoryState,
    pub capture: CaptureState,
    pub grade_level: GradeLevel,
}

impl AppState {
    pub fn new(grade_level: GradeLevel) -> Self {
        Self {
            messages: MessageState::default(),
            history: HistoryState::default(),
            capture: CaptureState::default(),
            grade_level,
        }
    }

    pub fn show_info(&mut self, title: impl Into<String>, body: impl Into<String>) {
        self.messages.modal = Some(InfoMessage::new(title, body));
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.messages.status = status.into();
    }

    pub fn dismiss_info(&mut self) {
        self.messages.modal = None;
    }
}
