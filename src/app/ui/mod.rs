pub mod history_panel;
pub mod info_modal;
pub mod main_panel;
pub mod status_bar;

pub use history_panel::render_history_panel;
pub use info_modal::render_info_modal;
pub use main_panel::render_main_panel;
pub use status_bar::render_status_bar;
