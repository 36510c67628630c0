//! Popup Controller — session state, generation flow, and the download step.

pub mod controller;
pub mod download;
pub mod session;
pub mod status;

pub use controller::PopupController;
pub use session::PopupSession;
