use crate::window::WindowId;

/// Errors surfaced by the toolkit core.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unable to open the display: {0}")]
    DisplayUnavailable(String),

    #[error("unable to create window: {0}")]
    WindowCreation(String),

    #[error("unknown window {0}")]
    UnknownWindow(WindowId),

    #[error("backend error: {0}")]
    Backend(String),
}

pub type Result<T> = std::result::Result<T, Error>;
