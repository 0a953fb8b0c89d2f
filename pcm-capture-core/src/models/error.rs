use thiserror::Error;

use super::state::CaptureState;

/// Errors that can occur during audio capture operations.
///
/// Session methods never return these directly. A failing operation moves the
/// session to [`CaptureState::Error`] and the cause is kept in
/// `CaptureSession::last_error`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("invalid capture configuration: {0}")]
    Config(String),

    #[error("audio device error: {0}")]
    Device(String),

    #[error("i/o error: {0}")]
    Io(String),

    #[error("{operation}() called in {state} state")]
    IllegalState {
        operation: &'static str,
        state: CaptureState,
    },

    #[error("encoder error: {0}")]
    Encoder(String),
}

impl From<std::io::Error> for CaptureError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
