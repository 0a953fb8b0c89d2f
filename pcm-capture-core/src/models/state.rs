use std::fmt;

/// Capture session state machine.
///
/// State transitions:
/// ```text
/// initializing → ready → recording → stopped
///       ↑                               │
///       └──────────── reset ────────────┘
///
/// any state ── illegal call / failure ──→ error (terminal)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaptureState {
    Initializing,
    Ready,
    Recording,
    Stopped,
    Error,
}

impl CaptureState {
    pub fn is_recording(&self) -> bool {
        matches!(self, Self::Recording)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error)
    }

    /// `Error` is terminal for the instance, `Stopped` for the recording.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Stopped | Self::Error)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initializing => "initializing",
            Self::Ready => "ready",
            Self::Recording => "recording",
            Self::Stopped => "stopped",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for CaptureState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
