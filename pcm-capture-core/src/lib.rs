//! # pcm-capture-core
//!
//! Platform-agnostic microphone capture core.
//!
//! A [`CaptureSession`] drives a capture device through a fixed lifecycle,
//! streams raw PCM into a WAV container, cuts the same stream into
//! fixed-size chunk files for incremental upload, and tracks the peak
//! amplitude for level meters. Platform backends implement
//! [`DeviceProvider`] and [`CaptureDevice`] and plug into [`PcmEngine`].
//!
//! ## Architecture
//!
//! ```text
//! pcm-capture-core (this crate)
//! ├── traits/       ← DeviceProvider, CaptureDevice, RecordingEngine, ChunkObserver
//! ├── models/       ← CaptureError, CaptureState, CaptureConfig, BufferLayout, ChunkFile
//! ├── processing/   ← ChunkSegmenter, AmplitudeTracker, WAV header generation
//! ├── session/      ← CaptureSession (state machine), PcmEngine
//! └── storage/      ← ContainerWriter, metadata sidecar
//! ```

pub mod models;
pub mod processing;
pub mod session;
pub mod storage;
pub mod traits;

#[cfg(test)]
mod testing;

// Re-export key types at crate root for convenience.
pub use models::audio_models::{CaptureDiagnostics, ChunkFile};
pub use models::config::{BufferLayout, CaptureConfig, CaptureSource, PcmFormat};
pub use models::error::CaptureError;
pub use models::recording_result::{RecordingStats, RecordingSummary};
pub use models::state::CaptureState;
pub use processing::amplitude::AmplitudeTracker;
pub use processing::chunk_segmenter::ChunkSegmenter;
pub use session::capture_session::{CaptureSession, FALLBACK_SAMPLE_RATES};
pub use session::pcm_engine::PcmEngine;
pub use storage::container_writer::ContainerWriter;
pub use traits::capture_device::{CaptureDevice, DeviceProvider, PeriodCallback};
pub use traits::chunk_observer::ChunkObserver;
pub use traits::recording_engine::RecordingEngine;
