use std::path::Path;

use crate::models::error::CaptureError;
use crate::models::recording_result::RecordingStats;

/// The work behind each lifecycle step of a `CaptureSession`.
///
/// The session owns the state machine and only calls these in legal states;
/// engines never see an illegal transition. [`PcmEngine`] is the built-in
/// uncompressed engine. A compressed-codec recorder plugs in by implementing
/// this trait around its encoder.
///
/// [`PcmEngine`]: crate::session::pcm_engine::PcmEngine
pub trait RecordingEngine: Send {
    /// Acquire a fresh device (or encoder). Called at construction and reset.
    fn open(&mut self) -> Result<(), CaptureError>;

    /// Whether `open` succeeded and the device is still usable.
    fn is_open(&self) -> bool;

    /// Create the output at `output` and size all buffers.
    fn prepare(&mut self, output: &Path) -> Result<(), CaptureError>;

    fn start(&mut self) -> Result<(), CaptureError>;

    /// Stop capture and finalize the output.
    fn stop(&mut self) -> Result<RecordingStats, CaptureError>;

    /// Close and delete a prepared but never started output.
    fn discard(&mut self);

    /// Release the device. Must be idempotent and must not fail.
    fn release(&mut self);

    /// Peak amplitude since the previous call; resets it to zero.
    fn take_max_amplitude(&self) -> i32;

    fn reset_amplitude(&self);
}
