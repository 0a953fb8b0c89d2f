use std::sync::Arc;

use crate::models::config::{BufferLayout, CaptureConfig};
use crate::models::error::CaptureError;

/// Callback invoked once per notification period.
///
/// Receives exactly one period (`BufferLayout::period_bytes`) of interleaved
/// little-endian PCM in the configured format. Runs on the device's own
/// thread; implementations of [`CaptureDevice`] must not hold any lock the
/// session could wait on while calling it.
pub type PeriodCallback = Arc<dyn Fn(&[u8]) + Send + Sync + 'static>;

/// Factory for platform capture devices.
///
/// Called once when a session is constructed and again on every `reset`, so
/// each recording gets a fresh device handle.
pub trait DeviceProvider: Send {
    type Device: CaptureDevice;

    /// Smallest legal device buffer, in bytes, for `config`'s rate, channel
    /// count and sample width.
    fn min_buffer_size(&self, config: &CaptureConfig) -> Result<usize, CaptureError>;

    /// Open a device that will deliver `layout.period_frames` frames per
    /// notification.
    fn open(&self, config: &CaptureConfig, layout: &BufferLayout) -> Result<Self::Device, CaptureError>;
}

/// A single opened capture device.
pub trait CaptureDevice: Send {
    /// Whether the platform accepted the device configuration.
    fn is_initialized(&self) -> bool;

    /// Begin capture, delivering each period to `on_period`.
    fn start(&mut self, on_period: PeriodCallback) -> Result<(), CaptureError>;

    /// Synchronously read up to `buf.len()` bytes. Returns the number read.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, CaptureError>;

    /// Stop capture. No callback is running or will run once this returns.
    fn stop(&mut self) -> Result<(), CaptureError>;

    /// Release platform resources. The device is unusable afterwards.
    fn release(&mut self);
}
