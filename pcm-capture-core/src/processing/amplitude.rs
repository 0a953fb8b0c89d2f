use std::sync::atomic::{AtomicI32, Ordering};

/// Peak amplitude observed since the last consuming read.
///
/// Shared between the capture callback (which raises the peak) and the
/// session (which takes it). Both sides go through atomics, so a take never
/// loses a peak raised concurrently.
#[derive(Debug, Default)]
pub struct AmplitudeTracker {
    peak: AtomicI32,
}

impl AmplitudeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the running peak with the samples in one device buffer.
    ///
    /// 16-bit samples are signed little-endian pairs; 8-bit samples are
    /// taken byte by byte as signed values, so bytes from 0x80 up never raise
    /// the peak. Only values strictly greater than the current peak replace it.
    pub fn scan(&self, data: &[u8], bits_per_sample: u16) {
        if let Some(buffer_peak) = buffer_peak(data, bits_per_sample) {
            self.peak.fetch_max(buffer_peak, Ordering::AcqRel);
        }
    }

    /// Return the peak since the previous call and reset it to zero.
    pub fn take(&self) -> i32 {
        self.peak.swap(0, Ordering::AcqRel)
    }

    /// Current peak without consuming it.
    pub fn peek(&self) -> i32 {
        self.peak.load(Ordering::Acquire)
    }

    pub fn reset(&self) {
        self.peak.store(0, Ordering::Release);
    }
}

fn buffer_peak(data: &[u8], bits_per_sample: u16) -> Option<i32> {
    if bits_per_sample == 16 {
        data.chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as i32)
            .max()
    } else {
        data.iter().map(|&b| b as i8 as i32).max()
    }
}
