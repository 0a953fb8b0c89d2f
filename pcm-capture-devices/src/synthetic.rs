//! Sine-tone capture device.
//!
//! Delivers periods from its own timer thread at the negotiated cadence, so
//! the full session pipeline can run on machines without a microphone.

use std::f64::consts::TAU;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use pcm_capture_core::models::config::{BufferLayout, CaptureConfig, PcmFormat};
use pcm_capture_core::models::error::CaptureError;
use pcm_capture_core::traits::capture_device::{CaptureDevice, DeviceProvider, PeriodCallback};

/// Tone produced by a [`SyntheticProvider`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToneSpec {
    pub frequency_hz: f64,
    /// Fraction of full scale, 0.0 to 1.0.
    pub amplitude: f64,
}

impl Default for ToneSpec {
    fn default() -> Self {
        Self {
            frequency_hz: 440.0,
            amplitude: 0.5,
        }
    }
}

/// Writes interleaved PCM of a continuous sine wave.
#[derive(Debug)]
pub struct ToneGenerator {
    format: PcmFormat,
    tone: ToneSpec,
    phase: f64,
}

impl ToneGenerator {
    pub fn new(format: PcmFormat, tone: ToneSpec) -> Self {
        Self {
            format,
            tone,
            phase: 0.0,
        }
    }

    /// Fill `buf` with whole frames; a trailing partial frame is zeroed.
    pub fn fill(&mut self, buf: &mut [u8]) {
        let frame_bytes = self.format.frame_bytes();
        let sample_bytes = (self.format.bits_per_sample / 8) as usize;
        let step = TAU * self.tone.frequency_hz / self.format.sample_rate as f64;
        let amplitude = self.tone.amplitude.clamp(0.0, 1.0);

        let mut frames = buf.chunks_exact_mut(frame_bytes);
        for frame in &mut frames {
            let value = self.phase.sin() * amplitude;
            for sample in frame.chunks_exact_mut(sample_bytes) {
                if sample_bytes == 2 {
                    let s = (value * i16::MAX as f64).round() as i16;
                    sample.copy_from_slice(&s.to_le_bytes());
                } else {
                    sample[0] = (128.0 + value * 127.0).round() as u8;
                }
            }
            self.phase = (self.phase + step) % TAU;
        }
        frames.into_remainder().fill(0);
    }
}

#[derive(Debug, Clone, Default)]
pub struct SyntheticProvider {
    pub tone: ToneSpec,
    /// Reported device minimum buffer size, in bytes.
    pub min_buffer_bytes: usize,
}

impl SyntheticProvider {
    pub fn new(tone: ToneSpec) -> Self {
        Self {
            tone,
            min_buffer_bytes: 0,
        }
    }
}

impl DeviceProvider for SyntheticProvider {
    type Device = SyntheticDevice;

    fn min_buffer_size(&self, _config: &CaptureConfig) -> Result<usize, CaptureError> {
        Ok(self.min_buffer_bytes)
    }

    fn open(&self, config: &CaptureConfig, layout: &BufferLayout) -> Result<SyntheticDevice, CaptureError> {
        let format = config.format();
        Ok(SyntheticDevice {
            period_bytes: layout.period_bytes(),
            period: Duration::from_secs_f64(layout.period_frames as f64 / format.sample_rate as f64),
            generator: Arc::new(Mutex::new(ToneGenerator::new(format, self.tone))),
            running: Arc::new(AtomicBool::new(false)),
            capture_handle: None,
            released: false,
        })
    }
}

pub struct SyntheticDevice {
    period_bytes: usize,
    period: Duration,
    generator: Arc<Mutex<ToneGenerator>>,
    running: Arc<AtomicBool>,
    capture_handle: Option<thread::JoinHandle<()>>,
    released: bool,
}

impl CaptureDevice for SyntheticDevice {
    fn is_initialized(&self) -> bool {
        !self.released
    }

    fn start(&mut self, on_period: PeriodCallback) -> Result<(), CaptureError> {
        if self.released {
            return Err(CaptureError::Device("synthetic device released".into()));
        }
        if self.running.load(Ordering::SeqCst) {
            return Err(CaptureError::Device("synthetic capture already running".into()));
        }

        self.running.store(true, Ordering::SeqCst);
        let running = Arc::clone(&self.running);
        let generator = Arc::clone(&self.generator);
        let period = self.period;
        let period_bytes = self.period_bytes;

        let handle = thread::Builder::new()
            .name("synthetic-capture".into())
            .spawn(move || {
                let mut buf = vec![0u8; period_bytes];
                loop {
                    thread::sleep(period);
                    if !running.load(Ordering::SeqCst) {
                        break;
                    }
                    generator.lock().fill(&mut buf);
                    on_period(&buf);
                }
            })
            .map_err(|e| {
                self.running.store(false, Ordering::SeqCst);
                CaptureError::Device(format!("failed to spawn capture thread: {}", e))
            })?;

        self.capture_handle = Some(handle);
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, CaptureError> {
        self.generator.lock().fill(buf);
        Ok(buf.len())
    }

    fn stop(&mut self) -> Result<(), CaptureError> {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.capture_handle.take() {
            handle
                .join()
                .map_err(|_| CaptureError::Device("synthetic capture thread panicked".into()))?;
        }
        Ok(())
    }

    fn release(&mut self) {
        if let Err(e) = self.stop() {
            log::warn!("Error stopping synthetic device on release: {}", e);
        }
        self.released = true;
    }
}

impl Drop for SyntheticDevice {
    fn drop(&mut self) {
        self.release();
    }
}
