use serde::{Deserialize, Serialize};

use super::error::CaptureError;

/// Capacity of the chunk staging buffer when none is configured (320 KiB).
pub const DEFAULT_CHUNK_CAPACITY: usize = 320 * 1024;

/// Nominal interval between capture notifications.
pub const DEFAULT_NOTIFICATION_INTERVAL_MS: u32 = 120;

/// Which input device a capture session records from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureSource {
    /// The platform's default input device.
    #[default]
    Default,
    /// An input device selected by its platform name.
    Named(String),
}

/// Configuration for a capture session.
///
/// Immutable once a session has been constructed from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub source: CaptureSource,

    /// Sample rate in Hz (default: 44100).
    pub sample_rate: u32,

    /// 1 = mono, 2 = stereo.
    pub channels: u16,

    /// 8 or 16.
    pub bits_per_sample: u16,

    /// Bytes per chunk file emitted by the segmenter.
    pub chunk_capacity: usize,

    /// Target spacing of capture callbacks, before device rounding.
    pub notification_interval_ms: u32,
}

impl CaptureConfig {
    pub fn validate(&self) -> Result<(), CaptureError> {
        if self.sample_rate == 0 {
            return Err(CaptureError::Config("sample rate must be positive".into()));
        }
        if ![1, 2].contains(&self.channels) {
            return Err(CaptureError::Config(format!(
                "unsupported channel count: {}",
                self.channels
            )));
        }
        if ![8, 16].contains(&self.bits_per_sample) {
            return Err(CaptureError::Config(format!(
                "unsupported bits per sample: {}",
                self.bits_per_sample
            )));
        }
        if self.chunk_capacity == 0 {
            return Err(CaptureError::Config("chunk capacity must be positive".into()));
        }
        if self.notification_interval_ms == 0 {
            return Err(CaptureError::Config(
                "notification interval must be positive".into(),
            ));
        }
        Ok(())
    }

    pub fn format(&self) -> PcmFormat {
        PcmFormat {
            sample_rate: self.sample_rate,
            channels: self.channels,
            bits_per_sample: self.bits_per_sample,
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            source: CaptureSource::Default,
            sample_rate: 44100,
            channels: 1,
            bits_per_sample: 16,
            chunk_capacity: DEFAULT_CHUNK_CAPACITY,
            notification_interval_ms: DEFAULT_NOTIFICATION_INTERVAL_MS,
        }
    }
}

/// Sample layout of interleaved linear PCM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PcmFormat {
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
}

impl PcmFormat {
    /// Bytes per sample frame (one sample for every channel).
    pub fn frame_bytes(&self) -> usize {
        self.channels as usize * self.bits_per_sample as usize / 8
    }

    pub fn byte_rate(&self) -> u32 {
        self.sample_rate * self.frame_bytes() as u32
    }
}

/// Buffer sizing negotiated between a config and a device.
///
/// The device buffer holds two notification periods; the session reads one
/// period per callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferLayout {
    pub frame_bytes: usize,
    pub period_frames: usize,
    pub device_buffer_bytes: usize,
}

impl BufferLayout {
    /// Derive the layout for `config`, growing the device buffer to at least
    /// `device_min_bytes` and stretching the period to match.
    pub fn derive(config: &CaptureConfig, device_min_bytes: usize) -> Result<Self, CaptureError> {
        config.validate()?;

        let frame_bytes = config.format().frame_bytes();
        let mut period_frames =
            config.sample_rate as usize * config.notification_interval_ms as usize / 1000;
        let mut device_buffer_bytes = period_frames * 2 * frame_bytes;

        if device_buffer_bytes < device_min_bytes {
            device_buffer_bytes = device_min_bytes;
            period_frames = device_buffer_bytes / (2 * frame_bytes);
            log::warn!("Increasing buffer size to {}", device_buffer_bytes);
        }

        if period_frames == 0 {
            return Err(CaptureError::Config(format!(
                "{} Hz with a {} ms interval yields an empty notification period",
                config.sample_rate, config.notification_interval_ms
            )));
        }

        Ok(Self {
            frame_bytes,
            period_frames,
            device_buffer_bytes,
        })
    }

    /// Bytes delivered to the capture callback per notification.
    pub fn period_bytes(&self) -> usize {
        self.period_frames * self.frame_bytes
    }
}
