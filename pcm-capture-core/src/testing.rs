//! Hand-driven capture device for session tests.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::config::{BufferLayout, CaptureConfig};
use crate::models::error::CaptureError;
use crate::traits::capture_device::{CaptureDevice, DeviceProvider, PeriodCallback};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Calls made against every device a [`ManualProvider`] has opened.
#[derive(Debug, Clone, Default)]
pub struct DeviceLog {
    pub opened: u32,
    pub started: u32,
    pub stopped: u32,
    pub released: u32,
    pub priming_reads: u32,
    pub last_layout: Option<BufferLayout>,
}

#[derive(Clone, Default)]
pub struct ManualProvider {
    min_buffer_bytes: usize,
    max_sample_rate: Option<u32>,
    fail_open: bool,
    log: Arc<Mutex<DeviceLog>>,
    callback: Arc<Mutex<Option<PeriodCallback>>>,
}

impl ManualProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// A provider whose devices never open.
    pub fn failing() -> Self {
        Self {
            fail_open: true,
            ..Self::default()
        }
    }

    pub fn with_min_buffer(min_buffer_bytes: usize) -> Self {
        Self {
            min_buffer_bytes,
            ..Self::default()
        }
    }

    /// A provider that rejects sample rates above `max_sample_rate`.
    pub fn with_max_rate(max_sample_rate: u32) -> Self {
        Self {
            max_sample_rate: Some(max_sample_rate),
            ..Self::default()
        }
    }

    pub fn log(&self) -> DeviceLog {
        self.log.lock().clone()
    }

    /// Deliver one period to the running device. Returns false when no
    /// device is capturing.
    pub fn tick(&self, data: &[u8]) -> bool {
        let callback = self.callback.lock().clone();
        match callback {
            Some(callback) => {
                callback(data);
                true
            }
            None => false,
        }
    }
}

impl DeviceProvider for ManualProvider {
    type Device = ManualDevice;

    fn min_buffer_size(&self, _config: &CaptureConfig) -> Result<usize, CaptureError> {
        Ok(self.min_buffer_bytes)
    }

    fn open(&self, config: &CaptureConfig, layout: &BufferLayout) -> Result<ManualDevice, CaptureError> {
        if self.fail_open {
            return Err(CaptureError::Device("no input device".into()));
        }
        if let Some(max) = self.max_sample_rate {
            if config.sample_rate > max {
                return Err(CaptureError::Device(format!("{} Hz not supported", config.sample_rate)));
            }
        }

        let mut log = self.log.lock();
        log.opened += 1;
        log.last_layout = Some(*layout);
        Ok(ManualDevice {
            log: Arc::clone(&self.log),
            callback: Arc::clone(&self.callback),
            released: false,
        })
    }
}

pub struct ManualDevice {
    log: Arc<Mutex<DeviceLog>>,
    callback: Arc<Mutex<Option<PeriodCallback>>>,
    released: bool,
}

impl CaptureDevice for ManualDevice {
    fn is_initialized(&self) -> bool {
        !self.released
    }

    fn start(&mut self, on_period: PeriodCallback) -> Result<(), CaptureError> {
        if self.released {
            return Err(CaptureError::Device("device released".into()));
        }
        *self.callback.lock() = Some(on_period);
        self.log.lock().started += 1;
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, CaptureError> {
        buf.fill(0x55);
        self.log.lock().priming_reads += 1;
        Ok(buf.len())
    }

    fn stop(&mut self) -> Result<(), CaptureError> {
        *self.callback.lock() = None;
        self.log.lock().stopped += 1;
        Ok(())
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            *self.callback.lock() = None;
            self.log.lock().released += 1;
        }
    }
}
