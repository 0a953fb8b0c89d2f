//! Microphone capture through cpal.
//!
//! cpal streams are not `Send`, so each recording builds its stream on a
//! dedicated thread that owns it until `stop`. Backend buffers of whatever
//! size the host delivers are regrouped into session periods by a
//! [`PeriodAssembler`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use parking_lot::Mutex;

use pcm_capture_core::models::config::{BufferLayout, CaptureConfig, CaptureSource};
use pcm_capture_core::models::error::CaptureError;
use pcm_capture_core::traits::capture_device::{CaptureDevice, DeviceProvider, PeriodCallback};

use crate::period_assembler::PeriodAssembler;

/// Names of the host's input devices.
pub fn list_input_devices() -> Result<Vec<String>, CaptureError> {
    let devices = cpal::default_host()
        .input_devices()
        .map_err(|e| CaptureError::Device(format!("failed to enumerate input devices: {}", e)))?;
    Ok(devices.filter_map(|d| d.name().ok()).collect())
}

fn resolve_device(source: &CaptureSource) -> Result<cpal::Device, CaptureError> {
    let host = cpal::default_host();
    match source {
        CaptureSource::Default => host
            .default_input_device()
            .ok_or_else(|| CaptureError::Device("no default input device".into())),
        CaptureSource::Named(name) => host
            .input_devices()
            .map_err(|e| CaptureError::Device(format!("failed to enumerate input devices: {}", e)))?
            .find(|d| d.name().map(|n| n == *name).unwrap_or(false))
            .ok_or_else(|| CaptureError::Device(format!("input device not found: {}", name))),
    }
}

fn sample_format(bits_per_sample: u16) -> cpal::SampleFormat {
    if bits_per_sample == 8 {
        cpal::SampleFormat::U8
    } else {
        cpal::SampleFormat::I16
    }
}

/// Opens the default or a named input device on the default host.
#[derive(Debug, Clone, Default)]
pub struct CpalProvider;

impl DeviceProvider for CpalProvider {
    type Device = CpalInput;

    fn min_buffer_size(&self, config: &CaptureConfig) -> Result<usize, CaptureError> {
        let device = resolve_device(&config.source)?;
        let default = device
            .default_input_config()
            .map_err(|e| CaptureError::Device(format!("no default input config: {}", e)))?;

        Ok(match default.buffer_size() {
            cpal::SupportedBufferSize::Range { min, .. } => *min as usize * config.format().frame_bytes(),
            cpal::SupportedBufferSize::Unknown => 0,
        })
    }

    fn open(&self, config: &CaptureConfig, layout: &BufferLayout) -> Result<CpalInput, CaptureError> {
        let device = resolve_device(&config.source)?;
        let format = sample_format(config.bits_per_sample);
        let rate = cpal::SampleRate(config.sample_rate);

        let supported = device
            .supported_input_configs()
            .map_err(|e| CaptureError::Device(format!("failed to query input configs: {}", e)))?
            .any(|range| {
                range.channels() == config.channels
                    && range.sample_format() == format
                    && range.min_sample_rate() <= rate
                    && rate <= range.max_sample_rate()
            });
        if !supported {
            return Err(CaptureError::Device(format!(
                "{} Hz, {} ch, {:?} not supported by {}",
                config.sample_rate,
                config.channels,
                format,
                device.name().unwrap_or_else(|_| "input device".into())
            )));
        }

        Ok(CpalInput {
            source: config.source.clone(),
            stream_config: cpal::StreamConfig {
                channels: config.channels,
                sample_rate: rate,
                buffer_size: cpal::BufferSize::Default,
            },
            format,
            assembler: Arc::new(Mutex::new(PeriodAssembler::new(layout.period_bytes()))),
            running: Arc::new(AtomicBool::new(false)),
            capture_handle: None,
            released: false,
        })
    }
}

pub struct CpalInput {
    source: CaptureSource,
    stream_config: cpal::StreamConfig,
    format: cpal::SampleFormat,
    assembler: Arc<Mutex<PeriodAssembler>>,
    running: Arc<AtomicBool>,
    capture_handle: Option<thread::JoinHandle<()>>,
    released: bool,
}

impl CaptureDevice for CpalInput {
    fn is_initialized(&self) -> bool {
        !self.released
    }

    fn start(&mut self, on_period: PeriodCallback) -> Result<(), CaptureError> {
        if self.released {
            return Err(CaptureError::Device("input device released".into()));
        }
        if self.running.load(Ordering::SeqCst) {
            return Err(CaptureError::Device("input capture already running".into()));
        }

        self.assembler.lock().clear();
        self.running.store(true, Ordering::SeqCst);

        let (ready_tx, ready_rx) = mpsc::sync_channel(1);
        let running = Arc::clone(&self.running);
        let assembler = Arc::clone(&self.assembler);
        let source = self.source.clone();
        let stream_config = self.stream_config.clone();
        let format = self.format;

        let handle = thread::Builder::new()
            .name("cpal-capture".into())
            .spawn(move || {
                let stream = match open_stream(&source, &stream_config, format, assembler, on_period) {
                    Ok(stream) => stream,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(()));

                while running.load(Ordering::SeqCst) {
                    thread::sleep(Duration::from_millis(20));
                }
                if let Err(e) = stream.pause() {
                    log::debug!("Pausing input stream failed: {}", e);
                }
            })
            .map_err(|e| CaptureError::Device(format!("failed to spawn capture thread: {}", e)))?;

        let started = ready_rx
            .recv()
            .unwrap_or_else(|_| Err(CaptureError::Device("capture thread exited during startup".into())));
        match started {
            Ok(()) => {
                self.capture_handle = Some(handle);
                Ok(())
            }
            Err(e) => {
                self.running.store(false, Ordering::SeqCst);
                let _ = handle.join();
                Err(e)
            }
        }
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, CaptureError> {
        Ok(self.assembler.lock().drain_into(buf))
    }

    fn stop(&mut self) -> Result<(), CaptureError> {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.capture_handle.take() {
            handle
                .join()
                .map_err(|_| CaptureError::Device("capture thread panicked".into()))?;
        }
        Ok(())
    }

    fn release(&mut self) {
        if let Err(e) = self.stop() {
            log::warn!("Error stopping input device on release: {}", e);
        }
        self.released = true;
    }
}

impl Drop for CpalInput {
    fn drop(&mut self) {
        self.release();
    }
}

/// Sample types the session accepts, serialized as little-endian PCM.
trait PcmSample: cpal::SizedSample + Send + 'static {
    fn extend_le(self, out: &mut Vec<u8>);
}

impl PcmSample for i16 {
    fn extend_le(self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_le_bytes());
    }
}

impl PcmSample for u8 {
    fn extend_le(self, out: &mut Vec<u8>) {
        out.push(self);
    }
}

fn open_stream(
    source: &CaptureSource,
    config: &cpal::StreamConfig,
    format: cpal::SampleFormat,
    assembler: Arc<Mutex<PeriodAssembler>>,
    on_period: PeriodCallback,
) -> Result<cpal::Stream, CaptureError> {
    let device = resolve_device(source)?;
    let stream = match format {
        cpal::SampleFormat::U8 => build_stream::<u8>(&device, config, assembler, on_period)?,
        _ => build_stream::<i16>(&device, config, assembler, on_period)?,
    };
    stream
        .play()
        .map_err(|e| CaptureError::Device(format!("failed to start input stream: {}", e)))?;
    Ok(stream)
}

fn build_stream<T: PcmSample>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    assembler: Arc<Mutex<PeriodAssembler>>,
    on_period: PeriodCallback,
) -> Result<cpal::Stream, CaptureError> {
    let mut bytes = Vec::new();
    device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                bytes.clear();
                for &sample in data {
                    sample.extend_le(&mut bytes);
                }
                assembler.lock().push(&bytes, |period| on_period(period));
            },
            |e| log::error!("Input stream error: {}", e),
            None,
        )
        .map_err(|e| CaptureError::Device(format!("failed to build input stream: {}", e)))
}
