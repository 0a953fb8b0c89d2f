use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::audio_models::{CaptureDiagnostics, ChunkFile};
use crate::models::config::{BufferLayout, CaptureConfig};
use crate::models::error::CaptureError;
use crate::models::recording_result::RecordingStats;
use crate::processing::amplitude::AmplitudeTracker;
use crate::processing::chunk_segmenter::{Appended, ChunkSegmenter};
use crate::storage::container_writer::ContainerWriter;
use crate::traits::capture_device::{CaptureDevice, DeviceProvider, PeriodCallback};
use crate::traits::chunk_observer::ChunkObserver;
use crate::traits::recording_engine::RecordingEngine;

/// Per-recording state touched by the capture callback.
#[derive(Default)]
struct Pipeline {
    writer: Option<ContainerWriter>,
    segmenter: Option<ChunkSegmenter>,
    observers: Vec<Arc<dyn ChunkObserver>>,
    diagnostics: CaptureDiagnostics,
}

impl Pipeline {
    /// Route one period through the segmenter and the container.
    ///
    /// Returns the chunks completed by this period and the observers to tell,
    /// so notification can happen after the lock is released.
    fn process_period(&mut self, data: &[u8]) -> (Vec<ChunkFile>, Vec<Arc<dyn ChunkObserver>>) {
        self.diagnostics.callback_count += 1;

        let Appended { chunks, failures } = match self.segmenter.as_mut() {
            Some(segmenter) => segmenter.append(data),
            None => Appended::default(),
        };
        for e in &failures {
            log::error!("Failed to write chunk: {}", e);
        }
        self.diagnostics.chunks_emitted += chunks.len() as u64;
        self.diagnostics.chunk_failures += failures.len() as u64;

        // A failed append is logged and counted; the recording continues.
        match self.writer.as_mut() {
            Some(writer) => match writer.append(data) {
                Ok(()) => self.diagnostics.bytes_written += data.len() as u64,
                Err(e) => {
                    log::error!("Error writing captured audio to container: {}", e);
                    self.diagnostics.write_failures += 1;
                }
            },
            None => log::warn!("Dropped {} captured bytes: container is not open", data.len()),
        }

        let observers = if chunks.is_empty() {
            Vec::new()
        } else {
            self.observers.clone()
        };
        (chunks, observers)
    }
}

/// Uncompressed capture engine.
///
/// Data flow per notification:
/// ```text
/// [CaptureDevice] → period bytes ─┬→ [AmplitudeTracker]
///                                 ├→ [ChunkSegmenter] → chunk_<n>.pcm16 → [ChunkObserver]s
///                                 └→ [ContainerWriter] → output.wav
/// ```
pub struct PcmEngine<P: DeviceProvider> {
    config: CaptureConfig,
    provider: P,
    layout: Option<BufferLayout>,
    device: Option<P::Device>,
    pipeline: Arc<Mutex<Pipeline>>,
    amplitude: Arc<AmplitudeTracker>,
    read_buffer: Vec<u8>,
    chunk_dir: Option<PathBuf>,
}

impl<P: DeviceProvider> PcmEngine<P> {
    /// Nothing is opened until the owning session calls [`RecordingEngine::open`].
    pub fn new(config: CaptureConfig, provider: P) -> Self {
        Self {
            config,
            provider,
            layout: None,
            device: None,
            pipeline: Arc::new(Mutex::new(Pipeline::default())),
            amplitude: Arc::new(AmplitudeTracker::new()),
            read_buffer: Vec::new(),
            chunk_dir: None,
        }
    }

    /// Register `observer` for completed chunks. Registering the same
    /// observer twice has no effect.
    pub fn add_observer(&self, observer: Arc<dyn ChunkObserver>) {
        let mut pipeline = self.pipeline.lock();
        if !pipeline.observers.iter().any(|o| Arc::ptr_eq(o, &observer)) {
            pipeline.observers.push(observer);
        }
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    /// Buffer sizing negotiated with the device, once opened.
    pub fn layout(&self) -> Option<BufferLayout> {
        self.layout
    }

    pub fn diagnostics(&self) -> CaptureDiagnostics {
        self.pipeline.lock().diagnostics.clone()
    }

    /// Directory receiving this recording's chunk files, once prepared.
    pub fn chunk_dir(&self) -> Option<&Path> {
        self.chunk_dir.as_deref()
    }
}

impl<P: DeviceProvider> RecordingEngine for PcmEngine<P> {
    fn open(&mut self) -> Result<(), CaptureError> {
        if let Some(mut old) = self.device.take() {
            old.release();
        }

        self.config.validate()?;
        let min_bytes = self.provider.min_buffer_size(&self.config)?;
        let layout = BufferLayout::derive(&self.config, min_bytes)?;

        let device = self.provider.open(&self.config, &layout)?;
        if !device.is_initialized() {
            return Err(CaptureError::Device("audio device initialization failed".into()));
        }

        log::info!(
            "Opened capture device: {} Hz, {} ch, {} bit, {} frames per period",
            self.config.sample_rate,
            self.config.channels,
            self.config.bits_per_sample,
            layout.period_frames
        );
        self.layout = Some(layout);
        self.device = Some(device);
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.device.as_ref().is_some_and(|d| d.is_initialized())
    }

    fn prepare(&mut self, output: &Path) -> Result<(), CaptureError> {
        let layout = self
            .layout
            .ok_or_else(|| CaptureError::Device("device is not open".into()))?;

        let chunk_dir = create_chunk_dir(output)?;
        let writer = ContainerWriter::create(output, &self.config.format())?;
        let segmenter = ChunkSegmenter::new(chunk_dir.clone(), self.config.chunk_capacity);
        self.read_buffer = vec![0; layout.period_bytes()];

        {
            let mut pipeline = self.pipeline.lock();
            pipeline.writer = Some(writer);
            pipeline.segmenter = Some(segmenter);
            pipeline.diagnostics = CaptureDiagnostics::default();
        }

        log::info!("Prepared {:?}, chunks in {:?}", output, chunk_dir);
        self.chunk_dir = Some(chunk_dir);
        Ok(())
    }

    fn start(&mut self) -> Result<(), CaptureError> {
        let device = self
            .device
            .as_mut()
            .ok_or_else(|| CaptureError::Device("device has been released".into()))?;

        let callback = period_callback(
            Arc::clone(&self.pipeline),
            Arc::clone(&self.amplitude),
            self.config.bits_per_sample,
        );
        device.start(callback)?;

        // Priming read; the bytes are not part of the recording.
        match device.read(&mut self.read_buffer) {
            Ok(n) => log::debug!("Priming read returned {} bytes", n),
            Err(e) => {
                if let Err(stop_err) = device.stop() {
                    log::warn!("Failed to stop device after priming error: {}", stop_err);
                }
                return Err(e);
            }
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<RecordingStats, CaptureError> {
        if let Some(device) = self.device.as_mut() {
            if let Err(e) = device.stop() {
                log::warn!("Failed to stop capture device: {}", e);
            }
        }

        let (final_chunk, observers, chunk_count, writer) = {
            let mut guard = self.pipeline.lock();
            let pipeline = &mut *guard;

            let final_chunk = match pipeline.segmenter.as_mut().map(|s| s.finish()) {
                Some(Ok(chunk)) => chunk,
                Some(Err(e)) => {
                    log::error!("Failed to write final chunk: {}", e);
                    pipeline.diagnostics.chunk_failures += 1;
                    None
                }
                None => None,
            };
            if final_chunk.is_some() {
                pipeline.diagnostics.chunks_emitted += 1;
            }
            let chunk_count = pipeline
                .segmenter
                .take()
                .map(|s| s.chunks_written())
                .unwrap_or(0);

            (final_chunk, pipeline.observers.clone(), chunk_count, pipeline.writer.take())
        };

        if let Some(chunk) = &final_chunk {
            notify(&observers, chunk);
        }

        let mut writer = writer.ok_or_else(|| CaptureError::Io("container is not open".into()))?;
        let payload_bytes = writer.finalize()?;
        let byte_rate = self.config.format().byte_rate() as f64;

        log::info!(
            "Finalized {:?}: {} payload bytes in {} chunks",
            writer.path(),
            payload_bytes,
            chunk_count
        );
        Ok(RecordingStats {
            payload_bytes,
            duration_secs: payload_bytes as f64 / byte_rate,
            chunk_count,
            chunk_dir: self.chunk_dir.clone(),
        })
    }

    fn discard(&mut self) {
        let mut pipeline = self.pipeline.lock();
        if let Some(mut writer) = pipeline.writer.take() {
            writer.discard();
        }
        pipeline.segmenter = None;
    }

    fn release(&mut self) {
        if let Some(mut device) = self.device.take() {
            device.release();
        }
    }

    fn take_max_amplitude(&self) -> i32 {
        self.amplitude.take()
    }

    fn reset_amplitude(&self) {
        self.amplitude.reset();
    }
}

fn period_callback(
    pipeline: Arc<Mutex<Pipeline>>,
    amplitude: Arc<AmplitudeTracker>,
    bits_per_sample: u16,
) -> PeriodCallback {
    Arc::new(move |data: &[u8]| {
        amplitude.scan(data, bits_per_sample);
        let (chunks, observers) = pipeline.lock().process_period(data);
        for chunk in &chunks {
            notify(&observers, chunk);
        }
    })
}

fn notify(observers: &[Arc<dyn ChunkObserver>], chunk: &ChunkFile) {
    for observer in observers {
        observer.on_chunk(chunk);
    }
}

/// Create `chunks-<uuid>` next to the output file.
///
/// The directory outlives the session; cleaning it up is the caller's job.
fn create_chunk_dir(output: &Path) -> Result<PathBuf, CaptureError> {
    let parent = match output.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let dir = parent.join(format!("chunks-{}", uuid::Uuid::new_v4().simple()));
    fs::create_dir_all(&dir)
        .map_err(|e| CaptureError::Io(format!("failed to create chunk directory {:?}: {}", dir, e)))?;
    Ok(dir)
}
