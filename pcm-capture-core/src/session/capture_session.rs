use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::models::audio_models::CaptureDiagnostics;
use crate::models::config::{BufferLayout, CaptureConfig};
use crate::models::error::CaptureError;
use crate::models::recording_result::RecordingSummary;
use crate::models::state::CaptureState;
use crate::storage::container_writer::sha256_file;
use crate::traits::capture_device::DeviceProvider;
use crate::traits::chunk_observer::ChunkObserver;
use crate::traits::recording_engine::RecordingEngine;

use super::pcm_engine::PcmEngine;

/// Sample rates tried, in order, by [`CaptureSession::open_first_supported`].
pub const FALLBACK_SAMPLE_RATES: [u32; 4] = [44100, 22050, 11025, 8000];

/// Capture session state machine.
///
/// No method returns an error. A failing or illegal call moves the session to
/// [`CaptureState::Error`], logs the cause and keeps it in
/// [`last_error`](Self::last_error); callers poll [`state`](Self::state)
/// after each call. A session in `Error` cannot be reset and must be
/// discarded.
///
/// Lifecycle calls must not race the capture callback: `stop` and `release`
/// halt the device before touching shared buffers, and the session is
/// otherwise used from one thread.
pub struct CaptureSession<E: RecordingEngine> {
    engine: E,
    state: CaptureState,
    output_path: Option<PathBuf>,
    last_error: Option<CaptureError>,
    summary: Option<RecordingSummary>,
}

impl<E: RecordingEngine> CaptureSession<E> {
    /// Wrap `engine` and open its device. Ends in `Initializing`, or `Error`
    /// if the device could not be opened.
    pub fn new(engine: E) -> Self {
        let mut session = Self {
            engine,
            state: CaptureState::Initializing,
            output_path: None,
            last_error: None,
            summary: None,
        };
        if let Err(e) = session.engine.open() {
            session.fail("construct", e);
        }
        session
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    /// Cause of the most recent transition to `Error`.
    pub fn last_error(&self) -> Option<&CaptureError> {
        self.last_error.as_ref()
    }

    pub fn output_path(&self) -> Option<&Path> {
        self.output_path.as_deref()
    }

    /// Summary of the recording finished by the last successful `stop`.
    pub fn summary(&self) -> Option<&RecordingSummary> {
        self.summary.as_ref()
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Set the container path. Only honoured in `Initializing`; ignored
    /// without error in every other state.
    pub fn set_output_file(&mut self, path: impl Into<PathBuf>) {
        if self.state == CaptureState::Initializing {
            self.output_path = Some(path.into());
        } else {
            log::debug!("set_output_file() ignored in {} state", self.state);
        }
    }

    /// Write the container header and size buffers. `Initializing` → `Ready`.
    ///
    /// Calling this in any other state releases the session first and then
    /// forces `Error`.
    pub fn prepare(&mut self) {
        if self.state != CaptureState::Initializing {
            let err = self.illegal("prepare");
            self.release();
            return self.fail("prepare", err);
        }
        if !self.engine.is_open() {
            return self.fail(
                "prepare",
                CaptureError::Device("prepare() called on uninitialized recorder".into()),
            );
        }
        let Some(path) = self.output_path.clone() else {
            return self.fail("prepare", CaptureError::Config("no output file set".into()));
        };

        match self.engine.prepare(&path) {
            Ok(()) => self.transition(CaptureState::Ready),
            Err(e) => self.fail("prepare", e),
        }
    }

    /// Begin capture. `Ready` → `Recording`.
    pub fn start(&mut self) {
        if self.state != CaptureState::Ready {
            let err = self.illegal("start");
            return self.fail("start", err);
        }
        match self.engine.start() {
            Ok(()) => self.transition(CaptureState::Recording),
            Err(e) => self.fail("start", e),
        }
    }

    /// Stop capture and finalize the container. `Recording` → `Stopped`.
    pub fn stop(&mut self) {
        if self.state != CaptureState::Recording {
            let err = self.illegal("stop");
            return self.fail("stop", err);
        }

        let stats = match self.engine.stop() {
            Ok(stats) => stats,
            Err(e) => return self.fail("stop", e),
        };

        if let Some(path) = self.output_path.as_deref() {
            let checksum = match sha256_file(path) {
                Ok(checksum) => Some(checksum),
                Err(e) => {
                    log::warn!("Could not checksum {:?}: {}", path, e);
                    None
                }
            };
            self.summary = Some(RecordingSummary::new(path, stats, checksum));
        }
        self.transition(CaptureState::Stopped);
    }

    /// Tear down resources. Stops an active recording, deletes a prepared
    /// but unstarted container, and always releases the device. Idempotent.
    pub fn release(&mut self) {
        match self.state {
            CaptureState::Recording => self.stop(),
            CaptureState::Ready => self.engine.discard(),
            _ => {}
        }
        self.engine.release();
    }

    /// Release everything and return to `Initializing` with a fresh device,
    /// no output path and a zero peak. Ignored in `Error`.
    pub fn reset(&mut self) {
        if self.state.is_error() {
            log::warn!("reset() ignored: a session in error state must be reconstructed");
            return;
        }

        self.release();
        if self.state.is_error() {
            return;
        }

        self.output_path = None;
        self.summary = None;
        self.engine.reset_amplitude();
        match self.engine.open() {
            Ok(()) => self.transition(CaptureState::Initializing),
            Err(e) => self.fail("reset", e),
        }
    }

    /// Largest amplitude since the previous call while `Recording`, resetting
    /// it to zero. Returns 0 with no side effect in every other state.
    pub fn max_amplitude(&self) -> i32 {
        if self.state.is_recording() {
            self.engine.take_max_amplitude()
        } else {
            0
        }
    }

    fn illegal(&self, operation: &'static str) -> CaptureError {
        CaptureError::IllegalState {
            operation,
            state: self.state,
        }
    }

    fn transition(&mut self, next: CaptureState) {
        log::info!("Capture session {} -> {}", self.state, next);
        self.state = next;
    }

    fn fail(&mut self, operation: &str, err: CaptureError) {
        log::error!("{}() failed: {}", operation, err);
        self.last_error = Some(err);
        self.state = CaptureState::Error;
    }
}

impl<E: RecordingEngine> Drop for CaptureSession<E> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<P: DeviceProvider> CaptureSession<PcmEngine<P>> {
    /// Construct an uncompressed capture session.
    pub fn open(config: CaptureConfig, provider: P) -> Self {
        Self::new(PcmEngine::new(config, provider))
    }

    /// Try [`FALLBACK_SAMPLE_RATES`] in order and keep the first session
    /// whose device opens. If none does, the last attempt is returned in
    /// `Error`.
    pub fn open_first_supported(config: CaptureConfig, provider: P) -> Self
    where
        P: Clone,
    {
        let with_rate = |rate: u32| CaptureConfig {
            sample_rate: rate,
            ..config.clone()
        };

        let mut session = Self::open(with_rate(FALLBACK_SAMPLE_RATES[0]), provider.clone());
        for &rate in &FALLBACK_SAMPLE_RATES[1..] {
            if session.state() == CaptureState::Initializing {
                break;
            }
            log::info!("Falling back to {} Hz", rate);
            session = Self::open(with_rate(rate), provider.clone());
        }
        session
    }

    /// Register a listener for completed chunks. May be called in any state.
    pub fn add_chunk_observer(&self, observer: Arc<dyn ChunkObserver>) {
        self.engine.add_observer(observer);
    }

    pub fn config(&self) -> &CaptureConfig {
        self.engine.config()
    }

    pub fn layout(&self) -> Option<BufferLayout> {
        self.engine.layout()
    }

    pub fn diagnostics(&self) -> CaptureDiagnostics {
        self.engine.diagnostics()
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use approx::assert_relative_eq;
    use parking_lot::Mutex;

    use super::*;
    use crate::models::audio_models::ChunkFile;
    use crate::models::recording_result::RecordingStats;
    use crate::testing::{init_logging, ManualProvider};

    type PcmSession = CaptureSession<PcmEngine<ManualProvider>>;

    /// 8 kHz mono 16-bit with a 125 ms period: 1000 frames, 2000 bytes.
    fn config_8k() -> CaptureConfig {
        CaptureConfig {
            sample_rate: 8000,
            channels: 1,
            bits_per_sample: 16,
            chunk_capacity: 4096,
            notification_interval_ms: 125,
            ..Default::default()
        }
    }

    fn period(seed: u8) -> Vec<u8> {
        (0..2000u32).map(|i| (i as u8).wrapping_mul(7).wrapping_add(seed)).collect()
    }

    fn pcm16(samples: &[i16]) -> Vec<u8> {
        samples.iter().flat_map(|s| s.to_le_bytes()).collect()
    }

    fn u32_at(data: &[u8], offset: usize) -> u32 {
        u32::from_le_bytes([data[offset], data[offset + 1], data[offset + 2], data[offset + 3]])
    }

    fn collect_chunks(session: &PcmSession) -> Arc<Mutex<Vec<ChunkFile>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        session.add_chunk_observer(Arc::new(move |chunk: &ChunkFile| sink.lock().push(chunk.clone())));
        seen
    }

    fn recording(dir: &tempfile::TempDir) -> (ManualProvider, PcmSession, PathBuf) {
        init_logging();
        let provider = ManualProvider::new();
        let mut session = CaptureSession::open(config_8k(), provider.clone());
        let path = dir.path().join("take.wav");
        session.set_output_file(&path);
        session.prepare();
        session.start();
        assert_eq!(session.state(), CaptureState::Recording);
        (provider, session, path)
    }

    #[test]
    fn one_second_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        init_logging();
        let provider = ManualProvider::new();
        let mut session = CaptureSession::open(config_8k(), provider.clone());
        let chunks = collect_chunks(&session);
        let path = dir.path().join("take.wav");

        assert_eq!(session.state(), CaptureState::Initializing);
        session.set_output_file(&path);
        session.prepare();
        assert_eq!(session.state(), CaptureState::Ready);
        session.start();
        assert_eq!(session.state(), CaptureState::Recording);
        assert_eq!(provider.log().priming_reads, 1);

        let mut expected = Vec::new();
        for seed in 0..8 {
            let data = period(seed);
            assert!(provider.tick(&data));
            expected.extend_from_slice(&data);
        }
        session.stop();
        assert_eq!(session.state(), CaptureState::Stopped);

        let file = fs::read(&path).unwrap();
        assert_eq!(file.len(), 44 + 16000);
        assert_eq!(u32_at(&file, 4), 16036);
        assert_eq!(u32_at(&file, 40), 16000);
        assert_eq!(&file[44..], &expected[..]);

        let chunk_dir = session.engine().chunk_dir().unwrap().to_path_buf();
        assert_eq!(chunk_dir.parent(), Some(dir.path()));
        assert_eq!(session.summary().unwrap().chunk_dir.as_ref(), Some(&chunk_dir));

        let chunks = chunks.lock();
        assert_eq!(
            chunks.iter().map(|c| c.len).collect::<Vec<_>>(),
            vec![4096, 4096, 4096, 3712]
        );
        assert_eq!(chunks.iter().map(|c| c.index).collect::<Vec<_>>(), vec![1, 2, 3, 4]);
        let mut joined = Vec::new();
        for chunk in chunks.iter() {
            assert_eq!(
                chunk.path.file_name().unwrap().to_string_lossy(),
                format!("chunk_{}.pcm16", chunk.index)
            );
            assert_eq!(chunk.path.parent().unwrap().parent(), Some(dir.path()));
            joined.extend(fs::read(&chunk.path).unwrap());
        }
        assert_eq!(joined, expected);

        let summary = session.summary().unwrap();
        assert_eq!(summary.payload_bytes, 16000);
        assert_eq!(summary.chunk_count, 4);
        assert_relative_eq!(summary.duration_secs, 1.0);
        assert_eq!(summary.checksum.as_ref().map(|c| c.len()), Some(64));

        let diagnostics = session.diagnostics();
        assert_eq!(diagnostics.callback_count, 8);
        assert_eq!(diagnostics.bytes_written, 16000);
        assert_eq!(diagnostics.chunks_emitted, 4);
        assert_eq!(diagnostics.write_failures, 0);
        assert_eq!(diagnostics.chunk_failures, 0);
    }

    #[test]
    fn lost_chunk_directory_skips_chunks_but_keeps_recording() {
        let dir = tempfile::tempdir().unwrap();
        let (provider, mut session, path) = recording(&dir);
        let chunks = collect_chunks(&session);
        let chunk_dir = session.engine().chunk_dir().unwrap().to_path_buf();

        let mut expected = Vec::new();
        for seed in 0..5 {
            if seed == 3 {
                fs::remove_dir_all(&chunk_dir).unwrap();
            }
            let data = period(seed);
            provider.tick(&data);
            expected.extend_from_slice(&data);
        }
        assert_eq!(session.diagnostics().chunk_failures, 1);

        fs::create_dir(&chunk_dir).unwrap();
        session.stop();
        assert_eq!(session.state(), CaptureState::Stopped);

        // The container holds every period even though chunk 2 was lost.
        let file = fs::read(&path).unwrap();
        assert_eq!(u32_at(&file, 40), 10_000);
        assert_eq!(&file[44..], &expected[..]);

        let chunks = chunks.lock();
        assert_eq!(chunks.iter().map(|c| c.index).collect::<Vec<_>>(), vec![1, 3]);
        for chunk in chunks.iter() {
            assert!(chunk.path.exists());
        }
        assert_eq!(fs::read(&chunks[1].path).unwrap(), &expected[8192..]);

        let diagnostics = session.diagnostics();
        assert_eq!(diagnostics.chunks_emitted, 2);
        assert_eq!(diagnostics.chunk_failures, 1);
        assert_eq!(diagnostics.write_failures, 0);
        assert_eq!(session.summary().unwrap().chunk_count, 2);
    }

    #[test]
    fn final_chunk_failure_is_counted() {
        let dir = tempfile::tempdir().unwrap();
        let (provider, mut session, path) = recording(&dir);
        let chunks = collect_chunks(&session);
        provider.tick(&period(0));

        fs::remove_dir_all(session.engine().chunk_dir().unwrap()).unwrap();
        session.stop();

        assert_eq!(session.state(), CaptureState::Stopped);
        assert_eq!(u32_at(&fs::read(&path).unwrap(), 40), 2000);
        assert!(chunks.lock().is_empty());
        assert_eq!(session.diagnostics().chunk_failures, 1);
    }

    #[test]
    fn observer_registered_twice_is_notified_once() {
        let dir = tempfile::tempdir().unwrap();
        let (provider, mut session, _path) = recording(&dir);
        let seen = Arc::new(Mutex::new(0u32));
        let sink = Arc::clone(&seen);
        let observer: Arc<dyn ChunkObserver> = Arc::new(move |_: &ChunkFile| *sink.lock() += 1);
        session.add_chunk_observer(Arc::clone(&observer));
        session.add_chunk_observer(observer);

        provider.tick(&period(0));
        session.stop();
        assert_eq!(*seen.lock(), 1);
    }

    #[test]
    fn stop_without_audio_writes_empty_container_and_no_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let (_provider, mut session, path) = recording(&dir);
        let chunks = collect_chunks(&session);

        session.stop();
        assert_eq!(session.state(), CaptureState::Stopped);
        assert!(chunks.lock().is_empty());

        let file = fs::read(&path).unwrap();
        assert_eq!(file.len(), 44);
        assert_eq!(u32_at(&file, 4), 36);
        assert_eq!(u32_at(&file, 40), 0);
        assert_eq!(session.summary().unwrap().chunk_count, 0);
    }

    #[test]
    fn start_without_prepare_forces_error() {
        init_logging();
        let provider = ManualProvider::new();
        let mut session = CaptureSession::open(config_8k(), provider.clone());

        session.start();
        assert_eq!(session.state(), CaptureState::Error);
        assert_eq!(provider.log().started, 0);
        assert_eq!(
            session.last_error(),
            Some(&CaptureError::IllegalState {
                operation: "start",
                state: CaptureState::Initializing,
            })
        );
    }

    #[test]
    fn stop_outside_recording_forces_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = CaptureSession::open(config_8k(), ManualProvider::new());
        session.set_output_file(dir.path().join("take.wav"));
        session.prepare();
        session.stop();
        assert_eq!(session.state(), CaptureState::Error);
    }

    #[test]
    fn prepare_twice_releases_then_errors() {
        let dir = tempfile::tempdir().unwrap();
        init_logging();
        let provider = ManualProvider::new();
        let mut session = CaptureSession::open(config_8k(), provider.clone());
        let path = dir.path().join("take.wav");
        session.set_output_file(&path);

        session.prepare();
        assert!(path.exists());
        session.prepare();

        assert_eq!(session.state(), CaptureState::Error);
        assert!(!path.exists());
        assert_eq!(provider.log().released, 1);
        assert!(matches!(
            session.last_error(),
            Some(CaptureError::IllegalState {
                operation: "prepare",
                state: CaptureState::Ready
            })
        ));
    }

    #[test]
    fn prepare_during_recording_finalizes_then_errors() {
        let dir = tempfile::tempdir().unwrap();
        let (provider, mut session, path) = recording(&dir);
        provider.tick(&period(1));

        session.prepare();
        assert_eq!(session.state(), CaptureState::Error);
        assert_eq!(u32_at(&fs::read(&path).unwrap(), 40), 2000);
        assert_eq!(provider.log().stopped, 1);
    }

    #[test]
    fn prepare_without_output_file_errors() {
        let mut session = CaptureSession::open(config_8k(), ManualProvider::new());
        session.prepare();
        assert_eq!(session.state(), CaptureState::Error);
        assert!(matches!(session.last_error(), Some(CaptureError::Config(_))));
    }

    #[test]
    fn prepare_under_a_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        fs::write(&blocker, b"x").unwrap();
        let mut session = CaptureSession::open(config_8k(), ManualProvider::new());
        session.set_output_file(blocker.join("take.wav"));
        session.prepare();
        assert_eq!(session.state(), CaptureState::Error);
        assert!(matches!(session.last_error(), Some(CaptureError::Io(_))));
    }

    #[test]
    fn set_output_file_is_ignored_after_initializing() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = CaptureSession::open(config_8k(), ManualProvider::new());
        let first = dir.path().join("first.wav");
        session.set_output_file(&first);
        session.prepare();

        session.set_output_file(dir.path().join("second.wav"));
        assert_eq!(session.state(), CaptureState::Ready);
        assert_eq!(session.output_path(), Some(first.as_path()));
        assert!(session.last_error().is_none());
    }

    #[test]
    fn max_amplitude_is_a_consuming_read() {
        let dir = tempfile::tempdir().unwrap();
        init_logging();
        let provider = ManualProvider::new();
        let mut session = CaptureSession::open(config_8k(), provider.clone());
        assert_eq!(session.max_amplitude(), 0);

        session.set_output_file(dir.path().join("take.wav"));
        session.prepare();
        assert_eq!(session.max_amplitude(), 0);
        session.start();

        provider.tick(&pcm16(&[12, 1234, -30000, 77]));
        assert_eq!(session.max_amplitude(), 1234);
        assert_eq!(session.max_amplitude(), 0);

        provider.tick(&pcm16(&[500]));
        provider.tick(&pcm16(&[300]));
        session.stop();
        assert_eq!(session.max_amplitude(), 0);
    }

    #[test]
    fn reset_from_stopped_returns_to_initializing() {
        let dir = tempfile::tempdir().unwrap();
        let (provider, mut session, _path) = recording(&dir);
        provider.tick(&pcm16(&[999]));
        session.stop();

        session.reset();
        assert_eq!(session.state(), CaptureState::Initializing);
        assert_eq!(session.output_path(), None);
        assert!(session.summary().is_none());
        assert_eq!(session.max_amplitude(), 0);
        let log = provider.log();
        assert_eq!(log.opened, 2);
        assert_eq!(log.released, 1);

        // A second recording numbers its chunks from 1 again.
        let chunks = collect_chunks(&session);
        session.set_output_file(dir.path().join("second.wav"));
        session.prepare();
        session.start();
        provider.tick(&period(3));
        session.stop();
        assert_eq!(session.state(), CaptureState::Stopped);
        assert_eq!(chunks.lock().iter().map(|c| c.index).collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn reset_in_error_is_ignored() {
        let provider = ManualProvider::new();
        let mut session = CaptureSession::open(config_8k(), provider.clone());
        session.start();
        assert_eq!(session.state(), CaptureState::Error);

        session.reset();
        assert_eq!(session.state(), CaptureState::Error);
        assert_eq!(provider.log().opened, 1);
    }

    #[test]
    fn release_from_ready_deletes_container() {
        let dir = tempfile::tempdir().unwrap();
        let provider = ManualProvider::new();
        let mut session = CaptureSession::open(config_8k(), provider.clone());
        let path = dir.path().join("take.wav");
        session.set_output_file(&path);
        session.prepare();

        session.release();
        assert!(!path.exists());
        assert_eq!(provider.log().released, 1);

        session.release();
        assert_eq!(provider.log().released, 1);
    }

    #[test]
    fn release_from_recording_stops_and_finalizes() {
        let dir = tempfile::tempdir().unwrap();
        let (provider, mut session, path) = recording(&dir);
        provider.tick(&period(9));

        session.release();
        assert_eq!(session.state(), CaptureState::Stopped);
        assert_eq!(u32_at(&fs::read(&path).unwrap(), 40), 2000);
        let log = provider.log();
        assert_eq!(log.stopped, 1);
        assert_eq!(log.released, 1);
        assert!(!provider.tick(&period(9)));
    }

    #[test]
    fn dropping_a_recording_session_finalizes_it() {
        let dir = tempfile::tempdir().unwrap();
        let (provider, session, path) = recording(&dir);
        provider.tick(&period(4));
        drop(session);
        assert_eq!(u32_at(&fs::read(&path).unwrap(), 40), 2000);
        assert_eq!(provider.log().released, 1);
    }

    #[test]
    fn invalid_config_fails_construction() {
        let provider = ManualProvider::new();
        let session = CaptureSession::open(
            CaptureConfig {
                channels: 3,
                ..config_8k()
            },
            provider.clone(),
        );
        assert_eq!(session.state(), CaptureState::Error);
        assert!(matches!(session.last_error(), Some(CaptureError::Config(_))));
        assert_eq!(provider.log().opened, 0);
    }

    #[test]
    fn unavailable_device_fails_construction() {
        let provider = ManualProvider::failing();
        let session = CaptureSession::open(config_8k(), provider);
        assert_eq!(session.state(), CaptureState::Error);
        assert!(matches!(session.last_error(), Some(CaptureError::Device(_))));
    }

    #[test]
    fn device_minimum_grows_buffer() {
        let provider = ManualProvider::with_min_buffer(10_000);
        let session = CaptureSession::open(config_8k(), provider.clone());
        let layout = session.layout().unwrap();
        assert_eq!(layout.device_buffer_bytes, 10_000);
        assert_eq!(layout.period_bytes(), 5000);
        assert_eq!(provider.log().last_layout, Some(layout));
    }

    #[test]
    fn falls_back_to_first_supported_rate() {
        init_logging();
        let provider = ManualProvider::with_max_rate(11025);
        let session = CaptureSession::open_first_supported(config_8k(), provider.clone());
        assert_eq!(session.state(), CaptureState::Initializing);
        assert_eq!(session.config().sample_rate, 11025);
        assert_eq!(provider.log().opened, 1);
    }

    #[test]
    fn fallback_exhausted_returns_errored_session() {
        let provider = ManualProvider::failing();
        let session = CaptureSession::open_first_supported(config_8k(), provider);
        assert_eq!(session.state(), CaptureState::Error);
        assert_eq!(session.config().sample_rate, 8000);
    }

    /// Stands in for a compressed-codec recorder.
    #[derive(Default)]
    struct FakeEncoder {
        output: Option<PathBuf>,
        peak: std::sync::atomic::AtomicI32,
        calls: Vec<&'static str>,
    }

    impl RecordingEngine for FakeEncoder {
        fn open(&mut self) -> Result<(), CaptureError> {
            self.calls.push("open");
            Ok(())
        }

        fn is_open(&self) -> bool {
            true
        }

        fn prepare(&mut self, output: &Path) -> Result<(), CaptureError> {
            self.calls.push("prepare");
            self.output = Some(output.to_path_buf());
            Ok(())
        }

        fn start(&mut self) -> Result<(), CaptureError> {
            self.calls.push("start");
            self.peak.store(4321, std::sync::atomic::Ordering::SeqCst);
            Ok(())
        }

        fn stop(&mut self) -> Result<RecordingStats, CaptureError> {
            self.calls.push("stop");
            let output = self
                .output
                .as_ref()
                .ok_or_else(|| CaptureError::Encoder("not prepared".into()))?;
            fs::write(output, b"encoded")?;
            Ok(RecordingStats {
                payload_bytes: 7,
                ..Default::default()
            })
        }

        fn discard(&mut self) {
            self.calls.push("discard");
        }

        fn release(&mut self) {
            self.calls.push("release");
        }

        fn take_max_amplitude(&self) -> i32 {
            self.peak.swap(0, std::sync::atomic::Ordering::SeqCst)
        }

        fn reset_amplitude(&self) {
            self.peak.store(0, std::sync::atomic::Ordering::SeqCst);
        }
    }

    #[test]
    fn compressed_engine_follows_the_same_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = CaptureSession::new(FakeEncoder::default());
        session.set_output_file(dir.path().join("take.m4a"));
        session.prepare();
        session.start();
        assert_eq!(session.max_amplitude(), 4321);
        assert_eq!(session.max_amplitude(), 0);
        session.stop();

        assert_eq!(session.state(), CaptureState::Stopped);
        assert_eq!(session.summary().unwrap().payload_bytes, 7);
        assert_eq!(
            session.engine().calls,
            vec!["open", "prepare", "start", "stop"]
        );

        session.reset();
        assert_eq!(session.state(), CaptureState::Initializing);
        assert_eq!(&session.engine().calls[4..], &["release", "open"]);
    }
}
