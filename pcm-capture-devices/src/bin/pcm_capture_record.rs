use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::Parser;
use log::info;

use pcm_capture_core::storage::metadata::write_summary;
use pcm_capture_core::{
    CaptureConfig, CaptureSession, CaptureSource, CaptureState, ChunkFile, DeviceProvider, RecordingEngine,
    RecordingSummary,
};
use pcm_capture_devices::{SyntheticProvider, ToneSpec};

#[derive(Parser)]
#[command(name = "pcm-capture-record")]
#[command(about = "Record audio to a WAV container plus fixed-size PCM chunk files")]
struct Cli {
    /// Container file to write
    #[arg(short, long, default_value = "recording.wav")]
    output: PathBuf,

    /// Recording length in seconds
    #[arg(short, long, default_value_t = 5.0)]
    duration_secs: f64,

    /// JSON capture config; the flags below override its fields
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    sample_rate: Option<u32>,

    #[arg(long)]
    channels: Option<u16>,

    #[arg(long)]
    bits: Option<u16>,

    /// Bytes per chunk file
    #[arg(long)]
    chunk_bytes: Option<usize>,

    /// Capture notification interval in milliseconds
    #[arg(long)]
    interval_ms: Option<u32>,

    /// Input device name; the default device when omitted
    #[arg(long)]
    device: Option<String>,

    /// Step down through 44100/22050/11025/8000 Hz until a device opens
    #[arg(long)]
    fallback: bool,

    /// Record a generated sine tone instead of a microphone
    #[arg(long)]
    synthetic: bool,

    #[arg(long, default_value_t = 440.0)]
    tone_hz: f64,

    /// How often to log the peak amplitude, in milliseconds
    #[arg(long, default_value_t = 250)]
    poll_ms: u64,

    /// List input devices and exit
    #[arg(long)]
    list_devices: bool,
}

fn main() -> Result<(), anyhow::Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    if cli.list_devices {
        return list_devices();
    }

    anyhow::ensure!(
        cli.duration_secs.is_finite() && cli.duration_secs > 0.0,
        "duration must be a positive number of seconds"
    );
    let config = load_config(&cli)?;

    let summary = if cli.synthetic {
        record(&cli, config, synthetic_provider(&cli))?
    } else {
        record_microphone(&cli, config)?
    };

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn load_config(cli: &Cli) -> Result<CaptureConfig, anyhow::Error> {
    let mut config = match &cli.config {
        Some(path) => {
            let raw = fs::read_to_string(path).with_context(|| format!("reading {:?}", path))?;
            serde_json::from_str(&raw).with_context(|| format!("parsing {:?}", path))?
        }
        None => CaptureConfig::default(),
    };

    if let Some(rate) = cli.sample_rate {
        config.sample_rate = rate;
    }
    if let Some(channels) = cli.channels {
        config.channels = channels;
    }
    if let Some(bits) = cli.bits {
        config.bits_per_sample = bits;
    }
    if let Some(bytes) = cli.chunk_bytes {
        config.chunk_capacity = bytes;
    }
    if let Some(ms) = cli.interval_ms {
        config.notification_interval_ms = ms;
    }
    if let Some(name) = &cli.device {
        config.source = CaptureSource::Named(name.clone());
    }
    Ok(config)
}

fn synthetic_provider(cli: &Cli) -> SyntheticProvider {
    SyntheticProvider::new(ToneSpec {
        frequency_hz: cli.tone_hz,
        ..Default::default()
    })
}

#[cfg(feature = "cpal")]
fn record_microphone(cli: &Cli, config: CaptureConfig) -> Result<RecordingSummary, anyhow::Error> {
    record(cli, config, pcm_capture_devices::CpalProvider)
}

#[cfg(not(feature = "cpal"))]
fn record_microphone(cli: &Cli, config: CaptureConfig) -> Result<RecordingSummary, anyhow::Error> {
    log::warn!("Built without the `cpal` feature; recording a synthetic tone instead");
    record(cli, config, synthetic_provider(cli))
}

#[cfg(feature = "cpal")]
fn list_devices() -> Result<(), anyhow::Error> {
    for name in pcm_capture_devices::list_input_devices()? {
        println!("{}", name);
    }
    Ok(())
}

#[cfg(not(feature = "cpal"))]
fn list_devices() -> Result<(), anyhow::Error> {
    anyhow::bail!("device listing requires the `cpal` feature")
}

fn record<P>(cli: &Cli, config: CaptureConfig, provider: P) -> Result<RecordingSummary, anyhow::Error>
where
    P: DeviceProvider + Clone,
{
    let mut session = if cli.fallback {
        CaptureSession::open_first_supported(config, provider)
    } else {
        CaptureSession::open(config, provider)
    };
    check(&session, "open")?;
    info!(
        "Recording {} Hz, {} ch, {} bit to {:?}",
        session.config().sample_rate,
        session.config().channels,
        session.config().bits_per_sample,
        cli.output
    );

    session.add_chunk_observer(Arc::new(|chunk: &ChunkFile| {
        info!("Chunk {} ready: {:?} ({} bytes)", chunk.index, chunk.path, chunk.len);
    }));

    session.set_output_file(&cli.output);
    session.prepare();
    check(&session, "prepare")?;
    session.start();
    check(&session, "start")?;

    let deadline = Instant::now() + Duration::from_secs_f64(cli.duration_secs);
    let poll = Duration::from_millis(cli.poll_ms.max(1));
    while Instant::now() < deadline {
        thread::sleep(poll);
        info!("Peak amplitude: {}", session.max_amplitude());
    }

    session.stop();
    check(&session, "stop")?;

    let diagnostics = session.diagnostics();
    info!(
        "{} callbacks, {} bytes written, {} write failures, {} lost chunks",
        diagnostics.callback_count,
        diagnostics.bytes_written,
        diagnostics.write_failures,
        diagnostics.chunk_failures
    );

    let summary = session
        .summary()
        .cloned()
        .context("session stopped without a recording summary")?;
    let sidecar = write_summary(&summary, &cli.output)?;
    info!("Wrote {:?}", sidecar);
    Ok(summary)
}

fn check<E: RecordingEngine>(session: &CaptureSession<E>, step: &str) -> Result<(), anyhow::Error> {
    if session.state() == CaptureState::Error {
        let cause = session
            .last_error()
            .map(|e| e.to_string())
            .unwrap_or_else(|| "unknown error".into());
        anyhow::bail!("{} failed: {}", step, cause);
    }
    Ok(())
}
