//! # pcm-capture-devices
//!
//! Capture device backends for pcm-capture-core.
//!
//! Provides:
//! - `SyntheticProvider` - sine-tone source driven by its own timer thread
//! - `CpalProvider` - microphone input via cpal (feature `cpal`)
//! - `PeriodAssembler` - regroups backend buffers into fixed periods
//!
//! ## Usage
//! ```ignore
//! use pcm_capture_core::{CaptureConfig, CaptureSession};
//! use pcm_capture_devices::{SyntheticProvider, ToneSpec};
//!
//! let mut session = CaptureSession::open(CaptureConfig::default(), SyntheticProvider::new(ToneSpec::default()));
//! session.set_output_file("take.wav");
//! session.prepare();
//! session.start();
//! ```

#[cfg(feature = "cpal")]
pub mod cpal_input;
pub mod period_assembler;
pub mod synthetic;

#[cfg(feature = "cpal")]
pub use cpal_input::{list_input_devices, CpalInput, CpalProvider};
pub use period_assembler::PeriodAssembler;
pub use synthetic::{SyntheticDevice, SyntheticProvider, ToneGenerator, ToneSpec};
