use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A completed chunk of raw PCM written by the segmenter.
///
/// Written once and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkFile {
    /// 1-based sequence number within the prepared session.
    pub index: u32,
    pub path: PathBuf,
    pub len: u64,
}

/// Counters for debugging capture sessions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CaptureDiagnostics {
    pub callback_count: u64,
    pub bytes_written: u64,
    pub chunks_emitted: u64,
    /// Container appends that failed.
    pub write_failures: u64,
    /// Chunk files that could not be written.
    pub chunk_failures: u64,
}
