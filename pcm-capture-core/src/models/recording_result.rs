use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// What an engine reports when it finishes a recording.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecordingStats {
    pub payload_bytes: u64,
    pub duration_secs: f64,
    pub chunk_count: u32,
    pub chunk_dir: Option<PathBuf>,
}

/// Summary of a finished recording.
///
/// Serializable as a JSON sidecar next to the container file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingSummary {
    pub id: String,
    pub output_path: PathBuf,
    pub created_at: String,
    pub payload_bytes: u64,
    pub duration_secs: f64,
    pub chunk_count: u32,
    pub chunk_dir: Option<PathBuf>,
    /// SHA-256 of the finished container, hex encoded.
    pub checksum: Option<String>,
}

impl RecordingSummary {
    pub fn new(output_path: &Path, stats: RecordingStats, checksum: Option<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            output_path: output_path.to_path_buf(),
            created_at: chrono::Utc::now().to_rfc3339(),
            payload_bytes: stats.payload_bytes,
            duration_secs: stats.duration_secs,
            chunk_count: stats.chunk_count,
            chunk_dir: stats.chunk_dir,
            checksum,
        }
    }
}
