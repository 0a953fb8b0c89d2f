use std::fs;
use std::path::{Path, PathBuf};

use crate::models::error::CaptureError;
use crate::models::recording_result::RecordingSummary;

/// `{recording}.metadata.json`, next to the recording.
pub fn metadata_path(recording_path: &Path) -> PathBuf {
    recording_path.with_extension("metadata.json")
}

/// Write a recording summary as a JSON sidecar file.
pub fn write_summary(summary: &RecordingSummary, recording_path: &Path) -> Result<PathBuf, CaptureError> {
    let path = metadata_path(recording_path);
    let json = serde_json::to_string_pretty(summary)
        .map_err(|e| CaptureError::Io(format!("failed to serialize summary: {}", e)))?;
    fs::write(&path, json).map_err(|e| CaptureError::Io(format!("failed to write summary: {}", e)))?;
    Ok(path)
}

/// Read a recording summary from its JSON sidecar file.
pub fn read_summary(recording_path: &Path) -> Result<RecordingSummary, CaptureError> {
    let json = fs::read_to_string(metadata_path(recording_path))
        .map_err(|e| CaptureError::Io(format!("failed to read summary: {}", e)))?;
    serde_json::from_str(&json).map_err(|e| CaptureError::Io(format!("failed to parse summary: {}", e)))
}
