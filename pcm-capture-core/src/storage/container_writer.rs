use std::fs::{self, File, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::models::config::PcmFormat;
use crate::models::error::CaptureError;
use crate::processing::wav_format;

/// Streaming WAV container writer.
///
/// ## File Format
///
/// ```text
/// [44-byte WAV header, size fields zero until finalize]
/// [raw PCM payload, appended verbatim...]
/// ```
///
/// Finalizing seeks back to offsets 4 and 40 and patches the two size
/// fields in place; nothing else in the file is ever rewritten.
pub struct ContainerWriter {
    path: PathBuf,
    file: Option<File>,
    payload_len: u64,
}

impl ContainerWriter {
    /// Open `path` for read/write, truncate it, and write the placeholder header.
    pub fn create(path: &Path, format: &PcmFormat) -> Result<Self, CaptureError> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(|e| CaptureError::Io(format!("failed to open {:?}: {}", path, e)))?;

        let header = wav_format::generate_wav_header(format, 0);
        file.write_all(&header)
            .map_err(|e| CaptureError::Io(format!("failed to write header: {}", e)))?;

        Ok(Self {
            path: path.to_path_buf(),
            file: Some(file),
            payload_len: 0,
        })
    }

    /// Append raw payload bytes.
    pub fn append(&mut self, data: &[u8]) -> Result<(), CaptureError> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| CaptureError::Io("container is not open".into()))?;
        file.write_all(data)
            .map_err(|e| CaptureError::Io(format!("write failed: {}", e)))?;
        self.payload_len += data.len() as u64;
        Ok(())
    }

    /// Patch both size fields and close the file. Returns the payload size.
    pub fn finalize(&mut self) -> Result<u64, CaptureError> {
        let mut file = self
            .file
            .take()
            .ok_or_else(|| CaptureError::Io("container is not open".into()))?;

        let data_size = wav_format::data_size_field(self.payload_len).ok_or_else(|| {
            CaptureError::Io(format!(
                "payload of {} bytes exceeds the WAV size limit",
                self.payload_len
            ))
        })?;

        patch_u32(&mut file, wav_format::RIFF_SIZE_OFFSET, wav_format::riff_chunk_size(data_size))?;
        patch_u32(&mut file, wav_format::DATA_SIZE_OFFSET, data_size)?;
        file.flush()?;
        file.sync_all()?;

        Ok(self.payload_len)
    }

    /// Close and delete an unfinished container.
    pub fn discard(&mut self) {
        self.file = None;
        if let Err(e) = fs::remove_file(&self.path) {
            if e.kind() != io::ErrorKind::NotFound {
                log::error!("Failed to delete unfinished container {:?}: {}", self.path, e);
            }
        }
    }

    /// Payload bytes appended so far (header excluded).
    pub fn payload_len(&self) -> u64 {
        self.payload_len
    }

    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn patch_u32(file: &mut File, offset: u64, value: u32) -> Result<(), CaptureError> {
    file.seek(SeekFrom::Start(offset))
        .map_err(|e| CaptureError::Io(format!("seek to {} failed: {}", offset, e)))?;
    file.write_all(&value.to_le_bytes())
        .map_err(|e| CaptureError::Io(format!("patch at {} failed: {}", offset, e)))?;
    Ok(())
}

/// Compute the SHA-256 hex digest of a file.
pub fn sha256_file(path: &Path) -> Result<String, CaptureError> {
    let mut file = File::open(path)
        .map_err(|e| CaptureError::Io(format!("failed to read {:?} for checksum: {}", path, e)))?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(hex_encode(&hasher.finalize()))
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
