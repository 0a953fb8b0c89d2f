use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::models::audio_models::ChunkFile;
use crate::models::error::CaptureError;

/// File extension of emitted chunk files.
pub const CHUNK_EXTENSION: &str = "pcm16";

/// Outcome of one [`ChunkSegmenter::append`].
#[derive(Debug, Default)]
pub struct Appended {
    /// Chunks written to disk by this call, in index order.
    pub chunks: Vec<ChunkFile>,
    /// Chunks that could not be written. Their indices are not reused.
    pub failures: Vec<CaptureError>,
}

/// Coalesces small device buffers into fixed-size chunk files.
///
/// Incoming bytes are staged until the staging area is full; the full area
/// is then written to `chunk_<n>.pcm16` and the overflow starts the next
/// chunk. Concatenating the emitted chunks in index order reproduces every
/// appended byte.
///
/// Chunk `n` always covers bytes `(n - 1) * capacity .. n * capacity` of the
/// stream. A chunk that fails to write is dropped and its index skipped, so
/// later chunks keep their offsets.
#[derive(Debug)]
pub struct ChunkSegmenter {
    dir: PathBuf,
    staging: Vec<u8>,
    capacity: usize,
    counter: u32,
    written: u32,
}

impl ChunkSegmenter {
    pub fn new(dir: PathBuf, capacity: usize) -> Self {
        Self {
            dir,
            staging: Vec::with_capacity(capacity),
            capacity,
            counter: 0,
            written: 0,
        }
    }

    /// Stage `data`, writing a chunk each time the staging area overflows.
    ///
    /// Data that exactly fills the staging area stays staged; the chunk is
    /// written by the next append or by [`finish`](Self::finish). All of
    /// `data` is consumed even when a chunk write fails.
    pub fn append(&mut self, data: &[u8]) -> Appended {
        let mut appended = Appended::default();
        let mut rest = data;

        loop {
            let remaining = self.capacity - self.staging.len();
            if rest.len() <= remaining {
                self.staging.extend_from_slice(rest);
                return appended;
            }

            let (head, tail) = rest.split_at(remaining);
            self.staging.extend_from_slice(head);
            match self.flush() {
                Ok(chunk) => appended.chunks.push(chunk),
                Err(e) => appended.failures.push(e),
            }
            rest = tail;
        }
    }

    /// Write whatever is staged as a final, possibly short, chunk.
    pub fn finish(&mut self) -> Result<Option<ChunkFile>, CaptureError> {
        if self.staging.is_empty() {
            return Ok(None);
        }
        self.flush().map(Some)
    }

    /// Bytes staged but not yet written.
    pub fn pending_len(&self) -> usize {
        self.staging.len()
    }

    /// Number of chunk files successfully written so far.
    pub fn chunks_written(&self) -> u32 {
        self.written
    }

    fn flush(&mut self) -> Result<ChunkFile, CaptureError> {
        self.counter += 1;
        let path = self.dir.join(chunk_file_name(self.counter));
        let len = self.staging.len() as u64;

        // The staged bytes are gone either way; the container keeps its copy.
        let written = write_chunk(&path, &self.staging);
        self.staging.clear();
        written?;
        self.written += 1;

        log::debug!("Wrote chunk {} ({} bytes) to {:?}", self.counter, len, path);
        Ok(ChunkFile {
            index: self.counter,
            path,
            len,
        })
    }
}

/// `chunk_<index>.pcm16`
pub fn chunk_file_name(index: u32) -> String {
    format!("chunk_{}.{}", index, CHUNK_EXTENSION)
}

fn write_chunk(path: &Path, data: &[u8]) -> Result<(), CaptureError> {
    let mut file = File::create(path)
        .map_err(|e| CaptureError::Io(format!("failed to create chunk {:?}: {}", path, e)))?;
    file.write_all(data)
        .map_err(|e| CaptureError::Io(format!("failed to write chunk {:?}: {}", path, e)))?;
    file.sync_data()
        .map_err(|e| CaptureError::Io(format!("failed to sync chunk {:?}: {}", path, e)))?;
    Ok(())
}
