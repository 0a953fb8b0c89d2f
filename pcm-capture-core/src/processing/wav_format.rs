//! RIFF/WAVE header layout for uncompressed PCM.
//!
//! The header is written once with zeroed size fields when a recording is
//! prepared; only the two size fields are rewritten when it stops.

use crate::models::config::PcmFormat;

/// Size of the canonical PCM WAV header in bytes.
pub const WAV_HEADER_SIZE: usize = 44;

/// Offset of the RIFF chunk size (total file size - 8).
pub const RIFF_SIZE_OFFSET: u64 = 4;

/// Offset of the `data` sub-chunk size (payload bytes).
pub const DATA_SIZE_OFFSET: u64 = 40;

/// Generate a 44-byte WAV header for `format` carrying `data_size` payload bytes.
///
/// Layout (all integers little-endian):
/// ```text
/// [0-3]    "RIFF"
/// [4-7]    36 + data_size
/// [8-11]   "WAVE"
/// [12-15]  "fmt "
/// [16-19]  16 (PCM format chunk size)
/// [20-21]  1 (linear PCM)
/// [22-23]  channels
/// [24-27]  sample_rate
/// [28-31]  byte_rate = sample_rate * block_align
/// [32-33]  block_align = channels * bits_per_sample / 8
/// [34-35]  bits_per_sample
/// [36-39]  "data"
/// [40-43]  data_size
/// ```
pub fn generate_wav_header(format: &PcmFormat, data_size: u32) -> [u8; WAV_HEADER_SIZE] {
    let block_align = format.frame_bytes() as u16;
    let mut header = [0u8; WAV_HEADER_SIZE];

    header[0..4].copy_from_slice(b"RIFF");
    header[4..8].copy_from_slice(&riff_chunk_size(data_size).to_le_bytes());
    header[8..12].copy_from_slice(b"WAVE");

    header[12..16].copy_from_slice(b"fmt ");
    header[16..20].copy_from_slice(&16u32.to_le_bytes());
    header[20..22].copy_from_slice(&1u16.to_le_bytes());
    header[22..24].copy_from_slice(&format.channels.to_le_bytes());
    header[24..28].copy_from_slice(&format.sample_rate.to_le_bytes());
    header[28..32].copy_from_slice(&format.byte_rate().to_le_bytes());
    header[32..34].copy_from_slice(&block_align.to_le_bytes());
    header[34..36].copy_from_slice(&format.bits_per_sample.to_le_bytes());

    header[36..40].copy_from_slice(b"data");
    header[40..44].copy_from_slice(&data_size.to_le_bytes());

    header
}

/// Largest payload whose RIFF chunk size still fits in 32 bits.
pub const MAX_DATA_SIZE: u32 = u32::MAX - (WAV_HEADER_SIZE as u32 - 8);

/// RIFF chunk size for a file holding `data_size` payload bytes.
///
/// Wraps above [`MAX_DATA_SIZE`]; use [`data_size_field`] to range-check first.
pub fn riff_chunk_size(data_size: u32) -> u32 {
    data_size.wrapping_add(WAV_HEADER_SIZE as u32 - 8)
}

/// The `data` size field for `payload_len` bytes, or `None` when the file
/// would be too large for a RIFF container.
pub fn data_size_field(payload_len: u64) -> Option<u32> {
    u32::try_from(payload_len).ok().filter(|&size| size <= MAX_DATA_SIZE)
}
