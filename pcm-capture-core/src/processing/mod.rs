pub mod amplitude;
pub mod chunk_segmenter;
pub mod wav_format;
