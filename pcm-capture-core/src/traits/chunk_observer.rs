use crate::models::audio_models::ChunkFile;

/// Listener for completed chunk files, e.g. a streaming transcription queue.
///
/// Called synchronously on the capture callback thread, once per chunk,
/// including the final short chunk written at stop. Keep it quick: the next
/// period is not processed until it returns.
pub trait ChunkObserver: Send + Sync {
    fn on_chunk(&self, chunk: &ChunkFile);
}

impl<F> ChunkObserver for F
where
    F: Fn(&ChunkFile) + Send + Sync,
{
    fn on_chunk(&self, chunk: &ChunkFile) {
        self(chunk)
    }
}
