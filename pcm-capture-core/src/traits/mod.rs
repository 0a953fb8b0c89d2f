pub mod capture_device;
pub mod chunk_observer;
pub mod recording_engine;
