pub mod capture_session;
pub mod pcm_engine;
