//! TTS Adapter - 生成引擎实现

mod fake_tts_client;

pub use fake_tts_client::{FakeTtsClient, FakeTtsClientConfig};
