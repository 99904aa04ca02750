//! Application Ports - 出站端口定义
//!
//! 定义应用层与基础设施层的抽象接口

mod audio_cache;
mod audio_codec;
mod audio_stitcher;
mod directory_provider;
mod tts_engine;

pub use audio_cache::{AudioCachePort, CacheEntry, CacheError, CacheStats};
pub use audio_codec::{AudioCodecPort, CodecError};
pub use audio_stitcher::{AudioStitcherPort, StitchError, StitchOptions, StitchResult};
pub use directory_provider::{DirectoryProviderPort, StorageError};
pub use tts_engine::{TtsEnginePort, TtsError};
