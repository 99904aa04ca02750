//! 应用层 - 用例编排
//!
//! 包含：
//! - ports: 六边形架构端口定义（TtsEngine、AudioCache、AudioStitcher 等）
//! - commands: 合成命令及处理器
//! - error: 应用层错误定义

pub mod commands;
pub mod error;
pub mod ports;

// Re-exports
pub use commands::{
    handlers::{SynthesizeHandler, SynthesizeHandlerConfig},
    SynthesizeCommand, SynthesizeResponse,
};

pub use error::ApplicationError;

pub use ports::{
    // Audio cache
    AudioCachePort,
    CacheEntry,
    CacheError,
    CacheStats,
    // Codec
    AudioCodecPort,
    CodecError,
    // Stitcher
    AudioStitcherPort,
    StitchError,
    StitchOptions,
    StitchResult,
    // Directories
    DirectoryProviderPort,
    StorageError,
    // TTS engine
    TtsEnginePort,
    TtsError,
};
