//! Domain Layer - 领域层
//!
//! 纯逻辑，无 I/O 依赖（`AudioBuffer::persist` 除外）:
//! - fingerprint: 缓存指纹
//! - text_segmenter: 文本分段
//! - audio: 音频缓冲区、拼接与 WAV 编码

pub mod audio;
pub mod fingerprint;
mod text_segmenter;

pub use audio::{concat, encode_wav, AudioBuffer, AudioError};
pub use fingerprint::{
    derive_fingerprint, EngineSignature, GenerationParams, NormalizedParams, VoiceParams,
};
pub use text_segmenter::{
    segment_text, segment_text_default, SegmentConfig, TextChunk, DEFAULT_MAX_CHUNK_CHARS,
};
