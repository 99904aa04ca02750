//! Audio Codec Port - 音频编解码抽象
//!
//! 缓存 payload 以 WAV 存储，读取时需要解码回 `AudioBuffer`

use thiserror::Error;

use crate::domain::AudioBuffer;

/// 编解码错误
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Decoding error: {0}")]
    DecodingError(String),
}

/// Audio Codec Port
pub trait AudioCodecPort: Send + Sync {
    /// payload 文件扩展名
    fn extension(&self) -> &'static str;

    /// 编码为容器字节
    fn encode(&self, buffer: &AudioBuffer) -> Vec<u8>;

    /// 解码容器字节，多声道会被混为单声道
    fn decode(&self, data: &[u8]) -> Result<AudioBuffer, CodecError>;
}
