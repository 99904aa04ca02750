//! TTS Engine Port - TTS 生成引擎抽象
//!
//! 外部生成引擎被视为黑盒，一次只处理一个请求

use async_trait::async_trait;
use futures_util::stream::{self, BoxStream, StreamExt};
use thiserror::Error;

use crate::domain::{AudioBuffer, EngineSignature, VoiceParams};

/// TTS 错误
#[derive(Debug, Error)]
pub enum TtsError {
    #[error("Generation failed: {0}")]
    GenerationFailed(String),

    #[error("Voice not found: {0}")]
    VoiceNotFound(String),

    #[error("Invalid output: {0}")]
    InvalidOutput(String),

    #[error("Engine unavailable")]
    Unavailable,
}

/// TTS Engine Port
///
/// `generate` 一次性返回完整音频；`generate_stream` 按顺序返回若干音频块
#[async_trait]
pub trait TtsEnginePort: Send + Sync {
    /// 合成整段文本
    async fn generate(&self, text: &str, voice: &VoiceParams) -> Result<AudioBuffer, TtsError>;

    /// 流式合成
    ///
    /// 默认实现把 `generate` 的结果作为唯一的块
    fn generate_stream<'a>(
        &'a self,
        text: &'a str,
        voice: &'a VoiceParams,
    ) -> BoxStream<'a, Result<AudioBuffer, TtsError>> {
        stream::once(self.generate(text, voice)).boxed()
    }

    /// 检查引擎是否可用
    async fn health_check(&self) -> bool {
        true // 默认实现
    }

    /// 输出签名，参与缓存指纹
    ///
    /// 返回 None 时缓存只按文本、音色和生成参数区分
    fn output_signature(&self) -> Option<EngineSignature> {
        None
    }
}
