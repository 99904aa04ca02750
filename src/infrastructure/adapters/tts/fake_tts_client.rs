//! Fake TTS Client - 用于测试和演示的 TTS 引擎
//!
//! 不调用真实模型，按文本长度生成确定性的正弦音

use async_trait::async_trait;
use futures_util::stream::{self, BoxStream, StreamExt};
use std::f32::consts::PI;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::application::ports::{TtsEnginePort, TtsError};
use crate::domain::{AudioBuffer, EngineSignature, VoiceParams};

/// Fake TTS Client 配置
#[derive(Debug, Clone)]
pub struct FakeTtsClientConfig {
    /// 采样率
    pub sample_rate: u32,
    /// 每个字符对应的样本数（语速 1.0 时）
    pub samples_per_char: usize,
    /// 流式生成时拆分的块数
    pub stream_pieces: usize,
}

impl Default for FakeTtsClientConfig {
    fn default() -> Self {
        Self {
            sample_rate: 24000,
            samples_per_char: 1200, // 约 20 字符/秒
            stream_pieces: 1,
        }
    }
}

/// Fake TTS Client
///
/// 音高由音色 ID 决定，时长由字符数和语速决定
pub struct FakeTtsClient {
    config: FakeTtsClientConfig,
    calls: AtomicUsize,
}

impl FakeTtsClient {
    pub fn new(config: FakeTtsClientConfig) -> Self {
        tracing::info!(
            sample_rate = config.sample_rate,
            stream_pieces = config.stream_pieces,
            "FakeTtsClient initialized"
        );
        Self {
            config,
            calls: AtomicUsize::new(0),
        }
    }

    /// 使用默认配置创建
    pub fn with_defaults() -> Self {
        Self::new(FakeTtsClientConfig::default())
    }

    /// 已执行的生成次数
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn frequency(voice_id: &str) -> f32 {
        let seed: u32 = voice_id.bytes().map(u32::from).sum();
        220.0 + (seed % 220) as f32
    }

    fn synthesize(&self, text: &str, voice: &VoiceParams) -> Result<AudioBuffer, TtsError> {
        if voice.voice_id.is_empty() {
            return Err(TtsError::VoiceNotFound("<empty>".to_string()));
        }

        let speed = voice.params.normalized().speed;
        if !(speed > 0.0) {
            return Err(TtsError::GenerationFailed(format!("Invalid speed: {}", speed)));
        }

        let chars = text.chars().count().max(1);
        let len = ((chars * self.config.samples_per_char) as f32 / speed).ceil() as usize;
        let freq = Self::frequency(&voice.voice_id);
        let rate = self.config.sample_rate as f32;

        let samples = (0..len)
            .map(|i| 0.3 * (2.0 * PI * freq * i as f32 / rate).sin())
            .collect();

        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(AudioBuffer::new(samples, self.config.sample_rate))
    }
}

#[async_trait]
impl TtsEnginePort for FakeTtsClient {
    async fn generate(&self, text: &str, voice: &VoiceParams) -> Result<AudioBuffer, TtsError> {
        tracing::debug!(
            text_len = text.len(),
            voice_id = %voice.voice_id,
            "FakeTtsClient: generating tone"
        );
        self.synthesize(text, voice)
    }

    fn output_signature(&self) -> Option<EngineSignature> {
        Some(EngineSignature::new(
            format!("fake-tone/{}", self.config.samples_per_char),
            self.config.sample_rate,
        ))
    }

    fn generate_stream<'a>(
        &'a self,
        text: &'a str,
        voice: &'a VoiceParams,
    ) -> BoxStream<'a, Result<AudioBuffer, TtsError>> {
        let buffer = match self.synthesize(text, voice) {
            Ok(buffer) => buffer,
            Err(e) => return stream::once(async move { Err(e) }).boxed(),
        };

        let pieces = self.config.stream_pieces.max(1);
        let piece_len = (buffer.len() + pieces - 1) / pieces;
        let sample_rate = buffer.sample_rate;
        let chunks: Vec<Result<AudioBuffer, TtsError>> = buffer
            .samples
            .chunks(piece_len.max(1))
            .map(|c| Ok(AudioBuffer::new(c.to_vec(), sample_rate)))
            .collect();

        stream::iter(chunks).boxed()
    }
}
