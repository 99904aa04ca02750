//! Synthesize Command Handlers
//!
//! 分段 → 逐段查缓存/生成 → 拼接

use futures_util::StreamExt;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs;
use uuid::Uuid;

use crate::application::commands::{SynthesizeCommand, SynthesizeResponse};
use crate::application::error::ApplicationError;
use crate::application::ports::{
    AudioCachePort, AudioCodecPort, AudioStitcherPort, DirectoryProviderPort, StitchOptions,
    TtsEnginePort, TtsError,
};
use crate::domain::{concat, segment_text, AudioBuffer, SegmentConfig, TextChunk, VoiceParams};

/// Handler 配置
#[derive(Debug, Clone, Default)]
pub struct SynthesizeHandlerConfig {
    /// 分段配置
    pub segment: SegmentConfig,
    /// 音频块保存目录
    pub chunk_dir: Option<PathBuf>,
}

/// Synthesize Handler - 长文本合成
///
/// 按分段顺序串行处理，生成引擎一次只处理一个片段
pub struct SynthesizeHandler {
    config: SynthesizeHandlerConfig,
    cache: Arc<dyn AudioCachePort>,
    tts_engine: Arc<dyn TtsEnginePort>,
    stitcher: Arc<dyn AudioStitcherPort>,
    codec: Arc<dyn AudioCodecPort>,
    directories: Arc<dyn DirectoryProviderPort>,
}

impl SynthesizeHandler {
    pub fn new(
        config: SynthesizeHandlerConfig,
        cache: Arc<dyn AudioCachePort>,
        tts_engine: Arc<dyn TtsEnginePort>,
        stitcher: Arc<dyn AudioStitcherPort>,
        codec: Arc<dyn AudioCodecPort>,
        directories: Arc<dyn DirectoryProviderPort>,
    ) -> Self {
        Self {
            config,
            cache,
            tts_engine,
            stitcher,
            codec,
            directories,
        }
    }

    pub async fn handle(&self, cmd: SynthesizeCommand) -> Result<SynthesizeResponse, ApplicationError> {
        let chunks = segment_text(&cmd.text, &self.config.segment);
        if chunks.is_empty() {
            return Err(ApplicationError::validation("Input text is empty"));
        }

        // 引擎签名进入缓存指纹，切换引擎或采样率后不会命中旧音频
        let voice = match self.tts_engine.output_signature() {
            Some(signature) => cmd.voice.clone().with_engine(signature),
            None => cmd.voice.clone(),
        };

        tracing::info!(
            chunks = chunks.len(),
            voice_id = %voice.voice_id,
            streaming = cmd.streaming,
            "Synthesizing text"
        );

        let mut buffers = Vec::with_capacity(chunks.len());
        let mut cache_hits = 0;
        let mut generated = 0;
        let mut engine_checked = false;

        for chunk in &chunks {
            if let Some(buffer) = self.load_cached(chunk, &voice).await {
                tracing::debug!(chunk_index = chunk.index, "Using cached audio");
                cache_hits += 1;
                buffers.push(buffer);
                continue;
            }

            // 首次未命中时才检查引擎，全部命中的任务不依赖引擎
            if !engine_checked {
                if !self.tts_engine.health_check().await {
                    tracing::error!(chunk_index = chunk.index, "TTS engine unavailable");
                    return Err(ApplicationError::generation(chunk.index, TtsError::Unavailable));
                }
                engine_checked = true;
            }

            let buffer = self
                .generate(chunk, &voice, cmd.streaming)
                .await
                .map_err(|e| {
                    tracing::error!(chunk_index = chunk.index, error = %e, "Generation failed");
                    ApplicationError::generation(chunk.index, e)
                })?;

            self.store(chunk, &voice, &buffer).await;
            generated += 1;
            buffers.push(buffer);
        }

        let options = StitchOptions {
            temp_dir: self.directories.temp_dir(),
            keep_chunks: cmd.keep_chunks,
            chunk_dir: self.config.chunk_dir.clone(),
        };
        let stitch = self
            .stitcher
            .stitch(&buffers, &cmd.output_path, &options)
            .await?;

        tracing::info!(
            output = %stitch.output_path.display(),
            cache_hits = cache_hits,
            generated = generated,
            duration_secs = stitch.total_duration_secs,
            "Synthesis complete"
        );

        Ok(SynthesizeResponse {
            stitch,
            chunk_count: chunks.len(),
            cache_hits,
            generated,
        })
    }

    /// 读取缓存，payload 无法读取或解码时删除条目并按未命中处理
    async fn load_cached(&self, chunk: &TextChunk, voice: &VoiceParams) -> Option<AudioBuffer> {
        let path = self.cache.get(&chunk.content, voice).await?;

        let decoded = match fs::read(&path).await {
            Ok(data) => self.codec.decode(&data).map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };

        match decoded {
            Ok(buffer) => Some(buffer),
            Err(e) => {
                tracing::warn!(
                    chunk_index = chunk.index,
                    path = %path.display(),
                    error = %e,
                    "Cached payload unreadable, regenerating"
                );
                self.cache.remove(&chunk.content, voice).await;
                None
            }
        }
    }

    /// 生成单个片段
    ///
    /// 流式模式下按顺序拼接所有块
    async fn generate(
        &self,
        chunk: &TextChunk,
        voice: &VoiceParams,
        streaming: bool,
    ) -> Result<AudioBuffer, TtsError> {
        if !streaming {
            return self.tts_engine.generate(&chunk.content, voice).await;
        }

        let mut stream = self.tts_engine.generate_stream(&chunk.content, voice);
        let mut pieces = Vec::new();
        while let Some(piece) = stream.next().await {
            pieces.push(piece?);
        }

        tracing::debug!(
            chunk_index = chunk.index,
            pieces = pieces.len(),
            "Collected streamed audio"
        );

        concat(&pieces).map_err(|e| TtsError::InvalidOutput(e.to_string()))
    }

    /// 写入临时文件后交给缓存复制，失败只记录警告
    async fn store(&self, chunk: &TextChunk, voice: &VoiceParams, buffer: &AudioBuffer) {
        if !self.cache.is_enabled() {
            return;
        }

        let scratch_dir = self
            .directories
            .temp_dir()
            .unwrap_or_else(std::env::temp_dir);
        if let Err(e) = self.directories.ensure_dir(&scratch_dir).await {
            tracing::warn!(error = %e, "No scratch directory, skipping cache write");
            return;
        }

        let scratch = scratch_dir.join(format!(
            "gen-{}.{}",
            Uuid::new_v4(),
            self.codec.extension()
        ));
        if let Err(e) = fs::write(&scratch, self.codec.encode(buffer)).await {
            tracing::warn!(
                chunk_index = chunk.index,
                error = %e,
                "Failed to write scratch payload, skipping cache write"
            );
            return;
        }

        self.cache.set(&chunk.content, voice, &scratch).await;

        if let Err(e) = fs::remove_file(&scratch).await {
            tracing::debug!(path = %scratch.display(), error = %e, "Failed to remove scratch payload");
        }
    }
}
