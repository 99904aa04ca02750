//! Configuration Types
//!
//! 定义所有配置结构体

use serde::Deserialize;
use std::path::PathBuf;

use crate::domain::{GenerationParams, SegmentConfig, VoiceParams, DEFAULT_MAX_CHUNK_CHARS};
use crate::infrastructure::adapters::FakeTtsClientConfig;
use crate::infrastructure::persistence::FileCacheConfig;

/// 应用主配置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// 缓存配置
    #[serde(default)]
    pub cache: CacheConfig,

    /// 分段配置
    #[serde(default)]
    pub segmenter: SegmenterConfig,

    /// 拼接配置
    #[serde(default)]
    pub stitcher: StitcherConfig,

    /// 输出目录配置
    #[serde(default)]
    pub output: OutputConfig,

    /// TTS 引擎配置
    #[serde(default)]
    pub engine: EngineConfig,

    /// 默认音色
    #[serde(default)]
    pub voice: VoiceConfig,

    /// 日志配置
    #[serde(default)]
    pub log: LogConfig,
}

/// 缓存配置
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// 是否启用缓存
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,

    /// 缓存根目录
    #[serde(default = "default_cache_dir")]
    pub dir: PathBuf,

    /// 最大缓存大小（字节），0 表示不限制
    #[serde(default = "default_cache_max_size")]
    pub max_size_bytes: u64,

    /// 条目最大存活时间（毫秒），0 表示不过期
    #[serde(default = "default_cache_max_age")]
    pub max_age_ms: u64,

    /// 最大条目数，0 表示不限制
    #[serde(default = "default_cache_max_entries")]
    pub max_entries: usize,
}

fn default_cache_enabled() -> bool {
    true
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("data/cache")
}

fn default_cache_max_size() -> u64 {
    500 * 1024 * 1024 // 500 MB
}

fn default_cache_max_age() -> u64 {
    7 * 24 * 60 * 60 * 1000 // 7 天
}

fn default_cache_max_entries() -> usize {
    1000
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
            dir: default_cache_dir(),
            max_size_bytes: default_cache_max_size(),
            max_age_ms: default_cache_max_age(),
            max_entries: default_cache_max_entries(),
        }
    }
}

impl CacheConfig {
    pub fn to_file_cache_config(&self) -> FileCacheConfig {
        FileCacheConfig {
            enabled: self.enabled,
            max_size_bytes: self.max_size_bytes,
            max_age_ms: self.max_age_ms,
            max_entries: self.max_entries,
        }
    }
}

/// 分段配置
#[derive(Debug, Clone, Deserialize)]
pub struct SegmenterConfig {
    /// 单个片段最大字符数
    #[serde(default = "default_max_chunk_chars")]
    pub max_chunk_chars: usize,
}

fn default_max_chunk_chars() -> usize {
    DEFAULT_MAX_CHUNK_CHARS
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            max_chunk_chars: default_max_chunk_chars(),
        }
    }
}

impl SegmenterConfig {
    pub fn to_segment_config(&self) -> SegmentConfig {
        SegmentConfig {
            max_chunk_chars: self.max_chunk_chars,
        }
    }
}

/// 拼接配置
#[derive(Debug, Clone, Deserialize)]
pub struct StitcherConfig {
    /// 是否额外保存每个音频块
    #[serde(default)]
    pub keep_chunks: bool,

    /// 音频块保存目录，未设置时为 `<输出文件名>_chunks`
    #[serde(default)]
    pub chunk_dir: Option<PathBuf>,

    /// 先写入临时目录再移动到输出位置
    #[serde(default = "default_use_temp_dir")]
    pub use_temp_dir: bool,
}

fn default_use_temp_dir() -> bool {
    true
}

impl Default for StitcherConfig {
    fn default() -> Self {
        Self {
            keep_chunks: false,
            chunk_dir: None,
            use_temp_dir: default_use_temp_dir(),
        }
    }
}

/// 输出目录配置
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// 默认输出目录
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,

    /// 临时文件目录
    #[serde(default = "default_temp_dir")]
    pub temp_dir: PathBuf,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("data/outputs")
}

fn default_temp_dir() -> PathBuf {
    PathBuf::from("data/tmp")
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            temp_dir: default_temp_dir(),
        }
    }
}

/// TTS 引擎配置
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// 采样率（Hz）
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// 流式生成时每个片段拆分的块数
    #[serde(default = "default_stream_pieces")]
    pub stream_pieces: usize,

    /// 是否使用流式生成
    #[serde(default)]
    pub streaming: bool,
}

fn default_sample_rate() -> u32 {
    24000
}

fn default_stream_pieces() -> usize {
    1
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            stream_pieces: default_stream_pieces(),
            streaming: false,
        }
    }
}

impl EngineConfig {
    pub fn to_fake_client_config(&self) -> FakeTtsClientConfig {
        FakeTtsClientConfig {
            sample_rate: self.sample_rate,
            stream_pieces: self.stream_pieces,
            ..Default::default()
        }
    }
}

/// 默认音色配置
#[derive(Debug, Clone, Deserialize)]
pub struct VoiceConfig {
    /// 音色 ID
    #[serde(default = "default_voice_id")]
    pub voice_id: String,

    #[serde(default)]
    pub speed: Option<f32>,

    #[serde(default)]
    pub temperature: Option<f32>,

    #[serde(default)]
    pub top_p: Option<f32>,
}

fn default_voice_id() -> String {
    "default".to_string()
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            voice_id: default_voice_id(),
            speed: None,
            temperature: None,
            top_p: None,
        }
    }
}

impl VoiceConfig {
    pub fn to_voice_params(&self) -> VoiceParams {
        VoiceParams::new(self.voice_id.clone()).with_params(GenerationParams {
            speed: self.speed,
            temperature: self.temperature,
            top_p: self.top_p,
        })
    }
}

/// 日志配置
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert!(config.cache.enabled);
        assert_eq!(config.cache.dir, PathBuf::from("data/cache"));
        assert_eq!(config.cache.max_size_bytes, 500 * 1024 * 1024);
        assert_eq!(config.cache.max_age_ms, 604_800_000);
        assert_eq!(config.cache.max_entries, 1000);
        assert_eq!(config.segmenter.max_chunk_chars, 400);
        assert!(config.stitcher.use_temp_dir);
        assert_eq!(config.engine.sample_rate, 24000);
        assert_eq!(config.voice.voice_id, "default");
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn test_cache_config_conversion() {
        let config = CacheConfig {
            enabled: false,
            max_entries: 3,
            ..Default::default()
        };
        let file_config = config.to_file_cache_config();
        assert!(!file_config.enabled);
        assert_eq!(file_config.max_entries, 3);
        assert_eq!(file_config.max_size_bytes, config.max_size_bytes);
    }

    #[test]
    fn test_voice_params_conversion() {
        let config = VoiceConfig {
            voice_id: "af_heart".to_string(),
            speed: Some(1.25),
            ..Default::default()
        };
        let voice = config.to_voice_params();
        assert_eq!(voice.voice_id, "af_heart");
        assert_eq!(voice.params.speed, Some(1.25));
        assert_eq!(voice.params.temperature, None);
    }
}
