//! Configuration Loader
//!
//! 实现多源配置加载与合并逻辑
//!
//! 优先级（从高到低）：
//! 1. 环境变量
//! 2. 配置文件（voxstitch.toml）
//! 3. 默认值

use config::{Config, ConfigError as ConfigCrateError, Environment, File};
use std::path::Path;
use thiserror::Error;

use super::types::AppConfig;

/// 配置加载错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigCrateError> for ConfigError {
    fn from(err: ConfigCrateError) -> Self {
        ConfigError::LoadError(err.to_string())
    }
}

/// 配置文件搜索路径
const CONFIG_FILE_NAMES: &[&str] = &["voxstitch", "voxstitch.local"];

/// 加载应用配置
///
/// 按优先级从高到低合并配置：
/// 1. 环境变量（前缀 `VOXSTITCH_`，层级分隔符 `__`）
/// 2. 配置文件（voxstitch.toml 或 voxstitch.local.toml）
/// 3. 默认值
///
/// # 环境变量示例
/// - `VOXSTITCH_CACHE__DIR=/var/cache/voxstitch`
/// - `VOXSTITCH_CACHE__MAX_ENTRIES=5000`
/// - `VOXSTITCH_SEGMENTER__MAX_CHUNK_CHARS=250`
/// - `VOXSTITCH_VOICE__VOICE_ID=af_heart`
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from_path(None)
}

/// 从指定路径加载配置
///
/// # 参数
/// - `config_path` - 可选的配置文件路径，如果为 None 则使用默认搜索路径
pub fn load_config_from_path(config_path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder();

    // 1. 首先设置默认值（最低优先级）
    builder = builder
        .set_default("cache.enabled", true)?
        .set_default("cache.dir", "data/cache")?
        .set_default("cache.max_size_bytes", 500_u64 * 1024 * 1024)?
        .set_default("cache.max_age_ms", 7_u64 * 24 * 60 * 60 * 1000)?
        .set_default("cache.max_entries", 1000)?
        .set_default("segmenter.max_chunk_chars", 400)?
        .set_default("stitcher.keep_chunks", false)?
        .set_default("stitcher.use_temp_dir", true)?
        .set_default("output.dir", "data/outputs")?
        .set_default("output.temp_dir", "data/tmp")?
        .set_default("engine.sample_rate", 24000)?
        .set_default("engine.stream_pieces", 1)?
        .set_default("engine.streaming", false)?
        .set_default("voice.voice_id", "default")?
        .set_default("log.level", "info")?;

    // 2. 添加配置文件（如果存在）
    if let Some(path) = config_path {
        builder = builder.add_source(File::from(path).required(true));
    } else {
        for name in CONFIG_FILE_NAMES {
            builder = builder.add_source(File::with_name(name).required(false));
        }
    }

    // 3. 添加环境变量（最高优先级）
    // 例如: VOXSTITCH_CACHE__ENABLED=false
    builder = builder.add_source(
        Environment::with_prefix("VOXSTITCH")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;

    let app_config: AppConfig = config.try_deserialize().map_err(|e| {
        ConfigError::ParseError(format!("Failed to deserialize config: {}", e))
    })?;

    validate_config(&app_config)?;

    Ok(app_config)
}

/// 验证配置有效性
pub fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    if config.segmenter.max_chunk_chars == 0 {
        return Err(ConfigError::ValidationError(
            "Segmenter max_chunk_chars cannot be 0".to_string(),
        ));
    }

    if config.engine.sample_rate == 0 {
        return Err(ConfigError::ValidationError(
            "Engine sample rate cannot be 0".to_string(),
        ));
    }

    if config.engine.stream_pieces == 0 {
        return Err(ConfigError::ValidationError(
            "Engine stream_pieces cannot be 0".to_string(),
        ));
    }

    if config.voice.voice_id.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "Voice id cannot be empty".to_string(),
        ));
    }

    // 缓存上限为 0 表示不限制，只校验目录
    if config.cache.enabled && config.cache.dir.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "Cache directory cannot be empty when cache is enabled".to_string(),
        ));
    }

    Ok(())
}

/// 打印配置信息（用于启动时日志）
pub fn print_config(config: &AppConfig) {
    tracing::info!("=== Application Configuration ===");
    tracing::info!("Cache Enabled: {}", config.cache.enabled);
    if config.cache.enabled {
        tracing::info!("Cache Directory: {:?}", config.cache.dir);
        tracing::info!("Cache Max Size: {} bytes", config.cache.max_size_bytes);
        tracing::info!("Cache Max Age: {}ms", config.cache.max_age_ms);
        tracing::info!("Cache Max Entries: {}", config.cache.max_entries);
    }
    tracing::info!("Max Chunk Chars: {}", config.segmenter.max_chunk_chars);
    tracing::info!("Keep Chunks: {}", config.stitcher.keep_chunks);
    tracing::info!("Output Directory: {:?}", config.output.dir);
    tracing::info!("Temp Directory: {:?}", config.output.temp_dir);
    tracing::info!("Sample Rate: {} Hz", config.engine.sample_rate);
    tracing::info!("Streaming: {}", config.engine.streaming);
    tracing::info!("Voice: {}", config.voice.voice_id);
    tracing::info!("Log Level: {}", config.log.level);
    tracing::info!("=================================");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_validation_passes_for_valid_config() {
        let config = AppConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validation_error_for_zero_chunk_chars() {
        let mut config = AppConfig::default();
        config.segmenter.max_chunk_chars = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validation_error_for_zero_sample_rate() {
        let mut config = AppConfig::default();
        config.engine.sample_rate = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validation_error_for_empty_voice() {
        let mut config = AppConfig::default();
        config.voice.voice_id = "  ".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_zero_budgets_are_unlimited() {
        let mut config = AppConfig::default();
        config.cache.max_size_bytes = 0;
        config.cache.max_entries = 0;
        config.cache.max_age_ms = 0;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[cache]\nenabled = false\nmax_entries = 10\n\n[segmenter]\nmax_chunk_chars = 120\n\n[voice]\nvoice_id = \"af_heart\"\nspeed = 1.5"
        )
        .unwrap();

        let config = load_config_from_path(Some(file.path())).unwrap();
        assert!(!config.cache.enabled);
        assert_eq!(config.cache.max_entries, 10);
        assert_eq!(config.cache.max_age_ms, 604_800_000);
        assert_eq!(config.segmenter.max_chunk_chars, 120);
        assert_eq!(config.voice.voice_id, "af_heart");
        assert_eq!(config.voice.speed, Some(1.5));
        assert_eq!(config.output.dir, std::path::PathBuf::from("data/outputs"));
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[segmenter]\nmax_chunk_chars = 0").unwrap();

        let err = load_config_from_path(Some(file.path())).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }
}
