//! VoxStitch - 长文本语音合成
//!
//! 用法:
//! - `voxstitch <input.txt> [output.wav]` 合成文本文件
//! - `voxstitch --stats` 打印缓存统计
//! - `voxstitch --clear-cache` 清空缓存

use std::path::{Path, PathBuf};
use std::sync::Arc;

use voxstitch::application::ports::{AudioCachePort, CacheStats, DirectoryProviderPort};
use voxstitch::application::{SynthesizeCommand, SynthesizeHandler, SynthesizeHandlerConfig};
use voxstitch::config::{load_config, print_config};
use voxstitch::infrastructure::adapters::{
    FakeTtsClient, FileDirectoryProvider, WavCodec, WavStitcher,
};
use voxstitch::infrastructure::persistence::FileAudioCache;

const USAGE: &str = "usage: voxstitch <input.txt> [output.wav] | --stats | --clear-cache";

enum Mode {
    Synthesize { input: PathBuf, output: Option<PathBuf> },
    Stats,
    ClearCache,
}

fn parse_args(args: &[String]) -> anyhow::Result<Mode> {
    match args {
        [flag] if flag == "--stats" => Ok(Mode::Stats),
        [flag] if flag == "--clear-cache" => Ok(Mode::ClearCache),
        [input] if !input.starts_with("--") => Ok(Mode::Synthesize {
            input: PathBuf::from(input),
            output: None,
        }),
        [input, output] if !input.starts_with("--") => Ok(Mode::Synthesize {
            input: PathBuf::from(input),
            output: Some(PathBuf::from(output)),
        }),
        _ => Err(anyhow::anyhow!(USAGE)),
    }
}

/// 未指定输出路径时使用 `<输出目录>/<输入文件名>.wav`
fn default_output_path(output_dir: &Path, input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    output_dir.join(format!("{}.wav", stem))
}

/// 缓存统计报告
///
/// 命中/未命中计数只属于当前进程，`--stats` 只报告持久化的内容
fn format_stats(stats: &CacheStats, cache_dir: &Path) -> String {
    format!(
        "cache dir:  {}\nentries:    {}\nsize:       {} bytes",
        cache_dir.display(),
        stats.total_entries,
        stats.total_size_bytes
    )
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 加载配置（优先级：环境变量 > 配置文件 > 默认值）
    let config = load_config().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

    // 初始化日志
    let log_filter = format!("{},voxstitch={}", config.log.level, config.log.level);
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_filter)),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let mode = parse_args(&args)?;

    print_config(&config);

    let temp_dir = config
        .stitcher
        .use_temp_dir
        .then(|| config.output.temp_dir.clone());
    let directories: Arc<dyn DirectoryProviderPort> = Arc::new(FileDirectoryProvider::new(
        config.cache.dir.clone(),
        config.output.dir.clone(),
        temp_dir,
    ));

    let cache = FileAudioCache::open(config.cache.to_file_cache_config(), directories.clone())
        .await
        .arc();
    if config.cache.enabled && !cache.is_enabled() {
        tracing::warn!("Cache unavailable, continuing without cache");
    }

    match mode {
        Mode::Stats => {
            let stats = cache.stats().await;
            println!("{}", format_stats(&stats, &directories.cache_dir()));
        }
        Mode::ClearCache => {
            cache.clear().await?;
            tracing::info!(dir = %config.cache.dir.display(), "Cache cleared");
        }
        Mode::Synthesize { input, output } => {
            let text = tokio::fs::read_to_string(&input).await?;
            let output_path =
                output.unwrap_or_else(|| default_output_path(&directories.output_dir(), &input));

            let handler = SynthesizeHandler::new(
                SynthesizeHandlerConfig {
                    segment: config.segmenter.to_segment_config(),
                    chunk_dir: config.stitcher.chunk_dir.clone(),
                },
                cache.clone(),
                Arc::new(FakeTtsClient::new(config.engine.to_fake_client_config())),
                Arc::new(WavStitcher::new()),
                Arc::new(WavCodec::new()),
                directories,
            );

            let mut cmd = SynthesizeCommand::new(text, config.voice.to_voice_params(), output_path);
            cmd.keep_chunks = config.stitcher.keep_chunks;
            cmd.streaming = config.engine.streaming;

            let response = handler.handle(cmd).await?;

            tracing::info!(
                output = %response.stitch.output_path.display(),
                chunks = response.chunk_count,
                cache_hits = response.cache_hits,
                generated = response.generated,
                duration_secs = response.stitch.total_duration_secs,
                "Done"
            );
        }
    }

    Ok(())
}
