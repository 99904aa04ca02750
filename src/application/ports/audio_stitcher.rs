//! Audio Stitcher Port - 音频拼接抽象
//!
//! 将多个独立生成的音频块按顺序拼接为单个音频文件

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::domain::{AudioBuffer, AudioError};

/// 拼接错误
#[derive(Debug, Error)]
pub enum StitchError {
    #[error("Empty input: at least one audio chunk is required")]
    EmptyInput,

    #[error("Sample rate mismatch: chunk {index} is {found} Hz, expected {expected} Hz")]
    SampleRateMismatch {
        index: usize,
        expected: u32,
        found: u32,
    },

    #[error("IO error: {0}")]
    IoError(String),
}

impl From<AudioError> for StitchError {
    fn from(err: AudioError) -> Self {
        match err {
            AudioError::Empty => StitchError::EmptyInput,
            AudioError::SampleRateMismatch {
                index,
                expected,
                found,
            } => StitchError::SampleRateMismatch {
                index,
                expected,
                found,
            },
        }
    }
}

impl From<std::io::Error> for StitchError {
    fn from(err: std::io::Error) -> Self {
        StitchError::IoError(err.to_string())
    }
}

/// 拼接选项
#[derive(Debug, Clone, Default)]
pub struct StitchOptions {
    /// 临时目录，设置后先写入临时文件再移动到目标路径
    pub temp_dir: Option<PathBuf>,
    /// 是否额外保存每个音频块
    pub keep_chunks: bool,
    /// 音频块保存目录，未设置时使用 `<output_stem>_chunks/`
    pub chunk_dir: Option<PathBuf>,
}

/// 拼接结果
#[derive(Debug, Clone, PartialEq)]
pub struct StitchResult {
    pub output_path: PathBuf,
    pub chunk_paths: Vec<PathBuf>,
    pub total_duration_secs: f64,
    pub total_samples: usize,
}

/// Audio Stitcher Port
#[async_trait]
pub trait AudioStitcherPort: Send + Sync {
    async fn stitch(
        &self,
        chunks: &[AudioBuffer],
        output_path: &Path,
        options: &StitchOptions,
    ) -> Result<StitchResult, StitchError>;
}
