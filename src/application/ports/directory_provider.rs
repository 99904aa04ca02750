//! Directory Provider Port - 目录供给
//!
//! 为缓存条目、输出文件和临时文件提供可写目录

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// 存储错误
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Directory not writable: {0}")]
    NotWritable(String),

    #[error("IO error: {0}")]
    IoError(String),
}

/// Directory Provider Port
#[async_trait]
pub trait DirectoryProviderPort: Send + Sync {
    /// 缓存根目录
    fn cache_dir(&self) -> PathBuf;

    /// 最终输出目录
    fn output_dir(&self) -> PathBuf;

    /// 临时目录（用于先写后移）
    fn temp_dir(&self) -> Option<PathBuf>;

    /// 确保目录存在且可写
    async fn ensure_dir(&self, path: &Path) -> Result<(), StorageError>;
}
