//! File Storage - 文件系统目录供给
//!
//! 实现 DirectoryProviderPort trait

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::application::ports::{DirectoryProviderPort, StorageError};

/// 文件系统目录供给
#[derive(Debug, Clone)]
pub struct FileDirectoryProvider {
    /// 缓存根目录
    cache_dir: PathBuf,
    /// 输出目录
    output_dir: PathBuf,
    /// 临时目录
    temp_dir: Option<PathBuf>,
}

impl FileDirectoryProvider {
    pub fn new(
        cache_dir: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
        temp_dir: Option<PathBuf>,
    ) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            output_dir: output_dir.into(),
            temp_dir,
        }
    }
}

#[async_trait]
impl DirectoryProviderPort for FileDirectoryProvider {
    fn cache_dir(&self) -> PathBuf {
        self.cache_dir.clone()
    }

    fn output_dir(&self) -> PathBuf {
        self.output_dir.clone()
    }

    fn temp_dir(&self) -> Option<PathBuf> {
        self.temp_dir.clone()
    }

    async fn ensure_dir(&self, path: &Path) -> Result<(), StorageError> {
        fs::create_dir_all(path)
            .await
            .map_err(|e| StorageError::IoError(format!("{}: {}", path.display(), e)))?;

        let metadata = fs::metadata(path)
            .await
            .map_err(|e| StorageError::IoError(e.to_string()))?;
        if metadata.permissions().readonly() {
            return Err(StorageError::NotWritable(path.display().to_string()));
        }

        tracing::debug!(path = %path.display(), "Directory ready");
        Ok(())
    }
}
