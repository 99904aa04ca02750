//! 应用层错误定义
//!
//! 统一的命令错误类型

use thiserror::Error;

use crate::application::ports::{StitchError, StorageError, TtsError};

/// 应用层错误
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// 验证错误
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// 生成引擎错误，整个任务中止
    #[error("Generation failed for chunk {chunk_index}: {source}")]
    GenerationError {
        chunk_index: usize,
        #[source]
        source: TtsError,
    },

    /// 拼接错误
    #[error("Stitching failed: {0}")]
    StitchError(#[from] StitchError),

    /// 存储错误
    #[error("Storage error: {0}")]
    StorageError(String),
}

impl ApplicationError {
    /// 创建验证错误
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError(message.into())
    }

    /// 创建生成错误
    pub fn generation(chunk_index: usize, source: TtsError) -> Self {
        Self::GenerationError {
            chunk_index,
            source,
        }
    }
}

impl From<StorageError> for ApplicationError {
    fn from(err: StorageError) -> Self {
        Self::StorageError(err.to_string())
    }
}

impl From<std::io::Error> for ApplicationError {
    fn from(err: std::io::Error) -> Self {
        Self::StorageError(err.to_string())
    }
}
