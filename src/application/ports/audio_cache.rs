//! Audio Cache Port - 音频缓存管理
//!
//! 定义磁盘音频缓存的抽象接口。
//!
//! 缓存是尽力而为的：初始化失败时降级为禁用状态，
//! 写入失败只记录警告，不会中断调用方的生成流程。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::domain::{EngineSignature, GenerationParams, VoiceParams};

/// Audio Cache 错误
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache is disabled")]
    Disabled,

    #[error("Payload not found: {0}")]
    PayloadNotFound(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("IO error: {0}")]
    IoError(String),
}

impl From<std::io::Error> for CacheError {
    fn from(err: std::io::Error) -> Self {
        CacheError::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::SerializationError(err.to_string())
    }
}

/// 缓存条目
///
/// 时间戳为 Unix 毫秒
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub fingerprint: String,
    pub source_text: String,
    pub voice_id: String,
    pub params: GenerationParams,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine: Option<EngineSignature>,
    pub payload_path: PathBuf,
    pub created_at: i64,
    pub last_accessed_at: i64,
    pub size_bytes: u64,
    /// 单调递增的访问序号，last_accessed_at 相同时用于 LRU 排序
    #[serde(default)]
    pub access_seq: u64,
}

/// 缓存统计信息
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub total_entries: usize,
    pub total_size_bytes: u64,
    pub hit_rate: f64,
}

impl CacheStats {
    /// 命中率，尚无查询时为 0
    pub fn compute_hit_rate(hits: u64, misses: u64) -> f64 {
        let lookups = hits + misses;
        if lookups == 0 {
            0.0
        } else {
            hits as f64 / lookups as f64
        }
    }
}

/// Audio Cache Port
///
/// 以 (文本, 音色, 生成参数) 的指纹为 key 的磁盘缓存
#[async_trait]
pub trait AudioCachePort: Send + Sync {
    /// 建立目录结构、加载索引并清理过期条目
    ///
    /// 不会失败：出错时缓存降级为禁用状态
    async fn initialize(&self);

    /// 查找缓存，命中时返回 payload 路径并刷新访问时间
    async fn get(&self, text: &str, voice: &VoiceParams) -> Option<PathBuf>;

    /// 复制 payload 到缓存并执行容量约束
    ///
    /// 失败只记录警告
    async fn set(&self, text: &str, voice: &VoiceParams, payload: &Path);

    /// 删除单个条目
    async fn remove(&self, text: &str, voice: &VoiceParams);

    /// 删除整个缓存目录并重新初始化
    async fn clear(&self) -> Result<(), CacheError>;

    /// 清理过期条目，返回删除数量
    async fn cleanup(&self) -> usize;

    /// 获取缓存统计信息
    async fn stats(&self) -> CacheStats;

    /// 缓存是否可用
    fn is_enabled(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_rate_without_lookups() {
        assert_eq!(CacheStats::compute_hit_rate(0, 0), 0.0);
    }

    #[test]
    fn test_hit_rate() {
        assert!((CacheStats::compute_hit_rate(3, 1) - 0.75).abs() < f64::EPSILON);
        assert_eq!(CacheStats::compute_hit_rate(0, 4), 0.0);
    }
}
