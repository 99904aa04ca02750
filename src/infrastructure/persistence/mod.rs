//! Persistence Layer - 数据持久化
//!
//! 基于文件系统的音频缓存

pub mod fs_cache;

pub use self::fs_cache::{FileAudioCache, FileCacheConfig};
