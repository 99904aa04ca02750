//! 文件系统音频缓存

mod audio_cache;
mod index;

pub use audio_cache::{FileAudioCache, FileCacheConfig};
pub use index::{CacheIndex, CacheLayout};
