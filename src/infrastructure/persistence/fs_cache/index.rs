//! 缓存索引
//!
//! 指纹 → 条目元数据的映射，以 JSON 快照持久化。
//! 运行期间内存副本是唯一可信来源，每次变更后写回快照。

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::application::ports::{CacheEntry, CacheError};

/// 缓存目录布局
///
/// ```text
/// <root>/
///   index.json
///   stats.json
///   entries/<fingerprint>/audio.<ext>
///   entries/<fingerprint>/metadata.json
/// ```
#[derive(Debug, Clone)]
pub struct CacheLayout {
    root: PathBuf,
}

impl CacheLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn index_path(&self) -> PathBuf {
        self.root.join("index.json")
    }

    pub fn stats_path(&self) -> PathBuf {
        self.root.join("stats.json")
    }

    pub fn entries_dir(&self) -> PathBuf {
        self.root.join("entries")
    }

    pub fn entry_dir(&self, fingerprint: &str) -> PathBuf {
        self.entries_dir().join(fingerprint)
    }

    pub fn payload_path(&self, fingerprint: &str, extension: &str) -> PathBuf {
        self.entry_dir(fingerprint).join(format!("audio.{}", extension))
    }

    /// 写入中的 payload，提交时 rename 为正式文件
    pub fn staged_payload_path(&self, fingerprint: &str, extension: &str) -> PathBuf {
        self.entry_dir(fingerprint).join(format!("audio.{}.part", extension))
    }

    pub fn metadata_path(&self, fingerprint: &str) -> PathBuf {
        self.entry_dir(fingerprint).join("metadata.json")
    }
}

/// 缓存索引
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheIndex {
    #[serde(default)]
    pub entries: BTreeMap<String, CacheEntry>,
    #[serde(default)]
    pub total_size_bytes: u64,
    #[serde(default)]
    pub last_cleanup_at: Option<i64>,
    #[serde(default)]
    next_access_seq: u64,
}

impl CacheIndex {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, fingerprint: &str) -> Option<&CacheEntry> {
        self.entries.get(fingerprint)
    }

    /// 分配下一个访问序号
    pub fn next_seq(&mut self) -> u64 {
        self.next_access_seq += 1;
        self.next_access_seq
    }

    /// 插入或覆盖条目，同步更新总大小
    pub fn insert(&mut self, mut entry: CacheEntry) -> Option<CacheEntry> {
        entry.access_seq = self.next_seq();
        self.total_size_bytes += entry.size_bytes;
        let previous = self.entries.insert(entry.fingerprint.clone(), entry);
        if let Some(old) = &previous {
            self.total_size_bytes = self.total_size_bytes.saturating_sub(old.size_bytes);
        }
        previous
    }

    /// 删除条目，同步更新总大小
    pub fn remove(&mut self, fingerprint: &str) -> Option<CacheEntry> {
        let removed = self.entries.remove(fingerprint);
        if let Some(entry) = &removed {
            self.total_size_bytes = self.total_size_bytes.saturating_sub(entry.size_bytes);
        }
        removed
    }

    /// 刷新访问时间 (LRU touch)
    pub fn touch(&mut self, fingerprint: &str, now: i64) -> bool {
        let seq = self.next_seq();
        match self.entries.get_mut(fingerprint) {
            Some(entry) => {
                entry.last_accessed_at = now;
                entry.access_seq = seq;
                true
            }
            None => false,
        }
    }

    /// 按条目重新计算总大小
    pub fn reconcile(&mut self) {
        self.total_size_bytes = self.entries.values().map(|e| e.size_bytes).sum();
        let max_seq = self.entries.values().map(|e| e.access_seq).max().unwrap_or(0);
        self.next_access_seq = self.next_access_seq.max(max_seq);
    }

    /// 按最近最少使用排序的指纹（最旧在前）
    pub fn lru_order(&self) -> Vec<String> {
        let mut entries: Vec<&CacheEntry> = self.entries.values().collect();
        entries.sort_by_key(|e| (e.last_accessed_at, e.access_seq));
        entries.into_iter().map(|e| e.fingerprint.clone()).collect()
    }

    /// 创建时间早于 `now - max_age_ms` 的条目
    pub fn expired(&self, now: i64, max_age_ms: u64) -> Vec<String> {
        self.entries
            .values()
            .filter(|e| is_expired(e, now, max_age_ms))
            .map(|e| e.fingerprint.clone())
            .collect()
    }

    /// 加载索引快照
    ///
    /// 快照缺失或损坏时返回空索引
    pub async fn load(path: &Path) -> Self {
        let data = match fs::read(path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No cache index snapshot, starting empty");
                return Self::default();
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read cache index, starting empty");
                return Self::default();
            }
        };

        let mut index: CacheIndex = match serde_json::from_slice(&data) {
            Ok(index) => index,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Corrupt cache index, starting empty");
                return Self::default();
            }
        };

        // key 与条目指纹不一致的记录视为损坏
        index.entries.retain(|key, entry| key == &entry.fingerprint);
        index.reconcile();
        index
    }

    /// 写入索引快照（先写临时文件再重命名）
    pub async fn save(&self, path: &Path) -> Result<(), CacheError> {
        let data = serde_json::to_vec_pretty(self)?;
        write_atomic(path, &data).await
    }
}

/// 条目是否超过最大存活时间，`max_age_ms == 0` 表示不过期
pub fn is_expired(entry: &CacheEntry, now: i64, max_age_ms: u64) -> bool {
    max_age_ms > 0 && now.saturating_sub(entry.created_at) > max_age_ms as i64
}

/// 写入 `<path>.tmp` 后重命名到 `path`
pub async fn write_atomic(path: &Path, data: &[u8]) -> Result<(), CacheError> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, data).await?;
    fs::rename(&tmp, path).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::GenerationParams;
    use tempfile::tempdir;

    fn entry(fingerprint: &str, size_bytes: u64, created_at: i64) -> CacheEntry {
        CacheEntry {
            fingerprint: fingerprint.to_string(),
            source_text: "text".to_string(),
            voice_id: "voice".to_string(),
            params: GenerationParams::default(),
            engine: None,
            payload_path: PathBuf::from(format!("/tmp/{}/audio.wav", fingerprint)),
            created_at,
            last_accessed_at: created_at,
            size_bytes,
            access_seq: 0,
        }
    }

    #[test]
    fn test_insert_and_remove_track_total_size() {
        let mut index = CacheIndex::default();
        index.insert(entry("a", 10, 0));
        index.insert(entry("b", 20, 0));
        assert_eq!(index.total_size_bytes, 30);

        // 覆盖同一指纹
        index.insert(entry("a", 5, 0));
        assert_eq!(index.total_size_bytes, 25);
        assert_eq!(index.len(), 2);

        index.remove("b");
        assert_eq!(index.total_size_bytes, 5);
        assert!(index.remove("missing").is_none());
    }

    #[test]
    fn test_lru_order_breaks_ties_by_sequence() {
        let mut index = CacheIndex::default();
        index.insert(entry("a", 1, 100));
        index.insert(entry("b", 1, 100));
        index.insert(entry("c", 1, 100));

        index.touch("a", 100);
        assert_eq!(index.lru_order(), vec!["b", "c", "a"]);

        index.touch("b", 50);
        assert_eq!(index.lru_order()[0], "b");
    }

    #[test]
    fn test_expired() {
        let mut index = CacheIndex::default();
        index.insert(entry("old", 1, 0));
        index.insert(entry("new", 1, 900));

        assert_eq!(index.expired(1000, 500), vec!["old"]);
        assert!(index.expired(1000, 0).is_empty());
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("index.json");

        let mut index = CacheIndex::default();
        index.insert(entry("a", 10, 1));
        index.last_cleanup_at = Some(42);
        index.save(&path).await.unwrap();

        let loaded = CacheIndex::load(&path).await;
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.total_size_bytes, 10);
        assert_eq!(loaded.last_cleanup_at, Some(42));
        assert_eq!(loaded.get("a"), index.get("a"));
    }

    #[tokio::test]
    async fn test_load_missing_or_corrupt() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("index.json");

        assert!(CacheIndex::load(&path).await.is_empty());

        fs::write(&path, b"{not json").await.unwrap();
        assert!(CacheIndex::load(&path).await.is_empty());
    }

    #[tokio::test]
    async fn test_load_reconciles_total_size() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("index.json");

        let mut index = CacheIndex::default();
        index.insert(entry("a", 10, 1));
        index.insert(entry("b", 7, 1));
        index.total_size_bytes = 999;
        index.save(&path).await.unwrap();

        let loaded = CacheIndex::load(&path).await;
        assert_eq!(loaded.total_size_bytes, 17);
    }
}
