//! File-system LRU Audio Cache Implementation
//!
//! 每个条目一个目录，索引以 JSON 快照保存。
//! 过期检查在读取和初始化时惰性执行，没有后台清理任务。

use async_trait::async_trait;
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::Mutex;

use super::index::{is_expired, write_atomic, CacheIndex, CacheLayout};
use crate::application::ports::{
    AudioCachePort, CacheEntry, CacheError, CacheStats, DirectoryProviderPort,
};
use crate::domain::{derive_fingerprint, VoiceParams};

/// 文件缓存配置
#[derive(Debug, Clone)]
pub struct FileCacheConfig {
    /// 是否启用缓存
    pub enabled: bool,
    /// 最大缓存大小（字节），0 表示不限制
    pub max_size_bytes: u64,
    /// 条目最大存活时间（毫秒），0 表示不过期
    pub max_age_ms: u64,
    /// 最大条目数，0 表示不限制
    pub max_entries: usize,
}

impl Default for FileCacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_size_bytes: 500 * 1024 * 1024, // 500MB
            max_age_ms: 7 * 24 * 60 * 60 * 1000, // 7 天
            max_entries: 1000,
        }
    }
}

/// 文件系统音频缓存
pub struct FileAudioCache {
    config: FileCacheConfig,
    directories: Arc<dyn DirectoryProviderPort>,
    index: Mutex<CacheIndex>,
    enabled: AtomicBool,
    hit_count: AtomicU64,
    miss_count: AtomicU64,
    /// 串行化 stats.json 的后台写入，clear 时持有
    stats_lock: Arc<Mutex<()>>,
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

async fn is_readable_file(path: &Path) -> bool {
    fs::metadata(path).await.map(|m| m.is_file()).unwrap_or(false)
}

impl FileAudioCache {
    /// 创建缓存实例，需调用 `initialize` 后才会启用
    pub fn new(config: FileCacheConfig, directories: Arc<dyn DirectoryProviderPort>) -> Self {
        Self {
            config,
            directories,
            index: Mutex::new(CacheIndex::default()),
            enabled: AtomicBool::new(false),
            hit_count: AtomicU64::new(0),
            miss_count: AtomicU64::new(0),
            stats_lock: Arc::new(Mutex::new(())),
        }
    }

    /// 创建并初始化
    pub async fn open(
        config: FileCacheConfig,
        directories: Arc<dyn DirectoryProviderPort>,
    ) -> Self {
        let cache = Self::new(config, directories);
        cache.initialize().await;
        cache
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    fn layout(&self) -> CacheLayout {
        CacheLayout::new(self.directories.cache_dir())
    }

    async fn try_initialize(&self) -> Result<(), CacheError> {
        let layout = self.layout();

        self.directories
            .ensure_dir(layout.root())
            .await
            .map_err(|e| CacheError::IoError(e.to_string()))?;
        self.directories
            .ensure_dir(&layout.entries_dir())
            .await
            .map_err(|e| CacheError::IoError(e.to_string()))?;

        let mut index = self.index.lock().await;
        *index = CacheIndex::load(&layout.index_path()).await;

        let removed = self.sweep(&mut index, &layout).await;
        index.save(&layout.index_path()).await?;

        tracing::info!(
            cache_dir = %layout.root().display(),
            entries = index.len(),
            total_size_bytes = index.total_size_bytes,
            removed = removed,
            "FileAudioCache initialized"
        );

        Ok(())
    }

    /// 清理过期条目和 payload 丢失的条目
    async fn sweep(&self, index: &mut CacheIndex, layout: &CacheLayout) -> usize {
        let now = now_ms();
        let mut removed = 0;

        for fingerprint in index.expired(now, self.config.max_age_ms) {
            self.evict(index, layout, &fingerprint).await;
            removed += 1;
        }

        let entries: Vec<(String, PathBuf)> = index
            .entries
            .values()
            .map(|e| (e.fingerprint.clone(), e.payload_path.clone()))
            .collect();
        for (fingerprint, payload_path) in entries {
            if !is_readable_file(&payload_path).await {
                tracing::warn!(
                    fingerprint = %fingerprint,
                    path = %payload_path.display(),
                    "Cached payload missing, dropping entry"
                );
                self.evict(index, layout, &fingerprint).await;
                removed += 1;
            }
        }

        index.last_cleanup_at = Some(now);
        removed
    }

    /// 删除条目目录后移除索引记录
    ///
    /// 文件删除失败仍会移除索引记录
    async fn evict(&self, index: &mut CacheIndex, layout: &CacheLayout, fingerprint: &str) {
        let entry_dir = layout.entry_dir(fingerprint);
        match fs::remove_dir_all(&entry_dir).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(
                    fingerprint = %fingerprint,
                    error = %e,
                    "Failed to remove cache entry files"
                );
            }
        }

        if let Some(entry) = index.remove(fingerprint) {
            tracing::debug!(
                fingerprint = %fingerprint,
                size_bytes = entry.size_bytes,
                "Evicted cache entry"
            );
        }
    }

    /// 按 LRU 顺序淘汰，直到大小和数量都在限制内
    async fn enforce_constraints(&self, index: &mut CacheIndex, layout: &CacheLayout) -> usize {
        let mut evicted = 0;

        for fingerprint in index.lru_order() {
            let over_size =
                self.config.max_size_bytes > 0 && index.total_size_bytes > self.config.max_size_bytes;
            let over_count = self.config.max_entries > 0 && index.len() > self.config.max_entries;
            if !over_size && !over_count {
                break;
            }
            self.evict(index, layout, &fingerprint).await;
            evicted += 1;
        }

        if evicted > 0 {
            tracing::debug!(
                evicted = evicted,
                total_size_bytes = index.total_size_bytes,
                entries = index.len(),
                "LRU eviction completed"
            );
        }

        evicted
    }

    async fn persist_index(&self, index: &CacheIndex, layout: &CacheLayout) {
        if let Err(e) = index.save(&layout.index_path()).await {
            tracing::warn!(error = %e, "Failed to persist cache index");
        }
    }

    async fn try_set(
        &self,
        text: &str,
        voice: &VoiceParams,
        payload: &Path,
    ) -> Result<(), CacheError> {
        if !is_readable_file(payload).await {
            return Err(CacheError::PayloadNotFound(payload.display().to_string()));
        }

        let layout = self.layout();
        let fingerprint = derive_fingerprint(text, voice);
        let extension = payload
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("wav");

        let entry_dir = layout.entry_dir(&fingerprint);
        fs::create_dir_all(&entry_dir).await?;

        // 先复制到临时文件，已有条目的 payload 在新条目就绪前保持不变
        let result = self
            .commit_entry(text, voice, &layout, &fingerprint, payload, extension)
            .await;
        if result.is_err() {
            let _ = fs::remove_file(layout.staged_payload_path(&fingerprint, extension)).await;
        }
        result
    }

    async fn commit_entry(
        &self,
        text: &str,
        voice: &VoiceParams,
        layout: &CacheLayout,
        fingerprint: &str,
        payload: &Path,
        extension: &str,
    ) -> Result<(), CacheError> {
        let staged = layout.staged_payload_path(fingerprint, extension);
        let payload_path = layout.payload_path(fingerprint, extension);
        let size_bytes = fs::copy(payload, &staged).await?;

        let now = now_ms();
        let entry = CacheEntry {
            fingerprint: fingerprint.to_string(),
            source_text: text.to_string(),
            voice_id: voice.voice_id.clone(),
            params: voice.params,
            engine: voice.engine.clone(),
            payload_path,
            created_at: now,
            last_accessed_at: now,
            size_bytes,
            access_seq: 0,
        };

        let metadata = serde_json::to_vec_pretty(&entry)?;
        write_atomic(&layout.metadata_path(fingerprint), &metadata).await?;

        let mut index = self.index.lock().await;
        fs::rename(&staged, &entry.payload_path).await?;
        index.insert(entry);
        self.enforce_constraints(&mut index, layout).await;
        index.save(&layout.index_path()).await?;

        tracing::debug!(
            fingerprint = %fingerprint,
            size_bytes = size_bytes,
            total_size_bytes = index.total_size_bytes,
            "Audio cached"
        );

        Ok(())
    }

    fn record_hit(&self, index: &CacheIndex) {
        self.hit_count.fetch_add(1, Ordering::Relaxed);
        self.schedule_stats_save(index);
    }

    fn record_miss(&self, index: &CacheIndex) {
        self.miss_count.fetch_add(1, Ordering::Relaxed);
        self.schedule_stats_save(index);
    }

    fn snapshot(&self, index: &CacheIndex) -> CacheStats {
        let hits = self.hit_count.load(Ordering::Relaxed);
        let misses = self.miss_count.load(Ordering::Relaxed);
        CacheStats {
            hits,
            misses,
            total_entries: index.len(),
            total_size_bytes: index.total_size_bytes,
            hit_rate: CacheStats::compute_hit_rate(hits, misses),
        }
    }

    /// 后台写入 stats.json，失败不影响读路径
    fn schedule_stats_save(&self, index: &CacheIndex) {
        let stats = self.snapshot(index);
        let path = self.layout().stats_path();
        let lock = self.stats_lock.clone();

        tokio::spawn(async move {
            let _guard = lock.lock().await;
            let result = match serde_json::to_vec_pretty(&stats) {
                Ok(data) => fs::write(&path, data).await.map_err(CacheError::from),
                Err(e) => Err(CacheError::from(e)),
            };
            if let Err(e) = result {
                tracing::debug!(path = %path.display(), error = %e, "Stats snapshot not saved");
            }
        });
    }
}

#[async_trait]
impl AudioCachePort for FileAudioCache {
    async fn initialize(&self) {
        if !self.config.enabled {
            self.enabled.store(false, Ordering::SeqCst);
            tracing::info!("Audio cache disabled by configuration");
            return;
        }

        match self.try_initialize().await {
            Ok(()) => self.enabled.store(true, Ordering::SeqCst),
            Err(e) => {
                self.enabled.store(false, Ordering::SeqCst);
                tracing::warn!(
                    cache_dir = %self.directories.cache_dir().display(),
                    error = %e,
                    "Audio cache initialization failed, continuing without cache"
                );
            }
        }
    }

    async fn get(&self, text: &str, voice: &VoiceParams) -> Option<PathBuf> {
        if !self.is_enabled() {
            return None;
        }

        let layout = self.layout();
        let fingerprint = derive_fingerprint(text, voice);
        let mut index = self.index.lock().await;

        let Some(entry) = index.get(&fingerprint).cloned() else {
            tracing::debug!(fingerprint = %fingerprint, "Cache miss");
            self.record_miss(&index);
            return None;
        };

        let now = now_ms();
        if is_expired(&entry, now, self.config.max_age_ms) {
            tracing::debug!(fingerprint = %fingerprint, "Cache entry expired");
            self.evict(&mut index, &layout, &fingerprint).await;
            self.persist_index(&index, &layout).await;
            self.record_miss(&index);
            return None;
        }

        if !is_readable_file(&entry.payload_path).await {
            tracing::warn!(
                fingerprint = %fingerprint,
                path = %entry.payload_path.display(),
                "Cached payload missing, dropping entry"
            );
            self.evict(&mut index, &layout, &fingerprint).await;
            self.persist_index(&index, &layout).await;
            self.record_miss(&index);
            return None;
        }

        index.touch(&fingerprint, now);
        self.persist_index(&index, &layout).await;
        self.record_hit(&index);

        tracing::debug!(fingerprint = %fingerprint, "Cache hit");
        Some(entry.payload_path)
    }

    async fn set(&self, text: &str, voice: &VoiceParams, payload: &Path) {
        if !self.is_enabled() {
            return;
        }

        if let Err(e) = self.try_set(text, voice, payload).await {
            tracing::warn!(
                voice_id = %voice.voice_id,
                payload = %payload.display(),
                error = %e,
                "Failed to cache audio, continuing uncached"
            );
        }
    }

    async fn remove(&self, text: &str, voice: &VoiceParams) {
        if !self.is_enabled() {
            return;
        }

        let layout = self.layout();
        let fingerprint = derive_fingerprint(text, voice);
        let mut index = self.index.lock().await;

        if index.get(&fingerprint).is_some() {
            self.evict(&mut index, &layout, &fingerprint).await;
            self.persist_index(&index, &layout).await;
        }
    }

    async fn clear(&self) -> Result<(), CacheError> {
        if !self.config.enabled {
            return Ok(());
        }

        let layout = self.layout();
        {
            let _stats_guard = self.stats_lock.lock().await;
            let mut index = self.index.lock().await;

            match fs::remove_dir_all(layout.root()).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }

            *index = CacheIndex::default();
            self.hit_count.store(0, Ordering::Relaxed);
            self.miss_count.store(0, Ordering::Relaxed);
        }

        tracing::info!(cache_dir = %layout.root().display(), "Audio cache cleared");

        self.initialize().await;
        Ok(())
    }

    async fn cleanup(&self) -> usize {
        if !self.is_enabled() {
            return 0;
        }

        let layout = self.layout();
        let mut index = self.index.lock().await;
        let removed = self.sweep(&mut index, &layout).await;
        self.persist_index(&index, &layout).await;

        if removed > 0 {
            tracing::info!(removed = removed, "Cache cleanup removed entries");
        }
        removed
    }

    async fn stats(&self) -> CacheStats {
        let index = self.index.lock().await;
        self.snapshot(&index)
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }
}
