//! 进程内缓存（未配置 Redis 时使用）
//!
//! 基于 moka，按条目设置过期时间；`take` 使用 `remove` 保证取出与删除是原子的。

use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::Expiry;
use moka::future::Cache as MokaCache;
use oleema_errors::AppResult;
use oleema_ports::CachePort;

#[derive(Debug, Clone)]
struct CacheEntry {
    value: String,
    ttl: Option<Duration>,
}

struct EntryExpiry;

impl Expiry<String, CacheEntry> for EntryExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        entry: &CacheEntry,
        _created_at: Instant,
    ) -> Option<Duration> {
        entry.ttl
    }

    fn expire_after_update(
        &self,
        _key: &String,
        entry: &CacheEntry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        entry.ttl
    }
}

/// 进程内缓存
#[derive(Clone)]
pub struct MemoryCache {
    inner: MokaCache<String, CacheEntry>,
}

impl MemoryCache {
    pub fn new(max_capacity: u64) -> Self {
        let inner = MokaCache::builder()
            .max_capacity(max_capacity)
            .expire_after(EntryExpiry)
            .build();
        Self { inner }
    }
}

#[async_trait]
impl CachePort for MemoryCache {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        Ok(self.inner.get(key).await.map(|e| e.value))
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> AppResult<()> {
        self.inner
            .insert(
                key.to_string(),
                CacheEntry {
                    value: value.to_string(),
                    ttl,
                },
            )
            .await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.inner.invalidate(key).await;
        Ok(())
    }

    async fn take(&self, key: &str) -> AppResult<Option<String>> {
        Ok(self.inner.remove(key).await.map(|e| e.value))
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        Ok(self.inner.get(key).await.is_some())
    }

    async fn expire(&self, key: &str, ttl: Duration) -> AppResult<()> {
        if let Some(entry) = self.inner.get(key).await {
            self.inner
                .insert(
                    key.to_string(),
                    CacheEntry {
                        value: entry.value,
                        ttl: Some(ttl),
                    },
                )
                .await;
        }
        Ok(())
    }

    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }
}
