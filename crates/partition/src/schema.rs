use dashmap::DashSet;
use std::sync::Arc;
use strata_core::config::EngineConfig;
use strata_core::partition::entity::{OHLCV_LAYOUT, PartitionId};
use strata_core::store::error::StoreError;
use strata_core::store::port::PartitionBackend;
use tracing::{debug, info, warn};

/// # Summary
/// 进程内已知存在的分区集合。
///
/// # Invariants
/// - 只记录确认存在过的分区；未命中时调用方必须回源查询，绝不据此判定“不存在”。
/// - 条目数达到上限时整体清空。
pub struct PartitionCache {
    known: DashSet<PartitionId>,
    capacity: usize,
}

impl PartitionCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            known: DashSet::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn contains(&self, id: &PartitionId) -> bool {
        self.known.contains(id)
    }

    pub fn insert(&self, id: &PartitionId) {
        if self.known.len() >= self.capacity {
            debug!("Partition cache full ({} entries), clearing", self.known.len());
            self.known.clear();
        }
        self.known.insert(id.clone());
    }

    pub fn invalidate(&self, id: &PartitionId) {
        self.known.remove(id);
    }

    pub fn len(&self) -> usize {
        self.known.len()
    }

    pub fn is_empty(&self) -> bool {
        self.known.is_empty()
    }
}

/// # Summary
/// 负责在数据写入之前确保分区表存在。
///
/// # Invariants
/// - `ensure_partition` 幂等：对已存在的分区重复调用不会报错。
/// - 缓存关闭时每次调用都实时查询分区列表。
pub struct SchemaManager {
    backend: Arc<dyn PartitionBackend>,
    cache: Option<PartitionCache>,
}

impl SchemaManager {
    /// # Summary
    /// 创建 Schema Manager。
    ///
    /// # Arguments
    /// * `backend`: 分区存储后端。
    /// * `config`: 引擎配置，决定是否启用分区缓存及其容量。
    pub fn new(backend: Arc<dyn PartitionBackend>, config: &EngineConfig) -> Self {
        let cache = config
            .partition_cache
            .then(|| PartitionCache::new(config.partition_cache_capacity));
        Self { backend, cache }
    }

    pub fn cache(&self) -> Option<&PartitionCache> {
        self.cache.as_ref()
    }

    /// # Summary
    /// 确保分区存在，不存在则按固定 OHLCV 布局创建。
    ///
    /// # Logic
    /// 1. 缓存命中直接返回。
    /// 2. 实时查询分区列表，已存在则记入缓存并返回。
    /// 3. 执行建表；失败后再查询一次，若分区已被并发创建则视为成功。
    /// 4. 仍不存在则返回 `SchemaCreationFailed`。
    ///
    /// # Arguments
    /// * `id`: 目标分区。
    ///
    /// # Returns
    /// * `Result<(), StoreError>`
    pub async fn ensure_partition(&self, id: &PartitionId) -> Result<(), StoreError> {
        if let Some(cache) = &self.cache
            && cache.contains(id)
        {
            return Ok(());
        }

        if self.exists_live(id).await? {
            self.remember(id);
            return Ok(());
        }

        match self.backend.create_partition(id, &OHLCV_LAYOUT).await {
            Ok(()) => {
                info!("Created partition {}", id);
                self.remember(id);
                Ok(())
            }
            Err(e) => {
                if matches!(self.exists_live(id).await, Ok(true)) {
                    debug!("Partition {} was created concurrently", id);
                    self.remember(id);
                    return Ok(());
                }
                warn!("Failed to create partition {}: {}", id, e);
                Err(StoreError::SchemaCreationFailed {
                    partition: id.table_name(),
                    reason: e.to_string(),
                })
            }
        }
    }

    /// 丢弃缓存中的分区记录，下次访问时回源确认。
    pub fn forget(&self, id: &PartitionId) {
        if let Some(cache) = &self.cache {
            cache.invalidate(id);
        }
    }

    async fn exists_live(&self, id: &PartitionId) -> Result<bool, StoreError> {
        Ok(self.backend.list_partitions().await?.contains(id))
    }

    fn remember(&self, id: &PartitionId) {
        if let Some(cache) = &self.cache {
            cache.insert(id);
        }
    }
}
