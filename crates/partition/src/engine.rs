use crate::ingest::{self, InsertReport};
use crate::query::{self, parse_bound};
use crate::schema::SchemaManager;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use strata_core::config::EngineConfig;
use strata_core::ohlcv::entity::{OhlcvRecord, RawRecord};
use strata_core::partition::entity::PartitionId;
use strata_core::partition::namer::canonical_symbol;
use strata_core::store::error::StoreError;
use strata_core::store::port::PartitionBackend;

/// # Summary
/// 按年分区行情存储的入口，组合 Schema Manager、写入编排与区间查询。
///
/// # Invariants
/// - 除可选的分区缓存外不持有任何状态，权威数据全部位于后端。
/// - 同一 `(symbol, year)` 的并发写入需由调用方串行化，否则去重快照可能竞争。
pub struct PartitionedStore {
    backend: Arc<dyn PartitionBackend>,
    schema: SchemaManager,
}

impl PartitionedStore {
    pub fn new(backend: Arc<dyn PartitionBackend>, config: &EngineConfig) -> Self {
        let schema = SchemaManager::new(backend.clone(), config);
        Self { backend, schema }
    }

    pub fn schema(&self) -> &SchemaManager {
        &self.schema
    }

    /// 写入一个证券的跨年批次，详见 [`ingest::insert`]。
    pub async fn insert(&self, symbol: &str, records: &[RawRecord]) -> Result<InsertReport, StoreError> {
        ingest::insert(self.backend.as_ref(), &self.schema, symbol, records).await
    }

    /// 查询 `[start, end]` 内的记录，详见 [`query::query_range`]。
    pub async fn query_range(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<OhlcvRecord>, StoreError> {
        query::query_range(self.backend.as_ref(), &self.schema, symbol, start, end).await
    }

    /// # Summary
    /// 以字符串给出边界的区间查询。
    ///
    /// # Arguments
    /// * `start` / `end`: 日期字符串。
    /// * `format`: chrono 格式串，例如 `%Y-%m-%d`。
    pub async fn query_range_str(
        &self,
        symbol: &str,
        start: &str,
        end: &str,
        format: &str,
    ) -> Result<Vec<OhlcvRecord>, StoreError> {
        let start = parse_bound(start, format)?;
        let end = parse_bound(end, format)?;
        self.query_range(symbol, start, end).await
    }

    /// 后端中现存的全部分区。
    pub async fn partitions(&self) -> Result<Vec<PartitionId>, StoreError> {
        self.backend.list_partitions().await
    }

    /// # Summary
    /// 至少拥有一个分区的证券代码。
    ///
    /// # Returns
    /// * 去重后的代码，保持分区列表中首次出现的顺序。
    pub async fn symbols_available(&self) -> Result<Vec<String>, StoreError> {
        let mut seen = HashSet::new();
        Ok(self
            .partitions()
            .await?
            .into_iter()
            .filter(|id| seen.insert(id.symbol().to_string()))
            .map(|id| id.symbol().to_string())
            .collect())
    }

    /// 某证券拥有分区的年份，升序。证券代码大小写不敏感。
    pub async fn years_available(&self, symbol: &str) -> Result<Vec<i32>, StoreError> {
        let symbol = canonical_symbol(symbol)?;
        let mut years: Vec<i32> = self
            .partitions()
            .await?
            .iter()
            .filter(|id| id.symbol() == symbol)
            .map(|id| id.year())
            .collect();
        years.sort_unstable();
        Ok(years)
    }
}
