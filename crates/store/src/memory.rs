use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use strata_core::ohlcv::entity::EncodedRecord;
use strata_core::partition::entity::{ColumnLayout, PartitionId, TimeRange};
use strata_core::store::error::StoreError;
use strata_core::store::port::PartitionBackend;

/// # Summary
/// 基于 DashMap 的内存分区后端，行为与 SQLite 实现对齐。
///
/// # Invariants
/// - 重复建表会被拒绝，与关系库的同名冲突语义一致。
/// - 行按追加顺序保存，不做任何去重。
pub struct MemPartitionBackend {
    partitions: DashMap<PartitionId, Vec<EncodedRecord>>,
}

impl MemPartitionBackend {
    pub fn new() -> Self {
        Self {
            partitions: DashMap::new(),
        }
    }

    /// 分区当前行数，分区不存在时为 None。
    pub fn row_count(&self, id: &PartitionId) -> Option<usize> {
        self.partitions.get(id).map(|rows| rows.len())
    }
}

impl Default for MemPartitionBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PartitionBackend for MemPartitionBackend {
    async fn list_partitions(&self) -> Result<Vec<PartitionId>, StoreError> {
        let mut ids: Vec<PartitionId> = self.partitions.iter().map(|e| e.key().clone()).collect();
        ids.sort_by_key(|id| id.table_name());
        Ok(ids)
    }

    async fn create_partition(&self, id: &PartitionId, _layout: &ColumnLayout) -> Result<(), StoreError> {
        match self.partitions.entry(id.clone()) {
            Entry::Occupied(_) => Err(StoreError::Database(format!("table {} already exists", id))),
            Entry::Vacant(slot) => {
                slot.insert(Vec::new());
                Ok(())
            }
        }
    }

    async fn read(&self, id: &PartitionId, range: Option<TimeRange>) -> Result<Vec<EncodedRecord>, StoreError> {
        let rows = self
            .partitions
            .get(id)
            .ok_or_else(|| StoreError::PartitionNotFound(id.table_name()))?;
        Ok(rows
            .iter()
            .filter(|row| range.is_none_or(|r| r.contains(row.timestamp)))
            .copied()
            .collect())
    }

    async fn append(&self, id: &PartitionId, rows: &[EncodedRecord]) -> Result<(), StoreError> {
        let mut stored = self
            .partitions
            .get_mut(id)
            .ok_or_else(|| StoreError::PartitionNotFound(id.table_name()))?;
        stored.extend_from_slice(rows);
        Ok(())
    }
}
