use super::error::StoreError;
use crate::ohlcv::entity::EncodedRecord;
use crate::partition::entity::{ColumnLayout, PartitionId, TimeRange};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// # Summary
/// 证券目录条目（原 `Main` 表），记录证券类型与所属板块。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolMetadata {
    // 证券代码
    pub symbol: String,
    // 证券类型 (例如: Stock, ETF, Index)
    pub security_type: String,
    // 所属板块 (可选)
    pub sector: Option<String>,
}

/// # Summary
/// 分区存储后端接口，引擎只依赖此端口访问底层关系引擎。
///
/// # Invariants
/// - 实现者不得把分区名或任何值拼接进未转义的查询字符串。
/// - `read` 的时间谓词两端均为闭区间。
/// - 网络或驱动错误原样以 `StoreError::Database` 返回，由调用方决定是否重试。
#[async_trait]
pub trait PartitionBackend: Send + Sync {
    /// # Summary
    /// 列出后端中当前存在的全部分区。
    ///
    /// # Logic
    /// 1. 枚举后端中的表。
    /// 2. 仅保留符合 `{symbol}_{year}` 模板的表名。
    ///
    /// # Returns
    /// 按名称排序的分区列表。
    async fn list_partitions(&self) -> Result<Vec<PartitionId>, StoreError>;

    /// # Summary
    /// 按固定列布局创建分区。
    ///
    /// # Arguments
    /// * `id`: 分区标识。
    /// * `layout`: 列布局。
    ///
    /// # Returns
    /// 后端拒绝时返回错误，由 Schema Manager 归类为 `SchemaCreationFailed`。
    async fn create_partition(&self, id: &PartitionId, layout: &ColumnLayout) -> Result<(), StoreError>;

    /// # Summary
    /// 读取分区中的行，可选时间谓词。
    ///
    /// # Returns
    /// 分区不存在时返回 `PartitionNotFound`。
    async fn read(&self, id: &PartitionId, range: Option<TimeRange>) -> Result<Vec<EncodedRecord>, StoreError>;

    /// 向分区追加行。
    async fn append(&self, id: &PartitionId, rows: &[EncodedRecord]) -> Result<(), StoreError>;
}

/// # Summary
/// 证券目录接口。分区引擎不依赖它做写入校验。
#[async_trait]
pub trait SymbolCatalog: Send + Sync {
    /// 保存或更新证券条目。
    async fn register(&self, metadata: &SymbolMetadata) -> Result<(), StoreError>;

    /// 查询单个证券条目。
    async fn get(&self, symbol: &str) -> Result<Option<SymbolMetadata>, StoreError>;

    /// 按代码排序列出全部条目。
    async fn list(&self) -> Result<Vec<SymbolMetadata>, StoreError>;
}
