use crate::dedup::append_deduped;
use crate::schema::SchemaManager;
use std::collections::BTreeMap;
use strata_core::ohlcv::codec::encode_record;
use strata_core::ohlcv::entity::{EncodedRecord, InsertSummary, RawRecord};
use strata_core::partition::entity::PartitionId;
use strata_core::partition::namer::{partition_of, validate_symbol};
use strata_core::store::error::StoreError;
use strata_core::store::port::PartitionBackend;
use tracing::{info, warn};

/// 因编码或分区路由失败被排除的单条输入记录。
#[derive(Debug)]
pub struct RejectedRecord {
    // 在输入批次中的下标
    pub index: usize,
    pub error: StoreError,
}

/// # Summary
/// 一次多年份写入的完整结果。
///
/// # Invariants
/// - 每个涉及到的年份要么出现在 `summaries`，要么出现在 `failures`，不会同时出现。
/// - `rejected` 中的记录未进入任何分区。
#[derive(Debug, Default)]
pub struct InsertReport {
    pub summaries: BTreeMap<i32, InsertSummary>,
    pub failures: BTreeMap<i32, StoreError>,
    pub rejected: Vec<RejectedRecord>,
}

impl InsertReport {
    pub fn inserted_count(&self) -> usize {
        self.summaries.values().map(|s| s.inserted_count).sum()
    }

    pub fn skipped_count(&self) -> usize {
        self.summaries.values().map(|s| s.skipped_count).sum()
    }

    /// 没有任何年份失败，也没有被拒绝的记录。
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.rejected.is_empty()
    }
}

/// # Summary
/// 写入一个证券的任意跨年批次。
///
/// # Logic
/// 1. 校验证券代码，非法时整个调用失败。
/// 2. 逐条编码并路由到所属分区，失败的记录单独登记并排除。
/// 3. 按年份升序依次：确保分区存在、去重追加；每年的结果或错误分别记录。
///
/// # Arguments
/// * `backend`: 分区存储后端。
/// * `schema`: 负责建表与分区缓存。
/// * `symbol`: 证券代码。
/// * `records`: 原始记录。
///
/// # Returns
/// * `Result<InsertReport, StoreError>` - 仅证券代码非法时返回错误。
pub async fn insert(
    backend: &dyn PartitionBackend,
    schema: &SchemaManager,
    symbol: &str,
    records: &[RawRecord],
) -> Result<InsertReport, StoreError> {
    validate_symbol(symbol)?;

    let mut report = InsertReport::default();
    let mut by_partition: BTreeMap<PartitionId, Vec<EncodedRecord>> = BTreeMap::new();
    for (index, raw) in records.iter().enumerate() {
        let routed = encode_record(raw)
            .and_then(|encoded| Ok((partition_of(symbol, encoded.timestamp)?, encoded)));
        match routed {
            Ok((id, encoded)) => by_partition.entry(id).or_default().push(encoded),
            Err(error) => {
                warn!("{}: rejected record #{}: {}", symbol, index, error);
                report.rejected.push(RejectedRecord { index, error });
            }
        }
    }

    for (id, rows) in by_partition {
        match write_partition(backend, schema, &id, &rows).await {
            Ok(summary) => {
                info!(
                    "{}: inserted {}, skipped {}",
                    id, summary.inserted_count, summary.skipped_count
                );
                report.summaries.insert(id.year(), summary);
            }
            Err(error) => {
                warn!("{}: insert failed: {}", id, error);
                report.failures.insert(id.year(), error);
            }
        }
    }

    Ok(report)
}

/// # Summary
/// 确保分区存在后去重追加。
///
/// # Logic
/// 缓存认为分区存在、后端却已没有该表时，清除缓存条目、重新建表并重试一次。
async fn write_partition(
    backend: &dyn PartitionBackend,
    schema: &SchemaManager,
    id: &PartitionId,
    rows: &[EncodedRecord],
) -> Result<InsertSummary, StoreError> {
    schema.ensure_partition(id).await?;
    match append_deduped(backend, id, rows).await {
        Err(StoreError::PartitionNotFound(_)) => {
            warn!("{}: partition vanished from backend, recreating", id);
            schema.forget(id);
            schema.ensure_partition(id).await?;
            append_deduped(backend, id, rows).await
        }
        other => other,
    }
}
