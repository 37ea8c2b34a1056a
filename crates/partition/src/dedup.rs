use std::collections::HashMap;
use strata_core::ohlcv::entity::{EncodedRecord, InsertSummary};
use strata_core::partition::entity::{PartitionId, TimeRange};
use strata_core::store::error::StoreError;
use strata_core::store::port::PartitionBackend;
use tracing::debug;

/// # Summary
/// 多重集减法：从新批次中移除已存在的行。
///
/// # Logic
/// 1. 以全字段元组为键统计已有行的出现次数。
/// 2. 顺序扫描新批次，命中且剩余次数大于零则跳过并扣减一次。
///
/// # Returns
/// * `(待写入的行, 跳过的行数)`，待写入的行保持输入顺序。
pub fn subtract_existing(
    incoming: &[EncodedRecord],
    existing: &[EncodedRecord],
) -> (Vec<EncodedRecord>, usize) {
    let mut remaining: HashMap<EncodedRecord, usize> = HashMap::with_capacity(existing.len());
    for row in existing {
        *remaining.entry(*row).or_default() += 1;
    }

    let mut skipped = 0;
    let fresh = incoming
        .iter()
        .copied()
        .filter(|row| match remaining.get_mut(row) {
            Some(count) if *count > 0 => {
                *count -= 1;
                skipped += 1;
                false
            }
            _ => true,
        })
        .collect();
    (fresh, skipped)
}

/// # Summary
/// 对单个分区执行“去重后追加”。
///
/// # Logic
/// 1. 空批次直接返回，不访问后端。
/// 2. 计算批次的 `[min_ts, max_ts]`，只读取该闭区间内的已有行。
/// 3. 做多重集减法。
/// 4. 追加剩余行；写入失败归类为 `AppendFailed`，已写入部分不回滚。
///
/// 分区在读取时已不存在则原样返回 `PartitionNotFound`，由调用方决定是否重建。
///
/// # Arguments
/// * `backend`: 分区存储后端。
/// * `id`: 目标分区，调用前必须已存在。
/// * `records`: 已编码的新行。
///
/// # Returns
/// * `Result<InsertSummary, StoreError>`
pub async fn append_deduped(
    backend: &dyn PartitionBackend,
    id: &PartitionId,
    records: &[EncodedRecord],
) -> Result<InsertSummary, StoreError> {
    let bounds = records
        .iter()
        .map(|r| r.timestamp)
        .min()
        .zip(records.iter().map(|r| r.timestamp).max());
    let Some((min_ts, max_ts)) = bounds else {
        return Ok(InsertSummary::default());
    };

    let existing = backend.read(id, Some(TimeRange::new(min_ts, max_ts)?)).await?;
    let (fresh, skipped_count) = subtract_existing(records, &existing);
    debug!(
        "Partition {}: {} existing rows in window, {} new, {} duplicates",
        id,
        existing.len(),
        fresh.len(),
        skipped_count
    );

    if !fresh.is_empty() {
        backend
            .append(id, &fresh)
            .await
            .map_err(|e| StoreError::AppendFailed {
                partition: id.table_name(),
                reason: e.to_string(),
            })?;
    }

    Ok(InsertSummary {
        inserted_count: fresh.len(),
        skipped_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn row(second: u32, close: i64) -> EncodedRecord {
        EncodedRecord {
            timestamp: Utc.with_ymd_and_hms(2020, 1, 2, 9, 30, second).unwrap(),
            open: 10_000,
            high: 10_000,
            low: 10_000,
            close,
            volume: 100,
        }
    }

    #[test]
    fn test_subtract_against_empty_keeps_everything() {
        let incoming = vec![row(0, 1), row(0, 1)];
        let (fresh, skipped) = subtract_existing(&incoming, &[]);
        assert_eq!(fresh, incoming);
        assert_eq!(skipped, 0);
    }

    #[test]
    fn test_subtract_consumes_multiplicity() {
        let incoming = vec![row(0, 1), row(0, 1), row(0, 1), row(1, 2)];
        let existing = vec![row(0, 1), row(0, 1)];
        let (fresh, skipped) = subtract_existing(&incoming, &existing);
        assert_eq!(fresh, vec![row(0, 1), row(1, 2)]);
        assert_eq!(skipped, 2);
    }

    #[test]
    fn test_subtract_matches_full_tuple_not_timestamp() {
        // 同一时间戳但收盘价不同，视为不同的行
        let (fresh, skipped) = subtract_existing(&[row(0, 2)], &[row(0, 1)]);
        assert_eq!(fresh, vec![row(0, 2)]);
        assert_eq!(skipped, 0);
    }

    #[test]
    fn test_subtract_ignores_existing_rows_not_in_batch() {
        let (fresh, skipped) = subtract_existing(&[row(5, 1)], &[row(0, 1), row(1, 1)]);
        assert_eq!(fresh, vec![row(5, 1)]);
        assert_eq!(skipped, 0);
    }
}
