use crate::schema::SchemaManager;
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::ops::Range;
use strata_core::ohlcv::codec::decode_record;
use strata_core::ohlcv::entity::{EncodedRecord, OhlcvRecord};
use strata_core::partition::entity::{PartitionId, TimeRange};
use strata_core::partition::namer::{name_for, year_end, year_start, years_spanned};
use strata_core::store::error::StoreError;
use strata_core::store::port::PartitionBackend;
use tracing::debug;

/// # Summary
/// 查询计划中的单次分区读取。
///
/// # Invariants
/// - `range` 为 None 表示整年读取（中间年份）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionRead {
    pub partition: PartitionId,
    pub range: Option<TimeRange>,
}

/// # Summary
/// 把 `[start, end]` 拆解为逐年的分区读取。
///
/// # Logic
/// 1. 仅跨一年：单一谓词 `[start, end]`。
/// 2. 首年：`[start, min(end, 年末)]`。
/// 3. 中间年份：无谓词。
/// 4. 末年：`[max(start, 年初), end]`。
///
/// # Returns
/// * 按年份升序的读取列表；`start > end` 返回 `InvalidRange`。
pub fn plan_range(
    symbol: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Vec<PartitionRead>, StoreError> {
    let years = years_spanned(start, end)?;
    let (first, last) = (start.year(), end.year());

    years
        .into_iter()
        .map(|year| -> Result<PartitionRead, StoreError> {
            let partition = name_for(symbol, year)?;
            let range = if first == last {
                Some(TimeRange::new(start, end)?)
            } else if year == first {
                Some(TimeRange::new(start, end.min(year_end(year)?))?)
            } else if year == last {
                Some(TimeRange::new(start.max(year_start(year)?), end)?)
            } else {
                None
            };
            Ok(PartitionRead { partition, range })
        })
        .collect()
}

/// # Summary
/// 执行跨年区间查询。
///
/// # Logic
/// 1. 生成查询计划，并实时获取一次分区列表。
/// 2. 缺失的年份直接跳过（视为无数据）并使其缓存失效；读取时才发现分区消失的同样处理。
/// 3. 合并各分区结果：与先前分区完全相同的行丢弃，同一分区内的重复行保留。
/// 4. 按时间戳稳定排序后解码价格。
///
/// # Returns
/// * 按时间非递减的记录；没有任何分区时返回空列表。
pub async fn query_range(
    backend: &dyn PartitionBackend,
    schema: &SchemaManager,
    symbol: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Vec<OhlcvRecord>, StoreError> {
    let plan = plan_range(symbol, start, end)?;
    let existing: HashSet<PartitionId> = backend.list_partitions().await?.into_iter().collect();
    debug!("{}: query plan spans {} partitions", symbol, plan.len());

    let mut merged = PartitionUnion::default();
    for read in plan {
        if !existing.contains(&read.partition) {
            debug!("{}: no partition, skipping", read.partition);
            schema.forget(&read.partition);
            continue;
        }

        let rows = match backend.read(&read.partition, read.range).await {
            Ok(rows) => rows,
            Err(StoreError::PartitionNotFound(name)) => {
                debug!("{}: partition disappeared during query, skipping", name);
                schema.forget(&read.partition);
                continue;
            }
            Err(e) => return Err(e),
        };
        merged.push(read.partition.year(), rows);
    }

    let mut rows = merged.into_rows();
    rows.sort_by_key(|row| row.timestamp);
    Ok(rows.iter().map(decode_record).collect())
}

/// # Summary
/// 按年份升序合并各分区的读取结果，丢弃与先前分区完全相同的行。
///
/// # Invariants
/// - 同一行出现在两个分区时，至少一份的时间戳不属于其所在分区的年份（错放行）。
///   因此只需记住错放行，并在遇到错放行时回查其时间戳年份对应的分区。
/// - 同一分区内的重复行全部保留。
#[derive(Debug, Default)]
struct PartitionUnion {
    rows: Vec<EncodedRecord>,
    // 分区年份 -> 该分区在 rows 中的下标区间
    spans: HashMap<i32, Range<usize>>,
    strays: HashSet<EncodedRecord>,
}

impl PartitionUnion {
    fn push(&mut self, year: i32, rows: Vec<EncodedRecord>) {
        let fresh: Vec<EncodedRecord> = rows.into_iter().filter(|row| !self.seen_earlier(year, row)).collect();
        let begin = self.rows.len();
        self.strays
            .extend(fresh.iter().filter(|row| row.timestamp.year() != year).copied());
        self.rows.extend(fresh);
        self.spans.insert(year, begin..self.rows.len());
    }

    fn seen_earlier(&self, year: i32, row: &EncodedRecord) -> bool {
        if self.strays.contains(row) {
            return true;
        }
        let own = row.timestamp.year();
        own != year
            && self
                .spans
                .get(&own)
                .and_then(|span| self.rows.get(span.clone()))
                .is_some_and(|rows| rows.contains(row))
    }

    fn into_rows(self) -> Vec<EncodedRecord> {
        self.rows
    }
}

/// # Summary
/// 按 chrono 格式解析查询边界，结果视为 UTC。
///
/// # Logic
/// 1. 先按“日期+时间”格式解析。
/// 2. 失败则按纯日期格式解析，取当天零点。
///
/// # Returns
/// * 两种方式都失败时返回 `InvalidDate`。
pub fn parse_bound(value: &str, format: &str) -> Result<DateTime<Utc>, StoreError> {
    NaiveDateTime::parse_from_str(value, format)
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(value, format)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .map(|naive| naive.and_utc())
        .ok_or_else(|| StoreError::InvalidDate {
            value: value.to_string(),
            format: format.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_plan_single_year_uses_one_predicate() {
        let plan = plan_range("AAPL", at(2020, 2, 1), at(2020, 5, 1)).unwrap();
        assert_eq!(
            plan,
            vec![PartitionRead {
                partition: name_for("AAPL", 2020).unwrap(),
                range: Some(TimeRange::new(at(2020, 2, 1), at(2020, 5, 1)).unwrap()),
            }]
        );
    }

    #[test]
    fn test_plan_splits_first_interior_last() {
        let plan = plan_range("SYM", at(2018, 6, 1), at(2020, 3, 1)).unwrap();
        assert_eq!(plan.len(), 3);

        assert_eq!(plan[0].partition.table_name(), "SYM_2018");
        let first = plan[0].range.unwrap();
        assert_eq!(first.start(), at(2018, 6, 1));
        assert_eq!(first.end(), year_end(2018).unwrap());

        assert_eq!(plan[1].partition.table_name(), "SYM_2019");
        assert!(plan[1].range.is_none());

        assert_eq!(plan[2].partition.table_name(), "SYM_2020");
        let last = plan[2].range.unwrap();
        assert_eq!(last.start(), at(2020, 1, 1));
        assert_eq!(last.end(), at(2020, 3, 1));
    }

    #[test]
    fn test_plan_adjacent_years_do_not_overlap() {
        let plan = plan_range("SYM", at(2019, 12, 31), at(2020, 1, 1)).unwrap();
        assert_eq!(plan.len(), 2);
        let (a, b) = (plan[0].range.unwrap(), plan[1].range.unwrap());
        assert!(a.end() < b.start());
        assert!(!a.contains(at(2020, 1, 1)));
        assert!(b.contains(at(2020, 1, 1)));
    }

    #[test]
    fn test_plan_rejects_inverted_range_and_bad_symbol() {
        assert!(matches!(
            plan_range("SYM", at(2020, 1, 2), at(2020, 1, 1)),
            Err(StoreError::InvalidRange { .. })
        ));
        assert!(matches!(
            plan_range("S Y M", at(2020, 1, 1), at(2020, 1, 2)),
            Err(StoreError::InvalidIdentifier(_))
        ));
    }

    fn encoded(timestamp: DateTime<Utc>, close: i64) -> EncodedRecord {
        EncodedRecord {
            timestamp,
            open: close,
            high: close,
            low: close,
            close,
            volume: 1,
        }
    }

    #[test]
    fn test_union_drops_rows_repeated_across_partitions() {
        let a = encoded(at(2019, 7, 1), 1);
        let b = encoded(at(2020, 7, 1), 2);
        let c = encoded(at(2020, 8, 1), 3);

        // SYM_2019 里错放了一条 2020 年的行，SYM_2020 里错放了一条 2019 年的行
        let mut union = PartitionUnion::default();
        union.push(2019, vec![a, a, b]);
        union.push(2020, vec![b, a, c]);
        assert_eq!(union.into_rows(), vec![a, a, b, c]);
    }

    #[test]
    fn test_union_keeps_disjoint_partitions_untouched() {
        let rows_2019 = vec![encoded(at(2019, 1, 1), 1), encoded(at(2019, 12, 31), 1)];
        let rows_2020 = vec![encoded(at(2020, 1, 1), 1), encoded(at(2020, 1, 1), 1)];

        let mut union = PartitionUnion::default();
        union.push(2019, rows_2019.clone());
        union.push(2020, rows_2020.clone());
        assert!(union.strays.is_empty());
        assert_eq!(union.into_rows(), [rows_2019, rows_2020].concat());
    }

    #[test]
    fn test_parse_bound() {
        assert_eq!(parse_bound("2018-06-01", "%Y-%m-%d").unwrap(), at(2018, 6, 1));
        assert_eq!(
            parse_bound("2018-06-01 09:30:00", "%Y-%m-%d %H:%M:%S").unwrap(),
            Utc.with_ymd_and_hms(2018, 6, 1, 9, 30, 0).unwrap()
        );
        assert!(matches!(
            parse_bound("06/01/2018", "%Y-%m-%d"),
            Err(StoreError::InvalidDate { .. })
        ));
    }
}
