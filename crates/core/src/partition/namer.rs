use super::entity::PartitionId;
use crate::store::error::StoreError;
use chrono::{DateTime, Datelike, NaiveDate, TimeDelta, Utc};

/// 证券代码最大长度
pub const MAX_SYMBOL_LEN: usize = 32;

/// 允许的年份范围，保证表名中的年份恒为四位数
pub const MIN_YEAR: i32 = 1;
pub const MAX_YEAR: i32 = 9999;

/// # Summary
/// 校验证券代码是否可安全用作表名的一部分。
///
/// # Logic
/// 仅允许 ASCII 字母数字以及 `.`、`-`、`^`、`=`。下划线保留给年份分隔符。
pub fn validate_symbol(symbol: &str) -> Result<(), StoreError> {
    let valid = !symbol.is_empty()
        && symbol.len() <= MAX_SYMBOL_LEN
        && symbol
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '^' | '='));
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidIdentifier(format!("symbol '{}'", symbol)))
    }
}

/// # Summary
/// 证券代码的规范形式：校验后统一转为大写。
///
/// # Logic
/// SQLite 表名不区分大小写，`brk.b` 与 `BRK.B` 必须落到同一个分区。
pub fn canonical_symbol(symbol: &str) -> Result<String, StoreError> {
    validate_symbol(symbol)?;
    Ok(symbol.to_ascii_uppercase())
}

/// # Summary
/// 根据证券代码与自然年生成分区标识。
///
/// # Arguments
/// * `symbol`: 证券代码，大小写不敏感。
/// * `year`: 时间戳所在的自然年（非财年）。
///
/// # Returns
/// * `Result<PartitionId, StoreError>` - 校验失败返回 `InvalidIdentifier`。
pub fn name_for(symbol: &str, year: i32) -> Result<PartitionId, StoreError> {
    let symbol = canonical_symbol(symbol)?;
    if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
        return Err(StoreError::InvalidIdentifier(format!("year {}", year)));
    }
    Ok(PartitionId { symbol, year })
}

/// 时间戳所属分区。
pub fn partition_of(symbol: &str, ts: DateTime<Utc>) -> Result<PartitionId, StoreError> {
    name_for(symbol, ts.year())
}

/// # Summary
/// 返回 `[start, end]` 覆盖的全部自然年，升序。
///
/// # Returns
/// * `start > end` 时返回 `InvalidRange`。
pub fn years_spanned(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Vec<i32>, StoreError> {
    if start > end {
        return Err(StoreError::InvalidRange {
            start: start.to_rfc3339(),
            end: end.to_rfc3339(),
        });
    }
    Ok((start.year()..=end.year()).collect())
}

/// 某年第一个时刻：1 月 1 日 00:00:00 UTC。
pub fn year_start(year: i32) -> Result<DateTime<Utc>, StoreError> {
    NaiveDate::from_ymd_opt(year, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| StoreError::InvalidIdentifier(format!("year {}", year)))
}

/// 某年最后一个可表示时刻：12 月 31 日 23:59:59.999999999 UTC。
pub fn year_end(year: i32) -> Result<DateTime<Utc>, StoreError> {
    let next = year
        .checked_add(1)
        .ok_or_else(|| StoreError::InvalidIdentifier(format!("year {}", year)))?;
    Ok(year_start(next)? - TimeDelta::nanoseconds(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_name_for_builds_symbol_year() {
        let id = name_for("AAPL", 2019).unwrap();
        assert_eq!(id.table_name(), "AAPL_2019");
        assert_eq!(id.symbol(), "AAPL");
        assert_eq!(id.year(), 2019);
        assert_eq!(name_for("BRK.B", 2020).unwrap().table_name(), "BRK.B_2020");
        assert_eq!(name_for("^GSPC", 2001).unwrap().table_name(), "^GSPC_2001");
    }

    #[test]
    fn test_name_for_rejects_unsafe_identifiers() {
        for bad in ["", "AA_PL", "AAPL\"; DROP TABLE x; --", "AA PL", "ÄPFEL", "X".repeat(33).as_str()] {
            assert!(
                matches!(name_for(bad, 2020), Err(StoreError::InvalidIdentifier(_))),
                "symbol {:?} should be rejected",
                bad
            );
        }
        assert!(name_for("AAPL", 0).is_err());
        assert!(name_for("AAPL", 10_000).is_err());
    }

    #[test]
    fn test_symbol_case_is_canonicalized() {
        assert_eq!(canonical_symbol("brk.b").unwrap(), "BRK.B");
        assert_eq!(name_for("brk.b", 2021).unwrap(), name_for("BRK.B", 2021).unwrap());
        assert_eq!(name_for("^gspc", 2001).unwrap().table_name(), "^GSPC_2001");
        // 旧库中的小写表名解析为同一个分区
        assert_eq!(PartitionId::parse("msft_2018").unwrap(), name_for("MSFT", 2018).unwrap());
        assert!(canonical_symbol("brk_b").is_err());
    }

    #[test]
    fn test_partition_routing_at_year_boundary() {
        let last = Utc.with_ymd_and_hms(2019, 12, 31, 23, 59, 59).unwrap();
        let first = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(partition_of("SYM", last).unwrap().table_name(), "SYM_2019");
        assert_eq!(partition_of("SYM", first).unwrap().table_name(), "SYM_2020");
    }

    #[test]
    fn test_parse_round_trips_table_names() {
        let id = PartitionId::parse("MSFT_2018").unwrap();
        assert_eq!(id, name_for("MSFT", 2018).unwrap());
        assert!(PartitionId::parse("Main").is_err());
        assert!(PartitionId::parse("MSFT_abcd").is_err());
        assert!(PartitionId::parse("_2018").is_err());
    }

    #[test]
    fn test_years_spanned() {
        let start = Utc.with_ymd_and_hms(2018, 6, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2020, 3, 1, 0, 0, 0).unwrap();
        assert_eq!(years_spanned(start, end).unwrap(), vec![2018, 2019, 2020]);
        assert_eq!(years_spanned(start, start).unwrap(), vec![2018]);
        assert!(matches!(
            years_spanned(end, start),
            Err(StoreError::InvalidRange { .. })
        ));
    }

    #[test]
    fn test_year_bounds() {
        assert_eq!(
            year_start(2019).unwrap(),
            Utc.with_ymd_and_hms(2019, 1, 1, 0, 0, 0).unwrap()
        );
        let end = year_end(2019).unwrap();
        assert_eq!(end.year(), 2019);
        assert!(end > Utc.with_ymd_and_hms(2019, 12, 31, 23, 59, 59).unwrap());
        assert_eq!(end + TimeDelta::nanoseconds(1), year_start(2020).unwrap());
    }
}
