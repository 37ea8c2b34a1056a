use crate::store::error::StoreError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// # Summary
/// 物理分区标识，对应后端中名为 `{symbol}_{year}` 的一张表。
///
/// # Invariants
/// - 只能通过 `namer::name_for` 或 `PartitionId::parse` 构造，二者都会校验字符集并将证券代码转为大写。
/// - 表名模板是与既有数据互通的持久化契约，不可更改。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PartitionId {
    pub(crate) symbol: String,
    pub(crate) year: i32,
}

impl PartitionId {
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    /// 后端中的表名。
    pub fn table_name(&self) -> String {
        self.to_string()
    }

    /// # Summary
    /// 从表名反解出分区标识。
    ///
    /// # Logic
    /// 1. 以最后一个 `_` 切分出证券代码与年份。
    /// 2. 复用 `name_for` 的校验，保证与写入路径一致。
    ///
    /// # Returns
    /// * 不符合 `{symbol}_{year}` 模板时返回 `InvalidIdentifier`。
    pub fn parse(table_name: &str) -> Result<Self, StoreError> {
        let (symbol, year) = table_name
            .rsplit_once('_')
            .ok_or_else(|| StoreError::InvalidIdentifier(table_name.to_string()))?;
        let year: i32 = year
            .parse()
            .map_err(|_| StoreError::InvalidIdentifier(table_name.to_string()))?;
        super::namer::name_for(symbol, year)
    }
}

impl fmt::Display for PartitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.symbol, self.year)
    }
}

/// # Summary
/// 闭区间时间范围，两端均包含。
///
/// # Invariants
/// - `start <= end`。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, StoreError> {
        if start > end {
            return Err(StoreError::InvalidRange {
                start: start.to_rfc3339(),
                end: end.to_rfc3339(),
            });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        self.start <= ts && ts <= self.end
    }
}

/// 列的逻辑类型。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    // 时间列
    Temporal,
    // 整数列（定点价格与成交量）
    Integer,
}

/// 分区表中的一列。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnKind,
    // 是否需要为该列建立索引
    pub indexed: bool,
}

/// 分区表的固定列布局。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnLayout {
    pub columns: &'static [Column],
}

/// 所有分区共享的 OHLCV 列布局，列名与顺序为持久化契约。
pub const OHLCV_LAYOUT: ColumnLayout = ColumnLayout {
    columns: &[
        Column { name: "Datetime", kind: ColumnKind::Temporal, indexed: true },
        Column { name: "Open", kind: ColumnKind::Integer, indexed: false },
        Column { name: "Close", kind: ColumnKind::Integer, indexed: false },
        Column { name: "High", kind: ColumnKind::Integer, indexed: false },
        Column { name: "Low", kind: ColumnKind::Integer, indexed: false },
        Column { name: "Volume", kind: ColumnKind::Integer, indexed: false },
    ],
};
