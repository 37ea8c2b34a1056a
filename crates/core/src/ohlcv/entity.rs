use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// # Summary
/// 待写入的原始行情记录，价格为十进制小数。
///
/// # Invariants
/// - `timestamp` 允许为空，缺失时该条记录在写入时被单独拒绝。
/// - `volume` 必须是非负整数值，仍以 `Decimal` 承载以便校验。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    // 时间戳 (UTC)
    pub timestamp: Option<DateTime<Utc>>,
    // 开盘价
    pub open: Decimal,
    // 最高价
    pub high: Decimal,
    // 最低价
    pub low: Decimal,
    // 收盘价
    pub close: Decimal,
    // 成交量
    pub volume: Decimal,
}

/// # Summary
/// 查询返回的行情记录，价格已从定点整数精确还原。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OhlcvRecord {
    pub timestamp: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: i64,
}

/// # Summary
/// 分区内的物理行：四个价格均为 `round(value * 10000)`。
///
/// # Invariants
/// - 全字段参与相等与哈希，去重按值而非按键进行。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EncodedRecord {
    pub timestamp: DateTime<Utc>,
    pub open: i64,
    pub high: i64,
    pub low: i64,
    pub close: i64,
    pub volume: i64,
}

/// 单个分区一次去重写入的结果。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsertSummary {
    // 实际追加的行数
    pub inserted_count: usize,
    // 因已存在而跳过的行数
    pub skipped_count: usize,
}
