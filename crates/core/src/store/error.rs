use thiserror::Error;

/// # Summary
/// 存储层错误枚举，覆盖编码、分区命名、建表、写入与底层连接等失败场景。
///
/// # Invariants
/// - 必须通过 `thiserror` 派生 `Error` trait。
/// - `Database` 承载底层驱动的原始信息，引擎不做重试。
#[derive(Error, Debug)]
pub enum StoreError {
    /// 成交量为负数或不是整数
    #[error("Invalid volume: {0}")]
    InvalidVolume(String),
    /// 价格放大 10000 倍后超出 i64 表示范围
    #[error("Price out of range: {0}")]
    PriceOutOfRange(String),
    /// 记录缺少时间戳
    #[error("Record is missing its timestamp")]
    MissingTimestamp,
    /// 时间区间起点晚于终点
    #[error("Invalid range: start {start} is after end {end}")]
    InvalidRange { start: String, end: String },
    /// 日期字符串无法按给定格式解析
    #[error("Invalid date '{value}' for format '{format}'")]
    InvalidDate { value: String, format: String },
    /// 证券代码或年份不满足安全字符集，无法用作分区名
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),
    /// 后端拒绝建表（名称冲突或权限问题），不可重试
    #[error("Schema creation failed for {partition}: {reason}")]
    SchemaCreationFailed { partition: String, reason: String },
    /// 去重后写入失败，可重试；已写入部分不会回滚
    #[error("Append failed for {partition}: {reason}")]
    AppendFailed { partition: String, reason: String },
    /// 分区不存在
    #[error("Partition not found: {0}")]
    PartitionNotFound(String),
    /// 数据库连接或驱动错误
    #[error("Database error: {0}")]
    Database(String),
}

impl StoreError {
    /// 该错误是否值得调用方重试。
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::AppendFailed { .. })
    }
}
