//! 按年分区的写入与查询引擎。
//!
//! 写入路径：原始批次 → 定点编码 → 按年分组 → (确保分区 → 去重 → 追加)。
//! 查询路径：(证券, 区间) → 逐年计划 → 分区读取 → 合并 → 按时间排序 → 解码。

pub mod dedup;
pub mod engine;
pub mod ingest;
pub mod query;
pub mod schema;

pub use engine::PartitionedStore;
