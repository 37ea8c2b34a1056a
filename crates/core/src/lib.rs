//! 按年分区的 OHLCV 行情存储的领域核心：实体、定点编解码、分区命名、存储端口与配置。

pub mod config;
pub mod ohlcv;
pub mod partition;
pub mod store;
