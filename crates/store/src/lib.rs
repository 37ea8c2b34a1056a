//! 分区存储端口的具体实现：SQLite（生产）与内存（测试、嵌入式场景），以及证券目录。

pub mod catalog;
pub mod config;
pub mod memory;
pub mod sqlite;
