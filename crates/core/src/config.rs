use serde::{Deserialize, Serialize};

/// 全局应用配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub engine: EngineConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    // 数据根目录
    pub data_dir: String,
    // 行情库文件名，所有分区表都位于同一个库中
    pub file_name: String,
    pub max_connections: u32,
    pub busy_timeout_secs: u64,
}

/// # Summary
/// 分区引擎配置。
///
/// # Invariants
/// - 关闭缓存时每次写入都会实时查询分区列表。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    // 是否缓存已知存在的分区
    pub partition_cache: bool,
    // 缓存条目上限，超过后整体清空
    pub partition_cache_capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    // 滚动日志目录
    pub dir: String,
    // 默认日志级别，可被 RUST_LOG 覆盖
    pub level: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            data_dir: "data".to_string(),
            file_name: "ohlcv.db".to_string(),
            max_connections: 4,
            busy_timeout_secs: 10,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            partition_cache: true,
            partition_cache_capacity: 4096,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            dir: ".logs".to_string(),
            level: "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.database.data_dir, "data");
        assert_eq!(config.database.file_name, "ohlcv.db");
        assert_eq!(config.database.max_connections, 4);
        assert!(config.engine.partition_cache);
        assert_eq!(config.engine.partition_cache_capacity, 4096);
        assert_eq!(config.log.dir, ".logs");
        assert_eq!(config.log.level, "info");
    }
}
