use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
};
use std::path::Path;
use std::time::Duration;
use strata_core::config::DatabaseConfig;
use strata_core::ohlcv::entity::EncodedRecord;
use strata_core::partition::entity::{ColumnKind, ColumnLayout, PartitionId, TimeRange};
use strata_core::store::error::StoreError;
use strata_core::store::port::PartitionBackend;
use tracing::{debug, info};

// 与 OHLCV_LAYOUT 的列顺序一致：Datetime, Open, Close, High, Low, Volume
type PartitionRow = (DateTime<Utc>, i64, i64, i64, i64, i64);

const SELECT_COLUMNS: &str = r#""Datetime", "Open", "Close", "High", "Low", "Volume""#;

/// PartitionBackend 的 SQLite 实现，采用“一年一表”策略。
///
/// # Summary
/// 所有分区表位于同一个 SQLite 库中，表名即 `{symbol}_{year}`。
///
/// # Invariants
/// * 表名在进入本模块前已经过 `namer` 校验，此处仍统一以双引号转义。
/// * 时间戳与数值一律通过参数绑定传入，从不拼接进 SQL。
pub struct SqlitePartitionBackend {
    pool: SqlitePool,
}

impl SqlitePartitionBackend {
    /// 在配置的数据根目录下打开（或创建）行情库。
    ///
    /// # Logic
    /// 1. 确保数据根目录存在。
    /// 2. 以 `file_name` 拼出数据库路径并打开。
    pub async fn new(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let root = crate::config::get_root_dir();
        std::fs::create_dir_all(&root).map_err(|e| StoreError::Database(e.to_string()))?;
        Self::open(&crate::config::database_path(&config.file_name), config).await
    }

    /// 打开指定路径的行情库。
    pub async fn open(path: &Path, config: &DatabaseConfig) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(config.busy_timeout_secs));

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await
            .map_err(db_err)?;

        info!("Opened partition database at {}", path.display());
        Ok(Self { pool })
    }

    /// 供证券目录等同库组件共享连接池。
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    // 与 SQLite 自身的表名解析一致，按大小写不敏感匹配
    async fn table_exists(&self, table: &str) -> Result<bool, StoreError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ? COLLATE NOCASE",
        )
        .bind(table)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(count > 0)
    }
}

fn db_err(e: sqlx::Error) -> StoreError {
    StoreError::Database(e.to_string())
}

/// 以 SQL 标准双引号转义标识符。
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn create_table_sql(table: &str, layout: &ColumnLayout) -> String {
    let columns = layout
        .columns
        .iter()
        .map(|column| {
            let sql_type = match column.kind {
                ColumnKind::Temporal => "DATETIME",
                ColumnKind::Integer => "INTEGER",
            };
            format!("{} {} NOT NULL", quote_ident(column.name), sql_type)
        })
        .collect::<Vec<_>>()
        .join(", ");
    format!("CREATE TABLE {} ({})", quote_ident(table), columns)
}

fn create_index_sql(table: &str, column: &str) -> String {
    format!(
        "CREATE INDEX {} ON {} ({})",
        quote_ident(&format!("idx_{}_{}", table, column)),
        quote_ident(table),
        quote_ident(column)
    )
}

fn into_record(row: PartitionRow) -> EncodedRecord {
    EncodedRecord {
        timestamp: row.0,
        open: row.1,
        close: row.2,
        high: row.3,
        low: row.4,
        volume: row.5,
    }
}

#[async_trait]
impl PartitionBackend for SqlitePartitionBackend {
    /// # Summary
    /// 列出库中的分区表。
    ///
    /// # Logic
    /// 查询 `sqlite_master`，丢弃 `Main` 等不符合分区模板的表。
    async fn list_partitions(&self) -> Result<Vec<PartitionId>, StoreError> {
        let names: Vec<String> =
            sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
                .fetch_all(&self.pool)
                .await
                .map_err(db_err)?;

        Ok(names
            .iter()
            .filter_map(|name| PartitionId::parse(name).ok())
            .collect())
    }

    /// # Summary
    /// 创建分区表及其时间索引。
    ///
    /// # Logic
    /// 1. 开启事务。
    /// 2. 执行 `CREATE TABLE`（不带 IF NOT EXISTS，同名对象存在时由 SQLite 拒绝）。
    /// 3. 为布局中标记为索引的列建立索引。
    async fn create_partition(&self, id: &PartitionId, layout: &ColumnLayout) -> Result<(), StoreError> {
        let table = id.table_name();
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        sqlx::query(&create_table_sql(&table, layout))
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

        for column in layout.columns.iter().filter(|c| c.indexed) {
            sqlx::query(&create_index_sql(&table, column.name))
                .execute(&mut *tx)
                .await
                .map_err(db_err)?;
        }

        tx.commit().await.map_err(db_err)?;
        debug!("Created table {}", table);
        Ok(())
    }

    /// # Summary
    /// 读取分区行。
    ///
    /// # Logic
    /// 1. 分区表不存在时返回 `PartitionNotFound`。
    /// 2. 有谓词时使用 `BETWEEN ? AND ?`（闭区间），否则整表读取。
    async fn read(&self, id: &PartitionId, range: Option<TimeRange>) -> Result<Vec<EncodedRecord>, StoreError> {
        let table = id.table_name();
        if !self.table_exists(&table).await? {
            return Err(StoreError::PartitionNotFound(table));
        }

        let rows = match range {
            Some(range) => {
                let sql = format!(
                    r#"SELECT {} FROM {} WHERE "Datetime" BETWEEN ? AND ?"#,
                    SELECT_COLUMNS,
                    quote_ident(&table)
                );
                sqlx::query_as::<_, PartitionRow>(&sql)
                    .bind(range.start())
                    .bind(range.end())
                    .fetch_all(&self.pool)
                    .await
            }
            None => {
                let sql = format!("SELECT {} FROM {}", SELECT_COLUMNS, quote_ident(&table));
                sqlx::query_as::<_, PartitionRow>(&sql)
                    .fetch_all(&self.pool)
                    .await
            }
        }
        .map_err(db_err)?;

        Ok(rows.into_iter().map(into_record).collect())
    }

    /// # Summary
    /// 在单个事务中批量追加行。
    async fn append(&self, id: &PartitionId, rows: &[EncodedRecord]) -> Result<(), StoreError> {
        let table = id.table_name();
        if !self.table_exists(&table).await? {
            return Err(StoreError::PartitionNotFound(table));
        }

        let sql = format!(
            "INSERT INTO {} ({}) VALUES (?, ?, ?, ?, ?, ?)",
            quote_ident(&table),
            SELECT_COLUMNS
        );
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        for row in rows {
            sqlx::query(&sql)
                .bind(row.timestamp)
                .bind(row.open)
                .bind(row.close)
                .bind(row.high)
                .bind(row.low)
                .bind(row.volume)
                .execute(&mut *tx)
                .await
                .map_err(db_err)?;
        }
        tx.commit().await.map_err(db_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::partition::entity::OHLCV_LAYOUT;

    #[test]
    fn test_create_table_sql_uses_fixed_layout() {
        assert_eq!(
            create_table_sql("AAPL_2020", &OHLCV_LAYOUT),
            r#"CREATE TABLE "AAPL_2020" ("Datetime" DATETIME NOT NULL, "Open" INTEGER NOT NULL, "Close" INTEGER NOT NULL, "High" INTEGER NOT NULL, "Low" INTEGER NOT NULL, "Volume" INTEGER NOT NULL)"#
        );
    }

    #[test]
    fn test_create_index_sql() {
        assert_eq!(
            create_index_sql("AAPL_2020", "Datetime"),
            r#"CREATE INDEX "idx_AAPL_2020_Datetime" ON "AAPL_2020" ("Datetime")"#
        );
    }

    #[test]
    fn test_quote_ident_escapes_quotes() {
        assert_eq!(quote_ident(r#"a"b"#), r#""a""b""#);
    }
}
