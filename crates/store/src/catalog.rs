use async_trait::async_trait;
use sqlx::SqlitePool;
use strata_core::partition::namer::canonical_symbol;
use strata_core::store::error::StoreError;
use strata_core::store::port::{SymbolCatalog, SymbolMetadata};

/// SymbolCatalog 的 SQLite 实现。
///
/// # Summary
/// 在行情库的 `Main` 表中维护证券代码、证券类型与板块。
///
/// # Invariants
/// * 表结构在实例创建时初始化。
/// * `Main` 不符合 `{symbol}_{year}` 模板，不会被当作分区列出。
/// * 证券代码与分区使用同一规范形式（大写）存储和查找。
pub struct SqliteSymbolCatalog {
    pool: SqlitePool,
}

impl SqliteSymbolCatalog {
    /// 基于共享连接池创建目录并初始化 `Main` 表。
    pub async fn new(pool: SqlitePool) -> Result<Self, StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS "Main" (
                "TickerSymbol" TEXT PRIMARY KEY,
                "SecurityType" TEXT NOT NULL,
                "Sector" TEXT
            );
            "#,
        )
        .execute(&pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(Self { pool })
    }
}

fn into_metadata(row: (String, String, Option<String>)) -> SymbolMetadata {
    SymbolMetadata {
        symbol: row.0,
        security_type: row.1,
        sector: row.2,
    }
}

#[async_trait]
impl SymbolCatalog for SqliteSymbolCatalog {
    /// # Summary
    /// 保存或更新证券条目。
    ///
    /// # Logic
    /// 规范化证券代码后在 `Main` 表上执行 `INSERT OR REPLACE`。
    async fn register(&self, metadata: &SymbolMetadata) -> Result<(), StoreError> {
        let symbol = canonical_symbol(&metadata.symbol)?;
        sqlx::query(r#"INSERT OR REPLACE INTO "Main" ("TickerSymbol", "SecurityType", "Sector") VALUES (?, ?, ?)"#)
            .bind(symbol)
            .bind(&metadata.security_type)
            .bind(&metadata.sector)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;
        Ok(())
    }

    async fn get(&self, symbol: &str) -> Result<Option<SymbolMetadata>, StoreError> {
        let symbol = canonical_symbol(symbol)?;
        let row = sqlx::query_as::<_, (String, String, Option<String>)>(
            r#"SELECT "TickerSymbol", "SecurityType", "Sector" FROM "Main" WHERE "TickerSymbol" = ?"#,
        )
        .bind(symbol)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;
        Ok(row.map(into_metadata))
    }

    async fn list(&self) -> Result<Vec<SymbolMetadata>, StoreError> {
        let rows = sqlx::query_as::<_, (String, String, Option<String>)>(
            r#"SELECT "TickerSymbol", "SecurityType", "Sector" FROM "Main" ORDER BY "TickerSymbol""#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;
        Ok(rows.into_iter().map(into_metadata).collect())
    }
}
