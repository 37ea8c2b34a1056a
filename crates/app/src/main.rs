mod cli;

use clap::Parser;
use cli::{Cli, Command};
use std::error::Error;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use strata_core::config::{AppConfig, LogConfig};
use strata_core::ohlcv::entity::RawRecord;
use strata_core::store::port::{SymbolCatalog, SymbolMetadata};
use strata_partition::PartitionedStore;
use strata_store::catalog::SqliteSymbolCatalog;
use strata_store::config::set_root_dir;
use strata_store::sqlite::SqlitePartitionBackend;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// # Summary
/// 命令行入口，纯粹的 DI 容器。
///
/// # Logic
/// 1. 加载配置（`strata.toml` 与 `STRATA__*` 环境变量）。
/// 2. 初始化日志（终端 + 按天滚动的文件）。
/// 3. 实例化 SQLite 后端、证券目录与分区存储。
/// 4. 执行已解析的子命令。
#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let command = Cli::parse().command;

    // 1. 加载配置
    let config = load_config()?;

    // 2. 初始化日志，guard 需存活到进程结束以刷新文件日志
    let _log_guard = init_logging(&config.log)?;
    info!("Strata starting, data dir: {}", config.database.data_dir);

    // 3. 实例化基础设施层
    if !set_root_dir(PathBuf::from(&config.database.data_dir)) {
        warn!("Data root already set, ignoring {}", config.database.data_dir);
    }
    let backend = Arc::new(SqlitePartitionBackend::new(&config.database).await?);
    let catalog = SqliteSymbolCatalog::new(backend.pool().clone()).await?;
    let store = PartitionedStore::new(backend, &config.engine);

    // 4. 执行命令
    run(command, &store, &catalog).await
}

fn load_config() -> Result<AppConfig, config::ConfigError> {
    config::Config::builder()
        .add_source(config::File::with_name("strata").required(false))
        .add_source(
            config::Environment::with_prefix("STRATA")
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize()
}

fn init_logging(config: &LogConfig) -> Result<WorkerGuard, Box<dyn Error>> {
    std::fs::create_dir_all(&config.dir)?;
    let (file_writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(&config.dir, "strata.log"));
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&config.level))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(fmt::layer().with_ansi(false).with_writer(file_writer))
        .try_init()?;
    Ok(guard)
}

fn load_records(path: &Path) -> Result<Vec<RawRecord>, Box<dyn Error>> {
    let file = std::fs::File::open(path)?;
    Ok(parse_records(std::io::BufReader::new(file))?)
}

/// 解析 JSON 数组形式的原始记录；价格与成交量可写作字符串或数字。
fn parse_records<R: Read>(reader: R) -> Result<Vec<RawRecord>, serde_json::Error> {
    serde_json::from_reader(reader)
}

async fn run(
    command: Command,
    store: &PartitionedStore,
    catalog: &SqliteSymbolCatalog,
) -> Result<(), Box<dyn Error>> {
    match command {
        Command::Partitions => {
            for partition in store.partitions().await? {
                println!("{}", partition);
            }
        }
        Command::Symbols => {
            for symbol in store.symbols_available().await? {
                let years = store.years_available(&symbol).await?;
                match catalog.get(&symbol).await? {
                    Some(meta) => println!(
                        "{}\t{}\t{}\t{:?}",
                        symbol,
                        meta.security_type,
                        meta.sector.unwrap_or_default(),
                        years
                    ),
                    None => println!("{}\t-\t-\t{:?}", symbol, years),
                }
            }
        }
        Command::Register {
            symbol,
            security_type,
            sector,
        } => {
            catalog
                .register(&SymbolMetadata {
                    symbol,
                    security_type,
                    sector,
                })
                .await?;
        }
        Command::Import { symbol, path } => {
            let records = load_records(&path)?;
            info!("Importing {} records for {} from {}", records.len(), symbol, path.display());

            let report = store.insert(&symbol, &records).await?;
            for (year, summary) in &report.summaries {
                println!(
                    "{}_{}\tinserted {}\tskipped {}",
                    symbol, year, summary.inserted_count, summary.skipped_count
                );
            }
            for (year, error) in &report.failures {
                println!("{}_{}\tfailed: {}", symbol, year, error);
            }
            for rejected in &report.rejected {
                println!("record #{}\trejected: {}", rejected.index, rejected.error);
            }
            if !report.is_clean() {
                warn!(
                    "Import finished with {} failed years and {} rejected records",
                    report.failures.len(),
                    report.rejected.len()
                );
            }
        }
        Command::Query {
            symbol,
            start,
            end,
            format,
        } => {
            let rows = store.query_range_str(&symbol, &start, &end, &format).await?;
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
    }
    Ok(())
}
