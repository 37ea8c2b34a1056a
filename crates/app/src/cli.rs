use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// 查询命令未指定格式时使用的日期格式
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Parser)]
#[command(name = "strata", version, about = "Year-partitioned OHLCV store")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// # Summary
/// 命令行子命令。
#[derive(Debug, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// List every partition table
    Partitions,
    /// List symbols with data, their catalog entry and years
    Symbols,
    /// Register or update a catalog entry
    Register {
        symbol: String,
        security_type: String,
        sector: Option<String>,
    },
    /// Import a JSON array of raw records
    Import { symbol: String, path: PathBuf },
    /// Query an inclusive date range and print JSON
    Query {
        symbol: String,
        start: String,
        end: String,

        /// chrono format of START and END
        #[arg(long, default_value = DEFAULT_DATE_FORMAT)]
        format: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Command, clap::Error> {
        Cli::try_parse_from(std::iter::once("strata").chain(args.iter().copied())).map(|cli| cli.command)
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(parse(&["partitions"]).unwrap(), Command::Partitions);
        assert_eq!(
            parse(&["import", "AAPL", "bars.json"]).unwrap(),
            Command::Import {
                symbol: "AAPL".to_string(),
                path: PathBuf::from("bars.json"),
            }
        );
        assert_eq!(
            parse(&["query", "AAPL", "2018-06-01", "2020-03-01"]).unwrap(),
            Command::Query {
                symbol: "AAPL".to_string(),
                start: "2018-06-01".to_string(),
                end: "2020-03-01".to_string(),
                format: DEFAULT_DATE_FORMAT.to_string(),
            }
        );
        assert_eq!(
            parse(&["query", "AAPL", "2018-06-01 09:30", "2018-06-01 16:00", "--format", "%Y-%m-%d %H:%M"]).unwrap(),
            Command::Query {
                symbol: "AAPL".to_string(),
                start: "2018-06-01 09:30".to_string(),
                end: "2018-06-01 16:00".to_string(),
                format: "%Y-%m-%d %H:%M".to_string(),
            }
        );
        assert_eq!(
            parse(&["register", "SPY", "ETF"]).unwrap(),
            Command::Register {
                symbol: "SPY".to_string(),
                security_type: "ETF".to_string(),
                sector: None,
            }
        );
        assert_eq!(
            parse(&["register", "XOM", "Stock", "Energy"]).unwrap(),
            Command::Register {
                symbol: "XOM".to_string(),
                security_type: "Stock".to_string(),
                sector: Some("Energy".to_string()),
            }
        );
    }

    #[test]
    fn test_parse_rejects_unknown() {
        assert!(parse(&[]).is_err());
        assert!(parse(&["query", "AAPL"]).is_err());
        assert!(parse(&["drop", "AAPL"]).is_err());
    }
}
