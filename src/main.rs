//! # SQL Safety Guard CLI
//!
//! Developer front-end over the validation engine: reads SQL statements
//! from a file or stdin, runs every enabled safety rule, and reports the
//! findings.
//!
//! ```bash
//! # Check a SQL file with the default rules
//! sql-safety-guard check -i queries.sql
//!
//! # Stream from stdin with a deployment config
//! echo "DELETE FROM user" | sql-safety-guard check -i - -c guard.toml
//!
//! # JSON output for CI pipelines
//! sql-safety-guard check -i queries.sql -f json
//! ```
//!
//! # Exit Codes
//!
//! The process exit code reflects the highest risk found:
//!
//! - `0` - No findings, or informational only
//! - `1` - LOW or MEDIUM risk findings
//! - `2` - HIGH or CRITICAL risk findings

use std::{
    fs::read_to_string,
    io::{self, Read},
    process
};

use clap::Parser as ClapParser;
use sql_safety_guard::{
    cli::{Cli, Commands, Dialect, Format},
    config::GlobalConfig,
    context::{CommandKind, ExecutionLayer, SqlContext},
    error::ConfigError,
    output::{OutputFormat, OutputOptions, StatementReport, format_report},
    query::SqlDialect,
    rules::RiskLevel,
    validator::SqlSafetyValidator
};
use sqlparser::parser::Parser;

fn main() {
    match run() {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}

fn run() -> Result<i32, ConfigError> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Check {
            input,
            config,
            dialect,
            output_format,
            no_color
        } => {
            let sql = if input.to_str() == Some("-") {
                let mut buffer = String::new();
                io::stdin()
                    .read_to_string(&mut buffer)
                    .map_err(|e| ConfigError::Io {
                        path:   String::from("stdin"),
                        source: e
                    })?;
                buffer
            } else {
                read_to_string(&input).map_err(|e| ConfigError::Io {
                    path:   input.display().to_string(),
                    source: e
                })?
            };

            let mut global = match config {
                Some(path) => GlobalConfig::load(&path)?,
                None => GlobalConfig::standard()
            };
            global.parser.dialect = match dialect {
                Dialect::Generic => SqlDialect::Generic,
                Dialect::Mysql => SqlDialect::MySQL,
                Dialect::Postgresql => SqlDialect::PostgreSQL,
                Dialect::Sqlite => SqlDialect::SQLite,
                Dialect::Clickhouse => SqlDialect::ClickHouse
            };
            let parser_dialect = global.parser.dialect.into_parser_dialect();

            let validator = SqlSafetyValidator::new(global)?;

            // Split multi-statement input; each statement validates alone
            let statements: Vec<String> = match Parser::parse_sql(parser_dialect.as_ref(), &sql) {
                Ok(parsed) => parsed.iter().map(|s| s.to_string()).collect(),
                Err(_) => vec![sql.clone()]
            };

            let results: Vec<_> = statements
                .iter()
                .map(|stmt| {
                    let ctx = SqlContext::new(
                        stmt.clone(),
                        CommandKind::detect(stmt),
                        ExecutionLayer::Jdbc
                    );
                    validator.validate(&ctx)
                })
                .collect();

            let reports: Vec<StatementReport<'_>> = statements
                .iter()
                .zip(results.iter())
                .map(|(sql, result)| StatementReport {
                    sql,
                    result
                })
                .collect();

            let opts = OutputOptions {
                format:  match output_format {
                    Format::Text => OutputFormat::Text,
                    Format::Json => OutputFormat::Json
                },
                colored: !no_color
            };
            println!("{}", format_report(&reports, &opts));

            let max_risk = results.iter().filter_map(|r| r.risk()).max();
            let exit_code = match max_risk {
                Some(RiskLevel::Critical) | Some(RiskLevel::High) => 2,
                Some(RiskLevel::Medium) | Some(RiskLevel::Low) => 1,
                Some(RiskLevel::Info) | None => 0
            };
            Ok(exit_code)
        }
    }
}
