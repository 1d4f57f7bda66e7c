use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// SQL Safety Guard - Validate SQL against the safety rule engine
#[derive(Parser, Debug)]
#[command(name = "sql-safety-guard")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate SQL statements from a file or stdin
    Check {
        /// Path to SQL file (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Path to a TOML config file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// SQL dialect for parsing
        #[arg(long, value_enum, default_value = "generic")]
        dialect: Dialect,

        /// Output format
        #[arg(short = 'f', long, value_enum, default_value = "text")]
        output_format: Format,

        /// Disable colored output
        #[arg(long)]
        no_color: bool
    }
}

#[derive(Debug, Clone, ValueEnum)]
pub enum Dialect {
    Generic,
    Mysql,
    Postgresql,
    Sqlite,
    Clickhouse
}

#[derive(Debug, Clone, ValueEnum)]
pub enum Format {
    Text,
    Json
}
