//! Statement facts extraction over the `sqlparser` AST.
//!
//! The parser facade hands each statement to [`StatementFacts::extract`],
//! which walks the AST once and records the structural facts rule checkers
//! consume: referenced tables, columns by clause, WHERE presence,
//! LIMIT/OFFSET values, ORDER BY presence, `SELECT *` and `COUNT(*)` usage.
//! Checkers that need deeper structure (tautology matching) traverse the
//! retained AST through the helpers in [`predicates`].

mod extract;
pub mod predicates;
mod types;

use sqlparser::dialect::{
    ClickHouseDialect, Dialect, GenericDialect, MySqlDialect, PostgreSqlDialect, SQLiteDialect
};
pub use types::{ColumnVec, StatementFacts};

/// SQL dialect for parsing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum SqlDialect {
    #[default]
    Generic,
    #[serde(rename = "mysql")]
    MySQL,
    #[serde(rename = "postgresql")]
    PostgreSQL,
    #[serde(rename = "sqlite")]
    SQLite,
    #[serde(rename = "clickhouse")]
    ClickHouse
}

impl SqlDialect {
    /// Convert to sqlparser dialect for parsing
    pub fn into_parser_dialect(self) -> Box<dyn Dialect> {
        match self {
            Self::Generic => Box::new(GenericDialect {}),
            Self::MySQL => Box::new(MySqlDialect {}),
            Self::PostgreSQL => Box::new(PostgreSqlDialect {}),
            Self::SQLite => Box::new(SQLiteDialect {}),
            Self::ClickHouse => Box::new(ClickHouseDialect {})
        }
    }
}
