//! Error types for the SQL safety engine.
//!
//! # Error Categories
//!
//! - **Safety violation**: a value on a successful validation; only the
//!   BLOCK strategy converts it into [`SqlSafetyError`] at the boundary
//! - **Parse failure**: [`ParseError`], surfaced as an INFO diagnostic in
//!   strict mode and suppressed in lenient mode
//! - **Configuration error**: [`ConfigError`], rejected on reload with the
//!   current config left in place
//! - **Proxy errors**: [`GuardError`] wraps either a safety rejection or
//!   the underlying database error at the connection-proxy boundary

use thiserror::Error;

use crate::rules::{RiskLevel, ValidationResult, Violation};

/// Vendor-neutral SQLSTATE reported for safety rejections.
pub const SQL_STATE_SAFETY_VIOLATION: &str = "42000";

/// Raised by the BLOCK strategy when a validation produced violations.
#[derive(Debug, Clone, Error)]
#[error("SQL safety violation [datasource={datasource}, risk={risk}]: {details}")]
pub struct SqlSafetyError {
    pub datasource: String,
    pub risk:       RiskLevel,
    pub details:    String,
    pub violations: Vec<Violation>
}

impl SqlSafetyError {
    pub fn from_result(result: &ValidationResult, datasource: Option<&str>) -> Self {
        let details = result
            .violations()
            .iter()
            .map(|v| v.message.as_str())
            .collect::<Vec<_>>()
            .join("; ");
        Self {
            datasource: datasource.unwrap_or("-").to_string(),
            risk: result.risk().unwrap_or(RiskLevel::Info),
            details,
            violations: result.violations().to_vec()
        }
    }

    /// The vendor-neutral SQLSTATE for this error class.
    pub fn sql_state(&self) -> &'static str {
        SQL_STATE_SAFETY_VIOLATION
    }
}

/// SQL parse failure from the parser facade (strict mode only).
#[derive(Debug, Clone, Error)]
pub enum ParseError {
    #[error("{0}")]
    Syntax(String),
    #[error("no SQL statement found")]
    Empty
}

impl ParseError {
    pub fn syntax(message: impl Into<String>) -> Self {
        Self::Syntax(format_sql_error("SQL parse error", &message.into()))
    }
}

/// Configuration loading or validation failure.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Io {
        path:   String,
        #[source]
        source: std::io::Error
    },
    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String)
}

/// Error surface of the connection/statement proxy chain: either the SQL
/// was rejected by the safety engine, or the underlying driver failed.
#[derive(Debug, Error)]
pub enum GuardError<E>
where
    E: std::error::Error + 'static
{
    #[error(transparent)]
    Safety(#[from] SqlSafetyError),
    #[error("database error: {0}")]
    Database(#[source] E)
}

/// Prefix a parse-failure message with the position sqlparser embeds as
/// `"Line: X, Column Y"`, when one is present.
fn format_sql_error(prefix: &str, message: &str) -> String {
    match embedded_position(message) {
        Some((line, column)) => {
            format!("{} at line {}, column {}: {}", prefix, line, column, message)
        }
        None => format!("{}: {}", prefix, message)
    }
}

fn embedded_position(message: &str) -> Option<(u32, u32)> {
    let (_, rest) = message.split_once("Line: ")?;
    let (line, rest) = rest.split_once(", Column ")?;
    let column: String = rest.chars().take_while(char::is_ascii_digit).collect();
    Some((line.trim().parse().ok()?, column.parse().ok()?))
}
