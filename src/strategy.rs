//! Violation handling strategy applied at the interception boundary.
//!
//! The validator itself only returns values; how a non-empty result is
//! acted upon is the strategy's job: reject the execution (BLOCK), log and
//! continue (WARN), or quietly record (LOG).

use serde::{Deserialize, Serialize};

use crate::{error::SqlSafetyError, rules::ValidationResult};

/// How the engine responds to a non-empty validation result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ViolationStrategy {
    /// Reject the execution with a safety error (SQLSTATE 42000)
    #[default]
    Block,
    /// Log the violations at WARN and allow execution
    Warn,
    /// Log the violations at INFO and allow execution
    Log
}

impl ViolationStrategy {
    pub fn should_block(self) -> bool {
        matches!(self, Self::Block)
    }

    pub fn should_log(self) -> bool {
        matches!(self, Self::Warn | Self::Log)
    }

    pub fn log_level(self) -> tracing::Level {
        match self {
            Self::Block => tracing::Level::ERROR,
            Self::Warn => tracing::Level::WARN,
            Self::Log => tracing::Level::INFO
        }
    }

    /// Apply this strategy to a validation result.
    ///
    /// Returns `Err` only under BLOCK with at least one violation; WARN and
    /// LOG emit a structured record and let the execution continue.
    pub fn enforce(
        self,
        result: &ValidationResult,
        datasource: Option<&str>
    ) -> Result<(), SqlSafetyError> {
        if result.passed() {
            return Ok(());
        }
        match self {
            Self::Block => Err(SqlSafetyError::from_result(result, datasource)),
            Self::Warn => {
                tracing::warn!(
                    risk = %result.risk_label(),
                    datasource = datasource.unwrap_or("-"),
                    violations = ?result.violations(),
                    "SQL safety violations detected"
                );
                Ok(())
            }
            Self::Log => {
                tracing::info!(
                    risk = %result.risk_label(),
                    datasource = datasource.unwrap_or("-"),
                    violations = ?result.violations(),
                    "SQL safety violations detected"
                );
                Ok(())
            }
        }
    }
}

impl std::fmt::Display for ViolationStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Block => write!(f, "BLOCK"),
            Self::Warn => write!(f, "WARN"),
            Self::Log => write!(f, "LOG")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{RiskLevel, Violation};

    fn failing_result() -> ValidationResult {
        let mut result = ValidationResult::new();
        result.push(Violation {
            rule_id:    "no-where-clause",
            rule_name:  "Missing WHERE clause",
            risk:       RiskLevel::Critical,
            message:    String::from("missing WHERE clause"),
            suggestion: None,
            location:   None
        });
        result
    }

    #[test]
    fn block_rejects_non_empty_result() {
        let err = ViolationStrategy::Block
            .enforce(&failing_result(), None)
            .unwrap_err();
        assert_eq!(err.sql_state(), "42000");
        assert_eq!(err.risk, RiskLevel::Critical);
    }

    #[test]
    fn block_passes_empty_result() {
        assert!(
            ViolationStrategy::Block
                .enforce(&ValidationResult::new(), None)
                .is_ok()
        );
    }

    #[test]
    fn warn_and_log_never_reject() {
        assert!(ViolationStrategy::Warn.enforce(&failing_result(), None).is_ok());
        assert!(ViolationStrategy::Log.enforce(&failing_result(), None).is_ok());
    }

    #[test]
    fn predicates() {
        assert!(ViolationStrategy::Block.should_block());
        assert!(!ViolationStrategy::Warn.should_block());
        assert!(ViolationStrategy::Warn.should_log());
        assert!(ViolationStrategy::Log.should_log());
        assert!(!ViolationStrategy::Block.should_log());
    }
}
