//! Type definitions for the safety rule system.
//!
//! This module defines the core types used throughout the rule engine:
//! - [`RiskLevel`] - Violation risk levels (Info through Critical)
//! - [`Violation`] - Individual rule findings with context
//! - [`ValidationResult`] - Aggregated outcome of one validation
//! - [`RuleInfo`] - Rule metadata for identification and configuration

use serde::{Deserialize, Serialize};

/// Risk level of a rule violation.
///
/// Ordered from lowest to highest so the aggregate risk of a result is the
/// maximum over its violations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    /// Informational finding, never blocks
    Info,
    /// Low risk, worth reviewing
    Low,
    /// Medium risk, likely performance or correctness hazard
    Medium,
    /// High risk, dangerous pattern
    High,
    /// Critical risk, destructive or unbounded operation
    Critical
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "INFO"),
            Self::Low => write!(f, "LOW"),
            Self::Medium => write!(f, "MEDIUM"),
            Self::High => write!(f, "HIGH"),
            Self::Critical => write!(f, "CRITICAL")
        }
    }
}

/// Location reference attaching a finding to a call site.
///
/// Runtime findings carry the statement id; entries imported from a static
/// scan report may carry a file/line pair instead.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Location {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statement_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file:         Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line:         Option<u32>
}

impl Location {
    pub fn statement(statement_id: impl Into<String>) -> Self {
        Self {
            statement_id: Some(statement_id.into()),
            ..Self::default()
        }
    }

    pub fn source(file: impl Into<String>, line: u32) -> Self {
        Self {
            file: Some(file.into()),
            line: Some(line),
            ..Self::default()
        }
    }
}

/// A single rule finding.
///
/// Value-typed and freely shareable across threads.
#[derive(Debug, Clone, Serialize)]
pub struct Violation {
    /// Unique rule identifier; also the config key under `rules.`
    pub rule_id:    &'static str,
    /// Human-readable rule name
    pub rule_name:  &'static str,
    /// Risk level of this finding
    pub risk:       RiskLevel,
    /// Short description of the finding
    pub message:    String,
    /// Optional remediation suggestion
    pub suggestion: Option<String>,
    /// Optional call-site reference
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location:   Option<Location>
}

/// Metadata about a rule for identification and configuration.
#[derive(Debug, Clone)]
pub struct RuleInfo {
    /// Unique rule identifier (e.g., "no-where-clause")
    pub id:                 &'static str,
    /// Human-readable rule name
    pub name:               &'static str,
    /// Default risk level when no override is configured
    pub risk:               RiskLevel,
    /// Whether the rule runs when the config carries no entry for it
    pub enabled_by_default: bool
}

/// Outcome of validating one SQL attempt.
///
/// Mutable while checkers run, then frozen behind an `Arc` on return. The
/// aggregate risk is always the maximum over contained violations; an empty
/// list means the SQL passed.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    violations: Vec<Violation>
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, violation: Violation) {
        self.violations.push(violation);
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// Maximum risk over all violations, `None` when the SQL passed.
    pub fn risk(&self) -> Option<RiskLevel> {
        self.violations.iter().map(|v| v.risk).max()
    }

    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }

    /// Risk label for reporting: the level name, or `"PASS"`.
    pub fn risk_label(&self) -> String {
        match self.risk() {
            Some(risk) => risk.to_string(),
            None => String::from("PASS")
        }
    }
}

impl Serialize for ValidationResult {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer
    {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("ValidationResult", 3)?;
        state.serialize_field("risk", &self.risk_label())?;
        state.serialize_field("passed", &self.passed())?;
        state.serialize_field("violations", &self.violations)?;
        state.end()
    }
}
