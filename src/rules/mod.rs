//! Safety rule engine for resolved SQL.
//!
//! This module provides the rule checker orchestration used by the
//! validator. Rules are implemented as types that implement the
//! [`RuleChecker`] trait and are executed in configured order against a
//! parsed statement, appending [`Violation`]s to a [`ValidationResult`].
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌───────────────────┐
//! │ SqlContext  │────▶│  CheckerSet  │────▶│ ValidationResult  │
//! └─────────────┘     └──────────────┘     └───────────────────┘
//!                            │
//!                     ┌──────┴──────┐
//!                     │  Checkers   │
//!                     │ (in order)  │
//!                     └─────────────┘
//! ```
//!
//! Ordering is deterministic: the optional `rule_order` config list first,
//! then registration order. A checker that panics is logged at WARN and
//! contributes no violations; its peers always run.
//!
//! # Implementing Custom Checkers
//!
//! ```ignore
//! use sql_safety_guard::rules::{CheckContext, RiskLevel, RuleChecker, RuleInfo, Violation};
//!
//! pub struct MyChecker;
//!
//! impl RuleChecker for MyChecker {
//!     fn info(&self) -> RuleInfo {
//!         RuleInfo {
//!             id: "my-rule",
//!             name: "My custom rule",
//!             risk: RiskLevel::Medium,
//!             enabled_by_default: true,
//!         }
//!     }
//!
//!     fn check(&self, ctx: &CheckContext<'_>) -> Vec<Violation> {
//!         vec![]
//!     }
//! }
//! ```

mod fields;
mod pagination;
mod safety;
mod types;

use std::panic::{AssertUnwindSafe, catch_unwind};

pub use fields::{BlacklistField, WhitelistField};
pub use pagination::{
    DeepPagination, LargePageSize, LogicalPagination, MissingOrderBy, NoConditionPagination,
    NoPagination
};
pub use safety::{CountStar, DummyCondition, NoWhereClause};
use sqlparser::ast::Statement;
pub use types::{Location, RiskLevel, RuleInfo, ValidationResult, Violation};

use crate::{
    config::{GlobalConfig, RuleSettings},
    context::{CommandKind, SqlContext},
    parser::ParsedStatement,
    query::StatementFacts
};

/// Everything a checker may look at for one SQL attempt.
///
/// Checkers never mutate the context or each other's state; for a given
/// `(context, config)` pair the outcome is deterministic.
pub struct CheckContext<'a> {
    pub sql:    &'a SqlContext,
    pub parsed: &'a ParsedStatement,
    pub config: &'a GlobalConfig
}

impl CheckContext<'_> {
    pub fn facts(&self) -> Option<&StatementFacts> {
        self.parsed.facts()
    }

    pub fn statement(&self) -> Option<&Statement> {
        self.parsed.statement()
    }

    /// Command kind, preferring the parsed statement over the caller's tag.
    pub fn kind(&self) -> CommandKind {
        self.facts().map(|f| f.kind).unwrap_or_else(|| self.sql.kind())
    }

    pub fn settings(&self, id: &str) -> Option<&RuleSettings> {
        self.config.rule(id)
    }
}

/// Trait for implementing safety rule checkers.
///
/// Checkers are stateless analyzers over one parsed statement. They must be
/// `Send + Sync`: a single instance is shared across all validating
/// threads. A checker facing a degraded (unparseable) statement skips
/// silently.
pub trait RuleChecker: Send + Sync {
    /// Returns metadata about this checker.
    fn info(&self) -> RuleInfo;

    /// Analyzes the statement and returns any violations found.
    fn check(&self, ctx: &CheckContext<'_>) -> Vec<Violation>;
}

/// Rule ids known to the engine, in registration order.
pub fn known_rule_ids() -> &'static [&'static str] {
    &[
        "no-where-clause",
        "dummy-condition",
        "blacklist-field",
        "whitelist-field",
        "logical-pagination",
        "no-condition-pagination",
        "deep-pagination",
        "large-page-size",
        "missing-order-by",
        "no-pagination",
        "count-star",
    ]
}

/// Ordered collection of rule checkers.
///
/// Owns the checker instances; enablement and risk overrides are read from
/// the per-call config snapshot so a hot reload never rebuilds the set.
pub struct CheckerSet {
    checkers: Vec<Box<dyn RuleChecker>>
}

impl Default for CheckerSet {
    fn default() -> Self {
        Self::standard()
    }
}

impl CheckerSet {
    /// All built-in checkers in their canonical registration order.
    pub fn standard() -> Self {
        Self::with_checkers(vec![
            Box::new(NoWhereClause),
            Box::new(DummyCondition),
            Box::new(BlacklistField),
            Box::new(WhitelistField),
            Box::new(LogicalPagination),
            Box::new(NoConditionPagination),
            Box::new(DeepPagination),
            Box::new(LargePageSize),
            Box::new(MissingOrderBy),
            Box::new(NoPagination),
            Box::new(CountStar),
        ])
    }

    pub fn with_checkers(checkers: Vec<Box<dyn RuleChecker>>) -> Self {
        Self {
            checkers
        }
    }

    /// Run every enabled checker against the context, appending violations
    /// in execution order.
    pub fn run(&self, ctx: &CheckContext<'_>, result: &mut ValidationResult) {
        for index in self.execution_order(ctx.config) {
            let checker = &self.checkers[index];
            let info = checker.info();
            if !ctx.config.rule_enabled(&info) {
                continue;
            }
            let outcome = catch_unwind(AssertUnwindSafe(|| checker.check(ctx)));
            match outcome {
                Ok(violations) => {
                    for mut violation in violations {
                        // An override replaces the rule's default level only;
                        // a checker that deliberately downgraded (e.g. the
                        // INFO fallback of no-pagination) keeps its choice.
                        if violation.risk == info.risk
                            && let Some(risk) = ctx.config.risk_override(info.id)
                        {
                            violation.risk = risk;
                        }
                        if violation.location.is_none() {
                            violation.location =
                                Some(Location::statement(ctx.sql.statement_id()));
                        }
                        result.push(violation);
                    }
                }
                Err(_) => {
                    tracing::warn!(
                        rule = info.id,
                        statement_id = ctx.sql.statement_id(),
                        "rule checker panicked; skipping its findings"
                    );
                }
            }
        }
    }

    /// Execution order: rules listed in `rule_order` first (in list order),
    /// then the rest in registration order.
    fn execution_order(&self, config: &GlobalConfig) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.checkers.len()).collect();
        if !config.rule_order.is_empty() {
            order.sort_by_key(|&i| {
                let id = self.checkers[i].info().id;
                config
                    .rule_order
                    .iter()
                    .position(|configured| configured == id)
                    .unwrap_or(usize::MAX)
            });
        }
        order
    }
}
