use super::{CheckContext, RiskLevel, RuleChecker, RuleInfo, Violation, safety};
use crate::context::CommandKind;

const DEFAULT_MAX_OFFSET: u64 = 10_000;
const DEFAULT_MAX_PAGE_SIZE: u64 = 1_000;

/// Logical (in-memory) pagination: the caller passed an offset/size marker
/// to the ORM layer but the resolved SQL carries no LIMIT, so the database
/// returns the full result set and the pages are cut in application memory.
pub struct LogicalPagination;

impl RuleChecker for LogicalPagination {
    fn info(&self) -> RuleInfo {
        RuleInfo {
            id:                 "logical-pagination",
            name:               "Logical pagination",
            risk:               RiskLevel::Critical,
            enabled_by_default: true
        }
    }

    fn check(&self, ctx: &CheckContext<'_>) -> Vec<Violation> {
        let Some(facts) = ctx.facts() else {
            return vec![];
        };
        if facts.kind != CommandKind::Select {
            return vec![];
        }
        let Some(page) = ctx.sql.page() else {
            return vec![];
        };
        if facts.limit.is_some() {
            // marker plus a physical LIMIT is the healthy path
            return vec![];
        }
        let info = self.info();
        vec![Violation {
            rule_id:    info.id,
            rule_name:  info.name,
            risk:       info.risk,
            message:    format!(
                "logical pagination (offset={}, size={}) without LIMIT loads the full result set",
                page.offset, page.size
            ),
            suggestion: Some(String::from(
                "Route the query through the physical pagination plugin so a LIMIT is applied"
            )),
            location:   None
        }]
    }
}

/// Pagination over an unbounded predicate: the marker is present but the
/// WHERE clause is absent or tautological, so every page re-scans the table.
pub struct NoConditionPagination;

impl RuleChecker for NoConditionPagination {
    fn info(&self) -> RuleInfo {
        RuleInfo {
            id:                 "no-condition-pagination",
            name:               "Pagination without condition",
            risk:               RiskLevel::Critical,
            enabled_by_default: true
        }
    }

    fn check(&self, ctx: &CheckContext<'_>) -> Vec<Violation> {
        let Some(facts) = ctx.facts() else {
            return vec![];
        };
        if facts.kind != CommandKind::Select || ctx.sql.page().is_none() {
            return vec![];
        }
        let tautological = facts.has_where && safety::where_is_tautology_only(ctx);
        if facts.has_where && !tautological {
            return vec![];
        }
        let info = self.info();
        let detail = if tautological {
            "a constant-true WHERE clause"
        } else {
            "no WHERE clause"
        };
        vec![Violation {
            rule_id:    info.id,
            rule_name:  info.name,
            risk:       info.risk,
            message:    format!("pagination applied with {}", detail),
            suggestion: Some(String::from(
                "Add a selective WHERE clause before paginating"
            )),
            location:   None
        }]
    }
}

/// OFFSET beyond the configured maximum.
pub struct DeepPagination;

impl RuleChecker for DeepPagination {
    fn info(&self) -> RuleInfo {
        RuleInfo {
            id:                 "deep-pagination",
            name:               "Deep pagination offset",
            risk:               RiskLevel::Medium,
            enabled_by_default: true
        }
    }

    fn check(&self, ctx: &CheckContext<'_>) -> Vec<Violation> {
        let Some(facts) = ctx.facts() else {
            return vec![];
        };
        if facts.kind != CommandKind::Select {
            return vec![];
        }
        let Some(offset) = facts.offset else {
            return vec![];
        };
        let info = self.info();
        let max_offset = ctx
            .settings(info.id)
            .and_then(|s| s.max_offset)
            .unwrap_or(DEFAULT_MAX_OFFSET);
        if offset > max_offset {
            return vec![Violation {
                rule_id:    info.id,
                rule_name:  info.name,
                risk:       info.risk,
                message:    format!(
                    "OFFSET {} exceeds the configured maximum of {}",
                    offset, max_offset
                ),
                suggestion: Some(String::from(
                    "Use keyset pagination (WHERE id > last_id) instead"
                )),
                location:   None
            }];
        }
        vec![]
    }
}

/// LIMIT beyond the configured maximum page size.
pub struct LargePageSize;

impl RuleChecker for LargePageSize {
    fn info(&self) -> RuleInfo {
        RuleInfo {
            id:                 "large-page-size",
            name:               "Large page size",
            risk:               RiskLevel::Medium,
            enabled_by_default: true
        }
    }

    fn check(&self, ctx: &CheckContext<'_>) -> Vec<Violation> {
        let Some(facts) = ctx.facts() else {
            return vec![];
        };
        if facts.kind != CommandKind::Select {
            return vec![];
        }
        let Some(limit) = facts.limit else {
            return vec![];
        };
        let info = self.info();
        let max_page_size = ctx
            .settings(info.id)
            .and_then(|s| s.max_page_size)
            .unwrap_or(DEFAULT_MAX_PAGE_SIZE);
        if limit > max_page_size {
            return vec![Violation {
                rule_id:    info.id,
                rule_name:  info.name,
                risk:       info.risk,
                message:    format!(
                    "page size {} exceeds the configured maximum of {}",
                    limit, max_page_size
                ),
                suggestion: Some(String::from("Reduce the page size or stream the result")),
                location:   None
            }];
        }
        vec![]
    }
}

/// LIMIT without ORDER BY: page boundaries depend on storage order and the
/// same request may return different rows across executions.
pub struct MissingOrderBy;

impl RuleChecker for MissingOrderBy {
    fn info(&self) -> RuleInfo {
        RuleInfo {
            id:                 "missing-order-by",
            name:               "LIMIT without ORDER BY",
            risk:               RiskLevel::Low,
            enabled_by_default: true
        }
    }

    fn check(&self, ctx: &CheckContext<'_>) -> Vec<Violation> {
        let Some(facts) = ctx.facts() else {
            return vec![];
        };
        if facts.kind != CommandKind::Select {
            return vec![];
        }
        if facts.limit.is_some() && !facts.has_order_by {
            let info = self.info();
            return vec![Violation {
                rule_id:    info.id,
                rule_name:  info.name,
                risk:       info.risk,
                message:    String::from("LIMIT without ORDER BY returns nondeterministic pages"),
                suggestion: Some(String::from("Add an ORDER BY over a unique key")),
                location:   None
            }];
        }
        vec![]
    }
}

/// SELECT without LIMIT against a table estimated large.
///
/// Fires at the default risk when no bounding WHERE is present; downgrades
/// to INFO when a narrow (non-tautological) WHERE exists. Inactive until
/// `large_tables` is configured.
pub struct NoPagination;

impl RuleChecker for NoPagination {
    fn info(&self) -> RuleInfo {
        RuleInfo {
            id:                 "no-pagination",
            name:               "Unbounded SELECT",
            risk:               RiskLevel::Medium,
            enabled_by_default: true
        }
    }

    fn check(&self, ctx: &CheckContext<'_>) -> Vec<Violation> {
        let Some(facts) = ctx.facts() else {
            return vec![];
        };
        if facts.kind != CommandKind::Select {
            return vec![];
        }
        if facts.limit.is_some() || ctx.sql.page().is_some() {
            return vec![];
        }
        let info = self.info();
        let Some(settings) = ctx.settings(info.id) else {
            return vec![];
        };
        let Some(table) = settings
            .large_tables
            .iter()
            .find(|t| facts.references_table(t))
        else {
            return vec![];
        };
        let narrow_where = facts.has_where && !safety::where_is_tautology_only(ctx);
        if narrow_where {
            vec![Violation {
                rule_id:    info.id,
                rule_name:  info.name,
                risk:       RiskLevel::Info,
                message:    format!(
                    "SELECT on large table '{}' has no LIMIT; the WHERE clause is the only bound",
                    table
                ),
                suggestion: Some(String::from("Consider adding a LIMIT as a safety net")),
                location:   None
            }]
        } else {
            vec![Violation {
                rule_id:    info.id,
                rule_name:  info.name,
                risk:       info.risk,
                message:    format!(
                    "SELECT on large table '{}' without LIMIT or bounding WHERE",
                    table
                ),
                suggestion: Some(String::from("Add a LIMIT and a selective WHERE clause")),
                location:   None
            }]
        }
    }
}
