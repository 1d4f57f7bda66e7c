use super::{CheckContext, RiskLevel, RuleChecker, RuleInfo, Violation};
use crate::{
    context::CommandKind,
    query::predicates::{
        find_constant_true, is_tautology_only, join_on_expressions, parse_condition_patterns,
        top_level_selection
    }
};

/// Statement without a WHERE clause.
///
/// DELETE and UPDATE are always checked; SELECT checking is configurable
/// (`check_select`, on by default) and tolerates a LIMIT as the bounding
/// clause.
pub struct NoWhereClause;

impl RuleChecker for NoWhereClause {
    fn info(&self) -> RuleInfo {
        RuleInfo {
            id:                 "no-where-clause",
            name:               "Missing WHERE clause",
            risk:               RiskLevel::Critical,
            enabled_by_default: true
        }
    }

    fn check(&self, ctx: &CheckContext<'_>) -> Vec<Violation> {
        let Some(facts) = ctx.facts() else {
            return vec![];
        };
        if facts.has_where {
            return vec![];
        }
        let info = self.info();
        match facts.kind {
            CommandKind::Delete => vec![Violation {
                rule_id:    info.id,
                rule_name:  info.name,
                risk:       info.risk,
                message:    String::from("DELETE with missing WHERE clause removes all rows"),
                suggestion: Some(String::from("Add a WHERE clause to limit deleted rows")),
                location:   None
            }],
            CommandKind::Update => vec![Violation {
                rule_id:    info.id,
                rule_name:  info.name,
                risk:       info.risk,
                message:    String::from("UPDATE with missing WHERE clause affects all rows"),
                suggestion: Some(String::from("Add a WHERE clause to limit affected rows")),
                location:   None
            }],
            CommandKind::Select => {
                let check_select = ctx
                    .settings(info.id)
                    .and_then(|s| s.check_select)
                    .unwrap_or(true);
                if check_select && facts.limit.is_none() && !facts.tables.is_empty() {
                    vec![Violation {
                        rule_id:    info.id,
                        rule_name:  info.name,
                        risk:       info.risk,
                        message:    String::from(
                            "SELECT with missing WHERE clause and no LIMIT scans the entire table"
                        ),
                        suggestion: Some(String::from(
                            "Add a WHERE clause or LIMIT to bound the result set"
                        )),
                        location:   None
                    }]
                } else {
                    vec![]
                }
            }
            _ => vec![]
        }
    }
}

/// Constant-true condition in WHERE or JOIN ON.
///
/// Matching is structural over the parsed expression tree: `1=1`, literal
/// `TRUE`, `'a'='a'`, and any configured pattern. A tautology disables the
/// predicate it is chained into, which commonly turns a guarded statement
/// into a full-table one when a dynamic builder produced no conditions.
pub struct DummyCondition;

impl RuleChecker for DummyCondition {
    fn info(&self) -> RuleInfo {
        RuleInfo {
            id:                 "dummy-condition",
            name:               "Constant-true condition",
            risk:               RiskLevel::High,
            enabled_by_default: true
        }
    }

    fn check(&self, ctx: &CheckContext<'_>) -> Vec<Violation> {
        let Some(statement) = ctx.statement() else {
            return vec![];
        };
        let info = self.info();
        let patterns = ctx
            .settings(info.id)
            .map(|s| parse_condition_patterns(&s.patterns, ctx.config.parser.dialect))
            .unwrap_or_default();
        let mut violations = Vec::new();
        if let Some(selection) = top_level_selection(statement) {
            let mut matches = Vec::new();
            find_constant_true(selection, &patterns, &mut matches);
            for expr in matches {
                violations.push(Violation {
                    rule_id:    info.id,
                    rule_name:  info.name,
                    risk:       info.risk,
                    message:    format!("WHERE contains constant-true condition '{}'", expr),
                    suggestion: Some(String::from(
                        "Remove the constant-true condition or replace it with a real predicate"
                    )),
                    location:   None
                });
            }
        }
        for on_expr in join_on_expressions(statement) {
            let mut matches = Vec::new();
            find_constant_true(on_expr, &patterns, &mut matches);
            for expr in matches {
                violations.push(Violation {
                    rule_id:    info.id,
                    rule_name:  info.name,
                    risk:       info.risk,
                    message:    format!("JOIN ON contains constant-true condition '{}'", expr),
                    suggestion: Some(String::from(
                        "Replace the constant-true join condition with a key equality"
                    )),
                    location:   None
                });
            }
        }
        violations
    }
}

/// `COUNT(*)` over a whole table.
///
/// Disabled by default; enable it per deployment where unbounded counts are
/// a known hazard.
pub struct CountStar;

impl RuleChecker for CountStar {
    fn info(&self) -> RuleInfo {
        RuleInfo {
            id:                 "count-star",
            name:               "COUNT(*) without WHERE",
            risk:               RiskLevel::Medium,
            enabled_by_default: false
        }
    }

    fn check(&self, ctx: &CheckContext<'_>) -> Vec<Violation> {
        let Some(facts) = ctx.facts() else {
            return vec![];
        };
        if facts.kind != CommandKind::Select {
            return vec![];
        }
        if facts.has_count_star && !facts.has_where {
            let info = self.info();
            return vec![Violation {
                rule_id:    info.id,
                rule_name:  info.name,
                risk:       info.risk,
                message:    String::from("COUNT(*) without WHERE scans the entire table"),
                suggestion: Some(String::from(
                    "Add a WHERE clause or track the count in a summary table"
                )),
                location:   None
            }];
        }
        vec![]
    }
}

/// Shared tautology test used by the pagination rules: WHERE is present but
/// its truth does not depend on row data.
pub(super) fn where_is_tautology_only(ctx: &CheckContext<'_>) -> bool {
    let Some(statement) = ctx.statement() else {
        return false;
    };
    let Some(selection) = top_level_selection(statement) else {
        return false;
    };
    let patterns = ctx
        .settings("dummy-condition")
        .map(|s| parse_condition_patterns(&s.patterns, ctx.config.parser.dialect))
        .unwrap_or_default();
    is_tautology_only(selection, &patterns)
}
