//! Shared AST predicates for rule checkers.
//!
//! Checkers that care about expression structure (the tautology rules) use
//! these helpers instead of pattern-matching the AST themselves. Matching is
//! structural over the parsed tree, never textual: `WHERE 1 = 1` and
//! `WHERE 1=1` are the same expression here.

use sqlparser::{
    ast::{BinaryOperator, Expr, JoinOperator, SetExpr, Statement, Value},
    parser::Parser
};

use super::SqlDialect;

/// Top-level WHERE expression of a statement, if any.
///
/// For set operations the left-most SELECT is inspected, matching how the
/// facts extraction reports WHERE presence.
pub fn top_level_selection(stmt: &Statement) -> Option<&Expr> {
    match stmt {
        Statement::Query(query) => selection_of_set_expr(&query.body),
        Statement::Update(update) => update.selection.as_ref(),
        Statement::Delete(delete) => delete.selection.as_ref(),
        _ => None
    }
}

fn selection_of_set_expr(set_expr: &SetExpr) -> Option<&Expr> {
    match set_expr {
        SetExpr::Select(select) => select.selection.as_ref(),
        SetExpr::SetOperation {
            left, ..
        } => selection_of_set_expr(left),
        SetExpr::Query(query) => selection_of_set_expr(&query.body),
        _ => None
    }
}

/// All JOIN ... ON expressions in a statement.
pub fn join_on_expressions(stmt: &Statement) -> Vec<&Expr> {
    let mut out = Vec::new();
    if let Statement::Query(query) = stmt {
        collect_join_ons(&query.body, &mut out);
    }
    out
}

fn collect_join_ons<'a>(set_expr: &'a SetExpr, out: &mut Vec<&'a Expr>) {
    match set_expr {
        SetExpr::Select(select) => {
            for table in &select.from {
                for join in &table.joins {
                    match &join.join_operator {
                        JoinOperator::Inner(constraint)
                        | JoinOperator::LeftOuter(constraint)
                        | JoinOperator::RightOuter(constraint)
                        | JoinOperator::FullOuter(constraint) => {
                            if let sqlparser::ast::JoinConstraint::On(expr) = constraint {
                                out.push(expr);
                            }
                        }
                        _ => {}
                    }
                }
            }
        }
        SetExpr::SetOperation {
            left,
            right,
            ..
        } => {
            collect_join_ons(left, out);
            collect_join_ons(right, out);
        }
        SetExpr::Query(query) => collect_join_ons(&query.body, out),
        _ => {}
    }
}

/// Whether an expression is constant-true on its own: a literal `TRUE`, an
/// equality of two identical literals (`1=1`, `'a'='a'`), or a structural
/// match against one of the configured extra patterns.
pub fn is_constant_true(expr: &Expr, patterns: &[Expr]) -> bool {
    if patterns.iter().any(|p| p == expr) {
        return true;
    }
    match expr {
        Expr::Value(value) => matches!(&value.value, Value::Boolean(true)),
        Expr::Nested(inner) => is_constant_true(inner, patterns),
        Expr::BinaryOp {
            left,
            op: BinaryOperator::Eq,
            right
        } => is_literal(left) && left == right,
        _ => false
    }
}

fn is_literal(expr: &Expr) -> bool {
    matches!(expr, Expr::Value(_))
}

/// Collect every constant-true subexpression reachable through AND/OR
/// nesting, in source order. Comparison operands are not descended into.
pub fn find_constant_true<'a>(expr: &'a Expr, patterns: &[Expr], out: &mut Vec<&'a Expr>) {
    if is_constant_true(expr, patterns) {
        out.push(expr);
        return;
    }
    match expr {
        Expr::BinaryOp {
            left,
            op: BinaryOperator::And | BinaryOperator::Or,
            right
        } => {
            find_constant_true(left, patterns, out);
            find_constant_true(right, patterns, out);
        }
        Expr::Nested(inner) => find_constant_true(inner, patterns, out),
        _ => {}
    }
}

/// Whether a WHERE expression is tautological as a whole: its truth does
/// not depend on any row data. `1=1 AND status=1` is not tautological;
/// `status=1 OR 1=1` is.
pub fn is_tautology_only(expr: &Expr, patterns: &[Expr]) -> bool {
    if is_constant_true(expr, patterns) {
        return true;
    }
    match expr {
        Expr::BinaryOp {
            left,
            op: BinaryOperator::And,
            right
        } => is_tautology_only(left, patterns) && is_tautology_only(right, patterns),
        Expr::BinaryOp {
            left,
            op: BinaryOperator::Or,
            right
        } => is_tautology_only(left, patterns) || is_tautology_only(right, patterns),
        Expr::Nested(inner) => is_tautology_only(inner, patterns),
        _ => false
    }
}

/// Parse configured condition patterns (e.g. `"'x' = 'x'"`) into
/// expressions for structural comparison. Unparseable patterns are skipped.
pub fn parse_condition_patterns(patterns: &[String], dialect: SqlDialect) -> Vec<Expr> {
    let parser_dialect = dialect.into_parser_dialect();
    patterns
        .iter()
        .filter_map(|pattern| {
            Parser::new(parser_dialect.as_ref())
                .try_with_sql(pattern)
                .ok()?
                .parse_expr()
                .ok()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_where(sql: &str) -> Statement {
        let dialect = sqlparser::dialect::GenericDialect {};
        Parser::parse_sql(&dialect, sql)
            .unwrap()
            .into_iter()
            .next()
            .unwrap()
    }

    #[test]
    fn numeric_tautology_detected() {
        let stmt = parse_where("SELECT id FROM t WHERE 1 = 1");
        let selection = top_level_selection(&stmt).unwrap();
        assert!(is_constant_true(selection, &[]));
    }

    #[test]
    fn string_tautology_detected() {
        let stmt = parse_where("SELECT id FROM t WHERE 'a' = 'a'");
        let selection = top_level_selection(&stmt).unwrap();
        assert!(is_constant_true(selection, &[]));
    }

    #[test]
    fn real_condition_is_not_constant_true() {
        let stmt = parse_where("SELECT id FROM t WHERE status = 1");
        let selection = top_level_selection(&stmt).unwrap();
        assert!(!is_constant_true(selection, &[]));
    }

    #[test]
    fn and_chain_contains_tautology_but_is_not_tautology_only() {
        let stmt = parse_where("SELECT id FROM t WHERE 1=1 AND status = 1");
        let selection = top_level_selection(&stmt).unwrap();
        let mut found = Vec::new();
        find_constant_true(selection, &[], &mut found);
        assert_eq!(found.len(), 1);
        assert!(!is_tautology_only(selection, &[]));
    }

    #[test]
    fn or_with_tautology_is_tautology_only() {
        let stmt = parse_where("SELECT id FROM t WHERE status = 1 OR 1 = 1");
        let selection = top_level_selection(&stmt).unwrap();
        assert!(is_tautology_only(selection, &[]));
    }

    #[test]
    fn configured_pattern_matches_structurally() {
        let patterns = parse_condition_patterns(&[String::from("'x' <> 'y'")], SqlDialect::Generic);
        let stmt = parse_where("SELECT id FROM t WHERE 'x'   <>   'y'");
        let selection = top_level_selection(&stmt).unwrap();
        assert!(is_constant_true(selection, &patterns));
    }
}
