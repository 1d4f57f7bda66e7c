mod expr;
mod set_expr;
mod table;

use compact_str::CompactString;
pub(crate) use expr::extract_columns_from_expr;
use indexmap::IndexSet;
use set_expr::extract_from_set_expr;
use sqlparser::ast::Statement;

use super::types::StatementFacts;
use crate::context::CommandKind;

/// Context for extracting statement facts
pub(crate) struct ExtractionContext<'a> {
    pub tables:          &'a mut IndexSet<CompactString>,
    pub select_cols:     &'a mut IndexSet<CompactString>,
    pub where_cols:      &'a mut IndexSet<CompactString>,
    pub has_where:       &'a mut bool,
    pub has_select_star: &'a mut bool,
    pub has_count_star:  &'a mut bool
}

impl StatementFacts {
    /// Walk a parsed statement once and record its structural facts.
    pub fn extract(stmt: &Statement) -> Self {
        let mut facts = Self::default();
        match stmt {
            Statement::Query(query) => {
                facts.kind = CommandKind::Select;
                extract_query(query, &mut facts);
            }
            Statement::Insert(insert) => {
                facts.kind = CommandKind::Insert;
                facts.tables.push(insert.table.to_string().into());
            }
            Statement::Update(update) => {
                facts.kind = CommandKind::Update;
                facts.tables.push(update.table.relation.to_string().into());
                for assignment in &update.assignments {
                    facts
                        .set_cols
                        .push(assignment_column(&assignment.target).into());
                }
                if let Some(sel) = &update.selection {
                    facts.has_where = true;
                    let mut cols = IndexSet::new();
                    extract_columns_from_expr(sel, &mut cols);
                    facts.where_cols = cols.into_iter().collect();
                }
            }
            Statement::Delete(delete) => {
                facts.kind = CommandKind::Delete;
                if let Some(sel) = &delete.selection {
                    facts.has_where = true;
                    let mut cols = IndexSet::new();
                    extract_columns_from_expr(sel, &mut cols);
                    facts.where_cols = cols.into_iter().collect();
                }
                if let sqlparser::ast::FromTable::WithFromKeyword(from_items)
                | sqlparser::ast::FromTable::WithoutKeyword(from_items) = &delete.from
                {
                    for item in from_items {
                        facts.tables.push(item.relation.to_string().into());
                    }
                }
            }
            _ => {
                facts.kind = CommandKind::Unknown;
            }
        }
        facts
    }
}

fn extract_query(query: &sqlparser::ast::Query, facts: &mut StatementFacts) {
    if let Some(limit_clause) = &query.limit_clause {
        use sqlparser::ast::LimitClause;
        // Both syntaxes carry the same pair of numeric expressions, just
        // arranged differently.
        let (limit, offset) = match limit_clause {
            LimitClause::LimitOffset {
                limit,
                offset,
                ..
            } => (limit.as_ref(), offset.as_ref().map(|o| &o.value)),
            LimitClause::OffsetCommaLimit {
                offset,
                limit,
                ..
            } => (Some(limit), Some(offset))
        };
        facts.limit = limit.and_then(numeric_literal);
        facts.offset = offset.and_then(numeric_literal);
    }
    if let Some(order_by) = &query.order_by
        && let sqlparser::ast::OrderByKind::Expressions(exprs) = &order_by.kind
    {
        facts.has_order_by = !exprs.is_empty();
        let mut cols = IndexSet::new();
        for expr in exprs {
            extract_columns_from_expr(&expr.expr, &mut cols);
        }
        facts.order_cols = cols.into_iter().collect();
    }
    let mut tables = IndexSet::new();
    let mut select_cols = IndexSet::new();
    let mut where_cols = IndexSet::new();
    let mut ctx = ExtractionContext {
        tables:          &mut tables,
        select_cols:     &mut select_cols,
        where_cols:      &mut where_cols,
        has_where:       &mut facts.has_where,
        has_select_star: &mut facts.has_select_star,
        has_count_star:  &mut facts.has_count_star
    };
    extract_from_set_expr(&query.body, &mut ctx);
    facts.tables = tables.into_iter().collect();
    facts.select_cols = select_cols.into_iter().collect();
    facts.where_cols = where_cols.into_iter().collect();
}

/// Value of a plain numeric literal expression, `None` for anything bound
/// at execution time (placeholders, arithmetic).
fn numeric_literal(expr: &sqlparser::ast::Expr) -> Option<u64> {
    if let sqlparser::ast::Expr::Value(value) = expr
        && let sqlparser::ast::Value::Number(n, _) = &value.value
    {
        n.parse().ok()
    } else {
        None
    }
}

/// Last path segment of an UPDATE assignment target.
fn assignment_column(target: &sqlparser::ast::AssignmentTarget) -> String {
    let rendered = target.to_string();
    rendered
        .rsplit('.')
        .next()
        .unwrap_or(&rendered)
        .to_string()
}
