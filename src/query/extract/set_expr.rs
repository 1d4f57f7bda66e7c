use super::{
    ExtractionContext,
    expr::{extract_columns_from_expr, is_count_star},
    table::extract_from_table_factor
};

pub(super) fn extract_from_set_expr(
    set_expr: &sqlparser::ast::SetExpr,
    ctx: &mut ExtractionContext<'_>
) {
    use sqlparser::ast::SetExpr;
    match set_expr {
        SetExpr::Select(select) => {
            for item in &select.projection {
                match item {
                    sqlparser::ast::SelectItem::Wildcard(_)
                    | sqlparser::ast::SelectItem::QualifiedWildcard(..) => {
                        *ctx.has_select_star = true;
                    }
                    sqlparser::ast::SelectItem::UnnamedExpr(expr)
                    | sqlparser::ast::SelectItem::ExprWithAlias {
                        expr, ..
                    } => {
                        if is_count_star(expr) {
                            *ctx.has_count_star = true;
                        }
                        extract_columns_from_expr(expr, ctx.select_cols);
                    }
                }
            }
            for table in &select.from {
                extract_from_table_factor(&table.relation, ctx.tables);
                for join in &table.joins {
                    extract_from_table_factor(&join.relation, ctx.tables);
                }
            }
            if let Some(selection) = &select.selection {
                *ctx.has_where = true;
                extract_columns_from_expr(selection, ctx.where_cols);
            }
        }
        SetExpr::SetOperation {
            left,
            right,
            ..
        } => {
            extract_from_set_expr(left, ctx);
            extract_from_set_expr(right, ctx);
        }
        SetExpr::Query(query) => {
            extract_from_set_expr(&query.body, ctx);
        }
        _ => {}
    }
}
