use compact_str::CompactString;
use indexmap::IndexSet;

pub(super) fn extract_from_table_factor(
    table_factor: &sqlparser::ast::TableFactor,
    tables: &mut IndexSet<CompactString>
) {
    use sqlparser::ast::TableFactor;

    match table_factor {
        TableFactor::Table {
            name, ..
        } => {
            tables.insert(name.to_string().into());
        }
        TableFactor::Derived {
            subquery, ..
        } => {
            collect_tables_from_set_expr(&subquery.body, tables);
        }
        TableFactor::NestedJoin {
            table_with_joins, ..
        } => {
            extract_from_table_factor(&table_with_joins.relation, tables);
            for join in &table_with_joins.joins {
                extract_from_table_factor(&join.relation, tables);
            }
        }
        _ => {}
    }
}

/// Table names only; derived tables contribute their inner relations.
fn collect_tables_from_set_expr(
    set_expr: &sqlparser::ast::SetExpr,
    tables: &mut IndexSet<CompactString>
) {
    use sqlparser::ast::SetExpr;
    match set_expr {
        SetExpr::Select(select) => {
            for table in &select.from {
                extract_from_table_factor(&table.relation, tables);
                for join in &table.joins {
                    extract_from_table_factor(&join.relation, tables);
                }
            }
        }
        SetExpr::SetOperation {
            left,
            right,
            ..
        } => {
            collect_tables_from_set_expr(left, tables);
            collect_tables_from_set_expr(right, tables);
        }
        SetExpr::Query(query) => collect_tables_from_set_expr(&query.body, tables),
        _ => {}
    }
}
