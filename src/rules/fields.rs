use compact_str::CompactString;
use indexmap::IndexSet;

use super::{CheckContext, RiskLevel, RuleChecker, RuleInfo, Violation};
use crate::context::CommandKind;

/// Access to a blacklisted column.
///
/// Fires once per distinct offending identifier, in clause order.
pub struct BlacklistField;

impl RuleChecker for BlacklistField {
    fn info(&self) -> RuleInfo {
        RuleInfo {
            id:                 "blacklist-field",
            name:               "Blacklisted field access",
            risk:               RiskLevel::High,
            enabled_by_default: true
        }
    }

    fn check(&self, ctx: &CheckContext<'_>) -> Vec<Violation> {
        let Some(facts) = ctx.facts() else {
            return vec![];
        };
        if !matches!(facts.kind, CommandKind::Select | CommandKind::Update) {
            return vec![];
        }
        let info = self.info();
        let Some(settings) = ctx.settings(info.id) else {
            return vec![];
        };
        if settings.fields.is_empty() {
            return vec![];
        }
        let mut seen: IndexSet<CompactString> = IndexSet::new();
        for col in facts.referenced_cols() {
            let blacklisted = settings
                .fields
                .iter()
                .any(|f| f.eq_ignore_ascii_case(col.as_str()));
            if blacklisted {
                seen.insert(CompactString::from(col.to_ascii_lowercase()));
            }
        }
        seen.into_iter()
            .map(|col| Violation {
                rule_id:    info.id,
                rule_name:  info.name,
                risk:       info.risk,
                message:    format!("column '{}' is blacklisted", col),
                suggestion: Some(String::from(
                    "Remove the column or request access through an approved view"
                )),
                location:   None
            })
            .collect()
    }
}

/// Reference outside a table's configured column whitelist.
///
/// `SELECT *` against a whitelisted table fires as well: the projected
/// column set cannot be proven to stay inside the whitelist.
pub struct WhitelistField;

impl RuleChecker for WhitelistField {
    fn info(&self) -> RuleInfo {
        RuleInfo {
            id:                 "whitelist-field",
            name:               "Field outside table whitelist",
            risk:               RiskLevel::High,
            enabled_by_default: true
        }
    }

    fn check(&self, ctx: &CheckContext<'_>) -> Vec<Violation> {
        let Some(facts) = ctx.facts() else {
            return vec![];
        };
        if !matches!(facts.kind, CommandKind::Select | CommandKind::Update) {
            return vec![];
        }
        let info = self.info();
        let Some(settings) = ctx.settings(info.id) else {
            return vec![];
        };
        let mut violations = Vec::new();
        // HashMap iteration order is unstable; sort for deterministic output
        let mut configured: Vec<_> = settings.tables.iter().collect();
        configured.sort_by_key(|(table, _)| table.as_str());
        for (table, allowed) in configured {
            if !facts.references_table(table) {
                continue;
            }
            if facts.has_select_star {
                violations.push(Violation {
                    rule_id:    info.id,
                    rule_name:  info.name,
                    risk:       info.risk,
                    message:    format!(
                        "SELECT * on table '{}' may project columns outside its whitelist",
                        table
                    ),
                    suggestion: Some(String::from("List the whitelisted columns explicitly")),
                    location:   None
                });
                continue;
            }
            let outside: Vec<&str> = facts
                .referenced_cols()
                .filter(|col| !allowed.iter().any(|a| a.eq_ignore_ascii_case(col.as_str())))
                .map(|col| col.as_str())
                .collect();
            if !outside.is_empty() {
                let mut unique: IndexSet<&str> = IndexSet::new();
                unique.extend(outside);
                let joined = unique.into_iter().collect::<Vec<_>>().join(", ");
                violations.push(Violation {
                    rule_id:    info.id,
                    rule_name:  info.name,
                    risk:       info.risk,
                    message:    format!(
                        "columns [{}] are outside the whitelist of table '{}'",
                        joined, table
                    ),
                    suggestion: Some(String::from(
                        "Restrict the statement to the table's whitelisted columns"
                    )),
                    location:   None
                });
            }
        }
        violations
    }
}
