use compact_str::CompactString;
use serde::Serialize;
use smallvec::SmallVec;

use crate::context::CommandKind;

/// Type alias for small column vectors (typically < 8 elements)
pub type ColumnVec = SmallVec<[CompactString; 8]>;

/// Structural facts extracted from one parsed statement.
///
/// Rule checkers read these instead of re-walking the AST; the few checks
/// that need expression structure go back to the retained statement via
/// [`predicates`](super::predicates).
#[derive(Debug, Clone, Default, Serialize)]
pub struct StatementFacts {
    pub kind:            CommandKind,
    pub tables:          Vec<CompactString>,
    /// Columns named in the SELECT projection
    pub select_cols:     ColumnVec,
    /// Columns assigned in an UPDATE SET list
    pub set_cols:        ColumnVec,
    /// Columns referenced in WHERE
    pub where_cols:      ColumnVec,
    /// Columns referenced in ORDER BY
    pub order_cols:      ColumnVec,
    pub has_where:       bool,
    pub has_order_by:    bool,
    pub has_select_star: bool,
    /// `COUNT(*)` appears in the top-level projection
    pub has_count_star:  bool,
    pub limit:           Option<u64>,
    pub offset:          Option<u64>
}

impl StatementFacts {
    /// All column identifiers the statement references, in clause order.
    ///
    /// Used by the field blacklist/whitelist checkers; duplicates across
    /// clauses are preserved (callers dedupe case-insensitively).
    pub fn referenced_cols(&self) -> impl Iterator<Item = &CompactString> {
        self.select_cols
            .iter()
            .chain(self.set_cols.iter())
            .chain(self.where_cols.iter())
            .chain(self.order_cols.iter())
    }

    /// Case-insensitive table membership test.
    pub fn references_table(&self, table: &str) -> bool {
        self.tables
            .iter()
            .any(|t| t.eq_ignore_ascii_case(table))
    }
}
