//! Execution context for a single SQL attempt.
//!
//! A [`SqlContext`] is the immutable snapshot an interceptor hands to the
//! validator: the resolved SQL text, where in the stack it was observed,
//! a stable statement identifier, and the optional logical-pagination
//! marker the ORM layer carried out of band.

use std::{collections::HashMap, fmt, sync::Arc};

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::parser::ParsedStatement;

/// Kind of SQL command being executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
#[non_exhaustive]
pub enum CommandKind {
    Select,
    Insert,
    Update,
    Delete,
    Unknown
}

impl CommandKind {
    /// Detect the command kind from the first keyword of a SQL string.
    ///
    /// Adapters that only see raw SQL (plain JDBC statements, the driver
    /// shim) use this; ORM adapters know the kind from the mapped method.
    pub fn detect(sql: &str) -> Self {
        let keyword = sql
            .trim_start()
            .split_whitespace()
            .next()
            .unwrap_or_default();
        if keyword.eq_ignore_ascii_case("select") || keyword.eq_ignore_ascii_case("with") {
            Self::Select
        } else if keyword.eq_ignore_ascii_case("insert") {
            Self::Insert
        } else if keyword.eq_ignore_ascii_case("update") {
            Self::Update
        } else if keyword.eq_ignore_ascii_case("delete") {
            Self::Delete
        } else {
            Self::Unknown
        }
    }
}

impl Default for CommandKind {
    fn default() -> Self {
        Self::Unknown
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Select => write!(f, "SELECT"),
            Self::Insert => write!(f, "INSERT"),
            Self::Update => write!(f, "UPDATE"),
            Self::Delete => write!(f, "DELETE"),
            Self::Unknown => write!(f, "UNKNOWN")
        }
    }
}

/// Layer of the stack where the SQL was observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[non_exhaustive]
pub enum ExecutionLayer {
    /// ORM mapper path, after dynamic template expansion
    OrmMapper,
    /// ORM wrapper-builder path
    OrmWrapper,
    /// JDBC connection/statement path
    Jdbc
}

impl fmt::Display for ExecutionLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OrmMapper => write!(f, "ORM-MAPPER"),
            Self::OrmWrapper => write!(f, "ORM-WRAPPER"),
            Self::Jdbc => write!(f, "JDBC")
        }
    }
}

/// Logical-pagination marker passed to the ORM out of band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageRequest {
    pub offset: u64,
    pub size:   u64
}

/// Parameter view for one execution: positional values and/or a name map.
///
/// Values are carried in display form; the engine never interprets them.
#[derive(Debug, Clone, Default)]
pub struct Params {
    pub positional: Vec<String>,
    pub named:      HashMap<String, String>
}

impl Params {
    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.named.is_empty()
    }
}

/// Immutable snapshot describing one SQL execution attempt.
///
/// Created by an interceptor per attempt, consumed by
/// [`SqlSafetyValidator::validate`](crate::validator::SqlSafetyValidator::validate)
/// and discarded immediately after.
#[derive(Debug, Clone)]
pub struct SqlContext {
    sql:          String,
    kind:         CommandKind,
    layer:        ExecutionLayer,
    statement_id: String,
    datasource:   Option<String>,
    page:         Option<PageRequest>,
    params:       Params,
    parsed:       Option<Arc<ParsedStatement>>
}

impl SqlContext {
    /// Create a context with the JDBC-style statement id derived from
    /// `(layer, datasource, sql)`.
    pub fn new(sql: impl Into<String>, kind: CommandKind, layer: ExecutionLayer) -> Self {
        let sql = sql.into();
        let statement_id = statement_id(layer, None, &sql);
        Self {
            sql,
            kind,
            layer,
            statement_id,
            datasource: None,
            page: None,
            params: Params::default(),
            parsed: None
        }
    }

    pub fn with_datasource(mut self, datasource: impl Into<String>) -> Self {
        let datasource = datasource.into();
        self.statement_id = statement_id(self.layer, Some(&datasource), &self.sql);
        self.datasource = Some(datasource);
        self
    }

    /// Replace the derived statement id with a caller-supplied one
    /// (ORM adapters use the mapper-method identifier).
    pub fn with_statement_id(mut self, statement_id: impl Into<String>) -> Self {
        self.statement_id = statement_id.into();
        self
    }

    pub fn with_page(mut self, page: Option<PageRequest>) -> Self {
        self.page = page;
        self
    }

    pub fn with_params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    /// Attach a pre-parsed AST handle so the validator skips re-parsing.
    pub fn with_parsed(mut self, parsed: Arc<ParsedStatement>) -> Self {
        self.parsed = Some(parsed);
        self
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn kind(&self) -> CommandKind {
        self.kind
    }

    pub fn layer(&self) -> ExecutionLayer {
        self.layer
    }

    pub fn statement_id(&self) -> &str {
        &self.statement_id
    }

    pub fn datasource(&self) -> Option<&str> {
        self.datasource.as_deref()
    }

    pub fn page(&self) -> Option<PageRequest> {
        self.page
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn parsed(&self) -> Option<&Arc<ParsedStatement>> {
        self.parsed.as_ref()
    }
}

/// Canonical JDBC-layer statement id: `"{layer}:{datasource-or-'-'}:{hash8(sql)}"`.
pub fn statement_id(layer: ExecutionLayer, datasource: Option<&str>, sql: &str) -> String {
    format!("{}:{}:{}", layer, datasource.unwrap_or("-"), hash8(sql))
}

/// Canonical ORM-layer statement id: `"{layer}:{mapper-method-id}"`.
pub fn mapper_statement_id(layer: ExecutionLayer, mapper_id: &str) -> String {
    format!("{}:{}", layer, mapper_id)
}

/// First 8 hex chars of SHA-256, stable across processes so audit records
/// from different runs correlate.
fn hash8(sql: &str) -> String {
    let digest = Sha256::digest(sql.as_bytes());
    digest[..4].iter().map(|b| format!("{:02x}", b)).collect()
}
