//! # SQL Safety Guard
//!
//! Runtime SQL safety engine with rule-based validation of resolved SQL.
//!
//! The engine evaluates structural and semantic properties of already-
//! formed SQL strings before they reach a database: missing WHERE clauses,
//! constant-true conditions, blacklisted column access, pagination abuse,
//! deep offsets, and related risks. It never executes, repairs, or
//! rewrites SQL.
//!
//! # Architecture
//!
//! ```text
//! interceptor ──▶ SqlContext ──▶ SqlSafetyValidator ──▶ ValidationResult
//!                                  │        │
//!                            ParserFacade  CheckerSet
//!                            (LRU cache)   (ordered rules)
//! ```
//!
//! An interceptor ([`intercept::Guard`] plus a thin adapter per host
//! framework) builds a [`context::SqlContext`], the validator consults the
//! per-thread deduplication filter, parses through the bounded cache, runs
//! every enabled checker in order, and returns a frozen
//! [`rules::ValidationResult`]. The configured
//! [`strategy::ViolationStrategy`] then decides whether the execution is
//! blocked, warned about, or merely logged, and the audit path records the
//! outcome either way.
//!
//! # Quick Start
//!
//! ```
//! use sql_safety_guard::{
//!     config::GlobalConfig,
//!     context::{CommandKind, ExecutionLayer, SqlContext},
//!     validator::SqlSafetyValidator
//! };
//!
//! let validator = SqlSafetyValidator::new(GlobalConfig::standard()).unwrap();
//! let ctx = SqlContext::new(
//!     "DELETE FROM user",
//!     CommandKind::Delete,
//!     ExecutionLayer::Jdbc
//! );
//! let result = validator.validate(&ctx);
//! assert!(!result.passed());
//! ```
//!
//! # Modules
//!
//! - [`validator`] - Public validation façade with hot-reloadable config
//! - [`rules`] - Rule checkers and their orchestration
//! - [`parser`] - SQL parser facade with a bounded parse cache
//! - [`dedup`] - Per-thread deduplication of validation results
//! - [`intercept`] - Interceptor template and host adapters
//! - [`strategy`] - Block/warn/log enforcement
//! - [`audit`] - Post-execution audit pipeline
//! - [`config`] - Configuration tree, loading, and the atomic holder
//! - [`context`] - Execution context and statement-id scheme
//! - [`query`] - Statement facts extraction and AST predicates
//! - [`error`] - Error taxonomy

pub mod audit;
pub mod cli;
pub mod config;
pub mod context;
pub mod dedup;
pub mod error;
pub mod intercept;
pub mod output;
pub mod parser;
pub mod query;
pub mod rules;
pub mod strategy;
pub mod validator;
