//! Wrapper-ORM adapter.
//!
//! Binds the guard to the builder-based query path. The host hands over
//! the SQL resolved from the wrapper builder, already augmented with a
//! LIMIT when the pagination plugin participated, plus what it observed
//! about the builder itself: whether one was present in the parameters and
//! whether it carried any conditions.

use crate::{
    context::{CommandKind, ExecutionLayer, PageRequest, SqlContext, mapper_statement_id},
    error::SqlSafetyError,
    intercept::{ExecutionOutcome, Guard, PreExecution}
};

/// One wrapper-builder invocation as seen by the interceptor.
#[derive(Debug, Clone)]
pub struct WrapperCall {
    /// Call-site identifier (the wrapped mapper method)
    pub statement_id:  String,
    /// SQL resolved from the builder, LIMIT-augmented when paginated
    pub resolved_sql:  String,
    /// A wrapper builder object was present in the parameters
    pub has_builder:   bool,
    /// The builder carried no conditions (resolves to an unbounded query)
    pub builder_empty: bool,
    pub page:          Option<PageRequest>,
    pub datasource:    Option<String>
}

/// Interceptor for the ORM wrapper-builder execution path.
pub struct WrapperInterceptor {
    guard: Guard
}

impl WrapperInterceptor {
    pub fn new(guard: Guard) -> Self {
        Self {
            guard
        }
    }

    /// Intercept a wrapper-built query.
    ///
    /// An empty builder is not rejected here by fiat: its resolved SQL has
    /// no WHERE clause, so the regular rule checkers flag it. The flag is
    /// still logged because it names the root cause better than the SQL
    /// does.
    pub fn intercept(&self, call: &WrapperCall) -> Result<Option<PreExecution>, SqlSafetyError> {
        if !self.guard.layer_enabled(ExecutionLayer::OrmWrapper) {
            return Ok(None);
        }
        if call.has_builder && call.builder_empty {
            tracing::debug!(
                statement_id = %call.statement_id,
                "wrapper builder carries no conditions"
            );
        }
        let kind = CommandKind::detect(&call.resolved_sql);
        let mut ctx = SqlContext::new(
            call.resolved_sql.clone(),
            kind,
            ExecutionLayer::OrmWrapper
        );
        if let Some(datasource) = &call.datasource {
            ctx = ctx.with_datasource(datasource.clone());
        }
        let ctx = ctx
            .with_statement_id(mapper_statement_id(
                ExecutionLayer::OrmWrapper,
                &call.statement_id
            ))
            .with_page(call.page);
        self.guard.before_execution(ctx).map(Some)
    }

    /// Report the outcome of the intercepted operation.
    pub fn after(&self, pre: Option<PreExecution>, outcome: ExecutionOutcome) {
        if let Some(pre) = pre {
            self.guard.after_execution(pre, outcome);
        }
    }
}
