//! Mapper-ORM adapter.
//!
//! Binds the guard to an ORM's mapper path: the host framework hands over
//! the final resolved SQL (after dynamic template expansion), the mapped
//! method id, and any logical-pagination marker it carried out of band.

use crate::{
    context::{CommandKind, ExecutionLayer, PageRequest, Params, SqlContext, mapper_statement_id},
    error::SqlSafetyError,
    intercept::{ExecutionOutcome, Guard, PreExecution}
};

/// One mapper invocation as seen by the interceptor.
#[derive(Debug, Clone)]
pub struct MapperCommand {
    /// Mapper-method identifier (namespace + method)
    pub mapper_id:  String,
    /// Resolved SQL after template expansion
    pub sql:        String,
    pub kind:       CommandKind,
    pub page:       Option<PageRequest>,
    pub datasource: Option<String>,
    pub params:     Params
}

/// Interceptor for the ORM mapper execution path.
pub struct MapperInterceptor {
    guard: Guard
}

impl MapperInterceptor {
    pub fn new(guard: Guard) -> Self {
        Self {
            guard
        }
    }

    /// Intercept a mapper `query` operation.
    pub fn before_query(
        &self,
        command: &MapperCommand
    ) -> Result<Option<PreExecution>, SqlSafetyError> {
        self.intercept(command)
    }

    /// Intercept a mapper `update` operation (insert/update/delete).
    pub fn before_update(
        &self,
        command: &MapperCommand
    ) -> Result<Option<PreExecution>, SqlSafetyError> {
        self.intercept(command)
    }

    fn intercept(
        &self,
        command: &MapperCommand
    ) -> Result<Option<PreExecution>, SqlSafetyError> {
        if !self.guard.layer_enabled(ExecutionLayer::OrmMapper) {
            return Ok(None);
        }
        let mut ctx =
            SqlContext::new(command.sql.clone(), command.kind, ExecutionLayer::OrmMapper);
        if let Some(datasource) = &command.datasource {
            ctx = ctx.with_datasource(datasource.clone());
        }
        let ctx = ctx
            .with_statement_id(mapper_statement_id(
                ExecutionLayer::OrmMapper,
                &command.mapper_id
            ))
            .with_page(command.page)
            .with_params(command.params.clone());
        self.guard.before_execution(ctx).map(Some)
    }

    /// Report the outcome of the intercepted operation.
    pub fn after(&self, pre: Option<PreExecution>, outcome: ExecutionOutcome) {
        if let Some(pre) = pre {
            self.guard.after_execution(pre, outcome);
        }
    }
}
