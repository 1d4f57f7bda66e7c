//! Connection-pool proxy chain.
//!
//! Pool-agnostic JDBC-style interception: a connection proxy wraps the
//! statements it hands out, the statement proxies validate SQL at the
//! point it becomes known. Prepared and callable statements know their SQL
//! at prepare time, so [`GuardedConnection::prepare_statement`] validates
//! there; plain statements validate at execute time. `add_batch` validates
//! each queued SQL; `execute_batch` runs what was already admitted without
//! re-validating. Lifecycle methods (commit, rollback, close) pass
//! through untouched.

use std::sync::Arc;

use crate::{
    context::{CommandKind, ExecutionLayer, SqlContext},
    error::GuardError,
    intercept::{ExecutionOutcome, Guard},
    rules::ValidationResult
};

/// Minimal contract a pooled connection must offer to be wrapped.
pub trait Connection {
    type Stmt: Statement<Error = Self::Error>;
    type Prepared: PreparedStatement<Error = Self::Error>;
    type Error: std::error::Error + 'static;

    fn create_statement(&mut self) -> Result<Self::Stmt, Self::Error>;
    fn prepare_statement(&mut self, sql: &str) -> Result<Self::Prepared, Self::Error>;
    fn commit(&mut self) -> Result<(), Self::Error>;
    fn rollback(&mut self) -> Result<(), Self::Error>;
    fn close(&mut self) -> Result<(), Self::Error>;
}

/// Plain statement: SQL arrives at execute (or batch-queue) time.
pub trait Statement {
    type Error: std::error::Error + 'static;

    /// Execute SQL, returning rows affected (or -1 for result sets).
    fn execute(&mut self, sql: &str) -> Result<i64, Self::Error>;
    fn add_batch(&mut self, sql: &str) -> Result<(), Self::Error>;
    fn execute_batch(&mut self) -> Result<Vec<i64>, Self::Error>;
}

/// Prepared (or callable) statement: SQL was fixed at prepare time.
pub trait PreparedStatement {
    type Error: std::error::Error + 'static;

    fn execute(&mut self) -> Result<i64, Self::Error>;
}

/// Connection proxy; wraps the statements it returns.
pub struct GuardedConnection<C: Connection> {
    inner:      C,
    guard:      Guard,
    datasource: Option<String>
}

impl<C: Connection> GuardedConnection<C> {
    pub fn new(inner: C, guard: Guard, datasource: Option<String>) -> Self {
        Self {
            inner,
            guard,
            datasource
        }
    }

    pub fn create_statement(&mut self) -> Result<GuardedStatement<C::Stmt>, GuardError<C::Error>> {
        let stmt = self
            .inner
            .create_statement()
            .map_err(GuardError::Database)?;
        Ok(GuardedStatement {
            inner:      stmt,
            guard:      self.guard.clone(),
            datasource: self.datasource.clone()
        })
    }

    /// Prepare a statement, validating the SQL now: for prepared and
    /// callable statements this is the first point the SQL is known.
    pub fn prepare_statement(
        &mut self,
        sql: &str
    ) -> Result<GuardedPrepared<C::Prepared>, GuardError<C::Error>> {
        let ctx = self.context_for(sql);
        let result = if self.guard.layer_enabled(ExecutionLayer::Jdbc) {
            Some(self.guard.check(&ctx)?)
        } else {
            None
        };
        let prepared = self
            .inner
            .prepare_statement(sql)
            .map_err(GuardError::Database)?;
        Ok(GuardedPrepared {
            inner: prepared,
            guard: self.guard.clone(),
            ctx,
            result
        })
    }

    pub fn commit(&mut self) -> Result<(), GuardError<C::Error>> {
        self.inner.commit().map_err(GuardError::Database)
    }

    pub fn rollback(&mut self) -> Result<(), GuardError<C::Error>> {
        self.inner.rollback().map_err(GuardError::Database)
    }

    pub fn close(&mut self) -> Result<(), GuardError<C::Error>> {
        self.inner.close().map_err(GuardError::Database)
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    fn context_for(&self, sql: &str) -> SqlContext {
        let mut ctx = SqlContext::new(sql, CommandKind::detect(sql), ExecutionLayer::Jdbc);
        if let Some(datasource) = &self.datasource {
            ctx = ctx.with_datasource(datasource.clone());
        }
        ctx
    }
}

/// Plain-statement proxy; validates at execute and batch-queue time.
pub struct GuardedStatement<S: Statement> {
    inner:      S,
    guard:      Guard,
    datasource: Option<String>
}

impl<S: Statement> GuardedStatement<S> {
    pub fn execute(&mut self, sql: &str) -> Result<i64, GuardError<S::Error>> {
        if !self.guard.layer_enabled(ExecutionLayer::Jdbc) {
            return self.inner.execute(sql).map_err(GuardError::Database);
        }
        let ctx = self.context_for(sql);
        let pre = self.guard.before_execution(ctx)?;
        match self.inner.execute(sql) {
            Ok(rows) => {
                self.guard.after_execution(pre, ExecutionOutcome::rows(rows));
                Ok(rows)
            }
            Err(err) => {
                self.guard
                    .after_execution(pre, ExecutionOutcome::failed(err.to_string()));
                Err(GuardError::Database(err))
            }
        }
    }

    /// Queue SQL for batch execution; each queued SQL is validated here.
    pub fn add_batch(&mut self, sql: &str) -> Result<(), GuardError<S::Error>> {
        if self.guard.layer_enabled(ExecutionLayer::Jdbc) {
            let ctx = self.context_for(sql);
            self.guard.check(&ctx)?;
        }
        self.inner.add_batch(sql).map_err(GuardError::Database)
    }

    /// Run the queued batch; entries were validated at `add_batch` time and
    /// are not re-validated.
    pub fn execute_batch(&mut self) -> Result<Vec<i64>, GuardError<S::Error>> {
        self.inner.execute_batch().map_err(GuardError::Database)
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn context_for(&self, sql: &str) -> SqlContext {
        let mut ctx = SqlContext::new(sql, CommandKind::detect(sql), ExecutionLayer::Jdbc);
        if let Some(datasource) = &self.datasource {
            ctx = ctx.with_datasource(datasource.clone());
        }
        ctx
    }
}

/// Prepared-statement proxy; carries the validation result from prepare
/// time and publishes one audit event per execution.
pub struct GuardedPrepared<P: PreparedStatement> {
    inner:  P,
    guard:  Guard,
    ctx:    SqlContext,
    result: Option<Arc<ValidationResult>>
}

impl<P: PreparedStatement> std::fmt::Debug for GuardedPrepared<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuardedPrepared")
            .field("ctx", &self.ctx)
            .field("result", &self.result)
            .finish()
    }
}

impl<P: PreparedStatement> GuardedPrepared<P> {
    /// Validation result captured at prepare time (absent when the JDBC
    /// layer was disabled).
    pub fn validation(&self) -> Option<&Arc<ValidationResult>> {
        self.result.as_ref()
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    pub fn execute(&mut self) -> Result<i64, GuardError<P::Error>> {
        let started = std::time::Instant::now();
        match self.inner.execute() {
            Ok(rows) => {
                self.guard.record_audit(
                    &self.ctx,
                    self.result.as_ref(),
                    &ExecutionOutcome::rows(rows),
                    started.elapsed(),
                    false
                );
                Ok(rows)
            }
            Err(err) => {
                self.guard.record_audit(
                    &self.ctx,
                    self.result.as_ref(),
                    &ExecutionOutcome::failed(err.to_string()),
                    started.elapsed(),
                    false
                );
                Err(GuardError::Database(err))
            }
        }
    }
}
