//! Interception template shared by every adapter.
//!
//! [`Guard`] owns the invariant parts of the pipeline: build or accept a
//! [`SqlContext`], validate, apply the active [`ViolationStrategy`], keep
//! the pre-execution result in a thread-local correlation slot, and publish
//! an [`AuditEvent`] after the execution (or after the block decision).
//! Adapters are thin bindings that feed it host-specific contexts.

pub mod driver;
pub mod mapper;
pub mod proxy;
pub mod wrapper;

use std::{
    cell::RefCell,
    sync::Arc,
    time::{Duration, Instant}
};

use chrono::Utc;

use crate::{
    audit::{AuditDispatcher, AuditEvent, AuditSink},
    context::{ExecutionLayer, SqlContext},
    error::SqlSafetyError,
    rules::ValidationResult,
    validator::SqlSafetyValidator
};

thread_local! {
    static PENDING_RESULT: RefCell<Option<Arc<ValidationResult>>> = const { RefCell::new(None) };
}

/// RAII holder for the thread-local correlation slot.
///
/// The slot is cleared on drop, which covers every exit path from an
/// interceptor: normal completion, block, and unwinding.
#[derive(Debug)]
struct SlotGuard;

impl SlotGuard {
    fn store(result: Arc<ValidationResult>) -> Self {
        PENDING_RESULT.with(|slot| *slot.borrow_mut() = Some(result));
        Self
    }
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        PENDING_RESULT.with(|slot| slot.borrow_mut().take());
    }
}

/// Outcome of the underlying execution, reported by the adapter.
#[derive(Debug, Clone, Default)]
pub struct ExecutionOutcome {
    /// Rows affected, or -1 when unknown
    pub rows_affected: i64,
    pub error:         Option<String>
}

impl ExecutionOutcome {
    pub fn rows(rows_affected: i64) -> Self {
        Self {
            rows_affected,
            error: None
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            rows_affected: -1,
            error:         Some(error.into())
        }
    }
}

/// In-flight interception state between `before_execution` and
/// `after_execution`.
#[derive(Debug)]
pub struct PreExecution {
    ctx:     SqlContext,
    result:  Arc<ValidationResult>,
    started: Instant,
    _slot:   SlotGuard
}

impl PreExecution {
    pub fn result(&self) -> &Arc<ValidationResult> {
        &self.result
    }

    pub fn context(&self) -> &SqlContext {
        &self.ctx
    }

    /// Restart the execution timer; proxies that validate at prepare time
    /// call this when the actual execution begins.
    pub fn mark_start(&mut self) {
        self.started = Instant::now();
    }
}

/// Interceptor template: validate, enforce, correlate, audit.
#[derive(Clone)]
pub struct Guard {
    validator: Arc<SqlSafetyValidator>,
    audit:     Arc<AuditDispatcher>
}

impl Guard {
    pub fn new(validator: Arc<SqlSafetyValidator>, audit: Arc<AuditDispatcher>) -> Self {
        Self {
            validator,
            audit
        }
    }

    /// Wire a guard to a sink using the audit settings of the validator's
    /// current config snapshot.
    pub fn with_sink(validator: Arc<SqlSafetyValidator>, sink: Arc<dyn AuditSink>) -> Self {
        let audit_config = validator.config().audit.clone();
        let audit = if audit_config.enabled {
            AuditDispatcher::new(sink, audit_config.buffer_size)
        } else {
            AuditDispatcher::disabled()
        };
        Self {
            validator,
            audit: Arc::new(audit)
        }
    }

    pub fn validator(&self) -> &Arc<SqlSafetyValidator> {
        &self.validator
    }

    /// Whether interception is enabled for the given layer in the current
    /// config snapshot.
    pub fn layer_enabled(&self, layer: ExecutionLayer) -> bool {
        let config = self.validator.config();
        if !config.enabled {
            return false;
        }
        match layer {
            ExecutionLayer::OrmMapper => config.interceptors.mapper,
            ExecutionLayer::OrmWrapper => config.interceptors.wrapper,
            ExecutionLayer::Jdbc => config.interceptors.jdbc
        }
    }

    /// Validate and enforce without opening an execution span.
    ///
    /// Used where a result is needed but no paired `after_execution` will
    /// follow (batch queueing, the driver listener). A blocked SQL still
    /// produces an audit event.
    pub fn check(&self, ctx: &SqlContext) -> Result<Arc<ValidationResult>, SqlSafetyError> {
        let result = self.validator.validate(ctx);
        let strategy = self.validator.active_strategy();
        if let Err(err) = strategy.enforce(&result, ctx.datasource()) {
            self.record_audit(
                ctx,
                Some(&result),
                &ExecutionOutcome::failed(err.to_string()),
                Duration::ZERO,
                true
            );
            return Err(err);
        }
        Ok(result)
    }

    /// Validate, enforce, and open an execution span with the result held
    /// in the thread-local correlation slot.
    pub fn before_execution(&self, ctx: SqlContext) -> Result<PreExecution, SqlSafetyError> {
        let result = self.validator.validate(&ctx);
        let slot = SlotGuard::store(result.clone());
        let strategy = self.validator.active_strategy();
        if let Err(err) = strategy.enforce(&result, ctx.datasource()) {
            self.record_audit(
                &ctx,
                Some(&result),
                &ExecutionOutcome::failed(err.to_string()),
                Duration::ZERO,
                true
            );
            drop(slot);
            return Err(err);
        }
        Ok(PreExecution {
            ctx,
            result,
            started: Instant::now(),
            _slot: slot
        })
    }

    /// Close the execution span and publish the audit event. Consumes the
    /// span, releasing the correlation slot on every path.
    pub fn after_execution(&self, pre: PreExecution, outcome: ExecutionOutcome) {
        let elapsed = pre.started.elapsed();
        self.record_audit(&pre.ctx, Some(&pre.result), &outcome, elapsed, false);
    }

    /// Pre-execution result of the current interception on this thread,
    /// if one is in flight.
    pub fn pending_result() -> Option<Arc<ValidationResult>> {
        PENDING_RESULT.with(|slot| slot.borrow().clone())
    }

    pub(crate) fn record_audit(
        &self,
        ctx: &SqlContext,
        result: Option<&Arc<ValidationResult>>,
        outcome: &ExecutionOutcome,
        elapsed: Duration,
        blocked: bool
    ) {
        self.audit.publish(AuditEvent {
            timestamp:         Utc::now(),
            sql:               ctx.sql().to_string(),
            command_kind:      ctx.kind(),
            statement_id:      ctx.statement_id().to_string(),
            datasource:        ctx.datasource().map(str::to_string),
            execution_time_ms: elapsed.as_millis() as u64,
            rows_affected:     outcome.rows_affected,
            error_message:     outcome.error.clone(),
            blocked,
            pre_validation:    result.map(|r| ValidationResult::clone(r))
        });
    }
}
