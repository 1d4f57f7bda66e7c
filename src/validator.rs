//! Public validation façade.
//!
//! [`SqlSafetyValidator`] wires the parser facade, the checker set, and the
//! deduplication filter behind one thread-safe entry point. Each
//! `validate` call takes a single config snapshot up front and uses it
//! throughout, so concurrent hot-reloads never expose a mixed state to a
//! call in flight.

use std::sync::Arc;

use crate::{
    config::{ConfigHolder, GlobalConfig},
    context::SqlContext,
    dedup::{DedupFilter, DedupKey},
    error::ConfigError,
    parser::ParserFacade,
    rules::{CheckContext, CheckerSet, RiskLevel, ValidationResult, Violation},
    strategy::ViolationStrategy
};

/// Thread-safe SQL safety validator.
///
/// Owns its parser facade, orchestrator, and deduplication filter; safe to
/// call from any thread without external synchronization.
pub struct SqlSafetyValidator {
    holder:   ConfigHolder,
    parser:   ParserFacade,
    checkers: CheckerSet,
    dedup:    DedupFilter
}

impl SqlSafetyValidator {
    /// Build a validator with the standard checker set.
    pub fn new(config: GlobalConfig) -> Result<Self, ConfigError> {
        Self::with_checkers(config, CheckerSet::standard())
    }

    /// Build a validator with a custom checker set (extension point, also
    /// used to inject misbehaving checkers in tests).
    pub fn with_checkers(config: GlobalConfig, checkers: CheckerSet) -> Result<Self, ConfigError> {
        config.validate()?;
        let parser = ParserFacade::new(&config.parser);
        Ok(Self {
            holder: ConfigHolder::new(config),
            parser,
            checkers,
            dedup: DedupFilter::new()
        })
    }

    /// Current configuration snapshot.
    pub fn config(&self) -> Arc<GlobalConfig> {
        self.holder.snapshot()
    }

    /// Active violation strategy of the current snapshot.
    pub fn active_strategy(&self) -> ViolationStrategy {
        self.holder.snapshot().active_strategy
    }

    /// Validate one SQL attempt.
    ///
    /// Steps: deduplication lookup, parse (unless the context carries a
    /// parsed handle), ordered checker run, deduplication record. The
    /// returned result is frozen; repeat callers within the deduplication
    /// TTL receive the identical `Arc`.
    pub fn validate(&self, ctx: &SqlContext) -> Arc<ValidationResult> {
        let config = self.holder.snapshot();
        if !config.enabled {
            return Arc::new(ValidationResult::new());
        }
        let key = DedupKey::of(ctx);
        if config.deduplication.enabled
            && let Some(cached) = self.dedup.lookup(key, &config.deduplication)
        {
            return cached;
        }
        let mut result = ValidationResult::new();
        let parsed = match ctx.parsed() {
            Some(parsed) => Ok(parsed.clone()),
            None => self.parser.parse(ctx.sql(), &config.parser)
        };
        match parsed {
            Ok(parsed) => {
                let check_ctx = CheckContext {
                    sql:    ctx,
                    parsed: &parsed,
                    config: &config
                };
                self.checkers.run(&check_ctx, &mut result);
            }
            Err(err) => {
                tracing::debug!(
                    statement_id = ctx.statement_id(),
                    error = %err,
                    "SQL did not parse; rule evaluation skipped"
                );
                result.push(Violation {
                    rule_id:    "parse-failure",
                    rule_name:  "Unparseable SQL",
                    risk:       RiskLevel::Info,
                    message:    String::from("unparseable SQL, validation skipped"),
                    suggestion: None,
                    location:   Some(crate::rules::Location::statement(ctx.statement_id()))
                });
            }
        }
        let result = Arc::new(result);
        if config.deduplication.enabled {
            self.dedup
                .record(key, result.clone(), &config.deduplication);
        }
        result
    }

    /// Thread-safe hot reload.
    ///
    /// The new snapshot is validated first; on rejection the current config
    /// stays in place. On success the holder is swapped atomically, the
    /// parser cache is cleared, and every thread's deduplication cache is
    /// invalidated on its next touch. Calls already in flight finish under
    /// the snapshot they started with.
    pub fn reload_config(&self, new_config: GlobalConfig) -> Result<(), ConfigError> {
        new_config.validate()?;
        let summary = self.holder.snapshot().diff_summary(&new_config);
        let parser_config = new_config.parser.clone();
        self.holder.swap(new_config);
        self.parser.reconfigure(&parser_config);
        self.dedup.invalidate_all();
        tracing::info!(changes = %summary, "configuration reloaded");
        Ok(())
    }
}
