//! Universal driver-level listener.
//!
//! Pool-agnostic fallback: a driver shim registers itself under a URL
//! prefix and forwards every execution through
//! [`DriverListener::on_before_any_execute`] with the resolved SQL
//! (parameters substituted). Higher overhead than the targeted adapters,
//! in exchange for covering pools the proxy chain cannot wrap.
//!
//! URL convention: the original `jdbc:<vendor>:...` is rewritten to
//! `jdbc:guard:<vendor>:...`; the shim strips its token back out before
//! delegating to the real driver.

use std::sync::Arc;

use crate::{
    context::{CommandKind, ExecutionLayer, SqlContext},
    error::{ConfigError, SqlSafetyError},
    intercept::{ExecutionOutcome, Guard},
    rules::ValidationResult
};

/// URL token under which the shim registers.
pub const SHIM_TOKEN: &str = "guard";

const URL_SCHEME: &str = "jdbc:";

/// Statement description delivered by the driver shim.
#[derive(Debug, Clone)]
pub struct StatementInfo {
    /// Resolved SQL with parameters substituted
    pub sql:        String,
    pub datasource: Option<String>
}

/// Driver-level interception hook.
pub struct DriverListener {
    guard: Guard
}

impl DriverListener {
    pub fn new(guard: Guard) -> Self {
        Self {
            guard
        }
    }

    /// Validate before any execution; the same validate-then-strategy
    /// pipeline as the targeted adapters.
    ///
    /// Returns `Ok(None)` when the driver layer is disabled.
    pub fn on_before_any_execute(
        &self,
        info: &StatementInfo
    ) -> Result<Option<Arc<ValidationResult>>, SqlSafetyError> {
        let config = self.guard.validator().config();
        if !config.enabled || !config.interceptors.driver {
            return Ok(None);
        }
        let ctx = self.context_for(info);
        self.guard.check(&ctx).map(Some)
    }

    /// Publish the post-execution audit event for a listener-observed
    /// execution.
    pub fn on_after_any_execute(
        &self,
        info: &StatementInfo,
        result: Option<Arc<ValidationResult>>,
        outcome: ExecutionOutcome,
        elapsed: std::time::Duration
    ) {
        let ctx = self.context_for(info);
        self.guard
            .record_audit(&ctx, result.as_ref(), &outcome, elapsed, false);
    }

    fn context_for(&self, info: &StatementInfo) -> SqlContext {
        let mut ctx = SqlContext::new(
            info.sql.clone(),
            CommandKind::detect(&info.sql),
            ExecutionLayer::Jdbc
        );
        if let Some(datasource) = &info.datasource {
            ctx = ctx.with_datasource(datasource.clone());
        }
        ctx
    }
}

/// Shim registration parsed from a properties file.
///
/// ```properties
/// module = sql-safety-guard
/// prefixes = mysql, postgresql
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShimConfig {
    pub module:   String,
    /// Vendor prefixes the shim wraps (e.g. `mysql`)
    pub prefixes: Vec<String>
}

impl ShimConfig {
    /// Parse `key = value` lines; `#` starts a comment.
    pub fn parse(properties: &str) -> Result<Self, ConfigError> {
        let mut module = None;
        let mut prefixes = Vec::new();
        for line in properties.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                return Err(ConfigError::Invalid(format!(
                    "malformed shim property line: '{}'",
                    line
                )));
            };
            match key.trim() {
                "module" => module = Some(value.trim().to_string()),
                "prefixes" => {
                    prefixes = value
                        .split(',')
                        .map(|p| p.trim().to_string())
                        .filter(|p| !p.is_empty())
                        .collect();
                }
                other => {
                    tracing::warn!(key = other, "ignoring unknown shim property");
                }
            }
        }
        let module = module
            .ok_or_else(|| ConfigError::Invalid(String::from("shim property 'module' missing")))?;
        if prefixes.is_empty() {
            return Err(ConfigError::Invalid(String::from(
                "shim property 'prefixes' missing or empty"
            )));
        }
        Ok(Self {
            module,
            prefixes
        })
    }

    /// Whether a shimmed URL belongs to this registration.
    pub fn accepts(&self, url: &str) -> bool {
        unwrap_url(url).is_some_and(|original| {
            self.prefixes.iter().any(|prefix| {
                original[URL_SCHEME.len()..].starts_with(&format!("{}:", prefix))
            })
        })
    }

    /// Rewrite an original vendor URL into its shimmed form, if the vendor
    /// is registered: `jdbc:mysql://db` becomes `jdbc:guard:mysql://db`.
    pub fn wrap_url(&self, url: &str) -> Option<String> {
        let rest = url.strip_prefix(URL_SCHEME)?;
        let registered = self
            .prefixes
            .iter()
            .any(|prefix| rest.starts_with(&format!("{}:", prefix)));
        if registered {
            Some(format!("{}{}:{}", URL_SCHEME, SHIM_TOKEN, rest))
        } else {
            None
        }
    }
}

/// Strip the shim token from a shimmed URL:
/// `jdbc:guard:mysql://db` becomes `jdbc:mysql://db`.
pub fn unwrap_url(url: &str) -> Option<String> {
    let rest = url.strip_prefix(URL_SCHEME)?;
    let original = rest.strip_prefix(&format!("{}:", SHIM_TOKEN))?;
    Some(format!("{}{}", URL_SCHEME, original))
}
