//! Configuration loading, validation, and the hot-reloadable holder.
//!
//! # Configuration File Format
//!
//! ```toml
//! enabled = true
//! active_strategy = "BLOCK"        # BLOCK, WARN, LOG
//!
//! [deduplication]
//! enabled = true
//! cache_size = 1000
//! ttl_ms = 100
//!
//! [parser]
//! lenient_mode = false
//! cache_size = 256
//! dialect = "mysql"
//!
//! [interceptors]
//! mapper = true
//! wrapper = true
//! jdbc = true
//! driver = true
//!
//! [rules.no-where-clause]
//! enabled = true
//! risk_level = "CRITICAL"
//!
//! [rules.blacklist-field]
//! fields = ["password", "salary"]
//!
//! [rules.whitelist-field.tables]
//! user = ["id", "name", "status"]
//!
//! [rules.deep-pagination]
//! max_offset = 10000
//! ```
//!
//! Unknown keys are ignored with a warning; missing keys fall back to
//! defaults. All snapshots are immutable; updates replace the whole
//! snapshot atomically through [`ConfigHolder`].

use std::{collections::HashMap, fs, path::Path, sync::Arc};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::{
    error::ConfigError,
    query::SqlDialect,
    rules::{RiskLevel, RuleInfo},
    strategy::ViolationStrategy
};

/// Process-wide configuration snapshot.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GlobalConfig {
    /// Master switch; disabled means every validation passes untouched
    pub enabled:         bool,
    pub active_strategy: ViolationStrategy,
    pub deduplication:   DedupConfig,
    pub parser:          ParserConfig,
    pub interceptors:    InterceptorConfig,
    pub audit:           AuditConfig,
    /// Explicit checker execution order by rule id; unlisted rules keep
    /// their registration order after the listed ones
    pub rule_order:      Vec<String>,
    /// Per-rule settings keyed by rule id
    pub rules:           HashMap<String, RuleSettings>
}

/// Deduplication filter sizing.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DedupConfig {
    pub enabled:    bool,
    pub cache_size: usize,
    pub ttl_ms:     u64
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            enabled:    true,
            cache_size: 1000,
            ttl_ms:     100
        }
    }
}

/// Parser facade policy and cache sizing.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Lenient mode degrades unparseable SQL instead of diagnosing it
    pub lenient_mode: bool,
    pub cache_size:   usize,
    pub dialect:      SqlDialect
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            lenient_mode: false,
            cache_size:   256,
            dialect:      SqlDialect::Generic
        }
    }
}

/// Per-layer interceptor enablement.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct InterceptorConfig {
    pub mapper:  bool,
    pub wrapper: bool,
    pub jdbc:    bool,
    pub driver:  bool
}

impl Default for InterceptorConfig {
    fn default() -> Self {
        Self {
            mapper:  true,
            wrapper: true,
            jdbc:    true,
            driver:  true
        }
    }
}

/// Audit hand-off buffering.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuditConfig {
    pub enabled:     bool,
    pub buffer_size: usize
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled:     true,
            buffer_size: 1024
        }
    }
}

/// Per-rule configuration snapshot.
///
/// A single shape covers all rules; each checker reads the fields it
/// understands and ignores the rest. `None` means "use the rule default".
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RuleSettings {
    pub enabled:       Option<bool>,
    pub risk_level:    Option<RiskLevel>,
    /// no-where-clause: also check SELECT statements
    pub check_select:  Option<bool>,
    /// dummy-condition: extra constant-true patterns, parsed structurally
    pub patterns:      Vec<String>,
    /// blacklist-field: forbidden column identifiers (case-insensitive)
    pub fields:        Vec<String>,
    /// whitelist-field: per-table allowed column sets
    pub tables:        HashMap<String, Vec<String>>,
    /// deep-pagination: maximum tolerated OFFSET
    pub max_offset:    Option<u64>,
    /// large-page-size: maximum tolerated LIMIT
    pub max_page_size: Option<u64>,
    /// no-pagination: tables estimated large enough to need a LIMIT
    pub large_tables:  Vec<String>
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            enabled:         true,
            active_strategy: ViolationStrategy::default(),
            deduplication:   DedupConfig::default(),
            parser:          ParserConfig::default(),
            interceptors:    InterceptorConfig::default(),
            audit:           AuditConfig::default(),
            rule_order:      Vec::new(),
            rules:           HashMap::new()
        }
    }
}

impl GlobalConfig {
    /// Baseline config: engine on, BLOCK strategy, every default rule
    /// enabled at its default risk.
    pub fn standard() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path:   path.display().to_string(),
            source: e
        })?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string, warning about unknown keys.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        warn_unknown_keys(content);
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check numeric bounds; invalid snapshots are rejected before they can
    /// replace a live one.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.deduplication.cache_size == 0 {
            return Err(ConfigError::Invalid(String::from(
                "deduplication.cache_size must be greater than zero"
            )));
        }
        if self.deduplication.ttl_ms == 0 {
            return Err(ConfigError::Invalid(String::from(
                "deduplication.ttl_ms must be greater than zero"
            )));
        }
        if self.parser.cache_size == 0 {
            return Err(ConfigError::Invalid(String::from(
                "parser.cache_size must be greater than zero"
            )));
        }
        if self.audit.buffer_size == 0 {
            return Err(ConfigError::Invalid(String::from(
                "audit.buffer_size must be greater than zero"
            )));
        }
        for (rule, settings) in &self.rules {
            if settings.max_offset == Some(0) {
                return Err(ConfigError::Invalid(format!(
                    "rules.{}.max_offset must be greater than zero",
                    rule
                )));
            }
            if settings.max_page_size == Some(0) {
                return Err(ConfigError::Invalid(format!(
                    "rules.{}.max_page_size must be greater than zero",
                    rule
                )));
            }
        }
        Ok(())
    }

    pub fn rule(&self, id: &str) -> Option<&RuleSettings> {
        self.rules.get(id)
    }

    pub fn rule_enabled(&self, info: &RuleInfo) -> bool {
        self.rule(info.id)
            .and_then(|settings| settings.enabled)
            .unwrap_or(info.enabled_by_default)
    }

    pub fn risk_override(&self, id: &str) -> Option<RiskLevel> {
        self.rule(id).and_then(|settings| settings.risk_level)
    }

    /// One-line diff summary for the reload event.
    pub fn diff_summary(&self, other: &Self) -> String {
        let mut changes = Vec::new();
        if self.enabled != other.enabled {
            changes.push(format!("enabled: {} -> {}", self.enabled, other.enabled));
        }
        if self.active_strategy != other.active_strategy {
            changes.push(format!(
                "strategy: {} -> {}",
                self.active_strategy, other.active_strategy
            ));
        }
        if self.parser.lenient_mode != other.parser.lenient_mode {
            changes.push(format!(
                "parser.lenient_mode: {} -> {}",
                self.parser.lenient_mode, other.parser.lenient_mode
            ));
        }
        let rules_changed = self
            .rules
            .keys()
            .chain(other.rules.keys())
            .filter(|id| {
                let before = self.rules.get(*id).map(|s| format!("{:?}", s));
                let after = other.rules.get(*id).map(|s| format!("{:?}", s));
                before != after
            })
            .count();
        if rules_changed > 0 {
            changes.push(format!("{} rule setting(s) changed", rules_changed));
        }
        if changes.is_empty() {
            String::from("no changes")
        } else {
            changes.join(", ")
        }
    }
}

const KNOWN_TOP_LEVEL_KEYS: &[&str] = &[
    "enabled",
    "active_strategy",
    "deduplication",
    "parser",
    "interceptors",
    "audit",
    "rule_order",
    "rules",
];

fn warn_unknown_keys(content: &str) {
    let Ok(value) = content.parse::<toml::Value>() else {
        return;
    };
    let Some(table) = value.as_table() else {
        return;
    };
    for key in table.keys() {
        if !KNOWN_TOP_LEVEL_KEYS.contains(&key.as_str()) {
            tracing::warn!(key = %key, "ignoring unknown config key");
        }
    }
    if let Some(rules) = table.get("rules").and_then(|v| v.as_table()) {
        for rule in rules.keys() {
            if !crate::rules::known_rule_ids().contains(&rule.as_str()) {
                tracing::warn!(rule = %rule, "config references unknown rule");
            }
        }
    }
}

/// Atomic holder for the live configuration snapshot.
///
/// Readers take a snapshot pointer once per `validate` call and use it
/// throughout; writers publish a replacement atomically. A call in flight
/// keeps its snapshot, so no call ever observes a mixed state.
#[derive(Debug)]
pub struct ConfigHolder {
    inner: RwLock<Arc<GlobalConfig>>
}

impl ConfigHolder {
    pub fn new(config: GlobalConfig) -> Self {
        Self {
            inner: RwLock::new(Arc::new(config))
        }
    }

    pub fn snapshot(&self) -> Arc<GlobalConfig> {
        self.inner.read().clone()
    }

    /// Publish a new snapshot, returning the previous one.
    pub fn swap(&self, config: GlobalConfig) -> Arc<GlobalConfig> {
        let mut slot = self.inner.write();
        std::mem::replace(&mut *slot, Arc::new(config))
    }
}
