//! SQL parser facade with a bounded parse cache.
//!
//! Parsing dominates validation cost, so parsed statements are cached in a
//! count-bounded LRU keyed by the SQL text. The facade also owns the
//! strict/lenient policy: strict mode surfaces a [`ParseError`] which the
//! validator turns into one INFO diagnostic; lenient mode returns a
//! degraded marker and lets each checker decide to skip (they all do).

use std::{
    hash::{DefaultHasher, Hash, Hasher},
    sync::Arc
};

use indexmap::IndexMap;
use parking_lot::Mutex;
use sqlparser::{ast::Statement, parser::Parser};

use crate::{config::ParserConfig, error::ParseError, query::StatementFacts};

/// A statement as the rule checkers see it: the retained AST plus the
/// extracted facts, or a degraded marker when lenient parsing failed.
#[derive(Debug)]
pub enum ParsedStatement {
    Parsed {
        statement: Statement,
        facts:     StatementFacts
    },
    /// Lenient-mode stand-in for unparseable SQL; checkers skip it
    Degraded
}

impl ParsedStatement {
    pub fn facts(&self) -> Option<&StatementFacts> {
        match self {
            Self::Parsed {
                facts, ..
            } => Some(facts),
            Self::Degraded => None
        }
    }

    pub fn statement(&self) -> Option<&Statement> {
        match self {
            Self::Parsed {
                statement, ..
            } => Some(statement),
            Self::Degraded => None
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded)
    }
}

/// Count-bounded LRU over parsed statements.
///
/// Keys are hashes of the raw SQL text. `IndexMap` keeps insertion order;
/// a hit is moved to the back, eviction pops the front.
struct ParseCache {
    entries:  IndexMap<u64, Arc<ParsedStatement>>,
    capacity: usize
}

impl ParseCache {
    fn new(capacity: usize) -> Self {
        Self {
            entries: IndexMap::with_capacity(capacity),
            capacity
        }
    }

    fn hash_key(sql: &str) -> u64 {
        let mut hasher = DefaultHasher::new();
        sql.hash(&mut hasher);
        hasher.finish()
    }

    fn get(&mut self, sql: &str) -> Option<Arc<ParsedStatement>> {
        let key = Self::hash_key(sql);
        let parsed = self.entries.shift_remove(&key)?;
        self.entries.insert(key, parsed.clone());
        Some(parsed)
    }

    fn insert(&mut self, sql: &str, parsed: Arc<ParsedStatement>) {
        let key = Self::hash_key(sql);
        self.entries.shift_remove(&key);
        while self.entries.len() >= self.capacity {
            self.entries.shift_remove_index(0);
        }
        self.entries.insert(key, parsed);
    }

    fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Thread-safe parser facade.
pub struct ParserFacade {
    cache: Mutex<ParseCache>
}

impl ParserFacade {
    pub fn new(config: &ParserConfig) -> Self {
        Self {
            cache: Mutex::new(ParseCache::new(config.cache_size.max(1)))
        }
    }

    /// Parse SQL into a [`ParsedStatement`], consulting the cache first.
    ///
    /// Multi-statement input is truncated to its first statement; the
    /// engine validates one execution attempt at a time.
    pub fn parse(
        &self,
        sql: &str,
        config: &ParserConfig
    ) -> Result<Arc<ParsedStatement>, ParseError> {
        if let Some(hit) = self.cache.lock().get(sql) {
            return Ok(hit);
        }
        let parsed = match self.parse_uncached(sql, config) {
            Ok(parsed) => parsed,
            Err(err) if config.lenient_mode => {
                tracing::debug!(error = %err, "lenient mode: degrading unparseable SQL");
                Arc::new(ParsedStatement::Degraded)
            }
            Err(err) => return Err(err)
        };
        self.cache.lock().insert(sql, parsed.clone());
        Ok(parsed)
    }

    fn parse_uncached(
        &self,
        sql: &str,
        config: &ParserConfig
    ) -> Result<Arc<ParsedStatement>, ParseError> {
        let dialect = config.dialect.into_parser_dialect();
        let statements = Parser::parse_sql(dialect.as_ref(), sql)
            .map_err(|e| ParseError::syntax(e.to_string()))?;
        let statement = statements.into_iter().next().ok_or(ParseError::Empty)?;
        let facts = StatementFacts::extract(&statement);
        Ok(Arc::new(ParsedStatement::Parsed {
            statement,
            facts
        }))
    }

    /// Drop all cached ASTs; subsequent parses recompute.
    pub fn clear_cache(&self) {
        self.cache.lock().clear();
    }

    /// Resize and clear the cache after a config reload.
    pub fn reconfigure(&self, config: &ParserConfig) {
        let mut cache = self.cache.lock();
        *cache = ParseCache::new(config.cache_size.max(1));
    }
}
