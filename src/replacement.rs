// Replacement context
// Deterministic value-to-token memoization within a scope

use crate::types::FilterType;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

/// How widely a replacement is reused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplacementScope {
    /// Same value and type share one token across the whole document
    #[default]
    Document,
    /// Reuse is additionally keyed by a caller-supplied context name
    Context,
    /// Every occurrence gets a fresh token
    None,
}

/// Structured map key; avoids building `type:value` strings on the hot path
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ReplacementKey {
    context: Option<String>,
    filter_type: FilterType,
    value: String,
}

/// One memoized replacement
#[derive(Debug, Clone, Serialize)]
pub struct ReplacementEntry {
    pub original_value: String,
    pub replacement: String,
    pub filter_type: FilterType,
    pub context: Option<String>,
    pub first_seen: DateTime<Utc>,
    pub occurrences: usize,
}

#[derive(Debug, Default)]
pub struct ReplacementContext {
    scope: ReplacementScope,
    entries: HashMap<ReplacementKey, ReplacementEntry>,
    lookups: usize,
    reuses: usize,
}

impl ReplacementContext {
    pub fn new(scope: ReplacementScope) -> Self {
        ReplacementContext {
            scope,
            ..Default::default()
        }
    }

    pub fn scope(&self) -> ReplacementScope {
        self.scope
    }

    /// Return the replacement for `(value, filter_type, context_name)`,
    /// invoking `generator` only on first sight. Outside `None` scope the
    /// same key always yields the same string for the life of the session.
    /// The second element reports whether an existing replacement was reused.
    pub fn get_replacement(
        &mut self,
        value: &str,
        filter_type: FilterType,
        context_name: Option<&str>,
        generator: impl FnOnce() -> String,
    ) -> (String, bool) {
        self.lookups += 1;

        if self.scope == ReplacementScope::None {
            return (generator(), false);
        }

        let key = ReplacementKey {
            context: match self.scope {
                ReplacementScope::Context => context_name.map(|c| c.to_string()),
                _ => None,
            },
            filter_type,
            value: value.to_string(),
        };

        if let Some(entry) = self.entries.get_mut(&key) {
            entry.occurrences += 1;
            self.reuses += 1;
            return (entry.replacement.clone(), true);
        }

        let replacement = generator();
        self.entries.insert(
            key,
            ReplacementEntry {
                original_value: value.to_string(),
                replacement: replacement.clone(),
                filter_type,
                context: context_name.map(|c| c.to_string()),
                first_seen: Utc::now(),
                occurrences: 1,
            },
        );
        (replacement, false)
    }

    pub fn occurrences(
        &self,
        value: &str,
        filter_type: FilterType,
        context_name: Option<&str>,
    ) -> usize {
        let key = ReplacementKey {
            context: match self.scope {
                ReplacementScope::Context => context_name.map(|c| c.to_string()),
                _ => None,
            },
            filter_type,
            value: value.to_string(),
        };
        self.entries.get(&key).map(|e| e.occurrences).unwrap_or(0)
    }

    pub fn entries(&self) -> impl Iterator<Item = &ReplacementEntry> {
        self.entries.values()
    }

    /// Fraction of lookups that reused a memoized replacement
    pub fn reuse_rate(&self) -> f64 {
        if self.lookups == 0 {
            0.0
        } else {
            self.reuses as f64 / self.lookups as f64
        }
    }
}
