// Redaction policy schema and store
// Declarative enable/disable and per-type strategy, loaded from JSON files

use crate::errors::RedactionError;
use crate::types::FilterType;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// What to do with a detected identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Replace with a reversible `{{TYPE_ID_N}}` token
    #[default]
    Redact,
    /// Replace with the fixed `[MASKED]` marker
    Mask,
    /// Replace with a salted hash token
    Hash,
    /// Accepted for compatibility; behaves as `hash` in this engine
    Encrypt,
    /// Leave the span untouched
    Skip,
    /// Date-shifting; only meaningful for DATE
    Shift,
}

/// Conditional strategy override keyed on nearby context
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConditionRule {
    /// Lowercased terms; any hit in the span's context triggers the rule
    pub when_context_contains: Vec<String>,
    pub strategy: Strategy,
}

/// Per-type configuration inside a policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentifierConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// None means the type's default strategy applies
    #[serde(default)]
    pub strategy: Option<Strategy>,
    /// Per-type confidence floor overriding the engine default
    #[serde(default)]
    pub min_confidence: Option<f64>,
    #[serde(default)]
    pub conditions: Vec<ConditionRule>,
}

fn default_enabled() -> bool {
    true
}

impl Default for IdentifierConfig {
    fn default() -> Self {
        IdentifierConfig {
            enabled: true,
            strategy: None,
            min_confidence: None,
            conditions: Vec::new(),
        }
    }
}

/// A validated redaction policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Policy {
    pub name: String,
    pub identifiers: HashMap<FilterType, IdentifierConfig>,
}

/// Raw on-disk shape; identifier keys are strings so unknown types can be
/// ignored instead of failing the whole file.
#[derive(Deserialize)]
struct PolicyFile {
    identifiers: Option<HashMap<String, Option<IdentifierConfig>>>,
}

impl Policy {
    /// Policy enabling every filter type with default strategies
    pub fn permissive(name: impl Into<String>) -> Self {
        let identifiers = FilterType::ALL
            .iter()
            .map(|t| (*t, IdentifierConfig::default()))
            .collect();
        Policy {
            name: name.into(),
            identifiers,
        }
    }

    /// Policy enabling only the given types
    pub fn for_types(name: impl Into<String>, types: &[FilterType]) -> Self {
        let identifiers = types
            .iter()
            .map(|t| (*t, IdentifierConfig::default()))
            .collect();
        Policy {
            name: name.into(),
            identifiers,
        }
    }

    /// Parse a policy document. Invalid JSON maps to `POLICY_LOAD_ERROR`;
    /// a document without the `identifiers` key maps to
    /// `POLICY_VALIDATION_ERROR`. Unknown identifier keys are ignored.
    pub fn from_json(name: &str, raw: &str) -> Result<Policy, RedactionError> {
        let file: PolicyFile = serde_json::from_str(raw)
            .map_err(|e| RedactionError::PolicyLoad(format!("policy '{}': {}", name, e)))?;

        let raw_identifiers = file.identifiers.ok_or_else(|| {
            RedactionError::PolicyValidation(format!(
                "policy '{}' is missing the 'identifiers' map",
                name
            ))
        })?;

        let mut identifiers = HashMap::new();
        for (key, config) in raw_identifiers {
            match FilterType::from_prefix(&key) {
                Some(filter_type) => {
                    identifiers.insert(filter_type, config.unwrap_or_default());
                }
                None => {
                    tracing::debug!(policy = name, key = %key, "ignoring unknown identifier type");
                }
            }
        }

        Ok(Policy {
            name: name.to_string(),
            identifiers,
        })
    }

    pub fn is_enabled(&self, filter_type: FilterType) -> bool {
        self.identifiers
            .get(&filter_type)
            .map(|c| c.enabled)
            .unwrap_or(false)
    }

    /// Effective strategy for a type: explicit config, else DATE shifts and
    /// everything else redacts.
    pub fn strategy_for(&self, filter_type: FilterType) -> Strategy {
        if let Some(config) = self.identifiers.get(&filter_type) {
            if let Some(strategy) = config.strategy {
                return strategy;
            }
        }
        match filter_type {
            FilterType::Date => Strategy::Shift,
            _ => Strategy::Redact,
        }
    }

    /// Strategy after applying conditional rules against a span's context
    pub fn strategy_with_context(&self, filter_type: FilterType, context: Option<&str>) -> Strategy {
        if let (Some(config), Some(ctx)) = (self.identifiers.get(&filter_type), context) {
            let lowered = ctx.to_lowercase();
            for rule in &config.conditions {
                if rule
                    .when_context_contains
                    .iter()
                    .any(|term| lowered.contains(&term.to_lowercase()))
                {
                    return rule.strategy;
                }
            }
        }
        self.strategy_for(filter_type)
    }

    pub fn min_confidence(&self, filter_type: FilterType) -> Option<f64> {
        self.identifiers
            .get(&filter_type)
            .and_then(|c| c.min_confidence)
    }

    pub fn enabled_types(&self) -> Vec<FilterType> {
        let mut types: Vec<FilterType> = self
            .identifiers
            .iter()
            .filter(|(_, c)| c.enabled)
            .map(|(t, _)| *t)
            .collect();
        types.sort();
        types
    }
}

/// Policy names are path components; anything outside `[A-Za-z0-9_-]` is rejected
pub fn sanitize_policy_name(name: &str) -> Result<(), RedactionError> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(RedactionError::PolicyValidation(format!(
            "policy name '{}' is not a valid identifier",
            name
        )))
    }
}

/// Process-wide policy cache. Loads `<base_dir>/<name>.json` once and serves
/// the parsed policy until invalidated.
pub struct PolicyStore {
    base_dir: PathBuf,
    cache: RwLock<HashMap<String, Arc<Policy>>>,
    // Serializes cold loads so concurrent requests for the same policy hit
    // the filesystem once
    load_lock: Mutex<()>,
}

impl PolicyStore {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        PolicyStore {
            base_dir: base_dir.as_ref().to_path_buf(),
            cache: RwLock::new(HashMap::new()),
            load_lock: Mutex::new(()),
        }
    }

    /// Default on-disk location for policy documents
    pub fn default_dir() -> Self {
        PolicyStore::new("redaction/policies")
    }

    pub async fn load(&self, name: &str) -> Result<Arc<Policy>, RedactionError> {
        sanitize_policy_name(name)?;

        if let Some(policy) = self.cache.read().await.get(name) {
            return Ok(Arc::clone(policy));
        }

        let _guard = self.load_lock.lock().await;
        // Another request may have finished the load while we waited
        if let Some(policy) = self.cache.read().await.get(name) {
            return Ok(Arc::clone(policy));
        }

        let path = self.base_dir.join(format!("{}.json", name));
        let raw = std::fs::read_to_string(&path).map_err(|e| {
            RedactionError::PolicyLoad(format!("policy '{}' at {}: {}", name, path.display(), e))
        })?;
        let policy = Arc::new(Policy::from_json(name, &raw)?);

        self.cache
            .write()
            .await
            .insert(name.to_string(), Arc::clone(&policy));
        Ok(policy)
    }

    pub async fn invalidate(&self, name: &str) {
        self.cache.write().await.remove(name);
    }

    pub async fn invalidate_all(&self) {
        self.cache.write().await.clear();
    }
}
