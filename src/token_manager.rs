// Token manager
// Session-scoped token catalog with reinsertion

use crate::types::FilterType;
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Canonical token form: `{{TYPE_ID_N}}` with a numeric session id and a
/// per-(session, type) counter.
pub struct TokenManager {
    session_id: String,
    counters: HashMap<FilterType, u64>,
    token_to_original: HashMap<String, String>,
    original_to_token: HashMap<(FilterType, String), String>,
}

impl TokenManager {
    pub fn new(session_id: impl Into<String>) -> Self {
        TokenManager {
            session_id: session_id.into(),
            counters: HashMap::new(),
            token_to_original: HashMap::new(),
            original_to_token: HashMap::new(),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Mint the next `{{TYPE_ID_N}}` token for this type and remember the
    /// original value behind it.
    pub fn create_token(&mut self, filter_type: FilterType, original: &str) -> String {
        let counter = self.counters.entry(filter_type).or_insert(0);
        *counter += 1;
        let token = format!(
            "{{{{{}_{}_{}}}}}",
            filter_type.prefix(),
            self.session_id,
            counter
        );
        self.token_to_original
            .insert(token.clone(), original.to_string());
        self.original_to_token
            .insert((filter_type, original.to_string()), token.clone());
        token
    }

    /// Record an externally generated token, e.g. a shifted-date marker
    pub fn store_token(&mut self, token: &str, original: &str) {
        self.token_to_original
            .insert(token.to_string(), original.to_string());
    }

    pub fn get_original_value(&self, token: &str) -> Option<&str> {
        self.token_to_original.get(token).map(String::as_str)
    }

    /// Existing token for a value previously passed to `create_token`
    pub fn token_for(&self, filter_type: FilterType, original: &str) -> Option<&str> {
        self.original_to_token
            .get(&(filter_type, original.to_string()))
            .map(String::as_str)
    }

    pub fn get_token_map(&self) -> &HashMap<String, String> {
        &self.token_to_original
    }

    pub fn token_count(&self) -> usize {
        self.token_to_original.len()
    }

    /// Replace every known token in `text` with its original value.
    ///
    /// Benign formatting variants (`{ X }`, `{{ X }}`, `{{{X}}}`) are first
    /// collapsed to the canonical `{{X}}` form before substitution.
    pub fn reinsert(&self, text: &str) -> String {
        let mut result = normalize_token_format(text);
        for (token, original) in &self.token_to_original {
            if result.contains(token.as_str()) {
                result = result.replace(token.as_str(), original);
            }
        }
        result
    }
}

/// Collapse greedy brace runs with optional inner whitespace around a token
/// body to the canonical `{{BODY}}` form.
pub fn normalize_token_format(text: &str) -> String {
    static VARIANT: OnceLock<Regex> = OnceLock::new();
    let variant = VARIANT
        .get_or_init(|| Regex::new(r"\{+\s*([A-Z_]+_[0-9]+_[0-9]+)\s*\}+").unwrap());
    variant.replace_all(text, "{{$1}}").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_format_and_counters() {
        let mut manager = TokenManager::new("4821");
        assert_eq!(manager.create_token(FilterType::Name, "John Doe"), "{{NAME_4821_1}}");
        assert_eq!(manager.create_token(FilterType::Name, "Jane Roe"), "{{NAME_4821_2}}");
        assert_eq!(manager.create_token(FilterType::Ssn, "123-45-6789"), "{{SSN_4821_1}}");
        assert_eq!(manager.get_original_value("{{NAME_4821_2}}"), Some("Jane Roe"));
    }

    #[test]
    fn test_canonical_token_shape() {
        let mut manager = TokenManager::new("77");
        let token = manager.create_token(FilterType::HealthPlan, "GRP-9912");
        let shape = Regex::new(r"^\{\{[A-Z_]+_[0-9]+_[0-9]+\}\}$").unwrap();
        assert!(shape.is_match(&token));
    }

    #[test]
    fn test_reinsert_round_trip() {
        let mut manager = TokenManager::new("4821");
        let t1 = manager.create_token(FilterType::Name, "John Doe");
        let t2 = manager.create_token(FilterType::Ssn, "123-45-6789");
        let redacted = format!("Patient {} has SSN {}.", t1, t2);
        assert_eq!(
            manager.reinsert(&redacted),
            "Patient John Doe has SSN 123-45-6789."
        );
    }

    #[test]
    fn test_reinsert_tolerates_brace_variants() {
        let mut manager = TokenManager::new("9");
        manager.create_token(FilterType::Name, "Smith");
        assert_eq!(manager.reinsert("saw { NAME_9_1 } today"), "saw Smith today");
        assert_eq!(manager.reinsert("saw {{ NAME_9_1 }} today"), "saw Smith today");
        assert_eq!(manager.reinsert("saw {{{NAME_9_1}}} today"), "saw Smith today");
    }

    #[test]
    fn test_reinsert_ignores_unknown_tokens() {
        let manager = TokenManager::new("1");
        assert_eq!(
            manager.reinsert("keep {{NAME_2_1}} as-is"),
            "keep {{NAME_2_1}} as-is"
        );
    }

    #[test]
    fn test_stored_external_tokens_reinsert() {
        let mut manager = TokenManager::new("1");
        manager.store_token("[SHIFTED_DATE_1: 1980]", "01/02/1980");
        assert_eq!(
            manager.reinsert("DOB [SHIFTED_DATE_1: 1980]."),
            "DOB 01/02/1980."
        );
    }

    #[test]
    fn test_prefix_tokens_do_not_collide() {
        let mut manager = TokenManager::new("1");
        for i in 0..11 {
            manager.create_token(FilterType::Name, &format!("person-{}", i));
        }
        // {{NAME_1_1}} must not clobber part of {{NAME_1_11}}
        let redacted = "{{NAME_1_11}} then {{NAME_1_1}}";
        assert_eq!(manager.reinsert(redacted), "person-10 then person-0");
    }
}
