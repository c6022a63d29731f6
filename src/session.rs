// Redaction session
// One per request: owns the token manager, replacement context, date
// engine, and statistics; no cross-request sharing

use crate::date_shift::DateShiftingEngine;
use crate::replacement::{ReplacementContext, ReplacementScope};
use crate::stats::StatisticsTracker;
use crate::token_manager::TokenManager;
use crate::types::{FilterType, Span};
use rand::Rng;

/// Session state for a single redaction request. Construct, pass to
/// `redact`, then keep it around for `reinsert` on the downstream response;
/// the mapping dies with the value.
pub struct RedactionContext {
    session_id: String,
    seed: [u8; 32],
    pub token_manager: TokenManager,
    pub replacements: ReplacementContext,
    pub date_engine: DateShiftingEngine,
    pub stats: StatisticsTracker,
}

impl Default for RedactionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl RedactionContext {
    /// Fresh session with a random numeric id and random seed
    pub fn new() -> Self {
        let mut rng = rand::thread_rng();
        let session_id: u32 = rng.gen_range(1000..=99999);
        let seed: [u8; 32] = rng.gen();
        Self::with_session(session_id, seed)
    }

    /// Deterministic constructor; same id and seed reproduce the same
    /// tokens and date offset.
    pub fn with_session(session_id: u32, seed: [u8; 32]) -> Self {
        let session_id = session_id.to_string();
        RedactionContext {
            token_manager: TokenManager::new(&session_id),
            replacements: ReplacementContext::new(ReplacementScope::Document),
            date_engine: DateShiftingEngine::new(&seed),
            stats: StatisticsTracker::new(),
            session_id,
            seed,
        }
    }

    /// Override the replacement scope before the first redaction
    pub fn with_scope(mut self, scope: ReplacementScope) -> Self {
        self.replacements = ReplacementContext::new(scope);
        self
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn seed(&self) -> &[u8; 32] {
        &self.seed
    }

    /// Mint a token for an original value, counting it in the session stats
    pub fn create_token(&mut self, filter_type: FilterType, original: &str) -> String {
        self.stats.tokens_issued += 1;
        self.token_manager.create_token(filter_type, original)
    }

    /// Memoized replacement for a span under the session's scope. The
    /// generator path mints a fresh token; the memoized path reuses the
    /// existing one and bumps the reuse counters.
    pub fn replacement_for(&mut self, span: &Span, context_name: Option<&str>) -> String {
        let RedactionContext {
            token_manager,
            replacements,
            stats,
            ..
        } = self;
        let (token, reused) = replacements.get_replacement(
            &span.text,
            span.filter_type,
            context_name,
            || {
                stats.tokens_issued += 1;
                token_manager.create_token(span.filter_type, &span.text)
            },
        );
        if reused {
            self.stats.replacement_reuses += 1;
        }
        token
    }

    /// Shifted-date token for a DATE span, or None when the value does not
    /// parse as a date. The token is recorded in the token manager so
    /// reinsertion restores the original date string.
    pub fn shift_date(&mut self, original: &str) -> Option<String> {
        let event = self.date_engine.add_date(original)?;
        let token = self
            .date_engine
            .generate_token(event)
            .expect("event number came from add_date");
        self.token_manager.store_token(&token, original);
        Some(token)
    }

    /// Restore every known token in `text` to its original value
    pub fn reinsert(&self, text: &str) -> String {
        self.token_manager.reinsert(text)
    }

    pub fn get_original_value(&self, token: &str) -> Option<&str> {
        self.token_manager.get_original_value(token)
    }

    /// Fold end-of-request figures into the statistics
    pub fn finalize_stats(&mut self, elapsed_ms: u64) {
        self.stats.reuse_rate = self.replacements.reuse_rate();
        self.stats.elapsed_ms = elapsed_ms;
        self.stats.log_summary(&self.session_id);
    }
}
