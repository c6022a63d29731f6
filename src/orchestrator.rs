// Redaction orchestrator
// Fans detectors out over the input, threads spans through disambiguation,
// cleanup, and overlap resolution, then applies replacements

use crate::config::RedactionConfig;
use crate::date_shift::DATE_REDACTED;
use crate::detectors::{DetectionContext, DetectorRegistry};
use crate::disambiguation::{resolve_identical_positions, DisambiguationService};
use crate::errors::RedactionError;
use crate::normalizer::{self, NormalizationReport};
use crate::overlap::{is_disjoint_sorted, resolve_overlaps};
use crate::plugins::{PipelineDocument, PluginRegistry};
use crate::policy::{Policy, Strategy};
use crate::post_filters::PostFilterPipeline;
use crate::session::RedactionContext;
use crate::types::{FilterType, Span};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{RwLock, Semaphore};
use uuid::Uuid;

/// Replacement emitted by the `mask` strategy
pub const MASKED: &str = "[MASKED]";

/// Redacted text plus everything the caller may want to inspect
#[derive(Debug)]
pub struct RedactionOutcome {
    pub text: String,
    /// Applied spans, pairwise disjoint and sorted by start; offsets index
    /// into the scanned text (post-normalization when defense is on)
    pub applied_spans: Vec<Span>,
    /// Present when the Unicode normalizer ran
    pub normalization: Option<NormalizationReport>,
}

pub struct RedactionOrchestrator {
    config: RedactionConfig,
    registry: Arc<DetectorRegistry>,
    plugins: Arc<PluginRegistry>,
    disambiguator: DisambiguationService,
    post_filters: PostFilterPipeline,
    /// Upper bound on detectors running at once within one request
    detector_concurrency: usize,
    cancelled_sessions: Arc<RwLock<HashSet<String>>>,
}

impl Default for RedactionOrchestrator {
    fn default() -> Self {
        Self::new(RedactionConfig::default())
    }
}

impl RedactionOrchestrator {
    pub fn new(config: RedactionConfig) -> Self {
        Self::with_registry(config, Arc::new(DetectorRegistry::with_builtins()))
    }

    pub fn with_registry(config: RedactionConfig, registry: Arc<DetectorRegistry>) -> Self {
        let plugins = Arc::new(PluginRegistry::new(
            config.plugin_timeout,
            config.plugin_failure_limit,
        ));
        RedactionOrchestrator {
            post_filters: PostFilterPipeline::with_defaults(config.confidence_threshold),
            disambiguator: DisambiguationService::default(),
            detector_concurrency: 8,
            cancelled_sessions: Arc::new(RwLock::new(HashSet::new())),
            plugins,
            registry,
            config,
        }
    }

    pub fn with_plugins(mut self, plugins: Arc<PluginRegistry>) -> Self {
        self.plugins = plugins;
        self
    }

    pub fn with_post_filters(mut self, post_filters: PostFilterPipeline) -> Self {
        self.post_filters = post_filters;
        self
    }

    pub fn with_detector_concurrency(mut self, concurrency: usize) -> Self {
        self.detector_concurrency = concurrency.max(1);
        self
    }

    /// Ask a running `redact` call for this session to stop at its next
    /// suspension point; partial results are discarded.
    pub async fn cancel_session(&self, session_id: &str) {
        self.cancelled_sessions
            .write()
            .await
            .insert(session_id.to_string());
    }

    async fn is_cancelled(&self, session_id: &str) -> bool {
        self.cancelled_sessions.read().await.contains(session_id)
    }

    /// Redact `text` under `policy`, recording the mapping in `ctx`
    pub async fn redact(
        &self,
        text: &str,
        policy: &Policy,
        ctx: &mut RedactionContext,
    ) -> Result<String, RedactionError> {
        self.redact_with_report(text, policy, ctx)
            .await
            .map(|outcome| outcome.text)
    }

    pub async fn redact_with_report(
        &self,
        text: &str,
        policy: &Policy,
        ctx: &mut RedactionContext,
    ) -> Result<RedactionOutcome, RedactionError> {
        let started = Instant::now();

        // Caller errors reject before any detector runs
        if text.len() > self.config.absolute_max_size {
            return Err(RedactionError::InputTooLarge {
                actual: text.len(),
                limit: self.config.absolute_max_size,
            });
        }
        if text.is_empty() {
            return Ok(RedactionOutcome {
                text: String::new(),
                applied_spans: Vec::new(),
                normalization: None,
            });
        }

        // Normalization rewrites the working text; every downstream offset
        // refers to the normalized form
        let (working_text, normalization) = if self.config.adversarial_defense {
            let normalized = normalizer::normalize(text);
            ctx.stats.normalized = normalized.report.changed;
            if normalized.report.suspicion_score > 0.5 {
                tracing::warn!(
                    session_id = ctx.session_id(),
                    score = normalized.report.suspicion_score,
                    "input flagged by adversarial defense"
                );
            }
            (normalized.text, Some(normalized.report))
        } else {
            (text.to_string(), None)
        };

        let request_id = Uuid::new_v4().to_string();
        tracing::debug!(
            request_id = %request_id,
            session_id = ctx.session_id(),
            policy = %policy.name,
            bytes = text.len(),
            "redaction request"
        );

        let plugins_active = self.config.plugins_enabled && !self.plugins.is_empty();
        let mut doc = PipelineDocument {
            text: working_text,
            policy_name: policy.name.clone(),
            session_id: ctx.session_id().to_string(),
            request_id,
        };

        let mut spans = None;
        if plugins_active {
            doc = self.plugins.run_pre_process(doc).await;
            // A short-circuit supplies spans and skips detection entirely
            spans = self.plugins.run_short_circuit(&doc).await;
        }

        let short_circuited = spans.is_some();
        let mut spans = match spans {
            Some(spans) => spans,
            None => self.detect(&doc, policy, ctx).await?,
        };

        if self.is_cancelled(ctx.session_id()).await {
            return Err(RedactionError::Internal("request cancelled".to_string()));
        }

        // Detector contract enforcement: spans must describe the scanned text
        spans.retain(|span| {
            let ok = span.is_consistent_with(&doc.text);
            if !ok {
                tracing::warn!(
                    filter_type = %span.filter_type,
                    start = span.start,
                    end = span.end,
                    "dropping span with inconsistent offsets"
                );
            }
            ok
        });

        if !short_circuited {
            if plugins_active {
                spans = self.plugins.run_post_detection(spans, &doc).await;
            }

            for span in &mut spans {
                span.capture_context(&doc.text);
                span.window = crate::context_window::window(
                    &doc.text,
                    span.start,
                    span.end,
                    self.config.window_tokens,
                )
                .full();
            }

            let before_groups = spans.len();
            spans = resolve_identical_positions(&self.disambiguator, spans);
            ctx.stats.disambiguated_groups += before_groups - spans.len();

            let report = self.post_filters.run(spans, &doc.text);
            ctx.stats.record_drops(&report.dropped_by);
            spans = report.kept;
            // Trimming may have shifted offsets; re-check before application
            spans.retain(|span| span.is_consistent_with(&doc.text));

            let before_overlap = spans.len();
            spans = resolve_overlaps(spans);
            ctx.stats.overlap_discards += before_overlap - spans.len();
        } else {
            spans.retain(|span| !span.ignored);
            spans = resolve_overlaps(spans);
        }

        if plugins_active {
            spans = self.plugins.run_pre_redaction(spans, &doc).await;
            spans.retain(|span| span.is_consistent_with(&doc.text));
            spans = resolve_overlaps(spans);
        }

        if self.is_cancelled(ctx.session_id()).await {
            return Err(RedactionError::Internal("request cancelled".to_string()));
        }

        // Replacement assignment runs sequentially in start order so token
        // counters are deterministic
        let applied_spans = self.assign_replacements(spans, policy, ctx);

        debug_assert!(is_disjoint_sorted(&applied_spans));

        // Splice from the right so earlier offsets stay valid
        let mut output = doc.text.clone();
        for span in applied_spans.iter().rev() {
            if let Some(replacement) = &span.replacement {
                output.replace_range(span.start..span.end, replacement);
            }
        }

        if plugins_active {
            output = self.plugins.run_post_redaction(output).await;
        }

        for span in &applied_spans {
            ctx.stats.record_applied(span.filter_type);
        }
        ctx.finalize_stats(started.elapsed().as_millis() as u64);

        Ok(RedactionOutcome {
            text: output,
            applied_spans,
            normalization,
        })
    }

    /// Fan out the enabled detectors over the working text. Each detector
    /// gets a read-only view; failures and panics are isolated to an empty
    /// span set for that detector.
    async fn detect(
        &self,
        doc: &PipelineDocument,
        policy: &Policy,
        ctx: &mut RedactionContext,
    ) -> Result<Vec<Span>, RedactionError> {
        let detectors = self.registry.detectors_enabled(policy);
        if detectors.is_empty() {
            return Ok(Vec::new());
        }

        let semaphore = Arc::new(Semaphore::new(self.detector_concurrency));
        let text: Arc<str> = Arc::from(doc.text.as_str());
        let session_id = doc.session_id.clone();
        let engine_config = self.config.clone();

        let mut handles = Vec::with_capacity(detectors.len());
        for detector in detectors {
            let semaphore = Arc::clone(&semaphore);
            let text = Arc::clone(&text);
            let type_config = policy
                .identifiers
                .get(&detector.filter_type())
                .cloned()
                .unwrap_or_default();
            let session_id = session_id.clone();
            let engine_config = engine_config.clone();
            let cancelled = Arc::clone(&self.cancelled_sessions);

            handles.push(tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                if cancelled.read().await.contains(&session_id) {
                    return (detector.name().to_string(), Ok(Vec::new()));
                }
                let detection_ctx = DetectionContext {
                    session_id: &session_id,
                    config: &engine_config,
                };
                let result = detector.detect(&text, &type_config, &detection_ctx).await;
                (detector.name().to_string(), result)
            }));
        }

        let mut spans = Vec::new();
        for joined in futures::future::join_all(handles).await {
            match joined {
                Ok((_, Ok(detected))) => {
                    for span in &detected {
                        ctx.stats.record_detected(span.filter_type, 1);
                    }
                    spans.extend(detected);
                }
                Ok((name, Err(e))) => {
                    // One failing detector never aborts the pipeline
                    ctx.stats.record_detector_failure(&name);
                    tracing::warn!(detector = %name, error = %e, "detector failed; skipping");
                }
                Err(join_error) => {
                    ctx.stats.record_detector_failure("panicked");
                    tracing::error!(error = %join_error, "detector task panicked; skipping");
                }
            }
        }
        Ok(spans)
    }

    /// Assign a replacement to every span in start order, honoring per-type
    /// strategy. Returns only applied spans.
    fn assign_replacements(
        &self,
        spans: Vec<Span>,
        policy: &Policy,
        ctx: &mut RedactionContext,
    ) -> Vec<Span> {
        let mut applied = Vec::with_capacity(spans.len());
        for mut span in spans {
            let strategy = policy.strategy_with_context(span.filter_type, span.context.as_deref());
            let replacement = match strategy {
                Strategy::Skip => {
                    span.ignored = true;
                    continue;
                }
                Strategy::Shift if span.filter_type == FilterType::Date => ctx
                    .shift_date(&span.text)
                    .unwrap_or_else(|| DATE_REDACTED.to_string()),
                Strategy::Mask => MASKED.to_string(),
                Strategy::Hash | Strategy::Encrypt => {
                    let (token, salt) = hashed_replacement(&span, ctx);
                    span.salt = Some(salt);
                    token
                }
                Strategy::Redact | Strategy::Shift => {
                    ctx.replacement_for(&span, Some(&policy.name))
                }
            };
            span.replacement = Some(replacement);
            span.applied = true;
            applied.push(span);
        }
        applied
    }
}

/// One-way salted digest for the hash/encrypt strategies; not recorded in
/// the token map, so it never reinserts.
fn hashed_replacement(span: &Span, ctx: &RedactionContext) -> (String, String) {
    let mut hasher = Sha256::new();
    hasher.update(ctx.seed());
    hasher.update(span.filter_type.prefix().as_bytes());
    hasher.update(span.text.as_bytes());
    let digest = hasher.finalize();
    let hex: String = digest[..6].iter().map(|b| format!("{:02x}", b)).collect();
    let salt: String = digest[26..32].iter().map(|b| format!("{:02x}", b)).collect();
    (format!("[{}#{}]", span.filter_type.prefix(), hex), salt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugins::RedactionPlugin;
    use crate::types::FilterType;
    use chrono::Datelike;
    use regex::Regex;

    fn orchestrator() -> RedactionOrchestrator {
        let config = RedactionConfig {
            plugins_enabled: false,
            ..Default::default()
        };
        RedactionOrchestrator::new(config)
    }

    fn session() -> RedactionContext {
        RedactionContext::with_session(4821, [11u8; 32])
    }

    #[tokio::test]
    async fn test_clinical_note_end_to_end() {
        let orchestrator = orchestrator();
        let mut ctx = session();
        let policy = Policy::permissive("all");
        let input = "Patient John Doe, DOB 01/02/1980, SSN 123-45-6789.";

        let outcome = orchestrator
            .redact_with_report(input, &policy, &mut ctx)
            .await
            .unwrap();

        let types: Vec<FilterType> =
            outcome.applied_spans.iter().map(|s| s.filter_type).collect();
        assert_eq!(
            types,
            vec![FilterType::Name, FilterType::Date, FilterType::Ssn]
        );
        assert!(outcome.text.contains("{{NAME_4821_1}}"));
        assert!(outcome.text.contains("[SHIFTED_DATE_1: "));
        assert!(outcome.text.contains("{{SSN_4821_1}}"));
        assert!(!outcome.text.contains("John Doe"));
        assert!(!outcome.text.contains("123-45-6789"));

        // Round-trip: reinsertion restores the original bytes
        assert_eq!(ctx.reinsert(&outcome.text), input);
    }

    #[tokio::test]
    async fn test_context_disambiguates_phone_from_ssn_shape() {
        let orchestrator = orchestrator();
        let mut ctx = session();
        let policy = Policy::for_types("unit", &[FilterType::Ssn, FilterType::Phone]);

        let outcome = orchestrator
            .redact_with_report("Call 123-45-6789 today.", &policy, &mut ctx)
            .await
            .unwrap();

        assert_eq!(outcome.applied_spans.len(), 1);
        let span = &outcome.applied_spans[0];
        assert_eq!(span.filter_type, FilterType::Phone);
        assert!(span.ambiguous_with.contains(&FilterType::Ssn));
        assert!(outcome.text.contains("{{PHONE_4821_1}}"));
        assert!(!outcome.text.contains("123-45-6789"));
    }

    #[tokio::test]
    async fn test_date_shifting_preserves_intervals() {
        let orchestrator = orchestrator();
        let mut ctx = session();
        let policy = Policy::for_types("unit", &[FilterType::Date]);

        let output = orchestrator
            .redact(
                "Visit on 2020-01-01 and then on 2020-04-09.",
                &policy,
                &mut ctx,
            )
            .await
            .unwrap();

        let offset = ctx.date_engine.offset_days();
        let first_year = (chrono::NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()
            + chrono::Duration::days(offset))
        .year();
        let second_year = (chrono::NaiveDate::from_ymd_opt(2020, 4, 9).unwrap()
            + chrono::Duration::days(offset))
        .year();

        assert!(output.contains(&format!("[SHIFTED_DATE_1: {}]", first_year)));
        assert!(output.contains(&format!("[99 days later, SHIFTED_DATE_2: {}]", second_year)));
    }

    #[tokio::test]
    async fn test_tokenized_input_is_untouched() {
        let orchestrator = orchestrator();
        let mut ctx = session();
        let policy = Policy::for_types("unit", &[FilterType::Name]);
        let input = "Forwarding note for {{NAME_123_1}} as received.";

        let output = orchestrator.redact(input, &policy, &mut ctx).await.unwrap();
        assert_eq!(output, input);
    }

    #[tokio::test]
    async fn test_size_limit_boundary() {
        let orchestrator = orchestrator();
        let policy = Policy::permissive("all");

        let at_limit = "x".repeat(500_000);
        let mut ctx = session();
        assert!(orchestrator.redact(&at_limit, &policy, &mut ctx).await.is_ok());

        let over_limit = "x".repeat(500_001);
        let mut ctx = session();
        let err = orchestrator
            .redact(&over_limit, &policy, &mut ctx)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "INPUT_TOO_LARGE");
    }

    #[tokio::test]
    async fn test_document_scope_reuses_tokens() {
        let orchestrator = orchestrator();
        let mut ctx = session();
        let policy = Policy::for_types("unit", &[FilterType::Name]);
        let input = "Smith arrived late. Later Smith felt fine. Smith was discharged.";

        let output = orchestrator.redact(input, &policy, &mut ctx).await.unwrap();

        assert_eq!(output.matches("{{NAME_4821_1}}").count(), 3);
        assert!(!output.contains("Smith"));
        assert_eq!(
            ctx.replacements.occurrences("Smith", FilterType::Name, None),
            3
        );
        assert_eq!(ctx.reinsert(&output), input);
    }

    #[tokio::test]
    async fn test_empty_input() {
        let orchestrator = orchestrator();
        let mut ctx = session();
        let policy = Policy::permissive("all");
        assert_eq!(orchestrator.redact("", &policy, &mut ctx).await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_no_matches_returns_input_verbatim() {
        let orchestrator = orchestrator();
        let mut ctx = session();
        let policy = Policy::permissive("all");
        let input = "the quick brown fox jumps over the lazy dog";
        assert_eq!(
            orchestrator.redact(input, &policy, &mut ctx).await.unwrap(),
            input
        );
    }

    #[tokio::test]
    async fn test_applied_spans_disjoint_and_sorted() {
        let orchestrator = orchestrator();
        let mut ctx = session();
        let policy = Policy::permissive("all");
        let input =
            "John Doe, 123 Main Street, Springfield, IL 62704, phone 555-123-4567, a@b.com";

        let outcome = orchestrator
            .redact_with_report(input, &policy, &mut ctx)
            .await
            .unwrap();

        assert!(is_disjoint_sorted(&outcome.applied_spans));
        assert!(!outcome.applied_spans.is_empty());
    }

    #[tokio::test]
    async fn test_every_token_maps_back() {
        let orchestrator = orchestrator();
        let mut ctx = session();
        let policy = Policy::permissive("all");
        let input = "Patient John Doe, SSN 123-45-6789, email john@example.org.";

        let output = orchestrator.redact(input, &policy, &mut ctx).await.unwrap();

        let token_shape = Regex::new(r"\{\{[A-Z_]+_[0-9]+_[0-9]+\}\}").unwrap();
        let mut found = 0;
        for token in token_shape.find_iter(&output) {
            found += 1;
            assert!(
                ctx.get_original_value(token.as_str()).is_some(),
                "token {} not in session map",
                token.as_str()
            );
        }
        assert!(found >= 3);
    }

    #[tokio::test]
    async fn test_determinism_across_runs() {
        let policy = Policy::permissive("all");
        let input = "Patient John Doe, DOB 01/02/1980, SSN 123-45-6789, seen at 123 Main Street.";

        let mut outputs = Vec::new();
        for _ in 0..2 {
            let orchestrator = orchestrator();
            let mut ctx = RedactionContext::with_session(777, [3u8; 32]);
            outputs.push(orchestrator.redact(input, &policy, &mut ctx).await.unwrap());
        }
        assert_eq!(outputs[0], outputs[1]);
    }

    #[tokio::test]
    async fn test_idempotence_on_redacted_output() {
        let policy = Policy::permissive("all");
        let input = "Patient John Doe, DOB 01/02/1980, SSN 123-45-6789.";

        let orchestrator1 = orchestrator();
        let mut ctx1 = session();
        let first = orchestrator1.redact(input, &policy, &mut ctx1).await.unwrap();

        let orchestrator2 = orchestrator();
        let mut ctx2 = RedactionContext::with_session(9999, [5u8; 32]);
        let second = orchestrator2.redact(&first, &policy, &mut ctx2).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_mask_and_skip_strategies() {
        let raw = r#"{
            "identifiers": {
                "SSN": {"enabled": true, "strategy": "mask"},
                "EMAIL": {"enabled": true, "strategy": "skip"}
            }
        }"#;
        let policy = Policy::from_json("unit", raw).unwrap();
        let orchestrator = orchestrator();
        let mut ctx = session();

        let output = orchestrator
            .redact("SSN 123-45-6789, mail a@b.com", &policy, &mut ctx)
            .await
            .unwrap();

        assert!(output.contains(MASKED));
        assert!(!output.contains("123-45-6789"));
        assert!(output.contains("a@b.com"));
    }

    #[tokio::test]
    async fn test_hash_strategy_is_stable_and_opaque() {
        let raw = r#"{"identifiers": {"MRN": {"enabled": true, "strategy": "hash"}}}"#;
        let policy = Policy::from_json("unit", raw).unwrap();
        let orchestrator = orchestrator();
        let mut ctx = session();

        let output = orchestrator
            .redact("MRN: 445566 and again MRN: 445566", &policy, &mut ctx)
            .await
            .unwrap();

        let hash_shape = Regex::new(r"\[MRN#[0-9a-f]{12}\]").unwrap();
        let hashes: Vec<&str> = hash_shape.find_iter(&output).map(|m| m.as_str()).collect();
        assert_eq!(hashes.len(), 2);
        assert_eq!(hashes[0], hashes[1]);
        assert!(!output.contains("445566"));
    }

    #[tokio::test]
    async fn test_cancellation_discards_work() {
        let orchestrator = orchestrator();
        let mut ctx = session();
        orchestrator.cancel_session(ctx.session_id()).await;
        let policy = Policy::permissive("all");
        let err = orchestrator
            .redact("Patient John Doe.", &policy, &mut ctx)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "INTERNAL_ERROR");
    }

    #[tokio::test]
    async fn test_multibyte_prefix_keeps_offsets_safe() {
        let orchestrator = orchestrator();
        let mut ctx = session();
        let policy = Policy::permissive("all");
        let input = "Résumé — Patient John Doe, SSN 123-45-6789.";

        let outcome = orchestrator
            .redact_with_report(input, &policy, &mut ctx)
            .await
            .unwrap();

        assert!(outcome.text.contains("{{SSN_4821_1}}"));
        assert!(!outcome.text.contains("123-45-6789"));
        for span in &outcome.applied_spans {
            assert!(outcome
                .applied_spans
                .iter()
                .all(|other| span.same_range(other) || !span.overlaps(other)));
        }
    }

    #[tokio::test]
    async fn test_homoglyph_evasion_is_normalized_and_caught() {
        let orchestrator = orchestrator();
        let mut ctx = session();
        let policy = Policy::for_types("unit", &[FilterType::Ssn]);
        // Zero-width spaces inside the SSN digits
        let input = "SSN 123\u{200B}-45-\u{200B}6789 on file.";

        let outcome = orchestrator
            .redact_with_report(input, &policy, &mut ctx)
            .await
            .unwrap();

        let report = outcome.normalization.unwrap();
        assert!(report.had_invisibles);
        assert!(outcome.text.contains("{{SSN_4821_1}}"));
        assert!(!outcome.text.contains("6789"));
    }

    struct StubShortCircuit;

    #[async_trait::async_trait]
    impl RedactionPlugin for StubShortCircuit {
        fn name(&self) -> &str {
            "stub-short-circuit"
        }

        async fn can_short_circuit(
            &self,
            doc: &PipelineDocument,
        ) -> anyhow::Result<Option<Vec<Span>>> {
            let start = doc.text.find("SECRET").unwrap_or(0);
            Ok(Some(vec![Span::new(
                "SECRET",
                start,
                start + 6,
                FilterType::Name,
                1.0,
                10,
            )]))
        }
    }

    #[tokio::test]
    async fn test_plugin_short_circuit_path() {
        let config = RedactionConfig::default();
        let mut plugin_registry =
            PluginRegistry::new(config.plugin_timeout, config.plugin_failure_limit);
        plugin_registry.register(Arc::new(StubShortCircuit));
        let orchestrator =
            RedactionOrchestrator::new(config).with_plugins(Arc::new(plugin_registry));
        let mut ctx = session();
        let policy = Policy::for_types("unit", &[FilterType::Name]);

        let output = orchestrator
            .redact(
                "the SECRET word, and SSN 123-45-6789 untouched",
                &policy,
                &mut ctx,
            )
            .await
            .unwrap();

        // Short-circuit spans replace detection output entirely
        assert!(output.contains("{{NAME_4821_1}}"));
        assert!(output.contains("123-45-6789"));
        assert!(!output.contains("SECRET"));
    }
}
