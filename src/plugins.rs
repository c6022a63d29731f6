// Plugin hook points
// Priority-ordered typed hooks around the pipeline, each run under a
// timeout with a consecutive-failure circuit breaker

use crate::types::Span;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// The document as seen by plugins
#[derive(Debug, Clone)]
pub struct PipelineDocument {
    pub text: String,
    pub policy_name: String,
    pub session_id: String,
    /// Correlates one `redact` call across hook and detector logs
    pub request_id: String,
}

/// A pipeline extension. Default implementations pass everything through,
/// so plugins override only the hooks they care about.
///
/// Hooks must tolerate parallel orchestrator invocations; any internal
/// state needs its own synchronization.
#[async_trait::async_trait]
pub trait RedactionPlugin: Send + Sync {
    fn name(&self) -> &str;

    /// Higher priority runs earlier in every chain
    fn priority(&self) -> i32 {
        0
    }

    async fn pre_process(&self, doc: PipelineDocument) -> anyhow::Result<PipelineDocument> {
        Ok(doc)
    }

    /// Return spans to skip detection entirely and jump to span application
    async fn can_short_circuit(
        &self,
        _doc: &PipelineDocument,
    ) -> anyhow::Result<Option<Vec<Span>>> {
        Ok(None)
    }

    async fn post_detection(
        &self,
        spans: Vec<Span>,
        _doc: &PipelineDocument,
    ) -> anyhow::Result<Vec<Span>> {
        Ok(spans)
    }

    async fn pre_redaction(
        &self,
        spans: Vec<Span>,
        _doc: &PipelineDocument,
    ) -> anyhow::Result<Vec<Span>> {
        Ok(spans)
    }

    async fn post_redaction(&self, result: String) -> anyhow::Result<String> {
        Ok(result)
    }
}

struct PluginSlot {
    plugin: Arc<dyn RedactionPlugin>,
    consecutive_failures: AtomicU32,
    disabled: AtomicBool,
}

/// Holds registered plugins in priority order and shields the pipeline from
/// their failures: a hook that errors or times out is skipped, and after
/// `failure_limit` consecutive failures the plugin is disabled for the rest
/// of the process lifetime.
pub struct PluginRegistry {
    slots: Vec<PluginSlot>,
    timeout: Duration,
    failure_limit: u32,
}

impl PluginRegistry {
    pub fn new(timeout: Duration, failure_limit: u32) -> Self {
        PluginRegistry {
            slots: Vec::new(),
            timeout,
            failure_limit,
        }
    }

    pub fn register(&mut self, plugin: Arc<dyn RedactionPlugin>) {
        self.slots.push(PluginSlot {
            plugin,
            consecutive_failures: AtomicU32::new(0),
            disabled: AtomicBool::new(false),
        });
        self.slots
            .sort_by_key(|slot| std::cmp::Reverse(slot.plugin.priority()));
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn is_disabled(&self, name: &str) -> bool {
        self.slots
            .iter()
            .any(|s| s.plugin.name() == name && s.disabled.load(Ordering::Relaxed))
    }

    fn active_slots(&self) -> impl Iterator<Item = &PluginSlot> {
        self.slots
            .iter()
            .filter(|s| !s.disabled.load(Ordering::Relaxed))
    }

    fn record_failure(&self, slot: &PluginSlot, hook: &str, reason: &str) {
        let failures = slot.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::warn!(
            plugin = slot.plugin.name(),
            hook,
            failures,
            reason,
            "plugin hook failed; output discarded"
        );
        if failures >= self.failure_limit {
            slot.disabled.store(true, Ordering::Relaxed);
            tracing::warn!(
                plugin = slot.plugin.name(),
                "plugin disabled after repeated failures"
            );
        }
    }

    fn record_success(&self, slot: &PluginSlot) {
        slot.consecutive_failures.store(0, Ordering::Relaxed);
    }

    /// Run one hook under the timeout, returning None when it failed
    async fn guarded<T>(
        &self,
        slot: &PluginSlot,
        hook: &str,
        fut: impl std::future::Future<Output = anyhow::Result<T>>,
    ) -> Option<T> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(Ok(value)) => {
                self.record_success(slot);
                Some(value)
            }
            Ok(Err(e)) => {
                self.record_failure(slot, hook, &e.to_string());
                None
            }
            Err(_) => {
                self.record_failure(slot, hook, "timeout");
                None
            }
        }
    }

    /// Chain `pre_process` through every active plugin
    pub async fn run_pre_process(&self, mut doc: PipelineDocument) -> PipelineDocument {
        for slot in self.active_slots() {
            let input = doc.clone();
            if let Some(output) = self
                .guarded(slot, "pre_process", slot.plugin.pre_process(input))
                .await
            {
                doc = output;
            }
        }
        doc
    }

    /// First plugin to return spans wins; later plugins are not consulted
    pub async fn run_short_circuit(&self, doc: &PipelineDocument) -> Option<Vec<Span>> {
        for slot in self.active_slots() {
            if let Some(Some(spans)) = self
                .guarded(slot, "can_short_circuit", slot.plugin.can_short_circuit(doc))
                .await
            {
                tracing::debug!(plugin = slot.plugin.name(), "pipeline short-circuited");
                return Some(spans);
            }
        }
        None
    }

    pub async fn run_post_detection(
        &self,
        mut spans: Vec<Span>,
        doc: &PipelineDocument,
    ) -> Vec<Span> {
        for slot in self.active_slots() {
            let input = spans.clone();
            if let Some(output) = self
                .guarded(slot, "post_detection", slot.plugin.post_detection(input, doc))
                .await
            {
                spans = output;
            }
        }
        spans
    }

    pub async fn run_pre_redaction(
        &self,
        mut spans: Vec<Span>,
        doc: &PipelineDocument,
    ) -> Vec<Span> {
        for slot in self.active_slots() {
            let input = spans.clone();
            if let Some(output) = self
                .guarded(slot, "pre_redaction", slot.plugin.pre_redaction(input, doc))
                .await
            {
                spans = output;
            }
        }
        spans
    }

    pub async fn run_post_redaction(&self, mut result: String) -> String {
        for slot in self.active_slots() {
            let input = result.clone();
            if let Some(output) = self
                .guarded(slot, "post_redaction", slot.plugin.post_redaction(input))
                .await
            {
                result = output;
            }
        }
        result
    }
}
