// Detector interface and registry
// Uniform contract for the independent scanners that propose spans

pub mod custom_terms;
pub mod name_detector;
pub mod pattern_detector;

pub use custom_terms::CustomTermDetector;
pub use name_detector::NameDetector;
pub use pattern_detector::PatternDetector;

use crate::config::RedactionConfig;
use crate::errors::DetectorError;
use crate::patterns::PatternScanner;
use crate::policy::{IdentifierConfig, Policy};
use crate::types::{FilterType, Span};
use std::sync::{Arc, OnceLock, RwLock};

/// Read-only request state handed to each detector
pub struct DetectionContext<'a> {
    pub session_id: &'a str,
    pub config: &'a RedactionConfig,
}

/// A single identifier scanner.
///
/// Contract: `detect` must not mutate the text, must return spans whose
/// offsets index into the given text, and must be safe to call in parallel
/// with other detectors over the same input.
#[async_trait::async_trait]
pub trait Detector: Send + Sync {
    /// Stable name for logs and per-detector statistics
    fn name(&self) -> &str;

    fn filter_type(&self) -> FilterType;

    fn priority(&self) -> i32 {
        self.filter_type().default_priority()
    }

    async fn detect(
        &self,
        text: &str,
        config: &IdentifierConfig,
        ctx: &DetectionContext<'_>,
    ) -> Result<Vec<Span>, DetectorError>;
}

/// The set of detectors known to the process. Populated with the built-ins at
/// init; plugin filters register dynamically.
pub struct DetectorRegistry {
    detectors: Vec<Arc<dyn Detector>>,
}

impl Default for DetectorRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl DetectorRegistry {
    pub fn empty() -> Self {
        DetectorRegistry {
            detectors: Vec::new(),
        }
    }

    /// One pattern detector per filter type over a shared compiled catalog,
    /// plus the dictionary-backed name detector.
    pub fn with_builtins() -> Self {
        let scanner = Arc::new(PatternScanner::new());
        let mut detectors: Vec<Arc<dyn Detector>> = FilterType::ALL
            .iter()
            .map(|t| Arc::new(PatternDetector::new(*t, Arc::clone(&scanner))) as Arc<dyn Detector>)
            .collect();
        detectors.push(Arc::new(NameDetector::new()));
        DetectorRegistry { detectors }
    }

    pub fn register(&mut self, detector: Arc<dyn Detector>) {
        self.detectors.push(detector);
    }

    pub fn len(&self) -> usize {
        self.detectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detectors.is_empty()
    }

    /// Detectors whose filter type the policy enables
    pub fn detectors_enabled(&self, policy: &Policy) -> Vec<Arc<dyn Detector>> {
        self.detectors
            .iter()
            .filter(|d| policy.is_enabled(d.filter_type()))
            .cloned()
            .collect()
    }
}

/// Process-wide default registry. Prefer constructing a registry and passing
/// it to the orchestrator; this exists for ergonomic callers.
pub fn global_registry() -> &'static RwLock<DetectorRegistry> {
    static REGISTRY: OnceLock<RwLock<DetectorRegistry>> = OnceLock::new();
    REGISTRY.get_or_init(|| RwLock::new(DetectorRegistry::with_builtins()))
}
