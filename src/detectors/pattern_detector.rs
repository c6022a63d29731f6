// Pattern-backed detector
// One registry entry per filter type over the shared compiled catalog

use super::{DetectionContext, Detector};
use crate::errors::DetectorError;
use crate::patterns::PatternScanner;
use crate::policy::IdentifierConfig;
use crate::types::{FilterType, Span};
use std::sync::Arc;

pub struct PatternDetector {
    filter_type: FilterType,
    scanner: Arc<PatternScanner>,
    name: String,
}

impl PatternDetector {
    pub fn new(filter_type: FilterType, scanner: Arc<PatternScanner>) -> Self {
        PatternDetector {
            name: format!("pattern:{}", filter_type.prefix().to_lowercase()),
            filter_type,
            scanner,
        }
    }
}

#[async_trait::async_trait]
impl Detector for PatternDetector {
    fn name(&self) -> &str {
        &self.name
    }

    fn filter_type(&self) -> FilterType {
        self.filter_type
    }

    async fn detect(
        &self,
        text: &str,
        config: &IdentifierConfig,
        _ctx: &DetectionContext<'_>,
    ) -> Result<Vec<Span>, DetectorError> {
        let mut spans = self.scanner.scan_for_types(text, &[self.filter_type]);
        if let Some(floor) = config.min_confidence {
            spans.retain(|s| s.confidence >= floor);
        }
        Ok(spans)
    }
}
