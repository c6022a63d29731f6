// Caller-supplied term detector
// Whole-word, case-insensitive matches on a caller denylist

use super::{DetectionContext, Detector};
use crate::errors::DetectorError;
use crate::policy::IdentifierConfig;
use crate::types::{FilterType, Span};
use regex::Regex;

pub struct CustomTermDetector {
    regexes: Vec<Regex>,
}

impl CustomTermDetector {
    pub fn new(terms: &[String]) -> Self {
        let regexes = terms
            .iter()
            .filter(|t| !t.trim().is_empty())
            .filter_map(|t| {
                let escaped = regex::escape(t.trim());
                Regex::new(&format!(r"(?i)\b{}\b", escaped)).ok()
            })
            .collect();
        CustomTermDetector { regexes }
    }
}

#[async_trait::async_trait]
impl Detector for CustomTermDetector {
    fn name(&self) -> &str {
        "custom-terms"
    }

    fn filter_type(&self) -> FilterType {
        FilterType::Name
    }

    // Explicit caller terms outrank heuristic name matches
    fn priority(&self) -> i32 {
        9
    }

    async fn detect(
        &self,
        text: &str,
        _config: &IdentifierConfig,
        _ctx: &DetectionContext<'_>,
    ) -> Result<Vec<Span>, DetectorError> {
        let mut spans = Vec::new();
        for regex in &self.regexes {
            for mat in regex.find_iter(text) {
                let mut span = Span::new(
                    mat.as_str(),
                    mat.start(),
                    mat.end(),
                    FilterType::Name,
                    0.98,
                    self.priority(),
                );
                span.pattern = Some("custom-term".to_string());
                spans.push(span);
            }
        }
        Ok(spans)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RedactionConfig;

    #[tokio::test]
    async fn test_whole_word_case_insensitive() {
        let config = RedactionConfig::default();
        let ctx = DetectionContext {
            session_id: "1234",
            config: &config,
        };
        let detector = CustomTermDetector::new(&[
            "Acme Clinic".to_string(),
            "".to_string(),
        ]);
        let spans = detector
            .detect(
                "Transferred from ACME CLINIC, not acmeclinics.",
                &IdentifierConfig::default(),
                &ctx,
            )
            .await
            .unwrap();
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].text, "ACME CLINIC");
    }
}
