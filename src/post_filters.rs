// Post-filter pipeline
// Ordered per-span cleanup after detection: trim or drop, short-circuit on drop

use crate::types::{FilterType, Span};
use regex::Regex;
use std::collections::{HashMap, HashSet};

/// Result of one filter over one span
pub enum FilterOutcome {
    Keep,
    Drop,
}

/// A single cleanup step. Filters are pure per-span: they may trim the span
/// (adjusting text and offsets together) or drop it, nothing else.
pub trait PostFilter: Send + Sync {
    fn name(&self) -> &'static str;
    fn apply(&self, span: &mut Span, input: &str) -> FilterOutcome;
}

/// Strip leading/trailing whitespace, adjusting offsets to match
pub struct TrailingWhitespace;

impl PostFilter for TrailingWhitespace {
    fn name(&self) -> &'static str {
        "trailing-whitespace"
    }

    fn apply(&self, span: &mut Span, _input: &str) -> FilterOutcome {
        let trimmed_start = span.text.len() - span.text.trim_start().len();
        let trimmed = span.text.trim();
        span.start += trimmed_start;
        span.end = span.start + trimmed.len();
        span.text = trimmed.to_string();
        FilterOutcome::Keep
    }
}

/// Strip trailing sentence punctuation. Addresses keep their dots because of
/// forms like "St." and "Blvd."
pub struct TrailingPunctuation;

impl PostFilter for TrailingPunctuation {
    fn name(&self) -> &'static str {
        "trailing-punctuation"
    }

    fn apply(&self, span: &mut Span, _input: &str) -> FilterOutcome {
        if span.filter_type == FilterType::Address {
            return FilterOutcome::Keep;
        }
        let trimmed = span.text.trim_end_matches(['.', ',', ';', ':', '!', '?']);
        span.end = span.start + trimmed.len();
        span.text = trimmed.to_string();
        FilterOutcome::Keep
    }
}

/// Drop candidates that already look like tokens, or sit inside one
pub struct AlreadyTokenized;

impl PostFilter for AlreadyTokenized {
    fn name(&self) -> &'static str {
        "already-tokenized"
    }

    fn apply(&self, span: &mut Span, input: &str) -> FilterOutcome {
        if span.text.contains("{{") || span.text.contains("}}") {
            return FilterOutcome::Drop;
        }
        // Candidate nested directly between braces, e.g. the inside of a
        // previously inserted {{NAME_1234_1}}
        let enclosed = input[..span.start].ends_with('{') && input[span.end..].starts_with('}');
        if enclosed {
            return FilterOutcome::Drop;
        }
        FilterOutcome::Keep
    }
}

/// Drop spans shorter than the per-type minimum
pub struct MinimumLength;

impl PostFilter for MinimumLength {
    fn name(&self) -> &'static str {
        "minimum-length"
    }

    fn apply(&self, span: &mut Span, _input: &str) -> FilterOutcome {
        if span.text.len() < span.filter_type.min_length() {
            FilterOutcome::Drop
        } else {
            FilterOutcome::Keep
        }
    }
}

/// Drop spans whose normalized text sits on a denylist
pub struct IgnoredTerms {
    terms: HashSet<String>,
}

impl IgnoredTerms {
    pub fn new<I: IntoIterator<Item = String>>(terms: I) -> Self {
        IgnoredTerms {
            terms: terms.into_iter().map(|t| normalize_term(&t)).collect(),
        }
    }

    /// Terms that are never identifiers in clinical text
    pub fn clinical_defaults() -> Self {
        IgnoredTerms::new(
            [
                "unknown", "n/a", "none", "patient", "hospital", "clinic", "pending",
            ]
            .iter()
            .map(|s| s.to_string()),
        )
    }
}

fn normalize_term(term: &str) -> String {
    term.trim().to_lowercase()
}

impl PostFilter for IgnoredTerms {
    fn name(&self) -> &'static str {
        "ignored-terms"
    }

    fn apply(&self, span: &mut Span, _input: &str) -> FilterOutcome {
        if self.terms.contains(&normalize_term(&span.text)) {
            FilterOutcome::Drop
        } else {
            FilterOutcome::Keep
        }
    }
}

/// Drop spans matching any denylist regex
pub struct IgnoredPatterns {
    patterns: Vec<Regex>,
}

impl IgnoredPatterns {
    pub fn new(patterns: Vec<Regex>) -> Self {
        IgnoredPatterns { patterns }
    }
}

impl PostFilter for IgnoredPatterns {
    fn name(&self) -> &'static str {
        "ignored-patterns"
    }

    fn apply(&self, span: &mut Span, _input: &str) -> FilterOutcome {
        if self.patterns.iter().any(|p| p.is_match(&span.text)) {
            FilterOutcome::Drop
        } else {
            FilterOutcome::Keep
        }
    }
}

/// Drop spans below the confidence floor
pub struct ConfidenceThreshold {
    pub threshold: f64,
}

impl PostFilter for ConfidenceThreshold {
    fn name(&self) -> &'static str {
        "confidence-threshold"
    }

    fn apply(&self, span: &mut Span, _input: &str) -> FilterOutcome {
        if span.confidence < self.threshold {
            FilterOutcome::Drop
        } else {
            FilterOutcome::Keep
        }
    }
}

/// Outcome of running the pipeline over a span set
#[derive(Debug, Default)]
pub struct PostFilterReport {
    pub kept: Vec<Span>,
    pub dropped_by: HashMap<&'static str, usize>,
}

impl PostFilterReport {
    pub fn dropped(&self) -> usize {
        self.dropped_by.values().sum()
    }
}

pub struct PostFilterPipeline {
    filters: Vec<Box<dyn PostFilter>>,
}

impl PostFilterPipeline {
    pub fn new(filters: Vec<Box<dyn PostFilter>>) -> Self {
        PostFilterPipeline { filters }
    }

    /// The built-in filter order: trims first, then the drop filters
    pub fn standard(
        confidence_threshold: f64,
        ignored_terms: IgnoredTerms,
        ignored_patterns: IgnoredPatterns,
    ) -> Self {
        PostFilterPipeline::new(vec![
            Box::new(TrailingWhitespace),
            Box::new(TrailingPunctuation),
            Box::new(AlreadyTokenized),
            Box::new(MinimumLength),
            Box::new(ignored_terms),
            Box::new(ignored_patterns),
            Box::new(ConfidenceThreshold {
                threshold: confidence_threshold,
            }),
        ])
    }

    pub fn with_defaults(confidence_threshold: f64) -> Self {
        PostFilterPipeline::standard(
            confidence_threshold,
            IgnoredTerms::clinical_defaults(),
            IgnoredPatterns::new(Vec::new()),
        )
    }

    /// Run every filter over every span; a drop short-circuits that span's
    /// remaining filters.
    pub fn run(&self, spans: Vec<Span>, input: &str) -> PostFilterReport {
        let mut report = PostFilterReport::default();
        'spans: for mut span in spans {
            for filter in &self.filters {
                if let FilterOutcome::Drop = filter.apply(&mut span, input) {
                    *report.dropped_by.entry(filter.name()).or_insert(0) += 1;
                    continue 'spans;
                }
            }
            report.kept.push(span);
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span_in(input: &str, value: &str, filter_type: FilterType, confidence: f64) -> Span {
        let start = input.find(value).unwrap();
        Span::new(
            value,
            start,
            start + value.len(),
            filter_type,
            confidence,
            filter_type.default_priority(),
        )
    }

    #[test]
    fn test_whitespace_trim_adjusts_offsets() {
        let input = "ssn  123-45-6789  end";
        let mut span = span_in(input, " 123-45-6789 ", FilterType::Ssn, 0.9);
        TrailingWhitespace.apply(&mut span, input);
        assert_eq!(span.text, "123-45-6789");
        assert!(span.is_consistent_with(input));
        assert_eq!(span.original_value, " 123-45-6789 ");
    }

    #[test]
    fn test_punctuation_trim_skips_addresses() {
        let input = "At 12 Oak St. early";
        let mut addr = span_in(input, "12 Oak St.", FilterType::Address, 0.8);
        TrailingPunctuation.apply(&mut addr, input);
        assert_eq!(addr.text, "12 Oak St.");

        let input2 = "Smith.";
        let mut name = span_in(input2, "Smith.", FilterType::Name, 0.7);
        TrailingPunctuation.apply(&mut name, input2);
        assert_eq!(name.text, "Smith");
        assert!(name.is_consistent_with(input2));
    }

    #[test]
    fn test_already_tokenized_drops() {
        let input = "see {{NAME_123_1}} here";
        let mut with_braces = span_in(input, "{{NAME_123_1}}", FilterType::Name, 0.9);
        assert!(matches!(
            AlreadyTokenized.apply(&mut with_braces, input),
            FilterOutcome::Drop
        ));

        let mut inside = span_in(input, "NAME_123_1", FilterType::Mrn, 0.9);
        assert!(matches!(
            AlreadyTokenized.apply(&mut inside, input),
            FilterOutcome::Drop
        ));
    }

    #[test]
    fn test_minimum_length_per_type() {
        let input = "x 12 1234567 123456789";
        let mut short_phone = span_in(input, "1234567", FilterType::Phone, 0.8);
        assert!(matches!(
            MinimumLength.apply(&mut short_phone, input),
            FilterOutcome::Keep
        ));
        let mut short_ssn = span_in(input, "1234567", FilterType::Ssn, 0.8);
        assert!(matches!(
            MinimumLength.apply(&mut short_ssn, input),
            FilterOutcome::Drop
        ));
    }

    #[test]
    fn test_empty_after_trim_is_dropped() {
        let input = "word ... word";
        let pipeline = PostFilterPipeline::with_defaults(0.0);
        let span = span_in(input, "...", FilterType::Name, 0.9);
        let report = pipeline.run(vec![span], input);
        assert!(report.kept.is_empty());
        assert_eq!(report.dropped_by.get("minimum-length"), Some(&1));
    }

    #[test]
    fn test_denylists() {
        let input = "Patient unknown called 555-123-4567 ref AB-1234";
        let pipeline = PostFilterPipeline::standard(
            0.0,
            IgnoredTerms::clinical_defaults(),
            IgnoredPatterns::new(vec![Regex::new(r"^AB-\d+$").unwrap()]),
        );
        let spans = vec![
            span_in(input, "unknown", FilterType::Name, 0.9),
            span_in(input, "555-123-4567", FilterType::Phone, 0.8),
            span_in(input, "AB-1234", FilterType::Account, 0.9),
        ];
        let report = pipeline.run(spans, input);
        assert_eq!(report.kept.len(), 1);
        assert_eq!(report.kept[0].filter_type, FilterType::Phone);
        assert_eq!(report.dropped(), 2);
    }

    #[test]
    fn test_confidence_threshold() {
        let input = "zip 62704";
        let pipeline = PostFilterPipeline::with_defaults(0.6);
        let spans = vec![span_in(input, "62704", FilterType::Zipcode, 0.5)];
        let report = pipeline.run(spans, input);
        assert!(report.kept.is_empty());
        assert_eq!(report.dropped_by.get("confidence-threshold"), Some(&1));
    }
}
