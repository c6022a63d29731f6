// Span model and identifier taxonomy
// Shared types flowing through the detection and redaction pipeline

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Identifier classes the engine can detect and redact
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FilterType {
    Name,
    ProviderName,
    Ssn,
    Date,
    Age,
    Phone,
    Fax,
    Email,
    Address,
    Zipcode,
    Mrn,
    Npi,
    Dea,
    Account,
    License,
    Passport,
    HealthPlan,
    CreditCard,
    Device,
    Vehicle,
    Biometric,
    Url,
    Ip,
    Occupation,
}

impl FilterType {
    /// All filter types, in token-prefix order
    pub const ALL: [FilterType; 24] = [
        FilterType::Name,
        FilterType::ProviderName,
        FilterType::Ssn,
        FilterType::Date,
        FilterType::Age,
        FilterType::Phone,
        FilterType::Fax,
        FilterType::Email,
        FilterType::Address,
        FilterType::Zipcode,
        FilterType::Mrn,
        FilterType::Npi,
        FilterType::Dea,
        FilterType::Account,
        FilterType::License,
        FilterType::Passport,
        FilterType::HealthPlan,
        FilterType::CreditCard,
        FilterType::Device,
        FilterType::Vehicle,
        FilterType::Biometric,
        FilterType::Url,
        FilterType::Ip,
        FilterType::Occupation,
    ];

    /// Uppercase prefix used in replacement tokens, e.g. `{{SSN_1234_1}}`
    pub fn prefix(&self) -> &'static str {
        match self {
            FilterType::Name => "NAME",
            FilterType::ProviderName => "PROVIDER_NAME",
            FilterType::Ssn => "SSN",
            FilterType::Date => "DATE",
            FilterType::Age => "AGE",
            FilterType::Phone => "PHONE",
            FilterType::Fax => "FAX",
            FilterType::Email => "EMAIL",
            FilterType::Address => "ADDRESS",
            FilterType::Zipcode => "ZIPCODE",
            FilterType::Mrn => "MRN",
            FilterType::Npi => "NPI",
            FilterType::Dea => "DEA",
            FilterType::Account => "ACCOUNT",
            FilterType::License => "LICENSE",
            FilterType::Passport => "PASSPORT",
            FilterType::HealthPlan => "HEALTH_PLAN",
            FilterType::CreditCard => "CREDIT_CARD",
            FilterType::Device => "DEVICE",
            FilterType::Vehicle => "VEHICLE",
            FilterType::Biometric => "BIOMETRIC",
            FilterType::Url => "URL",
            FilterType::Ip => "IP",
            FilterType::Occupation => "OCCUPATION",
        }
    }

    /// Parse the uppercase wire form ("PROVIDER_NAME", "SSN", ...)
    pub fn from_prefix(s: &str) -> Option<FilterType> {
        FilterType::ALL.iter().copied().find(|t| t.prefix() == s)
    }

    /// Minimum surviving length for the MinimumLength post-filter
    pub fn min_length(&self) -> usize {
        match self {
            FilterType::Name => 2,
            FilterType::Email => 5,
            FilterType::Ssn => 9,
            FilterType::Phone => 7,
            FilterType::Address => 5,
            FilterType::Zipcode => 5,
            FilterType::Date => 6,
            FilterType::Mrn => 3,
            FilterType::CreditCard => 13,
            _ => 1,
        }
    }

    /// Default overlap priority; higher wins when spans collide
    pub fn default_priority(&self) -> i32 {
        match self {
            FilterType::Ssn => 10,
            FilterType::CreditCard => 10,
            FilterType::Email => 9,
            FilterType::Npi => 9,
            FilterType::Dea => 9,
            FilterType::Phone => 8,
            FilterType::Fax => 8,
            FilterType::Mrn => 8,
            FilterType::Date => 7,
            FilterType::Url => 7,
            FilterType::Ip => 7,
            FilterType::Passport => 7,
            FilterType::Address => 6,
            FilterType::ProviderName => 6,
            FilterType::Account => 6,
            FilterType::License => 6,
            FilterType::HealthPlan => 6,
            FilterType::Vehicle => 6,
            FilterType::Name => 5,
            FilterType::Age => 5,
            FilterType::Device => 5,
            FilterType::Biometric => 5,
            FilterType::Zipcode => 4,
            FilterType::Occupation => 3,
        }
    }
}

impl fmt::Display for FilterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// Number of context bytes captured on each side of a span
pub const CONTEXT_RADIUS: usize = 50;

/// A typed, positioned assertion that `[start, end)` of the input is an identifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Span {
    /// Matched substring; kept in sync with `start`/`end` through trimming
    pub text: String,
    /// Text as originally matched, before any post-filter trimming
    pub original_value: String,
    /// Byte offset of the first matched byte
    pub start: usize,
    /// Byte offset one past the last matched byte
    pub end: usize,
    pub filter_type: FilterType,
    /// Detector confidence in [0, 1]
    pub confidence: f64,
    /// Overlap priority; higher wins
    pub priority: i32,
    /// Surrounding raw text, up to `CONTEXT_RADIUS` bytes each side
    pub context: Option<String>,
    /// Whitespace-delimited tokens around the span, for disambiguation
    pub window: Vec<String>,
    /// Assigned placeholder once known
    pub replacement: Option<String>,
    pub applied: bool,
    pub ignored: bool,
    /// Alternative types seen at the identical position
    pub ambiguous_with: BTreeSet<FilterType>,
    pub disambiguation_score: Option<f64>,
    /// Id of the pattern that produced the match, when pattern-based
    pub pattern: Option<String>,
    pub salt: Option<String>,
}

impl Span {
    pub fn new(
        text: impl Into<String>,
        start: usize,
        end: usize,
        filter_type: FilterType,
        confidence: f64,
        priority: i32,
    ) -> Self {
        let text = text.into();
        Span {
            original_value: text.clone(),
            text,
            start,
            end,
            filter_type,
            confidence,
            priority,
            context: None,
            window: Vec::new(),
            replacement: None,
            applied: false,
            ignored: false,
            ambiguous_with: BTreeSet::new(),
            disambiguation_score: None,
            pattern: None,
            salt: None,
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// True when the byte ranges share at least one byte
    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && self.end > other.start
    }

    /// True when both spans claim exactly the same byte range
    pub fn same_range(&self, other: &Span) -> bool {
        self.start == other.start && self.end == other.end
    }

    /// Validate offsets against the input: in bounds, on UTF-8 boundaries,
    /// and `text` equal to the slice they describe.
    pub fn is_consistent_with(&self, input: &str) -> bool {
        self.start < self.end
            && self.end <= input.len()
            && input.is_char_boundary(self.start)
            && input.is_char_boundary(self.end)
            && &input[self.start..self.end] == self.text
    }

    /// Copy up to `CONTEXT_RADIUS` bytes before and after the span out of the
    /// input, clamped to character boundaries.
    pub fn capture_context(&mut self, input: &str) {
        let ctx_start = floor_char_boundary(input, self.start.saturating_sub(CONTEXT_RADIUS));
        let ctx_end = ceil_char_boundary(input, (self.end + CONTEXT_RADIUS).min(input.len()));
        self.context = Some(input[ctx_start..ctx_end].to_string());
    }
}

/// Largest char boundary <= idx
pub fn floor_char_boundary(s: &str, mut idx: usize) -> usize {
    if idx >= s.len() {
        return s.len();
    }
    while idx > 0 && !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

/// Smallest char boundary >= idx
pub fn ceil_char_boundary(s: &str, mut idx: usize) -> usize {
    if idx >= s.len() {
        return s.len();
    }
    while idx < s.len() && !s.is_char_boundary(idx) {
        idx += 1;
    }
    idx
}

/// Sort spans into the pipeline's canonical order: start ascending, then
/// priority descending, confidence descending, longer range first.
pub fn sort_canonical(spans: &mut [Span]) {
    spans.sort_by(|a, b| {
        a.start
            .cmp(&b.start)
            .then(b.priority.cmp(&a.priority))
            .then(
                b.confidence
                    .partial_cmp(&a.confidence)
                    .unwrap_or(std::cmp::Ordering::Equal),
            )
            .then(b.end.cmp(&a.end))
    });
}
