// Disambiguation service
// Picks one filter type when detectors claim the exact same range

use crate::types::{FilterType, Span};
use std::collections::HashMap;
use std::sync::OnceLock;

/// Weight of context keyword evidence versus detector confidence
const CONTEXT_WEIGHT: f64 = 0.7;
const CONFIDENCE_WEIGHT: f64 = 0.3;

/// Below this winning score the keyword evidence is considered noise and the
/// fallback ordering (confidence, then priority) decides.
pub const DEFAULT_SCORE_THRESHOLD: f64 = 0.15;

/// Similarity floor for a fuzzy keyword hit
const FUZZY_MATCH_THRESHOLD: f64 = 0.7;

fn keyword_vectors() -> &'static HashMap<FilterType, Vec<&'static str>> {
    static KEYWORDS: OnceLock<HashMap<FilterType, Vec<&'static str>>> = OnceLock::new();
    KEYWORDS.get_or_init(|| {
        let mut map = HashMap::new();
        map.insert(FilterType::Ssn, vec!["ssn", "social", "security", "ss#", "taxpayer"]);
        map.insert(
            FilterType::Phone,
            vec!["phone", "call", "tel", "telephone", "cell", "mobile", "contact", "dial"],
        );
        map.insert(FilterType::Fax, vec!["fax", "facsimile"]);
        map.insert(
            FilterType::Date,
            vec!["date", "dob", "born", "birth", "admitted", "discharged", "visit", "seen"],
        );
        map.insert(FilterType::Age, vec!["age", "aged", "old", "years"]);
        map.insert(FilterType::Email, vec!["email", "mail", "inbox"]);
        map.insert(
            FilterType::Address,
            vec!["address", "street", "lives", "residence", "home", "apt"],
        );
        map.insert(FilterType::Zipcode, vec!["zip", "zipcode", "postal"]);
        map.insert(FilterType::Mrn, vec!["mrn", "record", "medical", "chart"]);
        map.insert(FilterType::Npi, vec!["npi", "national", "provider"]);
        map.insert(FilterType::Dea, vec!["dea", "prescriber", "registration"]);
        map.insert(FilterType::Account, vec!["account", "acct", "billing"]);
        map.insert(FilterType::License, vec!["license", "lic", "permit"]);
        map.insert(FilterType::Passport, vec!["passport", "travel"]);
        map.insert(
            FilterType::HealthPlan,
            vec!["member", "policy", "plan", "insurance", "group", "subscriber", "payer"],
        );
        map.insert(
            FilterType::CreditCard,
            vec!["card", "visa", "mastercard", "amex", "credit", "payment"],
        );
        map.insert(FilterType::Device, vec!["device", "serial", "implant", "model", "pump"]);
        map.insert(FilterType::Vehicle, vec!["vin", "vehicle", "car", "plate", "auto"]);
        map.insert(
            FilterType::Biometric,
            vec!["fingerprint", "retinal", "iris", "biometric", "voiceprint"],
        );
        map.insert(FilterType::Url, vec!["url", "website", "http", "link", "portal"]);
        map.insert(FilterType::Ip, vec!["ip", "ipv4", "ipv6", "host", "server"]);
        map.insert(
            FilterType::Occupation,
            vec!["occupation", "works", "employed", "job", "profession"],
        );
        map.insert(FilterType::Name, vec!["name", "patient", "mr", "mrs", "ms"]);
        map.insert(
            FilterType::ProviderName,
            vec!["dr", "doctor", "physician", "provider", "attending", "surgeon", "nurse"],
        );
        map
    })
}

/// Fraction of a type's keywords found (exactly or fuzzily) in the window
fn context_match_rate(filter_type: FilterType, window: &[String]) -> f64 {
    let Some(keywords) = keyword_vectors().get(&filter_type) else {
        return 0.0;
    };
    if keywords.is_empty() {
        return 0.0;
    }
    let lowered: Vec<String> = window.iter().map(|t| t.to_lowercase()).collect();
    let hits = keywords
        .iter()
        .filter(|kw| {
            lowered.iter().any(|token| {
                token == *kw || strsim::jaro_winkler(token, kw) >= FUZZY_MATCH_THRESHOLD
            })
        })
        .count();
    hits as f64 / keywords.len() as f64
}

/// Combined evidence score for one candidate span
pub fn score_span(span: &Span) -> f64 {
    CONTEXT_WEIGHT * context_match_rate(span.filter_type, &span.window)
        + CONFIDENCE_WEIGHT * span.confidence
}

pub struct DisambiguationService {
    threshold: f64,
}

impl Default for DisambiguationService {
    fn default() -> Self {
        DisambiguationService {
            threshold: DEFAULT_SCORE_THRESHOLD,
        }
    }
}

impl DisambiguationService {
    pub fn with_threshold(threshold: f64) -> Self {
        DisambiguationService { threshold }
    }

    /// Resolve a group of spans sharing an identical `[start, end)` to one
    /// winner. The losing types are recorded on the winner's
    /// `ambiguous_with`, and the winning score on `disambiguation_score`.
    pub fn disambiguate(&self, mut group: Vec<Span>) -> Span {
        debug_assert!(!group.is_empty());
        if group.len() == 1 {
            return group.remove(0);
        }

        let scored: Vec<f64> = group.iter().map(score_span).collect();
        let mut best = 0;
        for i in 1..group.len() {
            if scored[i] > scored[best] {
                best = i;
            }
        }

        // Weak keyword evidence: fall back to confidence, then priority
        if scored[best] < self.threshold {
            best = 0;
            for i in 1..group.len() {
                let better_confidence = group[i].confidence > group[best].confidence;
                let tie = (group[i].confidence - group[best].confidence).abs() < f64::EPSILON;
                if better_confidence || (tie && group[i].priority > group[best].priority) {
                    best = i;
                }
            }
        }

        let losing_types: Vec<FilterType> = group
            .iter()
            .enumerate()
            .filter(|(i, s)| *i != best && s.filter_type != group[best].filter_type)
            .map(|(_, s)| s.filter_type)
            .collect();

        let mut winner = group.swap_remove(best);
        winner.ambiguous_with.extend(losing_types);
        winner.disambiguation_score = Some(score_span(&winner));
        winner
    }
}

/// Group spans by identical `[start, end)` and resolve each group to one
/// span. Same-type duplicates collapse to the highest-confidence copy before
/// scoring. Spans with unique positions pass through untouched.
pub fn resolve_identical_positions(
    service: &DisambiguationService,
    spans: Vec<Span>,
) -> Vec<Span> {
    let mut groups: HashMap<(usize, usize), Vec<Span>> = HashMap::new();
    for span in spans {
        groups.entry((span.start, span.end)).or_default().push(span);
    }

    let mut resolved: Vec<Span> = groups
        .into_values()
        .map(|mut group| {
            // Collapse same-type duplicates from overlapping patterns
            group.sort_by(|a, b| {
                a.filter_type.cmp(&b.filter_type).then(
                    b.confidence
                        .partial_cmp(&a.confidence)
                        .unwrap_or(std::cmp::Ordering::Equal),
                )
            });
            group.dedup_by(|a, b| a.filter_type == b.filter_type);
            service.disambiguate(group)
        })
        .collect();
    resolved.sort_by_key(|s| (s.start, s.end));
    resolved
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context_window::window;

    fn span_with_window(
        text: &str,
        value: &str,
        filter_type: FilterType,
        confidence: f64,
    ) -> Span {
        let start = text.find(value).unwrap();
        let end = start + value.len();
        let mut span = Span::new(
            value,
            start,
            end,
            filter_type,
            confidence,
            filter_type.default_priority(),
        );
        span.window = window(text, start, end, 5).full();
        span
    }

    #[test]
    fn test_phone_context_beats_ssn_shape() {
        let text = "Call 123-45-6789 today.";
        let ssn = span_with_window(text, "123-45-6789", FilterType::Ssn, 0.85);
        let phone = span_with_window(text, "123-45-6789", FilterType::Phone, 0.8);
        let service = DisambiguationService::default();
        let winner = service.disambiguate(vec![ssn, phone]);
        assert_eq!(winner.filter_type, FilterType::Phone);
        assert!(winner.ambiguous_with.contains(&FilterType::Ssn));
        assert!(winner.disambiguation_score.unwrap() > 0.0);
    }

    #[test]
    fn test_ssn_keyword_wins_at_same_shape() {
        let text = "Patient SSN 123-45-6789 on file.";
        let ssn = span_with_window(text, "123-45-6789", FilterType::Ssn, 0.85);
        let phone = span_with_window(text, "123-45-6789", FilterType::Phone, 0.8);
        let service = DisambiguationService::default();
        let winner = service.disambiguate(vec![phone, ssn]);
        assert_eq!(winner.filter_type, FilterType::Ssn);
    }

    #[test]
    fn test_fallback_to_confidence_without_context() {
        // No keywords anywhere near; threshold not reached
        let text = "xq 1234567893 zz";
        let npi = span_with_window(text, "1234567893", FilterType::Npi, 0.7);
        let account = span_with_window(text, "1234567893", FilterType::Account, 0.9);
        let service = DisambiguationService::with_threshold(0.9);
        let winner = service.disambiguate(vec![npi, account]);
        assert_eq!(winner.filter_type, FilterType::Account);
    }

    #[test]
    fn test_same_type_duplicates_collapse() {
        let text = "SSN 123-45-6789";
        let a = span_with_window(text, "123-45-6789", FilterType::Ssn, 0.85);
        let b = span_with_window(text, "123-45-6789", FilterType::Ssn, 0.95);
        let service = DisambiguationService::default();
        let resolved = resolve_identical_positions(&service, vec![a, b]);
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].confidence, 0.95);
        assert!(resolved[0].ambiguous_with.is_empty());
    }

    #[test]
    fn test_unique_positions_pass_through() {
        let text = "mail a@b.com ssn 123-45-6789";
        let email = span_with_window(text, "a@b.com", FilterType::Email, 0.95);
        let ssn = span_with_window(text, "123-45-6789", FilterType::Ssn, 0.85);
        let service = DisambiguationService::default();
        let resolved = resolve_identical_positions(&service, vec![ssn, email]);
        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved[0].filter_type, FilterType::Email);
        assert_eq!(resolved[1].filter_type, FilterType::Ssn);
    }
}
