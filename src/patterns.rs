// Pattern scanner
// Regex catalog producing candidate spans for every identifier class

use crate::types::{FilterType, Span};
use regex::Regex;

/// A named detection pattern with an optional value validator
pub struct PatternDef {
    pub id: &'static str,
    pub filter_type: FilterType,
    pub regex: Regex,
    pub confidence: f64,
    /// Checksum or range validation run on each candidate value
    pub validator: Option<fn(&str) -> bool>,
}

fn pattern(
    id: &'static str,
    filter_type: FilterType,
    regex: &str,
    confidence: f64,
    validator: Option<fn(&str) -> bool>,
) -> PatternDef {
    PatternDef {
        id,
        filter_type,
        // Patterns are compiled once at scanner construction
        regex: Regex::new(regex).unwrap(),
        confidence,
        validator,
    }
}

/// Scanner holding the full pattern catalog. Construct once and share; the
/// scan methods take `&self` and are safe to call concurrently.
pub struct PatternScanner {
    patterns: Vec<PatternDef>,
}

impl Default for PatternScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl PatternScanner {
    pub fn new() -> Self {
        let patterns = vec![
            // --- SSN ---
            pattern(
                "ssn-labeled",
                FilterType::Ssn,
                r"(?i)\b(?:ssn|social\s+security(?:\s+number)?)[:#\s]+(\d{3}[- ]?\d{2}[- ]?\d{4})\b",
                0.95,
                Some(validate_ssn),
            ),
            pattern(
                "ssn-dashed",
                FilterType::Ssn,
                r"\b\d{3}-\d{2}-\d{4}\b",
                0.85,
                Some(validate_ssn),
            ),
            pattern(
                "ssn-spaced",
                FilterType::Ssn,
                r"\b\d{3} \d{2} \d{4}\b",
                0.7,
                Some(validate_ssn),
            ),
            // --- DATE ---
            pattern(
                "date-iso",
                FilterType::Date,
                r"\b\d{4}-\d{2}-\d{2}\b",
                0.9,
                None,
            ),
            pattern(
                "date-slash",
                FilterType::Date,
                r"\b\d{1,2}/\d{1,2}/\d{2,4}\b",
                0.85,
                None,
            ),
            pattern(
                "date-month-name",
                FilterType::Date,
                r"(?i)\b(?:jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|jun(?:e)?|jul(?:y)?|aug(?:ust)?|sep(?:t(?:ember)?)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?)\.?\s+\d{1,2}(?:st|nd|rd|th)?,?\s+\d{4}\b",
                0.9,
                None,
            ),
            pattern(
                "date-day-month",
                FilterType::Date,
                r"(?i)\b\d{1,2}\s+(?:jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|jun(?:e)?|jul(?:y)?|aug(?:ust)?|sep(?:t(?:ember)?)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?)\.?,?\s+\d{4}\b",
                0.85,
                None,
            ),
            // --- AGE ---
            pattern(
                "age-hyphenated",
                FilterType::Age,
                r"(?i)\b\d{1,3}[- ](?:year|yr)s?[- ]old\b",
                0.9,
                Some(validate_age),
            ),
            pattern(
                "age-labeled",
                FilterType::Age,
                r"(?i)\bage[:\s]+(\d{1,3})\b",
                0.85,
                Some(validate_age),
            ),
            pattern(
                "age-aged",
                FilterType::Age,
                r"(?i)\baged\s+(\d{1,3})\b",
                0.8,
                Some(validate_age),
            ),
            // --- PHONE ---
            pattern(
                "phone-labeled",
                FilterType::Phone,
                r"(?i)\b(?:phone|tel|cell|mobile)[:.]?\s*(\+?[0-9()][0-9()\-. ]{5,18}\d)",
                0.9,
                None,
            ),
            pattern(
                "phone-us",
                FilterType::Phone,
                // No leading \b: a boundary cannot sit before "(" in "(555) ..."
                r"(?:\+?1[-. ])?\(?\d{3}\)?[-. ]\d{2,4}[-. ]\d{4}\b",
                0.8,
                Some(validate_phone),
            ),
            pattern(
                "phone-intl",
                FilterType::Phone,
                r"\+\d{1,3}[-. ]?\d{2,4}[-. ]?\d{3,4}[-. ]?\d{2,4}\b",
                0.75,
                Some(validate_phone),
            ),
            // --- FAX ---
            pattern(
                "fax-labeled",
                FilterType::Fax,
                r"(?i)\bfax[:.]?\s*(\+?[0-9()][0-9()\-. ]{5,18}\d)",
                0.9,
                None,
            ),
            // --- EMAIL ---
            pattern(
                "email",
                FilterType::Email,
                r"(?i)[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}",
                0.95,
                None,
            ),
            // --- URL ---
            pattern(
                "url-http",
                FilterType::Url,
                r"https?://[^\s<>\[\]{}|\\^`\x00-\x1f]+",
                0.9,
                None,
            ),
            pattern(
                "url-www",
                FilterType::Url,
                r"(?i)\bwww\.[^\s<>\[\]{}|\\^`\x00-\x1f]+",
                0.8,
                None,
            ),
            // --- IP ---
            pattern(
                "ipv4",
                FilterType::Ip,
                r"\b(?:\d{1,3}\.){3}\d{1,3}\b",
                0.85,
                Some(validate_ipv4),
            ),
            pattern(
                "ipv6",
                FilterType::Ip,
                r"\b(?:[0-9a-fA-F]{1,4}:){3,7}[0-9a-fA-F]{1,4}\b",
                0.7,
                None,
            ),
            // --- ADDRESS ---
            pattern(
                "street-address",
                FilterType::Address,
                r"(?i)\d{1,5}\s+[\w\s]+(?:street|st|road|rd|avenue|ave|drive|dr|lane|ln|way|court|ct|circle|cir|boulevard|blvd|place|pl)\b(?:[,\s]+[\w\s]+)?(?:[,\s]+[A-Z]{2}\s+\d{5}(?:-\d{4})?)?",
                0.8,
                None,
            ),
            pattern(
                "po-box",
                FilterType::Address,
                r"(?i)\bP\.?O\.?\s*Box\s+\d+\b",
                0.85,
                None,
            ),
            // --- ZIPCODE ---
            pattern(
                "zip",
                FilterType::Zipcode,
                r"\b\d{5}(?:-\d{4})?\b",
                0.5,
                None,
            ),
            // --- MRN ---
            pattern(
                "mrn-labeled",
                FilterType::Mrn,
                r"(?i)\b(?:mrn|medical\s+record(?:\s+(?:number|no\.?|#))?)[:#\s]+([A-Za-z0-9][A-Za-z0-9-]{2,14})\b",
                0.95,
                None,
            ),
            // --- NPI ---
            pattern(
                "npi",
                FilterType::Npi,
                r"\b\d{10}\b",
                0.7,
                Some(validate_npi),
            ),
            // --- DEA ---
            pattern(
                "dea",
                FilterType::Dea,
                r"\b[A-Za-z]{2}\d{7}\b",
                0.85,
                Some(validate_dea),
            ),
            // --- ACCOUNT ---
            pattern(
                "account-labeled",
                FilterType::Account,
                r"(?i)\b(?:account|acct)\.?\s*(?:number|no\.?|#)?\s*[:#]?\s*([A-Za-z0-9][A-Za-z0-9-]{3,19})\b",
                0.9,
                None,
            ),
            // --- LICENSE ---
            pattern(
                "license-labeled",
                FilterType::License,
                r"(?i)\b(?:license|lic)\.?\s*(?:number|no\.?|#)?\s*[:#]?\s*([A-Za-z0-9][A-Za-z0-9-]{3,14})\b",
                0.85,
                None,
            ),
            // --- PASSPORT ---
            pattern(
                "passport-labeled",
                FilterType::Passport,
                r"(?i)\bpassport\s*(?:number|no\.?|#)?\s*[:#]?\s*([A-Za-z]\d{6,8}|\d{6,9})\b",
                0.9,
                None,
            ),
            // --- HEALTH_PLAN ---
            pattern(
                "health-plan-labeled",
                FilterType::HealthPlan,
                r"(?i)\b(?:member|policy|subscriber|group|plan)\s*(?:id|number|no\.?|#)\s*[:#]?\s*([A-Za-z0-9][A-Za-z0-9-]{4,19})\b",
                0.85,
                None,
            ),
            // --- CREDIT_CARD ---
            pattern(
                "credit-card",
                FilterType::CreditCard,
                r"\b(?:\d{4}[- ]?){3}\d{1,4}\b",
                0.9,
                Some(validate_credit_card),
            ),
            // --- DEVICE ---
            pattern(
                "device-udi",
                FilterType::Device,
                r"\(01\)\d{14}",
                0.9,
                None,
            ),
            pattern(
                "device-serial",
                FilterType::Device,
                r"(?i)\b(?:serial|device)\s*(?:id|number|no\.?|#)\s*[:#]?\s*([A-Za-z0-9][A-Za-z0-9-]{3,19})\b",
                0.8,
                None,
            ),
            // --- VEHICLE ---
            pattern(
                "vin",
                FilterType::Vehicle,
                r"\b[A-HJ-NPR-Z0-9]{17}\b",
                0.8,
                Some(validate_vin),
            ),
            pattern(
                "plate-labeled",
                FilterType::Vehicle,
                r"(?i)\b(?:license\s+plate|plate)\s*(?:number|no\.?|#)?\s*[:#]?\s*([A-Za-z0-9-]{2,8})\b",
                0.7,
                None,
            ),
            // --- BIOMETRIC ---
            pattern(
                "biometric-labeled",
                FilterType::Biometric,
                r"(?i)\b(?:fingerprint|retinal|iris|voiceprint|biometric)\s*(?:id|scan|record)?\s*[:#]?\s*([A-Za-z0-9][A-Za-z0-9-]{3,19})\b",
                0.75,
                None,
            ),
            // --- NAME (context-anchored; dictionary matching lives in the name detector) ---
            pattern(
                "name-intro",
                FilterType::Name,
                r"(?:[Mm]y name is|[Nn]ame is|I am|I'm|[Cc]all me)\s+([A-Z][a-z]+(?:\s+[A-Z][a-z]+)?)",
                0.9,
                None,
            ),
            pattern(
                "name-titled",
                FilterType::Name,
                r"\b(?:Patient|Pt|Mr|Mrs|Ms|Miss)\.?:?\s+([A-Z][a-z]+(?:\s+[A-Z][a-z]+)?)",
                0.85,
                None,
            ),
            pattern(
                "name-labeled",
                FilterType::Name,
                r"\b(?:Patient\s+[Nn]ame|PATIENT\s+NAME|Name|NAME)\s*:\s*([A-Z][A-Za-z'-]+(?:\s+[A-Z][A-Za-z'-]+)*)",
                0.9,
                None,
            ),
            // --- PROVIDER_NAME ---
            pattern(
                "provider-titled",
                FilterType::ProviderName,
                r"\b(?:Dr|Doctor|Prof)\.?\s+([A-Z][a-z]+(?:\s+[A-Z][a-z]+)?)",
                0.85,
                None,
            ),
            pattern(
                "provider-labeled",
                FilterType::ProviderName,
                r"\b(?:[Aa]ttending|[Pp]rovider|[Pp]hysician|[Ss]urgeon|[Rr]eferred by|[Ss]een by)\s*:?\s+(?:Dr\.?\s+)?([A-Z][a-z]+(?:\s+[A-Z][a-z]+)?)",
                0.8,
                None,
            ),
            // --- OCCUPATION ---
            pattern(
                "occupation-labeled",
                FilterType::Occupation,
                r"(?i)\b(?:works as|employed as|occupation\s*:)\s*(?:an?\s+)?([A-Za-z]+(?: [A-Za-z]+){0,2})",
                0.6,
                None,
            ),
        ];

        PatternScanner { patterns }
    }

    /// Apply every pattern to the text. All matches are reported, not just
    /// the first; overlap resolution happens downstream.
    pub fn scan(&self, text: &str) -> Vec<Span> {
        self.scan_inner(text, None)
    }

    /// Apply only the patterns for the given filter types
    pub fn scan_for_types(&self, text: &str, types: &[FilterType]) -> Vec<Span> {
        self.scan_inner(text, Some(types))
    }

    fn scan_inner(&self, text: &str, types: Option<&[FilterType]>) -> Vec<Span> {
        let mut spans = Vec::new();
        for def in &self.patterns {
            if let Some(allowed) = types {
                if !allowed.contains(&def.filter_type) {
                    continue;
                }
            }
            for caps in def.regex.captures_iter(text) {
                // The outermost capture group, when present, is the span
                let mat = match caps.get(1) {
                    Some(group) => group,
                    None => caps.get(0).expect("match group 0 always present"),
                };
                let value = mat.as_str();
                if let Some(validator) = def.validator {
                    if !validator(value) {
                        continue;
                    }
                }
                let mut span = Span::new(
                    value,
                    mat.start(),
                    mat.end(),
                    def.filter_type,
                    def.confidence,
                    def.filter_type.default_priority(),
                );
                span.pattern = Some(def.id.to_string());
                spans.push(span);
            }
        }
        spans
    }

    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }
}

fn digits_of(value: &str) -> String {
    value.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// SSN issuance rules: area not 000/666/900+, group not 00, serial not 0000
pub fn validate_ssn(value: &str) -> bool {
    let digits = digits_of(value);
    if digits.len() != 9 {
        return false;
    }
    let area: u32 = digits[0..3].parse().unwrap_or(0);
    let group: u32 = digits[3..5].parse().unwrap_or(0);
    let serial: u32 = digits[5..9].parse().unwrap_or(0);
    area != 0 && area != 666 && area < 900 && group != 0 && serial != 0
}

/// Luhn checksum over the digit characters of `value`
pub fn luhn_check(value: &str) -> bool {
    let mut sum = 0;
    let mut alternate = false;
    let mut seen = 0;
    for c in value.chars().rev() {
        if let Some(mut digit) = c.to_digit(10) {
            if alternate {
                digit *= 2;
                if digit > 9 {
                    digit -= 9;
                }
            }
            sum += digit;
            alternate = !alternate;
            seen += 1;
        }
    }
    seen > 0 && sum % 10 == 0
}

/// 13-19 digits passing Luhn
pub fn validate_credit_card(value: &str) -> bool {
    let digits = digits_of(value);
    (13..=19).contains(&digits.len()) && luhn_check(&digits)
}

/// NPI check digit: Luhn over the card-industry prefix 80840 plus the
/// 10-digit identifier
pub fn validate_npi(value: &str) -> bool {
    let digits = digits_of(value);
    digits.len() == 10 && luhn_check(&format!("80840{}", digits))
}

/// DEA registration checksum: (d1+d3+d5) + 2*(d2+d4+d6), last digit == d7
pub fn validate_dea(value: &str) -> bool {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() != 9 || !chars[0].is_ascii_alphabetic() || !chars[1].is_ascii_alphabetic() {
        return false;
    }
    let d: Vec<u32> = chars[2..9].iter().filter_map(|c| c.to_digit(10)).collect();
    if d.len() != 7 {
        return false;
    }
    let sum = (d[0] + d[2] + d[4]) + 2 * (d[1] + d[3] + d[5]);
    sum % 10 == d[6]
}

/// Every octet in range
pub fn validate_ipv4(value: &str) -> bool {
    let octets: Vec<&str> = value.split('.').collect();
    octets.len() == 4 && octets.iter().all(|o| o.parse::<u32>().map(|n| n <= 255).unwrap_or(false))
}

/// Plausible human age
pub fn validate_age(value: &str) -> bool {
    let digits = digits_of(value);
    digits.parse::<u32>().map(|n| (1..=130).contains(&n)).unwrap_or(false)
}

/// Reject digit runs that are really years or too short for a phone number
pub fn validate_phone(value: &str) -> bool {
    let digits = digits_of(value);
    digits.len() >= 7 && digits.len() <= 15
}

/// 17 chars in the VIN alphabet with at least one letter
pub fn validate_vin(value: &str) -> bool {
    value.len() == 17 && value.chars().any(|c| c.is_ascii_alphabetic())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ssn_rules() {
        assert!(validate_ssn("123-45-6789"));
        assert!(!validate_ssn("000-45-6789"));
        assert!(!validate_ssn("666-45-6789"));
        assert!(!validate_ssn("900-45-6789"));
        assert!(!validate_ssn("123-00-6789"));
        assert!(!validate_ssn("123-45-0000"));
        assert!(!validate_ssn("123-45-678"));
    }

    #[test]
    fn test_luhn() {
        assert!(luhn_check("4111111111111111"));
        assert!(!luhn_check("4111111111111112"));
        assert!(validate_credit_card("4111-1111-1111-1111"));
        assert!(!validate_credit_card("1234-5678-9012-3456"));
    }

    #[test]
    fn test_npi_check_digit() {
        // Canonical test NPI published with the check-digit algorithm
        assert!(validate_npi("1234567893"));
        assert!(!validate_npi("1234567890"));
    }

    #[test]
    fn test_dea_checksum() {
        // (1+3+5) + 2*(2+4+6) = 33, check digit 3
        assert!(validate_dea("AB1234563"));
        assert!(!validate_dea("AB1234567"));
        assert!(!validate_dea("A91234563"));
    }

    #[test]
    fn test_ipv4_octets() {
        assert!(validate_ipv4("10.0.0.255"));
        assert!(!validate_ipv4("10.0.0.256"));
    }

    #[test]
    fn test_scan_finds_core_identifiers() {
        let scanner = PatternScanner::new();
        let text = "Contact john.doe@example.com, SSN 123-45-6789, seen 01/02/1980.";
        let spans = scanner.scan(text);
        assert!(spans.iter().any(|s| s.filter_type == FilterType::Email));
        assert!(spans
            .iter()
            .any(|s| s.filter_type == FilterType::Ssn && s.text == "123-45-6789"));
        assert!(spans
            .iter()
            .any(|s| s.filter_type == FilterType::Date && s.text == "01/02/1980"));
        for s in &spans {
            assert!(s.is_consistent_with(text));
        }
    }

    #[test]
    fn test_capture_group_is_the_span() {
        let scanner = PatternScanner::new();
        let text = "My name is John Smith and I need help.";
        let spans = scanner.scan(text);
        let name = spans
            .iter()
            .find(|s| s.filter_type == FilterType::Name)
            .unwrap();
        assert_eq!(name.text, "John Smith");
        assert_eq!(&text[name.start..name.end], "John Smith");
    }

    #[test]
    fn test_scan_for_types_restricts() {
        let scanner = PatternScanner::new();
        let text = "SSN 123-45-6789 email a@b.com";
        let spans = scanner.scan_for_types(text, &[FilterType::Email]);
        assert!(spans.iter().all(|s| s.filter_type == FilterType::Email));
        assert!(!spans.is_empty());
    }

    #[test]
    fn test_invalid_checksums_are_not_emitted() {
        let scanner = PatternScanner::new();
        // Fails Luhn
        let spans = scanner.scan_for_types("card 1234-5678-9012-3456", &[FilterType::CreditCard]);
        assert!(spans.is_empty());
        // Area 900 fails SSN rules
        let spans = scanner.scan_for_types("ssn 900-12-3456", &[FilterType::Ssn]);
        assert!(spans.is_empty());
    }

    #[test]
    fn test_ssn_shape_also_matches_phone() {
        let scanner = PatternScanner::new();
        let spans = scanner.scan("Call 123-45-6789 today.");
        let ssn = spans.iter().find(|s| s.filter_type == FilterType::Ssn);
        let phone = spans.iter().find(|s| s.filter_type == FilterType::Phone);
        let (ssn, phone) = (ssn.unwrap(), phone.unwrap());
        // Identical position, different type: disambiguation input
        assert!(ssn.same_range(phone));
    }

    #[test]
    fn test_provider_pattern() {
        let scanner = PatternScanner::new();
        let spans = scanner.scan("Seen by Dr. Martinez on rounds.");
        let provider = spans
            .iter()
            .find(|s| s.filter_type == FilterType::ProviderName)
            .unwrap();
        assert_eq!(provider.text, "Martinez");
    }

    #[test]
    fn test_address_and_zip() {
        let scanner = PatternScanner::new();
        let text = "Lives at 123 Main Street, Springfield, IL 62704.";
        let spans = scanner.scan(text);
        assert!(spans.iter().any(|s| s.filter_type == FilterType::Address));
        assert!(spans.iter().any(|s| s.filter_type == FilterType::Zipcode));
    }
}
