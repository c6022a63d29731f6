// Dictionary-backed name detector
// Capitalized-word lookup against embedded given-name and surname sets

use super::{DetectionContext, Detector};
use crate::dictionary::BloomFilter;
use crate::errors::DetectorError;
use crate::policy::IdentifierConfig;
use crate::types::{FilterType, Span};
use regex::Regex;
use std::collections::HashSet;
use std::sync::Arc;

// Embedded seed dictionaries; external dictionaries loaded through
// `dictionary::load_term_set` extend them at registration time.
const GIVEN_NAMES: &[&str] = &[
    "james", "john", "robert", "michael", "william", "david", "richard", "joseph", "thomas",
    "charles", "christopher", "daniel", "matthew", "anthony", "mark", "donald", "steven", "paul",
    "andrew", "joshua", "kenneth", "kevin", "brian", "george", "timothy", "ronald", "edward",
    "jason", "jeffrey", "ryan", "jacob", "gary", "nicholas", "eric", "jonathan", "stephen",
    "larry", "justin", "scott", "brandon", "benjamin", "samuel", "gregory", "alexander", "patrick",
    "frank", "raymond", "jack", "dennis", "jerry", "mary", "patricia", "jennifer", "linda",
    "elizabeth", "barbara", "susan", "jessica", "sarah", "karen", "lisa", "nancy", "betty",
    "margaret", "sandra", "ashley", "kimberly", "emily", "donna", "michelle", "carol", "amanda",
    "dorothy", "melissa", "deborah", "stephanie", "rebecca", "sharon", "laura", "cynthia",
    "kathleen", "amy", "angela", "shirley", "anna", "brenda", "pamela", "emma", "nicole", "helen",
    "samantha", "katherine", "christine", "debra", "rachel", "carolyn", "janet", "catherine",
    "maria", "heather", "diane", "ruth", "julie", "olivia", "joyce", "virginia",
];

const SURNAMES: &[&str] = &[
    "smith", "johnson", "williams", "brown", "jones", "garcia", "miller", "davis", "rodriguez",
    "martinez", "hernandez", "lopez", "gonzalez", "wilson", "anderson", "thomas", "taylor",
    "moore", "jackson", "martin", "lee", "perez", "thompson", "white", "harris", "sanchez",
    "clark", "ramirez", "lewis", "robinson", "walker", "young", "allen", "king", "wright",
    "scott", "torres", "nguyen", "hill", "flores", "green", "adams", "nelson", "baker", "hall",
    "rivera", "campbell", "mitchell", "carter", "roberts", "gomez", "phillips", "evans",
    "turner", "diaz", "parker", "cruz", "edwards", "collins", "reyes", "stewart", "morris",
    "morales", "murphy", "cook", "rogers", "gutierrez", "ortiz", "morgan", "cooper", "peterson",
    "bailey", "reed", "kelly", "howard", "ramos", "kim", "cox", "ward", "richardson", "watson",
    "brooks", "chavez", "wood", "james", "bennett", "gray", "mendoza", "ruiz", "hughes", "price",
    "alvarez", "castillo", "sanders", "patel", "myers", "long", "ross", "foster", "jimenez",
    "doe",
];

pub struct NameDetector {
    given_names: HashSet<String>,
    surnames: HashSet<String>,
    /// Large external name dictionary, when one was loaded from disk
    bloom: Option<Arc<BloomFilter>>,
    word: Regex,
}

impl Default for NameDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl NameDetector {
    pub fn new() -> Self {
        NameDetector {
            given_names: GIVEN_NAMES.iter().map(|s| s.to_string()).collect(),
            surnames: SURNAMES.iter().map(|s| s.to_string()).collect(),
            bloom: None,
            word: Regex::new(r"\b[A-Z][a-z]+\b").unwrap(),
        }
    }

    /// Attach a bloom-filter name dictionary loaded with
    /// `dictionary::BloomFilter::load`
    pub fn with_bloom(mut self, bloom: Arc<BloomFilter>) -> Self {
        self.bloom = Some(bloom);
        self
    }

    /// Extend the surname set, e.g. from an on-disk dictionary
    pub fn with_extra_surnames<I: IntoIterator<Item = String>>(mut self, terms: I) -> Self {
        self.surnames
            .extend(terms.into_iter().map(|t| t.to_lowercase()));
        self
    }

    /// Extend the given-name set
    pub fn with_extra_given_names<I: IntoIterator<Item = String>>(mut self, terms: I) -> Self {
        self.given_names
            .extend(terms.into_iter().map(|t| t.to_lowercase()));
        self
    }

    fn classify(&self, word: &str) -> Option<f64> {
        let lowered = word.to_lowercase();
        let given = self.given_names.contains(&lowered);
        let surname = self.surnames.contains(&lowered);
        match (given, surname) {
            (true, true) => Some(0.7),
            (false, true) => Some(0.7),
            (true, false) => Some(0.6),
            (false, false) => {
                // Bloom membership carries false positives, so it scores
                // below the embedded sets
                match &self.bloom {
                    Some(bloom) if bloom.contains(&lowered) => Some(0.55),
                    _ => None,
                }
            }
        }
    }
}

#[async_trait::async_trait]
impl Detector for NameDetector {
    fn name(&self) -> &str {
        "dictionary:name"
    }

    fn filter_type(&self) -> FilterType {
        FilterType::Name
    }

    async fn detect(
        &self,
        text: &str,
        config: &IdentifierConfig,
        _ctx: &DetectionContext<'_>,
    ) -> Result<Vec<Span>, DetectorError> {
        let priority = FilterType::Name.default_priority();
        let mut candidates: Vec<(usize, usize, f64)> = Vec::new();
        for mat in self.word.find_iter(text) {
            if let Some(confidence) = self.classify(mat.as_str()) {
                candidates.push((mat.start(), mat.end(), confidence));
            }
        }

        // Merge "First Last" pairs separated by a single space into one span
        let mut spans = Vec::new();
        let mut i = 0;
        while i < candidates.len() {
            let (start, mut end, mut confidence) = candidates[i];
            let mut j = i + 1;
            while j < candidates.len()
                && candidates[j].0 == end + 1
                && &text[end..candidates[j].0] == " "
            {
                end = candidates[j].1;
                confidence = 0.85;
                j += 1;
            }
            let mut span = Span::new(
                &text[start..end],
                start,
                end,
                FilterType::Name,
                confidence,
                priority,
            );
            span.pattern = Some("dictionary-name".to_string());
            spans.push(span);
            i = j;
        }

        if let Some(floor) = config.min_confidence {
            spans.retain(|s| s.confidence >= floor);
        }
        Ok(spans)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RedactionConfig;

    async fn run(text: &str) -> Vec<Span> {
        let config = RedactionConfig::default();
        let ctx = DetectionContext {
            session_id: "1234",
            config: &config,
        };
        NameDetector::new()
            .detect(text, &IdentifierConfig::default(), &ctx)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_surname_lookup() {
        let spans = run("Spoke with Smith about the plan.").await;
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].text, "Smith");
        assert_eq!(spans[0].filter_type, FilterType::Name);
    }

    #[tokio::test]
    async fn test_pair_merge() {
        let spans = run("Seen with John Smith yesterday.").await;
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].text, "John Smith");
        assert!(spans[0].confidence > 0.8);
    }

    #[tokio::test]
    async fn test_non_names_ignored() {
        let spans = run("The Hospital Discharge Summary follows.").await;
        assert!(spans.is_empty());
    }

    #[tokio::test]
    async fn test_bloom_backed_lookup() {
        let config = RedactionConfig::default();
        let ctx = DetectionContext {
            session_id: "1234",
            config: &config,
        };
        let mut bloom = BloomFilter::with_capacity(4096, 4);
        bloom.insert("okonkwo");
        let detector = NameDetector::new().with_bloom(Arc::new(bloom));
        let spans = detector
            .detect(
                "Consult note from Okonkwo today.",
                &IdentifierConfig::default(),
                &ctx,
            )
            .await
            .unwrap();
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].text, "Okonkwo");
        assert!(spans[0].confidence < 0.6);
    }

    #[tokio::test]
    async fn test_extension_terms() {
        let config = RedactionConfig::default();
        let ctx = DetectionContext {
            session_id: "1234",
            config: &config,
        };
        let detector =
            NameDetector::new().with_extra_surnames(vec!["Zyxwv".to_string()]);
        let spans = detector
            .detect("Patient Zyxwv returned.", &IdentifierConfig::default(), &ctx)
            .await
            .unwrap();
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].text, "Zyxwv");
    }
}
