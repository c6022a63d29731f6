// Date-shifting engine
// Consistent per-session day offsets that preserve intervals between events

use chrono::{Datelike, Duration, NaiveDate};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::collections::HashMap;

type HmacSha256 = Hmac<Sha256>;

/// Marker emitted when a DATE span under the shift strategy cannot be parsed
pub const DATE_REDACTED: &str = "[DATE_REDACTED]";

const PARSE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%m/%d/%Y",
    "%m/%d/%y",
    "%m-%d-%Y",
    "%B %d %Y",
    "%b %d %Y",
    "%d %B %Y",
    "%d %b %Y",
];

/// Per-session date shifter. The day offset is derived deterministically
/// from the session seed, so one session always shifts by the same amount.
pub struct DateShiftingEngine {
    offset_days: i64,
    /// Original dates in order of first appearance; index + 1 is the event number
    events: Vec<NaiveDate>,
    seen: HashMap<NaiveDate, usize>,
}

impl DateShiftingEngine {
    pub fn new(session_seed: &[u8]) -> Self {
        DateShiftingEngine {
            offset_days: derive_offset(session_seed),
            events: Vec::new(),
            seen: HashMap::new(),
        }
    }

    pub fn offset_days(&self) -> i64 {
        self.offset_days
    }

    /// Register a date string. Returns the event number, or None when the
    /// string cannot be parsed as a date. The same original date always maps
    /// to the same event number.
    pub fn add_date(&mut self, original: &str) -> Option<usize> {
        let date = parse_date(original)?;
        if let Some(event) = self.seen.get(&date) {
            return Some(*event);
        }
        self.events.push(date);
        let event = self.events.len();
        self.seen.insert(date, event);
        Some(event)
    }

    /// Token for an event registered with `add_date`. The first event shows
    /// the shifted year; later events additionally carry the gap in days to
    /// the preceding event's original date.
    pub fn generate_token(&self, event_number: usize) -> Option<String> {
        let date = *self.events.get(event_number.checked_sub(1)?)?;
        let shifted_year = (date + Duration::days(self.offset_days)).year();
        if event_number == 1 {
            return Some(format!("[SHIFTED_DATE_1: {}]", shifted_year));
        }
        let previous = self.events[event_number - 2];
        let gap = date.signed_duration_since(previous).num_days();
        Some(format!(
            "[{} days later, SHIFTED_DATE_{}: {}]",
            gap, event_number, shifted_year
        ))
    }
}

/// HMAC the session seed down to a day offset in [-365, +365]. A zero
/// offset would leave dates unshifted, so it is nudged off zero.
fn derive_offset(session_seed: &[u8]) -> i64 {
    let mut mac = HmacSha256::new_from_slice(session_seed)
        .expect("HMAC can take key of any size");
    mac.update(b"date-shift-offset");
    let digest = mac.finalize().into_bytes();
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&digest[..8]);
    let offset = (u64::from_le_bytes(raw) % 731) as i64 - 365;
    if offset == 0 {
        29
    } else {
        offset
    }
}

/// Parse the common clinical date shapes. Ordinal suffixes and commas are
/// normalized away before the format table is tried.
pub fn parse_date(original: &str) -> Option<NaiveDate> {
    let cleaned = original
        .trim()
        .replace(',', " ")
        .split_whitespace()
        .map(strip_ordinal_suffix)
        .collect::<Vec<_>>()
        .join(" ");

    for format in PARSE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(&cleaned, format) {
            return Some(date);
        }
    }
    None
}

/// "2nd" -> "2"; leaves non-ordinal words alone
fn strip_ordinal_suffix(word: &str) -> &str {
    for suffix in ["st", "nd", "rd", "th"] {
        if let Some(stem) = word.strip_suffix(suffix) {
            if !stem.is_empty() && stem.chars().all(|c| c.is_ascii_digit()) {
                return stem;
            }
        }
    }
    word
}
