// Unicode normalizer
// Strips invisible code points and maps homoglyphs before scanning;
// flags inputs that look deliberately adversarial

use serde::Serialize;

/// What normalization found and changed
#[derive(Debug, Clone, Default, Serialize)]
pub struct NormalizationReport {
    pub had_invisibles: bool,
    pub had_homoglyphs: bool,
    /// Distinct offending characters, for diagnostics
    pub flagged_chars: Vec<char>,
    /// 0.0 for clean input, rising with the density of suspicious characters
    pub suspicion_score: f64,
    /// True when the output text differs from the input
    pub changed: bool,
}

/// Normalized text plus its report. Offsets produced by detectors downstream
/// refer to this text, not the pre-normalization input.
#[derive(Debug, Clone)]
pub struct NormalizedText {
    pub text: String,
    pub report: NormalizationReport,
}

/// Zero-width and directionality characters that hide content from humans
/// while surviving string matching
fn is_invisible(c: char) -> bool {
    matches!(
        c,
        '\u{200B}' // zero width space
        | '\u{200C}' // zero width non-joiner
        | '\u{200D}' // zero width joiner
        | '\u{FEFF}' // byte order mark
        | '\u{00AD}' // soft hyphen
        | '\u{200E}' // left-to-right mark
        | '\u{200F}' // right-to-left mark
        | '\u{2060}' // word joiner
        | '\u{180E}' // Mongolian vowel separator
    )
}

/// Cyrillic/Greek lookalikes and typographic dashes mapped to their Latin
/// equivalents
fn homoglyph(c: char) -> Option<char> {
    let mapped = match c {
        // Cyrillic lowercase
        'а' => 'a',
        'е' => 'e',
        'о' => 'o',
        'р' => 'p',
        'с' => 'c',
        'х' => 'x',
        'у' => 'y',
        'і' => 'i',
        'ѕ' => 's',
        'ј' => 'j',
        // Cyrillic uppercase
        'А' => 'A',
        'В' => 'B',
        'Е' => 'E',
        'К' => 'K',
        'М' => 'M',
        'Н' => 'H',
        'О' => 'O',
        'Р' => 'P',
        'С' => 'C',
        'Т' => 'T',
        'Х' => 'X',
        // Greek
        'ο' => 'o',
        'ν' => 'v',
        'Α' => 'A',
        'Β' => 'B',
        'Ε' => 'E',
        'Ζ' => 'Z',
        'Η' => 'H',
        'Ι' => 'I',
        'Κ' => 'K',
        'Μ' => 'M',
        'Ν' => 'N',
        'Ο' => 'O',
        'Ρ' => 'P',
        'Τ' => 'T',
        'Υ' => 'Y',
        'Χ' => 'X',
        // Dashes
        '\u{2010}' | '\u{2011}' | '\u{2012}' | '\u{2013}' | '\u{2014}' | '\u{2212}' => '-',
        _ => return None,
    };
    Some(mapped)
}

/// Compatibility forms folded to ASCII: full-width characters, the
/// ideographic space, and the common Latin ligatures
fn compat_fold(c: char, out: &mut String) -> bool {
    match c {
        '\u{FF01}'..='\u{FF5E}' => {
            // Full-width ASCII block is a fixed offset from ASCII
            let ascii = char::from_u32(c as u32 - 0xFEE0).unwrap_or(c);
            out.push(ascii);
            true
        }
        '\u{3000}' => {
            out.push(' ');
            true
        }
        'ﬁ' => {
            out.push_str("fi");
            true
        }
        'ﬂ' => {
            out.push_str("fl");
            true
        }
        'ﬀ' => {
            out.push_str("ff");
            true
        }
        _ => false,
    }
}

/// Normalize `input` for scanning and report what was found
pub fn normalize(input: &str) -> NormalizedText {
    let mut text = String::with_capacity(input.len());
    let mut report = NormalizationReport::default();
    let mut invisible_count = 0usize;
    let mut homoglyph_count = 0usize;
    let mut compat_count = 0usize;

    for c in input.chars() {
        if is_invisible(c) {
            invisible_count += 1;
            flag(&mut report, c);
            continue;
        }
        if let Some(latin) = homoglyph(c) {
            homoglyph_count += 1;
            flag(&mut report, c);
            text.push(latin);
            continue;
        }
        if compat_fold(c, &mut text) {
            compat_count += 1;
            continue;
        }
        text.push(c);
    }

    report.had_invisibles = invisible_count > 0;
    report.had_homoglyphs = homoglyph_count > 0;
    report.suspicion_score = (invisible_count as f64 * 0.2
        + homoglyph_count as f64 * 0.25
        + compat_count as f64 * 0.05)
        .min(1.0);
    report.changed = text != input;

    NormalizedText { text, report }
}

fn flag(report: &mut NormalizationReport, c: char) {
    if !report.flagged_chars.contains(&c) {
        report.flagged_chars.push(c);
    }
}
