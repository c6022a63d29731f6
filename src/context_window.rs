// Context window service
// Tokenized neighborhood around a span, used for keyword-based scoring

/// Tokens surrounding a matched range
#[derive(Debug, Clone, Default)]
pub struct ContextWindow {
    /// Last k tokens before the span, in document order
    pub before: Vec<String>,
    /// First k tokens after the span, in document order
    pub after: Vec<String>,
    /// The matched text itself
    pub matched: String,
}

impl ContextWindow {
    /// before + matched + after as one token list
    pub fn full(&self) -> Vec<String> {
        let mut tokens = self.before.clone();
        tokens.push(self.matched.clone());
        tokens.extend(self.after.iter().cloned());
        tokens
    }

    pub fn as_text(&self) -> String {
        self.full().join(" ")
    }
}

/// Strip leading/trailing punctuation from a raw whitespace chunk; internal
/// punctuation stays ("01/02/1980," becomes "01/02/1980").
fn clean_token(raw: &str) -> &str {
    raw.trim_matches(|c: char| !c.is_alphanumeric())
}

/// Build the window of the last `k` tokens before `start` and first `k`
/// tokens after `end`. Token boundaries are whitespace.
pub fn window(text: &str, start: usize, end: usize, k: usize) -> ContextWindow {
    let mut before = Vec::new();
    let mut after = Vec::new();

    for (chunk_start, chunk) in split_whitespace_indices(text) {
        let chunk_end = chunk_start + chunk.len();
        let cleaned = clean_token(chunk);
        if cleaned.is_empty() {
            continue;
        }
        if chunk_end <= start {
            before.push(cleaned.to_string());
        } else if chunk_start >= end && after.len() < k {
            after.push(cleaned.to_string());
        }
    }

    if before.len() > k {
        before.drain(..before.len() - k);
    }

    ContextWindow {
        before,
        after,
        matched: text.get(start..end).unwrap_or_default().to_string(),
    }
}

/// Whitespace-separated chunks with their byte offsets
fn split_whitespace_indices(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.split_whitespace().map(move |chunk| {
        // Safety of the pointer math: chunk is a subslice of text
        let offset = chunk.as_ptr() as usize - text.as_ptr() as usize;
        (offset, chunk)
    })
}
