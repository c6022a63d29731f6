// Overlap resolver
// Enforces the span-set invariants: pairwise disjoint, sorted by start

use crate::types::{sort_canonical, Span};

/// Resolve overlapping spans into a disjoint, start-sorted set.
///
/// Spans are sorted `(start asc, priority desc, confidence desc, longer
/// first)` and swept left to right. On overlap the higher-priority span
/// wins; ties go to higher confidence, then to the longer range. Tie-breaks
/// are deterministic for identical inputs regardless of arrival order.
pub fn resolve_overlaps(mut spans: Vec<Span>) -> Vec<Span> {
    sort_canonical(&mut spans);

    let mut kept: Vec<Span> = Vec::new();
    for span in spans {
        let Some(last) = kept.last() else {
            kept.push(span);
            continue;
        };
        if span.start >= last.end {
            kept.push(span);
            continue;
        }
        if challenger_wins(&span, last) {
            // Sorted by start, so the replacement cannot reach back into the
            // span kept before `last`
            *kept.last_mut().unwrap() = span;
        }
    }
    kept
}

fn challenger_wins(challenger: &Span, incumbent: &Span) -> bool {
    if challenger.priority != incumbent.priority {
        return challenger.priority > incumbent.priority;
    }
    if (challenger.confidence - incumbent.confidence).abs() > f64::EPSILON {
        return challenger.confidence > incumbent.confidence;
    }
    challenger.len() > incumbent.len()
}

/// Check the post-resolution invariants; used by tests and debug assertions
pub fn is_disjoint_sorted(spans: &[Span]) -> bool {
    spans.windows(2).all(|w| w[0].start <= w[1].start && w[0].end <= w[1].start)
}
