//! Scanning cleaned text into raw expression spans.
//!
//! Matches that touch (one ends exactly where the next begins) are merged
//! into a single span, so `周6` + `3点` becomes one expression `周63点`
//! rather than two independently resolved fragments.

use serde::Serialize;

use crate::pattern::PatternSet;

/// Text between two spans that makes them the two ends of a range.
const RANGE_CONNECTORS: &[&str] = &["到", "至", "~", "～", "-", "—", "－"];

/// Where a span sits relative to its neighbours.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SpanRole {
    #[default]
    Single,
    RangeStart,
    RangeEnd,
}

/// A contiguous piece of cleaned text matched by the pattern set.
///
/// Offsets are byte offsets into the cleaned text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RawSpan {
    pub text: String,
    pub start: usize,
    pub end: usize,
    pub role: SpanRole,
}

impl RawSpan {
    fn new(text: &str, start: usize, end: usize) -> Self {
        Self {
            text: text.to_string(),
            start,
            end,
            role: SpanRole::Single,
        }
    }
}

/// Scan `text` left to right, merging adjacent matches.
///
/// # Examples
///
/// ```
/// use time_nlp::matcher::scan;
/// use time_nlp::pattern::PatternSet;
///
/// let patterns = PatternSet::compile(&["周[1-7]", "\\d{1,2}点"]).unwrap();
/// let spans = scan("周63点到5点", &patterns);
/// let texts: Vec<&str> = spans.iter().map(|s| s.text.as_str()).collect();
/// assert_eq!(texts, ["周63点", "5点"]);
/// ```
pub fn scan(text: &str, patterns: &PatternSet) -> Vec<RawSpan> {
    let mut spans: Vec<RawSpan> = Vec::new();

    for m in patterns.regex().find_iter(text) {
        match spans.last_mut() {
            Some(current) if current.end == m.start() => {
                current.text.push_str(m.as_str());
                current.end = m.end();
            }
            _ => spans.push(RawSpan::new(m.as_str(), m.start(), m.end())),
        }
    }

    mark_ranges(text, &mut spans);
    tracing::trace!(spans = spans.len(), "scanned text");
    spans
}

/// Tag consecutive spans separated only by a range connector.
///
/// A span already closing one range is never reopened as the start of
/// another, so `3点到5点到7点` yields start, end, single.
pub fn mark_ranges(text: &str, spans: &mut [RawSpan]) {
    for i in 1..spans.len() {
        let (left, right) = spans.split_at_mut(i);
        let prev = &mut left[i - 1];
        let next = &mut right[0];
        if prev.role != SpanRole::Single {
            continue;
        }
        let gap = text.get(prev.end..next.start).unwrap_or_default();
        if RANGE_CONNECTORS.contains(&gap) {
            prev.role = SpanRole::RangeStart;
            next.role = SpanRole::RangeEnd;
        }
    }
}
