//! Dropping expressions that did not resolve.

use crate::resolver::ResolvedExpression;

/// Remove every unresolved expression, keeping the rest in order.
///
/// # Examples
///
/// ```
/// use time_nlp::{filter_invalid, TimeNormalizer};
///
/// let mut normalizer = TimeNormalizer::new().unwrap();
/// let parsed = normalizer.parse_with_base("明天3点", "2016-05-04-10-00-00").unwrap();
/// assert_eq!(filter_invalid(parsed.clone()), parsed);
/// ```
pub fn filter_invalid(expressions: Vec<ResolvedExpression>) -> Vec<ResolvedExpression> {
    let before = expressions.len();
    let kept: Vec<ResolvedExpression> = expressions
        .into_iter()
        .filter(ResolvedExpression::is_resolved)
        .collect();
    if kept.len() < before {
        tracing::debug!(dropped = before - kept.len(), "filtered unresolved expressions");
    }
    kept
}
