//! The parse pipeline: clean → scan → resolve → filter.
//!
//! [`TimeNormalizer`] owns a shared [`PatternSet`] plus the mutable time
//! base and future-bias flag. [`TimeNormalizer::parse_at`] takes `&self`
//! and an explicit time base, so one normalizer can serve concurrent
//! callers; the `&mut self` methods are single-writer conveniences that
//! read and update the stored time base.

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;

use crate::config::NormalizerOptions;
use crate::error::NlpError;
use crate::filter::filter_invalid;
use crate::matcher;
use crate::model::{self, ModelSource};
use crate::pattern::PatternSet;
use crate::preprocess;
use crate::resolver::{self, ResolutionContext, ResolvedExpression};
use crate::timebase::TimeBase;

/// The result of one [`TimeNormalizer::parse_at`] call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParseOutcome {
    /// Resolved expressions in text order.
    pub expressions: Vec<ResolvedExpression>,
    /// The time base after every resolved expression was applied to it.
    pub time_base: TimeBase,
}

/// Recognizes and normalizes time expressions.
///
/// # Examples
///
/// ```
/// use time_nlp::TimeNormalizer;
///
/// let mut normalizer = TimeNormalizer::new().unwrap();
/// let found = normalizer
///     .parse_with_base("周六下午三点到五点开会", "2016-05-04-10-00-00")
///     .unwrap();
/// let times: Vec<String> = found.iter().map(|e| e.time().unwrap().to_string()).collect();
/// assert_eq!(times, ["2016-05-07 15:00:00", "2016-05-07 17:00:00"]);
/// ```
#[derive(Debug, Clone)]
pub struct TimeNormalizer {
    patterns: Arc<PatternSet>,
    prefer_future: bool,
    time_base: TimeBase,
    original_time_base: TimeBase,
}

impl TimeNormalizer {
    /// A normalizer using the bundled model, with future bias on.
    ///
    /// # Errors
    ///
    /// Returns [`NlpError::ModelLoad`] if the bundled model cannot be read.
    pub fn new() -> Result<Self, NlpError> {
        Self::from_source(&ModelSource::default())
    }

    /// A normalizer using the model file at `path`.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, NlpError> {
        Self::from_source(&ModelSource::Path(path.as_ref().to_path_buf()))
    }

    pub fn from_source(source: &ModelSource) -> Result<Self, NlpError> {
        let patterns = model::load(source)?;
        Ok(Self::with_patterns(Arc::new(patterns), true))
    }

    /// Build a normalizer from [`NormalizerOptions`].
    pub fn with_options(options: &NormalizerOptions) -> Result<Self, NlpError> {
        let source = options
            .model
            .as_deref()
            .map(ModelSource::parse)
            .unwrap_or_default();
        let patterns = model::load(&source)?;
        Ok(Self::with_patterns(Arc::new(patterns), options.prefer_future))
    }

    /// Share an already compiled pattern set.
    pub fn with_patterns(patterns: Arc<PatternSet>, prefer_future: bool) -> Self {
        let now = TimeBase::now();
        Self {
            patterns,
            prefer_future,
            time_base: now,
            original_time_base: now,
        }
    }

    /// Parse `text` against the current wall-clock instant.
    pub fn parse(&mut self, text: &str) -> Vec<ResolvedExpression> {
        self.parse_from(text, TimeBase::now())
    }

    /// Parse `text` against a `YYYY-MM-DD-HH-MM-SS` time base.
    ///
    /// # Errors
    ///
    /// Returns [`NlpError::InvalidTimeBase`] if `time_base` is malformed. The
    /// stored time base is left unchanged in that case.
    pub fn parse_with_base(
        &mut self,
        text: &str,
        time_base: &str,
    ) -> Result<Vec<ResolvedExpression>, NlpError> {
        let base = TimeBase::parse(time_base)?;
        Ok(self.parse_from(text, base))
    }

    fn parse_from(&mut self, text: &str, base: TimeBase) -> Vec<ResolvedExpression> {
        self.original_time_base = base;
        let outcome = self.parse_at(text, &base);
        self.time_base = outcome.time_base;
        outcome.expressions
    }

    /// Parse `text` against an explicit time base without touching any
    /// stored state.
    pub fn parse_at(&self, text: &str, time_base: &TimeBase) -> ParseOutcome {
        let cleaned = preprocess::clean(text);
        let spans = matcher::scan(&cleaned, &self.patterns);

        // Every span resolves against the supplied base; `advanced` only
        // records where the parse left it.
        let mut advanced = *time_base;
        let mut context = ResolutionContext::default();
        let mut expressions = Vec::with_capacity(spans.len());
        for span in &spans {
            let (expr, next) = resolver::resolve(span, time_base, &context, self.prefer_future);
            advanced = resolver::advance_time_base(&advanced, &expr);
            context = next;
            expressions.push(expr);
        }

        let expressions = filter_invalid(expressions);
        tracing::debug!(
            spans = spans.len(),
            resolved = expressions.len(),
            "parsed text"
        );
        ParseOutcome {
            expressions,
            time_base: advanced,
        }
    }

    /// The time base as left by the last parse.
    pub fn time_base(&self) -> TimeBase {
        self.time_base
    }

    /// Replace the stored time base. Parsing does not read it: every parse
    /// takes its own base and overwrites this one with the advanced result.
    pub fn set_time_base(&mut self, time_base: TimeBase) {
        self.time_base = time_base;
    }

    /// Restore the time base supplied to the last parse.
    pub fn reset_time_base(&mut self) {
        self.time_base = self.original_time_base;
    }

    pub fn original_time_base(&self) -> TimeBase {
        self.original_time_base
    }

    pub fn is_prefer_future(&self) -> bool {
        self.prefer_future
    }

    pub fn set_prefer_future(&mut self, prefer_future: bool) {
        self.prefer_future = prefer_future;
    }

    pub fn patterns(&self) -> &Arc<PatternSet> {
        &self.patterns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "2016-05-04-10-00-00";

    fn normalizer() -> TimeNormalizer {
        TimeNormalizer::new().unwrap()
    }

    fn times(found: &[ResolvedExpression]) -> Vec<String> {
        found
            .iter()
            .map(|e| e.time().unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_invalid_time_base_keeps_state() {
        let mut n = normalizer();
        n.parse_with_base("明天", BASE).unwrap();
        let before = n.time_base();
        let err = n.parse_with_base("明天", "2016-05-04").unwrap_err();
        assert!(matches!(err, NlpError::InvalidTimeBase(_)));
        assert_eq!(n.time_base(), before);
        assert_eq!(n.original_time_base().to_string(), BASE);
    }

    #[test]
    fn test_time_base_advances_and_resets() {
        let mut n = normalizer();
        n.parse_with_base("2017年3月", BASE).unwrap();
        assert_eq!(n.time_base().to_string(), "2017-03-04-10-00-00");
        assert_eq!(n.original_time_base().to_string(), BASE);
        n.reset_time_base();
        assert_eq!(n.time_base().to_string(), BASE);
    }

    #[test]
    fn test_set_time_base() {
        let mut n = normalizer();
        let tb = TimeBase::parse("2020-01-01-00-00-00").unwrap();
        n.set_time_base(tb);
        assert_eq!(n.time_base(), tb);

        // The next parse uses its own base and replaces the stored one.
        let found = n.parse_with_base("明天", BASE).unwrap();
        assert_eq!(times(&found), ["2016-05-05 00:00:00"]);
        assert_eq!(n.time_base().to_string(), "2016-05-05-10-00-00");
    }

    #[test]
    fn test_prefer_future_toggle() {
        let mut n = normalizer();
        assert!(n.is_prefer_future());
        assert_eq!(times(&n.parse_with_base("周一", BASE).unwrap()), ["2016-05-09 00:00:00"]);
        n.set_prefer_future(false);
        assert_eq!(times(&n.parse_with_base("周一", BASE).unwrap()), ["2016-05-02 00:00:00"]);
    }

    #[test]
    fn test_parse_at_does_not_mutate() {
        let n = normalizer();
        let stored = n.time_base();
        let base = TimeBase::parse(BASE).unwrap();
        let outcome = n.parse_at("明年", &base);
        assert_eq!(times(&outcome.expressions), ["2017-01-01 00:00:00"]);
        assert_eq!(outcome.time_base.to_string(), "2017-05-04-10-00-00");
        assert_eq!(n.time_base(), stored);
    }

    #[test]
    fn test_offsets_refer_to_cleaned_text() {
        let mut n = normalizer();
        let found = n.parse_with_base("会议 在 明天 下午 三点", BASE).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].text, "明天下午3点");
        assert_eq!(found[0].start, "会议在".len());
    }

    #[test]
    fn test_with_options() {
        let opts = NormalizerOptions {
            prefer_future: false,
            model: Some("classpath:/time_exp.m".to_string()),
        };
        let n = TimeNormalizer::with_options(&opts).unwrap();
        assert!(!n.is_prefer_future());
        assert!(!n.patterns().is_empty());

        let bad = NormalizerOptions {
            model: Some("https://example.com/time_exp.m".to_string()),
            ..NormalizerOptions::default()
        };
        assert!(matches!(
            TimeNormalizer::with_options(&bad),
            Err(NlpError::ModelLoad(_))
        ));
    }

    #[test]
    fn test_shared_patterns() {
        let n = normalizer();
        let other = TimeNormalizer::with_patterns(Arc::clone(n.patterns()), false);
        assert!(Arc::ptr_eq(n.patterns(), other.patterns()));
    }
}
