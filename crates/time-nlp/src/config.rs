//! Engine construction options.

use serde::{Deserialize, Serialize};

/// Options for [`TimeNormalizer::with_options`](crate::TimeNormalizer::with_options).
///
/// Missing keys take their defaults, so `{}` is a valid configuration.
///
/// ```
/// use time_nlp::NormalizerOptions;
///
/// let opts: NormalizerOptions = serde_json::from_str(r#"{"prefer_future": false}"#).unwrap();
/// assert!(!opts.prefer_future);
/// assert_eq!(opts.model, None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerOptions {
    /// Resolve ambiguous expressions to their next future occurrence.
    pub prefer_future: bool,
    /// Model locator (see [`ModelSource::parse`](crate::model::ModelSource::parse)).
    /// `None` loads the bundled model.
    pub model: Option<String>,
}

impl Default for NormalizerOptions {
    fn default() -> Self {
        Self {
            prefer_future: true,
            model: None,
        }
    }
}
