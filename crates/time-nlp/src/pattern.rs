//! The compiled set of temporal-expression patterns.
//!
//! A [`PatternSet`] is built from the textual patterns of a model and is
//! immutable afterwards. The individual patterns are joined into one
//! alternation in model order, so a scan yields leftmost, non-overlapping
//! matches and, at a given position, the first listed pattern that matches.

use regex::Regex;

use crate::error::NlpError;

/// An ordered, compiled collection of temporal patterns.
#[derive(Debug, Clone)]
pub struct PatternSet {
    combined: Regex,
    sources: Vec<String>,
}

impl PatternSet {
    /// Compile patterns from their textual form.
    ///
    /// Every pattern is compiled on its own first so that a bad entry is
    /// reported by index, then the set is joined into a single regex.
    ///
    /// # Errors
    ///
    /// Returns [`NlpError::ModelLoad`] if the list is empty, a pattern is
    /// empty or fails to compile, or a pattern can match the empty string.
    pub fn compile<S: AsRef<str>>(patterns: &[S]) -> Result<Self, NlpError> {
        if patterns.is_empty() {
            return Err(NlpError::ModelLoad("pattern model is empty".to_string()));
        }

        let mut sources = Vec::with_capacity(patterns.len());
        for (i, p) in patterns.iter().enumerate() {
            let p = p.as_ref();
            if p.is_empty() {
                return Err(NlpError::ModelLoad(format!("pattern #{i} is empty")));
            }
            let re = Regex::new(p)
                .map_err(|e| NlpError::ModelLoad(format!("pattern #{i} '{p}': {e}")))?;
            if re.is_match("") {
                return Err(NlpError::ModelLoad(format!(
                    "pattern #{i} '{p}' matches the empty string"
                )));
            }
            sources.push(p.to_string());
        }

        let joined = sources
            .iter()
            .map(|p| format!("(?:{p})"))
            .collect::<Vec<_>>()
            .join("|");
        let combined = Regex::new(&joined)
            .map_err(|e| NlpError::ModelLoad(format!("combined pattern: {e}")))?;

        Ok(Self { combined, sources })
    }

    /// The combined alternation used for scanning.
    pub fn regex(&self) -> &Regex {
        &self.combined
    }

    /// The individual patterns, in model order.
    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}
