//! # time-nlp
//!
//! Recognize Chinese time expressions in free text and normalize them to
//! absolute instants.
//!
//! Text such as `下周六下午3点到5点` is cleaned, scanned against a compiled
//! pattern model, and each matched span is resolved against a reference
//! instant (the time base). Spans are resolved in order, each one seeding
//! the next, so the bare `5点` lands on the same Saturday afternoon.
//!
//! ## Modules
//!
//! - [`preprocess`] — Whitespace, particle and numeral cleanup
//! - [`pattern`] — The compiled pattern set
//! - [`model`] — Loading and writing gzip-compressed pattern models
//! - [`matcher`] — Scanning text into merged spans, range roles
//! - [`resolver`] — Span → instant, with context and future bias
//! - [`filter`] — Dropping unresolved expressions
//! - [`normalizer`] — The end-to-end parse engine
//! - [`timebase`] — The reference instant and its text form
//! - [`config`] — Engine options
//! - [`error`] — Error types

pub mod config;
pub mod error;
pub mod filter;
pub mod matcher;
pub mod model;
pub mod normalizer;
pub mod pattern;
pub mod preprocess;
pub mod resolver;
pub mod timebase;

pub use config::NormalizerOptions;
pub use error::{NlpError, Result};
pub use filter::filter_invalid;
pub use matcher::{scan, RawSpan, SpanRole};
pub use model::{load, read_model, write_model, ModelSource, PatternModel};
pub use normalizer::{ParseOutcome, TimeNormalizer};
pub use pattern::PatternSet;
pub use preprocess::clean;
pub use resolver::{
    advance_time_base, resolve, ExpressionKind, Granularity, Resolution, ResolutionContext,
    ResolvedExpression, TimePoint, LEGACY_SENTINEL_MILLIS,
};
pub use timebase::TimeBase;
