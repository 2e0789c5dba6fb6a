//! Error types for time-nlp operations.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum NlpError {
    /// The pattern model could not be read, decompressed, decoded or compiled.
    #[error("Model load error: {0}")]
    ModelLoad(String),

    /// A time base string did not have the `YYYY-MM-DD-HH-MM-SS` shape or
    /// named a nonexistent instant.
    #[error("Invalid time base: {0}")]
    InvalidTimeBase(String),
}

pub type Result<T> = std::result::Result<T, NlpError>;
