//! Loading and writing the persisted pattern model.
//!
//! A model file is a gzip stream wrapping a JSON [`PatternModel`]. Every
//! source form (bundled resource, filesystem path, `file:` URL) goes
//! through the same decompress → deserialize → recompile path in
//! [`read_model`]; the patterns are always recompiled from text rather
//! than trusted as-is.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};

use crate::error::NlpError;
use crate::pattern::PatternSet;

/// Highest model format version this crate understands.
pub const MODEL_VERSION: u32 = 1;

/// Name of the model compiled into the crate.
pub const BUNDLED_MODEL_NAME: &str = "time_exp.m";

static BUNDLED_MODEL: &[u8] = include_bytes!("../resources/time_exp.m");

/// The serialized form of a pattern model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternModel {
    pub version: u32,
    pub patterns: Vec<String>,
}

impl PatternModel {
    pub fn new(patterns: Vec<String>) -> Self {
        Self {
            version: MODEL_VERSION,
            patterns,
        }
    }
}

/// Where a model is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelSource {
    /// A resource embedded in the crate, by name.
    Bundled(String),
    /// A local file.
    Path(PathBuf),
    /// A URL. Only `file:` URLs are readable.
    Url(String),
}

impl Default for ModelSource {
    fn default() -> Self {
        ModelSource::Bundled(BUNDLED_MODEL_NAME.to_string())
    }
}

impl ModelSource {
    /// Interpret a locator string.
    ///
    /// - `bundled:<name>`, `resource:<name>`, `classpath:<name>` → [`ModelSource::Bundled`]
    /// - anything with a `scheme:` prefix of two or more letters → [`ModelSource::Url`]
    /// - everything else → [`ModelSource::Path`]
    ///
    /// # Examples
    ///
    /// ```
    /// use time_nlp::model::ModelSource;
    ///
    /// assert_eq!(
    ///     ModelSource::parse("classpath:/time_exp.m"),
    ///     ModelSource::Bundled("time_exp.m".to_string())
    /// );
    /// assert!(matches!(ModelSource::parse("file:///tmp/m.gz"), ModelSource::Url(_)));
    /// assert!(matches!(ModelSource::parse("models/time_exp.m"), ModelSource::Path(_)));
    /// ```
    pub fn parse(locator: &str) -> Self {
        for prefix in ["bundled:", "resource:", "classpath:"] {
            if let Some(name) = locator.strip_prefix(prefix) {
                return ModelSource::Bundled(name.trim_start_matches('/').to_string());
            }
        }
        if has_url_scheme(locator) {
            return ModelSource::Url(locator.to_string());
        }
        ModelSource::Path(PathBuf::from(locator))
    }
}

impl std::fmt::Display for ModelSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelSource::Bundled(name) => write!(f, "bundled:{name}"),
            ModelSource::Path(path) => write!(f, "{}", path.display()),
            ModelSource::Url(url) => f.write_str(url),
        }
    }
}

/// A scheme is two or more ASCII letters before a `:`, which keeps
/// Windows drive letters (`C:\...`) on the path side.
fn has_url_scheme(s: &str) -> bool {
    match s.split_once(':') {
        Some((scheme, _)) => {
            scheme.len() >= 2
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
                && scheme.starts_with(|c: char| c.is_ascii_alphabetic())
        }
        None => false,
    }
}

/// Load and compile a pattern set.
///
/// # Errors
///
/// Returns [`NlpError::ModelLoad`] if the source is missing or unreadable,
/// the gzip stream or JSON payload is corrupt, the model version is
/// unsupported, or any pattern fails to compile.
pub fn load(source: &ModelSource) -> Result<PatternSet, NlpError> {
    let patterns = match source {
        ModelSource::Bundled(name) => {
            if name != BUNDLED_MODEL_NAME {
                return Err(NlpError::ModelLoad(format!(
                    "no bundled resource named '{name}'"
                )));
            }
            read_model(BUNDLED_MODEL)?
        }
        ModelSource::Path(path) => read_model(open(path)?)?,
        ModelSource::Url(url) => read_model(open(&file_url_path(url)?)?)?,
    };
    tracing::debug!(source = %source, patterns = patterns.len(), "loaded pattern model");
    Ok(patterns)
}

/// Decode a gzip-compressed JSON model from any reader and compile it.
pub fn read_model<R: Read>(reader: R) -> Result<PatternSet, NlpError> {
    let decoder = GzDecoder::new(reader);
    let model: PatternModel = serde_json::from_reader(BufReader::new(decoder))
        .map_err(|e| NlpError::ModelLoad(format!("cannot decode model: {e}")))?;

    if model.version > MODEL_VERSION {
        return Err(NlpError::ModelLoad(format!(
            "unsupported model version {} (max {MODEL_VERSION})",
            model.version
        )));
    }

    PatternSet::compile(&model.patterns)
}

/// Serialize and gzip-compress a model to `path`.
pub fn write_model(model: &PatternModel, path: &Path) -> Result<(), NlpError> {
    let file = File::create(path)
        .map_err(|e| NlpError::ModelLoad(format!("'{}': {e}", path.display())))?;
    let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
    serde_json::to_writer(&mut encoder, model)
        .map_err(|e| NlpError::ModelLoad(format!("cannot encode model: {e}")))?;
    encoder
        .finish()
        .and_then(|mut w| w.flush())
        .map_err(|e| NlpError::ModelLoad(format!("'{}': {e}", path.display())))?;
    tracing::debug!(path = %path.display(), patterns = model.patterns.len(), "wrote pattern model");
    Ok(())
}

fn open(path: &Path) -> Result<File, NlpError> {
    File::open(path).map_err(|e| NlpError::ModelLoad(format!("'{}': {e}", path.display())))
}

/// Map a `file:` URL to a local path. `file:///a/b`, `file://localhost/a/b`
/// and `file:/a/b` are accepted; percent-escapes are not decoded.
fn file_url_path(url: &str) -> Result<PathBuf, NlpError> {
    let Some(rest) = url.strip_prefix("file:") else {
        return Err(NlpError::ModelLoad(format!(
            "unsupported model URL '{url}': only file: URLs can be read"
        )));
    };
    let path = match rest.strip_prefix("//") {
        Some(authority_and_path) => {
            let slash = authority_and_path.find('/').ok_or_else(|| {
                NlpError::ModelLoad(format!("model URL '{url}' has no path"))
            })?;
            let (host, path) = authority_and_path.split_at(slash);
            if !host.is_empty() && host != "localhost" {
                return Err(NlpError::ModelLoad(format!(
                    "model URL '{url}' names remote host '{host}'"
                )));
            }
            path
        }
        None => rest,
    };
    if path.is_empty() {
        return Err(NlpError::ModelLoad(format!("model URL '{url}' has no path")));
    }
    Ok(PathBuf::from(path))
}
