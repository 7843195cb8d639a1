use std::path::{Path, PathBuf};

use thiserror::Error;

/// Everything a conversion pipeline can fail with.
///
/// Variants mirror the failure classes of the toolchain: identifier and
/// structure problems abort the document being processed, precondition
/// violations abort before any output is written.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// An identifier taken from the source does not satisfy XML name rules.
    #[error("invalid unit id \"{id}\": {reason}")]
    InvalidUnitId { id: String, reason: String },

    /// Downgrade input does not declare an XLIFF 2.x version.
    #[error("unsupported XLIFF version \"{0}\"")]
    UnsupportedVersion(String),

    /// Join inputs disagree on version or languages.
    #[error("incompatible inputs: {0}")]
    IncompatibleInputs(String),

    /// The XLIFF tree lacks a required child or attribute.
    #[error("structural error: {0}")]
    StructuralError(String),

    /// A skeleton marker has no matching translation unit.
    #[error("skeleton references unit {0}, which is not present in the XLIFF document")]
    UnresolvedUnit(u32),

    #[error("selected file is not supported: {0}")]
    UnsupportedFormat(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("xml error in {context}: {message}")]
    Xml { context: String, message: String },

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ConvertError {
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        ConvertError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn xml(context: impl Into<String>, message: impl ToString) -> Self {
        ConvertError::Xml {
            context: context.into(),
            message: message.to_string(),
        }
    }

    pub fn structural(message: impl Into<String>) -> Self {
        ConvertError::StructuralError(message.into())
    }
}

pub type Result<T> = std::result::Result<T, ConvertError>;
