use std::path::PathBuf;

use thiserror::Error;

/// Failure while turning one script file into scene records.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("io error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed pdf {}: {source}", .path.display())]
    Pdf {
        path: PathBuf,
        #[source]
        source: lopdf::Error,
    },

    #[error("no extractable text in {}", .0.display())]
    NoText(PathBuf),

    #[error("unsupported input type: {}", .0.display())]
    Unsupported(PathBuf),

    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl IngestError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        IngestError::Io {
            path: path.into(),
            source,
        }
    }
}
