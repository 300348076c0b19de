use harvest_common::InvalidWindow;
use harvest_social::SocialError;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum CollectError {
    #[error(transparent)]
    Social(#[from] SocialError),
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("json encoding: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Window(#[from] InvalidWindow),
    #[error("keyword pattern: {0}")]
    Filter(#[from] regex::Error),
    #[error("{0}")]
    Setup(String),
}

impl CollectError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CollectError::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether the run has to stop; only disabled comments are skippable.
    pub fn is_fatal(&self) -> bool {
        match self {
            CollectError::Social(e) => e.is_fatal(),
            _ => true,
        }
    }
}
