use std::path::PathBuf;

use thiserror::Error;

/// Rejected board edits made while laying out the initial toppings.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum BoardError {
    #[error("square {0} is a plate square, stock the plate instead")]
    PlateSquare(usize),
    #[error("plate {0} does not exist")]
    NoSuchPlate(usize),
    #[error("plate {0} is full")]
    PlateFull(usize),
}

/// Failures while retrieving models from echo3D or managing the download directory.
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("request to echo3D failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("echo3D answered {status} for entry {entry}")]
    Status {
        entry: String,
        status: reqwest::StatusCode,
    },
    #[error("echo3D has no entry {0}")]
    MissingEntry(String),
    #[error("model {0} is not listed in the manifest")]
    UnknownModel(String),
    #[error("invalid JSON in {what}: {source}")]
    Json {
        what: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("could not start the fetch thread: {0}")]
    Worker(#[source] std::io::Error),
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl AssetError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AssetError::Io {
            path: path.into(),
            source,
        }
    }
}
