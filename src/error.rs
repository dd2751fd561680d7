//! Error taxonomy for loading and querying region stores.

use std::path::PathBuf;
use thiserror::Error;

/// Failures that abort construction of a [`RegionStore`](crate::store::RegionStore).
///
/// A store is never exposed half-loaded: any of these ends the build.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("geometry source not found: {}", path.display())]
    SourceNotFound { path: PathBuf },

    #[error("failed to read geometry source {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse geometry source: {0}")]
    Parse(String),

    #[error("no usable features in geometry source ({read} read, {skipped} skipped)")]
    NoUsableFeatures { read: usize, skipped: usize },

    #[error("too many malformed features: {skipped} skipped, limit is {limit}")]
    TooManySkipped { skipped: usize, limit: usize },
}

impl LoadError {
    /// Whether retrying the load could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            LoadError::Io { source, .. } => !matches!(
                source.kind(),
                std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied
            ),
            _ => false,
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, Error>;
