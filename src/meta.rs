//! Post metadata record (`meta.json`).
//!
//! The only field the build relies on is `title`. Any other keys authors keep
//! in the record (dates, tags, drafts notes) are ignored.

use serde::Deserialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MetaError {
    #[error("Metadata record does not exist: {}", .0.display())]
    Missing(PathBuf),
    #[error("Cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Invalid JSON in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Metadata record has no title: {}", .0.display())]
    MissingTitle(PathBuf),
}

#[derive(Debug, Deserialize)]
struct RawMeta {
    title: Option<String>,
}

/// Validated post metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostMeta {
    pub title: String,
}

impl PostMeta {
    /// Read and validate a metadata record. The title is trimmed and must not be empty.
    pub fn load(path: &Path) -> Result<Self, MetaError> {
        if !path.is_file() {
            return Err(MetaError::Missing(path.to_path_buf()));
        }
        let content = fs::read_to_string(path).map_err(|source| MetaError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content, path)
    }

    fn parse(content: &str, path: &Path) -> Result<Self, MetaError> {
        let raw: RawMeta = serde_json::from_str(content).map_err(|source| MetaError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        raw.title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .map(|title| PostMeta { title })
            .ok_or_else(|| MetaError::MissingTitle(path.to_path_buf()))
    }
}
