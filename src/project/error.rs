//! 产物存储错误

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("Invalid artifact name: '{0}'")]
    InvalidName(String),

    /// 目标路径上的目录无法清除
    #[error("Directory conflict at {path}: {reason}")]
    DirectoryConflict { path: PathBuf, reason: String },

    #[error("File write verification failed - content mismatch at {path}")]
    WriteVerification { path: PathBuf },

    #[error("Page {path} does not exist. Use createPage instead.")]
    PageMissing { path: String },

    #[error("Could not find closing tag to insert section")]
    NoClosingTag,

    #[error("Could not find opening tag")]
    NoOpeningTag,

    #[error("Path escape attempt: {0}")]
    PathEscape(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ArtifactError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
