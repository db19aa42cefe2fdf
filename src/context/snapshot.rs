//! 侧车快照：`<project_root>/<sidecar_file>` 中的跨运行元数据
//!
//! 文件格式：`{"metadata": {createdAt, lastModified, totalIterations, lastAction, lastDetails}}`。
//! 只保存元数据，不保存文件内容。

use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::context::ProjectMetadata;

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("Snapshot I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Snapshot at {path} is not valid JSON: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotFile {
    metadata: ProjectMetadata,
}

/// 侧车文件读写
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 读取元数据；文件不存在时返回 None
    pub fn load(&self) -> Result<Option<ProjectMetadata>, SnapshotError> {
        let data = match std::fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(SnapshotError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        let file: SnapshotFile = serde_json::from_str(&data).map_err(|source| SnapshotError::Json {
            path: self.path.clone(),
            source,
        })?;
        Ok(Some(file.metadata))
    }

    /// 写入元数据；父目录不存在时自动创建
    pub fn save(&self, metadata: &ProjectMetadata) -> Result<(), SnapshotError> {
        let io = |source| SnapshotError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(io)?;
        }
        let body = serde_json::to_string_pretty(&SnapshotFile {
            metadata: metadata.clone(),
        })
        .map_err(|source| SnapshotError::Json {
            path: self.path.clone(),
            source,
        })?;
        std::fs::write(&self.path, body).map_err(io)
    }

    /// 读取元数据，不存在则新建并写入
    pub fn load_or_create(&self) -> Result<ProjectMetadata, SnapshotError> {
        match self.load()? {
            Some(metadata) => Ok(metadata),
            None => {
                let metadata = ProjectMetadata::new();
                self.save(&metadata)?;
                tracing::debug!(path = %self.path.display(), "sidecar created");
                Ok(metadata)
            }
        }
    }

    /// 记录一次成功的变更动作：更新 lastModified、totalIterations + 1、lastAction / lastDetails
    pub fn record_action(&self, action: &str, details: &str) -> Result<ProjectMetadata, SnapshotError> {
        let mut metadata = self.load()?.unwrap_or_default();
        metadata.last_modified = Utc::now();
        metadata.total_iterations += 1;
        metadata.last_action = Some(action.to_string());
        metadata.last_details = Some(details.to_string());
        self.save(&metadata)?;
        Ok(metadata)
    }
}
