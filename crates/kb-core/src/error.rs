// kb-core/src/error.rs
//! 错误类型

use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, KbError>;

#[derive(Debug, thiserror::Error)]
pub enum KbError {
    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("file watcher error: {0}")]
    Watch(#[from] notify::Error),

    /// 查询为空或只包含空白
    #[error("{0}")]
    Validation(String),

    #[error("document not found: {0}")]
    NotFound(String),

    #[error("path {0:?} is outside the knowledge base root")]
    OutsideRoot(PathBuf),

    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl KbError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        KbError::Io {
            path: path.into(),
            source,
        }
    }
}
