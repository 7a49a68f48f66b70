//! 错误类型

use std::path::PathBuf;

/// 后端错误
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// 后端初始化失败（如缺少原生库或音频设备）
    #[error("Backend unavailable: {0}")]
    Unavailable(String),
    #[error("Operation not supported: {0}")]
    Unsupported(&'static str),
    #[error("Failed to open media: {0}")]
    Open(String),
    #[error("Stream error: {0}")]
    Stream(String),
}

/// 加载错误，发生后引擎回到 `Idle`
#[derive(thiserror::Error, Debug)]
pub enum LoadError {
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("Not a regular file: {}", .0.display())]
    NotAFile(PathBuf),
    #[error("Cannot read {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Backend rejected {}: {source}", path.display())]
    Rejected {
        path: PathBuf,
        #[source]
        source: BackendError,
    },
}

/// 播放命令错误
#[derive(thiserror::Error, Debug)]
pub enum PlayerError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error("Playback error: {0}")]
    Backend(#[from] BackendError),
}
