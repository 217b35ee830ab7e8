use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum InputError {
    #[error("no video URL given")]
    EmptyUrl,
}

#[derive(thiserror::Error, Debug)]
pub enum MetadataFetchError {
    #[error("download tool not found: {}", .0.display())]
    ToolNotFound(PathBuf),

    #[error("failed to start download tool: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("timed out fetching video info after {0}s")]
    Timeout(u64),

    #[error("video info request failed (exit code {code:?}): {stderr}")]
    Failed { code: Option<i32>, stderr: String },

    #[error("download tool returned invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(thiserror::Error, Debug)]
pub enum ExecutionError {
    #[error("download tool not found: {}", .0.display())]
    ToolNotFound(PathBuf),

    #[error("failed to start download tool: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("io error while downloading: {0}")]
    Io(#[from] std::io::Error),

    /// `None` when the process was killed by a signal.
    #[error("download tool exited with unexpected status {}", .code.map(|c| c.to_string()).unwrap_or_else(|| "(signal)".into()))]
    UnexpectedExit { code: Option<i32> },

    #[error("download interrupted")]
    Interrupted,
}
