use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

/// Whether the muxing helper can be used, and where the download tool should
/// look for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Muxer {
    Missing,
    OnPath,
    At(PathBuf),
}

impl Muxer {
    pub fn is_available(&self) -> bool {
        !matches!(self, Muxer::Missing)
    }
}

pub async fn probe(bin: &Path) -> Muxer {
    let status = Command::new(bin)
        .arg("-version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .status()
        .await;

    match status {
        Ok(s) if s.success() => {
            if bin == Path::new(super::DEFAULT_BIN) {
                Muxer::OnPath
            } else {
                Muxer::At(bin.to_path_buf())
            }
        }
        Ok(s) => {
            tracing::debug!(bin = %bin.display(), code = ?s.code(), "ffmpeg probe failed");
            Muxer::Missing
        }
        Err(e) => {
            tracing::debug!(bin = %bin.display(), error = %e, "ffmpeg not runnable");
            Muxer::Missing
        }
    }
}
