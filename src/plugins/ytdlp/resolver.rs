use crate::core::error::MetadataFetchError;
use crate::core::model::VideoInfo;
use crate::plugins::registry::{MetadataResolver, ToolContext};
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

pub struct YtDlpResolver;

impl YtDlpResolver {
    pub fn new() -> Self {
        Self
    }
}

fn is_youtube_url(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    lower.contains("youtube.com") || lower.contains("youtu.be")
}

#[async_trait]
impl MetadataResolver for YtDlpResolver {
    fn name(&self) -> &'static str {
        "yt-dlp"
    }

    // yt-dlp understands far more than YouTube, so anything non-empty is a
    // candidate.
    fn can_handle(&self, url: &str) -> u8 {
        match url.trim() {
            "" => 0,
            u if is_youtube_url(u) => 90,
            _ => 50,
        }
    }

    async fn resolve(&self, url: &str, ctx: &ToolContext) -> Result<VideoInfo, MetadataFetchError> {
        tracing::info!(url, "fetching video info");

        let mut cmd = Command::new(&ctx.ytdlp_bin);
        cmd.args(["--dump-single-json", "--no-playlist", "--skip-download", "--no-warnings", "--"])
            .arg(url)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let out = tokio::time::timeout(Duration::from_secs(ctx.info_timeout_secs), cmd.output())
            .await
            .map_err(|_| MetadataFetchError::Timeout(ctx.info_timeout_secs))?
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => MetadataFetchError::ToolNotFound(ctx.ytdlp_bin.clone()),
                _ => MetadataFetchError::Spawn(e),
            })?;

        if !out.status.success() {
            let stderr = String::from_utf8_lossy(&out.stderr).trim().to_string();
            tracing::warn!(code = ?out.status.code(), "video info request failed");
            return Err(MetadataFetchError::Failed { code: out.status.code(), stderr });
        }

        let info: VideoInfo = serde_json::from_slice(&out.stdout)?;
        tracing::debug!(id = %info.id, title = %info.title, "video info decoded");
        Ok(info)
    }
}
