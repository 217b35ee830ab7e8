use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileKind {
    Video,
    Audio,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualityProfile {
    pub key: &'static str,
    pub format_selector: &'static str,
    pub label: &'static str,
    pub kind: ProfileKind,
    /// Vertical resolution ceiling; `None` for "best" and audio.
    pub max_height: Option<u32>,
}

impl QualityProfile {
    pub fn is_audio(&self) -> bool {
        self.kind == ProfileKind::Audio
    }

    /// Extension the download tool is asked to finalize to.
    pub fn final_extension(&self) -> &'static str {
        match self.kind {
            ProfileKind::Audio => "mp3",
            ProfileKind::Video => "mp4",
        }
    }
}

#[derive(Debug, Clone)]
pub struct DownloadRequest<'a> {
    pub source_url: String,
    pub quality: &'a QualityProfile,
    /// `<out_dir>/<title>.%(ext)s`
    pub output_template: String,
    /// `<out_dir>/<title>` without extension; used to probe the result.
    pub output_stem: PathBuf,
}

#[derive(Debug, Clone)]
pub struct DownloadOutcome {
    pub exit_code: i32,
    pub elapsed: Duration,
    pub resolved_path: Option<PathBuf>,
    pub file_size: Option<u64>,
    pub degraded: bool,
}

impl DownloadOutcome {
    pub fn elapsed_seconds(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }
}

/// Subset of the download tool's `--dump-single-json` output.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VideoInfo {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub uploader: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub view_count: Option<u64>,
    #[serde(default)]
    pub upload_date: Option<String>,
    #[serde(default)]
    pub filesize_approx: Option<u64>,
}

impl VideoInfo {
    pub fn author(&self) -> Option<&str> {
        self.channel.as_deref().or(self.uploader.as_deref())
    }

    /// `20240131` -> `2024-01-31`; anything else is passed through.
    pub fn upload_date_display(&self) -> Option<String> {
        let d = self.upload_date.as_deref()?;
        if d.len() == 8 && d.chars().all(|c| c.is_ascii_digit()) {
            Some(format!("{}-{}-{}", &d[0..4], &d[4..6], &d[6..8]))
        } else {
            Some(d.to_string())
        }
    }
}
