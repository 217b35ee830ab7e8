use crate::core::model::QualityProfile;
use sanitize_filename::{sanitize_with_options, Options};
use std::path::{Path, PathBuf};

const MAX_TITLE_CHARS: usize = 200;
const FALLBACK_TITLE: &str = "video";

const VIDEO_EXTS: &[&str] = &["mp4", "mkv", "webm"];
const AUDIO_EXTS: &[&str] = &["mp3", "m4a", "opus", "webm"];

/// Filename-safe title: illegal characters removed, whitespace collapsed,
/// trimmed, at most 200 characters.
pub fn sanitize_title(title: &str) -> String {
    // Tabs and newlines count as control characters to the sanitizer; turn them
    // into plain spaces first.
    let spaced = collapse_whitespace(title);
    let cleaned = sanitize_with_options(
        spaced,
        Options { windows: true, truncate: false, replacement: "" },
    );
    let collapsed = collapse_whitespace(&cleaned);
    let truncated: String = collapsed.chars().take(MAX_TITLE_CHARS).collect();
    let truncated = truncated.trim().to_string();

    if truncated.is_empty() {
        FALLBACK_TITLE.to_string()
    } else {
        truncated
    }
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// `(template, stem)`: the `-o` template handed to the tool and the same path
/// without extension.
pub fn output_paths(out_dir: &Path, title: &str) -> (String, PathBuf) {
    let name = sanitize_title(title);
    let stem = out_dir.join(&name);
    let template = out_dir.join(format!("{}.%(ext)s", name));
    (template.to_string_lossy().to_string(), stem)
}

/// Expected file first, then the same stem with other containers the tool may
/// leave behind.
pub fn candidate_paths(stem: &Path, profile: &QualityProfile) -> Vec<PathBuf> {
    let exts = if profile.is_audio() { AUDIO_EXTS } else { VIDEO_EXTS };
    let expected = profile.final_extension();

    std::iter::once(expected)
        .chain(exts.iter().copied().filter(|e| *e != expected))
        .map(|ext| with_extension(stem, ext))
        .collect()
}

// `Path::with_extension` would swallow anything after a dot in the title.
fn with_extension(stem: &Path, ext: &str) -> PathBuf {
    let mut s = stem.as_os_str().to_os_string();
    s.push(".");
    s.push(ext);
    PathBuf::from(s)
}

pub async fn locate_output(candidates: &[PathBuf]) -> Option<(PathBuf, u64)> {
    for path in candidates {
        if let Ok(meta) = tokio::fs::metadata(path).await {
            if meta.is_file() {
                return Some((path.clone(), meta.len()));
            }
        }
    }
    None
}

pub async fn list_dir(dir: &Path) -> std::io::Result<Vec<String>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        names.push(entry.file_name().to_string_lossy().to_string());
    }
    names.sort();
    Ok(names)
}
