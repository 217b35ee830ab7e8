use crate::core::model::{ProfileKind, QualityProfile};

pub const DEFAULT_KEY: &str = "best";

/// Fixed, ordered set of quality presets. Built once in `main` and passed by
/// reference; ordinal selection follows this order.
#[derive(Debug, Clone)]
pub struct QualityCatalog {
    profiles: Vec<QualityProfile>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fallback {
    Empty,
    Unrecognized(String),
    OutOfRange(usize),
}

#[derive(Debug, Clone)]
pub struct Resolved<'a> {
    pub profile: &'a QualityProfile,
    /// Set when the input did not name a profile and `best` was used instead.
    pub fallback: Option<Fallback>,
}

impl QualityCatalog {
    pub fn standard() -> Self {
        let video = |key, height: u32, selector, label| QualityProfile {
            key,
            format_selector: selector,
            label,
            kind: ProfileKind::Video,
            max_height: Some(height),
        };

        Self {
            profiles: vec![
                QualityProfile {
                    key: DEFAULT_KEY,
                    format_selector: "bestvideo+bestaudio/best",
                    label: "Best available quality",
                    kind: ProfileKind::Video,
                    max_height: None,
                },
                video("1080", 1080, "bestvideo[height<=1080]+bestaudio/best[height<=1080]", "Full HD (1080p)"),
                video("720", 720, "bestvideo[height<=720]+bestaudio/best[height<=720]", "HD (720p)"),
                video("480", 480, "bestvideo[height<=480]+bestaudio/best[height<=480]", "SD (480p)"),
                video("360", 360, "bestvideo[height<=360]+bestaudio/best[height<=360]", "Low (360p)"),
                QualityProfile {
                    key: "audio",
                    format_selector: "bestaudio/best",
                    label: "Audio only (MP3)",
                    kind: ProfileKind::Audio,
                    max_height: None,
                },
            ],
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &QualityProfile> {
        self.profiles.iter()
    }

    pub fn keys(&self) -> Vec<&'static str> {
        self.profiles.iter().map(|p| p.key).collect()
    }

    pub fn get(&self, key: &str) -> Option<&QualityProfile> {
        self.profiles.iter().find(|p| p.key.eq_ignore_ascii_case(key))
    }

    pub fn default_profile(&self) -> &QualityProfile {
        self.get(DEFAULT_KEY).unwrap_or(&self.profiles[0])
    }

    /// Key (case-insensitive) first, then 1-based ordinal. Anything else,
    /// including empty input, falls back to `best` with a fallback marker.
    pub fn resolve(&self, input: &str) -> Resolved<'_> {
        let input = input.trim();
        if input.is_empty() {
            tracing::warn!("no quality given, using {}", DEFAULT_KEY);
            return Resolved { profile: self.default_profile(), fallback: Some(Fallback::Empty) };
        }

        if let Some(profile) = self.get(input) {
            return Resolved { profile, fallback: None };
        }

        let fallback = match input.parse::<usize>() {
            Ok(n) if n >= 1 && n <= self.profiles.len() => {
                return Resolved { profile: &self.profiles[n - 1], fallback: None };
            }
            Ok(n) => Fallback::OutOfRange(n),
            Err(_) => Fallback::Unrecognized(input.to_string()),
        };

        tracing::warn!(input, ?fallback, "unknown quality, using {}", DEFAULT_KEY);
        Resolved { profile: self.default_profile(), fallback: Some(fallback) }
    }
}
