use std::fmt;
use std::path::PathBuf;

/// Lifecycle stage of one download. Declaration order is the forward order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    NotStarted,
    Downloading,
    Merging,
    EmbeddingMetadata,
    CleaningUp,
    Completed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::NotStarted => "not started",
            Phase::Downloading => "downloading",
            Phase::Merging => "merging",
            Phase::EmbeddingMetadata => "embedding metadata",
            Phase::CleaningUp => "cleaning up",
            Phase::Completed => "completed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DownloadProgress {
    pub percent: f64,
    pub approx_size: Option<String>,
    pub speed: Option<String>,
    pub eta: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    Downloading(DownloadProgress),
    /// Raw streams are on disk; merging may still follow.
    DownloadFinished { already_present: bool },
    PhaseChanged(Phase),
    CleaningUp { detail: String },
}

impl ProgressEvent {
    pub fn phase(&self) -> Phase {
        match self {
            ProgressEvent::Downloading(_) | ProgressEvent::DownloadFinished { .. } => Phase::Downloading,
            ProgressEvent::PhaseChanged(p) => *p,
            ProgressEvent::CleaningUp { .. } => Phase::CleaningUp,
        }
    }

    pub fn percent(&self) -> Option<f64> {
        match self {
            ProgressEvent::Downloading(p) => Some(p.percent),
            _ => None,
        }
    }
}

/// Classified line from the tool's stderr.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StderrNotice {
    Fatal(String),
    /// An error about the optional muxing helper; output may still be usable.
    HelperMissing(String),
    Warning(String),
}

#[derive(Debug, Clone)]
pub enum EngineEvent {
    Spawned { program: String, args: Vec<String> },
    Progress(ProgressEvent),
    Notice(StderrNotice),
    /// None of the expected output files exist; `entries` lists `dir`.
    OutputMissing { dir: PathBuf, entries: Vec<String> },
    Info { scope: String, message: String },
}
