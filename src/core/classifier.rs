//! Turns the download tool's stdout into [`ProgressEvent`]s.
//!
//! Input arrives in arbitrary chunks; only complete lines are classified and a
//! trailing partial line is held until more data or end of stream. Each line is
//! matched against [`grammar`], an ordered table where the first matching rule
//! wins. Unmatched lines are dropped.

use crate::core::events::{DownloadProgress, Phase, ProgressEvent, StderrNotice};
use crate::core::phase::PhaseTracker;
use futures::stream::{self, Stream};
use regex::{Captures, Regex};
use std::collections::VecDeque;
use std::io;
use std::sync::OnceLock;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Bumped whenever a rule is added, removed or reordered.
pub const GRAMMAR_VERSION: u32 = 1;

type Apply = fn(&mut OutputClassifier, &str, &Captures<'_>) -> Option<ProgressEvent>;

pub struct Rule {
    pub name: &'static str,
    pub pattern: Regex,
    apply: Apply,
}

impl Rule {
    fn new(name: &'static str, pattern: &str, apply: Apply) -> Self {
        Self {
            name,
            pattern: Regex::new(pattern).expect("grammar pattern"),
            apply,
        }
    }
}

/// Rules in priority order.
pub fn grammar() -> &'static [Rule] {
    static GRAMMAR: OnceLock<Vec<Rule>> = OnceLock::new();
    GRAMMAR.get_or_init(|| {
        vec![
            Rule::new(
                "download-percent",
                r"^\[download\]\s+(?P<pct>\d+(?:\.\d+)?)%",
                OutputClassifier::on_percent,
            ),
            Rule::new(
                "destination",
                r"^\[download\]\s+Destination:\s*(?P<path>.+)$",
                OutputClassifier::on_destination,
            ),
            Rule::new(
                "download-finished",
                r"(?P<already>has already been downloaded)|^\[download\]\s+(?:Download completed|Finished downloading)",
                OutputClassifier::on_download_finished,
            ),
            Rule::new(
                "merge",
                r"^\[(?:Merger|VideoRemuxer|ffmpeg)\]",
                OutputClassifier::on_merge,
            ),
            Rule::new(
                "cleanup",
                r"Deleting original file",
                OutputClassifier::on_cleanup,
            ),
            Rule::new(
                "embed-metadata",
                r"^\[(?:EmbedThumbnail|Metadata|ThumbnailsConvertor)\]",
                OutputClassifier::on_embed,
            ),
        ]
    })
}

/// Name of the first rule matching `line`.
pub fn matching_rule(line: &str) -> Option<&'static str> {
    grammar().iter().find(|r| r.pattern.is_match(line)).map(|r| r.name)
}

struct Fields {
    size: Regex,
    speed: Regex,
    eta: Regex,
}

fn fields() -> &'static Fields {
    static FIELDS: OnceLock<Fields> = OnceLock::new();
    FIELDS.get_or_init(|| Fields {
        size: Regex::new(r"\bof\s+~?\s*(?P<v>\S+)").expect("size pattern"),
        speed: Regex::new(r"\bat\s+(?P<v>\S+/s)").expect("speed pattern"),
        eta: Regex::new(r"\bETA\s+(?P<v>\S+)").expect("eta pattern"),
    })
}

fn capture(re: &Regex, line: &str) -> Option<String> {
    re.captures(line).and_then(|c| c.name("v")).map(|m| m.as_str().to_string())
}

/// Splits a byte stream on `\n` / `\r`, keeping the unterminated tail.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        for &b in chunk {
            if b == b'\n' || b == b'\r' {
                if !self.pending.is_empty() {
                    lines.push(String::from_utf8_lossy(&self.pending).into_owned());
                    self.pending.clear();
                }
            } else {
                self.pending.push(b);
            }
        }
        lines
    }

    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let line = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        Some(line)
    }
}

#[derive(Debug, Default)]
pub struct OutputClassifier {
    lines: LineBuffer,
    tracker: PhaseTracker,
    last_percent: Option<f64>,
    destination: Option<String>,
}

impl OutputClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        self.tracker.current()
    }

    pub fn merge_observed(&self) -> bool {
        self.tracker.merge_observed()
    }

    pub fn destination(&self) -> Option<&str> {
        self.destination.as_deref()
    }

    pub fn feed(&mut self, chunk: &[u8]) -> Vec<ProgressEvent> {
        self.lines
            .push(chunk)
            .iter()
            .filter_map(|line| self.classify_line(line))
            .collect()
    }

    /// Classifies whatever partial line is left at end of stream.
    pub fn finish(&mut self) -> Vec<ProgressEvent> {
        match self.lines.finish() {
            Some(line) => self.classify_line(&line).into_iter().collect(),
            None => vec![],
        }
    }

    pub fn classify_line(&mut self, line: &str) -> Option<ProgressEvent> {
        let line = line.trim_end();
        for rule in grammar() {
            if let Some(caps) = rule.pattern.captures(line) {
                tracing::trace!(rule = rule.name, line, "classified");
                return (rule.apply)(self, line, &caps);
            }
        }
        None
    }

    fn on_percent(&mut self, line: &str, caps: &Captures<'_>) -> Option<ProgressEvent> {
        let percent: f64 = caps.name("pct")?.as_str().parse().ok()?;
        self.tracker.advance(Phase::Downloading);

        // One event per whole percent; 100 always gets through once.
        let emit = match self.last_percent {
            None => true,
            Some(last) => percent.floor() > last.floor() || (percent == 100.0 && last != 100.0),
        };
        if !emit {
            return None;
        }
        self.last_percent = Some(percent);

        let f = fields();
        Some(ProgressEvent::Downloading(DownloadProgress {
            percent,
            approx_size: capture(&f.size, line),
            speed: capture(&f.speed, line),
            eta: capture(&f.eta, line),
        }))
    }

    fn on_destination(&mut self, _line: &str, caps: &Captures<'_>) -> Option<ProgressEvent> {
        let path = caps.name("path")?.as_str().trim().to_string();
        tracing::debug!(destination = %path, "stream started");
        self.tracker.advance(Phase::Downloading);
        // Percent state spans streams so the run as a whole never goes backwards.
        self.destination = Some(path);
        None
    }

    fn on_download_finished(&mut self, _line: &str, caps: &Captures<'_>) -> Option<ProgressEvent> {
        if self.tracker.current() == Phase::Merging {
            return None;
        }
        self.tracker.advance(Phase::Downloading);
        Some(ProgressEvent::DownloadFinished {
            already_present: caps.name("already").is_some(),
        })
    }

    fn on_merge(&mut self, _line: &str, _caps: &Captures<'_>) -> Option<ProgressEvent> {
        self.tracker
            .advance(Phase::Merging)
            .then_some(ProgressEvent::PhaseChanged(Phase::Merging))
    }

    fn on_cleanup(&mut self, line: &str, _caps: &Captures<'_>) -> Option<ProgressEvent> {
        Some(ProgressEvent::CleaningUp { detail: line.trim().to_string() })
    }

    fn on_embed(&mut self, _line: &str, _caps: &Captures<'_>) -> Option<ProgressEvent> {
        self.tracker
            .advance(Phase::EmbeddingMetadata)
            .then_some(ProgressEvent::PhaseChanged(Phase::EmbeddingMetadata))
    }
}

/// Lazily classifies a sequence of chunks. Used directly by tests; the
/// subprocess path goes through [`event_stream`].
pub struct Events<I> {
    chunks: I,
    classifier: OutputClassifier,
    pending: VecDeque<ProgressEvent>,
    done: bool,
}

impl<I, C> Iterator for Events<I>
where
    I: Iterator<Item = C>,
    C: AsRef<[u8]>,
{
    type Item = ProgressEvent;

    fn next(&mut self) -> Option<ProgressEvent> {
        loop {
            if let Some(ev) = self.pending.pop_front() {
                return Some(ev);
            }
            if self.done {
                return None;
            }
            match self.chunks.next() {
                Some(chunk) => {
                    let evs = self.classifier.feed(chunk.as_ref());
                    self.pending.extend(evs);
                }
                None => {
                    self.done = true;
                    let evs = self.classifier.finish();
                    self.pending.extend(evs);
                }
            }
        }
    }
}

pub fn classify_chunks<I>(chunks: I) -> Events<I::IntoIter>
where
    I: IntoIterator,
    I::Item: AsRef<[u8]>,
{
    Events {
        chunks: chunks.into_iter(),
        classifier: OutputClassifier::new(),
        pending: VecDeque::new(),
        done: false,
    }
}

struct StreamState<R> {
    reader: R,
    classifier: OutputClassifier,
    pending: VecDeque<ProgressEvent>,
    done: bool,
}

/// Pull-based event stream over an async reader. Ends after the reader hits
/// EOF and any trailing partial line has been classified; a read error is
/// yielded once and terminates the stream.
pub fn event_stream<R>(reader: R) -> impl Stream<Item = io::Result<ProgressEvent>>
where
    R: AsyncRead + Unpin,
{
    let state = StreamState {
        reader,
        classifier: OutputClassifier::new(),
        pending: VecDeque::new(),
        done: false,
    };

    stream::unfold(state, |mut st| async move {
        let mut buf = [0u8; 4096];
        loop {
            if let Some(ev) = st.pending.pop_front() {
                return Some((Ok(ev), st));
            }
            if st.done {
                return None;
            }
            match st.reader.read(&mut buf).await {
                Ok(0) => {
                    st.done = true;
                    let evs = st.classifier.finish();
                    tracing::debug!(
                        phase = %st.classifier.phase(),
                        merge_observed = st.classifier.merge_observed(),
                        destination = st.classifier.destination(),
                        "stdout closed"
                    );
                    st.pending.extend(evs);
                }
                Ok(n) => {
                    let evs = st.classifier.feed(&buf[..n]);
                    st.pending.extend(evs);
                }
                Err(e) => {
                    st.done = true;
                    return Some((Err(e), st));
                }
            }
        }
    })
}

/// Stderr lines are classified on their own, without phase state.
pub fn classify_stderr_line(line: &str) -> Option<StderrNotice> {
    let line = line.trim();
    let lower = line.to_ascii_lowercase();
    let about_helper = lower.contains("ffmpeg") || lower.contains("ffprobe");

    if line.contains("ERROR") {
        if about_helper {
            return Some(StderrNotice::HelperMissing(line.to_string()));
        }
        return Some(StderrNotice::Fatal(line.to_string()));
    }

    if line.contains("WARNING") {
        if lower.contains("unable to download") {
            return Some(StderrNotice::Warning(line.to_string()));
        }
        if about_helper {
            return Some(StderrNotice::HelperMissing(line.to_string()));
        }
    }

    None
}
