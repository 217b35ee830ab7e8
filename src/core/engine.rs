use crate::core::classifier::{classify_stderr_line, event_stream, GRAMMAR_VERSION};
use crate::core::error::ExecutionError;
use crate::core::events::{EngineEvent, Phase, ProgressEvent, StderrNotice};
use crate::core::model::{DownloadOutcome, DownloadRequest, QualityProfile};
use crate::core::output::{candidate_paths, list_dir, locate_output};
use crate::plugins::ffmpeg::probe::Muxer;
use crate::plugins::registry::ToolContext;
use futures::StreamExt;
use std::future::Future;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::time::Instant;

/// Reads stderr line by line until EOF. Lines are decoded lossily so a stray
/// non-UTF-8 byte never stops the pipe from being drained.
async fn drain_stderr<R>(stderr: R, tx: mpsc::UnboundedSender<EngineEvent>)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(stderr);
    let mut raw = Vec::new();
    loop {
        raw.clear();
        match reader.read_until(b'\n', &mut raw).await {
            Ok(0) => break,
            Ok(_) => {
                if raw.last() == Some(&b'\n') {
                    raw.pop();
                }
                let line = String::from_utf8_lossy(&raw);
                let line = line.trim_end();
                tracing::debug!(target: "orange_ytdl::stderr", "{}", line);
                if let Some(notice) = classify_stderr_line(line) {
                    if let StderrNotice::HelperMissing(_) = &notice {
                        tracing::warn!("{}", line);
                    }
                    let _ = tx.send(EngineEvent::Notice(notice));
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "stderr read failed, discarding the rest");
                let _ = tokio::io::copy(&mut reader, &mut tokio::io::sink()).await;
                break;
            }
        }
    }
}

/// Resolves on Ctrl-C. If the handler cannot be installed it never resolves.
async fn interrupt() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "cannot listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

/// Single-file selector used when streams cannot be merged locally.
pub fn single_file_selector(profile: &QualityProfile) -> String {
    if profile.is_audio() {
        return profile.format_selector.to_string();
    }
    match profile.max_height {
        Some(h) => format!("best[height<={h}]/best"),
        None => "best".to_string(),
    }
}

fn container_args(profile: &QualityProfile) -> &'static [&'static str] {
    if profile.is_audio() {
        &["--extract-audio", "--audio-format", "mp3"]
    } else {
        &["--merge-output-format", "mp4"]
    }
}

pub fn build_args(req: &DownloadRequest<'_>, muxer: &Muxer) -> Vec<String> {
    let profile = req.quality;
    let selector = if muxer.is_available() {
        profile.format_selector.to_string()
    } else {
        single_file_selector(profile)
    };

    let mut args = vec!["-f".to_string(), selector, "-o".to_string(), req.output_template.clone()];

    if muxer.is_available() {
        args.extend(container_args(profile).iter().map(|s| s.to_string()));
    }
    if let Muxer::At(path) = muxer {
        args.push("--ffmpeg-location".to_string());
        args.push(path.to_string_lossy().to_string());
    }

    args.push("--newline".to_string());
    args.push("--no-playlist".to_string());

    if profile.is_audio() {
        args.push("--embed-thumbnail".to_string());
        args.push("--add-metadata".to_string());
    }

    args.push("--".to_string());
    args.push(req.source_url.clone());
    args
}

/// Exit 0 is success; exit 1 is accepted too and counts as degraded only when
/// a merge was seen. Returns the degraded flag.
pub fn resolve_exit(code: Option<i32>, merge_observed: bool) -> Result<bool, ExecutionError> {
    match code {
        Some(0) => Ok(false),
        Some(1) => Ok(merge_observed),
        other => Err(ExecutionError::UnexpectedExit { code: other }),
    }
}

pub struct Engine {
    tools: ToolContext,
    muxer: Muxer,
    event_tx: mpsc::UnboundedSender<EngineEvent>,
}

impl Engine {
    pub fn new(tools: ToolContext, muxer: Muxer, event_tx: mpsc::UnboundedSender<EngineEvent>) -> Self {
        Self { tools, muxer, event_tx }
    }

    fn info(&self, scope: &str, message: impl Into<String>) {
        let _ = self.event_tx.send(EngineEvent::Info { scope: scope.to_string(), message: message.into() });
    }

    pub async fn execute(&self, req: &DownloadRequest<'_>) -> Result<DownloadOutcome, ExecutionError> {
        self.execute_until(req, interrupt()).await
    }

    /// Runs the download; the child is killed and `Interrupted` returned if
    /// `cancel` resolves first.
    pub async fn execute_until<C>(
        &self,
        req: &DownloadRequest<'_>,
        cancel: C,
    ) -> Result<DownloadOutcome, ExecutionError>
    where
        C: Future<Output = ()>,
    {
        let args = build_args(req, &self.muxer);
        let program = self.tools.ytdlp_bin.clone();
        tracing::debug!(program = %program.display(), ?args, grammar = GRAMMAR_VERSION, "spawning download tool");

        if !self.muxer.is_available() {
            tracing::warn!("ffmpeg unavailable, using single-file format");
        }

        let start = Instant::now();
        let mut child = Command::new(&program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => ExecutionError::ToolNotFound(program.clone()),
                _ => ExecutionError::Spawn(e),
            })?;

        let _ = self.event_tx.send(EngineEvent::Spawned {
            program: program.display().to_string(),
            args,
        });

        let stdout = child.stdout.take().ok_or_else(|| {
            ExecutionError::Io(std::io::Error::new(std::io::ErrorKind::Other, "stdout not captured"))
        })?;
        let stderr = child.stderr.take().ok_or_else(|| {
            ExecutionError::Io(std::io::Error::new(std::io::ErrorKind::Other, "stderr not captured"))
        })?;

        let tx = self.event_tx.clone();
        let stdout_task = tokio::spawn(async move {
            let mut merged = false;
            let mut events = Box::pin(event_stream(stdout));
            while let Some(ev) = events.next().await {
                match ev {
                    Ok(ev) => {
                        if ev.phase() == Phase::Merging {
                            merged = true;
                        }
                        let _ = tx.send(EngineEvent::Progress(ev));
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "stdout read failed");
                        break;
                    }
                }
            }
            merged
        });

        let stderr_task = tokio::spawn(drain_stderr(stderr, self.event_tx.clone()));

        let status = tokio::select! {
            status = child.wait() => status?,
            _ = cancel => {
                tracing::warn!("interrupted, stopping download tool");
                let _ = child.kill().await;
                stdout_task.abort();
                stderr_task.abort();
                return Err(ExecutionError::Interrupted);
            }
        };
        let elapsed = start.elapsed();

        let merge_observed = stdout_task.await.unwrap_or(false);
        let _ = stderr_task.await;

        let code = status.code();
        tracing::info!(?code, merge_observed, elapsed_ms = elapsed.as_millis() as u64, "download tool exited");
        let degraded = resolve_exit(code, merge_observed)?;

        if degraded {
            tracing::warn!("exit code 1 after merge; output may be unmerged");
        }
        let _ = self.event_tx.send(EngineEvent::Progress(ProgressEvent::PhaseChanged(Phase::Completed)));

        let candidates = candidate_paths(&req.output_stem, req.quality);
        let located = locate_output(&candidates).await;
        if located.is_none() {
            let dir = req.output_stem.parent().map(|p| p.to_path_buf()).unwrap_or_default();
            match list_dir(&dir).await {
                Ok(entries) => {
                    let _ = self.event_tx.send(EngineEvent::OutputMissing { dir, entries });
                }
                Err(e) => self.info("output", format!("cannot list {}: {}", dir.display(), e)),
            }
        }

        let (resolved_path, file_size) = match located {
            Some((p, size)) => (Some(p), Some(size)),
            None => (None, None),
        };

        Ok(DownloadOutcome {
            exit_code: code.unwrap_or_default(),
            elapsed,
            resolved_path,
            file_size,
            degraded,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::catalog::QualityCatalog;
    use std::path::{Path, PathBuf};

    fn request<'a>(profile: &'a QualityProfile, stem: PathBuf) -> DownloadRequest<'a> {
        DownloadRequest {
            source_url: "https://youtu.be/abc".to_string(),
            quality: profile,
            output_template: format!("{}.%(ext)s", stem.display()),
            output_stem: stem,
        }
    }

    fn value_after<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
        args.iter().position(|a| a == flag).map(|i| args[i + 1].as_str())
    }

    #[test]
    fn video_args_with_muxer() {
        let catalog = QualityCatalog::standard();
        let req = request(catalog.get("720").unwrap(), PathBuf::from("downloads/Clip"));
        let args = build_args(&req, &Muxer::OnPath);

        assert_eq!(value_after(&args, "-f"), Some("bestvideo[height<=720]+bestaudio/best[height<=720]"));
        assert_eq!(value_after(&args, "-o"), Some("downloads/Clip.%(ext)s"));
        assert_eq!(value_after(&args, "--merge-output-format"), Some("mp4"));
        assert!(args.contains(&"--newline".to_string()));
        assert!(args.contains(&"--no-playlist".to_string()));
        assert!(!args.contains(&"--embed-thumbnail".to_string()));
        assert!(!args.contains(&"--ffmpeg-location".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("https://youtu.be/abc"));
        assert_eq!(args[args.len() - 2], "--");
    }

    #[test]
    fn audio_args_embed_metadata() {
        let catalog = QualityCatalog::standard();
        let req = request(catalog.get("audio").unwrap(), PathBuf::from("downloads/Clip"));
        let args = build_args(&req, &Muxer::At(PathBuf::from("/opt/ffmpeg")));

        assert_eq!(value_after(&args, "-f"), Some("bestaudio/best"));
        assert_eq!(value_after(&args, "--audio-format"), Some("mp3"));
        assert_eq!(value_after(&args, "--ffmpeg-location"), Some("/opt/ffmpeg"));
        assert!(args.contains(&"--embed-thumbnail".to_string()));
        assert!(args.contains(&"--add-metadata".to_string()));
        assert!(!args.contains(&"--merge-output-format".to_string()));
    }

    #[test]
    fn missing_muxer_degrades_selector() {
        let catalog = QualityCatalog::standard();

        let req = request(catalog.get("1080").unwrap(), PathBuf::from("d/x"));
        let args = build_args(&req, &Muxer::Missing);
        assert_eq!(value_after(&args, "-f"), Some("best[height<=1080]/best"));
        assert!(!args.contains(&"--merge-output-format".to_string()));

        let req = request(catalog.get("best").unwrap(), PathBuf::from("d/x"));
        assert_eq!(value_after(&build_args(&req, &Muxer::Missing), "-f"), Some("best"));

        let req = request(catalog.get("audio").unwrap(), PathBuf::from("d/x"));
        let args = build_args(&req, &Muxer::Missing);
        assert_eq!(value_after(&args, "-f"), Some("bestaudio/best"));
        assert!(!args.contains(&"--extract-audio".to_string()));
        assert!(args.contains(&"--embed-thumbnail".to_string()));
    }

    #[test]
    fn exit_code_policy() {
        assert_eq!(resolve_exit(Some(0), false).unwrap(), false);
        assert_eq!(resolve_exit(Some(0), true).unwrap(), false);
        assert_eq!(resolve_exit(Some(1), true).unwrap(), true);
        assert_eq!(resolve_exit(Some(1), false).unwrap(), false);
        assert!(matches!(resolve_exit(Some(2), false), Err(ExecutionError::UnexpectedExit { code: Some(2) })));
        assert!(matches!(resolve_exit(None, true), Err(ExecutionError::UnexpectedExit { code: None })));
    }

    #[tokio::test]
    async fn missing_tool_fails_to_spawn() {
        let catalog = QualityCatalog::standard();
        let (tx, _rx) = mpsc::unbounded_channel();
        let tools = ToolContext { ytdlp_bin: PathBuf::from("/nonexistent/yt-dlp"), ..ToolContext::default() };
        let engine = Engine::new(tools, Muxer::OnPath, tx);

        let req = request(catalog.get("best").unwrap(), PathBuf::from("d/x"));
        let err = engine.execute(&req).await.unwrap_err();
        assert!(matches!(err, ExecutionError::ToolNotFound(_)));
    }

    #[cfg(unix)]
    fn fake_tool(dir: &Path, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join("fake-yt-dlp");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    fn drain(rx: &mut mpsc::UnboundedReceiver<EngineEvent>) -> Vec<EngineEvent> {
        let mut out = vec![];
        while let Ok(ev) = rx.try_recv() {
            out.push(ev);
        }
        out
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn exit_one_after_merge_is_degraded() {
        let dir = tempfile::tempdir().unwrap();
        let stem = dir.path().join("Clip");
        let body = format!(
            "printf '[download] Destination: x.f137.mp4\\n'\n\
             printf '[download]  45.2%% of ~10.00MiB at 1.20MiB/s ETA 00:05\\n'\n\
             printf '[download] 100%% of 10.00MiB in 00:00:08\\n'\n\
             printf '[Merger] Merging formats into \"x.mp4\"\\n'\n\
             echo 'ERROR: Postprocessing: ffmpeg exited with code 1' >&2\n\
             printf 'data' > '{}.mp4'\n\
             exit 1",
            stem.display()
        );
        let tools = ToolContext { ytdlp_bin: fake_tool(dir.path(), &body), ..ToolContext::default() };
        let (tx, mut rx) = mpsc::unbounded_channel();
        let engine = Engine::new(tools, Muxer::OnPath, tx);

        let catalog = QualityCatalog::standard();
        let outcome = engine.execute(&request(catalog.get("best").unwrap(), stem.clone())).await.unwrap();

        assert!(outcome.degraded);
        assert_eq!(outcome.exit_code, 1);
        assert_eq!(outcome.resolved_path, Some(dir.path().join("Clip.mp4")));
        assert_eq!(outcome.file_size, Some(4));

        let events = drain(&mut rx);
        let percents: Vec<f64> = events
            .iter()
            .filter_map(|e| match e {
                EngineEvent::Progress(p) => p.percent(),
                _ => None,
            })
            .collect();
        assert_eq!(percents, vec![45.2, 100.0]);
        assert!(events.iter().any(|e| matches!(e, EngineEvent::Notice(StderrNotice::HelperMissing(_)))));
        assert!(matches!(
            events.last(),
            Some(EngineEvent::Progress(ProgressEvent::PhaseChanged(Phase::Completed)))
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn exit_one_without_merge_is_plain_success_and_lists_dir() {
        let dir = tempfile::tempdir().unwrap();
        let stem = dir.path().join("Clip");
        std::fs::write(dir.path().join("other.txt"), b"").unwrap();
        let tools = ToolContext {
            ytdlp_bin: fake_tool(dir.path(), "printf '[download]  10.0%%\\n'\nexit 1"),
            ..ToolContext::default()
        };
        let (tx, mut rx) = mpsc::unbounded_channel();
        let engine = Engine::new(tools, Muxer::Missing, tx);

        let catalog = QualityCatalog::standard();
        let outcome = engine.execute(&request(catalog.get("720").unwrap(), stem)).await.unwrap();
        assert!(!outcome.degraded);
        assert!(outcome.resolved_path.is_none());

        let listing = drain(&mut rx).into_iter().find_map(|e| match e {
            EngineEvent::OutputMissing { entries, .. } => Some(entries),
            _ => None,
        });
        assert_eq!(listing, Some(vec!["fake-yt-dlp".to_string(), "other.txt".to_string()]));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn unexpected_exit_code_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let tools = ToolContext { ytdlp_bin: fake_tool(dir.path(), "exit 2"), ..ToolContext::default() };
        let (tx, _rx) = mpsc::unbounded_channel();
        let engine = Engine::new(tools, Muxer::OnPath, tx);

        let catalog = QualityCatalog::standard();
        let err = engine
            .execute(&request(catalog.get("best").unwrap(), dir.path().join("Clip")))
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutionError::UnexpectedExit { code: Some(2) }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn invalid_utf8_on_stderr_keeps_later_notices() {
        let dir = tempfile::tempdir().unwrap();
        let stem = dir.path().join("Clip");
        let body = format!(
            "printf 'bad \\377 byte\\n' >&2\n\
             sleep 1\n\
             echo 'WARNING: [youtube] Unable to download webpage: timed out' >&2\n\
             printf 'data' > '{}.mp4'\n\
             exit 0",
            stem.display()
        );
        let tools = ToolContext { ytdlp_bin: fake_tool(dir.path(), &body), ..ToolContext::default() };
        let (tx, mut rx) = mpsc::unbounded_channel();
        let engine = Engine::new(tools, Muxer::OnPath, tx);

        let catalog = QualityCatalog::standard();
        let outcome = engine.execute(&request(catalog.get("best").unwrap(), stem)).await.unwrap();
        assert_eq!(outcome.exit_code, 0);
        assert!(!outcome.degraded);

        let events = drain(&mut rx);
        assert!(events.iter().any(|e| matches!(
            e,
            EngineEvent::Notice(StderrNotice::Warning(w)) if w.contains("Unable to download webpage")
        )));
    }

    #[tokio::test]
    async fn stderr_lines_are_decoded_lossily() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let input: &[u8] = b"ERROR: bad \xff byte\r\nnoise\nWARNING: ffmpeg not found";
        drain_stderr(input, tx).await;

        let notices: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
        assert_eq!(notices.len(), 2);
        assert!(matches!(&notices[0], EngineEvent::Notice(StderrNotice::Fatal(l)) if l == "ERROR: bad \u{FFFD} byte"));
        assert!(matches!(&notices[1], EngineEvent::Notice(StderrNotice::HelperMissing(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn cancel_kills_the_tool() {
        let dir = tempfile::tempdir().unwrap();
        let tools = ToolContext {
            ytdlp_bin: fake_tool(dir.path(), "printf '[download]   5.0%%\\n'\nexec sleep 30"),
            ..ToolContext::default()
        };
        let (tx, mut rx) = mpsc::unbounded_channel();
        let engine = Engine::new(tools, Muxer::OnPath, tx);

        let catalog = QualityCatalog::standard();
        let req = request(catalog.get("best").unwrap(), dir.path().join("Clip"));
        let started = std::time::Instant::now();
        let err = engine
            .execute_until(&req, tokio::time::sleep(std::time::Duration::from_millis(300)))
            .await
            .unwrap_err();

        assert!(matches!(err, ExecutionError::Interrupted));
        assert!(started.elapsed() < std::time::Duration::from_secs(10));
        let events = drain(&mut rx);
        assert!(matches!(events.first(), Some(EngineEvent::Spawned { .. })));
        assert!(!events
            .iter()
            .any(|e| matches!(e, EngineEvent::Progress(ProgressEvent::PhaseChanged(Phase::Completed)))));
    }
}
