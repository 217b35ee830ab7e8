mod core;
mod i18n;
mod logging;
mod plugins;

use crate::core::catalog::{Fallback, QualityCatalog};
use crate::core::engine::Engine;
use crate::core::error::InputError;
use crate::core::events::{EngineEvent, Phase, ProgressEvent, StderrNotice};
use crate::core::format::{format_bytes, format_duration, render_progress_bar, BAR_WIDTH};
use crate::core::model::{DownloadOutcome, DownloadRequest, VideoInfo};
use crate::plugins::registry::{CliConfig, PluginRegistry};
use anyhow::Context;
use clap::{Arg, ArgAction, ArgMatches, Command};
use i18n::{Locale, Messages};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::io::{IsTerminal, Write};
use tokio::sync::mpsc;

fn build_cli(registry: &PluginRegistry) -> Command {
    let cmd = Command::new("orange-ytdl")
        .about("Download a video through yt-dlp with a chosen quality preset")
        .arg(
            Arg::new("url")
                .long("url")
                .help("Video URL (prompted for when omitted)")
                .num_args(1),
        )
        .arg(
            Arg::new("quality")
                .long("quality")
                .help("Quality key or 1-based number (prompted for when omitted)")
                .num_args(1),
        )
        .arg(
            Arg::new("out_dir")
                .long("out-dir")
                .help("Output directory")
                .default_value("./downloads")
                .num_args(1),
        )
        .arg(
            Arg::new("locale")
                .long("locale")
                .help("Interface language (en, zh)")
                .default_value("en")
                .num_args(1),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Debug logging on stderr")
                .action(ArgAction::SetTrue),
        );

    registry.augment_command(cmd)
}

fn parse_config(registry: &PluginRegistry, m: &ArgMatches) -> anyhow::Result<CliConfig> {
    let mut cfg = CliConfig::default();
    if let Some(v) = m.get_one::<String>("out_dir") {
        cfg.out_dir = v.into();
    }
    if let Some(v) = m.get_one::<String>("locale") {
        cfg.locale = Locale::from_str(v);
    }
    cfg.url = m.get_one::<String>("url").cloned();
    cfg.quality = m.get_one::<String>("quality").cloned();
    cfg.verbose = m.get_flag("verbose");

    registry.apply_matches(m, &mut cfg)?;
    Ok(cfg)
}

#[tokio::main]
async fn main() {
    let registry = PluginRegistry::with_defaults();
    let matches = build_cli(&registry).get_matches();

    let cfg = match parse_config(&registry, &matches) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{:#}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = logging::init(cfg.verbose) {
        eprintln!("{}", e);
    }

    let m = i18n::get_messages(cfg.locale);
    if let Err(e) = run(&registry, &cfg, m).await {
        eprintln!();
        eprintln!("✗ {}: {:#}", m.error_prefix, e);
        eprintln!("{:?}", e);
        std::process::exit(1);
    }
}

async fn run(registry: &PluginRegistry, cfg: &CliConfig, m: &'static Messages) -> anyhow::Result<()> {
    clear_screen();
    print_banner(m);

    let url = match &cfg.url {
        Some(u) => u.trim().to_string(),
        None => prompt(m.prompt_url)?,
    };
    if url.is_empty() {
        return Err(InputError::EmptyUrl.into());
    }

    let resolver = registry
        .best_resolver(&url)
        .with_context(|| format!("no resolver for input: {}", url))?;

    println!("{}", m.fetching_info);
    let info = resolver
        .resolve(&url, &cfg.tools)
        .await
        .context(m.metadata_failed)?;
    print_info(&info, m);

    let catalog = QualityCatalog::standard();
    print_qualities(&catalog, m);

    let input = match &cfg.quality {
        Some(q) => q.clone(),
        None => prompt(&format!(
            "{} ({}) {}",
            m.prompt_quality,
            catalog.keys().join(", "),
            m.prompt_quality_suffix
        ))?,
    };
    let resolved = catalog.resolve(&input);
    if let Some(note) = quality_advisory(resolved.fallback.as_ref(), &input, m) {
        println!("⚠ {}", note);
    }
    println!("{}: {} ({})", m.selected_quality, resolved.profile.label, resolved.profile.key);

    tokio::fs::create_dir_all(&cfg.out_dir)
        .await
        .with_context(|| format!("create out_dir {}", cfg.out_dir.display()))?;

    let (output_template, output_stem) = crate::core::output::output_paths(&cfg.out_dir, &info.title);
    let request = DownloadRequest {
        source_url: url,
        quality: resolved.profile,
        output_template,
        output_stem,
    };

    let muxer = crate::plugins::ffmpeg::probe::probe(&cfg.tools.ffmpeg_bin).await;
    if !muxer.is_available() {
        println!("⚠ {}", m.ffmpeg_missing);
    }

    println!();
    println!("{}", m.starting_download);
    println!(
        "{}: {}.{}",
        m.saving_to,
        request.output_stem.display(),
        request.quality.final_extension()
    );

    let (tx, rx) = mpsc::unbounded_channel();
    let ui_task = tokio::spawn(render_events(rx, m));

    let engine = Engine::new(cfg.tools.clone(), muxer, tx);
    let result = engine.execute(&request).await;
    drop(engine);
    let _ = ui_task.await;

    let outcome = result?;
    tracing::info!(
        exit_code = outcome.exit_code,
        degraded = outcome.degraded,
        "download finished"
    );
    print_summary(&outcome, m);
    Ok(())
}

fn quality_advisory(fallback: Option<&Fallback>, input: &str, m: &Messages) -> Option<String> {
    match fallback? {
        Fallback::Empty => Some(m.empty_quality.to_string()),
        _ => Some(format!("{}: {}", m.unknown_quality, input.trim())),
    }
}

fn clear_screen() {
    let mut out = std::io::stdout();
    if !out.is_terminal() {
        return;
    }
    if let Err(e) = crossterm::execute!(
        out,
        crossterm::terminal::Clear(crossterm::terminal::ClearType::All),
        crossterm::cursor::MoveTo(0, 0)
    ) {
        tracing::debug!(error = %e, "clear screen failed");
    }
}

fn print_banner(m: &Messages) {
    let rule = "=".repeat(50);
    println!("{}", rule);
    println!("  {}", m.banner);
    println!("{}", rule);
    println!();
}

fn prompt(text: &str) -> std::io::Result<String> {
    print!("{}", text);
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn print_info(info: &VideoInfo, m: &Messages) {
    println!();
    println!("{}: {}", m.label_title, info.title);
    println!("{}: {}", m.label_channel, info.author().unwrap_or(m.unknown));
    println!(
        "{}: {}",
        m.label_duration,
        format_duration(info.duration.unwrap_or(f64::NAN))
    );
    if let Some(v) = info.view_count {
        println!("{}: {}", m.label_views, v);
    }
    if let Some(d) = info.upload_date_display() {
        println!("{}: {}", m.label_uploaded, d);
    }
    if let Some(s) = info.filesize_approx {
        println!("{}: ~{}", m.label_size, format_bytes(s));
    }
    println!();
}

fn print_qualities(catalog: &QualityCatalog, m: &Messages) {
    println!("{}", m.qualities_header);
    for (i, p) in catalog.iter().enumerate() {
        println!("  {}. {:<6} {}", i + 1, p.key, p.label);
    }
    println!();
}

fn status_line(p: &crate::core::events::DownloadProgress, m: &Messages) -> String {
    format!(
        "{} {:>5.1}% | {} | {} | ETA {}",
        render_progress_bar(p.percent, BAR_WIDTH),
        p.percent,
        p.approx_size.as_deref().unwrap_or(m.unknown),
        p.speed.as_deref().unwrap_or("-"),
        p.eta.as_deref().unwrap_or("-"),
    )
}

async fn render_events(mut rx: mpsc::UnboundedReceiver<EngineEvent>, m: &'static Messages) {
    let pb = ProgressBar::with_draw_target(None, ProgressDrawTarget::stdout());
    pb.set_style(ProgressStyle::with_template("{msg}").unwrap_or_else(|_| ProgressStyle::default_spinner()));

    // `suspend` keeps the line visible even when the bar itself is hidden.
    let say = |s: String| pb.suspend(|| println!("{}", s));

    while let Some(evt) = rx.recv().await {
        match evt {
            EngineEvent::Spawned { program, args } => {
                tracing::debug!(%program, ?args, "download tool started");
            }
            EngineEvent::Progress(ProgressEvent::Downloading(p)) => {
                pb.set_message(status_line(&p, m));
            }
            EngineEvent::Progress(ProgressEvent::DownloadFinished { already_present }) => {
                let msg = if already_present { m.already_downloaded } else { m.download_step_done };
                say(format!("✓ {}", msg));
            }
            EngineEvent::Progress(ProgressEvent::PhaseChanged(phase)) => match phase {
                Phase::Merging => say(format!("🔄 {}", m.phase_merging)),
                Phase::EmbeddingMetadata => say(format!("🖼  {}", m.phase_embedding)),
                Phase::Completed => pb.finish_and_clear(),
                _ => {}
            },
            EngineEvent::Progress(ProgressEvent::CleaningUp { detail }) => {
                say(format!("🧹 {}: {}", m.phase_cleanup, detail));
            }
            EngineEvent::Notice(StderrNotice::Fatal(line)) => say(format!("✗ {}", line)),
            EngineEvent::Notice(StderrNotice::HelperMissing(line) | StderrNotice::Warning(line)) => {
                say(format!("⚠ {}", line));
            }
            EngineEvent::OutputMissing { dir, entries } => {
                say(format!("⚠ {} {}:", m.file_not_found, dir.display()));
                for e in entries {
                    say(format!("  - {}", e));
                }
            }
            EngineEvent::Info { scope, message } => {
                say(format!("[{}] {}: {}", m.info_prefix, scope, message));
            }
        }
    }

    pb.finish_and_clear();
}

fn print_summary(outcome: &DownloadOutcome, m: &Messages) {
    println!();
    println!("✓ {} {}", m.completed_in, format_duration(outcome.elapsed_seconds()));
    if let Some(p) = &outcome.resolved_path {
        println!("{}: {}", m.saved_to, p.display());
    }
    if let Some(size) = outcome.file_size {
        println!("{}: {}", m.label_size, format_bytes(size));
    }
    if outcome.degraded {
        println!();
        println!("⚠ {}", m.degraded_title);
        println!("{}", m.degraded_hint);
    }
}
