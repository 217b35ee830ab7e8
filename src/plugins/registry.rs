use crate::core::error::MetadataFetchError;
use crate::core::model::VideoInfo;
use crate::i18n::Locale;
use async_trait::async_trait;
use clap::{ArgMatches, Command};
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct ToolContext {
    pub ytdlp_bin: PathBuf,
    pub ffmpeg_bin: PathBuf,
    pub info_timeout_secs: u64,
}

impl Default for ToolContext {
    fn default() -> Self {
        Self {
            ytdlp_bin: PathBuf::from(crate::plugins::ytdlp::DEFAULT_BIN),
            ffmpeg_bin: PathBuf::from(crate::plugins::ffmpeg::DEFAULT_BIN),
            info_timeout_secs: 120,
        }
    }
}

/// Everything the command line contributes. Built once, then read-only.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub out_dir: PathBuf,
    pub url: Option<String>,
    pub quality: Option<String>,
    pub locale: Locale,
    pub verbose: bool,
    pub tools: ToolContext,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            out_dir: PathBuf::from("./downloads"),
            url: None,
            quality: None,
            locale: Locale::En,
            verbose: false,
            tools: ToolContext::default(),
        }
    }
}

pub trait CliPlugin: Send + Sync {
    fn name(&self) -> &'static str;
    fn augment_command(&self, cmd: Command) -> Command;
    fn apply_matches(&self, matches: &ArgMatches, cfg: &mut CliConfig) -> anyhow::Result<()>;
}

#[async_trait]
pub trait MetadataResolver: Send + Sync {
    fn name(&self) -> &'static str;
    fn can_handle(&self, url: &str) -> u8;
    async fn resolve(&self, url: &str, ctx: &ToolContext) -> Result<VideoInfo, MetadataFetchError>;
}

pub struct PluginRegistry {
    resolvers: Vec<Box<dyn MetadataResolver>>,
    cli_plugins: Vec<Box<dyn CliPlugin>>,
}

impl PluginRegistry {
    pub fn with_defaults() -> Self {
        let mut reg = Self { resolvers: vec![], cli_plugins: vec![] };

        reg.resolvers.push(Box::new(crate::plugins::ytdlp::resolver::YtDlpResolver::new()));

        reg.cli_plugins.push(Box::new(crate::plugins::ytdlp::cli::YtDlpCliPlugin::new()));
        reg.cli_plugins.push(Box::new(crate::plugins::ffmpeg::cli::FfmpegCliPlugin::new()));
        reg
    }

    pub fn augment_command(&self, cmd: Command) -> Command {
        self.cli_plugins
            .iter()
            .fold(cmd, |c, p| p.augment_command(c))
    }

    pub fn apply_matches(&self, matches: &ArgMatches, cfg: &mut CliConfig) -> anyhow::Result<()> {
        for p in &self.cli_plugins {
            tracing::trace!(plugin = p.name(), "applying flags");
            p.apply_matches(matches, cfg)?;
        }
        Ok(())
    }

    pub fn best_resolver(&self, url: &str) -> Option<&dyn MetadataResolver> {
        self.resolvers
            .iter()
            .map(|r| (r.can_handle(url), r.as_ref()))
            .max_by_key(|(c, _)| *c)
            .and_then(|(c, r)| if c == 0 { None } else { Some(r) })
            .inspect(|r| tracing::debug!(resolver = r.name(), url, "resolver selected"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plugins_contribute_flags() {
        let reg = PluginRegistry::with_defaults();
        let cmd = reg.augment_command(Command::new("t"));
        let m = cmd
            .try_get_matches_from(["t", "--ytdlp-bin", "/opt/yt-dlp", "--ffmpeg-bin", "/opt/ffmpeg", "--info-timeout-secs", "30"])
            .unwrap();

        let mut cfg = CliConfig::default();
        reg.apply_matches(&m, &mut cfg).unwrap();
        assert_eq!(cfg.tools.ytdlp_bin, PathBuf::from("/opt/yt-dlp"));
        assert_eq!(cfg.tools.ffmpeg_bin, PathBuf::from("/opt/ffmpeg"));
        assert_eq!(cfg.tools.info_timeout_secs, 30);
    }

    #[test]
    fn defaults_when_flags_absent() {
        let reg = PluginRegistry::with_defaults();
        let m = reg.augment_command(Command::new("t")).try_get_matches_from(["t"]).unwrap();
        let mut cfg = CliConfig::default();
        reg.apply_matches(&m, &mut cfg).unwrap();
        assert_eq!(cfg.tools.ytdlp_bin, PathBuf::from("yt-dlp"));
        assert_eq!(cfg.tools.info_timeout_secs, 120);
    }

    #[test]
    fn resolver_selection() {
        let reg = PluginRegistry::with_defaults();
        assert_eq!(reg.best_resolver("https://youtu.be/abc").map(|r| r.name()), Some("yt-dlp"));
        assert!(reg.best_resolver("   ").is_none());
    }
}
