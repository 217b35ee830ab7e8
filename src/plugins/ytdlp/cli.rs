use crate::plugins::registry::{CliConfig, CliPlugin};
use clap::{Arg, ArgMatches, Command};

pub struct YtDlpCliPlugin;

impl YtDlpCliPlugin {
    pub fn new() -> Self {
        Self
    }
}

impl CliPlugin for YtDlpCliPlugin {
    fn name(&self) -> &'static str {
        "yt-dlp"
    }

    fn augment_command(&self, cmd: Command) -> Command {
        cmd.arg(
            Arg::new("ytdlp_bin")
                .long("ytdlp-bin")
                .help_heading("YT-DLP")
                .help("Path to the yt-dlp executable")
                .default_value(super::DEFAULT_BIN)
                .num_args(1),
        )
        .arg(
            Arg::new("info_timeout_secs")
                .long("info-timeout-secs")
                .help_heading("YT-DLP")
                .help("Timeout for fetching video info, in seconds")
                .default_value("120")
                .num_args(1),
        )
    }

    fn apply_matches(&self, matches: &ArgMatches, cfg: &mut CliConfig) -> anyhow::Result<()> {
        if let Some(v) = matches.get_one::<String>("ytdlp_bin") {
            cfg.tools.ytdlp_bin = v.into();
        }
        if let Some(s) = matches.get_one::<String>("info_timeout_secs") {
            cfg.tools.info_timeout_secs = s.parse()?;
        }
        Ok(())
    }
}
