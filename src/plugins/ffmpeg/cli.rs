use crate::plugins::registry::{CliConfig, CliPlugin};
use clap::{Arg, ArgMatches, Command};

pub struct FfmpegCliPlugin;

impl FfmpegCliPlugin {
    pub fn new() -> Self {
        Self
    }
}

impl CliPlugin for FfmpegCliPlugin {
    fn name(&self) -> &'static str {
        "ffmpeg"
    }

    fn augment_command(&self, cmd: Command) -> Command {
        cmd.arg(
            Arg::new("ffmpeg_bin")
                .long("ffmpeg-bin")
                .help_heading("FFMPEG")
                .help("Path to ffmpeg, used to merge audio and video streams")
                .default_value(super::DEFAULT_BIN)
                .num_args(1),
        )
    }

    fn apply_matches(&self, matches: &ArgMatches, cfg: &mut CliConfig) -> anyhow::Result<()> {
        if let Some(v) = matches.get_one::<String>("ffmpeg_bin") {
            cfg.tools.ffmpeg_bin = v.into();
        }
        Ok(())
    }
}
