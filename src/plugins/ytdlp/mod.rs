pub mod cli;
pub mod resolver;

pub const DEFAULT_BIN: &str = "yt-dlp";
