pub mod cli;
pub mod probe;

pub const DEFAULT_BIN: &str = "ffmpeg";
