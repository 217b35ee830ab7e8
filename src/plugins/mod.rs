pub mod ffmpeg;
pub mod registry;
pub mod ytdlp;
