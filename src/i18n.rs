/// User-facing strings for the interactive CLI.
/// Locale is selected via the `--locale` flag (e.g. `--locale zh`).

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Locale {
    #[default]
    En,
    Zh,
}

impl Locale {
    pub fn from_str(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "zh" | "zh-cn" | "zh_cn" | "zh-hans" | "zh-tw" | "zh_tw" => Self::Zh,
            _ => Self::En,
        }
    }
}

pub struct Messages {
    pub banner: &'static str,
    pub prompt_url: &'static str,
    pub prompt_quality: &'static str,
    pub prompt_quality_suffix: &'static str,
    pub fetching_info: &'static str,
    pub metadata_failed: &'static str,
    pub label_title: &'static str,
    pub label_channel: &'static str,
    pub label_duration: &'static str,
    pub label_views: &'static str,
    pub label_uploaded: &'static str,
    pub label_size: &'static str,
    pub qualities_header: &'static str,
    pub unknown_quality: &'static str,
    pub empty_quality: &'static str,
    pub selected_quality: &'static str,
    pub ffmpeg_missing: &'static str,
    pub starting_download: &'static str,
    pub saving_to: &'static str,
    pub download_step_done: &'static str,
    pub already_downloaded: &'static str,
    pub phase_merging: &'static str,
    pub phase_embedding: &'static str,
    pub phase_cleanup: &'static str,
    pub completed_in: &'static str,
    pub saved_to: &'static str,
    pub degraded_title: &'static str,
    pub degraded_hint: &'static str,
    pub file_not_found: &'static str,
    pub unknown: &'static str,
    pub error_prefix: &'static str,
    pub info_prefix: &'static str,
}

pub static EN: Messages = Messages {
    banner: "YouTube Video Downloader",
    prompt_url: "Enter YouTube video URL: ",
    prompt_quality: "Enter quality",
    prompt_quality_suffix: "or number [default: best]: ",
    fetching_info: "Fetching video information...",
    metadata_failed: "Could not fetch video information",
    label_title: "Title",
    label_channel: "Channel",
    label_duration: "Duration",
    label_views: "Views",
    label_uploaded: "Uploaded",
    label_size: "Size",
    qualities_header: "Available qualities:",
    unknown_quality: "Unknown quality, using best",
    empty_quality: "No quality entered, using best",
    selected_quality: "Selected quality",
    ffmpeg_missing: "ffmpeg not found: downloading a single pre-merged file instead",
    starting_download: "Starting download...",
    saving_to: "Saving to",
    download_step_done: "Download finished",
    already_downloaded: "File already downloaded",
    phase_merging: "Merging audio and video...",
    phase_embedding: "Embedding thumbnail and metadata...",
    phase_cleanup: "Cleaning up",
    completed_in: "Download completed in",
    saved_to: "Saved to",
    degraded_title: "Download finished, but merging audio and video may have failed.",
    degraded_hint: "Install ffmpeg so streams can be merged into one file:\n  macOS:          brew install ffmpeg\n  Debian/Ubuntu:  sudo apt install ffmpeg\n  Windows:        winget install ffmpeg",
    file_not_found: "Downloaded file not found. Contents of",
    unknown: "?",
    error_prefix: "Error",
    info_prefix: "INFO",
};

pub static ZH: Messages = Messages {
    banner: "YouTube 视频下载器",
    prompt_url: "请输入 YouTube 视频链接: ",
    prompt_quality: "请选择画质",
    prompt_quality_suffix: "或序号 [默认: best]: ",
    fetching_info: "正在获取视频信息...",
    metadata_failed: "无法获取视频信息",
    label_title: "标题",
    label_channel: "频道",
    label_duration: "时长",
    label_views: "播放量",
    label_uploaded: "上传日期",
    label_size: "大小",
    qualities_header: "可用画质:",
    unknown_quality: "未知画质，使用 best",
    empty_quality: "未输入画质，使用 best",
    selected_quality: "已选画质",
    ffmpeg_missing: "未找到 ffmpeg：改为下载单个已合并文件",
    starting_download: "开始下载...",
    saving_to: "保存到",
    download_step_done: "下载完成",
    already_downloaded: "文件已存在",
    phase_merging: "正在合并音视频...",
    phase_embedding: "正在嵌入封面和元数据...",
    phase_cleanup: "清理中",
    completed_in: "下载完成，用时",
    saved_to: "已保存到",
    degraded_title: "下载完成，但音视频合并可能失败。",
    degraded_hint: "请安装 ffmpeg 以便合并为单个文件:\n  macOS:          brew install ffmpeg\n  Debian/Ubuntu:  sudo apt install ffmpeg\n  Windows:        winget install ffmpeg",
    file_not_found: "未找到下载的文件。目录内容",
    unknown: "?",
    error_prefix: "错误",
    info_prefix: "信息",
};

pub fn get_messages(locale: Locale) -> &'static Messages {
    match locale {
        Locale::En => &EN,
        Locale::Zh => &ZH,
    }
}
