const UNITS: [&str; 5] = ["Bytes", "KB", "MB", "GB", "TB"];

/// Base-1024 size with at most two decimals and no trailing zeros.
pub fn format_bytes(n: u64) -> String {
    if n == 0 {
        return "0 Bytes".to_string();
    }

    let mut value = n as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rounded = format!("{:.2}", value);
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", trimmed, UNITS[unit])
}

/// `H:MM:SS` (hour padded) or `MM:SS` when under an hour.
pub fn format_duration(seconds: f64) -> String {
    if !seconds.is_finite() || seconds < 0.0 {
        return "00:00".to_string();
    }

    let total = seconds.floor() as u64;
    let (h, m, s) = (total / 3600, (total % 3600) / 60, total % 60);
    if h > 0 {
        format!("{:02}:{:02}:{:02}", h, m, s)
    } else {
        format!("{:02}:{:02}", m, s)
    }
}

pub const BAR_WIDTH: usize = 40;
const FILLED: char = '█';
const EMPTY: char = '░';

/// Filled segment is clamped to `[0, width]`, so out-of-range percentages
/// render as an empty or full bar.
pub fn render_progress_bar(percent: f64, width: usize) -> String {
    let ratio = if percent.is_nan() { 0.0 } else { percent / 100.0 };
    let filled = (ratio * width as f64).round().clamp(0.0, width as f64) as usize;

    let mut bar = String::with_capacity(width * 3 + 2);
    bar.push('[');
    bar.extend(std::iter::repeat(FILLED).take(filled));
    bar.extend(std::iter::repeat(EMPTY).take(width - filled));
    bar.push(']');
    bar
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count(bar: &str, c: char) -> usize {
        bar.chars().filter(|x| *x == c).count()
    }

    #[test]
    fn bytes() {
        assert_eq!(format_bytes(0), "0 Bytes");
        assert_eq!(format_bytes(512), "512 Bytes");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(1_048_576), "1 MB");
        assert_eq!(format_bytes(1_073_741_824), "1 GB");
        assert_eq!(format_bytes(1_288_490_189), "1.2 GB");
        assert_eq!(format_bytes(5 * 1024u64.pow(5)), "5120 TB");
    }

    #[test]
    fn durations() {
        assert_eq!(format_duration(65.0), "01:05");
        assert_eq!(format_duration(3725.0), "01:02:05");
        assert_eq!(format_duration(0.0), "00:00");
        assert_eq!(format_duration(59.9), "00:59");
        assert_eq!(format_duration(f64::NAN), "00:00");
        assert_eq!(format_duration(-3.0), "00:00");
    }

    #[test]
    fn bar_fill() {
        let half = render_progress_bar(50.0, 10);
        assert!(half.starts_with('[') && half.ends_with(']'));
        assert_eq!(count(&half, FILLED), 5);
        assert_eq!(count(&half, EMPTY), 5);

        assert_eq!(count(&render_progress_bar(0.0, 10), FILLED), 0);
        assert_eq!(count(&render_progress_bar(100.0, 10), FILLED), 10);
    }

    #[test]
    fn bar_clamps_out_of_range() {
        let over = render_progress_bar(250.0, 10);
        assert_eq!(count(&over, FILLED), 10);
        assert_eq!(count(&over, EMPTY), 0);

        let under = render_progress_bar(-40.0, 10);
        assert_eq!(count(&under, FILLED), 0);
        assert_eq!(count(&under, EMPTY), 10);

        assert_eq!(count(&render_progress_bar(f64::NAN, 10), EMPTY), 10);
        assert_eq!(render_progress_bar(42.0, BAR_WIDTH).chars().count(), BAR_WIDTH + 2);
    }
}
