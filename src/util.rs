const KB: f64 = 1024.0;
const MB: f64 = 1024.0 * 1024.0;
const GB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Byte count with one decimal, switching unit only once strictly above
/// the next boundary (exactly 1024 B stays "1024.0 B").
pub fn format_bytes(bytes: u64) -> String {
    let b = bytes as f64;
    if b > GB {
        format!("{:.1} GB", b / GB)
    } else if b > MB {
        format!("{:.1} MB", b / MB)
    } else if b > KB {
        format!("{:.1} KB", b / KB)
    } else {
        format!("{} B", bytes)
    }
}

pub fn format_bytes_rate(bytes_per_sec: f64) -> String {
    if bytes_per_sec > MB {
        format!("{:.1} MB/s", bytes_per_sec / MB)
    } else if bytes_per_sec > KB {
        format!("{:.1} KB/s", bytes_per_sec / KB)
    } else {
        format!("{:.1} B/s", bytes_per_sec)
    }
}

pub fn format_percent(percent: f64) -> String {
    format!("{:.1}%", percent)
}

pub fn format_frequency(mhz: f64) -> String {
    if mhz >= 1000.0 {
        format!("{:.2} GHz", mhz / 1000.0)
    } else {
        format!("{:.0} MHz", mhz)
    }
}

/// `3d 04:05:06`, or `04:05:06` under a day.
pub fn format_duration(secs: u64) -> String {
    let days = secs / 86_400;
    let hours = (secs % 86_400) / 3600;
    let mins = (secs % 3600) / 60;
    let s = secs % 60;
    if days > 0 {
        format!("{}d {:02}:{:02}:{:02}", days, hours, mins, s)
    } else {
        format!("{:02}:{:02}:{:02}", hours, mins, s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_thresholds() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1024), "1024 B");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024 + 1), "5.0 MB");
        assert_eq!(format_bytes(3 * 1024 * 1024 * 1024 + 1), "3.0 GB");
    }

    #[test]
    fn rate_thresholds() {
        assert_eq!(format_bytes_rate(0.0), "0.0 B/s");
        assert_eq!(format_bytes_rate(500.0), "500.0 B/s");
        assert_eq!(format_bytes_rate(2048.0), "2.0 KB/s");
        assert_eq!(format_bytes_rate(3.5 * 1024.0 * 1024.0), "3.5 MB/s");
    }

    #[test]
    fn durations() {
        assert_eq!(format_duration(59), "00:00:59");
        assert_eq!(format_duration(3 * 86_400 + 4 * 3600 + 5 * 60 + 6), "3d 04:05:06");
    }

    #[test]
    fn frequencies() {
        assert_eq!(format_frequency(800.0), "800 MHz");
        assert_eq!(format_frequency(3600.0), "3.60 GHz");
    }
}
