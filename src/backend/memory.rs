use crate::model::MemoryDetail;
use std::fs;
use std::path::Path;

pub fn read_memory(proc_root: &Path) -> MemoryDetail {
    parse_meminfo(&fs::read_to_string(proc_root.join("meminfo")).unwrap_or_default())
}

/// `Key:   value kB` lines. Unknown keys and unparsable values are skipped
/// one line at a time.
pub fn parse_meminfo(meminfo: &str) -> MemoryDetail {
    let mut m = MemoryDetail::default();

    for line in meminfo.lines() {
        let mut parts = line.split_whitespace();
        let (Some(key), Some(value)) = (parts.next(), parts.next()) else {
            continue;
        };
        let Ok(kb) = value.parse::<u64>() else {
            continue;
        };
        let slot = match key {
            "MemTotal:" => &mut m.total_kb,
            "MemAvailable:" => &mut m.available_kb,
            "MemFree:" => &mut m.free_kb,
            "Buffers:" => &mut m.buffers_kb,
            "Cached:" => &mut m.cached_kb,
            "SReclaimable:" => &mut m.sreclaimable_kb,
            "Dirty:" => &mut m.dirty_kb,
            "Writeback:" => &mut m.writeback_kb,
            "SwapTotal:" => &mut m.swap_total_kb,
            "SwapFree:" => &mut m.swap_free_kb,
            "SwapCached:" => &mut m.swap_cached_kb,
            "Shmem:" => &mut m.shared_kb,
            "Active:" => &mut m.active_kb,
            "Inactive:" => &mut m.inactive_kb,
            "Committed_AS:" => &mut m.committed_kb,
            _ => continue,
        };
        *slot = kb;
    }

    m
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_keys() {
        let meminfo = "\
MemTotal:       16314380 kB
MemFree:         1234567 kB
MemAvailable:    8157190 kB
Buffers:          345678 kB
Cached:          4567890 kB
SwapCached:         1024 kB
Active:          6000000 kB
Inactive:        5000000 kB
SwapTotal:       2097148 kB
SwapFree:        1048574 kB
Dirty:               512 kB
Writeback:             0 kB
Shmem:            300000 kB
SReclaimable:     400000 kB
Committed_AS:   12000000 kB
HugePages_Total:       0
";
        let m = parse_meminfo(meminfo);
        assert_eq!(m.total_kb, 16314380);
        assert_eq!(m.available_kb, 8157190);
        assert_eq!(m.swap_cached_kb, 1024);
        assert_eq!(m.sreclaimable_kb, 400000);
        assert_eq!(m.committed_kb, 12000000);
        assert_eq!(m.swap_used_kb(), 1048574);
        assert!((m.used_fraction() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn malformed_line_does_not_lose_the_rest() {
        let m = parse_meminfo("MemTotal: lots kB\nMemAvailable: 10 kB\nBroken\n");
        assert_eq!(m.total_kb, 0);
        assert_eq!(m.available_kb, 10);
    }

    #[test]
    fn missing_file_is_zeroed() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(read_memory(dir.path()), MemoryDetail::default());
    }
}
