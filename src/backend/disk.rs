use crate::model::{DiskCounters, DiskPartition};
use std::ffi::CString;
use std::fs;
use std::path::Path;

const SECTOR_SIZE: u64 = 512;
const GIB: f64 = 1024.0 * 1024.0 * 1024.0;
const MIN_PARTITION_GB: f64 = 0.1;

const REAL_FILESYSTEMS: &[&str] = &[
    "ext4", "btrfs", "xfs", "zfs", "ntfs", "ntfs3", "vfat", "exfat", "f2fs",
];

pub fn read_counters(proc_root: &Path) -> DiskCounters {
    parse_diskstats(&fs::read_to_string(proc_root.join("diskstats")).unwrap_or_default())
}

/// Sum sectors read/written over whole disks. Partitions are skipped so
/// their traffic is not counted twice.
pub fn parse_diskstats(diskstats: &str) -> DiskCounters {
    let mut total = DiskCounters::default();

    for line in diskstats.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 10 {
            continue;
        }
        if !is_whole_disk(parts[2]) {
            continue;
        }
        let (Ok(read_sectors), Ok(write_sectors)) =
            (parts[5].parse::<u64>(), parts[9].parse::<u64>())
        else {
            continue;
        };
        total.read_bytes += read_sectors * SECTOR_SIZE;
        total.write_bytes += write_sectors * SECTOR_SIZE;
    }

    total
}

/// sda, vdb, hdc, nvme0n1, mmcblk0; not sda1, nvme0n1p2, mmcblk0p1, loop0.
fn is_whole_disk(name: &str) -> bool {
    if name.starts_with("loop") || name.starts_with("ram") || name.starts_with("zram") {
        return false;
    }
    if name.starts_with("nvme") || name.starts_with("mmcblk") {
        return !name.contains('p');
    }
    let is_classic = name.starts_with("sd") || name.starts_with("vd") || name.starts_with("hd") || name.starts_with("xvd");
    is_classic && name.chars().last().map_or(false, |c| c.is_ascii_alphabetic())
}

/// Mounted real filesystems, plus tmpfs at /tmp.
pub fn read_partitions(proc_root: &Path) -> Vec<DiskPartition> {
    let mounts = fs::read_to_string(proc_root.join("mounts")).unwrap_or_default();
    parse_mounts(&mounts)
        .into_iter()
        .filter_map(|(mount_point, fs_type)| {
            let (total, free) = filesystem_space(&mount_point)?;
            partition(mount_point, fs_type, total, free)
        })
        .collect()
}

/// (mount point, fs type) of every mount worth showing.
pub fn parse_mounts(mounts: &str) -> Vec<(String, String)> {
    let mut seen = std::collections::HashSet::new();
    mounts
        .lines()
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let _device = parts.next()?;
            let mount_point = unescape_mount(parts.next()?);
            let fs_type = parts.next()?.to_string();
            let wanted = REAL_FILESYSTEMS.contains(&fs_type.as_str())
                || (fs_type == "tmpfs" && mount_point == "/tmp");
            // bind mounts and btrfs subvolumes repeat the same mount point
            (wanted && seen.insert(mount_point.clone())).then_some((mount_point, fs_type))
        })
        .collect()
}

/// `/proc/mounts` escapes space, tab, newline and backslash as octal.
fn unescape_mount(raw: &str) -> String {
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 4 <= bytes.len() {
            let code = bytes[i + 1..i + 4]
                .iter()
                .try_fold(0u32, |acc, &b| (b'0'..=b'7').contains(&b).then(|| acc * 8 + (b - b'0') as u32));
            if let Some(code) = code.filter(|&c| c <= 0xff) {
                out.push(code as u8);
                i += 4;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn partition(mount_point: String, fs_type: String, total: u64, free: u64) -> Option<DiskPartition> {
    let total_gb = total as f64 / GIB;
    if total_gb <= MIN_PARTITION_GB {
        return None;
    }
    let used_gb = total.saturating_sub(free) as f64 / GIB;
    Some(DiskPartition {
        mount_point,
        fs_type,
        total_gb,
        used_gb,
        usage: used_gb / total_gb,
    })
}

/// (total, free) bytes of the filesystem holding `mount_point`.
fn filesystem_space(mount_point: &str) -> Option<(u64, u64)> {
    let c_path = CString::new(mount_point).ok()?;
    let mut stat: libc::statvfs = unsafe { std::mem::zeroed() };
    let ret = unsafe { libc::statvfs(c_path.as_ptr(), &mut stat) };
    if ret != 0 {
        log::debug!("statvfs failed for {}", mount_point);
        return None;
    }
    let frsize = stat.f_frsize as u64;
    Some((stat.f_blocks as u64 * frsize, stat.f_bfree as u64 * frsize))
}
