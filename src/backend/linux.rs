use crate::backend::source::{
    BatteryReader, CpuReader, DiskReader, MemoryReader, NetworkReader, ProcessReader, SystemReader,
};
use crate::backend::{battery, cpu, disk, memory, network, process, system};
use crate::model::{
    BatteryInfo, CpuSensors, DiskCounters, DiskPartition, MemoryDetail, NetCounters, ProcTick,
    ProcessDetail, StatSnapshot, SystemCounts, SystemInfo,
};
use std::fs;
use std::path::{Path, PathBuf};

/// Reads `/proc`, `/sys` and `/etc`. The roots can be moved for tests.
pub struct LinuxSource {
    proc_root: PathBuf,
    sys_root: PathBuf,
    etc_root: PathBuf,
    page_size: u64,
}

impl LinuxSource {
    pub fn new() -> Self {
        let source = Self::with_roots("/proc", "/sys", "/etc");
        match battery::find_battery(&source.sys_root) {
            Some(path) => log::info!("Battery found: {}", path.display()),
            None => log::info!("No battery found (desktop PC?)"),
        }
        source
    }

    pub fn with_roots(
        proc_root: impl Into<PathBuf>,
        sys_root: impl Into<PathBuf>,
        etc_root: impl Into<PathBuf>,
    ) -> Self {
        let page_size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
        Self {
            proc_root: proc_root.into(),
            sys_root: sys_root.into(),
            etc_root: etc_root.into(),
            page_size: if page_size > 0 { page_size as u64 } else { 4096 },
        }
    }

    fn pid_dirs(&self) -> impl Iterator<Item = u32> {
        fs::read_dir(&self.proc_root)
            .into_iter()
            .flatten()
            .flatten()
            .filter_map(|entry| entry.file_name().to_str()?.parse::<u32>().ok())
    }

    fn pid_path(&self, pid: u32, file: &str) -> PathBuf {
        self.proc_root.join(pid.to_string()).join(file)
    }

    fn read_pid_stat(&self, pid: u32) -> Option<(ProcTick, ProcessDetail)> {
        let stat = fs::read_to_string(self.pid_path(pid, "stat")).ok()?;
        process::parse_pid_stat(pid, &stat, self.page_size)
    }

    fn proc_root(&self) -> &Path {
        &self.proc_root
    }
}

impl Default for LinuxSource {
    fn default() -> Self {
        Self::new()
    }
}

impl CpuReader for LinuxSource {
    fn stat(&self) -> StatSnapshot {
        cpu::read_stat(self.proc_root())
    }

    fn sensors(&self) -> CpuSensors {
        CpuSensors {
            temperature_celsius: cpu::read_temperature(&self.sys_root),
            frequency_mhz: cpu::read_frequency_mhz(&self.proc_root, &self.sys_root),
            load_average: cpu::read_load_average(&self.proc_root),
            uptime_secs: cpu::read_uptime_secs(&self.proc_root),
        }
    }
}

impl MemoryReader for LinuxSource {
    fn memory(&self) -> MemoryDetail {
        memory::read_memory(&self.proc_root)
    }
}

impl NetworkReader for LinuxSource {
    fn net_counters(&self) -> NetCounters {
        network::read_counters(&self.proc_root)
    }

    fn connection_count(&self) -> usize {
        network::read_connection_count(&self.proc_root)
    }
}

impl DiskReader for LinuxSource {
    fn disk_counters(&self) -> DiskCounters {
        disk::read_counters(&self.proc_root)
    }

    fn partitions(&self) -> Vec<DiskPartition> {
        disk::read_partitions(&self.proc_root)
    }
}

impl BatteryReader for LinuxSource {
    fn battery(&self) -> BatteryInfo {
        battery::read_battery(&self.sys_root)
    }
}

impl ProcessReader for LinuxSource {
    fn process_ticks(&self) -> Vec<ProcTick> {
        self.pid_dirs()
            .filter_map(|pid| self.read_pid_stat(pid).map(|(tick, _)| tick))
            .collect()
    }

    fn process_detail(&self, pid: u32) -> Option<ProcessDetail> {
        self.read_pid_stat(pid).map(|(_, detail)| detail)
    }

    fn counts(&self) -> SystemCounts {
        let mut processes = 0;
        let mut threads = 0;
        for pid in self.pid_dirs() {
            processes += 1;
            if let Ok(status) = fs::read_to_string(self.pid_path(pid, "status")) {
                threads += process::parse_status_threads(&status).unwrap_or(0);
            }
        }

        // file-nr: allocated, unused, max
        let handles = fs::read_to_string(self.proc_root.join("sys/fs/file-nr"))
            .ok()
            .and_then(|s| s.split_whitespace().next()?.parse().ok())
            .unwrap_or(0);

        SystemCounts {
            processes,
            threads,
            handles,
            connections: network::read_connection_count(&self.proc_root),
        }
    }
}

impl SystemReader for LinuxSource {
    fn system_info(&self) -> SystemInfo {
        system::read_system_info(&self.proc_root, &self.sys_root, &self.etc_root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake_proc() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let proc_root = dir.path().join("proc");
        for (pid, name, utime, threads) in [(1, "init", 100, 1), (42, "my worker", 700, 8)] {
            let pid_dir = proc_root.join(pid.to_string());
            fs::create_dir_all(&pid_dir).unwrap();
            fs::write(
                pid_dir.join("stat"),
                format!("{pid} ({name}) S 0 {pid} {pid} 0 -1 0 0 0 0 0 {utime} 50 0 0 20 0 {threads} 0 100 1000 256 0\n"),
            )
            .unwrap();
            fs::write(pid_dir.join("status"), format!("Name:\t{name}\nThreads:\t{threads}\n")).unwrap();
        }
        // a pid directory whose stat is unreadable garbage
        let broken = proc_root.join("99");
        fs::create_dir_all(&broken).unwrap();
        fs::write(broken.join("stat"), "99 (gone").unwrap();
        fs::create_dir_all(proc_root.join("self")).unwrap();
        fs::create_dir_all(proc_root.join("sys/fs")).unwrap();
        fs::write(proc_root.join("sys/fs/file-nr"), "2048\t0\t9223372036854775807\n").unwrap();
        dir
    }

    #[test]
    fn enumerates_process_ticks_and_skips_broken() {
        let dir = fake_proc();
        let src = LinuxSource::with_roots(dir.path().join("proc"), dir.path().join("sys"), dir.path().join("etc"));
        let mut ticks = src.process_ticks();
        ticks.sort_by_key(|t| t.pid);
        assert_eq!(ticks.len(), 2);
        assert_eq!(ticks[1], ProcTick { pid: 42, utime: 700, stime: 50 });
    }

    #[test]
    fn details_and_counts() {
        let dir = fake_proc();
        let src = LinuxSource::with_roots(dir.path().join("proc"), dir.path().join("sys"), dir.path().join("etc"));
        let detail = src.process_detail(42).unwrap();
        assert_eq!(detail.name, "my worker");
        assert_eq!(detail.threads, 8);
        assert!(src.process_detail(99).is_none());
        assert!(src.process_detail(12345).is_none());

        let counts = src.counts();
        assert_eq!(counts.processes, 3);
        assert_eq!(counts.threads, 9);
        assert_eq!(counts.handles, 2048);
        assert_eq!(counts.connections, 0);
    }

    #[test]
    fn empty_roots_are_all_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let src = LinuxSource::with_roots(dir.path().join("p"), dir.path().join("s"), dir.path().join("e"));
        assert_eq!(src.stat(), StatSnapshot::default());
        assert_eq!(src.memory(), MemoryDetail::default());
        assert_eq!(src.net_counters(), NetCounters::default());
        assert_eq!(src.disk_counters(), DiskCounters::default());
        assert!(src.partitions().is_empty());
        assert!(!src.battery().available);
        assert!(src.process_ticks().is_empty());
        assert_eq!(src.counts(), SystemCounts::default());
        assert_eq!(src.sensors().load_average, None);
    }
}
