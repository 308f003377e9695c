use super::ProcessInfo;
use serde::Serialize;

#[derive(Debug, Clone, Default, Serialize)]
pub struct CpuInfo {
    /// Fraction in [0, 1].
    pub usage: f64,
    pub peak_percent: f64,
    pub per_core_percent: Vec<f64>,
    pub iowait_percent: f64,
    pub temperature_celsius: f64,
    pub frequency_mhz: f64,
    pub load_average: Option<[f64; 3]>,
    pub context_switches_per_sec: f64,
    pub interrupts_per_sec: f64,
    pub uptime_secs: u64,
}

/// Sensor readings that are not tick counters.
#[derive(Debug, Clone, Default)]
pub struct CpuSensors {
    pub temperature_celsius: f64,
    pub frequency_mhz: f64,
    pub load_average: Option<[f64; 3]>,
    pub uptime_secs: u64,
}

/// All values in kB, as `/proc/meminfo` reports them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MemoryDetail {
    pub total_kb: u64,
    pub available_kb: u64,
    pub free_kb: u64,
    pub buffers_kb: u64,
    pub cached_kb: u64,
    pub sreclaimable_kb: u64,
    pub dirty_kb: u64,
    pub writeback_kb: u64,
    pub swap_total_kb: u64,
    pub swap_free_kb: u64,
    pub swap_cached_kb: u64,
    pub shared_kb: u64,
    pub active_kb: u64,
    pub inactive_kb: u64,
    pub committed_kb: u64,
}

impl MemoryDetail {
    pub fn used_kb(&self) -> u64 {
        self.total_kb.saturating_sub(self.available_kb)
    }

    /// Fraction of physical memory in use, 0 when the total is unknown.
    pub fn used_fraction(&self) -> f64 {
        if self.total_kb == 0 {
            return 0.0;
        }
        self.used_kb() as f64 / self.total_kb as f64
    }

    pub fn swap_used_kb(&self) -> u64 {
        self.swap_total_kb.saturating_sub(self.swap_free_kb)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct NetworkInfo {
    pub down_bytes_per_sec: f64,
    pub up_bytes_per_sec: f64,
    pub session_rx: u64,
    pub session_tx: u64,
    pub total_rx: u64,
    pub total_tx: u64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DiskIoInfo {
    pub read_bytes_per_sec: f64,
    pub write_bytes_per_sec: f64,
    pub total_read: u64,
    pub total_write: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DiskPartition {
    pub mount_point: String,
    pub fs_type: String,
    pub total_gb: f64,
    pub used_gb: f64,
    /// Fraction in [0, 1].
    pub usage: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GpuInfo {
    pub available: bool,
    pub name: String,
    pub temperature_celsius: u32,
    pub utilization_percent: u32,
    pub memory_used_mb: u64,
    pub memory_total_mb: u64,
    pub fan_speed_percent: u32,
    pub power_watts: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatteryInfo {
    pub available: bool,
    pub percent: u32,
    pub status: String,
    pub charging: bool,
    pub power_watts: f64,
    pub minutes_remaining: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SystemInfo {
    pub os_name: String,
    pub os_version: String,
    pub kernel_version: String,
    pub hostname: String,
    pub username: String,
    pub architecture: String,
    pub cpu_model: String,
    pub logical_cores: usize,
    pub physical_cores: usize,
    pub max_frequency_mhz: f64,
    pub total_ram_gb: f64,
}

/// Global counts refreshed on the slow tier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SystemCounts {
    pub processes: usize,
    pub threads: u64,
    /// Open file handles on Linux, kernel handles on Windows.
    pub handles: u64,
    pub connections: usize,
}

/// The read-only view handed to the renderer once per frame.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SystemSnapshot {
    pub cpu: CpuInfo,
    pub memory: MemoryDetail,
    pub ram_peak_percent: f64,
    pub network: NetworkInfo,
    pub disk_io: DiskIoInfo,
    pub partitions: Vec<DiskPartition>,
    pub gpu: GpuInfo,
    pub battery: BatteryInfo,
    pub counts: SystemCounts,
    pub processes: Vec<ProcessInfo>,
    pub system: SystemInfo,
    pub fast_ticks: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_fraction_handles_unknown_total() {
        assert_eq!(MemoryDetail::default().used_fraction(), 0.0);
        let m = MemoryDetail { total_kb: 1000, available_kb: 250, ..Default::default() };
        assert!((m.used_fraction() - 0.75).abs() < 1e-9);
    }

    #[test]
    fn swap_used_never_underflows() {
        let m = MemoryDetail { swap_total_kb: 10, swap_free_kb: 20, ..Default::default() };
        assert_eq!(m.swap_used_kb(), 0);
    }

    #[test]
    fn defaults_mean_not_probed() {
        assert!(!GpuInfo::default().available);
        assert!(!BatteryInfo::default().available);
        assert_eq!(BatteryInfo::default().minutes_remaining, None);
    }
}
