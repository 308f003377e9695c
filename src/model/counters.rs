//! Raw, monotonically increasing counters read at a single instant.
//!
//! Only the difference between two readings of the same family means
//! anything; the derived rates live in `backend::delta`.

use std::collections::BTreeMap;

/// One `cpu` line of `/proc/stat`, or the Windows aggregate mapped onto it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuTicks {
    pub user: u64,
    pub nice: u64,
    pub system: u64,
    pub idle: u64,
    pub iowait: u64,
    pub irq: u64,
    pub softirq: u64,
    pub steal: u64,
}

impl CpuTicks {
    /// `GetSystemTimes` reports kernel time including idle time.
    pub fn from_system_times(idle: u64, kernel: u64, user: u64) -> Self {
        Self {
            user,
            system: kernel.saturating_sub(idle),
            idle,
            ..Default::default()
        }
    }

    pub fn idle_total(&self) -> u64 {
        self.idle.saturating_add(self.iowait)
    }

    pub fn busy_total(&self) -> u64 {
        [self.nice, self.system, self.irq, self.softirq, self.steal]
            .iter()
            .fold(self.user, |acc, v| acc.saturating_add(*v))
    }

    pub fn total(&self) -> u64 {
        self.busy_total().saturating_add(self.idle_total())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KernelCounters {
    pub context_switches: u64,
    pub interrupts: u64,
}

/// Everything taken from one read of `/proc/stat`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatSnapshot {
    pub total: CpuTicks,
    /// Keyed by the N of `cpuN`. Offline or unreadable cores are absent.
    pub cores: BTreeMap<u32, CpuTicks>,
    pub kernel: KernelCounters,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NetCounters {
    pub rx_bytes: u64,
    pub tx_bytes: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiskCounters {
    pub read_bytes: u64,
    pub write_bytes: u64,
}

/// Per-PID CPU time in OS tick units (jiffies on Linux, 100ns on Windows).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcTick {
    pub pid: u32,
    pub utime: u64,
    pub stime: u64,
}

impl ProcTick {
    pub fn total(&self) -> u64 {
        self.utime.saturating_add(self.stime)
    }
}
