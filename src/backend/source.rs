//! Capability seams between the OS-specific readers and the OS-neutral
//! collector. Every method is best effort: a missing file or failed call
//! yields a default value, never an error.

use crate::model::{
    BatteryInfo, CpuSensors, DiskCounters, DiskPartition, MemoryDetail, NetCounters,
    ProcTick, ProcessDetail, StatSnapshot, SystemCounts, SystemInfo,
};

pub trait CpuReader {
    /// Aggregate ticks, per-core ticks and kernel counters from one read.
    fn stat(&self) -> StatSnapshot;
    fn sensors(&self) -> CpuSensors;
}

pub trait MemoryReader {
    fn memory(&self) -> MemoryDetail;
}

pub trait NetworkReader {
    fn net_counters(&self) -> NetCounters;
    fn connection_count(&self) -> usize;
}

pub trait DiskReader {
    fn disk_counters(&self) -> DiskCounters;
    fn partitions(&self) -> Vec<DiskPartition>;
}

pub trait BatteryReader {
    fn battery(&self) -> BatteryInfo;
}

pub trait ProcessReader {
    /// CPU ticks of every live process, in enumeration order.
    fn process_ticks(&self) -> Vec<ProcTick>;
    /// `None` when the process exited or could not be read.
    fn process_detail(&self, pid: u32) -> Option<ProcessDetail>;
    fn counts(&self) -> SystemCounts;
}

pub trait SystemReader {
    fn system_info(&self) -> SystemInfo;
}

pub trait Source:
    CpuReader + MemoryReader + NetworkReader + DiskReader + BatteryReader + ProcessReader + SystemReader
{
}

impl<T> Source for T where
    T: CpuReader + MemoryReader + NetworkReader + DiskReader + BatteryReader + ProcessReader + SystemReader
{
}
