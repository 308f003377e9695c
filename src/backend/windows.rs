use crate::backend::source::{
    BatteryReader, CpuReader, DiskReader, MemoryReader, NetworkReader, ProcessReader, SystemReader,
};
use crate::model::{
    BatteryInfo, CpuSensors, CpuTicks, DiskCounters, DiskPartition, MemoryDetail, NetCounters,
    ProcTick, ProcessDetail, ProcessState, StatSnapshot, SystemCounts, SystemInfo,
};
use std::cell::RefCell;
use std::collections::HashMap;
use std::ffi::OsString;
use std::mem;
use std::os::windows::ffi::{OsStrExt, OsStringExt};
use std::ptr;

use windows_sys::Win32::Foundation::{CloseHandle, FILETIME, HANDLE, INVALID_HANDLE_VALUE};
use windows_sys::Win32::NetworkManagement::IpHelper::{GetIfTable, GetTcpTable, MIB_IFTABLE, MIB_TCPTABLE};
use windows_sys::Win32::Storage::FileSystem::{
    CreateFileW, GetDiskFreeSpaceExW, GetDriveTypeW, GetLogicalDrives, GetVolumeInformationW,
    FILE_SHARE_READ, FILE_SHARE_WRITE, OPEN_EXISTING,
};
use windows_sys::Win32::System::Diagnostics::ToolHelp::{
    CreateToolhelp32Snapshot, Process32FirstW, Process32NextW, PROCESSENTRY32W, TH32CS_SNAPPROCESS,
};
use windows_sys::Win32::System::Ioctl::{DISK_PERFORMANCE, IOCTL_DISK_PERFORMANCE};
use windows_sys::Win32::System::IO::DeviceIoControl;
use windows_sys::Win32::System::Power::{GetSystemPowerStatus, SYSTEM_POWER_STATUS};
use windows_sys::Win32::System::ProcessStatus::{
    GetPerformanceInfo, GetProcessMemoryInfo, PERFORMANCE_INFORMATION, PROCESS_MEMORY_COUNTERS,
};
use windows_sys::Win32::System::SystemInformation::{GetTickCount64, GlobalMemoryStatusEx, MEMORYSTATUSEX};
use windows_sys::Win32::System::Threading::{
    GetProcessTimes, GetSystemTimes, OpenProcess, PROCESS_QUERY_LIMITED_INFORMATION,
};
use winreg::enums::HKEY_LOCAL_MACHINE;
use winreg::RegKey;

const IF_TYPE_SOFTWARE_LOOPBACK: u32 = 24;
const IF_OPER_STATUS_OPERATIONAL: i32 = 5;
const DRIVE_FIXED: u32 = 3;
const MAX_PHYSICAL_DRIVES: u32 = 16;
const GIB: f64 = 1024.0 * 1024.0 * 1024.0;
const WINDOWS_11_FIRST_BUILD: u32 = 22000;

const CURRENT_VERSION_KEY: &str = r"SOFTWARE\Microsoft\Windows NT\CurrentVersion";
const PROCESSOR_KEY: &str = r"HARDWARE\DESCRIPTION\System\CentralProcessor\0";

/// Win32 counters. Per-core ticks are not exposed without PDH, so
/// `StatSnapshot::cores` stays empty.
#[derive(Default)]
pub struct WindowsSource {
    /// Name and thread count per PID from the last toolhelp walk.
    listed: RefCell<HashMap<u32, (String, u32)>>,
}

impl WindowsSource {
    pub fn new() -> Self {
        if battery_status().map_or(false, |s| s.BatteryFlag != 128) {
            log::info!("Battery found");
        } else {
            log::info!("No battery found (desktop PC?)");
        }
        Self::default()
    }
}

/// Closes the wrapped handle on drop.
struct OwnedHandle(HANDLE);

impl OwnedHandle {
    fn new(handle: HANDLE) -> Option<Self> {
        (!handle.is_null() && handle != INVALID_HANDLE_VALUE).then_some(Self(handle))
    }
}

impl Drop for OwnedHandle {
    fn drop(&mut self) {
        unsafe { CloseHandle(self.0) };
    }
}

fn filetime_u64(ft: &FILETIME) -> u64 {
    ((ft.dwHighDateTime as u64) << 32) | ft.dwLowDateTime as u64
}

fn wide(s: &str) -> Vec<u16> {
    std::ffi::OsStr::new(s).encode_wide().chain(std::iter::once(0)).collect()
}

fn from_wide(buf: &[u16]) -> String {
    let len = buf.iter().position(|&c| c == 0).unwrap_or(buf.len());
    OsString::from_wide(&buf[..len]).to_string_lossy().into_owned()
}

fn memory_status() -> Option<MEMORYSTATUSEX> {
    let mut status: MEMORYSTATUSEX = unsafe { mem::zeroed() };
    status.dwLength = mem::size_of::<MEMORYSTATUSEX>() as u32;
    (unsafe { GlobalMemoryStatusEx(&mut status) } != 0).then_some(status)
}

fn performance_info() -> Option<PERFORMANCE_INFORMATION> {
    let size = mem::size_of::<PERFORMANCE_INFORMATION>() as u32;
    let mut info: PERFORMANCE_INFORMATION = unsafe { mem::zeroed() };
    info.cb = size;
    (unsafe { GetPerformanceInfo(&mut info, size) } != 0).then_some(info)
}

fn battery_status() -> Option<SYSTEM_POWER_STATUS> {
    let mut status: SYSTEM_POWER_STATUS = unsafe { mem::zeroed() };
    (unsafe { GetSystemPowerStatus(&mut status) } != 0).then_some(status)
}

/// Walk a toolhelp process snapshot, calling `f` on every entry until it
/// returns `false`.
fn for_each_process(mut f: impl FnMut(&PROCESSENTRY32W) -> bool) {
    let Some(snapshot) = OwnedHandle::new(unsafe { CreateToolhelp32Snapshot(TH32CS_SNAPPROCESS, 0) }) else {
        return;
    };
    let mut entry: PROCESSENTRY32W = unsafe { mem::zeroed() };
    entry.dwSize = mem::size_of::<PROCESSENTRY32W>() as u32;

    let mut ok = unsafe { Process32FirstW(snapshot.0, &mut entry) } != 0;
    while ok {
        if !f(&entry) {
            return;
        }
        ok = unsafe { Process32NextW(snapshot.0, &mut entry) } != 0;
    }
}

fn open_process(pid: u32) -> Option<OwnedHandle> {
    OwnedHandle::new(unsafe { OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, 0, pid) })
}

/// (kernel, user) time in 100 ns units.
fn process_times(pid: u32) -> Option<(u64, u64)> {
    let process = open_process(pid)?;
    let mut creation: FILETIME = unsafe { mem::zeroed() };
    let mut exit: FILETIME = unsafe { mem::zeroed() };
    let mut kernel: FILETIME = unsafe { mem::zeroed() };
    let mut user: FILETIME = unsafe { mem::zeroed() };
    let ok = unsafe { GetProcessTimes(process.0, &mut creation, &mut exit, &mut kernel, &mut user) };
    (ok != 0).then(|| (filetime_u64(&kernel), filetime_u64(&user)))
}

fn working_set_bytes(pid: u32) -> u64 {
    let Some(process) = open_process(pid) else {
        return 0;
    };
    let size = mem::size_of::<PROCESS_MEMORY_COUNTERS>() as u32;
    let mut counters: PROCESS_MEMORY_COUNTERS = unsafe { mem::zeroed() };
    counters.cb = size;
    if unsafe { GetProcessMemoryInfo(process.0, &mut counters, size) } != 0 {
        counters.WorkingSetSize as u64
    } else {
        0
    }
}

/// Call a size-probing IP Helper table function twice: once for the size,
/// once with a buffer that large.
fn ip_table(fetch: impl Fn(*mut u8, *mut u32) -> u32) -> Option<Vec<u64>> {
    let mut size = 0u32;
    fetch(ptr::null_mut(), &mut size);
    if size == 0 {
        return None;
    }
    // u64 storage keeps the table 8-byte aligned
    let mut buf = vec![0u64; (size as usize).div_ceil(8)];
    (fetch(buf.as_mut_ptr() as *mut u8, &mut size) == 0).then_some(buf)
}

fn read_registry_string(path: &str, name: &str) -> Option<String> {
    RegKey::predef(HKEY_LOCAL_MACHINE)
        .open_subkey(path)
        .ok()?
        .get_value::<String, _>(name)
        .ok()
}

fn read_registry_u32(path: &str, name: &str) -> Option<u32> {
    RegKey::predef(HKEY_LOCAL_MACHINE)
        .open_subkey(path)
        .ok()?
        .get_value::<u32, _>(name)
        .ok()
}

/// The registry still says "Windows 10" on Windows 11.
pub fn windows_product_name(product: &str, build: u32) -> String {
    if build >= WINDOWS_11_FIRST_BUILD {
        product.replacen("Windows 10", "Windows 11", 1)
    } else {
        product.to_string()
    }
}

impl CpuReader for WindowsSource {
    fn stat(&self) -> StatSnapshot {
        let mut idle: FILETIME = unsafe { mem::zeroed() };
        let mut kernel: FILETIME = unsafe { mem::zeroed() };
        let mut user: FILETIME = unsafe { mem::zeroed() };
        if unsafe { GetSystemTimes(&mut idle, &mut kernel, &mut user) } == 0 {
            return StatSnapshot::default();
        }
        StatSnapshot {
            total: CpuTicks::from_system_times(filetime_u64(&idle), filetime_u64(&kernel), filetime_u64(&user)),
            ..Default::default()
        }
    }

    fn sensors(&self) -> CpuSensors {
        CpuSensors {
            temperature_celsius: 0.0,
            frequency_mhz: read_registry_u32(PROCESSOR_KEY, "~MHz").unwrap_or(0) as f64,
            load_average: None,
            uptime_secs: unsafe { GetTickCount64() } / 1000,
        }
    }
}

impl MemoryReader for WindowsSource {
    fn memory(&self) -> MemoryDetail {
        let Some(status) = memory_status() else {
            return MemoryDetail::default();
        };
        let mut detail = MemoryDetail {
            total_kb: status.ullTotalPhys / 1024,
            available_kb: status.ullAvailPhys / 1024,
            free_kb: status.ullAvailPhys / 1024,
            // page file total includes physical memory
            swap_total_kb: status.ullTotalPageFile.saturating_sub(status.ullTotalPhys) / 1024,
            swap_free_kb: status.ullAvailPageFile.saturating_sub(status.ullAvailPhys) / 1024,
            ..Default::default()
        };
        if let Some(perf) = performance_info() {
            let page_kb = perf.PageSize as u64 / 1024;
            detail.committed_kb = perf.CommitTotal as u64 * page_kb;
            detail.cached_kb = perf.SystemCache as u64 * page_kb;
        }
        detail
    }
}

impl NetworkReader for WindowsSource {
    fn net_counters(&self) -> NetCounters {
        let Some(buf) = ip_table(|p, size| unsafe { GetIfTable(p as *mut MIB_IFTABLE, size, 0) }) else {
            return NetCounters::default();
        };
        let table = buf.as_ptr() as *const MIB_IFTABLE;
        let mut counters = NetCounters::default();
        unsafe {
            let rows = std::slice::from_raw_parts((*table).table.as_ptr(), (*table).dwNumEntries as usize);
            for row in rows {
                if row.dwType as u32 == IF_TYPE_SOFTWARE_LOOPBACK
                    || row.dwOperStatus as i32 != IF_OPER_STATUS_OPERATIONAL
                {
                    continue;
                }
                counters.rx_bytes += row.dwInOctets as u64;
                counters.tx_bytes += row.dwOutOctets as u64;
            }
        }
        counters
    }

    fn connection_count(&self) -> usize {
        match ip_table(|p, size| unsafe { GetTcpTable(p as *mut MIB_TCPTABLE, size, 0) }) {
            Some(buf) => unsafe { (*(buf.as_ptr() as *const MIB_TCPTABLE)).dwNumEntries as usize },
            None => 0,
        }
    }
}

impl DiskReader for WindowsSource {
    fn disk_counters(&self) -> DiskCounters {
        let mut total = DiskCounters::default();
        for index in 0..MAX_PHYSICAL_DRIVES {
            let path = wide(&format!(r"\\.\PhysicalDrive{index}"));
            let handle = unsafe {
                CreateFileW(
                    path.as_ptr(),
                    0,
                    FILE_SHARE_READ | FILE_SHARE_WRITE,
                    ptr::null(),
                    OPEN_EXISTING,
                    0,
                    ptr::null_mut(),
                )
            };
            let Some(drive) = OwnedHandle::new(handle) else {
                continue;
            };
            let mut perf: DISK_PERFORMANCE = unsafe { mem::zeroed() };
            let mut returned = 0u32;
            let ok = unsafe {
                DeviceIoControl(
                    drive.0,
                    IOCTL_DISK_PERFORMANCE,
                    ptr::null(),
                    0,
                    &mut perf as *mut _ as *mut _,
                    mem::size_of::<DISK_PERFORMANCE>() as u32,
                    &mut returned,
                    ptr::null_mut(),
                )
            };
            if ok != 0 {
                total.read_bytes += perf.BytesRead.max(0) as u64;
                total.write_bytes += perf.BytesWritten.max(0) as u64;
            }
        }
        total
    }

    fn partitions(&self) -> Vec<DiskPartition> {
        let mask = unsafe { GetLogicalDrives() };
        (0..26u8)
            .filter(|bit| mask & (1u32 << *bit) != 0)
            .filter_map(|bit| {
                let root = format!("{}:\\", (b'A' + bit) as char);
                let root_w = wide(&root);
                if unsafe { GetDriveTypeW(root_w.as_ptr()) } != DRIVE_FIXED {
                    return None;
                }
                let (mut avail, mut total, mut free) = (0u64, 0u64, 0u64);
                if unsafe { GetDiskFreeSpaceExW(root_w.as_ptr(), &mut avail, &mut total, &mut free) } == 0 {
                    return None;
                }
                let mut fs_name = [0u16; 64];
                let fs_type = if unsafe {
                    GetVolumeInformationW(
                        root_w.as_ptr(),
                        ptr::null_mut(),
                        0,
                        ptr::null_mut(),
                        ptr::null_mut(),
                        ptr::null_mut(),
                        fs_name.as_mut_ptr(),
                        fs_name.len() as u32,
                    )
                } != 0
                {
                    from_wide(&fs_name)
                } else {
                    String::new()
                };

                let total_gb = total as f64 / GIB;
                if total_gb <= 0.1 {
                    return None;
                }
                let used_gb = total.saturating_sub(free) as f64 / GIB;
                Some(DiskPartition {
                    mount_point: root,
                    fs_type,
                    total_gb,
                    used_gb,
                    usage: used_gb / total_gb,
                })
            })
            .collect()
    }
}

impl BatteryReader for WindowsSource {
    fn battery(&self) -> BatteryInfo {
        let Some(status) = battery_status() else {
            return BatteryInfo::default();
        };
        // 128: no system battery, 255: unknown
        if status.BatteryFlag == 128 || status.BatteryLifePercent > 100 {
            return BatteryInfo::default();
        }
        let charging = status.ACLineStatus == 1;
        BatteryInfo {
            available: true,
            percent: status.BatteryLifePercent as u32,
            status: if charging { "Charging" } else { "Discharging" }.to_string(),
            charging,
            power_watts: 0.0,
            minutes_remaining: (status.BatteryLifeTime != u32::MAX).then(|| status.BatteryLifeTime / 60),
        }
    }
}

impl ProcessReader for WindowsSource {
    fn process_ticks(&self) -> Vec<ProcTick> {
        let mut ticks = Vec::new();
        let mut listed = self.listed.borrow_mut();
        listed.clear();
        for_each_process(|entry| {
            let pid = entry.th32ProcessID;
            if let Some((kernel, user)) = process_times(pid) {
                ticks.push(ProcTick { pid, utime: user, stime: kernel });
                listed.insert(pid, (from_wide(&entry.szExeFile), entry.cntThreads));
            }
            true
        });
        ticks
    }

    fn process_detail(&self, pid: u32) -> Option<ProcessDetail> {
        let listed = self.listed.borrow();
        let (name, threads) = listed.get(&pid)?;
        Some(ProcessDetail {
            name: name.clone(),
            state: ProcessState::Running,
            memory_bytes: working_set_bytes(pid),
            threads: *threads,
        })
    }

    fn counts(&self) -> SystemCounts {
        let perf = performance_info();
        SystemCounts {
            processes: perf.as_ref().map_or(0, |p| p.ProcessCount as usize),
            threads: perf.as_ref().map_or(0, |p| p.ThreadCount as u64),
            handles: perf.as_ref().map_or(0, |p| p.HandleCount as u64),
            connections: self.connection_count(),
        }
    }
}

impl SystemReader for WindowsSource {
    fn system_info(&self) -> SystemInfo {
        let product = read_registry_string(CURRENT_VERSION_KEY, "ProductName").unwrap_or_else(|| "Windows".into());
        let build = read_registry_string(CURRENT_VERSION_KEY, "CurrentBuildNumber")
            .and_then(|b| b.trim().parse().ok())
            .unwrap_or(0);
        let logical = std::thread::available_parallelism().map_or(0, |n| n.get());

        SystemInfo {
            os_name: windows_product_name(&product, build),
            os_version: read_registry_string(CURRENT_VERSION_KEY, "DisplayVersion").unwrap_or_default(),
            kernel_version: sysinfo::System::kernel_version().unwrap_or_default(),
            hostname: sysinfo::System::host_name().unwrap_or_default(),
            username: std::env::var("USERNAME").unwrap_or_else(|_| "unknown".to_string()),
            architecture: std::env::consts::ARCH.to_string(),
            cpu_model: read_registry_string(PROCESSOR_KEY, "ProcessorNameString")
                .map(|s| s.trim().to_string())
                .unwrap_or_default(),
            logical_cores: logical,
            physical_cores: logical,
            max_frequency_mhz: read_registry_u32(PROCESSOR_KEY, "~MHz").unwrap_or(0) as f64,
            total_ram_gb: memory_status().map_or(0.0, |m| m.ullTotalPhys as f64 / GIB),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn windows_11_is_renamed() {
        assert_eq!(windows_product_name("Windows 10 Pro", 22631), "Windows 11 Pro");
        assert_eq!(windows_product_name("Windows 10 Pro", 19045), "Windows 10 Pro");
    }

    #[test]
    fn filetime_halves_combine() {
        let ft = FILETIME { dwLowDateTime: 1, dwHighDateTime: 2 };
        assert_eq!(filetime_u64(&ft), (2u64 << 32) | 1);
    }

    #[test]
    fn wide_round_trip_stops_at_nul() {
        let w = wide("C:\\");
        assert_eq!(w.last(), Some(&0));
        assert_eq!(from_wide(&w), "C:\\");
    }

    #[test]
    fn live_counters_are_sane() {
        let src = WindowsSource::default();
        assert!(src.stat().total.total() > 0);
        assert!(src.memory().total_kb > 0);
        assert!(src.stat().cores.is_empty());
        assert!(!src.process_ticks().is_empty());
    }

    #[test]
    fn details_come_from_the_tick_walk() {
        let src = WindowsSource::default();
        assert!(src.process_detail(std::process::id()).is_none());

        let ticks = src.process_ticks();
        let me = std::process::id();
        assert!(ticks.iter().any(|t| t.pid == me));
        let detail = src.process_detail(me).unwrap();
        assert!(!detail.name.is_empty());
        assert!(detail.threads >= 1);
    }
}
