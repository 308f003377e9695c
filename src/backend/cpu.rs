use crate::model::{CpuTicks, StatSnapshot};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Parse all of `/proc/stat` in one pass.
pub fn parse_proc_stat(stat: &str) -> StatSnapshot {
    let mut snapshot = StatSnapshot::default();
    let mut in_cores = true;

    for line in stat.lines() {
        let mut parts = line.split_whitespace();
        let label = match parts.next() {
            Some(l) => l,
            None => continue,
        };

        if label == "cpu" {
            if let Some(t) = parse_tick_fields(parts) {
                snapshot.total = t;
            }
        } else if let Some(id) = label.strip_prefix("cpu").filter(|_| in_cores) {
            // a malformed core line leaves its id absent, never shifts the others
            let id = id.parse::<u32>().ok();
            if let (Some(id), Some(t)) = (id, parse_tick_fields(parts)) {
                snapshot.cores.insert(id, t);
            }
        } else {
            in_cores = false;
            match label {
                "ctxt" => {
                    snapshot.kernel.context_switches =
                        parts.next().and_then(|v| v.parse().ok()).unwrap_or(0)
                }
                "intr" => {
                    snapshot.kernel.interrupts =
                        parts.next().and_then(|v| v.parse().ok()).unwrap_or(0)
                }
                _ => {}
            }
        }
    }

    snapshot
}

/// user nice system idle [iowait irq softirq steal]; older kernels stop early.
fn parse_tick_fields<'a>(fields: impl Iterator<Item = &'a str>) -> Option<CpuTicks> {
    let mut values = [0u64; 8];
    let mut n = 0;
    for (slot, field) in values.iter_mut().zip(fields) {
        *slot = field.parse().ok()?;
        n += 1;
    }
    if n < 4 {
        return None;
    }
    let [user, nice, system, idle, iowait, irq, softirq, steal] = values;
    Some(CpuTicks { user, nice, system, idle, iowait, irq, softirq, steal })
}

pub fn read_stat(proc_root: &Path) -> StatSnapshot {
    parse_proc_stat(&fs::read_to_string(proc_root.join("stat")).unwrap_or_default())
}

pub fn cpu_model_name(cpuinfo: &str) -> String {
    cpuinfo
        .lines()
        .find(|l| l.starts_with("model name"))
        .and_then(|l| l.split(':').nth(1))
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| "Unknown CPU".to_string())
}

pub fn logical_core_count(cpuinfo: &str) -> usize {
    cpuinfo
        .lines()
        .filter(|l| l.starts_with("processor"))
        .count()
        .max(1)
}

/// Distinct `(physical id, core id)` pairs.
pub fn physical_core_count(cpuinfo: &str) -> usize {
    let mut cores = HashSet::new();
    let mut package = String::new();
    for line in cpuinfo.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        match key.trim() {
            "physical id" => package = value.trim().to_string(),
            "core id" => {
                cores.insert((package.clone(), value.trim().to_string()));
            }
            _ => {}
        }
    }
    cores.len().max(1)
}

fn cpuinfo_mhz(cpuinfo: &str) -> Option<f64> {
    cpuinfo
        .lines()
        .find(|l| l.starts_with("cpu MHz"))
        .and_then(|l| l.split(':').nth(1))
        .and_then(|s| s.trim().parse().ok())
}

/// Current frequency of cpu0 in MHz.
pub fn read_frequency_mhz(proc_root: &Path, sys_root: &Path) -> f64 {
    let cpufreq = sys_root.join("devices/system/cpu/cpu0/cpufreq/scaling_cur_freq");
    if let Ok(f) = fs::read_to_string(cpufreq) {
        if let Ok(khz) = f.trim().parse::<f64>() {
            return khz / 1000.0; // kHz -> MHz
        }
    }
    let cpuinfo = fs::read_to_string(proc_root.join("cpuinfo")).unwrap_or_default();
    cpuinfo_mhz(&cpuinfo).unwrap_or(0.0)
}

pub fn read_max_frequency_mhz(sys_root: &Path) -> f64 {
    fs::read_to_string(sys_root.join("devices/system/cpu/cpu0/cpufreq/cpuinfo_max_freq"))
        .ok()
        .and_then(|f| f.trim().parse::<f64>().ok())
        .map(|khz| khz / 1000.0)
        .unwrap_or(0.0)
}

/// Package temperature in °C, 0 when no sensor is readable.
pub fn read_temperature(sys_root: &Path) -> f64 {
    // Named CPU drivers first: coretemp (Intel), k10temp/zenpower (AMD)
    if let Ok(entries) = fs::read_dir(sys_root.join("class/hwmon")) {
        for entry in entries.flatten() {
            let path = entry.path();
            let name = fs::read_to_string(path.join("name")).unwrap_or_default();
            if matches!(name.trim(), "coretemp" | "k10temp" | "zenpower") {
                if let Some(t) = read_sensor(&path.join("temp1_input")) {
                    return t;
                }
            }
        }
    }

    let fallbacks = [
        "class/thermal/thermal_zone0/temp",
        "class/hwmon/hwmon0/temp1_input",
        "class/hwmon/hwmon1/temp1_input",
        "class/hwmon/hwmon2/temp1_input",
        "class/hwmon/hwmon3/temp1_input",
    ];
    fallbacks
        .iter()
        .find_map(|p| read_sensor(&sys_root.join(p)))
        .unwrap_or(0.0)
}

fn read_sensor(path: &Path) -> Option<f64> {
    let raw: f64 = fs::read_to_string(path).ok()?.trim().parse().ok()?;
    // sysfs reports millidegrees; a few drivers report whole degrees
    Some(if raw > 1000.0 { raw / 1000.0 } else { raw })
}

pub fn read_uptime_secs(proc_root: &Path) -> u64 {
    fs::read_to_string(proc_root.join("uptime"))
        .unwrap_or_default()
        .split_whitespace()
        .next()
        .and_then(|s| s.parse::<f64>().ok())
        .map(|f| f as u64)
        .unwrap_or(0)
}

pub fn read_load_average(proc_root: &Path) -> Option<[f64; 3]> {
    use procfs::FromRead;

    let load = procfs::LoadAverage::from_file(proc_root.join("loadavg")).ok()?;
    Some([load.one as f64, load.five as f64, load.fifteen as f64])
}
