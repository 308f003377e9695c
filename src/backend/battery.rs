use crate::model::BatteryInfo;
use std::fs;
use std::path::{Path, PathBuf};

/// Below this draw the remaining-time estimate is noise.
const MIN_POWER_FOR_ESTIMATE_W: f64 = 0.1;

/// Locate the first battery under `power_supply`. Entries are matched by
/// their `type` file, falling back to the conventional BAT0/BAT1 names.
pub fn find_battery(sys_root: &Path) -> Option<PathBuf> {
    let ps_dir = sys_root.join("class/power_supply");

    if let Ok(entries) = fs::read_dir(&ps_dir) {
        let mut paths: Vec<PathBuf> = entries.flatten().map(|e| e.path()).collect();
        paths.sort();
        for path in paths {
            if let Ok(t) = fs::read_to_string(path.join("type")) {
                if t.trim() == "Battery" {
                    return Some(path);
                }
            }
        }
    }

    ["BAT0", "BAT1"]
        .iter()
        .map(|name| ps_dir.join(name))
        .find(|p| p.join("capacity").exists())
}

pub fn read_battery(sys_root: &Path) -> BatteryInfo {
    match find_battery(sys_root) {
        Some(path) => read_battery_at(&path),
        None => BatteryInfo::default(),
    }
}

pub fn read_battery_at(bat_path: &Path) -> BatteryInfo {
    let read_u64 = |name: &str| read_sysfs_u64(&bat_path.join(name));

    // energy_* in µWh; some firmware only exposes charge_* in µAh
    let energy_now = read_u64("energy_now").or_else(|| {
        let charge = read_u64("charge_now")?;
        let voltage = read_u64("voltage_now")?;
        Some(charge * voltage / 1_000_000)
    });
    let energy_full = read_u64("energy_full").or_else(|| {
        let charge = read_u64("charge_full")?;
        let voltage = read_u64("voltage_now")?;
        Some(charge * voltage / 1_000_000)
    });

    let percent = read_u64("capacity").map(|c| c.min(100) as u32).or_else(|| {
        let (now, full) = (energy_now?, energy_full?);
        (full > 0).then(|| ((now as f64 / full as f64) * 100.0).round().min(100.0) as u32)
    });
    let Some(percent) = percent else {
        return BatteryInfo::default();
    };

    let status = fs::read_to_string(bat_path.join("status"))
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|_| "Unknown".to_string());
    let charging = status == "Charging" || status == "Full";

    let power_uw = read_u64("power_now")
        .or_else(|| {
            let current = read_u64("current_now")?;
            let voltage = read_u64("voltage_now")?;
            Some(current * voltage / 1_000_000) // µA * µV -> µW
        })
        .unwrap_or(0);
    let power_watts = power_uw as f64 / 1_000_000.0;

    let minutes_remaining = match (energy_now, energy_full) {
        (Some(now), Some(full)) if power_watts > MIN_POWER_FOR_ESTIMATE_W => {
            let energy_wh = if charging {
                full.saturating_sub(now) as f64 / 1_000_000.0
            } else {
                now as f64 / 1_000_000.0
            };
            Some((energy_wh / power_watts * 60.0) as u32)
        }
        _ => None,
    };

    BatteryInfo {
        available: true,
        percent,
        status,
        charging,
        power_watts,
        minutes_remaining,
    }
}

fn read_sysfs_u64(path: &Path) -> Option<u64> {
    fs::read_to_string(path).ok()?.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_supply(root: &Path, name: &str, files: &[(&str, &str)]) -> PathBuf {
        let dir = root.join("class/power_supply").join(name);
        fs::create_dir_all(&dir).unwrap();
        for (file, value) in files {
            fs::write(dir.join(file), format!("{}\n", value)).unwrap();
        }
        dir
    }

    #[test]
    fn no_power_supply_means_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let info = read_battery(dir.path());
        assert!(!info.available);
        assert_eq!(info.percent, 0);
    }

    #[test]
    fn discharging_estimate() {
        let dir = tempfile::tempdir().unwrap();
        write_supply(dir.path(), "AC", &[("type", "Mains"), ("online", "0")]);
        write_supply(
            dir.path(),
            "BAT0",
            &[
                ("type", "Battery"),
                ("capacity", "80"),
                ("status", "Discharging"),
                ("power_now", "10000000"),
                ("energy_now", "40000000"),
                ("energy_full", "50000000"),
            ],
        );
        let info = read_battery(dir.path());
        assert!(info.available);
        assert_eq!(info.percent, 80);
        assert!(!info.charging);
        assert!((info.power_watts - 10.0).abs() < 1e-9);
        assert_eq!(info.minutes_remaining, Some(240));
    }

    #[test]
    fn charging_estimate_uses_missing_energy() {
        let dir = tempfile::tempdir().unwrap();
        write_supply(
            dir.path(),
            "BAT1",
            &[
                ("type", "Battery"),
                ("capacity", "80"),
                ("status", "Charging"),
                ("power_now", "20000000"),
                ("energy_now", "40000000"),
                ("energy_full", "50000000"),
            ],
        );
        let info = read_battery(dir.path());
        assert!(info.charging);
        assert_eq!(info.minutes_remaining, Some(30));
    }

    #[test]
    fn charge_based_firmware_and_no_draw() {
        let dir = tempfile::tempdir().unwrap();
        write_supply(
            dir.path(),
            "CMB0",
            &[
                ("type", "Battery"),
                ("status", "Full"),
                ("charge_now", "3000000"),
                ("charge_full", "4000000"),
                ("voltage_now", "12000000"),
            ],
        );
        let info = read_battery(dir.path());
        assert!(info.available);
        assert_eq!(info.percent, 75);
        assert!(info.charging);
        assert_eq!(info.power_watts, 0.0);
        assert_eq!(info.minutes_remaining, None);
    }

    #[test]
    fn untyped_bat0_is_found() {
        let dir = tempfile::tempdir().unwrap();
        write_supply(dir.path(), "BAT0", &[("capacity", "55")]);
        let info = read_battery(dir.path());
        assert!(info.available);
        assert_eq!(info.percent, 55);
        assert_eq!(info.status, "Unknown");
    }
}
