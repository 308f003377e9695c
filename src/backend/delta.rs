//! Two-sample derivations. Everything here is pure: old snapshot, new
//! snapshot, elapsed time in; a non-negative number out.

use crate::model::{CpuTicks, DiskCounters, NetCounters};
use std::collections::BTreeMap;
use std::time::Duration;

/// Busy fraction in [0, 1] between two tick tuples.
pub fn cpu_usage(old: &CpuTicks, new: &CpuTicks) -> f64 {
    let total_delta = signed_delta(old.total(), new.total());
    if total_delta <= 0 {
        return 0.0;
    }
    let idle_delta = signed_delta(old.idle_total(), new.idle_total());
    ((total_delta - idle_delta) as f64 / total_delta as f64).clamp(0.0, 1.0)
}

/// Usage percent per core, indexed by core id up to the highest id seen in
/// either reading. A core missing from either side (hot-plugged, offline,
/// unreadable line) reports 0.
pub fn per_core_usage(old: &BTreeMap<u32, CpuTicks>, new: &BTreeMap<u32, CpuTicks>) -> Vec<f64> {
    let slots = old
        .keys()
        .chain(new.keys())
        .max()
        .map_or(0, |&id| id as usize + 1);
    (0..slots as u32)
        .map(|id| match (old.get(&id), new.get(&id)) {
            (Some(prev), Some(core)) => cpu_usage(prev, core) * 100.0,
            _ => 0.0,
        })
        .collect()
}

/// Share of elapsed ticks spent waiting on I/O, as a percentage.
pub fn iowait_percent(old: &CpuTicks, new: &CpuTicks) -> f64 {
    let total_delta = signed_delta(old.total(), new.total());
    if total_delta <= 0 {
        return 0.0;
    }
    let wait = signed_delta(old.iowait, new.iowait).max(0);
    (wait as f64 / total_delta as f64 * 100.0).clamp(0.0, 100.0)
}

/// Elapsed ticks across all cores, 0 when the counters went backwards.
pub fn total_tick_delta(old: &CpuTicks, new: &CpuTicks) -> u64 {
    new.total().saturating_sub(old.total())
}

pub fn counter_delta(old: u64, new: u64) -> u64 {
    new.saturating_sub(old)
}

/// Per-second rate of a counter. Wraps and resets clamp to 0, as does a
/// zero-length interval.
pub fn rate_per_sec(old: u64, new: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs <= 0.0 {
        return 0.0;
    }
    counter_delta(old, new) as f64 / secs
}

/// (down, up) bytes per second.
pub fn net_rates(old: &NetCounters, new: &NetCounters, elapsed: Duration) -> (f64, f64) {
    (
        rate_per_sec(old.rx_bytes, new.rx_bytes, elapsed),
        rate_per_sec(old.tx_bytes, new.tx_bytes, elapsed),
    )
}

/// (read, write) bytes per second.
pub fn disk_rates(old: &DiskCounters, new: &DiskCounters, elapsed: Duration) -> (f64, f64) {
    (
        rate_per_sec(old.read_bytes, new.read_bytes, elapsed),
        rate_per_sec(old.write_bytes, new.write_bytes, elapsed),
    )
}

fn signed_delta(old: u64, new: u64) -> i128 {
    new as i128 - old as i128
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn ticks(user: u64, system: u64, idle: u64, iowait: u64) -> CpuTicks {
        CpuTicks { user, system, idle, iowait, ..Default::default() }
    }

    #[test]
    fn usage_matches_worked_example() {
        let old = ticks(100, 50, 850, 0);
        let new = ticks(110, 60, 930, 0);
        assert_eq!(total_tick_delta(&old, &new), 100);
        assert!((cpu_usage(&old, &new) - 0.20).abs() < EPS);
    }

    #[test]
    fn identical_or_reversed_samples_are_zero() {
        let a = ticks(100, 50, 850, 3);
        let b = ticks(90, 40, 800, 1);
        assert_eq!(cpu_usage(&a, &a), 0.0);
        assert_eq!(cpu_usage(&a, &b), 0.0);
        assert_eq!(iowait_percent(&a, &b), 0.0);
        assert_eq!(total_tick_delta(&a, &b), 0);
    }

    #[test]
    fn usage_stays_in_unit_range() {
        let old = ticks(0, 0, 0, 0);
        let samples = [
            ticks(100, 0, 0, 0),
            ticks(0, 0, 100, 0),
            ticks(7, 13, 41, 9),
            CpuTicks { nice: 5, irq: 3, softirq: 2, steal: 90, ..Default::default() },
        ];
        for new in samples {
            let u = cpu_usage(&old, &new);
            assert!((0.0..=1.0).contains(&u), "{u} out of range");
            assert!(!u.is_nan());
        }
    }

    #[test]
    fn idle_counter_going_backwards_is_clamped() {
        // total grew but idle shrank: would be > 1 unclamped
        let old = ticks(0, 0, 100, 0);
        let new = ticks(200, 0, 50, 0);
        assert_eq!(cpu_usage(&old, &new), 1.0);
    }

    #[test]
    fn iowait_uses_total_denominator() {
        let old = ticks(100, 50, 850, 0);
        let new = ticks(110, 60, 910, 20);
        assert!((iowait_percent(&old, &new) - 20.0).abs() < EPS);
    }

    fn cores(list: &[(u32, CpuTicks)]) -> BTreeMap<u32, CpuTicks> {
        list.iter().copied().collect()
    }

    #[test]
    fn per_core_values_are_independent() {
        let old = cores(&[(0, ticks(0, 0, 0, 0)), (1, ticks(0, 0, 0, 0))]);
        let new = cores(&[(0, ticks(50, 0, 50, 0)), (1, ticks(0, 0, 100, 0))]);
        let usage = per_core_usage(&old, &new);
        assert_eq!(usage.len(), 2);
        assert!((usage[0] - 50.0).abs() < EPS);
        assert_eq!(usage[1], 0.0);

        // changing core 1 must not move core 0
        let new2 = cores(&[(0, ticks(50, 0, 50, 0)), (1, ticks(100, 0, 0, 0))]);
        let usage2 = per_core_usage(&old, &new2);
        assert!((usage2[0] - usage[0]).abs() < EPS);
        assert!((usage2[1] - 100.0).abs() < EPS);
    }

    #[test]
    fn new_core_without_baseline_reports_zero() {
        let old = cores(&[(0, ticks(0, 0, 0, 0))]);
        let new = cores(&[(0, ticks(10, 0, 10, 0)), (1, ticks(99, 0, 1, 0))]);
        let usage = per_core_usage(&old, &new);
        assert_eq!(usage.len(), 2);
        assert_eq!(usage[1], 0.0);
    }

    #[test]
    fn missing_middle_core_does_not_shift_later_cores() {
        let old = cores(&[(0, ticks(0, 0, 200, 0)), (1, ticks(100, 0, 100, 0)), (2, ticks(0, 0, 100, 0))]);
        let new = cores(&[(0, ticks(0, 0, 300, 0)), (2, ticks(100, 0, 100, 0))]);
        let usage = per_core_usage(&old, &new);
        assert_eq!(usage.len(), 3);
        assert_eq!(usage[0], 0.0);
        assert_eq!(usage[1], 0.0);
        assert!((usage[2] - 50.0).abs() < EPS);
    }

    #[test]
    fn network_rate_and_reset() {
        let sec = Duration::from_secs(1);
        let old = NetCounters { rx_bytes: 1000, tx_bytes: 0 };
        let new = NetCounters { rx_bytes: 1500, tx_bytes: 0 };
        assert_eq!(net_rates(&old, &new, sec).0, 500.0);
        assert_eq!(net_rates(&new, &old, sec).0, 0.0);
    }

    #[test]
    fn rate_uses_actual_elapsed_time() {
        assert!((rate_per_sec(0, 1000, Duration::from_millis(1250)) - 800.0).abs() < EPS);
        assert_eq!(rate_per_sec(0, 1000, Duration::ZERO), 0.0);
    }

    #[test]
    fn disk_rate_never_negative() {
        let old = DiskCounters { read_bytes: u64::MAX - 10, write_bytes: 4096 };
        let new = DiskCounters { read_bytes: 5, write_bytes: 8192 };
        let (r, w) = disk_rates(&old, &new, Duration::from_secs(1));
        assert_eq!(r, 0.0);
        assert_eq!(w, 4096.0);
    }
}
