use crate::model::{ProcTick, ProcessDetail, ProcessInfo, ProcessState};
use std::collections::HashMap;

/// Join two tick lists by PID and return the `max` busiest processes.
///
/// `total_delta` is the elapsed CPU ticks of the whole machine over the same
/// interval, so 100% means every core was busy with this one process.
/// Details are looked up lazily in rank order; a PID whose detail read fails
/// (it exited in between) is skipped.
pub fn top_processes<F>(
    previous: &[ProcTick],
    current: &[ProcTick],
    total_delta: u64,
    max: usize,
    mut detail: F,
) -> Vec<ProcessInfo>
where
    F: FnMut(u32) -> Option<ProcessDetail>,
{
    let prev: HashMap<u32, u64> = previous.iter().map(|t| (t.pid, t.total())).collect();

    let mut ranked: Vec<(u32, f64)> = current
        .iter()
        .map(|t| {
            let cpu = match prev.get(&t.pid) {
                Some(&old) if total_delta > 0 => {
                    t.total().saturating_sub(old) as f64 / total_delta as f64 * 100.0
                }
                _ => 0.0,
            };
            (t.pid, cpu)
        })
        .collect();

    // stable: equal shares keep enumeration order
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    let mut result = Vec::with_capacity(max.min(ranked.len()));
    for (pid, cpu) in ranked {
        if result.len() >= max {
            break;
        }
        match detail(pid) {
            Some(d) => result.push(ProcessInfo::new(pid, cpu, d)),
            None => log::debug!("pid {} vanished before its details were read", pid),
        }
    }
    result
}

/// Parse `/proc/[pid]/stat`. The command name sits between the first `(`
/// and the last `)` and may itself contain spaces or parentheses.
pub fn parse_pid_stat(pid: u32, stat: &str, page_size: u64) -> Option<(ProcTick, ProcessDetail)> {
    let comm_start = stat.find('(')?;
    let comm_end = stat.rfind(')')?;
    if comm_end < comm_start {
        return None;
    }
    let name = stat[comm_start + 1..comm_end].to_string();

    let rest = stat.get(comm_end + 1..)?;
    let fields: Vec<&str> = rest.split_whitespace().collect();
    if fields.len() < 22 {
        return None;
    }

    let state = fields[0].chars().next().map(ProcessState::from_stat_char)?;
    let utime: u64 = fields[11].parse().ok()?;
    let stime: u64 = fields[12].parse().ok()?;
    let threads: u32 = fields[17].parse().unwrap_or(0);
    let rss_pages: i64 = fields[21].parse().unwrap_or(0);

    Some((
        ProcTick { pid, utime, stime },
        ProcessDetail {
            name,
            state,
            memory_bytes: rss_pages.max(0) as u64 * page_size,
            threads,
        },
    ))
}

/// `Threads:` line of `/proc/[pid]/status`.
pub fn parse_status_threads(status: &str) -> Option<u64> {
    status
        .lines()
        .find_map(|l| l.strip_prefix("Threads:"))
        .and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tick(pid: u32, utime: u64, stime: u64) -> ProcTick {
        ProcTick { pid, utime, stime }
    }

    fn named(pid: u32) -> Option<ProcessDetail> {
        Some(ProcessDetail { name: format!("p{}", pid), ..Default::default() })
    }

    #[test]
    fn worked_example() {
        let previous = [tick(1, 10, 5)];
        let current = [tick(1, 12, 6), tick(2, 1, 1)];
        let top = top_processes(&previous, &current, 10, 20, named);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].pid, 1);
        assert!((top[0].cpu_percent - 30.0).abs() < 1e-9);
        assert_eq!(top[1].pid, 2);
        assert_eq!(top[1].cpu_percent, 0.0);
    }

    #[test]
    fn unchanged_ticks_are_zero() {
        let t = [tick(4, 100, 100)];
        let top = top_processes(&t, &t, 50, 5, named);
        assert_eq!(top[0].cpu_percent, 0.0);
    }

    #[test]
    fn whole_interval_is_one_hundred_percent() {
        let top = top_processes(&[tick(9, 0, 0)], &[tick(9, 60, 40)], 100, 5, named);
        assert!((top[0].cpu_percent - 100.0).abs() < 1e-9);
    }

    #[test]
    fn zero_total_delta_is_zero() {
        let top = top_processes(&[tick(9, 0, 0)], &[tick(9, 60, 40)], 0, 5, named);
        assert_eq!(top[0].cpu_percent, 0.0);
    }

    #[test]
    fn ties_keep_enumeration_order_and_truncate() {
        let previous = [tick(1, 0, 0), tick(2, 0, 0), tick(3, 0, 0), tick(4, 0, 0)];
        let current = [tick(1, 1, 0), tick(2, 5, 0), tick(3, 1, 0), tick(4, 1, 0)];
        let top = top_processes(&previous, &current, 10, 3, named);
        let pids: Vec<u32> = top.iter().map(|p| p.pid).collect();
        assert_eq!(pids, vec![2, 1, 3]);
    }

    #[test]
    fn vanished_pids_are_skipped_not_fatal() {
        let current = [tick(1, 5, 0), tick(2, 4, 0), tick(3, 3, 0)];
        let previous = [tick(1, 0, 0), tick(2, 0, 0), tick(3, 0, 0)];
        let top = top_processes(&previous, &current, 10, 2, |pid| if pid == 1 { None } else { named(pid) });
        let pids: Vec<u32> = top.iter().map(|p| p.pid).collect();
        assert_eq!(pids, vec![2, 3]);
    }

    #[test]
    fn counter_reset_for_reused_pid_is_clamped() {
        let top = top_processes(&[tick(5, 1000, 1000)], &[tick(5, 3, 2)], 100, 5, named);
        assert_eq!(top[0].cpu_percent, 0.0);
    }

    #[test]
    fn parses_stat_with_awkward_name() {
        let stat = "1234 (tmux: server (x)) S 1 1234 1234 0 -1 4194560 1000 0 0 0 \
                    250 75 0 0 20 0 3 0 123456 23456789 1500 18446744073709551615";
        let (t, d) = parse_pid_stat(1234, stat, 4096).unwrap();
        assert_eq!(d.name, "tmux: server (x)");
        assert_eq!(d.state, ProcessState::Sleeping);
        assert_eq!(t.utime, 250);
        assert_eq!(t.stime, 75);
        assert_eq!(d.threads, 3);
        assert_eq!(d.memory_bytes, 1500 * 4096);
    }

    #[test]
    fn short_stat_line_is_rejected() {
        assert!(parse_pid_stat(1, "1 (init) S 0 1 1", 4096).is_none());
        assert!(parse_pid_stat(1, "garbage without parens", 4096).is_none());
    }

    #[test]
    fn non_numeric_ticks_are_rejected() {
        let stat = "7 (x) R 1 7 7 0 -1 0 0 0 0 0 abc 1 0 0 20 0 1 0 1 1 1 0";
        assert!(parse_pid_stat(7, stat, 4096).is_none());
    }

    #[test]
    fn thread_count_from_status() {
        let status = "Name:\tbash\nState:\tS (sleeping)\nThreads:\t7\nVmRSS:\t100 kB\n";
        assert_eq!(parse_status_threads(status), Some(7));
        assert_eq!(parse_status_threads("Name:\tx\n"), None);
    }
}
