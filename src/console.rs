use crate::backend::{History, Tick};
use crate::model::SystemSnapshot;
use crate::util;
use std::io::{self, Write};

/// Header printed once before the first sample.
pub fn banner(snapshot: &SystemSnapshot) -> String {
    let sys = &snapshot.system;
    format!(
        "{}@{} | {} {} | kernel {} | {} ({} cores / {} threads) | {:.1} GB RAM",
        sys.username,
        sys.hostname,
        sys.os_name,
        sys.os_version,
        sys.kernel_version,
        sys.cpu_model,
        sys.physical_cores,
        sys.logical_cores,
        sys.total_ram_gb
    )
}

/// One line summarising the latest sample.
pub fn status_line(snapshot: &SystemSnapshot) -> String {
    let cpu = &snapshot.cpu;
    let mut line = format!(
        "CPU {} (peak {}, io {}) | RAM {} (peak {}) | NET down {} up {} | DISK r {} w {}",
        util::format_percent(cpu.usage * 100.0),
        util::format_percent(cpu.peak_percent),
        util::format_percent(cpu.iowait_percent),
        util::format_percent(snapshot.memory.used_fraction() * 100.0),
        util::format_percent(snapshot.ram_peak_percent),
        util::format_bytes_rate(snapshot.network.down_bytes_per_sec),
        util::format_bytes_rate(snapshot.network.up_bytes_per_sec),
        util::format_bytes_rate(snapshot.disk_io.read_bytes_per_sec),
        util::format_bytes_rate(snapshot.disk_io.write_bytes_per_sec),
    );

    if snapshot.gpu.available {
        line.push_str(&format!(
            " | GPU {} {}% {}C",
            snapshot.gpu.name, snapshot.gpu.utilization_percent, snapshot.gpu.temperature_celsius
        ));
    }
    if snapshot.battery.available {
        line.push_str(&format!(" | BAT {}%", snapshot.battery.percent));
    }
    if let Some(top) = snapshot.processes.first() {
        line.push_str(&format!(" | top {} ({}) {:.1}%", top.name, top.pid, top.cpu_percent));
    }
    line
}

/// Highest values still inside the history window.
pub fn window_line(history: &History) -> String {
    format!(
        "  last {} samples: cpu max {} | io max {}",
        history.cpu_percent.len(),
        util::format_percent(history.cpu_percent.max()),
        util::format_percent(history.iowait_percent.max())
    )
}

/// Frame callback for `Collector::run`: prints only when a sample was taken.
pub fn render(snapshot: &SystemSnapshot, history: &History, tick: Tick) {
    if !tick.sampled() {
        return;
    }
    let mut out = io::stdout().lock();
    if snapshot.fast_ticks == 1 {
        let _ = writeln!(out, "{}", banner(snapshot));
    }
    let _ = writeln!(out, "{}", status_line(snapshot));
    if tick == Tick::FastAndSlow {
        let net = &snapshot.network;
        let _ = writeln!(
            out,
            "  session rx {} tx {} | {} procs, {} threads, {} tcp | up {}",
            util::format_bytes(net.session_rx),
            util::format_bytes(net.session_tx),
            snapshot.counts.processes,
            snapshot.counts.threads,
            snapshot.counts.connections,
            util::format_duration(snapshot.cpu.uptime_secs)
        );
        let _ = writeln!(out, "{}", window_line(history));
    }
}
