use crate::backend::delta;
use crate::backend::gpu::GpuCollector;
use crate::backend::history::{History, HistorySample};
use crate::backend::process;
use crate::backend::scheduler::{SlowProbeCounter, Tick, TickClock};
use crate::backend::source::Source;
use crate::config::Config;
use crate::model::{DiskCounters, NetCounters, ProcTick, StatSnapshot, SystemSnapshot};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// Owns the previous counter readings and produces a fresh `SystemSnapshot`
/// every fast tick. Expensive probes run on every Nth tick.
pub struct Collector<S: Source> {
    source: S,
    gpu: GpuCollector,
    clock: TickClock,
    slow: SlowProbeCounter,
    max_processes: usize,
    frame_interval: Duration,

    prev_stat: StatSnapshot,
    prev_net: NetCounters,
    prev_disk: DiskCounters,
    prev_procs: Vec<ProcTick>,

    history: History,
    snapshot: SystemSnapshot,
}

impl<S: Source> Collector<S> {
    pub fn new(source: S, gpu: GpuCollector, config: &Config) -> Self {
        Self::new_at(source, gpu, config, Instant::now())
    }

    /// Take the baseline readings at `now`. The first fast tick is due one
    /// interval later, so every rate has two samples behind it.
    pub fn new_at(source: S, gpu: GpuCollector, config: &Config, now: Instant) -> Self {
        let prev_stat = source.stat();
        let prev_net = source.net_counters();
        let prev_disk = source.disk_counters();
        let prev_procs = source.process_ticks();

        let mut snapshot = SystemSnapshot {
            system: source.system_info(),
            memory: source.memory(),
            ..Default::default()
        };
        snapshot.network.total_rx = prev_net.rx_bytes;
        snapshot.network.total_tx = prev_net.tx_bytes;
        snapshot.disk_io.total_read = prev_disk.read_bytes;
        snapshot.disk_io.total_write = prev_disk.write_bytes;

        log::info!(
            "Sampling every {:?}, slow probes every {} ticks, {} cores",
            config.fast_interval(),
            SlowProbeCounter::new(config.slow_every_ticks).threshold(),
            prev_stat.cores.len()
        );

        let mut collector = Self {
            source,
            gpu,
            clock: TickClock::new(config.fast_interval(), now),
            slow: SlowProbeCounter::new(config.slow_every_ticks),
            max_processes: config.max_processes,
            frame_interval: config.frame_interval(),
            prev_stat,
            prev_net,
            prev_disk,
            prev_procs,
            history: History::new(config.history_len()),
            snapshot,
        };
        // slow values would otherwise stay empty until the Nth tick
        collector.slow_tick();
        collector
    }

    pub fn snapshot(&self) -> &SystemSnapshot {
        &self.snapshot
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Run a fast tick if one is due at `now`, and the slow batch with it
    /// when the counter rolls over.
    pub fn poll(&mut self, now: Instant) -> Tick {
        let Some(elapsed) = self.clock.due(now) else {
            return Tick::Idle;
        };
        self.fast_tick(elapsed);
        if self.slow.advance() {
            self.slow_tick();
            Tick::FastAndSlow
        } else {
            Tick::Fast
        }
    }

    /// Frame loop: poll, hand the latest snapshot to `render`, sleep one
    /// frame. Returns once `stop` is set.
    pub fn run<F>(&mut self, stop: &AtomicBool, mut render: F)
    where
        F: FnMut(&SystemSnapshot, &History, Tick),
    {
        while !stop.load(Ordering::Relaxed) {
            let tick = self.poll(Instant::now());
            render(&self.snapshot, &self.history, tick);
            thread::sleep(self.frame_interval);
        }
        log::info!("Collector stopped after {} samples", self.snapshot.fast_ticks);
    }

    fn fast_tick(&mut self, elapsed: Duration) {
        let stat = self.source.stat();
        let old = &self.prev_stat;

        let cpu = &mut self.snapshot.cpu;
        cpu.usage = delta::cpu_usage(&old.total, &stat.total);
        cpu.per_core_percent = delta::per_core_usage(&old.cores, &stat.cores);
        cpu.iowait_percent = delta::iowait_percent(&old.total, &stat.total);
        cpu.context_switches_per_sec = delta::rate_per_sec(
            old.kernel.context_switches,
            stat.kernel.context_switches,
            elapsed,
        );
        cpu.interrupts_per_sec =
            delta::rate_per_sec(old.kernel.interrupts, stat.kernel.interrupts, elapsed);
        cpu.peak_percent = cpu.peak_percent.max(cpu.usage * 100.0);

        let sensors = self.source.sensors();
        cpu.temperature_celsius = sensors.temperature_celsius;
        cpu.frequency_mhz = sensors.frequency_mhz;
        cpu.load_average = sensors.load_average;
        cpu.uptime_secs = sensors.uptime_secs;

        self.snapshot.memory = self.source.memory();
        let ram_percent = self.snapshot.memory.used_fraction() * 100.0;
        self.snapshot.ram_peak_percent = self.snapshot.ram_peak_percent.max(ram_percent);

        let net = self.source.net_counters();
        let (down, up) = delta::net_rates(&self.prev_net, &net, elapsed);
        let network = &mut self.snapshot.network;
        network.down_bytes_per_sec = down;
        network.up_bytes_per_sec = up;
        network.session_rx += delta::counter_delta(self.prev_net.rx_bytes, net.rx_bytes);
        network.session_tx += delta::counter_delta(self.prev_net.tx_bytes, net.tx_bytes);
        network.total_rx = net.rx_bytes;
        network.total_tx = net.tx_bytes;

        let disk = self.source.disk_counters();
        let (read, write) = delta::disk_rates(&self.prev_disk, &disk, elapsed);
        let disk_io = &mut self.snapshot.disk_io;
        disk_io.read_bytes_per_sec = read;
        disk_io.write_bytes_per_sec = write;
        disk_io.total_read = disk.read_bytes;
        disk_io.total_write = disk.write_bytes;

        let total_delta = delta::total_tick_delta(&old.total, &stat.total);
        let procs = self.source.process_ticks();
        let source = &self.source;
        self.snapshot.processes = process::top_processes(
            &self.prev_procs,
            &procs,
            total_delta,
            self.max_processes,
            |pid| source.process_detail(pid),
        );

        self.history.push(HistorySample {
            cpu_percent: self.snapshot.cpu.usage * 100.0,
            ram_percent,
            gpu_percent: self.snapshot.gpu.utilization_percent as f64,
            net_down_bytes: down,
            net_up_bytes: up,
            iowait_percent: self.snapshot.cpu.iowait_percent,
        });
        self.snapshot.fast_ticks += 1;

        self.prev_stat = stat;
        self.prev_net = net;
        self.prev_disk = disk;
        self.prev_procs = procs;
    }

    fn slow_tick(&mut self) {
        self.snapshot.partitions = self.source.partitions();
        self.snapshot.gpu = self.gpu.collect();
        self.snapshot.battery = self.source.battery();
        self.snapshot.counts = self.source.counts();
        log::debug!(
            "Slow probes: {} partitions, gpu={}, battery={}",
            self.snapshot.partitions.len(),
            self.snapshot.gpu.available,
            self.snapshot.battery.available
        );
    }
}
