use serde::Serialize;
use std::collections::VecDeque;

pub const DEFAULT_HISTORY_LEN: usize = 120; // 2 minutes at 1 sample/sec

/// Fixed-length sample window for sparklines. Starts full of zeros and
/// never grows or shrinks.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryBuffer {
    samples: VecDeque<f64>,
}

impl HistoryBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: std::iter::repeat(0.0).take(capacity).collect(),
        }
    }

    pub fn push(&mut self, value: f64) {
        self.samples.pop_front();
        self.samples.push_back(value);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().copied()
    }

    pub fn latest(&self) -> f64 {
        self.samples.back().copied().unwrap_or(0.0)
    }

    /// Largest sample, for scaling a sparkline's y axis.
    pub fn max(&self) -> f64 {
        self.samples.iter().copied().fold(0.0, f64::max)
    }

    pub fn to_vec(&self) -> Vec<f64> {
        self.samples.iter().copied().collect()
    }
}

impl Default for HistoryBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LEN)
    }
}

/// One buffer per plotted metric, all advanced together once per fast tick.
#[derive(Debug, Clone, Serialize)]
pub struct History {
    pub cpu_percent: HistoryBuffer,
    pub ram_percent: HistoryBuffer,
    pub gpu_percent: HistoryBuffer,
    pub net_down_kbps: HistoryBuffer,
    pub net_up_kbps: HistoryBuffer,
    pub iowait_percent: HistoryBuffer,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct HistorySample {
    pub cpu_percent: f64,
    pub ram_percent: f64,
    pub gpu_percent: f64,
    pub net_down_bytes: f64,
    pub net_up_bytes: f64,
    pub iowait_percent: f64,
}

impl History {
    pub fn new(len: usize) -> Self {
        Self {
            cpu_percent: HistoryBuffer::new(len),
            ram_percent: HistoryBuffer::new(len),
            gpu_percent: HistoryBuffer::new(len),
            net_down_kbps: HistoryBuffer::new(len),
            net_up_kbps: HistoryBuffer::new(len),
            iowait_percent: HistoryBuffer::new(len),
        }
    }

    pub fn push(&mut self, sample: HistorySample) {
        self.cpu_percent.push(sample.cpu_percent);
        self.ram_percent.push(sample.ram_percent);
        self.gpu_percent.push(sample.gpu_percent);
        self.net_down_kbps.push(sample.net_down_bytes / 1024.0);
        self.net_up_kbps.push(sample.net_up_bytes / 1024.0);
        self.iowait_percent.push(sample.iowait_percent);
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LEN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_full_of_zeros() {
        let buf = HistoryBuffer::new(120);
        assert_eq!(buf.len(), 120);
        assert!(buf.iter().all(|v| v == 0.0));
    }

    #[test]
    fn evicts_oldest_after_overflow() {
        let n = 4;
        let mut buf = HistoryBuffer::new(n);
        for i in 1..=(n + 1) {
            buf.push(i as f64);
        }
        assert_eq!(buf.len(), n);
        assert_eq!(buf.to_vec(), vec![2.0, 3.0, 4.0, 5.0]);
        assert_eq!(buf.latest(), 5.0);
        assert_eq!(buf.max(), 5.0);
    }

    #[test]
    fn partially_filled_keeps_leading_zeros() {
        let mut buf = HistoryBuffer::new(3);
        buf.push(7.0);
        assert_eq!(buf.to_vec(), vec![0.0, 0.0, 7.0]);
    }

    #[test]
    fn network_history_is_in_kilobytes() {
        let mut h = History::new(2);
        h.push(HistorySample { net_down_bytes: 2048.0, net_up_bytes: 512.0, ..Default::default() });
        assert_eq!(h.net_down_kbps.latest(), 2.0);
        assert_eq!(h.net_up_kbps.latest(), 0.5);
        assert_eq!(h.cpu_percent.len(), 2);
    }
}
