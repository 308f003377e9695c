use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GpuBackend {
    /// NVML if it loads, otherwise `nvidia-smi`.
    Auto,
    Nvml,
    Smi,
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub fast_interval_ms: u64,
    pub slow_every_ticks: u32,
    pub history_len: usize,
    pub max_processes: usize,
    pub frame_interval_ms: u64,
    pub gpu_backend: GpuBackend,
    pub gpu_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fast_interval_ms: 1000,
            slow_every_ticks: 5,
            history_len: 120,
            max_processes: 25,
            frame_interval_ms: 100,
            gpu_backend: GpuBackend::Auto,
            gpu_timeout_ms: 2000,
        }
    }
}

impl Config {
    pub fn load() -> Self {
        Self::load_from(&config_path())
    }

    pub fn load_from(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(data) => serde_json::from_str(&data).unwrap_or_else(|e| {
                log::warn!("Ignoring malformed config {}: {}", path.display(), e);
                Config::default()
            }),
            Err(_) => Config::default(),
        }
    }

    pub fn save(&self) {
        self.save_to(&config_path());
    }

    pub fn save_to(&self, path: &Path) {
        if let Some(parent) = path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        if let Ok(data) = serde_json::to_string_pretty(self) {
            let _ = fs::write(path, data);
        }
    }

    pub fn fast_interval(&self) -> Duration {
        Duration::from_millis(self.fast_interval_ms.max(1))
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }

    pub fn gpu_timeout(&self) -> Duration {
        Duration::from_millis(self.gpu_timeout_ms)
    }

    pub fn history_len(&self) -> usize {
        self.history_len.max(1)
    }
}

pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("~/.config"))
        .join("sysdash")
        .join("config.json")
}
