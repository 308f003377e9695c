use serde::{Deserialize, Serialize};

const NAME_WIDTH: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessState {
    Running,
    Sleeping,
    Other(char),
    Unknown,
}

impl ProcessState {
    pub fn from_stat_char(c: char) -> Self {
        match c {
            'R' => ProcessState::Running,
            'S' => ProcessState::Sleeping,
            other => ProcessState::Other(other),
        }
    }
}

impl Default for ProcessState {
    fn default() -> Self {
        ProcessState::Unknown
    }
}

impl std::fmt::Display for ProcessState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessState::Running => write!(f, "run"),
            ProcessState::Sleeping => write!(f, "sleep"),
            ProcessState::Other(c) => write!(f, "{}", c),
            ProcessState::Unknown => write!(f, "?"),
        }
    }
}

/// Static fields read fresh for one PID.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessDetail {
    pub name: String,
    pub state: ProcessState,
    pub memory_bytes: u64,
    pub threads: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessInfo {
    pub pid: u32,
    pub name: String,
    pub cpu_percent: f64,
    pub memory_mb: f64,
    pub threads: u32,
    pub state: ProcessState,
}

impl ProcessInfo {
    pub fn new(pid: u32, cpu_percent: f64, detail: ProcessDetail) -> Self {
        Self {
            pid,
            name: truncate_name(&detail.name, NAME_WIDTH),
            cpu_percent,
            memory_mb: detail.memory_bytes as f64 / (1024.0 * 1024.0),
            threads: detail.threads,
            state: detail.state,
        }
    }
}

/// Cut to `width` chars, ending in "..." when shortened.
pub fn truncate_name(name: &str, width: usize) -> String {
    if name.chars().count() <= width {
        return name.to_string();
    }
    let keep = width.saturating_sub(3);
    let mut out: String = name.chars().take(keep).collect();
    out.push_str("...");
    out
}
