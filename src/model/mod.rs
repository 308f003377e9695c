mod counters;
mod process_info;
mod system_snapshot;

pub use counters::*;
pub use process_info::{truncate_name, ProcessDetail, ProcessInfo, ProcessState};
pub use system_snapshot::*;
