pub mod collector;
pub mod delta;
pub mod gpu;
pub mod history;
pub mod process;
pub mod scheduler;
pub mod source;

#[cfg(target_os = "linux")]
mod battery;
#[cfg(target_os = "linux")]
mod cpu;
#[cfg(target_os = "linux")]
mod disk;
#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "linux")]
mod memory;
#[cfg(target_os = "linux")]
mod network;
#[cfg(target_os = "linux")]
mod system;
#[cfg(windows)]
mod windows;

pub use collector::Collector;
pub use gpu::GpuCollector;
pub use history::History;
pub use scheduler::Tick;

#[cfg(target_os = "linux")]
pub use linux::LinuxSource as PlatformSource;
#[cfg(windows)]
pub use windows::WindowsSource as PlatformSource;
