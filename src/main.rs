mod backend;
mod config;
mod console;
mod error;
mod model;
mod util;

use backend::{Collector, GpuCollector, PlatformSource};
use config::Config;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

fn main() {
    env_logger::init();

    let path = config::config_path();
    let config = Config::load();
    if !path.exists() {
        config.save();
    }
    log::info!("Config: {}", path.display());

    let stop = Arc::new(AtomicBool::new(false));
    let handler_stop = Arc::clone(&stop);
    if let Err(e) = ctrlc::set_handler(move || handler_stop.store(true, Ordering::Relaxed)) {
        log::warn!("Failed to install Ctrl-C handler: {}", e);
    }

    let gpu = GpuCollector::new(config.gpu_backend, config.gpu_timeout());
    let mut collector = Collector::new(PlatformSource::new(), gpu, &config);
    collector.run(&stop, console::render);
}
