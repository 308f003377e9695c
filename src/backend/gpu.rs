use crate::config::GpuBackend;
use crate::error::{ProbeError, Result};
use crate::model::{truncate_name, GpuInfo};
use nvml_wrapper::enum_wrappers::device::TemperatureSensor;
use nvml_wrapper::Nvml;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::Duration;

const GPU_NAME_WIDTH: usize = 28;
const MIB: u64 = 1024 * 1024;
const SMI_FIELDS: usize = 7;

const SMI_PROGRAM: &str = "nvidia-smi";
const SMI_ARGS: &[&str] = &[
    "--query-gpu=name,temperature.gpu,utilization.gpu,memory.used,memory.total,fan.speed,power.draw",
    "--format=csv,noheader,nounits",
];

/// Parse one CSV row of `nvidia-smi --query-gpu` output. Every field must
/// be present and numeric where expected; `[N/A]` makes the row unusable.
pub fn parse_smi_output(output: &str) -> Result<GpuInfo> {
    let line = output
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .ok_or(ProbeError::NoOutput)?;
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    if fields.len() < SMI_FIELDS {
        return Err(ProbeError::malformed(format!(
            "expected {SMI_FIELDS} fields, got {}",
            fields.len()
        )));
    }
    if fields[0].is_empty() {
        return Err(ProbeError::malformed("empty GPU name"));
    }

    fn field<T: std::str::FromStr>(fields: &[&str], idx: usize, what: &str) -> Result<T> {
        fields[idx]
            .parse()
            .map_err(|_| ProbeError::malformed(format!("{what}: {:?}", fields[idx])))
    }

    Ok(GpuInfo {
        available: true,
        name: truncate_name(fields[0], GPU_NAME_WIDTH),
        temperature_celsius: field(&fields, 1, "temperature")?,
        utilization_percent: field(&fields, 2, "utilization")?,
        memory_used_mb: field(&fields, 3, "memory.used")?,
        memory_total_mb: field(&fields, 4, "memory.total")?,
        fan_speed_percent: field(&fields, 5, "fan.speed")?,
        power_watts: field(&fields, 6, "power.draw")?,
    })
}

/// An external helper run with a hard deadline.
#[derive(Debug, Clone)]
pub struct SmiCommand {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl SmiCommand {
    pub fn nvidia_smi(timeout: Duration) -> Self {
        Self::new(SMI_PROGRAM, SMI_ARGS, timeout)
    }

    pub fn new(program: &str, args: &[&str], timeout: Duration) -> Self {
        Self {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            timeout,
        }
    }

    /// Run the helper and return its stdout. The child is killed if it has
    /// not closed stdout within the timeout.
    pub fn run(&self) -> Result<String> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| ProbeError::Spawn { program: self.program.clone(), source })?;

        let mut stdout = child.stdout.take().ok_or(ProbeError::NoOutput)?;
        let (tx, rx) = flume::bounded(1);
        thread::spawn(move || {
            let mut out = String::new();
            let res = stdout.read_to_string(&mut out).map(|_| out);
            let _ = tx.send(res);
        });

        match rx.recv_timeout(self.timeout) {
            Ok(res) => {
                let _ = child.wait();
                Ok(res?)
            }
            Err(_) => {
                log::debug!("{} timed out after {:?}, killing it", self.program, self.timeout);
                let _ = child.kill();
                let _ = child.wait();
                Err(ProbeError::Timeout(self.timeout))
            }
        }
    }

    pub fn query(&self) -> Result<GpuInfo> {
        parse_smi_output(&self.run()?)
    }
}

pub enum GpuProbe {
    Native(Nvml),
    Subprocess(SmiCommand),
    Unavailable,
}

impl GpuProbe {
    pub fn detect(backend: GpuBackend, timeout: Duration) -> Self {
        match backend {
            GpuBackend::None => GpuProbe::Unavailable,
            GpuBackend::Smi => GpuProbe::Subprocess(SmiCommand::nvidia_smi(timeout)),
            GpuBackend::Nvml => match Nvml::init() {
                Ok(nvml) => GpuProbe::Native(nvml),
                Err(e) => {
                    log::warn!("NVML not available: {}", e);
                    GpuProbe::Unavailable
                }
            },
            GpuBackend::Auto => match Nvml::init() {
                Ok(nvml) => GpuProbe::Native(nvml),
                Err(e) => {
                    log::debug!("NVML not available ({}), falling back to {}", e, SMI_PROGRAM);
                    GpuProbe::Subprocess(SmiCommand::nvidia_smi(timeout))
                }
            },
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            GpuProbe::Native(_) => "nvml",
            GpuProbe::Subprocess(_) => "nvidia-smi",
            GpuProbe::Unavailable => "none",
        }
    }

    pub fn query(&self) -> Result<GpuInfo> {
        match self {
            GpuProbe::Native(nvml) => query_nvml(nvml),
            GpuProbe::Subprocess(cmd) => cmd.query(),
            GpuProbe::Unavailable => Ok(GpuInfo::default()),
        }
    }
}

fn query_nvml(nvml: &Nvml) -> Result<GpuInfo> {
    let device = nvml
        .device_by_index(0)
        .map_err(|e| ProbeError::native(e.to_string()))?;

    let name = device.name().unwrap_or_else(|_| "Unknown GPU".to_string());
    let utilization = device.utilization_rates().ok();
    let memory_info = device.memory_info().ok();

    Ok(GpuInfo {
        available: true,
        name: truncate_name(&name, GPU_NAME_WIDTH),
        temperature_celsius: device.temperature(TemperatureSensor::Gpu).unwrap_or(0),
        utilization_percent: utilization.map(|u| u.gpu).unwrap_or(0),
        memory_used_mb: memory_info.as_ref().map(|m| m.used / MIB).unwrap_or(0),
        memory_total_mb: memory_info.as_ref().map(|m| m.total / MIB).unwrap_or(0),
        fan_speed_percent: device.fan_speed(0).unwrap_or(0),
        power_watts: device.power_usage().unwrap_or(0) as f64 / 1000.0, // mW
    })
}

/// AMD and Intel cards seen through `/sys/class/drm`.
pub fn read_drm(sys_root: &Path) -> GpuInfo {
    let drm = sys_root.join("class/drm");
    let amd_temps = [
        drm.join("card0/device/hwmon/hwmon0/temp1_input"),
        drm.join("card0/device/hwmon/hwmon1/temp1_input"),
        drm.join("card1/device/hwmon/hwmon0/temp1_input"),
    ];
    for path in &amd_temps {
        if let Some(milli) = read_trimmed(path).and_then(|s| s.parse::<i64>().ok()) {
            let busy = read_trimmed(&drm.join("card0/device/gpu_busy_percent"))
                .and_then(|s| s.parse::<u32>().ok())
                .unwrap_or(0);
            return GpuInfo {
                available: true,
                name: "AMD GPU".to_string(),
                temperature_celsius: (milli / 1000).max(0) as u32,
                utilization_percent: busy.min(100),
                ..Default::default()
            };
        }
    }

    match read_trimmed(&drm.join("card0/device/vendor")).as_deref() {
        Some("0x8086") => GpuInfo {
            available: true,
            name: "Intel iGPU".to_string(),
            ..Default::default()
        },
        _ => GpuInfo::default(),
    }
}

fn read_trimmed(path: &Path) -> Option<String> {
    fs::read_to_string(path).ok().map(|s| s.trim().to_string())
}

/// Slow-tier GPU sampling: the configured probe first, DRM sysfs second.
pub struct GpuCollector {
    probe: GpuProbe,
    drm_root: Option<PathBuf>,
}

impl GpuCollector {
    pub fn new(backend: GpuBackend, timeout: Duration) -> Self {
        let probe = GpuProbe::detect(backend, timeout);
        log::info!("GPU backend: {}", probe.kind());
        let drm_root = cfg!(target_os = "linux").then(|| PathBuf::from("/sys"));
        Self { probe, drm_root }
    }

    pub fn with_probe(probe: GpuProbe, drm_root: Option<PathBuf>) -> Self {
        Self { probe, drm_root }
    }

    pub fn collect(&self) -> GpuInfo {
        match self.probe.query() {
            Ok(info) if info.available => return info,
            Ok(_) => {}
            Err(e) => log::debug!("GPU probe ({}) failed: {}", self.probe.kind(), e),
        }
        match &self.drm_root {
            Some(root) => read_drm(root),
            None => GpuInfo::default(),
        }
    }
}
