use crate::backend::{cpu, memory};
use crate::model::SystemInfo;
use std::fs;
use std::path::Path;

/// Static host description, read once at startup.
pub fn read_system_info(proc_root: &Path, sys_root: &Path, etc_root: &Path) -> SystemInfo {
    let os_release = fs::read_to_string(etc_root.join("os-release")).unwrap_or_default();
    let (os_name, os_version) = parse_os_release(&os_release);
    let cpuinfo = fs::read_to_string(proc_root.join("cpuinfo")).unwrap_or_default();
    let passwd = fs::read_to_string(etc_root.join("passwd")).unwrap_or_default();
    let uid = unsafe { libc::getuid() };
    let mem = memory::read_memory(proc_root);

    SystemInfo {
        os_name: if os_name.is_empty() { "Linux".to_string() } else { os_name },
        os_version,
        kernel_version: sysinfo::System::kernel_version().unwrap_or_default(),
        hostname: sysinfo::System::host_name().unwrap_or_default(),
        username: username_for(&passwd, uid)
            .or_else(|| std::env::var("USER").ok())
            .unwrap_or_else(|| "unknown".to_string()),
        architecture: std::env::consts::ARCH.to_string(),
        cpu_model: cpu::cpu_model_name(&cpuinfo),
        logical_cores: cpu::logical_core_count(&cpuinfo),
        physical_cores: cpu::physical_core_count(&cpuinfo),
        max_frequency_mhz: cpu::read_max_frequency_mhz(sys_root),
        total_ram_gb: mem.total_kb as f64 / (1024.0 * 1024.0),
    }
}

/// (PRETTY_NAME, VERSION_ID) with surrounding quotes removed.
pub fn parse_os_release(content: &str) -> (String, String) {
    let mut name = String::new();
    let mut version = String::new();
    for line in content.lines() {
        if let Some(v) = line.strip_prefix("PRETTY_NAME=") {
            name = unquote(v);
        } else if let Some(v) = line.strip_prefix("VERSION_ID=") {
            version = unquote(v);
        }
    }
    (name, version)
}

fn unquote(v: &str) -> String {
    v.trim().trim_matches(|c| c == '"' || c == '\'').to_string()
}

pub fn username_for(passwd: &str, uid: u32) -> Option<String> {
    passwd
        .lines()
        .find(|line| {
            line.split(':')
                .nth(2)
                .and_then(|s| s.parse::<u32>().ok())
                .map(|u| u == uid)
                .unwrap_or(false)
        })
        .and_then(|line| line.split(':').next())
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn os_release_values_are_unquoted() {
        let text = "NAME=\"Ubuntu\"\nVERSION_ID=\"24.04\"\nPRETTY_NAME=\"Ubuntu 24.04.1 LTS\"\nID=ubuntu\n";
        let (name, version) = parse_os_release(text);
        assert_eq!(name, "Ubuntu 24.04.1 LTS");
        assert_eq!(version, "24.04");
    }

    #[test]
    fn os_release_without_quotes() {
        let (name, version) = parse_os_release("PRETTY_NAME=Arch Linux\n");
        assert_eq!(name, "Arch Linux");
        assert_eq!(version, "");
    }

    #[test]
    fn passwd_lookup() {
        let passwd = "root:x:0:0:root:/root:/bin/bash\nalice:x:1000:1000::/home/alice:/bin/zsh\n";
        assert_eq!(username_for(passwd, 1000).as_deref(), Some("alice"));
        assert_eq!(username_for(passwd, 0).as_deref(), Some("root"));
        assert_eq!(username_for(passwd, 42), None);
    }

    #[test]
    fn fake_tree_system_info() {
        let dir = tempfile::tempdir().unwrap();
        let proc_root = dir.path().join("proc");
        let etc_root = dir.path().join("etc");
        fs::create_dir_all(&proc_root).unwrap();
        fs::create_dir_all(&etc_root).unwrap();
        fs::write(proc_root.join("meminfo"), "MemTotal: 8388608 kB\n").unwrap();
        fs::write(proc_root.join("cpuinfo"), "processor\t: 0\nmodel name\t: Test Chip\n").unwrap();
        fs::write(etc_root.join("os-release"), "PRETTY_NAME=\"Test OS\"\nVERSION_ID=1\n").unwrap();

        let info = read_system_info(&proc_root, &dir.path().join("sys"), &etc_root);
        assert_eq!(info.os_name, "Test OS");
        assert_eq!(info.os_version, "1");
        assert_eq!(info.cpu_model, "Test Chip");
        assert_eq!(info.logical_cores, 1);
        assert!((info.total_ram_gb - 8.0).abs() < 1e-9);
        assert_eq!(info.max_frequency_mhz, 0.0);
        assert!(!info.username.is_empty());
    }
}
