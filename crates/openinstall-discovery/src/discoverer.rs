//! Host discovery
//!
//! Fingerprints the operating system, platform, and kernel, and enumerates
//! running processes. Host facts that cannot be obtained are fatal to the
//! run; individual unreadable processes are skipped.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, warn};

use openinstall_core::types::{DiscoveryManifest, ProcessSnapshot};
use openinstall_core::{Error, Result};

/// Platforms the catalog understands; anything else is blanked so install
/// target matching falls back to the platform family.
const KNOWN_PLATFORMS: &[&str] = &[
    "amazon", "centos", "debian", "redhat", "rhel", "suse", "ubuntu", "windows",
];

/// Platform families the catalog understands.
const KNOWN_PLATFORM_FAMILIES: &[&str] = &["debian", "rhel", "suse"];

/// Everything discovery produces: the manifest plus the raw process list
/// that recipe matching later narrows down.
#[derive(Debug, Clone, Default)]
pub struct Discovery {
    pub manifest: DiscoveryManifest,
    pub processes: Vec<ProcessSnapshot>,
}

/// Inspects the running host once per installation run
#[async_trait]
pub trait Discoverer: Send + Sync {
    async fn discover(&self) -> Result<Discovery>;
}

/// Discoverer backed by `/etc/os-release`, `/proc`, and the build-time
/// target constants.
pub struct HostDiscoverer {
    /// Filesystem root, overridable for tests
    root: PathBuf,
    include_processes: bool,
}

impl Default for HostDiscoverer {
    fn default() -> Self {
        Self::new()
    }
}

impl HostDiscoverer {
    pub fn new() -> Self {
        Self {
            root: PathBuf::from("/"),
            include_processes: true,
        }
    }

    /// Skip process enumeration (host facts are still gathered)
    pub fn without_processes(mut self) -> Self {
        self.include_processes = false;
        self
    }

    #[cfg(test)]
    fn with_root(root: PathBuf) -> Self {
        Self {
            root,
            include_processes: true,
        }
    }

    fn read_hostname(&self) -> Result<String> {
        for candidate in ["proc/sys/kernel/hostname", "etc/hostname"] {
            if let Ok(contents) = std::fs::read_to_string(self.root.join(candidate)) {
                let hostname = contents.trim().to_string();
                if !hostname.is_empty() {
                    return Ok(hostname);
                }
            }
        }
        if let Ok(hostname) = std::env::var("HOSTNAME") {
            if !hostname.is_empty() {
                return Ok(hostname);
            }
        }
        Err(Error::discovery("could not determine hostname"))
    }

    fn read_kernel_version(&self) -> String {
        std::fs::read_to_string(self.root.join("proc/sys/kernel/osrelease"))
            .map(|s| s.trim().to_string())
            .unwrap_or_default()
    }

    fn read_os_release(&self) -> HashMap<String, String> {
        let path = self.root.join("etc/os-release");
        match std::fs::read_to_string(&path) {
            Ok(contents) => parse_os_release(&contents),
            Err(e) => {
                debug!("could not read {}: {}", path.display(), e);
                HashMap::new()
            }
        }
    }

    fn enumerate_processes(&self) -> Vec<ProcessSnapshot> {
        let proc_dir = self.root.join("proc");
        let entries = match std::fs::read_dir(&proc_dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("cannot enumerate processes under {}: {}", proc_dir.display(), e);
                return Vec::new();
            }
        };

        let mut processes = Vec::new();
        for entry in entries.flatten() {
            let pid = match entry.file_name().to_string_lossy().parse::<i32>() {
                Ok(pid) => pid,
                Err(_) => continue,
            };
            match read_cmdline(&entry.path()) {
                Some(command) if !command.is_empty() => {
                    processes.push(ProcessSnapshot { pid, command });
                }
                // Unreadable or kernel-thread command lines are skipped
                _ => debug!("cannot read command line for pid {}", pid),
            }
        }
        processes
    }
}

#[async_trait]
impl Discoverer for HostDiscoverer {
    async fn discover(&self) -> Result<Discovery> {
        let hostname = self.read_hostname()?;
        let os_release = self.read_os_release();

        let os = match std::env::consts::OS {
            // The catalog uses the kernel name for macOS
            "macos" => "darwin".to_string(),
            other => other.to_string(),
        };

        let mut manifest = DiscoveryManifest {
            hostname,
            os,
            platform: os_release.get("ID").cloned().unwrap_or_default(),
            platform_family: os_release
                .get("ID_LIKE")
                .and_then(|v| v.split_whitespace().next())
                .unwrap_or_default()
                .to_string(),
            platform_version: os_release.get("VERSION_ID").cloned().unwrap_or_default(),
            kernel_arch: std::env::consts::ARCH.to_string(),
            kernel_version: self.read_kernel_version(),
            matched_processes: Vec::new(),
            is_unsupported: false,
        };
        filter_values(&mut manifest);

        let processes = if self.include_processes {
            self.enumerate_processes()
        } else {
            Vec::new()
        };

        debug!(
            os = %manifest.os,
            platform = %manifest.platform,
            platform_version = %manifest.platform_version,
            process_count = processes.len(),
            "discovered host"
        );

        Ok(Discovery {
            manifest,
            processes,
        })
    }
}

/// Blank platform values the catalog does not understand rather than letting
/// them fail every install target comparison.
fn filter_values(manifest: &mut DiscoveryManifest) {
    if !KNOWN_PLATFORMS
        .iter()
        .any(|p| manifest.platform.eq_ignore_ascii_case(p))
    {
        manifest.platform.clear();
    }
    if !KNOWN_PLATFORM_FAMILIES
        .iter()
        .any(|p| manifest.platform_family.eq_ignore_ascii_case(p))
    {
        manifest.platform_family.clear();
    }
}

fn parse_os_release(contents: &str) -> HashMap<String, String> {
    contents
        .lines()
        .filter_map(|line| {
            let (key, value) = line.split_once('=')?;
            Some((
                key.trim().to_string(),
                value.trim().trim_matches('"').to_string(),
            ))
        })
        .collect()
}

fn read_cmdline(proc_entry: &Path) -> Option<String> {
    let raw = std::fs::read(proc_entry.join("cmdline")).ok()?;
    let command = raw
        .split(|b| *b == 0)
        .filter(|part| !part.is_empty())
        .map(|part| String::from_utf8_lossy(part).into_owned())
        .collect::<Vec<_>>()
        .join(" ");
    Some(command)
}
