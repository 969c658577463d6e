//! Discovery manifest
//!
//! The structured description of the host, produced once per installation
//! run by the discoverer and read by every downstream component.

use serde::{Deserialize, Serialize};

/// Discovered information about the host. Created once per run; immutable
/// after the manifest validator has run (which may set `is_unsupported`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DiscoveryManifest {
    pub hostname: String,
    pub os: String,
    pub platform: String,
    pub platform_family: String,
    pub platform_version: String,
    pub kernel_arch: String,
    pub kernel_version: String,

    /// Running processes that matched at least one recipe's process patterns
    pub matched_processes: Vec<MatchedProcess>,

    /// Set by the manifest validator when the host fails a requirement check
    pub is_unsupported: bool,
}

impl DiscoveryManifest {
    /// Manifest field value by its wire name, as used by install target
    /// compatibility matching.
    pub fn field(&self, name: &str) -> Option<&str> {
        match name {
            "os" => Some(&self.os),
            "platform" => Some(&self.platform),
            "platformFamily" => Some(&self.platform_family),
            "platformVersion" => Some(&self.platform_version),
            "kernelArch" => Some(&self.kernel_arch),
            "kernelVersion" => Some(&self.kernel_version),
            _ => None,
        }
    }
}

/// A raw enumerated process, before any recipe matching
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessSnapshot {
    pub pid: i32,
    /// Full command line; may be empty when unreadable
    pub command: String,
}

/// A process whose command line matched a recipe's process pattern
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MatchedProcess {
    pub command: String,
    pub matching_pattern: String,
}
