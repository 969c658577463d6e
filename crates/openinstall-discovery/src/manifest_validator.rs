//! Manifest validation
//!
//! Runs an ordered list of host validators against the discovery manifest.
//! All failures are accumulated and joined into one error; any failure marks
//! the manifest unsupported and aborts the run before the catalog fetch.

use openinstall_core::types::DiscoveryManifest;
use openinstall_core::{Error, Result};

/// One host requirement check
pub trait HostValidator: Send + Sync {
    fn validate(&self, manifest: &DiscoveryManifest) -> std::result::Result<(), String>;
}

/// Ordered list of host validators
pub struct ManifestValidator {
    validators: Vec<Box<dyn HostValidator>>,
}

impl Default for ManifestValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl ManifestValidator {
    /// Baseline requirements: a supported OS, Windows 6.2+, Ubuntu 16.04+
    pub fn new() -> Self {
        Self {
            validators: vec![
                Box::new(OsValidator),
                Box::new(OsVersionValidator::new("windows", "", 6, 2)),
                Box::new(OsVersionValidator::new("linux", "ubuntu", 16, 4)),
            ],
        }
    }

    #[cfg(test)]
    fn with_validators(validators: Vec<Box<dyn HostValidator>>) -> Self {
        Self { validators }
    }

    /// Validate the manifest; on any failure, mark it unsupported and return
    /// all accumulated reasons joined into one error.
    pub fn validate(&self, manifest: &mut DiscoveryManifest) -> Result<()> {
        let failures: Vec<String> = self
            .validators
            .iter()
            .filter_map(|v| v.validate(manifest).err())
            .collect();

        if failures.is_empty() {
            Ok(())
        } else {
            manifest.is_unsupported = true;
            Err(Error::unsupported_host(failures))
        }
    }
}

/// Generic operating system allow-list
pub struct OsValidator;

const SUPPORTED_OS: [&str; 3] = ["linux", "windows", "darwin"];

impl HostValidator for OsValidator {
    fn validate(&self, manifest: &DiscoveryManifest) -> std::result::Result<(), String> {
        if SUPPORTED_OS
            .iter()
            .any(|os| manifest.os.eq_ignore_ascii_case(os))
        {
            Ok(())
        } else {
            Err(format!(
                "{} is not a supported operating system",
                display_target(manifest)
            ))
        }
    }
}

/// Minimum platform version check for one OS (optionally one platform).
/// Version strings are parsed permissively; anything without a numeric
/// major segment fails closed as an unidentifiable version.
pub struct OsVersionValidator {
    os: &'static str,
    platform: &'static str,
    min_major: u32,
    min_minor: u32,
}

impl OsVersionValidator {
    pub fn new(os: &'static str, platform: &'static str, min_major: u32, min_minor: u32) -> Self {
        Self {
            os,
            platform,
            min_major,
            min_minor,
        }
    }

    fn check(&self, major: u32, minor: u32) -> bool {
        major > self.min_major || (major == self.min_major && minor >= self.min_minor)
    }
}

impl HostValidator for OsVersionValidator {
    fn validate(&self, manifest: &DiscoveryManifest) -> std::result::Result<(), String> {
        if !manifest.os.eq_ignore_ascii_case(self.os) {
            return Ok(());
        }
        if !self.platform.is_empty() && !manifest.platform.eq_ignore_ascii_case(self.platform) {
            return Ok(());
        }

        let no_version = || {
            format!(
                "failed to identify a valid version of {}",
                display_target(manifest)
            )
        };

        let segments: Vec<&str> = manifest.platform_version.trim().split('.').collect();
        match segments.as_slice() {
            // A bare major can never prove the minimum minor is met
            [major] => match major.parse::<u32>() {
                Ok(major) if major > self.min_major => Ok(()),
                Ok(_) => Err(too_old(manifest)),
                Err(_) => Err(no_version()),
            },
            [major, minor, ..] => match (major.parse::<u32>(), minor.parse::<u32>()) {
                (Ok(major), Ok(minor)) if self.check(major, minor) => Ok(()),
                (Ok(_), Ok(_)) => Err(too_old(manifest)),
                _ => Err(no_version()),
            },
            [] => Err(no_version()),
        }
    }
}

fn too_old(manifest: &DiscoveryManifest) -> String {
    format!(
        "this version of {} is no longer supported",
        display_target(manifest)
    )
}

fn display_target(manifest: &DiscoveryManifest) -> String {
    if manifest.platform.is_empty() {
        manifest.os.clone()
    } else {
        format!("{}/{}", manifest.os, manifest.platform)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest(os: &str, platform: &str, version: &str) -> DiscoveryManifest {
        DiscoveryManifest {
            os: os.to_string(),
            platform: platform.to_string(),
            platform_version: version.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn supported_linux_passes() {
        let mut m = manifest("linux", "ubuntu", "20.04");
        assert!(ManifestValidator::new().validate(&mut m).is_ok());
        assert!(!m.is_unsupported);
    }

    #[test]
    fn unsupported_os_fails_and_marks_manifest() {
        let mut m = manifest("freebsd", "", "13.2");
        let err = ManifestValidator::new().validate(&mut m).unwrap_err();
        assert!(m.is_unsupported);
        assert!(err
            .to_string()
            .contains("freebsd is not a supported operating system"));
    }

    #[test]
    fn windows_version_boundaries() {
        let cases = [
            ("6.1", false), // Windows 7 kernel, below 6.2
            ("6.2", true),
            ("10.0", true),
        ];
        for (version, ok) in cases {
            let mut m = manifest("windows", "", version);
            assert_eq!(
                ManifestValidator::new().validate(&mut m).is_ok(),
                ok,
                "windows {}",
                version
            );
        }
    }

    #[test]
    fn ubuntu_version_boundaries() {
        let cases = [("14.04", false), ("16.04", true), ("22.10", true)];
        for (version, ok) in cases {
            let mut m = manifest("linux", "ubuntu", version);
            assert_eq!(
                ManifestValidator::new().validate(&mut m).is_ok(),
                ok,
                "ubuntu {}",
                version
            );
        }
    }

    #[test]
    fn non_numeric_version_fails_closed() {
        let mut m = manifest("windows", "", "vista");
        let err = ManifestValidator::new().validate(&mut m).unwrap_err();
        assert!(err.to_string().contains("failed to identify a valid version"));
    }

    #[test]
    fn bare_major_cannot_satisfy_minimum_minor() {
        // "16" for a 16.04 minimum is treated as below the baseline
        let mut m = manifest("linux", "ubuntu", "16");
        assert!(ManifestValidator::new().validate(&mut m).is_err());

        let mut m = manifest("linux", "ubuntu", "18");
        assert!(ManifestValidator::new().validate(&mut m).is_ok());
    }

    #[test]
    fn other_platforms_are_not_version_checked() {
        let mut m = manifest("linux", "debian", "8.0");
        assert!(ManifestValidator::new().validate(&mut m).is_ok());
    }

    #[test]
    fn all_failures_are_accumulated() {
        struct AlwaysFails(&'static str);
        impl HostValidator for AlwaysFails {
            fn validate(&self, _: &DiscoveryManifest) -> std::result::Result<(), String> {
                Err(self.0.to_string())
            }
        }

        let validator = ManifestValidator::with_validators(vec![
            Box::new(AlwaysFails("first reason")),
            Box::new(AlwaysFails("second reason")),
        ]);
        let mut m = manifest("linux", "ubuntu", "20.04");
        let err = validator.validate(&mut m).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("first reason, second reason"));
        assert!(msg.starts_with("Installation requirements error:"));
    }
}
