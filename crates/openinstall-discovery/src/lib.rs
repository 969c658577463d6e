//! # openinstall-discovery
//!
//! Inspects the running host and decides whether installation can proceed:
//! - [`HostDiscoverer`] fingerprints the OS, platform, kernel, and running
//!   processes into a [`openinstall_core::types::DiscoveryManifest`]
//! - [`process_matcher`] pairs live processes with recipe match patterns
//! - [`ManifestValidator`] rejects hosts below the supported baseline

pub mod discoverer;
pub mod manifest_validator;
pub mod process_matcher;

pub use discoverer::{Discoverer, Discovery, HostDiscoverer};
pub use manifest_validator::{HostValidator, ManifestValidator, OsValidator, OsVersionValidator};
pub use process_matcher::match_processes;
