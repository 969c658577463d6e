//! # openinstall-core
//!
//! Core library for the openinstall CLI providing:
//! - Type definitions for recipes, discovery manifests, and install statuses
//! - The error taxonomy shared by every installation component
//! - Installer context and credential configuration

pub mod config;
pub mod error;
pub mod types;

pub use config::AuthConfig;
pub use error::{Error, Result};
