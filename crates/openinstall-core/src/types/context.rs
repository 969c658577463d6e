//! Installer context
//!
//! Options the surrounding CLI layer resolves from flags and hands to the
//! orchestrator. The core never reads flags itself.

use serde::{Deserialize, Serialize};

/// Per-run options supplied by the CLI surface
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InstallerContext {
    /// Explicit recipe names for a targeted install
    pub recipe_names: Vec<String>,

    /// Explicit recipe file paths or URLs for a targeted install
    pub recipe_paths: Vec<String>,

    /// Auto-affirm every prompt
    pub assume_yes: bool,

    /// Skip running-process discovery (host facts are still gathered)
    pub skip_discovery: bool,

    /// Skip the infrastructure agent recipe
    pub skip_infra: bool,

    /// Skip the logging recipe
    pub skip_logging: bool,

    /// Skip all non-core integrations
    pub skip_integrations: bool,

    /// Load the recipe catalog from a local directory instead of the service
    pub local_recipes: Option<String>,
}

impl InstallerContext {
    /// Whether the user named specific recipes or paths (targeted install)
    pub fn recipes_provided(&self) -> bool {
        !self.recipe_names.is_empty() || !self.recipe_paths.is_empty()
    }
}
