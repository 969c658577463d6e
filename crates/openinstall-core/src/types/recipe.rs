//! Recipe definitions
//!
//! A recipe is the unit of installation: a named, versionless description of
//! how to install one monitoring integration, which hosts it applies to, and
//! how to confirm it is emitting data after install.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Recipe name of the infrastructure agent, the hard prerequisite for
/// everything else in the core bundle.
pub const INFRA_AGENT_RECIPE_NAME: &str = "infrastructure-agent-installer";

/// Recipe name of the log forwarding integration.
pub const LOGGING_RECIPE_NAME: &str = "logs-integration";

/// Recipe name of the golden signal alerts recipe.
pub const GOLDEN_RECIPE_NAME: &str = "alerts-golden-signal";

/// Fixed membership of the core bundle, in install order.
pub const CORE_RECIPE_NAMES: [&str; 3] = [
    INFRA_AGENT_RECIPE_NAME,
    LOGGING_RECIPE_NAME,
    GOLDEN_RECIPE_NAME,
];

/// Variables resolved for a recipe at execution time, passed to the install
/// steps as environment.
pub type RecipeVars = BTreeMap<String, String>;

/// A named, versionless installation unit. Immutable after catalog fetch.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Recipe {
    /// Stable identifier, globally unique within a catalog fetch
    pub name: String,

    /// Human-readable name for status output
    pub display_name: String,

    pub description: String,

    /// Names of other recipes that must be installed first
    pub dependencies: Vec<String>,

    /// Compatibility predicates; a recipe with no targets applies everywhere
    pub install_targets: Vec<InstallTarget>,

    /// Regex patterns matched against running process command lines
    pub process_match: Vec<String>,

    /// Glob patterns for discovering log files on the host
    pub log_match: Vec<LogMatch>,

    /// Telemetry query used to confirm the install produced observable data.
    /// `{{HOSTNAME}}` is substituted from the discovery manifest.
    pub validation_query: String,

    /// Opaque install steps, run by the recipe executor
    pub install: String,

    /// Variables the recipe expects to be resolved before execution
    pub input_vars: Vec<RecipeInputVar>,
}

impl Recipe {
    /// Case-insensitive name comparison, matching catalog lookup semantics
    pub fn is_named(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    /// Whether this recipe is part of the fixed core bundle
    pub fn is_core(&self) -> bool {
        CORE_RECIPE_NAMES.iter().any(|n| self.is_named(n))
    }
}

/// A compatibility predicate attached to a recipe. Any subset of fields may
/// be populated; empty fields are unconstrained.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct InstallTarget {
    pub os: String,
    pub platform: String,
    pub platform_family: String,
    pub platform_version: String,
    pub kernel_arch: String,
    pub kernel_version: String,
}

impl InstallTarget {
    /// Populated (field name, value) pairs, paired with the manifest fields
    /// they constrain.
    pub fn populated_fields(&self) -> Vec<(&'static str, &str)> {
        [
            ("os", self.os.as_str()),
            ("platform", self.platform.as_str()),
            ("platformFamily", self.platform_family.as_str()),
            ("platformVersion", self.platform_version.as_str()),
            ("kernelArch", self.kernel_arch.as_str()),
            ("kernelVersion", self.kernel_version.as_str()),
        ]
        .into_iter()
        .filter(|(_, v)| !v.is_empty())
        .collect()
    }
}

/// A pattern that may match one or more log files on the host
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct LogMatch {
    pub name: String,

    /// Glob pattern for candidate log files
    pub file: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes: Option<LogMatchAttributes>,
}

/// Metadata about a log match entry
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct LogMatchAttributes {
    pub logtype: String,
}

/// A variable the recipe's install steps expect, resolvable from the
/// environment or a declared default.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct RecipeInputVar {
    pub name: String,
    pub prompt: String,
    pub default: String,
}
