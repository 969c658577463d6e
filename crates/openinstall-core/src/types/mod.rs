//! Shared type definitions for the installation pipeline

mod context;
mod manifest;
mod recipe;
mod status;

pub use context::InstallerContext;
pub use manifest::{DiscoveryManifest, MatchedProcess, ProcessSnapshot};
pub use recipe::{
    InstallTarget, LogMatch, Recipe, RecipeInputVar, RecipeVars, CORE_RECIPE_NAMES,
    GOLDEN_RECIPE_NAME, INFRA_AGENT_RECIPE_NAME, LOGGING_RECIPE_NAME,
};
pub use status::{ExecutionStatusRollup, RecipeStatus, RecipeStatusKind, StatusEvent};
