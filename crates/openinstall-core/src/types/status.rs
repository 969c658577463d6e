//! Recipe lifecycle statuses and the execution status rollup
//!
//! The rollup is the single process-scoped document summarizing every
//! recipe's status for one installation run. It is mutated in place as
//! lifecycle events arrive and persisted after every mutation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::recipe::Recipe;

/// Lifecycle states of a recipe within one installation run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecipeStatusKind {
    /// Process-match evidence exists before any install attempt
    Detected,
    /// Compatible with the host and queued for installation
    Available,
    Installing,
    /// Terminal: install steps ran and telemetry was confirmed
    Installed,
    /// Terminal: install steps or validation failed
    Failed,
    /// Terminal: declined, filtered out, or excluded by a skip flag
    Skipped,
    /// Terminal: the run was interrupted while this recipe was pending
    Canceled,
    /// Terminal: the recipe cannot run on this host
    Unsupported,
}

impl RecipeStatusKind {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Installed | Self::Failed | Self::Skipped | Self::Canceled | Self::Unsupported
        )
    }
}

impl std::fmt::Display for RecipeStatusKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Detected => "DETECTED",
            Self::Available => "AVAILABLE",
            Self::Installing => "INSTALLING",
            Self::Installed => "INSTALLED",
            Self::Failed => "FAILED",
            Self::Skipped => "SKIPPED",
            Self::Canceled => "CANCELED",
            Self::Unsupported => "UNSUPPORTED",
        };
        write!(f, "{}", s)
    }
}

/// Current status of one recipe in the rollup
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeStatus {
    pub name: String,
    pub display_name: String,
    pub status: RecipeStatusKind,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub errors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub entity_guid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub validation_duration_ms: Option<i64>,
}

/// One lifecycle transition, appended to the rollup's history
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusEvent {
    pub timestamp: DateTime<Utc>,
    pub recipe_name: String,
    pub status: RecipeStatusKind,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub message: Option<String>,
}

/// Process-scoped status document, one per installation run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionStatusRollup {
    /// Generated once per run
    pub document_id: String,
    pub timestamp: DateTime<Utc>,
    pub complete: bool,
    pub canceled: bool,
    pub entity_guids: Vec<String>,
    pub recipe_statuses: Vec<RecipeStatus>,
    pub events: Vec<StatusEvent>,
}

impl Default for ExecutionStatusRollup {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecutionStatusRollup {
    pub fn new() -> Self {
        Self {
            document_id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            complete: false,
            canceled: false,
            entity_guids: Vec::new(),
            recipe_statuses: Vec::new(),
            events: Vec::new(),
        }
    }

    /// Apply one lifecycle transition: the recipe's current entry is updated
    /// in place (or created), and exactly one event is appended to history.
    pub fn apply(&mut self, status: RecipeStatusKind, recipe: &Recipe, message: Option<String>) {
        self.timestamp = Utc::now();
        self.events.push(StatusEvent {
            timestamp: self.timestamp,
            recipe_name: recipe.name.clone(),
            status,
            message: message.clone(),
        });

        match self
            .recipe_statuses
            .iter_mut()
            .find(|rs| rs.name == recipe.name)
        {
            Some(existing) => {
                existing.status = status;
                if let Some(msg) = message {
                    existing.errors.push(msg);
                }
            }
            None => {
                self.recipe_statuses.push(RecipeStatus {
                    name: recipe.name.clone(),
                    display_name: recipe.display_name.clone(),
                    status,
                    errors: message.into_iter().collect(),
                    entity_guid: None,
                    validation_duration_ms: None,
                });
            }
        }
    }

    /// Record an entity identifier discovered during validation
    pub fn add_entity_guid(&mut self, recipe_name: &str, guid: String) {
        if let Some(rs) = self
            .recipe_statuses
            .iter_mut()
            .find(|rs| rs.name == recipe_name)
        {
            rs.entity_guid = Some(guid.clone());
        }
        if !self.entity_guids.contains(&guid) {
            self.entity_guids.push(guid);
        }
    }

    pub fn status_of(&self, recipe_name: &str) -> Option<RecipeStatusKind> {
        self.recipe_statuses
            .iter()
            .find(|rs| rs.name == recipe_name)
            .map(|rs| rs.status)
    }

    pub fn has_installed_recipes(&self) -> bool {
        self.recipe_statuses
            .iter()
            .any(|rs| rs.status == RecipeStatusKind::Installed)
    }

    pub fn has_failed_recipes(&self) -> bool {
        self.recipe_statuses
            .iter()
            .any(|rs| rs.status == RecipeStatusKind::Failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recipe(name: &str) -> Recipe {
        Recipe {
            name: name.to_string(),
            display_name: name.to_uppercase(),
            ..Default::default()
        }
    }

    #[test]
    fn apply_updates_current_status_and_grows_history() {
        let mut rollup = ExecutionStatusRollup::new();
        let r = recipe("infra");

        rollup.apply(RecipeStatusKind::Available, &r, None);
        rollup.apply(RecipeStatusKind::Installing, &r, None);
        rollup.apply(RecipeStatusKind::Installed, &r, None);

        // One current entry, updated in place
        assert_eq!(rollup.recipe_statuses.len(), 1);
        assert_eq!(rollup.status_of("infra"), Some(RecipeStatusKind::Installed));
        // One history event per call
        assert_eq!(rollup.events.len(), 3);
    }

    #[test]
    fn failure_message_lands_in_errors() {
        let mut rollup = ExecutionStatusRollup::new();
        let r = recipe("logging");
        rollup.apply(RecipeStatusKind::Available, &r, None);
        rollup.apply(
            RecipeStatusKind::Failed,
            &r,
            Some("exit status 1".to_string()),
        );

        let rs = &rollup.recipe_statuses[0];
        assert_eq!(rs.status, RecipeStatusKind::Failed);
        assert_eq!(rs.errors, vec!["exit status 1"]);
        assert!(rollup.has_failed_recipes());
        assert!(!rollup.has_installed_recipes());
    }

    #[test]
    fn entity_guids_are_deduplicated() {
        let mut rollup = ExecutionStatusRollup::new();
        let r = recipe("infra");
        rollup.apply(RecipeStatusKind::Installed, &r, None);
        rollup.add_entity_guid("infra", "MXxJTkZSQQ".to_string());
        rollup.add_entity_guid("infra", "MXxJTkZSQQ".to_string());

        assert_eq!(rollup.entity_guids.len(), 1);
        assert_eq!(
            rollup.recipe_statuses[0].entity_guid.as_deref(),
            Some("MXxJTkZSQQ")
        );
    }
}
