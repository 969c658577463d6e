//! Status reporting
//!
//! The reporter owns the run's [`ExecutionStatusRollup`] and pushes the
//! full document to every subscriber after each lifecycle transition.
//! Subscriber failures are logged and never abort the run; the in-memory
//! rollup always carries the transition.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use async_trait::async_trait;
use fs4::fs_std::FileExt;
use serde_json::json;
use tracing::{info, warn};

use openinstall_core::types::{ExecutionStatusRollup, Recipe, RecipeStatusKind};
use openinstall_core::{Error, Result};

use crate::document_store::{DocumentScope, DocumentStore};

/// Collection name for rollup documents in the remote store
pub const STATUS_COLLECTION: &str = "openInstallStatus";

/// Receives the rollup after every mutation
#[async_trait]
pub trait StatusSubscriber: Send + Sync {
    async fn persist(&self, rollup: &ExecutionStatusRollup) -> Result<()>;
}

/// Mirrors the rollup into the remote document store: one user-scoped
/// document per run, plus one entity-scoped copy per entity the run
/// produced.
pub struct DocumentStoreSubscriber {
    store: Box<dyn DocumentStore>,
}

impl DocumentStoreSubscriber {
    pub fn new(store: Box<dyn DocumentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl StatusSubscriber for DocumentStoreSubscriber {
    async fn persist(&self, rollup: &ExecutionStatusRollup) -> Result<()> {
        let document = json!(rollup);

        self.store
            .write_document(
                &DocumentScope::User,
                STATUS_COLLECTION,
                &rollup.document_id,
                &document,
            )
            .await?;

        for guid in &rollup.entity_guids {
            self.store
                .write_document(
                    &DocumentScope::Entity(guid.clone()),
                    STATUS_COLLECTION,
                    &rollup.document_id,
                    &document,
                )
                .await?;
        }

        Ok(())
    }
}

/// Writes the rollup to a local JSON file (atomic, file-locked)
pub struct FileStatusSubscriber {
    path: PathBuf,
}

impl FileStatusSubscriber {
    /// Default location: `~/.openinstall/install_status.json`
    pub fn default_location() -> Result<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| Error::reporting("failed to resolve home directory"))?;
        Ok(Self {
            path: home.join(".openinstall").join("install_status.json"),
        })
    }

    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn write(&self, rollup: &ExecutionStatusRollup) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| Error::reporting(format!("failed to create status directory: {e}")))?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.path)
            .map_err(|e| Error::reporting(format!("failed to open status file: {e}")))?;

        // Exclusive lock, released on drop
        file.lock_exclusive()
            .map_err(|e| Error::reporting(format!("failed to lock status file: {e}")))?;

        let payload = serde_json::to_string_pretty(rollup)
            .map_err(|e| Error::reporting(format!("failed to serialize status: {e}")))?;
        file.write_all(payload.as_bytes())
            .map_err(|e| Error::reporting(format!("failed to write status file: {e}")))?;
        file.sync_all()
            .map_err(|e| Error::reporting(format!("failed to sync status file: {e}")))?;

        Ok(())
    }
}

#[async_trait]
impl StatusSubscriber for FileStatusSubscriber {
    async fn persist(&self, rollup: &ExecutionStatusRollup) -> Result<()> {
        self.write(rollup)
    }
}

/// Owns the rollup and fans out every mutation to the subscribers
pub struct StatusReporter {
    rollup: ExecutionStatusRollup,
    subscribers: Vec<Box<dyn StatusSubscriber>>,
}

impl StatusReporter {
    pub fn new(subscribers: Vec<Box<dyn StatusSubscriber>>) -> Self {
        Self {
            rollup: ExecutionStatusRollup::new(),
            subscribers,
        }
    }

    pub fn rollup(&self) -> &ExecutionStatusRollup {
        &self.rollup
    }

    pub fn into_rollup(self) -> ExecutionStatusRollup {
        self.rollup
    }

    /// Apply one transition and persist the updated rollup everywhere
    pub async fn report(
        &mut self,
        status: RecipeStatusKind,
        recipe: &Recipe,
        message: Option<String>,
    ) -> Result<()> {
        self.rollup.apply(status, recipe, message);
        self.persist_all().await
    }

    pub async fn recipe_detected(&mut self, recipe: &Recipe) -> Result<()> {
        self.report(RecipeStatusKind::Detected, recipe, None).await
    }

    pub async fn recipe_available(&mut self, recipe: &Recipe) -> Result<()> {
        self.report(RecipeStatusKind::Available, recipe, None).await
    }

    pub async fn recipe_installing(&mut self, recipe: &Recipe) -> Result<()> {
        self.report(RecipeStatusKind::Installing, recipe, None)
            .await
    }

    pub async fn recipe_installed(
        &mut self,
        recipe: &Recipe,
        validation_duration_ms: i64,
        entity_guid: Option<String>,
    ) -> Result<()> {
        self.rollup.apply(RecipeStatusKind::Installed, recipe, None);
        if let Some(rs) = self
            .rollup
            .recipe_statuses
            .iter_mut()
            .find(|rs| rs.name == recipe.name)
        {
            rs.validation_duration_ms = Some(validation_duration_ms);
        }
        if let Some(guid) = entity_guid {
            self.rollup.add_entity_guid(&recipe.name, guid);
        }
        info!(recipe = %recipe.name, "recipe installed");
        self.persist_all().await
    }

    pub async fn recipe_failed(&mut self, recipe: &Recipe, message: String) -> Result<()> {
        warn!(recipe = %recipe.name, error = %message, "recipe failed");
        self.report(RecipeStatusKind::Failed, recipe, Some(message))
            .await
    }

    pub async fn recipe_skipped(&mut self, recipe: &Recipe) -> Result<()> {
        self.report(RecipeStatusKind::Skipped, recipe, None).await
    }

    pub async fn recipe_canceled(&mut self, recipe: &Recipe) -> Result<()> {
        self.report(RecipeStatusKind::Canceled, recipe, None).await
    }

    pub async fn recipe_unsupported(
        &mut self,
        recipe: &Recipe,
        message: Option<String>,
    ) -> Result<()> {
        self.report(RecipeStatusKind::Unsupported, recipe, message)
            .await
    }

    /// Mark the run finished and persist the final rollup
    pub async fn install_complete(&mut self) -> Result<()> {
        self.rollup.complete = true;
        self.rollup.timestamp = chrono::Utc::now();
        self.persist_all().await
    }

    /// Mark the run interrupted and persist the final rollup
    pub async fn install_canceled(&mut self) -> Result<()> {
        self.rollup.complete = true;
        self.rollup.canceled = true;
        self.rollup.timestamp = chrono::Utc::now();
        self.persist_all().await
    }

    /// Subscribers are best-effort: a store outage must not abort an
    /// otherwise healthy install.
    async fn persist_all(&self) -> Result<()> {
        for subscriber in &self.subscribers {
            if let Err(e) = subscriber.persist(&self.rollup).await {
                warn!(error = %e, "status subscriber failed to persist");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;

    struct CountingSubscriber {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl StatusSubscriber for CountingSubscriber {
        async fn persist(&self, _rollup: &ExecutionStatusRollup) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct FailingSubscriber;

    #[async_trait]
    impl StatusSubscriber for FailingSubscriber {
        async fn persist(&self, _rollup: &ExecutionStatusRollup) -> Result<()> {
            Err(Error::reporting("store unreachable"))
        }
    }

    fn recipe(name: &str) -> Recipe {
        Recipe {
            name: name.to_string(),
            display_name: name.to_uppercase(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn every_transition_persists_once_per_subscriber() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut reporter = StatusReporter::new(vec![Box::new(CountingSubscriber {
            calls: calls.clone(),
        })]);

        let r = recipe("infra");
        reporter.recipe_available(&r).await.unwrap();
        reporter.recipe_installing(&r).await.unwrap();
        reporter.recipe_installed(&r, 1200, None).await.unwrap();
        reporter.install_complete().await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert!(reporter.rollup().complete);
        assert_eq!(
            reporter.rollup().status_of("infra"),
            Some(RecipeStatusKind::Installed)
        );
    }

    #[tokio::test]
    async fn subscriber_failure_does_not_abort_or_lose_the_transition() {
        let mut reporter = StatusReporter::new(vec![Box::new(FailingSubscriber)]);
        let r = recipe("logging");

        reporter
            .recipe_failed(&r, "exit 1".to_string())
            .await
            .unwrap();
        // The rollup still carries the transition
        assert_eq!(
            reporter.rollup().status_of("logging"),
            Some(RecipeStatusKind::Failed)
        );
    }

    #[tokio::test]
    async fn installed_records_duration_and_entity() {
        let mut reporter = StatusReporter::new(vec![]);
        let r = recipe("infra");

        reporter.recipe_installing(&r).await.unwrap();
        reporter
            .recipe_installed(&r, 2500, Some("GUID-1".to_string()))
            .await
            .unwrap();

        let rs = &reporter.rollup().recipe_statuses[0];
        assert_eq!(rs.validation_duration_ms, Some(2500));
        assert_eq!(rs.entity_guid.as_deref(), Some("GUID-1"));
        assert_eq!(reporter.rollup().entity_guids, vec!["GUID-1"]);
    }

    #[tokio::test]
    async fn file_subscriber_writes_readable_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("status.json");
        let subscriber = FileStatusSubscriber::new(path.clone());

        let mut reporter = StatusReporter::new(vec![Box::new(subscriber)]);
        let r = recipe("infra");
        reporter.recipe_installed(&r, 100, None).await.unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let parsed: ExecutionStatusRollup = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed.status_of("infra"), Some(RecipeStatusKind::Installed));
    }

    #[tokio::test]
    async fn file_subscriber_overwrites_previous_snapshot() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("status.json");
        let subscriber = FileStatusSubscriber::new(path.clone());

        let mut reporter = StatusReporter::new(vec![Box::new(subscriber)]);
        let r = recipe("infra");
        reporter.recipe_available(&r).await.unwrap();
        reporter.recipe_installing(&r).await.unwrap();

        let parsed: ExecutionStatusRollup =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        // One document with the latest state, not an append log
        assert_eq!(parsed.recipe_statuses.len(), 1);
        assert_eq!(
            parsed.status_of("infra"),
            Some(RecipeStatusKind::Installing)
        );
        assert_eq!(parsed.events.len(), 2);
    }
}
