//! Post-install validation
//!
//! A recipe is only INSTALLED once its telemetry shows up. The polling
//! validator runs the recipe's validation query against the account until
//! data arrives, the attempt budget runs out, or the run is cancelled.
//! Exhaustion and cancellation are negative outcomes, not errors; only a
//! broken query surfaces as an error.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use openinstall_core::types::{DiscoveryManifest, Recipe};
use openinstall_core::{Error, Result};

use crate::shutdown::ShutdownSignal;
use crate::telemetry::TelemetryClient;

/// Outcome of validating one recipe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validation {
    /// Whether telemetry was observed within the attempt budget
    pub confirmed: bool,
    /// Entity GUID extracted from the first telemetry row, when present
    pub entity_guid: Option<String>,
}

impl Validation {
    fn unconfirmed() -> Self {
        Self {
            confirmed: false,
            entity_guid: None,
        }
    }
}

/// Confirms that an installed recipe is producing telemetry
#[async_trait]
pub trait RecipeValidator: Send + Sync {
    async fn validate(
        &self,
        recipe: &Recipe,
        manifest: &DiscoveryManifest,
        shutdown: ShutdownSignal,
    ) -> Result<Validation>;
}

/// Bounded-retry validator polling the telemetry API
pub struct PollingRecipeValidator {
    client: Arc<dyn TelemetryClient>,
    account_id: i64,
    max_attempts: u32,
    interval: Duration,
}

const DEFAULT_MAX_ATTEMPTS: u32 = 20;
const DEFAULT_INTERVAL: Duration = Duration::from_secs(5);

impl PollingRecipeValidator {
    pub fn new(client: Arc<dyn TelemetryClient>, account_id: i64) -> Self {
        Self {
            client,
            account_id,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            interval: DEFAULT_INTERVAL,
        }
    }

    pub fn with_polling(mut self, max_attempts: u32, interval: Duration) -> Self {
        self.max_attempts = max_attempts;
        self.interval = interval;
        self
    }
}

enum PollOutcome {
    Confirmed(Option<String>),
    Exhausted,
    Canceled,
    QueryFailed(String),
}

#[async_trait]
impl RecipeValidator for PollingRecipeValidator {
    async fn validate(
        &self,
        recipe: &Recipe,
        manifest: &DiscoveryManifest,
        shutdown: ShutdownSignal,
    ) -> Result<Validation> {
        if recipe.validation_query.trim().is_empty() {
            debug!(recipe = %recipe.name, "no validation query, confirming immediately");
            return Ok(Validation {
                confirmed: true,
                entity_guid: None,
            });
        }

        let nrql = recipe
            .validation_query
            .replace("{{HOSTNAME}}", &manifest.hostname);

        let (result_tx, result_rx) = oneshot::channel();
        let client = Arc::clone(&self.client);
        let account_id = self.account_id;
        let max_attempts = self.max_attempts;
        let interval = self.interval;
        let name = recipe.name.clone();
        let mut shutdown = shutdown;

        tokio::spawn(async move {
            let outcome = poll(
                client.as_ref(),
                account_id,
                &nrql,
                &name,
                max_attempts,
                interval,
                &mut shutdown,
            )
            .await;
            let _ = result_tx.send(outcome);
        });

        let outcome = result_rx
            .await
            .map_err(|_| Error::validation_query(&recipe.name, "validation task dropped"))?;

        match outcome {
            PollOutcome::Confirmed(entity_guid) => Ok(Validation {
                confirmed: true,
                entity_guid,
            }),
            PollOutcome::Exhausted => {
                warn!(recipe = %recipe.name, "validation attempts exhausted without data");
                Ok(Validation::unconfirmed())
            }
            PollOutcome::Canceled => {
                debug!(recipe = %recipe.name, "validation cancelled");
                Ok(Validation::unconfirmed())
            }
            PollOutcome::QueryFailed(message) => {
                Err(Error::validation_query(&recipe.name, message))
            }
        }
    }
}

async fn poll(
    client: &dyn TelemetryClient,
    account_id: i64,
    nrql: &str,
    recipe_name: &str,
    max_attempts: u32,
    interval: Duration,
    shutdown: &mut ShutdownSignal,
) -> PollOutcome {
    for attempt in 1..=max_attempts {
        if shutdown.is_triggered() {
            return PollOutcome::Canceled;
        }

        match client.query(account_id, nrql).await {
            Ok(results) if !results.is_empty() => {
                debug!(recipe = %recipe_name, attempt, "telemetry confirmed");
                return PollOutcome::Confirmed(extract_entity_guid(&results));
            }
            Ok(_) => {
                debug!(recipe = %recipe_name, attempt, "no telemetry yet");
            }
            Err(e) => return PollOutcome::QueryFailed(e.to_string()),
        }

        if attempt < max_attempts {
            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = shutdown.triggered() => return PollOutcome::Canceled,
            }
        }
    }
    PollOutcome::Exhausted
}

fn extract_entity_guid(results: &[Value]) -> Option<String> {
    results
        .first()
        .and_then(|row| row.get("entityGuid"))
        .and_then(Value::as_str)
        .filter(|g| !g.is_empty())
        .map(str::to_string)
}
