//! Install command

use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};

use openinstall_core::types::InstallerContext;
use openinstall_core::AuthConfig;
use openinstall_discovery::{Discoverer, HostDiscoverer};
use openinstall_install::{
    shutdown_channel, DialoguerPrompter, DocumentStoreSubscriber, FileStatusSubscriber,
    HttpDocumentStore, NerdGraphTelemetryClient, PollingRecipeValidator, RecipeInstaller,
    ShellRecipeExecutor, StatusSubscriber,
};
use openinstall_recipes::{LocalRecipeFetcher, RecipeFetcher, ServiceRecipeFetcher};

use crate::cli::InstallArgs;

const DEFAULT_RECIPE_SERVICE_URL: &str = "https://recipes.newrelic.com/recipes";
const ENV_RECIPE_SERVICE_URL: &str = "NEW_RELIC_RECIPE_SERVICE_URL";

pub async fn run(args: InstallArgs) -> Result<()> {
    let auth = AuthConfig::from_env()?;

    let context = InstallerContext {
        recipe_names: args.recipes,
        recipe_paths: args.recipe_paths,
        assume_yes: args.assume_yes,
        skip_discovery: args.skip_discovery,
        skip_infra: args.skip_infra,
        skip_logging: args.skip_logging,
        skip_integrations: args.skip_integrations,
        local_recipes: args.local_recipes,
    };

    // SIGINT turns into a cooperative cancellation of the whole run
    let (shutdown_handle, shutdown_signal) = shutdown_channel();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, finishing current step and cancelling");
            shutdown_handle.trigger();
        }
    });

    let discoverer: Arc<dyn Discoverer> = if context.skip_discovery {
        Arc::new(HostDiscoverer::new().without_processes())
    } else {
        Arc::new(HostDiscoverer::new())
    };

    let fetcher: Arc<dyn RecipeFetcher> = match &context.local_recipes {
        Some(dir) => Arc::new(LocalRecipeFetcher::new(dir.clone())),
        None => {
            let endpoint = std::env::var(ENV_RECIPE_SERVICE_URL)
                .unwrap_or_else(|_| DEFAULT_RECIPE_SERVICE_URL.to_string());
            Arc::new(ServiceRecipeFetcher::new(endpoint, &auth))
        }
    };

    let telemetry = Arc::new(NerdGraphTelemetryClient::new(&auth));
    let validator = Arc::new(PollingRecipeValidator::new(telemetry, auth.account_id));

    let subscribers: Vec<Box<dyn StatusSubscriber>> = vec![
        Box::new(FileStatusSubscriber::default_location()?),
        Box::new(DocumentStoreSubscriber::new(Box::new(
            HttpDocumentStore::new(&auth),
        ))),
    ];

    let installer = RecipeInstaller::new(
        context,
        auth,
        discoverer,
        fetcher,
        Arc::new(ShellRecipeExecutor::new()),
        validator,
        Arc::new(DialoguerPrompter),
        shutdown_signal,
        subscribers,
    );

    let rollup = installer.install().await?;

    let installed = rollup
        .recipe_statuses
        .iter()
        .filter(|rs| rs.status == openinstall_core::types::RecipeStatusKind::Installed)
        .count();
    let failed = rollup
        .recipe_statuses
        .iter()
        .filter(|rs| rs.status == openinstall_core::types::RecipeStatusKind::Failed)
        .count();
    info!(installed, failed, "installation run complete");

    Ok(())
}
