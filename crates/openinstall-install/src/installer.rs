//! Installation orchestration
//!
//! One run: discover the host, validate it, fetch and narrow the catalog,
//! partition into bundles, install. Failures before the first bundle are
//! fatal; afterwards the bundle kind decides.

use std::sync::Arc;

use tracing::{debug, info};

use openinstall_core::types::{
    ExecutionStatusRollup, InstallerContext, INFRA_AGENT_RECIPE_NAME, LOGGING_RECIPE_NAME,
};
use openinstall_core::{AuthConfig, Error, Result};
use openinstall_discovery::{match_processes, Discoverer, ManifestValidator};
use openinstall_recipes::{Bundler, RecipeFetcher, RecipeFileFetcher, RecipeRepository};

use crate::bundle_installer::BundleInstaller;
use crate::executor::RecipeExecutor;
use crate::prompt::Prompter;
use crate::shutdown::ShutdownSignal;
use crate::status::{StatusReporter, StatusSubscriber};
use crate::validator::RecipeValidator;
use crate::vars::RecipeVarProvider;

/// Drives one installation run end to end
pub struct RecipeInstaller {
    context: InstallerContext,
    auth: AuthConfig,
    discoverer: Arc<dyn Discoverer>,
    fetcher: Arc<dyn RecipeFetcher>,
    executor: Arc<dyn RecipeExecutor>,
    validator: Arc<dyn RecipeValidator>,
    prompter: Arc<dyn Prompter>,
    shutdown: ShutdownSignal,
    subscribers: Vec<Box<dyn StatusSubscriber>>,
}

impl RecipeInstaller {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        context: InstallerContext,
        auth: AuthConfig,
        discoverer: Arc<dyn Discoverer>,
        fetcher: Arc<dyn RecipeFetcher>,
        executor: Arc<dyn RecipeExecutor>,
        validator: Arc<dyn RecipeValidator>,
        prompter: Arc<dyn Prompter>,
        shutdown: ShutdownSignal,
        subscribers: Vec<Box<dyn StatusSubscriber>>,
    ) -> Self {
        Self {
            context,
            auth,
            discoverer,
            fetcher,
            executor,
            validator,
            prompter,
            shutdown,
            subscribers,
        }
    }

    /// Run the full pipeline and return the final status rollup
    pub async fn install(self) -> Result<ExecutionStatusRollup> {
        let mut reporter = StatusReporter::new(self.subscribers);

        let discovery = self.discoverer.discover().await?;
        let mut manifest = discovery.manifest;
        info!(
            hostname = %manifest.hostname,
            os = %manifest.os,
            platform = %manifest.platform,
            "discovered host"
        );

        if let Err(e) = ManifestValidator::new().validate(&mut manifest) {
            reporter.install_complete().await?;
            return Err(e);
        }

        let mut repository = RecipeRepository::new(Arc::clone(&self.fetcher), manifest.clone());
        let compatible = match repository.find_all().await {
            Ok(compatible) => compatible,
            Err(e) => {
                reporter.install_complete().await?;
                return Err(e);
            }
        };

        if !self.context.skip_discovery {
            manifest.matched_processes =
                match_processes(&discovery.processes, compatible.iter().map(|r| r.as_ref()));
            debug!(
                matched = manifest.matched_processes.len(),
                "matched running processes against the catalog"
            );
        }

        let mut skipped: Vec<String> = Vec::new();
        if self.context.skip_infra {
            skipped.push(INFRA_AGENT_RECIPE_NAME.to_string());
        }
        if self.context.skip_logging {
            skipped.push(LOGGING_RECIPE_NAME.to_string());
        }

        for recipe in &compatible {
            if skipped.iter().any(|s| recipe.is_named(s)) {
                reporter.recipe_skipped(recipe).await?;
            }
        }

        let mut bundler = Bundler::new(compatible.clone()).with_skipped(&skipped);
        let mut bundle_installer = BundleInstaller::new(
            manifest.clone(),
            self.executor,
            self.validator,
            RecipeVarProvider::new(self.auth),
            self.prompter,
            self.shutdown.clone(),
            self.context.assume_yes,
        );
        bundle_installer.assume_installed(skipped.iter().cloned());

        let mut core = bundler.create_core_bundle()?;
        if let Err(e) = bundle_installer.install_bundle(&mut core, &mut reporter).await {
            reporter.install_complete().await?;
            return Err(e);
        }

        if self.context.skip_integrations {
            for recipe in &compatible {
                if !recipe.is_core() && !skipped.iter().any(|s| recipe.is_named(s)) {
                    reporter.recipe_skipped(recipe).await?;
                }
            }
        } else if self.context.recipes_provided() {
            let file_fetcher = RecipeFileFetcher::new();
            let mut file_recipes = Vec::new();
            for path in &self.context.recipe_paths {
                file_recipes.push(file_fetcher.fetch(path).await?);
            }

            // A requested recipe the catalog knows but this host cannot run
            // is reported unsupported, not treated as a typo
            let mut names: Vec<String> = Vec::new();
            for name in &self.context.recipe_names {
                if compatible.iter().any(|r| r.is_named(name)) {
                    names.push(name.clone());
                } else if let Some(recipe) = repository.find_any_by_name(name).await? {
                    reporter
                        .recipe_unsupported(
                            &recipe,
                            Some(format!(
                                "recipe {} is not supported on {} {}",
                                recipe.name, manifest.platform, manifest.platform_version
                            )),
                        )
                        .await?;
                } else {
                    return Err(Error::recipe_not_found(name));
                }
            }

            let mut bundle = bundler.create_additional_targeted_bundle(&names, file_recipes)?;
            bundle_installer
                .install_bundle(&mut bundle, &mut reporter)
                .await?;
        } else {
            let mut bundle = bundler.create_additional_guided_bundle()?;
            bundle_installer
                .install_bundle(&mut bundle, &mut reporter)
                .await?;
        }

        if self.shutdown.is_triggered() {
            reporter.install_canceled().await?;
            return Err(Error::Interrupted);
        }

        reporter.install_complete().await?;
        Ok(reporter.into_rollup())
    }
}
