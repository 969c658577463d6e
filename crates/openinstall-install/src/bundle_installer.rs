//! Bundle installation
//!
//! Drives one bundle at a time through detect, confirm, execute, validate.
//! The bundle's kind decides the failure policy: core bundles abort on the
//! first failure, additional bundles record the failure and keep going.
//! Installed names accumulate across bundles so later bundles can satisfy
//! their dependencies from earlier ones.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use openinstall_core::types::{DiscoveryManifest, Recipe, RecipeStatusKind};
use openinstall_core::{Error, Result};
use openinstall_recipes::Bundle;

use crate::executor::RecipeExecutor;
use crate::prompt::Prompter;
use crate::shutdown::ShutdownSignal;
use crate::status::StatusReporter;
use crate::validator::RecipeValidator;
use crate::vars::RecipeVarProvider;

/// Installs bundles, accumulating installed and failed recipe names across
/// calls within one run.
pub struct BundleInstaller {
    manifest: DiscoveryManifest,
    executor: Arc<dyn RecipeExecutor>,
    validator: Arc<dyn RecipeValidator>,
    var_provider: RecipeVarProvider,
    prompter: Arc<dyn Prompter>,
    shutdown: ShutdownSignal,
    assume_yes: bool,
    installed: HashSet<String>,
    failed: HashMap<String, String>,
    /// Names treated as already satisfied for dependency purposes, without
    /// ever being installed (skip flags).
    assume_installed: HashSet<String>,
}

impl BundleInstaller {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        manifest: DiscoveryManifest,
        executor: Arc<dyn RecipeExecutor>,
        validator: Arc<dyn RecipeValidator>,
        var_provider: RecipeVarProvider,
        prompter: Arc<dyn Prompter>,
        shutdown: ShutdownSignal,
        assume_yes: bool,
    ) -> Self {
        Self {
            manifest,
            executor,
            validator,
            var_provider,
            prompter,
            shutdown,
            assume_yes,
            installed: HashSet::new(),
            failed: HashMap::new(),
            assume_installed: HashSet::new(),
        }
    }

    /// Treat these names as satisfied dependencies without installing them
    pub fn assume_installed(&mut self, names: impl IntoIterator<Item = String>) {
        self.assume_installed
            .extend(names.into_iter().map(|n| n.to_ascii_lowercase()));
    }

    pub fn installed_names(&self) -> &HashSet<String> {
        &self.installed
    }

    /// Install every recipe in the bundle under its failure policy.
    ///
    /// Continue-on-error bundles return `Ok` even when individual recipes
    /// fail; their failures live in the status rollup.
    pub async fn install_bundle(
        &mut self,
        bundle: &mut Bundle,
        reporter: &mut StatusReporter,
    ) -> Result<()> {
        if bundle.is_empty() {
            debug!(kind = %bundle.kind, "bundle is empty, nothing to install");
            return Ok(());
        }

        info!(kind = %bundle.kind, recipes = bundle.len(), "installing bundle");

        for br in bundle.recipes_mut() {
            if is_detected(&self.manifest, &br.recipe) {
                br.add_status(RecipeStatusKind::Detected);
                reporter.recipe_detected(&br.recipe).await?;
            }
            br.add_status(RecipeStatusKind::Available);
            reporter.recipe_available(&br.recipe).await?;
        }

        if bundle.kind.should_prompt() && !self.assume_yes {
            let names: Vec<&str> = bundle.recipes().iter().map(|br| br.name()).collect();
            let message = format!("Install additional integrations? [{}]", names.join(", "));
            if !self.prompter.confirm(&message) {
                for br in bundle.recipes_mut() {
                    br.add_status(RecipeStatusKind::Skipped);
                }
                for recipe in bundle
                    .recipes()
                    .iter()
                    .map(|br| Arc::clone(&br.recipe))
                    .collect::<Vec<_>>()
                {
                    reporter.recipe_skipped(&recipe).await?;
                }
                return Ok(());
            }
        }

        let stop_on_error = bundle.kind.stop_on_error();

        for i in 0..bundle.len() {
            let recipe = Arc::clone(&bundle.recipes()[i].recipe);

            if self.shutdown.is_triggered() {
                bundle.recipes_mut()[i].add_status(RecipeStatusKind::Canceled);
                reporter.recipe_canceled(&recipe).await?;
                continue;
            }

            match self.install_recipe(&recipe, reporter).await {
                Ok(InstallOutcome::Installed) => {
                    bundle.recipes_mut()[i].add_status(RecipeStatusKind::Installed);
                }
                Ok(InstallOutcome::Canceled) => {
                    bundle.recipes_mut()[i].add_status(RecipeStatusKind::Canceled);
                }
                Ok(InstallOutcome::Failed(failure)) => {
                    bundle.recipes_mut()[i].add_status(RecipeStatusKind::Failed);
                    if stop_on_error {
                        return Err(failure);
                    }
                }
                Err(e) => return Err(e),
            }
        }

        Ok(())
    }

    /// Install one recipe: dependencies, vars, execute, validate. A failure
    /// is an outcome here, not an error; errors are reserved for reporting
    /// failures that must abort the run.
    async fn install_recipe(
        &mut self,
        recipe: &Recipe,
        reporter: &mut StatusReporter,
    ) -> Result<InstallOutcome> {
        for dep in &recipe.dependencies {
            if !self.is_satisfied(dep) {
                let detail = if self.failed.contains_key(dep) {
                    format!("dependency {dep} failed to install")
                } else {
                    format!("dependency {dep} was not installed")
                };
                let failure = Error::execution(&recipe.name, detail);
                return self.record_failure(recipe, failure, reporter).await;
            }
        }

        reporter.recipe_installing(recipe).await?;

        let vars = match self
            .var_provider
            .vars(recipe, &self.manifest, self.assume_yes)
        {
            Ok(vars) => vars,
            Err(e) => return self.record_failure(recipe, e, reporter).await,
        };

        if let Err(e) = self.executor.execute(recipe, &vars).await {
            return self.record_failure(recipe, e, reporter).await;
        }

        let started = Instant::now();
        let validation = match self
            .validator
            .validate(recipe, &self.manifest, self.shutdown.clone())
            .await
        {
            Ok(validation) => validation,
            Err(e) => return self.record_failure(recipe, e, reporter).await,
        };
        let duration_ms = started.elapsed().as_millis() as i64;

        if !validation.confirmed {
            if self.shutdown.is_triggered() {
                reporter.recipe_canceled(recipe).await?;
                return Ok(InstallOutcome::Canceled);
            }
            let failure = Error::execution(
                &recipe.name,
                "telemetry was not confirmed within the attempt budget",
            );
            return self.record_failure(recipe, failure, reporter).await;
        }

        self.installed.insert(recipe.name.to_ascii_lowercase());
        reporter
            .recipe_installed(recipe, duration_ms, validation.entity_guid)
            .await?;
        Ok(InstallOutcome::Installed)
    }

    async fn record_failure(
        &mut self,
        recipe: &Recipe,
        failure: Error,
        reporter: &mut StatusReporter,
    ) -> Result<InstallOutcome> {
        let message = failure.to_string();
        self.failed.insert(recipe.name.clone(), message.clone());
        reporter.recipe_failed(recipe, message).await?;
        Ok(InstallOutcome::Failed(failure))
    }

    fn is_satisfied(&self, dependency: &str) -> bool {
        let key = dependency.to_ascii_lowercase();
        self.installed.contains(&key) || self.assume_installed.contains(&key)
    }
}

enum InstallOutcome {
    Installed,
    Canceled,
    Failed(Error),
}

/// Process-match evidence: any of the recipe's patterns matched a running
/// process during discovery.
fn is_detected(manifest: &DiscoveryManifest, recipe: &Recipe) -> bool {
    manifest
        .matched_processes
        .iter()
        .any(|mp| recipe.process_match.contains(&mp.matching_pattern))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::test_support::FixedPrompter;
    use crate::validator::Validation;
    use async_trait::async_trait;
    use openinstall_core::types::{MatchedProcess, RecipeVars};
    use openinstall_core::AuthConfig;
    use openinstall_recipes::{BundleKind, BundleRecipe};
    use std::sync::Mutex;

    /// Records execution order; fails recipes listed in `fail`
    struct ScriptedExecutor {
        executed: Mutex<Vec<String>>,
        fail: Vec<String>,
    }

    impl ScriptedExecutor {
        fn new(fail: &[&str]) -> Self {
            Self {
                executed: Mutex::new(Vec::new()),
                fail: fail.iter().map(|s| s.to_string()).collect(),
            }
        }

        fn executed(&self) -> Vec<String> {
            self.executed.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl RecipeExecutor for ScriptedExecutor {
        async fn execute(&self, recipe: &Recipe, _vars: &RecipeVars) -> Result<()> {
            self.executed.lock().unwrap().push(recipe.name.clone());
            if self.fail.contains(&recipe.name) {
                return Err(Error::execution(&recipe.name, "install script exited with status 1"));
            }
            Ok(())
        }
    }

    /// Confirms everything, optionally leaving named recipes unconfirmed
    struct ScriptedValidator {
        unconfirmed: Vec<String>,
    }

    #[async_trait]
    impl RecipeValidator for ScriptedValidator {
        async fn validate(
            &self,
            recipe: &Recipe,
            _manifest: &DiscoveryManifest,
            _shutdown: ShutdownSignal,
        ) -> Result<Validation> {
            if self.unconfirmed.contains(&recipe.name) {
                return Ok(Validation {
                    confirmed: false,
                    entity_guid: None,
                });
            }
            Ok(Validation {
                confirmed: true,
                entity_guid: Some(format!("GUID-{}", recipe.name)),
            })
        }
    }

    fn recipe(name: &str, dependencies: &[&str]) -> Arc<Recipe> {
        Arc::new(Recipe {
            name: name.to_string(),
            display_name: name.to_uppercase(),
            dependencies: dependencies.iter().map(|s| s.to_string()).collect(),
            install: "true".to_string(),
            ..Default::default()
        })
    }

    fn bundle_of(kind: BundleKind, recipes: &[Arc<Recipe>]) -> Bundle {
        let mut bundle = Bundle::new(kind);
        for r in recipes {
            bundle.add_recipe(BundleRecipe::new(Arc::clone(r)));
        }
        bundle
    }

    fn installer(
        executor: Arc<ScriptedExecutor>,
        validator: Arc<ScriptedValidator>,
        prompter: Arc<FixedPrompter>,
        assume_yes: bool,
    ) -> BundleInstaller {
        let auth = AuthConfig {
            account_id: 1,
            api_key: "key".to_string(),
            region: "US".to_string(),
            license_key: "license".to_string(),
        };
        BundleInstaller::new(
            DiscoveryManifest {
                hostname: "host-1".to_string(),
                ..Default::default()
            },
            executor,
            validator,
            RecipeVarProvider::new(auth),
            prompter,
            ShutdownSignal::never(),
            assume_yes,
        )
    }

    fn confirming_validator() -> Arc<ScriptedValidator> {
        Arc::new(ScriptedValidator {
            unconfirmed: vec![],
        })
    }

    #[tokio::test]
    async fn core_bundle_stops_at_first_failure() {
        let executor = Arc::new(ScriptedExecutor::new(&["logging"]));
        let mut installer = installer(
            executor.clone(),
            confirming_validator(),
            Arc::new(FixedPrompter::new(true)),
            true,
        );
        let mut reporter = StatusReporter::new(vec![]);

        let mut bundle = bundle_of(
            BundleKind::Core,
            &[recipe("infra", &[]), recipe("logging", &[]), recipe("golden", &[])],
        );

        let err = installer.install_bundle(&mut bundle, &mut reporter).await;
        let message = err.unwrap_err().to_string();
        // Surfaces the executor's error as-is, without wrapping it again
        assert_eq!(message.matches("Execution failed").count(), 1);
        assert!(message.contains("install script exited with status 1"));

        // The recipe after the failure never ran
        assert_eq!(executor.executed(), vec!["infra", "logging"]);
        assert_eq!(
            reporter.rollup().status_of("infra"),
            Some(RecipeStatusKind::Installed)
        );
        assert_eq!(
            reporter.rollup().status_of("logging"),
            Some(RecipeStatusKind::Failed)
        );
        assert_eq!(
            reporter.rollup().status_of("golden"),
            Some(RecipeStatusKind::Available)
        );
    }

    #[tokio::test]
    async fn additional_bundle_continues_past_failures() {
        let executor = Arc::new(ScriptedExecutor::new(&["mysql"]));
        let mut installer = installer(
            executor.clone(),
            confirming_validator(),
            Arc::new(FixedPrompter::new(true)),
            true,
        );
        let mut reporter = StatusReporter::new(vec![]);

        let mut bundle = bundle_of(
            BundleKind::AdditionalTargeted,
            &[recipe("mysql", &[]), recipe("nginx", &[])],
        );

        installer
            .install_bundle(&mut bundle, &mut reporter)
            .await
            .unwrap();

        assert_eq!(executor.executed(), vec!["mysql", "nginx"]);
        assert_eq!(
            reporter.rollup().status_of("mysql"),
            Some(RecipeStatusKind::Failed)
        );
        assert_eq!(
            reporter.rollup().status_of("nginx"),
            Some(RecipeStatusKind::Installed)
        );
    }

    #[tokio::test]
    async fn dependent_of_a_failed_recipe_reports_the_failure() {
        let executor = Arc::new(ScriptedExecutor::new(&["mysql"]));
        let mut installer = installer(
            executor.clone(),
            confirming_validator(),
            Arc::new(FixedPrompter::new(true)),
            true,
        );
        let mut reporter = StatusReporter::new(vec![]);

        let mut bundle = bundle_of(
            BundleKind::AdditionalTargeted,
            &[recipe("mysql", &[]), recipe("dashboards", &["mysql"])],
        );

        installer
            .install_bundle(&mut bundle, &mut reporter)
            .await
            .unwrap();

        // The dependent never runs, and its error names the failed dependency
        assert_eq!(executor.executed(), vec!["mysql"]);
        let rs = reporter
            .rollup()
            .recipe_statuses
            .iter()
            .find(|rs| rs.name == "dashboards")
            .unwrap();
        assert_eq!(rs.status, RecipeStatusKind::Failed);
        assert!(rs.errors[0].contains("dependency mysql failed to install"));
    }

    #[tokio::test]
    async fn unsatisfied_dependency_fails_without_executing() {
        let executor = Arc::new(ScriptedExecutor::new(&[]));
        let mut installer = installer(
            executor.clone(),
            confirming_validator(),
            Arc::new(FixedPrompter::new(true)),
            true,
        );
        let mut reporter = StatusReporter::new(vec![]);

        let mut bundle = bundle_of(
            BundleKind::AdditionalTargeted,
            &[recipe("mysql", &["infra"])],
        );

        installer
            .install_bundle(&mut bundle, &mut reporter)
            .await
            .unwrap();

        assert!(executor.executed().is_empty());
        let rs = &reporter.rollup().recipe_statuses[0];
        assert_eq!(rs.status, RecipeStatusKind::Failed);
        assert!(rs.errors[0].contains("dependency infra was not installed"));
    }

    #[tokio::test]
    async fn dependency_satisfied_by_earlier_bundle() {
        let executor = Arc::new(ScriptedExecutor::new(&[]));
        let mut installer = installer(
            executor.clone(),
            confirming_validator(),
            Arc::new(FixedPrompter::new(true)),
            true,
        );
        let mut reporter = StatusReporter::new(vec![]);

        let mut core = bundle_of(BundleKind::Core, &[recipe("infra", &[])]);
        installer
            .install_bundle(&mut core, &mut reporter)
            .await
            .unwrap();

        let mut additional = bundle_of(
            BundleKind::AdditionalTargeted,
            &[recipe("mysql", &["infra"])],
        );
        installer
            .install_bundle(&mut additional, &mut reporter)
            .await
            .unwrap();

        assert_eq!(executor.executed(), vec!["infra", "mysql"]);
        assert_eq!(
            reporter.rollup().status_of("mysql"),
            Some(RecipeStatusKind::Installed)
        );
    }

    #[tokio::test]
    async fn skipped_dependency_is_treated_as_satisfied() {
        let executor = Arc::new(ScriptedExecutor::new(&[]));
        let mut installer = installer(
            executor.clone(),
            confirming_validator(),
            Arc::new(FixedPrompter::new(true)),
            true,
        );
        installer.assume_installed(vec!["infrastructure-agent-installer".to_string()]);
        let mut reporter = StatusReporter::new(vec![]);

        let mut bundle = bundle_of(
            BundleKind::AdditionalTargeted,
            &[recipe("mysql", &["infrastructure-agent-installer"])],
        );

        installer
            .install_bundle(&mut bundle, &mut reporter)
            .await
            .unwrap();

        assert_eq!(executor.executed(), vec!["mysql"]);
        assert_eq!(
            reporter.rollup().status_of("mysql"),
            Some(RecipeStatusKind::Installed)
        );
    }

    #[tokio::test]
    async fn declined_guided_prompt_skips_the_whole_bundle() {
        let executor = Arc::new(ScriptedExecutor::new(&[]));
        let prompter = Arc::new(FixedPrompter::new(false));
        let mut installer = installer(
            executor.clone(),
            confirming_validator(),
            prompter.clone(),
            false,
        );
        let mut reporter = StatusReporter::new(vec![]);

        let mut bundle = bundle_of(
            BundleKind::AdditionalGuided,
            &[recipe("mysql", &[]), recipe("nginx", &[])],
        );

        installer
            .install_bundle(&mut bundle, &mut reporter)
            .await
            .unwrap();

        assert_eq!(prompter.calls(), 1);
        assert!(executor.executed().is_empty());
        assert_eq!(
            reporter.rollup().status_of("mysql"),
            Some(RecipeStatusKind::Skipped)
        );
        assert_eq!(
            reporter.rollup().status_of("nginx"),
            Some(RecipeStatusKind::Skipped)
        );
    }

    #[tokio::test]
    async fn assume_yes_bypasses_the_guided_prompt() {
        let executor = Arc::new(ScriptedExecutor::new(&[]));
        let prompter = Arc::new(FixedPrompter::new(false));
        let mut installer = installer(
            executor.clone(),
            confirming_validator(),
            prompter.clone(),
            true,
        );
        let mut reporter = StatusReporter::new(vec![]);

        let mut bundle = bundle_of(BundleKind::AdditionalGuided, &[recipe("mysql", &[])]);
        installer
            .install_bundle(&mut bundle, &mut reporter)
            .await
            .unwrap();

        assert_eq!(prompter.calls(), 0);
        assert_eq!(executor.executed(), vec!["mysql"]);
    }

    #[tokio::test]
    async fn unconfirmed_validation_is_a_failure() {
        let executor = Arc::new(ScriptedExecutor::new(&[]));
        let validator = Arc::new(ScriptedValidator {
            unconfirmed: vec!["mysql".to_string()],
        });
        let mut installer = installer(
            executor.clone(),
            validator,
            Arc::new(FixedPrompter::new(true)),
            true,
        );
        let mut reporter = StatusReporter::new(vec![]);

        let mut bundle = bundle_of(BundleKind::AdditionalTargeted, &[recipe("mysql", &[])]);
        installer
            .install_bundle(&mut bundle, &mut reporter)
            .await
            .unwrap();

        let rs = &reporter.rollup().recipe_statuses[0];
        assert_eq!(rs.status, RecipeStatusKind::Failed);
        assert!(rs.errors[0].contains("telemetry was not confirmed"));
    }

    #[tokio::test]
    async fn installed_recipe_records_its_entity_guid() {
        let executor = Arc::new(ScriptedExecutor::new(&[]));
        let mut installer = installer(
            executor,
            confirming_validator(),
            Arc::new(FixedPrompter::new(true)),
            true,
        );
        let mut reporter = StatusReporter::new(vec![]);

        let mut bundle = bundle_of(BundleKind::Core, &[recipe("infra", &[])]);
        installer
            .install_bundle(&mut bundle, &mut reporter)
            .await
            .unwrap();

        assert_eq!(reporter.rollup().entity_guids, vec!["GUID-infra"]);
    }

    #[tokio::test]
    async fn triggered_shutdown_cancels_pending_recipes() {
        let executor = Arc::new(ScriptedExecutor::new(&[]));
        let auth = AuthConfig {
            account_id: 1,
            api_key: "key".to_string(),
            region: "US".to_string(),
            license_key: "license".to_string(),
        };
        let (handle, signal) = crate::shutdown::shutdown_channel();
        let mut installer = BundleInstaller::new(
            DiscoveryManifest::default(),
            executor.clone(),
            confirming_validator(),
            RecipeVarProvider::new(auth),
            Arc::new(FixedPrompter::new(true)),
            signal,
            true,
        );
        handle.trigger();
        let mut reporter = StatusReporter::new(vec![]);

        let mut bundle = bundle_of(
            BundleKind::AdditionalTargeted,
            &[recipe("mysql", &[]), recipe("nginx", &[])],
        );
        installer
            .install_bundle(&mut bundle, &mut reporter)
            .await
            .unwrap();

        assert!(executor.executed().is_empty());
        assert_eq!(
            reporter.rollup().status_of("mysql"),
            Some(RecipeStatusKind::Canceled)
        );
        assert_eq!(
            reporter.rollup().status_of("nginx"),
            Some(RecipeStatusKind::Canceled)
        );
    }

    #[tokio::test]
    async fn process_match_evidence_reports_detected_first() {
        let executor = Arc::new(ScriptedExecutor::new(&[]));
        let auth = AuthConfig {
            account_id: 1,
            api_key: "key".to_string(),
            region: "US".to_string(),
            license_key: "license".to_string(),
        };
        let manifest = DiscoveryManifest {
            hostname: "host-1".to_string(),
            matched_processes: vec![MatchedProcess {
                command: "/usr/sbin/mysqld --datadir=/var/lib/mysql".to_string(),
                matching_pattern: "mysqld".to_string(),
            }],
            ..Default::default()
        };
        let mut installer = BundleInstaller::new(
            manifest,
            executor,
            confirming_validator(),
            RecipeVarProvider::new(auth),
            Arc::new(FixedPrompter::new(true)),
            ShutdownSignal::never(),
            true,
        );
        let mut reporter = StatusReporter::new(vec![]);

        let mysql = Arc::new(Recipe {
            name: "mysql".to_string(),
            process_match: vec!["mysqld".to_string()],
            install: "true".to_string(),
            ..Default::default()
        });
        let mut bundle = bundle_of(BundleKind::AdditionalTargeted, &[mysql]);
        installer
            .install_bundle(&mut bundle, &mut reporter)
            .await
            .unwrap();

        let events: Vec<_> = reporter
            .rollup()
            .events
            .iter()
            .map(|e| e.status)
            .collect();
        assert_eq!(events[0], RecipeStatusKind::Detected);
        assert_eq!(events[1], RecipeStatusKind::Available);
        assert_eq!(*events.last().unwrap(), RecipeStatusKind::Installed);
    }
}
