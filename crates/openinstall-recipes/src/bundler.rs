//! Recipe bundling
//!
//! Partitions the compatible catalog into a core bundle (infrastructure
//! agent, logging, golden recipe) and an additional bundle, pulling each
//! recipe's declared dependencies in ahead of it. One `Bundler` instance
//! tracks every name it has already placed, so a recipe appears in at most
//! one bundle per run.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use crate::bundle::{Bundle, BundleKind, BundleRecipe};
use openinstall_core::types::{Recipe, CORE_RECIPE_NAMES};
use openinstall_core::{Error, Result};

/// Builds bundles from an arena of immutable compatible recipes
pub struct Bundler {
    catalog: Vec<Arc<Recipe>>,
    /// Lowercased names already placed in any bundle built by this instance
    bundled: HashSet<String>,
    /// Lowercased names excluded by skip flags; never bundled, and treated
    /// as already satisfied when they appear as dependencies
    skipped: HashSet<String>,
}

impl Bundler {
    pub fn new(catalog: Vec<Arc<Recipe>>) -> Self {
        Self {
            catalog,
            bundled: HashSet::new(),
            skipped: HashSet::new(),
        }
    }

    pub fn with_skipped<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.skipped = names
            .into_iter()
            .map(|n| n.as_ref().to_ascii_lowercase())
            .collect();
        self
    }

    /// The fixed core bundle. Core recipes missing from the compatible
    /// catalog are simply absent; an empty core bundle is a valid outcome.
    pub fn create_core_bundle(&mut self) -> Result<Bundle> {
        let mut bundle = Bundle::new(BundleKind::Core);

        for name in CORE_RECIPE_NAMES {
            if self.is_skipped(name) {
                continue;
            }
            if let Some(recipe) = self.find(name) {
                self.add_with_dependencies(recipe, &mut bundle, &mut Vec::new())?;
            } else {
                debug!("core recipe {} not in compatible catalog", name);
            }
        }

        Ok(bundle)
    }

    /// Everything compatible that is not core and not already bundled,
    /// flagged for the pre-install confirmation prompt.
    pub fn create_additional_guided_bundle(&mut self) -> Result<Bundle> {
        let mut bundle = Bundle::new(BundleKind::AdditionalGuided);

        for recipe in self.catalog.clone() {
            if recipe.is_core() || self.is_skipped(&recipe.name) {
                continue;
            }
            self.add_with_dependencies(recipe, &mut bundle, &mut Vec::new())?;
        }

        Ok(bundle)
    }

    /// Exactly the named recipes (plus resolved dependencies). Recipes
    /// loaded from explicit files or URLs join the arena first so names can
    /// depend on them and vice versa.
    pub fn create_additional_targeted_bundle(
        &mut self,
        names: &[String],
        file_recipes: Vec<Recipe>,
    ) -> Result<Bundle> {
        let mut bundle = Bundle::new(BundleKind::AdditionalTargeted);

        let mut roots: Vec<Arc<Recipe>> = Vec::new();
        for recipe in file_recipes {
            let recipe = Arc::new(recipe);
            self.catalog.push(recipe.clone());
            roots.push(recipe);
        }

        for name in names {
            let recipe = self
                .find(name)
                .ok_or_else(|| Error::recipe_not_found(name))?;
            roots.push(recipe);
        }

        for recipe in roots {
            self.add_with_dependencies(recipe, &mut bundle, &mut Vec::new())?;
        }

        Ok(bundle)
    }

    fn find(&self, name: &str) -> Option<Arc<Recipe>> {
        self.catalog.iter().find(|r| r.is_named(name)).cloned()
    }

    fn is_skipped(&self, name: &str) -> bool {
        self.skipped.contains(&name.to_ascii_lowercase())
    }

    /// Depth-first, post-order: dependencies land in the bundle before the
    /// recipe that needs them. `visiting` is the active walk path, used for
    /// cycle detection.
    fn add_with_dependencies(
        &mut self,
        recipe: Arc<Recipe>,
        bundle: &mut Bundle,
        visiting: &mut Vec<String>,
    ) -> Result<()> {
        let key = recipe.name.to_ascii_lowercase();

        if visiting.contains(&key) {
            let mut cycle = visiting.clone();
            cycle.push(key);
            return Err(Error::dependency_cycle(&cycle));
        }
        if self.bundled.contains(&key) {
            return Ok(());
        }

        visiting.push(key.clone());
        for dependency in &recipe.dependencies {
            if self.is_skipped(dependency) || self.bundled.contains(&dependency.to_ascii_lowercase())
            {
                continue;
            }
            let resolved = self.find(dependency).ok_or_else(|| {
                Error::unresolved_dependency(recipe.name.clone(), dependency.clone())
            })?;
            self.add_with_dependencies(resolved, bundle, visiting)?;
        }
        visiting.pop();

        self.bundled.insert(key);
        debug!(
            "bundled recipe {} into {} bundle",
            recipe.name, bundle.kind
        );
        bundle.add_recipe(BundleRecipe::new(recipe));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use openinstall_core::types::{GOLDEN_RECIPE_NAME, INFRA_AGENT_RECIPE_NAME, LOGGING_RECIPE_NAME};

    fn recipe(name: &str, deps: &[&str]) -> Arc<Recipe> {
        Arc::new(Recipe {
            name: name.to_string(),
            dependencies: deps.iter().map(|d| d.to_string()).collect(),
            ..Default::default()
        })
    }

    fn names(bundle: &Bundle) -> Vec<&str> {
        bundle.recipes().iter().map(|br| br.name()).collect()
    }

    #[test]
    fn core_bundle_selects_fixed_names_in_order() {
        let mut bundler = Bundler::new(vec![
            recipe("mysql", &[]),
            recipe(LOGGING_RECIPE_NAME, &[INFRA_AGENT_RECIPE_NAME]),
            recipe(INFRA_AGENT_RECIPE_NAME, &[]),
        ]);

        let core = bundler.create_core_bundle().unwrap();
        assert_eq!(names(&core), vec![INFRA_AGENT_RECIPE_NAME, LOGGING_RECIPE_NAME]);
    }

    #[test]
    fn dependencies_precede_dependents() {
        let mut bundler = Bundler::new(vec![
            recipe("c", &["b"]),
            recipe("b", &["a"]),
            recipe("a", &[]),
        ]);

        let bundle = bundler.create_additional_guided_bundle().unwrap();
        for (dependent, dependency) in [("c", "b"), ("b", "a")] {
            let dep_idx = bundle.index_of(dependency).unwrap();
            let rec_idx = bundle.index_of(dependent).unwrap();
            assert!(dep_idx < rec_idx, "{} must precede {}", dependency, dependent);
        }
    }

    #[test]
    fn diamond_dependencies_appear_once() {
        let mut bundler = Bundler::new(vec![
            recipe("d", &["b", "c"]),
            recipe("b", &["a"]),
            recipe("c", &["a"]),
            recipe("a", &[]),
        ]);

        let bundle = bundler.create_additional_guided_bundle().unwrap();
        let order = names(&bundle);
        assert_eq!(order.iter().filter(|n| **n == "a").count(), 1);
        assert_eq!(order.len(), 4);
    }

    #[test]
    fn cycles_are_rejected() {
        let mut bundler = Bundler::new(vec![recipe("a", &["b"]), recipe("b", &["a"])]);

        let err = bundler.create_additional_guided_bundle().unwrap_err();
        assert!(matches!(err, Error::DependencyCycle { .. }));
        assert!(err.to_string().contains("a -> b -> a"));
    }

    #[test]
    fn self_dependency_is_a_cycle() {
        let mut bundler = Bundler::new(vec![recipe("a", &["a"])]);
        let err = bundler.create_additional_guided_bundle().unwrap_err();
        assert!(matches!(err, Error::DependencyCycle { .. }));
    }

    #[test]
    fn unresolved_dependency_is_an_error() {
        let mut bundler = Bundler::new(vec![recipe("mysql", &["missing-agent"])]);
        let err = bundler.create_additional_guided_bundle().unwrap_err();
        assert!(matches!(err, Error::UnresolvedDependency { .. }));
        assert!(err.to_string().contains("missing-agent"));
    }

    #[test]
    fn recipes_bundled_once_across_bundles() {
        let mut bundler = Bundler::new(vec![
            recipe(INFRA_AGENT_RECIPE_NAME, &[]),
            recipe("mysql", &[INFRA_AGENT_RECIPE_NAME]),
        ]);

        let core = bundler.create_core_bundle().unwrap();
        let additional = bundler.create_additional_guided_bundle().unwrap();

        assert_eq!(names(&core), vec![INFRA_AGENT_RECIPE_NAME]);
        // infra already lives in the core bundle, so the additional bundle
        // holds only mysql even though mysql depends on infra
        assert_eq!(names(&additional), vec!["mysql"]);
    }

    #[test]
    fn targeted_bundle_contains_exactly_named_recipes_plus_deps() {
        let mut bundler = Bundler::new(vec![
            recipe(INFRA_AGENT_RECIPE_NAME, &[]),
            recipe("mysql", &[INFRA_AGENT_RECIPE_NAME]),
            recipe("nginx", &[]),
        ]);

        let bundle = bundler
            .create_additional_targeted_bundle(&["mysql".to_string()], vec![])
            .unwrap();
        assert_eq!(names(&bundle), vec![INFRA_AGENT_RECIPE_NAME, "mysql"]);
        assert_eq!(bundle.kind, BundleKind::AdditionalTargeted);
    }

    #[test]
    fn targeted_bundle_errors_on_unknown_name() {
        let mut bundler = Bundler::new(vec![recipe("mysql", &[])]);
        let err = bundler
            .create_additional_targeted_bundle(&["nope".to_string()], vec![])
            .unwrap_err();
        assert!(matches!(err, Error::RecipeNotFound { .. }));
    }

    #[test]
    fn file_recipes_join_the_targeted_bundle() {
        let mut bundler = Bundler::new(vec![recipe(INFRA_AGENT_RECIPE_NAME, &[])]);

        let custom = Recipe {
            name: "custom".to_string(),
            dependencies: vec![INFRA_AGENT_RECIPE_NAME.to_string()],
            ..Default::default()
        };
        let bundle = bundler
            .create_additional_targeted_bundle(&[], vec![custom])
            .unwrap();
        assert_eq!(names(&bundle), vec![INFRA_AGENT_RECIPE_NAME, "custom"]);
    }

    #[test]
    fn skipped_names_are_excluded_and_satisfy_dependents() {
        let mut bundler = Bundler::new(vec![
            recipe(INFRA_AGENT_RECIPE_NAME, &[]),
            recipe(LOGGING_RECIPE_NAME, &[INFRA_AGENT_RECIPE_NAME]),
            recipe(GOLDEN_RECIPE_NAME, &[]),
        ])
        .with_skipped([LOGGING_RECIPE_NAME]);

        let core = bundler.create_core_bundle().unwrap();
        assert_eq!(names(&core), vec![INFRA_AGENT_RECIPE_NAME, GOLDEN_RECIPE_NAME]);
    }
}
