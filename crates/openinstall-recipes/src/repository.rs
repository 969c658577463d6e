//! Recipe repository
//!
//! Fetches the catalog once and narrows it to recipes compatible with the
//! discovery manifest. Compatibility uses a deliberately loose union test:
//! a recipe is compatible if any populated field of any one of its install
//! targets matches the corresponding manifest field. A stricter
//! all-fields-of-one-target reading exists; swapping it in only requires
//! replacing [`is_compatible`].

use std::sync::Arc;

use regex::Regex;
use tracing::{debug, warn};

use crate::fetcher::RecipeFetcher;
use openinstall_core::types::{DiscoveryManifest, Recipe};
use openinstall_core::Result;

/// Catalog narrowed to one host, fetched lazily and cached for the run
pub struct RecipeRepository {
    fetcher: Arc<dyn RecipeFetcher>,
    manifest: DiscoveryManifest,
    loaded: Option<Vec<Arc<Recipe>>>,
    filtered: Option<Vec<Arc<Recipe>>>,
}

impl RecipeRepository {
    pub fn new(fetcher: Arc<dyn RecipeFetcher>, manifest: DiscoveryManifest) -> Self {
        Self {
            fetcher,
            manifest,
            loaded: None,
            filtered: None,
        }
    }

    /// All catalog recipes compatible with the manifest, ordered by name.
    /// The catalog is fetched once; later calls hit the cache.
    pub async fn find_all(&mut self) -> Result<Vec<Arc<Recipe>>> {
        if let Some(filtered) = &self.filtered {
            return Ok(filtered.clone());
        }

        let loaded = match &self.loaded {
            Some(loaded) => loaded.clone(),
            None => {
                let recipes = self.fetcher.fetch_recipes().await?;
                debug!("loaded {} recipes", recipes.len());
                let recipes: Vec<Arc<Recipe>> = recipes.into_iter().map(Arc::new).collect();
                self.loaded = Some(recipes.clone());
                recipes
            }
        };

        let mut filtered: Vec<Arc<Recipe>> = loaded
            .iter()
            .filter(|r| is_compatible(r, &self.manifest))
            .cloned()
            .collect();
        filtered.sort_by(|a, b| a.name.cmp(&b.name));

        debug!(
            "{} of {} recipes are compatible with this host",
            filtered.len(),
            loaded.len()
        );
        self.filtered = Some(filtered.clone());
        Ok(filtered)
    }

    /// Case-insensitive lookup within the compatible set
    pub async fn find_by_name(&mut self, name: &str) -> Result<Option<Arc<Recipe>>> {
        let recipes = self.find_all().await?;
        Ok(recipes.into_iter().find(|r| r.is_named(name)))
    }

    /// Case-insensitive lookup across the whole catalog, compatible or not.
    /// Distinguishes a recipe this host cannot run from one that does not exist.
    pub async fn find_any_by_name(&mut self, name: &str) -> Result<Option<Arc<Recipe>>> {
        if self.loaded.is_none() {
            self.find_all().await?;
        }
        Ok(self
            .loaded
            .iter()
            .flatten()
            .find(|r| r.is_named(name))
            .cloned())
    }
}

/// The loose union compatibility test: any populated field of any install
/// target matching the manifest makes the recipe compatible. A recipe with
/// no targets applies to every host.
pub fn is_compatible(recipe: &Recipe, manifest: &DiscoveryManifest) -> bool {
    if recipe.install_targets.is_empty() {
        debug!("recipe {} has no install targets, always compatible", recipe.name);
        return true;
    }

    for target in &recipe.install_targets {
        for (field, wanted) in target.populated_fields() {
            let Some(actual) = manifest.field(field) else {
                continue;
            };
            if field_matches(actual, wanted) {
                return true;
            }
        }
    }

    false
}

/// Target field values starting with `(` are treated as regular expressions;
/// everything else compares case-insensitively.
fn field_matches(actual: &str, wanted: &str) -> bool {
    if wanted.starts_with('(') {
        match Regex::new(wanted) {
            Ok(re) => return re.is_match(actual),
            Err(e) => warn!("invalid install target pattern {:?}: {}", wanted, e),
        }
    }
    actual.eq_ignore_ascii_case(wanted)
}
