//! Recipe catalog fetchers
//!
//! The catalog lives behind an opaque fetch capability: a remote recipe
//! service in normal operation, a local directory of YAML files for
//! air-gapped hosts and tests, and explicit files or URLs for targeted
//! installs.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use openinstall_core::types::Recipe;
use openinstall_core::{AuthConfig, Error, Result};

/// Opaque catalog retrieval capability
#[async_trait]
pub trait RecipeFetcher: Send + Sync {
    /// Fetch the full recipe catalog
    async fn fetch_recipes(&self) -> Result<Vec<Recipe>>;
}

/// Wire shape of the recipe service response
#[derive(Deserialize)]
struct CatalogResponse {
    recipes: Vec<Recipe>,
}

/// Fetcher backed by the remote recipe service
pub struct ServiceRecipeFetcher {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl ServiceRecipeFetcher {
    pub fn new(endpoint: impl Into<String>, auth: &AuthConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            api_key: auth.api_key.clone(),
        }
    }
}

#[async_trait]
impl RecipeFetcher for ServiceRecipeFetcher {
    async fn fetch_recipes(&self) -> Result<Vec<Recipe>> {
        let response = self
            .client
            .get(&self.endpoint)
            .header("Api-Key", &self.api_key)
            .send()
            .await
            .map_err(|e| Error::catalog_fetch(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Error::catalog_fetch(format!(
                "recipe service returned {}",
                response.status()
            )));
        }

        let catalog: CatalogResponse = response
            .json()
            .await
            .map_err(|e| Error::catalog_fetch(e.to_string()))?;

        debug!("fetched {} recipes from service", catalog.recipes.len());
        Ok(catalog.recipes)
    }
}

/// Fetcher that loads `*.yml`/`*.yaml` recipe files under a directory
pub struct LocalRecipeFetcher {
    path: PathBuf,
}

impl LocalRecipeFetcher {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl RecipeFetcher for LocalRecipeFetcher {
    async fn fetch_recipes(&self) -> Result<Vec<Recipe>> {
        let mut recipes = Vec::new();

        for pattern in ["*.yml", "*.yaml"] {
            let full = self.path.join(pattern);
            let candidates = glob::glob(&full.to_string_lossy())
                .map_err(|e| Error::catalog_fetch(e.to_string()))?;

            for path in candidates.flatten() {
                let contents = std::fs::read_to_string(&path)?;
                match serde_yaml_ng::from_str::<Recipe>(&contents) {
                    Ok(recipe) => recipes.push(recipe),
                    Err(e) => warn!("skipping invalid recipe file {}: {}", path.display(), e),
                }
            }
        }

        if recipes.is_empty() {
            return Err(Error::catalog_fetch(format!(
                "no recipe files found under {}",
                self.path.display()
            )));
        }

        debug!(
            "loaded {} recipes from {}",
            recipes.len(),
            self.path.display()
        );
        Ok(recipes)
    }
}

/// Loads one recipe from an explicit file path or HTTP(S) URL, for targeted
/// installs that bypass the catalog.
pub struct RecipeFileFetcher {
    client: reqwest::Client,
}

impl Default for RecipeFileFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl RecipeFileFetcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    pub async fn fetch(&self, path_or_url: &str) -> Result<Recipe> {
        if let Ok(parsed) = Url::parse(path_or_url) {
            if matches!(parsed.scheme(), "http" | "https") {
                return self.fetch_url(parsed).await;
            }
        }
        self.load_file(path_or_url)
    }

    async fn fetch_url(&self, url: Url) -> Result<Recipe> {
        let body = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| Error::catalog_fetch(format!("could not fetch {}: {}", url, e)))?
            .text()
            .await
            .map_err(|e| Error::catalog_fetch(format!("could not read {}: {}", url, e)))?;

        serde_yaml_ng::from_str(&body)
            .map_err(|e| Error::catalog_fetch(format!("invalid recipe at {}: {}", url, e)))
    }

    fn load_file(&self, path: &str) -> Result<Recipe> {
        let contents = std::fs::read_to_string(path)?;
        serde_yaml_ng::from_str(&contents)
            .map_err(|e| Error::catalog_fetch(format!("invalid recipe file {}: {}", path, e)))
    }
}
