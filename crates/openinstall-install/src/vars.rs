//! Recipe variable resolution
//!
//! Install scripts receive their inputs as environment variables, resolved
//! from three layers: host facts from the discovery manifest, account
//! credentials, and the recipe's declared input variables (environment
//! override, then declared default, otherwise an error).

use tracing::debug;

use openinstall_core::types::{DiscoveryManifest, Recipe, RecipeVars};
use openinstall_core::{AuthConfig, Error, Result};
use openinstall_recipes::discover_log_files;

/// Resolves the full variable set for one recipe execution
pub struct RecipeVarProvider {
    auth: AuthConfig,
}

impl RecipeVarProvider {
    pub fn new(auth: AuthConfig) -> Self {
        Self { auth }
    }

    pub fn vars(
        &self,
        recipe: &Recipe,
        manifest: &DiscoveryManifest,
        assume_yes: bool,
    ) -> Result<RecipeVars> {
        let mut vars = RecipeVars::new();

        vars.insert("HOSTNAME".to_string(), manifest.hostname.clone());
        vars.insert("OS".to_string(), manifest.os.clone());
        vars.insert("PLATFORM".to_string(), manifest.platform.clone());
        vars.insert(
            "PLATFORM_FAMILY".to_string(),
            manifest.platform_family.clone(),
        );
        vars.insert(
            "PLATFORM_VERSION".to_string(),
            manifest.platform_version.clone(),
        );
        vars.insert("KERNEL_ARCH".to_string(), manifest.kernel_arch.clone());
        vars.insert(
            "KERNEL_VERSION".to_string(),
            manifest.kernel_version.clone(),
        );

        vars.insert(
            "NEW_RELIC_LICENSE_KEY".to_string(),
            self.auth.license_key.clone(),
        );
        vars.insert(
            "NEW_RELIC_ACCOUNT_ID".to_string(),
            self.auth.account_id.to_string(),
        );
        vars.insert("NEW_RELIC_API_KEY".to_string(), self.auth.api_key.clone());
        vars.insert("NEW_RELIC_REGION".to_string(), self.auth.region.clone());

        vars.insert(
            "NEW_RELIC_ASSUME_YES".to_string(),
            assume_yes.to_string(),
        );

        if !recipe.log_match.is_empty() {
            let files = discover_log_files(recipe);
            if !files.is_empty() {
                debug!(recipe = %recipe.name, count = files.len(), "discovered log files");
                vars.insert("NR_DISCOVERED_LOG_FILES".to_string(), files.join(","));
            }
        }

        for input in &recipe.input_vars {
            let value = match std::env::var(&input.name) {
                Ok(v) => v,
                Err(_) if !input.default.is_empty() => input.default.clone(),
                Err(_) => return Err(Error::missing_config(&input.name)),
            };
            vars.insert(input.name.clone(), value);
        }

        Ok(vars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use openinstall_core::types::RecipeInputVar;

    fn provider() -> RecipeVarProvider {
        RecipeVarProvider::new(AuthConfig {
            account_id: 12345,
            api_key: "NRAK-TEST".to_string(),
            region: "US".to_string(),
            license_key: "license".to_string(),
        })
    }

    fn manifest() -> DiscoveryManifest {
        DiscoveryManifest {
            hostname: "host-1".to_string(),
            os: "linux".to_string(),
            platform: "ubuntu".to_string(),
            platform_version: "20.04".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn system_and_auth_vars_are_present() {
        let vars = provider()
            .vars(&Recipe::default(), &manifest(), false)
            .unwrap();
        assert_eq!(vars["HOSTNAME"], "host-1");
        assert_eq!(vars["PLATFORM"], "ubuntu");
        assert_eq!(vars["NEW_RELIC_ACCOUNT_ID"], "12345");
        assert_eq!(vars["NEW_RELIC_LICENSE_KEY"], "license");
        assert_eq!(vars["NEW_RELIC_ASSUME_YES"], "false");
    }

    #[test]
    fn input_var_falls_back_to_default() {
        let recipe = Recipe {
            input_vars: vec![RecipeInputVar {
                name: "OPENINSTALL_TEST_UNSET_VAR".to_string(),
                prompt: String::new(),
                default: "fallback".to_string(),
            }],
            ..Default::default()
        };
        let vars = provider().vars(&recipe, &manifest(), true).unwrap();
        assert_eq!(vars["OPENINSTALL_TEST_UNSET_VAR"], "fallback");
        assert_eq!(vars["NEW_RELIC_ASSUME_YES"], "true");
    }

    #[test]
    fn missing_input_var_without_default_errors() {
        let recipe = Recipe {
            input_vars: vec![RecipeInputVar {
                name: "OPENINSTALL_TEST_REQUIRED_VAR".to_string(),
                prompt: String::new(),
                default: String::new(),
            }],
            ..Default::default()
        };
        let err = provider().vars(&recipe, &manifest(), false).unwrap_err();
        assert!(err.to_string().contains("OPENINSTALL_TEST_REQUIRED_VAR"));
    }
}
