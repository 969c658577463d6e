//! Credential configuration
//!
//! The profile/credential storage layer lives outside this workspace; it
//! hands the orchestrator an `AuthConfig`. For standalone use the values are
//! read from the environment.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const ENV_ACCOUNT_ID: &str = "NEW_RELIC_ACCOUNT_ID";
const ENV_API_KEY: &str = "NEW_RELIC_API_KEY";
const ENV_REGION: &str = "NEW_RELIC_REGION";
const ENV_LICENSE_KEY: &str = "NEW_RELIC_LICENSE_KEY";

/// Credentials consumed by the catalog fetcher, telemetry query client, and
/// document store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub account_id: i64,
    pub api_key: String,
    pub region: String,
    pub license_key: String,
}

impl AuthConfig {
    /// Read credentials from the environment. Region defaults to `US`.
    pub fn from_env() -> Result<Self> {
        let account_id = required(ENV_ACCOUNT_ID)?
            .parse::<i64>()
            .map_err(|_| Error::missing_config(ENV_ACCOUNT_ID))?;
        let api_key = required(ENV_API_KEY)?;
        let license_key = required(ENV_LICENSE_KEY)?;
        let region = std::env::var(ENV_REGION).unwrap_or_else(|_| "US".to_string());

        Ok(Self {
            account_id,
            api_key,
            region,
            license_key,
        })
    }
}

fn required(name: &str) -> Result<String> {
    match std::env::var(name) {
        Ok(v) if !v.is_empty() => Ok(v),
        _ => Err(Error::missing_config(name)),
    }
}
