//! Telemetry query client
//!
//! Recipes confirm themselves by querying for the data they should have
//! started reporting. The client speaks NerdGraph: an NRQL string goes in,
//! the rows of the result set come back as loose JSON values.

use async_trait::async_trait;
use serde_json::{json, Value};

use openinstall_core::AuthConfig;

/// A query attempt that failed at the transport or API layer.
///
/// Distinct from an empty result set, which is a well-formed answer
/// meaning "no data yet".
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct QueryError(pub String);

/// Executes telemetry queries against an account
#[async_trait]
pub trait TelemetryClient: Send + Sync {
    async fn query(&self, account_id: i64, nrql: &str) -> Result<Vec<Value>, QueryError>;
}

/// NerdGraph-backed client
pub struct NerdGraphTelemetryClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl NerdGraphTelemetryClient {
    pub fn new(auth: &AuthConfig) -> Self {
        let endpoint = match auth.region.to_ascii_uppercase().as_str() {
            "EU" => "https://api.eu.newrelic.com/graphql",
            "STAGING" => "https://staging-api.newrelic.com/graphql",
            _ => "https://api.newrelic.com/graphql",
        };
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.to_string(),
            api_key: auth.api_key.clone(),
        }
    }

    #[cfg(test)]
    pub fn with_endpoint(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl TelemetryClient for NerdGraphTelemetryClient {
    async fn query(&self, account_id: i64, nrql: &str) -> Result<Vec<Value>, QueryError> {
        let gql = r#"query($accountId: Int!, $nrql: Nrql!) {
  actor { account(id: $accountId) { nrql(query: $nrql) { results } } }
}"#;
        let body = json!({
            "query": gql,
            "variables": { "accountId": account_id, "nrql": nrql },
        });

        let response = self
            .http
            .post(&self.endpoint)
            .header("Api-Key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| QueryError(format!("telemetry request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(QueryError(format!(
                "telemetry query returned status {status}"
            )));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| QueryError(format!("invalid telemetry response: {e}")))?;

        if let Some(errors) = payload.get("errors").and_then(Value::as_array) {
            if !errors.is_empty() {
                let first = errors[0]
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown error");
                return Err(QueryError(format!("telemetry query error: {first}")));
            }
        }

        let results = payload
            .pointer("/data/actor/account/nrql/results")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        Ok(results)
    }
}
