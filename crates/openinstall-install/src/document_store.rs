//! Remote status documents
//!
//! The rollup is mirrored to a remote document store so that other tooling
//! can observe the run. Documents are written into a named collection,
//! scoped either to the user or to an entity produced by the run.

use async_trait::async_trait;
use serde_json::{json, Value};

use openinstall_core::{AuthConfig, Error, Result};

/// Where a document lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentScope {
    User,
    Entity(String),
}

/// Writes JSON documents to a remote store
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn write_document(
        &self,
        scope: &DocumentScope,
        collection: &str,
        document_id: &str,
        document: &Value,
    ) -> Result<()>;
}

/// NerdGraph-backed document store
pub struct HttpDocumentStore {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    package_id: String,
}

const STORE_PACKAGE_ID: &str = "open-install-library";

impl HttpDocumentStore {
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
            package_id: STORE_PACKAGE_ID.to_string(),
        }
    }
}

#[async_trait]
impl DocumentStore for HttpDocumentStore {
    async fn write_document(
        &self,
        scope: &DocumentScope,
        collection: &str,
        document_id: &str,
        document: &Value,
    ) -> Result<()> {
        let (mutation, variables) = match scope {
            DocumentScope::User => (
                r#"mutation($collection: String!, $documentId: String!, $document: NerdStorageDocument!, $scopeId: String!) {
  nerdStorageWriteDocument(
    collection: $collection,
    documentId: $documentId,
    document: $document,
    scope: { name: USER, id: $scopeId }
  )
}"#,
                json!({
                    "collection": collection,
                    "documentId": document_id,
                    "document": document,
                    "scopeId": self.package_id,
                }),
            ),
            DocumentScope::Entity(guid) => (
                r#"mutation($collection: String!, $documentId: String!, $document: NerdStorageDocument!, $scopeId: String!) {
  nerdStorageWriteDocument(
    collection: $collection,
    documentId: $documentId,
    document: $document,
    scope: { name: ENTITY, id: $scopeId }
  )
}"#,
                json!({
                    "collection": collection,
                    "documentId": document_id,
                    "document": document,
                    "scopeId": guid,
                }),
            ),
        };

        let body = json!({ "query": mutation, "variables": variables });

        let response = self
            .http
            .post(&self.endpoint)
            .header("Api-Key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::reporting(format!("document write failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::reporting(format!(
                "document write returned status {status}"
            )));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| Error::reporting(format!("invalid document write response: {e}")))?;

        if let Some(errors) = payload.get("errors").and_then(Value::as_array) {
            if !errors.is_empty() {
                let first = errors[0]
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown error");
                return Err(Error::reporting(format!("document write error: {first}")));
            }
        }

        Ok(())
    }
}
