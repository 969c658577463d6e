//! # openinstall-install
//!
//! The installation engine: executes recipe install steps, confirms
//! telemetry arrival through bounded polling, tracks the recipe lifecycle in
//! a persisted status rollup, and drives bundles through their failure
//! policies.
//!
//! The [`installer::RecipeInstaller`] at the top wires the pipeline
//! together: discovery, manifest validation, catalog retrieval, bundling,
//! and per-recipe execute-then-validate.

pub mod bundle_installer;
pub mod document_store;
pub mod executor;
pub mod installer;
pub mod prompt;
pub mod shutdown;
pub mod status;
pub mod telemetry;
pub mod validator;
pub mod vars;

pub use bundle_installer::BundleInstaller;
pub use document_store::{DocumentScope, DocumentStore, HttpDocumentStore};
pub use executor::{RecipeExecutor, ShellRecipeExecutor};
pub use installer::RecipeInstaller;
pub use prompt::{DialoguerPrompter, Prompter};
pub use shutdown::{shutdown_channel, ShutdownHandle, ShutdownSignal};
pub use status::{DocumentStoreSubscriber, FileStatusSubscriber, StatusReporter, StatusSubscriber};
pub use telemetry::{NerdGraphTelemetryClient, QueryError, TelemetryClient};
pub use validator::{PollingRecipeValidator, RecipeValidator, Validation};
pub use vars::RecipeVarProvider;
