//! Error types for openinstall-core

use thiserror::Error;

/// Result type alias using openinstall-core's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy for an installation run
#[derive(Error, Debug)]
pub enum Error {
    /// Host introspection failed; fatal before any recipe is attempted
    #[error("Could not discover host information: {message}")]
    Discovery { message: String },

    /// The discovery manifest failed validation; fatal before catalog fetch
    #[error("Installation requirements error: {reasons}")]
    UnsupportedHost { reasons: String },

    /// Recipe catalog retrieval failed
    #[error("Could not fetch recipe catalog: {message}")]
    CatalogFetch { message: String },

    /// A recipe was requested by name but is not in the catalog
    #[error("Recipe not found: {name}")]
    RecipeNotFound { name: String },

    /// The bundler detected a dependency cycle
    #[error("Circular dependency detected: {cycle}")]
    DependencyCycle { cycle: String },

    /// A declared dependency does not resolve to any recipe in the catalog
    #[error("Recipe {recipe} depends on {dependency}, which is not in the catalog")]
    UnresolvedDependency { recipe: String, dependency: String },

    /// A recipe's install steps failed
    #[error("Execution failed for recipe {recipe}: {message}")]
    Execution { recipe: String, message: String },

    /// The telemetry validation query itself failed (distinct from "no data yet")
    #[error("Validation query failed for recipe {recipe}: {message}")]
    ValidationQuery { recipe: String, message: String },

    /// Persisting the status rollup failed; never changes the install outcome
    #[error("Could not report install status: {message}")]
    Reporting { message: String },

    /// Required credential or configuration value is missing
    #[error("Missing configuration value: {name}")]
    MissingConfig { name: String },

    /// The run was interrupted by the cancellation signal
    #[error("Installation was interrupted")]
    Interrupted,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a discovery error
    pub fn discovery(message: impl Into<String>) -> Self {
        Self::Discovery {
            message: message.into(),
        }
    }

    /// Create an unsupported host error from a list of validation failures
    pub fn unsupported_host(reasons: Vec<String>) -> Self {
        Self::UnsupportedHost {
            reasons: reasons.join(", "),
        }
    }

    /// Create a catalog fetch error
    pub fn catalog_fetch(message: impl Into<String>) -> Self {
        Self::CatalogFetch {
            message: message.into(),
        }
    }

    /// Create a recipe not found error
    pub fn recipe_not_found(name: impl Into<String>) -> Self {
        Self::RecipeNotFound { name: name.into() }
    }

    /// Create a dependency cycle error from the chain of recipe names walked
    pub fn dependency_cycle(path: &[String]) -> Self {
        Self::DependencyCycle {
            cycle: path.join(" -> "),
        }
    }

    /// Create an unresolved dependency error
    pub fn unresolved_dependency(
        recipe: impl Into<String>,
        dependency: impl Into<String>,
    ) -> Self {
        Self::UnresolvedDependency {
            recipe: recipe.into(),
            dependency: dependency.into(),
        }
    }

    /// Create an execution error
    pub fn execution(recipe: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Execution {
            recipe: recipe.into(),
            message: message.into(),
        }
    }

    /// Create a validation query error
    pub fn validation_query(recipe: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ValidationQuery {
            recipe: recipe.into(),
            message: message.into(),
        }
    }

    /// Create a reporting error
    pub fn reporting(message: impl Into<String>) -> Self {
        Self::Reporting {
            message: message.into(),
        }
    }

    /// Create a missing config error
    pub fn missing_config(name: impl Into<String>) -> Self {
        Self::MissingConfig { name: name.into() }
    }
}
