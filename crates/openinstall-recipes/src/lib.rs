//! # openinstall-recipes
//!
//! Recipe catalog handling:
//! - [`fetcher`] retrieves the catalog from the recipe service, a local
//!   directory, or explicit file paths and URLs
//! - [`repository`] narrows the catalog to recipes compatible with the
//!   discovery manifest
//! - [`bundler`] partitions compatible recipes into core and additional
//!   bundles with dependency-aware ordering
//! - [`log_match`] expands recipe log patterns into concrete file paths

pub mod bundle;
pub mod bundler;
pub mod fetcher;
pub mod log_match;
pub mod repository;

pub use bundle::{Bundle, BundleKind, BundleRecipe};
pub use bundler::Bundler;
pub use fetcher::{LocalRecipeFetcher, RecipeFetcher, RecipeFileFetcher, ServiceRecipeFetcher};
pub use log_match::discover_log_files;
pub use repository::RecipeRepository;
