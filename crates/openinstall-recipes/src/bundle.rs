//! Bundles
//!
//! A bundle is an ordered, purpose-grouped set of recipes installed under
//! one failure policy. Each entry wraps an immutable `Arc<Recipe>` plus an
//! append-only, timestamped status history; the history is the only state
//! that changes during installation.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use openinstall_core::types::{Recipe, RecipeStatusKind};

/// Bundle purpose, which decides the failure policy and prompting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BundleKind {
    /// Infrastructure agent, logging, golden recipe: stop on error
    Core,
    /// Explicitly requested recipes: continue on error, no prompt
    AdditionalTargeted,
    /// Everything remaining on a guided install: continue on error, prompted
    AdditionalGuided,
}

impl BundleKind {
    /// Whether the installer asks for confirmation before this bundle
    pub fn should_prompt(self) -> bool {
        matches!(self, Self::AdditionalGuided)
    }

    /// Whether the first recipe failure aborts the rest of the bundle
    pub fn stop_on_error(self) -> bool {
        matches!(self, Self::Core)
    }
}

impl std::fmt::Display for BundleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Core => write!(f, "core"),
            Self::AdditionalTargeted => write!(f, "targeted"),
            Self::AdditionalGuided => write!(f, "guided"),
        }
    }
}

/// One recipe inside a bundle, with its lifecycle history
#[derive(Debug, Clone)]
pub struct BundleRecipe {
    pub recipe: Arc<Recipe>,
    statuses: Vec<(RecipeStatusKind, DateTime<Utc>)>,
}

impl BundleRecipe {
    pub fn new(recipe: Arc<Recipe>) -> Self {
        Self {
            recipe,
            statuses: Vec::new(),
        }
    }

    /// Append a status; repeated statuses are recorded once
    pub fn add_status(&mut self, status: RecipeStatusKind) {
        if !self.has_status(status) {
            self.statuses.push((status, Utc::now()));
        }
    }

    pub fn has_status(&self, status: RecipeStatusKind) -> bool {
        self.statuses.iter().any(|(s, _)| *s == status)
    }

    pub fn statuses(&self) -> &[(RecipeStatusKind, DateTime<Utc>)] {
        &self.statuses
    }

    pub fn name(&self) -> &str {
        &self.recipe.name
    }
}

/// Ordered collection of bundle recipes under one failure policy
#[derive(Debug, Clone)]
pub struct Bundle {
    pub kind: BundleKind,
    recipes: Vec<BundleRecipe>,
}

impl Bundle {
    pub fn new(kind: BundleKind) -> Self {
        Self {
            kind,
            recipes: Vec::new(),
        }
    }

    /// Append a recipe; duplicates by name are ignored
    pub fn add_recipe(&mut self, bundle_recipe: BundleRecipe) {
        if !self.contains_name(bundle_recipe.name()) {
            self.recipes.push(bundle_recipe);
        }
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.recipes.iter().any(|br| br.recipe.is_named(name))
    }

    pub fn recipes(&self) -> &[BundleRecipe] {
        &self.recipes
    }

    pub fn recipes_mut(&mut self) -> &mut [BundleRecipe] {
        &mut self.recipes
    }

    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    /// Position of a recipe in install order
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.recipes.iter().position(|br| br.recipe.is_named(name))
    }
}
