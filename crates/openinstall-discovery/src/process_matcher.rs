//! Process matching
//!
//! Pairs running processes with the recipes whose process patterns match
//! them. Purely a filter: no side effects, no I/O.

use regex::Regex;
use tracing::debug;

use openinstall_core::types::{MatchedProcess, ProcessSnapshot, Recipe};

/// Match every process against every recipe's process patterns, in catalog
/// order. The first pattern that matches within one recipe is recorded for
/// that (process, recipe) pair; later recipes may match the same process
/// again. Processes with empty command lines and invalid patterns are
/// skipped without error.
pub fn match_processes<'r, I>(processes: &[ProcessSnapshot], recipes: I) -> Vec<MatchedProcess>
where
    I: IntoIterator<Item = &'r Recipe>,
{
    let recipes: Vec<&Recipe> = recipes.into_iter().collect();
    let mut matches = Vec::new();

    for process in processes {
        if process.command.is_empty() {
            continue;
        }
        for recipe in &recipes {
            if let Some(pattern) = first_matching_pattern(recipe, &process.command) {
                matches.push(MatchedProcess {
                    command: process.command.clone(),
                    matching_pattern: pattern.to_string(),
                });
            }
        }
    }

    matches
}

fn first_matching_pattern<'r>(recipe: &'r Recipe, command: &str) -> Option<&'r str> {
    for pattern in &recipe.process_match {
        match Regex::new(pattern) {
            Ok(re) => {
                if re.is_match(command) {
                    return Some(pattern);
                }
            }
            Err(e) => {
                debug!(
                    "invalid process pattern {:?} on recipe {}: {}",
                    pattern, recipe.name, e
                );
            }
        }
    }
    None
}
