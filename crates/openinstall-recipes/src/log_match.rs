//! Log file discovery
//!
//! Expands a recipe's log match globs into the concrete files present on the
//! host. The result feeds the `NR_DISCOVERED_LOG_FILES` recipe variable.

use tracing::debug;

use openinstall_core::types::Recipe;

/// Paths on this host matching any of the recipe's log patterns. Invalid
/// patterns and unreadable directories contribute nothing.
pub fn discover_log_files(recipe: &Recipe) -> Vec<String> {
    let mut files = Vec::new();

    for log_match in &recipe.log_match {
        let matches = match glob::glob(&log_match.file) {
            Ok(matches) => matches,
            Err(e) => {
                debug!(
                    "invalid log pattern {:?} on recipe {}: {}",
                    log_match.file, recipe.name, e
                );
                continue;
            }
        };
        for path in matches.flatten() {
            files.push(path.to_string_lossy().into_owned());
        }
    }

    files
}
