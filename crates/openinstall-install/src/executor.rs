//! Recipe script execution

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::debug;

use openinstall_core::types::{Recipe, RecipeVars};
use openinstall_core::{Error, Result};

/// Runs a recipe's install script with its resolved variables
#[async_trait]
pub trait RecipeExecutor: Send + Sync {
    async fn execute(&self, recipe: &Recipe, vars: &RecipeVars) -> Result<()>;
}

/// Executes install scripts through `sh -c`
pub struct ShellRecipeExecutor {
    timeout: Duration,
}

const DEFAULT_SCRIPT_TIMEOUT: Duration = Duration::from_secs(600);

impl Default for ShellRecipeExecutor {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_SCRIPT_TIMEOUT,
        }
    }
}

impl ShellRecipeExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl RecipeExecutor for ShellRecipeExecutor {
    async fn execute(&self, recipe: &Recipe, vars: &RecipeVars) -> Result<()> {
        let script = recipe.install.trim();
        if script.is_empty() {
            return Err(Error::execution(
                &recipe.name,
                "recipe has no install script",
            ));
        }

        let mut child = Command::new("sh")
            .arg("-c")
            .arg(script)
            .envs(vars)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::execution(&recipe.name, format!("failed to start: {e}")))?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let name = recipe.name.clone();
        let out_task = tokio::spawn(async move {
            if let Some(stdout) = stdout {
                let mut lines = BufReader::new(stdout).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!(recipe = %name, "{line}");
                }
            }
        });
        let name = recipe.name.clone();
        let err_task = tokio::spawn(async move {
            if let Some(stderr) = stderr {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!(recipe = %name, "{line}");
                }
            }
        });

        let status = tokio::time::timeout(self.timeout, child.wait())
            .await
            .map_err(|_| {
                Error::execution(
                    &recipe.name,
                    format!("timed out after {}s", self.timeout.as_secs()),
                )
            })?
            .map_err(|e| Error::execution(&recipe.name, format!("wait failed: {e}")))?;

        let _ = out_task.await;
        let _ = err_task.await;

        if !status.success() {
            let code = status
                .code()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "signal".to_string());
            return Err(Error::execution(
                &recipe.name,
                format!("install script exited with status {code}"),
            ));
        }

        Ok(())
    }
}
