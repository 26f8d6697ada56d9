//! govc process execution

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::config::GovcConfig;
use crate::error::{GovcError, Result};

/// Runs a single govc command and returns its stdout.
///
/// A non-zero exit status is reported as [`GovcError::Command`] carrying the
/// command's stderr, so callers can match on "not found" style responses.
#[async_trait]
pub trait Executable: Send + Sync {
    async fn execute(&self, args: &[&str]) -> Result<String>;
}

/// Executes the real govc binary with an explicit environment.
pub struct GovcExecutable {
    binary: PathBuf,
    env: HashMap<String, String>,
}

impl GovcExecutable {
    pub fn new(config: &GovcConfig) -> Self {
        Self {
            binary: config.binary.clone(),
            env: config.env_map(),
        }
    }
}

#[async_trait]
impl Executable for GovcExecutable {
    async fn execute(&self, args: &[&str]) -> Result<String> {
        debug!(binary = %self.binary.display(), args = ?args, "Running govc");

        let output = Command::new(&self.binary)
            .args(args)
            .envs(&self.env)
            .output()
            .await?;

        if !output.status.success() {
            return Err(command_error(
                args,
                &String::from_utf8_lossy(&output.stderr),
                &String::from_utf8_lossy(&output.stdout),
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// govc prints some failures on stdout, so both streams are kept, one per line.
fn command_error(args: &[&str], stderr: &str, stdout: &str) -> GovcError {
    let output: Vec<&str> = [stderr.trim(), stdout.trim()]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect();

    GovcError::Command {
        command: args.first().copied().unwrap_or_default().to_string(),
        stderr: output.join("\n"),
    }
}
