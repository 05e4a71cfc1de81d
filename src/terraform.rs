//! Runner for the terraform CLI in a namespace's configuration directory
//!
//! The lifecycle engine only writes documents. Planning and applying them is
//! a separate, explicitly invoked step.

use std::path::PathBuf;

use tokio::process::Command;
use tracing::{debug, error, info};

use crate::Error;

/// terraform subcommands the operator knows how to run
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum TerraformCommand {
    /// Initialize the working directory and backend
    Init,
    /// Check the rendered configuration
    Validate,
    /// Show pending changes
    Plan,
    /// Apply pending changes without prompting
    Apply,
}

impl TerraformCommand {
    /// Command-line arguments for this subcommand
    pub fn args(&self) -> &'static [&'static str] {
        match self {
            Self::Init => &["init", "-input=false"],
            Self::Validate => &["validate"],
            Self::Plan => &["plan", "-input=false"],
            Self::Apply => &["apply", "-input=false", "-auto-approve"],
        }
    }
}

impl std::fmt::Display for TerraformCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.args()[0])
    }
}

/// Captured result of a finished command
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandOutput {
    /// Whether the process exited with status 0
    pub success: bool,
    /// Standard output
    pub stdout: String,
    /// Standard error
    pub stderr: String,
}

impl From<std::process::Output> for CommandOutput {
    fn from(output: std::process::Output) -> Self {
        Self {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }
}

/// Runs terraform with the configuration directory as working directory
#[derive(Clone, Debug)]
pub struct TerraformRunner {
    binary: PathBuf,
    dir: PathBuf,
}

impl TerraformRunner {
    /// Runner using `terraform` from `PATH`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self::with_binary("terraform", dir)
    }

    /// Runner using a specific executable
    pub fn with_binary(binary: impl Into<PathBuf>, dir: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            dir: dir.into(),
        }
    }

    /// Run one subcommand, failing with [`Error::Terraform`] on non-zero exit
    pub async fn run(&self, command: TerraformCommand) -> Result<CommandOutput, Error> {
        let mut cmd = Command::new(&self.binary);
        cmd.args(command.args()).current_dir(&self.dir);
        debug!(command = ?cmd, "executing terraform");

        let output: CommandOutput = cmd
            .output()
            .await
            .map_err(|e| {
                Error::terraform(format!(
                    "failed to execute {}: {e}",
                    self.binary.display()
                ))
            })?
            .into();

        if !output.success {
            error!(%command, stderr = %output.stderr.trim(), "terraform failed");
            return Err(Error::terraform(format!(
                "{command} failed: {}",
                output.stderr.trim()
            )));
        }

        info!(%command, output = %output.stdout.trim(), "terraform finished");
        Ok(output)
    }

    /// Run subcommands in order, stopping at the first failure
    pub async fn run_all(&self, commands: &[TerraformCommand]) -> Result<(), Error> {
        for command in commands {
            self.run(*command).await?;
        }
        Ok(())
    }
}
