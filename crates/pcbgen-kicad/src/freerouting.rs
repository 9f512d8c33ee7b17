//! Freerouting as an [`Autorouter`], through a Specctra DSN/SES round trip.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use pcbgen_command_runner::CommandRunner;
use pcbgen_layout::Autorouter;

use crate::error::ToolError;
use crate::python::KicadPython;

const EXPORT_DSN: &str = include_str!("scripts/export_dsn.py");
const IMPORT_SES: &str = include_str!("scripts/import_ses.py");
const TOOL: &str = "Freerouting";

#[derive(Debug, Clone)]
pub struct Freerouting {
    /// Program to launch, e.g. `freerouting` or `java`
    command: String,
    /// Leading arguments, e.g. `["-jar", "freerouting.jar"]`
    args: Vec<String>,
    timeout: Duration,
    python: KicadPython,
}

impl Freerouting {
    pub fn new(
        command: impl Into<String>,
        args: Vec<String>,
        timeout: Duration,
        python: KicadPython,
    ) -> Self {
        Freerouting {
            command: command.into(),
            args,
            timeout,
            python,
        }
    }

    /// Route `dsn` into `ses` with the configured command and timeout.
    pub fn run_router(&self, dsn: &Path, ses: &Path) -> Result<()> {
        log::info!("Running {TOOL} on {} (timeout {:?})", dsn.display(), self.timeout);
        let output = CommandRunner::new(&self.command)
            .args(&self.args)
            .arg("-de")
            .arg(dsn.to_string_lossy())
            .arg("-do")
            .arg(ses.to_string_lossy())
            .timeout(self.timeout)
            .run()
            .with_context(|| format!("Failed to launch {}", self.command))?;

        if output.timed_out {
            return Err(ToolError::TimedOut {
                tool: TOOL.to_string(),
                seconds: self.timeout.as_secs(),
            }
            .into());
        }
        if !output.success {
            return Err(ToolError::failed(TOOL, &output).into());
        }
        if !ses.exists() {
            return Err(ToolError::Failed {
                tool: TOOL.to_string(),
                code: output.exit_code,
                output: format!("no session file written to {}", ses.display()),
            }
            .into());
        }
        Ok(())
    }
}

impl Autorouter for Freerouting {
    fn route(&self, board_file: &Path) -> Result<()> {
        let work = tempfile::tempdir().context("Failed to create routing directory")?;
        let dsn = work.path().join("board.dsn");
        let ses = work.path().join("board.ses");

        self.python
            .run(EXPORT_DSN, [board_file.to_string_lossy(), dsn.to_string_lossy()])
            .context("Failed to export Specctra DSN")?;
        self.run_router(&dsn, &ses)?;
        self.python
            .run(IMPORT_SES, [board_file.to_string_lossy(), ses.to_string_lossy()])
            .context("Failed to import Specctra session")?;

        log::info!("Routed {}", board_file.display());
        Ok(())
    }
}
