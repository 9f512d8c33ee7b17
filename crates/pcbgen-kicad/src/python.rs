use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use pcbgen_command_runner::{CommandOutput, CommandRunner};
use tempfile::NamedTempFile;

use crate::error::ToolError;
use crate::paths;

const TOOL: &str = "KiCad Python";

#[cfg(target_os = "windows")]
const PATH_SEPARATOR: &str = ";";
#[cfg(not(target_os = "windows"))]
const PATH_SEPARATOR: &str = ":";

/// KiCad's Python interpreter with `pcbnew` on its module path
#[derive(Debug, Clone)]
pub struct KicadPython {
    interpreter: PathBuf,
    site_packages: Vec<PathBuf>,
}

impl Default for KicadPython {
    fn default() -> Self {
        KicadPython::new(paths::python_interpreter(), vec![paths::python_site_packages()])
    }
}

impl KicadPython {
    pub fn new(interpreter: impl Into<PathBuf>, site_packages: Vec<PathBuf>) -> Self {
        KicadPython {
            interpreter: interpreter.into(),
            site_packages,
        }
    }

    pub fn interpreter(&self) -> &Path {
        &self.interpreter
    }

    pub fn site_packages(&self) -> &[PathBuf] {
        &self.site_packages
    }

    /// Fail early with a readable message when the interpreter is missing.
    /// Bare program names are left to the `PATH` lookup at spawn time.
    pub fn check_installed(&self) -> Result<(), ToolError> {
        let is_path = self.interpreter.components().count() > 1;
        if is_path && !self.interpreter.exists() {
            return Err(ToolError::NotInstalled {
                tool: TOOL.to_string(),
                path: self.interpreter.clone(),
                env_var: paths::PYTHON_ENV,
            });
        }
        Ok(())
    }

    /// Run `script` with `args`. A non-zero exit is a [`ToolError::Failed`].
    pub fn run<I, S>(&self, script: &str, args: I) -> Result<CommandOutput>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.check_installed()?;

        let mut script_file =
            NamedTempFile::new().context("Failed to create temporary file for Python script")?;
        script_file
            .write_all(script.as_bytes())
            .context("Failed to write Python script to temporary file")?;

        let python_path = self
            .site_packages
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join(PATH_SEPARATOR);

        let output = CommandRunner::new(self.interpreter.to_string_lossy())
            .arg(script_file.path().to_string_lossy())
            .args(args)
            .env("PYTHONPATH", python_path)
            .run()
            .with_context(|| format!("Failed to execute {}", self.interpreter.display()))?;

        if !output.success {
            return Err(ToolError::failed(TOOL, &output).into());
        }
        log::debug!("{TOOL} script finished:\n{}", output.tail(5));
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shell() -> KicadPython {
        KicadPython::new("/bin/sh", vec![PathBuf::from("/a"), PathBuf::from("/b")])
    }

    #[test]
    fn test_runs_script_with_args_and_pythonpath() {
        let output = shell().run("echo \"$1\" \"$PYTHONPATH\"", ["board.kicad_pcb"]).unwrap();
        assert_eq!(
            output.plain_as_string().trim(),
            format!("board.kicad_pcb /a{PATH_SEPARATOR}/b")
        );
    }

    #[test]
    fn test_failure_is_tool_error() {
        let err = shell().run("echo broken board; exit 4", Vec::<String>::new()).unwrap_err();
        match err.downcast_ref::<ToolError>() {
            Some(ToolError::Failed { code, output, .. }) => {
                assert_eq!(*code, Some(4));
                assert!(output.contains("broken board"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_missing_interpreter() {
        let python = KicadPython::new("/nonexistent/kicad/python3", vec![]);
        let err = python.run("print(1)", Vec::<String>::new()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ToolError>(),
            Some(ToolError::NotInstalled { .. })
        ));
    }
}
