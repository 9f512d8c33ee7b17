use std::path::PathBuf;

use pcbgen_command_runner::CommandOutput;

/// Lines of tool output kept in error messages
const OUTPUT_TAIL: usize = 20;

/// Failures of external KiCad tooling and the autorouter
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("{tool} not found at {}; set {env_var} to its location", .path.display())]
    NotInstalled {
        tool: String,
        path: PathBuf,
        env_var: &'static str,
    },

    #[error("{tool} failed (exit code {code:?}):\n{output}")]
    Failed {
        tool: String,
        code: Option<i32>,
        output: String,
    },

    #[error("{tool} did not finish within {seconds} s")]
    TimedOut { tool: String, seconds: u64 },
}

impl ToolError {
    pub(crate) fn failed(tool: &str, output: &CommandOutput) -> Self {
        ToolError::Failed {
            tool: tool.to_string(),
            code: output.exit_code,
            output: output.tail(OUTPUT_TAIL),
        }
    }
}
