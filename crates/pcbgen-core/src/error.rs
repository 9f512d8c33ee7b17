use std::fmt;
use std::path::PathBuf;

use pcbgen_kicad::ToolError;
use pcbgen_layout::LayoutError;
use pcbgen_llm::LlmError;
use pcbgen_schematic::SchematicError;
use serde::Serialize;

/// Coarse classification shared by every failure of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Format,
    NotFound,
    MissingProperty,
    EmptySet,
    Upstream,
    ExternalTool,
    Io,
    Config,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Schematic(#[from] SchematicError),

    #[error(transparent)]
    Layout(#[from] LayoutError),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error("invalid configuration {}: {message}", .path.display())]
    Config { path: PathBuf, message: String },

    #[error("failed to write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failure reported by a board runtime or autorouter
    #[error("{0:#}")]
    Runtime(anyhow::Error),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Schematic(e) => match e {
                SchematicError::Format(_) | SchematicError::Parse { .. } => ErrorKind::Format,
                SchematicError::NotFound(_) => ErrorKind::NotFound,
                SchematicError::MissingProperty { .. } => ErrorKind::MissingProperty,
                SchematicError::Io { .. } => ErrorKind::Io,
            },
            Error::Layout(e) => match e {
                LayoutError::EmptySet => ErrorKind::EmptySet,
                LayoutError::UnknownFootprint(_) => ErrorKind::NotFound,
                LayoutError::Runtime(e) => runtime_kind(e),
            },
            Error::Llm(LlmError::Io { .. }) => ErrorKind::Io,
            Error::Llm(_) => ErrorKind::Upstream,
            Error::Tool(_) => ErrorKind::ExternalTool,
            Error::Config { .. } => ErrorKind::Config,
            Error::Io { .. } => ErrorKind::Io,
            Error::Runtime(e) => runtime_kind(e),
        }
    }
}

fn runtime_kind(error: &anyhow::Error) -> ErrorKind {
    for cause in error.chain() {
        if cause.is::<ToolError>() {
            return ErrorKind::ExternalTool;
        }
        if cause.is::<std::io::Error>() {
            return ErrorKind::Io;
        }
    }
    ErrorKind::ExternalTool
}

/// Steps of a generation run, numbered as reported to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    Filter = 0,
    Selection = 1,
    Placement = 2,
    PinMapping = 3,
    NetlistPrompt = 4,
    NetlistGeneration = 5,
    Wiring = 6,
    Layout = 7,
    Routing = 8,
}

impl Phase {
    pub fn number(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            Phase::Filter => "component filter",
            Phase::Selection => "component selection",
            Phase::Placement => "placement",
            Phase::PinMapping => "pin mapping",
            Phase::NetlistPrompt => "netlist prompt",
            Phase::NetlistGeneration => "netlist generation",
            Phase::Wiring => "wiring",
            Phase::Layout => "board layout",
            Phase::Routing => "routing",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "phase {} ({})", self.number(), self.name())
    }
}

/// An error together with the phase that raised it
#[derive(Debug, thiserror::Error)]
#[error("{phase} failed: {source}")]
pub struct PhaseError {
    pub phase: Phase,
    #[source]
    pub source: Error,
}

impl PhaseError {
    pub fn kind(&self) -> ErrorKind {
        self.source.kind()
    }
}

/// Attach the running phase to a fallible step
pub(crate) trait InPhase<T> {
    fn in_phase(self, phase: Phase) -> Result<T, PhaseError>;
}

impl<T, E: Into<Error>> InPhase<T> for Result<T, E> {
    fn in_phase(self, phase: Phase) -> Result<T, PhaseError> {
        self.map_err(|e| PhaseError {
            phase,
            source: e.into(),
        })
    }
}
