use std::path::PathBuf;

use pcbgen_sexpr::{scan::ScanError, ParseError};

/// Errors raised while reading or editing schematic documents
#[derive(Debug, thiserror::Error)]
pub enum SchematicError {
    #[error("malformed document: {0}")]
    Format(String),

    #[error("{0}")]
    NotFound(String),

    #[error("symbol {symbol} is missing property {property} or its (at x y rot) anchor")]
    MissingProperty { symbol: String, property: String },

    #[error("failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {context}: {source}")]
    Parse {
        context: String,
        #[source]
        source: ParseError,
    },
}

impl SchematicError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SchematicError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn not_found(message: impl Into<String>) -> Self {
        SchematicError::NotFound(message.into())
    }
}

impl From<ScanError> for SchematicError {
    fn from(err: ScanError) -> Self {
        SchematicError::Format(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SchematicError>;
