//! Driver errors.

use std::io;
use std::path::PathBuf;

use myriad_codegen::CodegenError;
use myriad_types::TypeError;
use thiserror::Error;

/// Error raised while loading descriptors or writing generated files.
#[derive(Debug, Error)]
pub enum DriverError {
    /// Resolution or type error from the generator, surfaced unchanged.
    #[error(transparent)]
    Codegen(#[from] CodegenError),

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Malformed JSON, or a key the descriptor format does not know.
    #[error("{}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A module imports a class no earlier module defined.
    #[error("module `{module}` imports unknown class `{class}`")]
    UnknownImport { module: String, class: String },

    /// Two descriptors define the same module.
    #[error("module `{module}` is defined more than once")]
    DuplicateModule { module: String },
}

impl From<TypeError> for DriverError {
    fn from(err: TypeError) -> Self {
        DriverError::Codegen(CodegenError::Type(err))
    }
}

impl DriverError {
    /// The underlying type error, if this is one.
    pub fn as_type_error(&self) -> Option<&TypeError> {
        match self {
            DriverError::Codegen(CodegenError::Type(err)) => Some(err),
            _ => None,
        }
    }
}
