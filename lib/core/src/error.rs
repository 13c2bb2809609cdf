use crate::backend::BackendError;
use thiserror::Error;
use vecflow_schema::SchemaError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("Unknown backend '{name}' at {path} (known backends: {known})")]
    UnknownBackend {
        name: String,
        path: String,
        known: String,
    },

    #[error("Invalid parameter path '{path}': cannot resolve segment '{segment}': {reason}")]
    ParameterPath {
        path: String,
        segment: String,
        reason: String,
    },

    #[error("Backend '{backend}' failed at {path}: {source}")]
    BackendExecution {
        path: String,
        backend: String,
        #[source]
        source: BackendError,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn parameter_path(
        path: impl Into<String>,
        segment: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Error::ParameterPath {
            path: path.into(),
            segment: segment.into(),
            reason: reason.into(),
        }
    }

    pub fn backend(path: impl Into<String>, backend: impl Into<String>, source: BackendError) -> Self {
        Error::BackendExecution {
            path: path.into(),
            backend: backend.into(),
            source,
        }
    }
}
