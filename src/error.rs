//! Error types for arm control operations

use thiserror::Error;

pub type Result<T> = std::result::Result<T, DoosanError>;

#[derive(Error, Debug)]
pub enum DoosanError {
    /// Wrong arity or shape handed to the marshaller or a command constructor
    #[error("Invalid argument: {0}")]
    Argument(String),

    /// Driver call attempted in a session state that does not allow it
    #[error("Cannot {operation} while session is {state}")]
    State { operation: &'static str, state: String },

    /// The driver reported a non-success status
    #[error("Driver call {operation} failed (status {status})")]
    Driver { operation: &'static str, status: i32 },

    /// The driver returned a null buffer from a read call
    #[error("Driver call {0} returned no reading")]
    EmptyReading(&'static str),

    #[error("Script error on line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Driver library error: {0}")]
    Library(#[from] libloading::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DoosanError {
    /// Attach a line number to an argument error raised while interpreting
    pub(crate) fn at_line(self, line: usize) -> Self {
        match self {
            DoosanError::Argument(message) => DoosanError::Parse { line, message },
            other => other,
        }
    }
}
