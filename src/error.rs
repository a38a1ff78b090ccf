//! Error types for contract loading, compilation and payload validation.

use std::path::PathBuf;
use thiserror::Error;

/// Errors while loading a contract description or options file.
#[derive(Debug, Error)]
pub enum LoadError {
    // IO errors (exit code 3)
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[cfg(feature = "remote")]
    #[error("failed to fetch {url}: {source}")]
    NetworkError {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    // Parse errors (exit code 2)
    #[error("invalid JSON: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Compile(#[from] CompileError),
}

impl LoadError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            LoadError::FileNotFound { .. } | LoadError::ReadError { .. } => 3,
            #[cfg(feature = "remote")]
            LoadError::NetworkError { .. } => 3,
            LoadError::Compile(e) => e.exit_code(),
            _ => 2,
        }
    }
}

/// Errors while turning a schema description into compiled models.
///
/// Always raised at construction time, never while handling a request.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("invalid description at {path}: {message}")]
    InvalidDescription { path: String, message: String },

    #[error("invalid field spec at {path}: {message}")]
    InvalidField { path: String, message: String },

    #[error("invalid status code \"{key}\": expected an integer between 100 and 599")]
    InvalidStatus { key: String },

    #[error("response {status} declares an empty list of alternatives")]
    EmptyAlternatives { status: u16 },

    #[error("model {model} rejected by the validation engine: {message}")]
    InvalidSchema { model: String, message: String },
}

impl CompileError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        2
    }
}

/// A payload did not satisfy its compiled model.
#[derive(Debug, Clone, Error)]
#[error("validation failed: {}", summary(errors))]
pub struct ValidationError {
    pub errors: Vec<FieldError>,
}

impl ValidationError {
    /// Field paths that failed, in encounter order, without duplicates.
    pub fn fields(&self) -> Vec<String> {
        let mut fields: Vec<String> = Vec::new();
        for error in &self.errors {
            if !error.path.is_empty() && !fields.contains(&error.path) {
                fields.push(error.path.clone());
            }
        }
        fields
    }
}

fn summary(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Single validation error with its dotted field path.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct FieldError {
    /// Dotted path to the invalid field (e.g. `address.city`, `tags.0`).
    pub path: String,
    /// Human-readable error message.
    pub message: String,
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// Errors installing the process-wide default options.
#[derive(Debug, Error)]
pub enum DefaultsError {
    #[error("default options are already installed or were read by a contract")]
    AlreadyInitialized,
}
