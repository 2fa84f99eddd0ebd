//! Error types for loading, slicing, and collection generation.

use std::path::PathBuf;
use thiserror::Error;

/// Errors while loading a specification document.
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

    #[error("invalid YAML: {source}")]
    InvalidYaml {
        #[source]
        source: serde_yaml::Error,
    },
}

impl LoadError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            LoadError::FileNotFound { .. } | LoadError::ReadError { .. } => 3,
            #[cfg(feature = "remote")]
            LoadError::NetworkError { .. } => 3,
            _ => 2,
        }
    }
}

/// The requested endpoint does not exist in the source document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("path not found: {path}")]
    UnknownPath { path: String },

    #[error("operation {operation} not found under {path}")]
    UnknownOperation { path: String, operation: String },
}

/// Model output that is not JSON, even after repair.
#[derive(Debug, Clone, Error)]
pub enum RepairError {
    #[error("empty model output")]
    Empty,

    #[error("unparseable JSON at line {line}, column {column}: {message} (near `{excerpt}`)")]
    Unparseable {
        message: String,
        line: usize,
        column: usize,
        excerpt: String,
    },
}

/// Errors while checking, merging, or writing collections.
#[derive(Debug, Error)]
pub enum CollectionError {
    #[error("collection shape invalid with {} error(s)", errors.len())]
    Invalid { errors: Vec<SchemaError> },

    #[error("invalid collection schema: {message}")]
    InvalidSchema { message: String },

    #[error("cannot write {path}: {source}")]
    WriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot serialize collection: {source}")]
    Serialize {
        #[source]
        source: serde_json::Error,
    },
}

impl CollectionError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            CollectionError::Invalid { .. } => 1,
            CollectionError::WriteError { .. } => 3,
            _ => 2,
        }
    }
}

/// Single shape violation with path context.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SchemaError {
    /// JSON Pointer (RFC 6901) to the invalid field.
    pub path: String,
    /// Human-readable error message.
    pub message: String,
}

impl std::fmt::Display for SchemaError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Errors while generating a collection with a model.
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("required environment variable not set: {name}")]
    MissingConfig { name: &'static str },

    #[error("invalid value for {name}: {value}")]
    InvalidConfig { name: &'static str, value: String },

    #[cfg(feature = "remote")]
    #[error("model request failed: {source}")]
    Network {
        #[source]
        source: reqwest::Error,
    },

    #[error("model API returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("model API error ({kind}): {message}")]
    Api { kind: String, message: String },

    #[error("cannot read model response stream: {source}")]
    Stream {
        #[source]
        source: std::io::Error,
    },

    #[error("malformed stream event: {source}")]
    Event {
        #[source]
        source: serde_json::Error,
    },

    #[error("cannot serialize slice: {source}")]
    Serialize {
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Repair(#[from] RepairError),

    #[error(transparent)]
    Collection(#[from] CollectionError),
}

impl GenerateError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            #[cfg(feature = "remote")]
            GenerateError::Network { .. } => 3,
            GenerateError::Stream { .. } => 3,
            GenerateError::Load(e) => e.exit_code(),
            GenerateError::Collection(e) => e.exit_code(),
            GenerateError::Repair(_) => 1,
            _ => 2,
        }
    }
}
