//! Core types for endpoint slicing.

use std::collections::BTreeSet;

use serde::Serialize;
use serde_json::Value;

/// Key under which OpenAPI stores a reference.
pub const REF_KEY: &str = "$ref";

/// Prefix of references that point at named schemas.
pub const SCHEMA_REF_PREFIX: &str = "#/components/schemas/";

/// Number of closure levels expanded when nothing else is configured.
pub const DEFAULT_MAX_DEPTH: usize = 10;

/// Set of schema identifiers. Sorted so output and diagnostics are stable.
pub type ReferenceSet = BTreeSet<String>;

/// Returns the JSON type name for error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Returns the `components.schemas` mapping of a document, if any.
pub fn schema_definitions(doc: &Value) -> Option<&serde_json::Map<String, Value>> {
    doc.get("components")
        .and_then(|c| c.get("schemas"))
        .and_then(Value::as_object)
}

/// Identifies one operation in a specification.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct EndpointKey {
    pub path: String,
    pub operation: String,
}

impl EndpointKey {
    pub fn new(path: impl Into<String>, operation: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            operation: operation.into(),
        }
    }
}

impl std::fmt::Display for EndpointKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.operation.to_uppercase(), self.path)
    }
}

/// Options for slicing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SliceOptions {
    /// Maximum number of closure levels to expand.
    pub max_depth: usize,
}

impl SliceOptions {
    /// Create options with the default depth bound.
    pub fn new() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Set the closure depth bound.
    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

impl Default for SliceOptions {
    fn default() -> Self {
        Self::new()
    }
}
