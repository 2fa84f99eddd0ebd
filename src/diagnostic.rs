//! Structured diagnostics reported while slicing endpoints.

use serde::Serialize;

use crate::types::EndpointKey;

/// Endpoint lookup failed.
pub const LOOKUP_FAILED: &str = "E001";
/// Slice contains references to schemas it does not define.
pub const UNRESOLVED_REFERENCE: &str = "E002";
/// A referenced schema is not defined in the source document.
pub const UNDEFINED_SCHEMA: &str = "W001";
/// Closure expansion stopped at the depth bound.
pub const DEPTH_LIMIT: &str = "W002";
/// Slice file name already taken by another endpoint in the same batch.
pub const FILE_NAME_COLLISION: &str = "W003";

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Error => f.write_str("error"),
            Severity::Warning => f.write_str("warning"),
        }
    }
}

/// A single diagnostic message about one endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: String,
    /// Endpoint the message is about, e.g. "GET /pets/{id}".
    pub endpoint: String,
    pub message: String,
}

impl Diagnostic {
    pub fn error(code: &str, key: &EndpointKey, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, code, key, message)
    }

    pub fn warning(code: &str, key: &EndpointKey, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, code, key, message)
    }

    fn new(severity: Severity, code: &str, key: &EndpointKey, message: impl Into<String>) -> Self {
        Self {
            severity,
            code: code.to_string(),
            endpoint: key.to_string(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}[{}]: {} - {}",
            self.severity, self.code, self.endpoint, self.message
        )
    }
}

/// Join identifiers for messages: `'A', 'B'`.
pub(crate) fn quote_names<'a>(names: impl IntoIterator<Item = &'a String>) -> String {
    names
        .into_iter()
        .map(|n| format!("'{}'", n))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostic_display() {
        let key = EndpointKey::new("/orders", "post");
        let diag = Diagnostic::error(UNRESOLVED_REFERENCE, &key, "unresolved references: 'Customer'");
        assert_eq!(
            diag.to_string(),
            "error[E002]: POST /orders - unresolved references: 'Customer'"
        );
    }

    #[test]
    fn severity_serializes_lowercase() {
        let json = serde_json::to_string(&Severity::Warning).unwrap();
        assert_eq!(json, r#""warning""#);
    }

    #[test]
    fn quote_names_joins() {
        let names = vec!["A".to_string(), "B".to_string()];
        assert_eq!(quote_names(&names), "'A', 'B'");
    }
}
