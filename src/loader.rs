//! Specification loading from various sources.
//!
//! Handles loading OpenAPI documents in JSON or YAML from files, strings,
//! and HTTP URLs.

use std::path::Path;

use serde_json::Value;

use crate::error::LoadError;

#[cfg(feature = "remote")]
use std::time::Duration;

/// Default timeout for HTTP requests (10 seconds).
#[cfg(feature = "remote")]
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Document encoding, chosen from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Json,
    Yaml,
    Unknown,
}

impl Format {
    fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Format::Json,
            Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
                Format::Yaml
            }
            _ => Format::Unknown,
        }
    }
}

/// Load a specification from a file path.
///
/// `.json` files are parsed as JSON, `.yaml`/`.yml` as YAML. Anything else
/// is tried as JSON first, then YAML.
///
/// # Errors
///
/// Returns `LoadError::FileNotFound` if the file doesn't exist, or a parse
/// error if the content isn't valid for its format.
pub fn load_spec(path: &Path) -> Result<Value, LoadError> {
    if !path.exists() {
        return Err(LoadError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|source| LoadError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;

    match Format::from_path(path) {
        Format::Json => parse_json(&content),
        Format::Yaml => parse_yaml(&content),
        Format::Unknown => load_spec_str(&content),
    }
}

/// Load a specification from a string, accepting JSON or YAML.
///
/// # Errors
///
/// Returns `LoadError::InvalidYaml` if the content is neither JSON nor YAML.
/// JSON is a subset of YAML, so the YAML error is the more informative one.
pub fn load_spec_str(content: &str) -> Result<Value, LoadError> {
    parse_json(content).or_else(|_| parse_yaml(content))
}

fn parse_json(content: &str) -> Result<Value, LoadError> {
    serde_json::from_str(content).map_err(|source| LoadError::InvalidJson { source })
}

fn parse_yaml(content: &str) -> Result<Value, LoadError> {
    serde_yaml::from_str(content).map_err(|source| LoadError::InvalidYaml { source })
}

/// Load a specification from an HTTP/HTTPS URL.
///
/// Requires the `remote` feature (enabled by default).
///
/// # Errors
///
/// Returns `LoadError::NetworkError` if the request fails, or a parse error
/// if the body is neither JSON nor YAML.
#[cfg(feature = "remote")]
pub fn load_spec_url(url: &str) -> Result<Value, LoadError> {
    let client = reqwest::blocking::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .map_err(|source| LoadError::NetworkError {
            url: url.to_string(),
            source,
        })?;

    let response = client
        .get(url)
        .send()
        .map_err(|source| LoadError::NetworkError {
            url: url.to_string(),
            source,
        })?;

    // Check for HTTP errors before parsing
    let response = response
        .error_for_status()
        .map_err(|source| LoadError::NetworkError {
            url: url.to_string(),
            source,
        })?;

    let body = response.text().map_err(|source| LoadError::NetworkError {
        url: url.to_string(),
        source,
    })?;

    load_spec_str(&body)
}

/// Check if a string looks like a URL (starts with http:// or https://).
pub fn is_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

/// Load a specification from a file path or URL.
///
/// URL loading requires the `remote` feature.
pub fn load_spec_auto(source: &str) -> Result<Value, LoadError> {
    if is_url(source) {
        #[cfg(feature = "remote")]
        {
            load_spec_url(source)
        }
        #[cfg(not(feature = "remote"))]
        {
            Err(LoadError::FileNotFound {
                path: std::path::PathBuf::from(source),
            })
        }
    } else {
        load_spec(Path::new(source))
    }
}
