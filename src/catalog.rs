//! Endpoint catalog processing - slices and validates every operation.
//!
//! Records come out in document order: paths in the order the source defines
//! them, and operations in the order each path item lists them. A failure on
//! one endpoint never stops processing of the rest.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;

use crate::diagnostic::{
    quote_names, Diagnostic, Severity, DEPTH_LIMIT, FILE_NAME_COLLISION, LOOKUP_FAILED,
    UNDEFINED_SCHEMA,
};
use crate::error::CollectionError;
use crate::slicer::slice_endpoint;
use crate::types::{EndpointKey, SliceOptions};
use crate::validator::validate_slice;

/// Result of slicing and validating one endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EndpointRecord {
    pub path: String,
    pub operation: String,
    /// The slice document, or `None` if the endpoint could not be looked up.
    pub slice: Option<Value>,
    pub is_valid: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
    /// Where the slice was written, once saved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

impl EndpointRecord {
    pub fn key(&self) -> EndpointKey {
        EndpointKey::new(&self.path, &self.operation)
    }

    /// Number of diagnostics with the given severity.
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }
}

/// List every operation in the document, in document order.
///
/// Every path item key whose value is a mapping is an operation, whatever its
/// name or case. Scalar and sequence fields such as `summary` or `parameters`
/// are not.
pub fn list_endpoints(doc: &Value) -> Vec<EndpointKey> {
    let Some(paths) = doc.get("paths").and_then(Value::as_object) else {
        return Vec::new();
    };

    let mut keys = Vec::new();
    for (path, item) in paths {
        let Some(item) = item.as_object() else {
            continue;
        };
        for (operation, definition) in item {
            if definition.is_object() {
                keys.push(EndpointKey::new(path, operation));
            }
        }
    }
    keys
}

/// Slice and validate every operation in the document.
pub fn process_all(doc: &Value, options: &SliceOptions) -> Vec<EndpointRecord> {
    process_endpoints(doc, &list_endpoints(doc), options)
}

/// Slice and validate the given endpoints, preserving their order.
///
/// An endpoint that does not exist yields an invalid record without a slice.
pub fn process_endpoints(
    doc: &Value,
    keys: &[EndpointKey],
    options: &SliceOptions,
) -> Vec<EndpointRecord> {
    keys.iter().map(|key| process_endpoint(doc, key, options)).collect()
}

fn process_endpoint(doc: &Value, key: &EndpointKey, options: &SliceOptions) -> EndpointRecord {
    let mut diagnostics = Vec::new();

    let slice = match slice_endpoint(doc, &key.path, &key.operation, options) {
        Ok(slice) => slice,
        Err(e) => {
            diagnostics.push(Diagnostic::error(LOOKUP_FAILED, key, e.to_string()));
            return EndpointRecord {
                path: key.path.clone(),
                operation: key.operation.clone(),
                slice: None,
                is_valid: false,
                diagnostics,
                file: None,
            };
        }
    };

    if !slice.undefined.is_empty() {
        diagnostics.push(Diagnostic::warning(
            UNDEFINED_SCHEMA,
            key,
            format!(
                "referenced schemas not found in components/schemas: {}",
                quote_names(&slice.undefined)
            ),
        ));
    }
    if !slice.pending.is_empty() {
        diagnostics.push(Diagnostic::warning(
            DEPTH_LIMIT,
            key,
            format!(
                "dependency depth limit of {} reached; not expanded: {}",
                options.max_depth,
                quote_names(&slice.pending)
            ),
        ));
    }

    let is_valid = validate_slice(&slice.document, &key.path, &key.operation, &mut diagnostics);

    EndpointRecord {
        path: key.path.clone(),
        operation: key.operation.clone(),
        slice: Some(slice.document),
        is_valid,
        diagnostics,
        file: None,
    }
}

/// Derive a filesystem-safe file name for an endpoint slice.
///
/// `GET /BikePoint/{id}` becomes `get_BikePoint_id.json`; the root path
/// becomes `get_root.json`.
pub fn endpoint_file_name(path: &str, operation: &str) -> String {
    let safe_path = path
        .replace('/', "_")
        .replace(['{', '}'], "");
    let safe_path = safe_path.trim_matches('_');
    let operation = operation.to_lowercase();

    if safe_path.is_empty() {
        format!("{}_root.json", operation)
    } else {
        format!("{}_{}.json", operation, safe_path)
    }
}

/// Write each record's slice to `dir` as pretty-printed JSON.
///
/// Creates `dir` if needed. Records without a slice are skipped. Each saved
/// record gets its `file` set. Endpoints whose file names coincide, such as
/// `/a/{id}` and `/a/id`, never overwrite each other: later ones get a
/// numeric suffix and a `W003` warning. Returns the written paths in record
/// order.
pub fn save_records(
    records: &mut [EndpointRecord],
    dir: &Path,
) -> Result<Vec<PathBuf>, CollectionError> {
    std::fs::create_dir_all(dir).map_err(|source| CollectionError::WriteError {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut used = HashSet::new();
    let mut written = Vec::new();
    for record in records.iter_mut() {
        let Some(slice) = &record.slice else {
            continue;
        };

        let preferred = endpoint_file_name(&record.path, &record.operation);
        let name = unique_file_name(&preferred, &mut used);
        if name != preferred {
            let key = record.key();
            record.diagnostics.push(Diagnostic::warning(
                FILE_NAME_COLLISION,
                &key,
                format!("{} is already used by another endpoint; saved as {}", preferred, name),
            ));
        }

        let path = dir.join(name);
        let json = serde_json::to_string_pretty(slice)
            .map_err(|source| CollectionError::Serialize { source })?;
        std::fs::write(&path, json).map_err(|source| CollectionError::WriteError {
            path: path.clone(),
            source,
        })?;
        record.file = Some(path.clone());
        written.push(path);
    }
    Ok(written)
}

/// First of `name`, `name_2`, `name_3`, ... not yet in `used`; records it.
fn unique_file_name(name: &str, used: &mut HashSet<String>) -> String {
    if used.insert(name.to_string()) {
        return name.to_string();
    }

    let stem = name.strip_suffix(".json").unwrap_or(name);
    let mut n = 2;
    loop {
        let candidate = format!("{}_{}.json", stem, n);
        if used.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}
