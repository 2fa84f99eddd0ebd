//! Endpoint slicing - extracts one operation and the schemas it depends on.

use serde_json::{Map, Value};

use crate::closure::expand_closure;
use crate::error::LookupError;
use crate::refs::scan_refs;
use crate::types::{schema_definitions, ReferenceSet, SliceOptions};

/// Top-level fields copied verbatim into every slice.
const METADATA_FIELDS: &[&str] = &["openapi", "info"];

/// A self-contained specification covering a single operation.
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointSlice {
    /// The slice document: metadata, one path with one operation, and the
    /// schemas that operation transitively references.
    pub document: Value,
    /// Identifiers in the closure with no definition in the source document.
    pub undefined: ReferenceSet,
    /// Identifiers left unexpanded when the depth bound was reached.
    pub pending: ReferenceSet,
}

/// Build the minimal specification slice for `operation` under `path`.
///
/// Schemas are copied in the order the source document defines them.
/// Slicing succeeds even when referenced schemas are missing; they are
/// listed in [`EndpointSlice::undefined`] instead.
///
/// # Errors
///
/// Returns `LookupError` if the path or the operation does not exist.
pub fn slice_endpoint(
    doc: &Value,
    path: &str,
    operation: &str,
    options: &SliceOptions,
) -> Result<EndpointSlice, LookupError> {
    let path_item = doc
        .get("paths")
        .and_then(|p| p.get(path))
        .ok_or_else(|| LookupError::UnknownPath {
            path: path.to_string(),
        })?;

    let endpoint = path_item
        .as_object()
        .and_then(|item| item.get(operation))
        .ok_or_else(|| LookupError::UnknownOperation {
            path: path.to_string(),
            operation: operation.to_string(),
        })?;

    let direct = scan_refs(endpoint);
    let closure = expand_closure(doc, &direct, options.max_depth);

    let mut schemas = Map::new();
    if let Some(defined) = schema_definitions(doc) {
        for (name, body) in defined {
            if closure.refs.contains(name) {
                schemas.insert(name.clone(), body.clone());
            }
        }
    }

    let undefined: ReferenceSet = closure
        .refs
        .iter()
        .filter(|name| !schemas.contains_key(name.as_str()))
        .cloned()
        .collect();

    let mut document = Map::new();
    for &field in METADATA_FIELDS {
        if let Some(value) = doc.get(field) {
            document.insert(field.to_string(), value.clone());
        }
    }

    let mut operations = Map::new();
    operations.insert(operation.to_string(), endpoint.clone());
    let mut paths = Map::new();
    paths.insert(path.to_string(), Value::Object(operations));
    document.insert("paths".to_string(), Value::Object(paths));

    let mut components = Map::new();
    components.insert("schemas".to_string(), Value::Object(schemas));
    document.insert("components".to_string(), Value::Object(components));

    Ok(EndpointSlice {
        document: Value::Object(document),
        undefined,
        pending: closure.pending,
    })
}
