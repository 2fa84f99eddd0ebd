//! Schema reference scanning.
//!
//! Finds the named schemas a document fragment points at through
//! `{"$ref": "#/components/schemas/<Name>"}` objects. References into other
//! component sections (`#/components/parameters/...`, `#/components/responses/...`)
//! are not schema dependencies and are ignored, as are external refs.

use serde_json::Value;

use crate::types::{ReferenceSet, REF_KEY, SCHEMA_REF_PREFIX};

/// Extract the schema identifier from a `$ref` string.
///
/// Returns `None` unless the string points into `#/components/schemas/`.
pub fn schema_name(ref_val: &str) -> Option<&str> {
    ref_val
        .strip_prefix(SCHEMA_REF_PREFIX)
        .filter(|name| !name.is_empty())
}

/// Collect every schema identifier referenced directly within `node`.
///
/// Not transitive: the bodies of referenced schemas are not followed.
pub fn scan_refs(node: &Value) -> ReferenceSet {
    let mut refs = ReferenceSet::new();
    scan_into(node, &mut refs);
    refs
}

fn scan_into(node: &Value, refs: &mut ReferenceSet) {
    match node {
        Value::Object(map) => {
            for (key, value) in map {
                match value {
                    Value::String(ref_val) if key == REF_KEY => {
                        if let Some(name) = schema_name(ref_val) {
                            refs.insert(name.to_string());
                        }
                    }
                    _ => scan_into(value, refs),
                }
            }
        }
        Value::Array(arr) => {
            for item in arr {
                scan_into(item, refs);
            }
        }
        _ => {}
    }
}
