//! Slice closure validation.

use serde_json::Value;

use crate::diagnostic::{quote_names, Diagnostic, UNRESOLVED_REFERENCE};
use crate::refs::scan_refs;
use crate::types::{schema_definitions, EndpointKey, ReferenceSet};

/// Schema identifiers referenced anywhere in `slice` but not defined in its
/// own `components.schemas`.
///
/// The whole document is scanned, not only the operation, so references
/// carried in by copied schema bodies are caught as well.
pub fn unresolved_refs(slice: &Value) -> ReferenceSet {
    let available = schema_definitions(slice);
    scan_refs(slice)
        .into_iter()
        .filter(|name| !available.is_some_and(|schemas| schemas.contains_key(name)))
        .collect()
}

/// Check that every schema reference in `slice` resolves within the slice.
///
/// Pushes one error diagnostic listing the unresolved identifiers on
/// failure. Never fails itself.
pub fn validate_slice(
    slice: &Value,
    path: &str,
    operation: &str,
    diagnostics: &mut Vec<Diagnostic>,
) -> bool {
    let unresolved = unresolved_refs(slice);
    if unresolved.is_empty() {
        return true;
    }

    diagnostics.push(Diagnostic::error(
        UNRESOLVED_REFERENCE,
        &EndpointKey::new(path, operation),
        format!("unresolved references: {}", quote_names(&unresolved)),
    ));
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slicer::slice_endpoint;
    use crate::types::SliceOptions;
    use serde_json::json;

    fn order_spec() -> Value {
        json!({
            "openapi": "3.0.0",
            "info": { "title": "Orders", "version": "1" },
            "paths": { "/orders": { "post": {
                "requestBody": { "content": { "application/json": {
                    "schema": { "$ref": "#/components/schemas/Order" }
                } } }
            } } },
            "components": { "schemas": {
                "Order": { "properties": {
                    "lines": { "items": { "$ref": "#/components/schemas/LineItem" } },
                    "customer": { "$ref": "#/components/schemas/Customer" }
                } },
                "LineItem": { "type": "object" },
                "Customer": { "type": "object" }
            } }
        })
    }

    #[test]
    fn sliced_document_validates() {
        let slice = slice_endpoint(&order_spec(), "/orders", "post", &SliceOptions::default())
            .unwrap()
            .document;
        let mut diagnostics = Vec::new();
        assert!(validate_slice(&slice, "/orders", "post", &mut diagnostics));
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn missing_definition_fails_with_names() {
        let mut slice = slice_endpoint(&order_spec(), "/orders", "post", &SliceOptions::default())
            .unwrap()
            .document;
        slice["components"]["schemas"]
            .as_object_mut()
            .unwrap()
            .remove("Customer");

        let mut diagnostics = Vec::new();
        assert!(!validate_slice(&slice, "/orders", "post", &mut diagnostics));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, "E002");
        assert_eq!(diagnostics[0].endpoint, "POST /orders");
        assert!(diagnostics[0].message.contains("'Customer'"));
    }

    #[test]
    fn refs_inside_copied_schemas_are_checked() {
        let slice = json!({
            "paths": { "/a": { "get": {} } },
            "components": { "schemas": {
                "A": { "properties": { "b": { "$ref": "#/components/schemas/B" } } }
            } }
        });
        assert_eq!(unresolved_refs(&slice), ReferenceSet::from(["B".to_string()]));
    }

    #[test]
    fn slice_without_components_reports_all_refs() {
        let slice = json!({
            "paths": { "/a": { "get": { "schema": { "$ref": "#/components/schemas/A" } } } }
        });
        assert_eq!(unresolved_refs(&slice), ReferenceSet::from(["A".to_string()]));
    }

    #[test]
    fn non_schema_refs_do_not_fail_validation() {
        let slice = json!({
            "paths": { "/a": { "get": { "parameters": [{ "$ref": "#/components/parameters/P" }] } } },
            "components": { "schemas": {} }
        });
        let mut diagnostics = Vec::new();
        assert!(validate_slice(&slice, "/a", "get", &mut diagnostics));
    }
}
