//! Test collection shape checking and merging.
//!
//! Generated collections follow the Postman Collection v2.1 layout. Only the
//! parts the merger relies on are enforced: an object with an `item` array.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use serde_json::{json, Value};

use crate::error::{CollectionError, SchemaError};

/// Schema URL declared by merged collections.
pub const COLLECTION_SCHEMA_URL: &str =
    "https://schema.getpostman.com/json/collection/v2.1.0/collection.json";

/// Name of the merged collection.
pub const MERGED_NAME: &str = "Postman Collection";

/// Description of the merged collection.
pub const MERGED_DESCRIPTION: &str =
    "Comprehensive regression testing for a given API with maximum test coverage";

/// Collection variables every generated test may use.
pub const COLLECTION_VARIABLES: &[&str] = &["base_url", "app_key"];

fn collection_shape() -> &'static Value {
    static SHAPE: OnceLock<Value> = OnceLock::new();
    SHAPE.get_or_init(|| {
        json!({
            "type": "object",
            "required": ["item"],
            "properties": {
                "info": {
                    "type": "object",
                    "properties": {
                        "name": { "type": "string" },
                        "schema": { "type": "string" }
                    }
                },
                "item": {
                    "type": "array",
                    "items": { "type": "object" }
                },
                "variable": { "type": "array" }
            }
        })
    })
}

/// Check that a value has the collection layout the merger expects.
///
/// # Errors
///
/// Returns `CollectionError::Invalid` listing every violation.
pub fn validate_collection(collection: &Value) -> Result<(), CollectionError> {
    let validator = jsonschema::validator_for(collection_shape()).map_err(|e| {
        CollectionError::InvalidSchema {
            message: e.to_string(),
        }
    })?;

    let errors: Vec<SchemaError> = validator
        .iter_errors(collection)
        .map(|e| SchemaError {
            path: e.instance_path.to_string(),
            message: e.to_string(),
        })
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(CollectionError::Invalid { errors })
    }
}

/// One collection to merge.
#[derive(Debug, Clone)]
pub struct CollectionSource {
    /// Folder name in the merged collection, usually the file stem.
    pub name: String,
    /// Where the collection came from, recorded in the folder description.
    pub origin: String,
    pub collection: Value,
}

/// Outcome of merging collections.
#[derive(Debug, Clone)]
pub struct MergeReport {
    /// The merged collection.
    pub merged: Value,
    /// Number of folders in the merged collection.
    pub folders: usize,
    /// Sources left out, with the reason.
    pub skipped: Vec<(String, String)>,
}

/// Merge collections into one, with a folder per source.
///
/// Sources without a top-level `item` array are skipped and reported.
pub fn merge_collections(sources: &[CollectionSource]) -> MergeReport {
    let mut folders = Vec::new();
    let mut skipped = Vec::new();

    for source in sources {
        match source.collection.get("item").and_then(Value::as_array) {
            Some(items) => folders.push(json!({
                "name": source.name,
                "item": items,
                "description": format!("Tests from {}", source.origin),
                "event": [],
                "variable": []
            })),
            None => skipped.push((source.origin.clone(), "no 'item' array found".to_string())),
        }
    }

    let variables: Vec<Value> = COLLECTION_VARIABLES
        .iter()
        .map(|key| json!({ "key": key, "value": "" }))
        .collect();

    MergeReport {
        folders: folders.len(),
        merged: json!({
            "info": {
                "name": MERGED_NAME,
                "description": MERGED_DESCRIPTION,
                "schema": COLLECTION_SCHEMA_URL
            },
            "item": folders,
            "variable": variables
        }),
        skipped,
    }
}

/// Read collection files, merge them, and write the result to `output`.
///
/// Files that cannot be read or parsed are skipped and reported rather
/// than failing the merge.
///
/// # Errors
///
/// Returns `CollectionError` only if the merged collection cannot be written.
pub fn merge_collection_files(
    files: &[PathBuf],
    output: &Path,
) -> Result<MergeReport, CollectionError> {
    let mut sources = Vec::new();
    let mut unreadable = Vec::new();

    for file in files {
        let origin = file.display().to_string();
        let parsed = std::fs::read_to_string(file)
            .map_err(|e| format!("cannot read: {}", e))
            .and_then(|content| {
                serde_json::from_str::<Value>(&content).map_err(|e| format!("invalid JSON: {}", e))
            });

        match parsed {
            Ok(collection) => sources.push(CollectionSource {
                name: file_stem(file),
                origin,
                collection,
            }),
            Err(reason) => unreadable.push((origin, reason)),
        }
    }

    let mut report = merge_collections(&sources);
    report.skipped.extend(unreadable);

    write_json(&report.merged, output)?;
    Ok(report)
}

/// Write a value as pretty-printed JSON, creating parent directories.
pub fn write_json(value: &Value, path: &Path) -> Result<(), CollectionError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| CollectionError::WriteError {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let json =
        serde_json::to_string_pretty(value).map_err(|source| CollectionError::Serialize { source })?;
    std::fs::write(path, json).map_err(|source| CollectionError::WriteError {
        path: path.to_path_buf(),
        source,
    })
}

pub(crate) fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn source(name: &str, collection: Value) -> CollectionSource {
        CollectionSource {
            name: name.to_string(),
            origin: format!("output_data/{}.json", name),
            collection,
        }
    }

    #[test]
    fn valid_collection() {
        let collection = json!({
            "info": { "name": "Pets", "schema": COLLECTION_SCHEMA_URL },
            "item": [{ "name": "list pets", "request": { "method": "GET" } }]
        });
        assert!(validate_collection(&collection).is_ok());
    }

    #[test]
    fn collection_missing_item() {
        let result = validate_collection(&json!({ "info": { "name": "x" } }));
        assert!(matches!(result, Err(CollectionError::Invalid { .. })));
    }

    #[test]
    fn collection_with_wrong_types_lists_each_error() {
        let result = validate_collection(&json!({ "info": { "name": 3 }, "item": ["x"] }));
        match result {
            Err(CollectionError::Invalid { errors }) => {
                assert_eq!(errors.len(), 2);
                let paths: Vec<&str> = errors.iter().map(|e| e.path.as_str()).collect();
                assert!(paths.contains(&"/info/name"));
                assert!(paths.contains(&"/item/0"));
            }
            other => panic!("expected invalid collection, got {:?}", other),
        }
    }

    #[test]
    fn merge_creates_folder_per_source() {
        let report = merge_collections(&[
            source("get_pets_collection", json!({ "item": [{ "name": "a" }, { "name": "b" }] })),
            source("post_pets_collection", json!({ "item": [{ "name": "c" }] })),
        ]);

        assert_eq!(report.folders, 2);
        assert!(report.skipped.is_empty());

        let merged = &report.merged;
        assert_eq!(merged["info"]["name"], MERGED_NAME);
        assert_eq!(merged["info"]["schema"], COLLECTION_SCHEMA_URL);
        assert_eq!(merged["item"][0]["name"], "get_pets_collection");
        assert_eq!(merged["item"][0]["item"].as_array().unwrap().len(), 2);
        assert_eq!(
            merged["item"][1]["description"],
            "Tests from output_data/post_pets_collection.json"
        );
        assert_eq!(
            merged["variable"],
            json!([{ "key": "base_url", "value": "" }, { "key": "app_key", "value": "" }])
        );
        assert!(validate_collection(merged).is_ok());
    }

    #[test]
    fn merge_skips_sources_without_items() {
        let report = merge_collections(&[
            source("broken", json!({ "info": {} })),
            source("ok", json!({ "item": [] })),
        ]);
        assert_eq!(report.folders, 1);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].0, "output_data/broken.json");
    }

    #[test]
    fn merge_files_skips_unreadable() {
        let dir = TempDir::new().unwrap();
        let good = dir.path().join("get_pets_collection.json");
        std::fs::write(&good, r#"{"item": [{"name": "a"}]}"#).unwrap();
        let bad = dir.path().join("bad_collection.json");
        std::fs::write(&bad, "not json").unwrap();
        let missing = dir.path().join("missing.json");
        let output = dir.path().join("out").join("merged.json");

        let report = merge_collection_files(&[good, bad, missing], &output).unwrap();
        assert_eq!(report.folders, 1);
        assert_eq!(report.skipped.len(), 2);

        let written: Value =
            serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(written, report.merged);
        assert_eq!(written["item"][0]["name"], "get_pets_collection");
    }
}
