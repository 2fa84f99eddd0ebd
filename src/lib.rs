//! OpenAPI Endpoint Slicer
//!
//! Splits an OpenAPI 3.x document into one self-contained document per
//! operation, each carrying only the `components.schemas` entries that the
//! operation transitively references. The slices are small enough to hand to
//! a generative model that writes a test collection per endpoint; the
//! collections are then merged into one.
//!
//! # Example
//!
//! ```
//! use spec_slicer::{process_all, slice_endpoint, SliceOptions};
//! use serde_json::json;
//!
//! let spec = json!({
//!     "openapi": "3.0.0",
//!     "info": { "title": "Store", "version": "1" },
//!     "paths": {
//!         "/orders": {
//!             "post": {
//!                 "requestBody": { "content": { "application/json": {
//!                     "schema": { "$ref": "#/components/schemas/Order" }
//!                 } } }
//!             }
//!         }
//!     },
//!     "components": { "schemas": {
//!         "Order": { "properties": { "customer": { "$ref": "#/components/schemas/Customer" } } },
//!         "Customer": { "type": "object" },
//!         "Unused": { "type": "string" }
//!     } }
//! });
//!
//! let slice = slice_endpoint(&spec, "/orders", "post", &SliceOptions::default()).unwrap();
//! let schemas = slice.document["components"]["schemas"].as_object().unwrap();
//! assert!(schemas.contains_key("Order"));
//! assert!(schemas.contains_key("Customer"));
//! assert!(!schemas.contains_key("Unused"));
//!
//! let records = process_all(&spec, &SliceOptions::default());
//! assert_eq!(records.len(), 1);
//! assert!(records[0].is_valid);
//! ```
//!
//! # Diagnostics
//!
//! | Code | Severity | Meaning |
//! |------|----------|---------|
//! | `E001` | error | endpoint not found in the document |
//! | `E002` | error | slice references schemas it does not contain |
//! | `W001` | warning | referenced schema not defined in the source |
//! | `W002` | warning | dependency expansion stopped at the depth bound |
//! | `W003` | warning | slice file name collided and was given a suffix |
//!
//! Only references of the form `#/components/schemas/<Name>` are schema
//! dependencies. Other `$ref` targets are left alone.

mod catalog;
mod closure;
mod collection;
mod diagnostic;
mod error;
mod generator;
mod loader;
mod refs;
mod repair;
mod slicer;
mod types;
mod validator;

pub use catalog::{
    endpoint_file_name, list_endpoints, process_all, process_endpoints, save_records,
    EndpointRecord,
};
pub use closure::{dependency_closure, expand_closure, Closure};
pub use collection::{
    merge_collection_files, merge_collections, validate_collection, write_json, CollectionSource,
    MergeReport,
};
pub use diagnostic::{Diagnostic, Severity};
pub use error::{
    CollectionError, GenerateError, LoadError, LookupError, RepairError, SchemaError,
};
pub use generator::{
    build_user_prompt, collection_file_name, generate_collection, generate_collection_file,
    read_event_stream, CollectionModel, GeneratorConfig, SYSTEM_PROMPT,
};
pub use loader::{is_url, load_spec, load_spec_auto, load_spec_str};
pub use refs::{scan_refs, schema_name};
pub use repair::{clean_and_parse, strip_fences};
pub use slicer::{slice_endpoint, EndpointSlice};
pub use types::{json_type_name, EndpointKey, ReferenceSet, SliceOptions, DEFAULT_MAX_DEPTH};
pub use validator::{unresolved_refs, validate_slice};

#[cfg(feature = "remote")]
pub use generator::AnthropicClient;
#[cfg(feature = "remote")]
pub use loader::load_spec_url;
