//! Schema loader
//!
//! Reads a schema overview from a single JSON file:
//! `{ "collections": { ... }, "relations": [ ... ] }`
//!
//! Loaded schemas are validated before use; a schema that references unknown
//! collections is rejected rather than failing later during compilation.

use std::fs;
use std::path::Path;

use crate::observability::Logger;

use super::errors::{SchemaError, SchemaResult};
use super::types::SchemaOverview;

impl SchemaOverview {
    /// Parses and validates a schema overview from a JSON string.
    pub fn from_json_str(content: &str) -> SchemaResult<Self> {
        let schema: SchemaOverview = serde_json::from_str(content)
            .map_err(|e| SchemaError::malformed("<in-memory>", format!("Invalid JSON: {}", e)))?;

        schema.validate().map_err(SchemaError::Inconsistent)?;

        Ok(schema)
    }

    /// Loads and validates a schema overview from disk.
    pub fn load(path: &Path) -> SchemaResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| SchemaError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        let schema: SchemaOverview = serde_json::from_str(&content).map_err(|e| {
            SchemaError::malformed(path.display().to_string(), format!("Invalid JSON: {}", e))
        })?;

        schema.validate().map_err(SchemaError::Inconsistent)?;

        let path_text = path.display().to_string();
        let collections = schema.collections.len().to_string();
        let relations = schema.relations.len().to_string();
        Logger::info(
            "SCHEMA_LOADED",
            &[
                ("path", path_text.as_str()),
                ("collections", collections.as_str()),
                ("relations", relations.as_str()),
            ],
        );

        Ok(schema)
    }
}
