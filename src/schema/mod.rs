//! Schema overview subsystem
//!
//! Provides the read-only description of collections, fields and relations
//! that the query compiler resolves filter paths against.

mod errors;
mod loader;
mod types;

pub use errors::{SchemaError, SchemaResult};
pub use types::{
    CollectionOverview, FieldOverview, FieldType, Relation, RelationMeta, SchemaOverview,
};
