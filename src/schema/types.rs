//! Schema overview types
//!
//! The compiler only needs a read-only view of the database structure:
//! - collections with their primary key and typed fields
//! - the ordered list of relations between collections
//!
//! Relation kinds are never stored; they are derived from which side of a
//! relation a path segment matches (see `query::relations`).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Field types understood by the compiler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldType {
    String,
    Text,
    Integer,
    BigInteger,
    Float,
    Decimal,
    Boolean,
    Uuid,
    Date,
    DateTime,
    Time,
    Timestamp,
    Json,
    Csv,
    Hash,
    Geometry,
    /// Virtual field without a column (o2m / m2m accessors)
    Alias,
    #[serde(other)]
    Unknown,
}

impl FieldType {
    /// Returns the type name as it appears in schema files
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Text => "text",
            FieldType::Integer => "integer",
            FieldType::BigInteger => "bigInteger",
            FieldType::Float => "float",
            FieldType::Decimal => "decimal",
            FieldType::Boolean => "boolean",
            FieldType::Uuid => "uuid",
            FieldType::Date => "date",
            FieldType::DateTime => "dateTime",
            FieldType::Time => "time",
            FieldType::Timestamp => "timestamp",
            FieldType::Json => "json",
            FieldType::Csv => "csv",
            FieldType::Hash => "hash",
            FieldType::Geometry => "geometry",
            FieldType::Alias => "alias",
            FieldType::Unknown => "unknown",
        }
    }

    /// Textual columns take part in `LOWER(..) LIKE` search
    pub fn is_textual(&self) -> bool {
        matches!(self, FieldType::String | FieldType::Text)
    }

    /// Numeric columns get their comparands cast to numbers
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            FieldType::Integer | FieldType::BigInteger | FieldType::Float | FieldType::Decimal
        )
    }
}

/// A single field of a collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldOverview {
    #[serde(rename = "type")]
    pub field_type: FieldType,
}

impl FieldOverview {
    pub fn new(field_type: FieldType) -> Self {
        Self { field_type }
    }
}

/// A collection (table) with its primary key and fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionOverview {
    /// Name of the primary key field
    pub primary: String,
    /// Fields by name, iterated in name order
    #[serde(default)]
    pub fields: BTreeMap<String, FieldOverview>,
}

impl CollectionOverview {
    /// Create a collection with the given primary key and no other fields
    pub fn new(primary: impl Into<String>) -> Self {
        Self {
            primary: primary.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Builder-style field registration
    pub fn with_field(mut self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.fields.insert(name.into(), FieldOverview::new(field_type));
        self
    }

    /// Type of a field, if declared
    pub fn field_type(&self, name: &str) -> Option<FieldType> {
        self.fields.get(name).map(|f| f.field_type)
    }
}

/// Optional relation metadata
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationMeta {
    /// Reverse accessor name on the related collection (o2m side)
    #[serde(default)]
    pub one_field: Option<String>,
    /// Discriminator column holding the target collection name (m2a)
    #[serde(default)]
    pub one_collection_field: Option<String>,
    /// Collections a many-to-any field may point at
    #[serde(default)]
    pub one_allowed_collections: Option<Vec<String>>,
}

/// A foreign key relation from `collection.field` to `related_collection`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    /// Collection holding the foreign key
    pub collection: String,
    /// Foreign key field
    pub field: String,
    /// Target collection; absent for many-to-any relations
    #[serde(default)]
    pub related_collection: Option<String>,
    #[serde(default)]
    pub meta: Option<RelationMeta>,
}

impl Relation {
    /// Create a plain many-to-one relation
    pub fn many_to_one(
        collection: impl Into<String>,
        field: impl Into<String>,
        related_collection: impl Into<String>,
    ) -> Self {
        Self {
            collection: collection.into(),
            field: field.into(),
            related_collection: Some(related_collection.into()),
            meta: None,
        }
    }

    /// Create a many-to-any relation with its discriminator column
    pub fn many_to_any(
        collection: impl Into<String>,
        field: impl Into<String>,
        collection_field: impl Into<String>,
        allowed: Vec<String>,
    ) -> Self {
        Self {
            collection: collection.into(),
            field: field.into(),
            related_collection: None,
            meta: Some(RelationMeta {
                one_collection_field: Some(collection_field.into()),
                one_allowed_collections: Some(allowed),
                ..RelationMeta::default()
            }),
        }
    }

    /// Expose the reverse (o2m) accessor on the related collection
    pub fn with_one_field(mut self, one_field: impl Into<String>) -> Self {
        let meta = self.meta.get_or_insert_with(RelationMeta::default);
        meta.one_field = Some(one_field.into());
        self
    }

    pub fn one_field(&self) -> Option<&str> {
        self.meta.as_ref().and_then(|m| m.one_field.as_deref())
    }

    pub fn one_collection_field(&self) -> Option<&str> {
        self.meta
            .as_ref()
            .and_then(|m| m.one_collection_field.as_deref())
    }

    pub fn one_allowed_collections(&self) -> Option<&[String]> {
        self.meta
            .as_ref()
            .and_then(|m| m.one_allowed_collections.as_deref())
    }
}

/// Read-only view of collections and relations used during compilation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaOverview {
    #[serde(default)]
    pub collections: BTreeMap<String, CollectionOverview>,
    #[serde(default)]
    pub relations: Vec<Relation>,
}

impl SchemaOverview {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style collection registration
    pub fn with_collection(mut self, name: impl Into<String>, collection: CollectionOverview) -> Self {
        self.collections.insert(name.into(), collection);
        self
    }

    /// Builder-style relation registration
    pub fn with_relation(mut self, relation: Relation) -> Self {
        self.relations.push(relation);
        self
    }

    pub fn collection(&self, name: &str) -> Option<&CollectionOverview> {
        self.collections.get(name)
    }

    /// Primary key of a collection, if the collection is known
    pub fn primary_key(&self, collection: &str) -> Option<&str> {
        self.collections.get(collection).map(|c| c.primary.as_str())
    }

    /// Type of `collection.field`, if both are known
    pub fn field_type(&self, collection: &str, field: &str) -> Option<FieldType> {
        self.collections
            .get(collection)
            .and_then(|c| c.field_type(field))
    }

    /// Checks that every relation points at known collections and that each
    /// collection declares its primary key.
    pub fn validate(&self) -> Result<(), String> {
        for (name, collection) in &self.collections {
            if !collection.fields.is_empty() && !collection.fields.contains_key(&collection.primary) {
                return Err(format!(
                    "Collection '{}' does not declare its primary key '{}'",
                    name, collection.primary
                ));
            }
        }

        for relation in &self.relations {
            if !self.collections.contains_key(&relation.collection) {
                return Err(format!(
                    "Relation '{}.{}' references unknown collection '{}'",
                    relation.collection, relation.field, relation.collection
                ));
            }

            match &relation.related_collection {
                Some(related) if !self.collections.contains_key(related) => {
                    return Err(format!(
                        "Relation '{}.{}' references unknown collection '{}'",
                        relation.collection, relation.field, related
                    ));
                }
                Some(_) => {}
                None => {
                    if relation.one_collection_field().is_none() {
                        return Err(format!(
                            "Many-to-any relation '{}.{}' has no one_collection_field",
                            relation.collection, relation.field
                        ));
                    }
                    for allowed in relation.one_allowed_collections().unwrap_or_default() {
                        if !self.collections.contains_key(allowed) {
                            return Err(format!(
                                "Relation '{}.{}' allows unknown collection '{}'",
                                relation.collection, relation.field, allowed
                            ));
                        }
                    }
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn blog_schema() -> SchemaOverview {
        SchemaOverview::new()
            .with_collection(
                "articles",
                CollectionOverview::new("id")
                    .with_field("id", FieldType::Integer)
                    .with_field("author", FieldType::Integer),
            )
            .with_collection(
                "users",
                CollectionOverview::new("id").with_field("id", FieldType::Integer),
            )
            .with_relation(Relation::many_to_one("articles", "author", "users").with_one_field("articles"))
    }

    #[test]
    fn test_field_type_names() {
        assert_eq!(FieldType::BigInteger.type_name(), "bigInteger");
        assert_eq!(FieldType::DateTime.type_name(), "dateTime");
        assert!(FieldType::Text.is_textual());
        assert!(FieldType::Decimal.is_numeric());
        assert!(!FieldType::Uuid.is_numeric());
    }

    #[test]
    fn test_deserialize_schema_overview() {
        let schema: SchemaOverview = serde_json::from_value(json!({
            "collections": {
                "articles": {
                    "primary": "id",
                    "fields": {
                        "id": { "type": "integer" },
                        "title": { "type": "string" },
                        "location": { "type": "geometry" },
                        "extra": { "type": "somethingNew" }
                    }
                }
            },
            "relations": [
                { "collection": "articles", "field": "author", "related_collection": null,
                  "meta": { "one_collection_field": "collection", "one_allowed_collections": [] } },
                { "collection": "articles_tags", "field": "tag", "related_collection": "articles",
                  "meta": { "one_field": "tags", "junction_field": "article" } }
            ]
        }))
        .unwrap();

        assert_eq!(schema.primary_key("articles"), Some("id"));
        assert_eq!(schema.field_type("articles", "title"), Some(FieldType::String));
        assert_eq!(schema.field_type("articles", "extra"), Some(FieldType::Unknown));
        assert_eq!(schema.relations[0].one_collection_field(), Some("collection"));
        assert!(schema.relations[0].related_collection.is_none());
        assert_eq!(schema.relations[1].one_field(), Some("tags"));
    }

    #[test]
    fn test_validate_accepts_consistent_schema() {
        assert!(blog_schema().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_dangling_relation() {
        let schema = blog_schema().with_relation(Relation::many_to_one("articles", "editor", "editors"));
        let err = schema.validate().unwrap_err();
        assert!(err.contains("editors"));
    }

    #[test]
    fn test_validate_rejects_missing_primary_field() {
        let schema = SchemaOverview::new().with_collection(
            "tags",
            CollectionOverview::new("id").with_field("name", FieldType::String),
        );
        assert!(schema.validate().is_err());
    }

    #[test]
    fn test_one_field_builder() {
        let relation = Relation::many_to_one("comments", "article", "articles").with_one_field("comments");
        assert_eq!(relation.one_field(), Some("comments"));
        assert_eq!(relation.one_collection_field(), None);
    }
}
