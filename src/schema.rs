//! The entity schema surface the compiler reads.
//!
//! The original probed duck-typed model objects for attribute presence. Here
//! the storage collaborator hands over an explicit, read-only schema: typed
//! attributes, the primary-key name, declared associations, and the entity's
//! configuration override block.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::config::EntityOverrides;
use crate::errors::ApiError;

/// Declared type of an attribute, driving value coercion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeType {
    #[default]
    String,
    Number,
    Boolean,
    /// Date or datetime; payloads get the date coercion step.
    Date,
    Other,
}

/// Whether an association points at one record or many.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssociationArity {
    One,
    Many,
}

/// One attribute of an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: AttributeType,
    /// Set when the attribute is relational.
    #[serde(default)]
    pub association: Option<AssociationArity>,
}

impl Attribute {
    pub fn new(name: impl Into<String>, kind: AttributeType) -> Self {
        Self {
            name: name.into(),
            kind,
            association: None,
        }
    }

    /// A to-many (collection-typed) attribute; never admitted as a filter
    /// field or into the selectable field set.
    #[must_use]
    pub const fn is_collection(&self) -> bool {
        matches!(self.association, Some(AssociationArity::Many))
    }
}

/// A declared association available for population.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Association {
    pub alias: String,
    pub arity: AssociationArity,
}

/// Read-only description of one entity, supplied by the storage collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySchema {
    pub name: String,
    pub primary_key: String,
    pub attributes: Vec<Attribute>,
    #[serde(default)]
    pub associations: Vec<Association>,
    /// Per-entity configuration overrides (the middle precedence tier).
    #[serde(default)]
    pub overrides: EntityOverrides,
}

impl EntitySchema {
    pub fn new(name: impl Into<String>, primary_key: impl Into<String>) -> Self {
        let name = name.into();
        let primary_key = primary_key.into();
        // The primary key is always a real attribute
        let attributes = vec![Attribute::new(primary_key.clone(), AttributeType::Number)];
        Self {
            name,
            primary_key,
            attributes,
            associations: Vec::new(),
            overrides: EntityOverrides::default(),
        }
    }

    /// Add a plain attribute (builder style, used heavily in tests).
    /// Redeclaring a name replaces the earlier entry, so the primary key's
    /// type can be corrected after `new`.
    #[must_use]
    pub fn attr(mut self, name: impl Into<String>, kind: AttributeType) -> Self {
        let attribute = Attribute::new(name, kind);
        if let Some(existing) = self
            .attributes
            .iter_mut()
            .find(|attr| attr.name == attribute.name)
        {
            *existing = attribute;
        } else {
            self.attributes.push(attribute);
        }
        self
    }

    /// Add an association attribute and its declaration in one step.
    #[must_use]
    pub fn assoc(mut self, alias: impl Into<String>, arity: AssociationArity) -> Self {
        let alias = alias.into();
        self.attributes.push(Attribute {
            name: alias.clone(),
            kind: AttributeType::Other,
            association: Some(arity),
        });
        self.associations.push(Association { alias, arity });
        self
    }

    #[must_use]
    pub fn with_overrides(mut self, overrides: EntityOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|attr| attr.name == name)
    }

    #[must_use]
    pub fn has_attribute(&self, name: &str) -> bool {
        self.attribute(name).is_some()
    }

    #[must_use]
    pub fn association(&self, alias: &str) -> Option<&Association> {
        self.associations.iter().find(|assoc| assoc.alias == alias)
    }

    /// The master field-selection list: every non-collection attribute name,
    /// trimmed and deduplicated in declaration order.
    #[must_use]
    pub fn selectable_fields(&self) -> Vec<String> {
        let mut fields: Vec<String> = Vec::with_capacity(self.attributes.len());
        for attr in &self.attributes {
            let name = attr.name.trim();
            if name.is_empty() || attr.is_collection() {
                continue;
            }
            if !fields.iter().any(|existing| existing == name) {
                fields.push(name.to_string());
            }
        }
        fields
    }
}

/// All registered entities, addressable by case-insensitive name.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    entities: HashMap<String, EntitySchema>,
}

impl SchemaRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, schema: EntitySchema) {
        self.entities.insert(schema.name.to_lowercase(), schema);
    }

    /// Look up an entity by name.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::UnknownEntity`] when nothing was registered under
    /// the name — a route misconfiguration, not a client mistake.
    pub fn get(&self, name: &str) -> Result<&EntitySchema, ApiError> {
        self.entities
            .get(&name.to_lowercase())
            .ok_or_else(|| ApiError::unknown_entity(name))
    }

    /// Resolve the entity a request's route options point at.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Configuration`] when the route names no entity at
    /// all, or [`ApiError::UnknownEntity`] when the name does not resolve.
    pub fn resolve(&self, entity: Option<&str>) -> Result<&EntitySchema, ApiError> {
        let name = entity
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| ApiError::configuration("No entity specified in route options"))?;
        self.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_schema() -> EntitySchema {
        EntitySchema::new("user", "userId")
            .attr("name", AttributeType::String)
            .attr("createdAt", AttributeType::Date)
            .assoc("posts", AssociationArity::Many)
            .assoc("profile", AssociationArity::One)
    }

    #[test]
    fn test_attribute_lookup() {
        let schema = user_schema();
        assert!(schema.has_attribute("userId"));
        assert!(schema.has_attribute("posts"));
        assert!(!schema.has_attribute("bogus"));
        assert_eq!(schema.attribute("createdAt").unwrap().kind, AttributeType::Date);
    }

    #[test]
    fn test_selectable_fields_skip_collections() {
        let schema = user_schema();
        // `posts` is a collection; `profile` is to-one and stays selectable
        assert_eq!(
            schema.selectable_fields(),
            vec!["userId", "name", "createdAt", "profile"]
        );
    }

    #[test]
    fn test_registry_lookup_is_case_insensitive() {
        let mut registry = SchemaRegistry::new();
        registry.register(user_schema());
        assert!(registry.get("User").is_ok());
        assert!(registry.get("USER").is_ok());
    }

    #[test]
    fn test_registry_unknown_entity() {
        let registry = SchemaRegistry::new();
        let err = registry.get("ghost").unwrap_err();
        assert!(matches!(err, ApiError::UnknownEntity { .. }));
    }

    #[test]
    fn test_resolve_requires_a_name() {
        let mut registry = SchemaRegistry::new();
        registry.register(user_schema());
        assert!(registry.resolve(Some("user")).is_ok());
        assert!(matches!(
            registry.resolve(None).unwrap_err(),
            ApiError::Configuration { .. }
        ));
        assert!(matches!(
            registry.resolve(Some("  ")).unwrap_err(),
            ApiError::Configuration { .. }
        ));
    }

    #[test]
    fn test_schema_deserializes() {
        let schema: EntitySchema = serde_json::from_str(
            r#"{
                "name": "task",
                "primary_key": "id",
                "attributes": [
                    {"name": "id", "type": "number"},
                    {"name": "title"},
                    {"name": "due", "type": "date"}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(schema.attribute("title").unwrap().kind, AttributeType::String);
        assert_eq!(schema.attribute("due").unwrap().kind, AttributeType::Date);
    }
}
