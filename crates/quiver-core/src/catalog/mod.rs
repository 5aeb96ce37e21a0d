//! Catalog module - Label/Type/Key mappings
//!
//! The catalog maintains bidirectional mappings between:
//! - Labels (node labels) ↔ LabelId
//! - Types (relationship types) ↔ TypeId
//! - Keys (property keys) ↔ KeyId
//!
//! Ids are dense and assigned in first-seen order, so they double as
//! indexes into the schema tables. The catalog also tracks one property
//! schema per label and per relationship type, plus the all-nodes and
//! all-relationships schemas that aggregate every key ever observed on
//! that entity kind.

use std::collections::HashMap;

/// Label ID type
pub type LabelId = u32;

/// Relationship type ID
pub type TypeId = u32;

/// Property key ID
pub type KeyId = u32;

/// Ordered set of property keys observed on one store.
///
/// Key order is first-observed order and never changes afterwards;
/// re-adding a known key is a no-op.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    key_ids: Vec<KeyId>,
}

impl Schema {
    /// Add every key not already present, preserving observation order.
    pub fn update(&mut self, keys: &[KeyId]) {
        for &key in keys {
            if !self.key_ids.contains(&key) {
                self.key_ids.push(key);
            }
        }
    }

    /// Keys in observation order.
    pub fn key_ids(&self) -> &[KeyId] {
        &self.key_ids
    }

    /// True if the key has been observed on this store.
    pub fn contains(&self, key: KeyId) -> bool {
        self.key_ids.contains(&key)
    }
}

/// Catalog for managing label/type/key mappings and property schemas.
#[derive(Debug, Default)]
pub struct Catalog {
    /// Label name → ID mapping
    label_name_to_id: HashMap<String, LabelId>,
    /// Label ID → name mapping (dense)
    label_names: Vec<String>,
    /// Per-label property schema, indexed by LabelId
    node_schemas: Vec<Schema>,

    /// Type name → ID mapping
    type_name_to_id: HashMap<String, TypeId>,
    /// Type ID → name mapping (dense)
    type_names: Vec<String>,
    /// Per-type property schema, indexed by TypeId
    relation_schemas: Vec<Schema>,

    /// Key name → ID mapping
    key_name_to_id: HashMap<String, KeyId>,
    /// Key ID → name mapping (dense)
    key_names: Vec<String>,

    /// Keys observed on any node
    all_nodes_schema: Schema,
    /// Keys observed on any relationship
    all_relations_schema: Schema,
}

impl Catalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the ID for a label, creating it (and its schema slot) if new
    pub fn get_or_create_label(&mut self, label: &str) -> LabelId {
        if let Some(&id) = self.label_name_to_id.get(label) {
            return id;
        }
        let id = self.label_names.len() as LabelId;
        self.label_name_to_id.insert(label.to_string(), id);
        self.label_names.push(label.to_string());
        self.node_schemas.push(Schema::default());
        id
    }

    /// Look up a label ID by name
    pub fn get_label_id(&self, label: &str) -> Option<LabelId> {
        self.label_name_to_id.get(label).copied()
    }

    /// Look up a label name by ID
    pub fn get_label_name(&self, id: LabelId) -> Option<&str> {
        self.label_names.get(id as usize).map(String::as_str)
    }

    /// Number of distinct labels
    pub fn label_count(&self) -> usize {
        self.label_names.len()
    }

    /// Get the ID for a relationship type, creating it if new
    pub fn get_or_create_type(&mut self, type_name: &str) -> TypeId {
        if let Some(&id) = self.type_name_to_id.get(type_name) {
            return id;
        }
        let id = self.type_names.len() as TypeId;
        self.type_name_to_id.insert(type_name.to_string(), id);
        self.type_names.push(type_name.to_string());
        self.relation_schemas.push(Schema::default());
        id
    }

    /// Look up a relationship type ID by name
    pub fn get_type_id(&self, type_name: &str) -> Option<TypeId> {
        self.type_name_to_id.get(type_name).copied()
    }

    /// Look up a relationship type name by ID
    pub fn get_type_name(&self, id: TypeId) -> Option<&str> {
        self.type_names.get(id as usize).map(String::as_str)
    }

    /// Number of distinct relationship types
    pub fn type_count(&self) -> usize {
        self.type_names.len()
    }

    /// Get the ID for a property key, creating it if new
    pub fn get_or_create_key(&mut self, key: &str) -> KeyId {
        if let Some(&id) = self.key_name_to_id.get(key) {
            return id;
        }
        let id = self.key_names.len() as KeyId;
        self.key_name_to_id.insert(key.to_string(), id);
        self.key_names.push(key.to_string());
        id
    }

    /// Look up a property key ID by name
    pub fn get_key_id(&self, key: &str) -> Option<KeyId> {
        self.key_name_to_id.get(key).copied()
    }

    /// Look up a property key name by ID
    pub fn get_key_name(&self, id: KeyId) -> Option<&str> {
        self.key_names.get(id as usize).map(String::as_str)
    }

    /// Number of distinct property keys
    pub fn key_count(&self) -> usize {
        self.key_names.len()
    }

    /// Record keys on a label's schema and on the all-nodes schema.
    ///
    /// Unknown label ids are ignored (the caller interned the label first).
    pub fn update_node_schema(&mut self, label: LabelId, keys: &[KeyId]) {
        if let Some(schema) = self.node_schemas.get_mut(label as usize) {
            schema.update(keys);
        }
        self.all_nodes_schema.update(keys);
    }

    /// Record keys on a type's schema and on the all-relationships schema.
    pub fn update_relation_schema(&mut self, type_id: TypeId, keys: &[KeyId]) {
        if let Some(schema) = self.relation_schemas.get_mut(type_id as usize) {
            schema.update(keys);
        }
        self.all_relations_schema.update(keys);
    }

    /// Property schema for one label
    pub fn node_schema(&self, label: LabelId) -> Option<&Schema> {
        self.node_schemas.get(label as usize)
    }

    /// Property schema for one relationship type
    pub fn relation_schema(&self, type_id: TypeId) -> Option<&Schema> {
        self.relation_schemas.get(type_id as usize)
    }

    /// Schema aggregating keys seen on any node
    pub fn all_nodes_schema(&self) -> &Schema {
        &self.all_nodes_schema
    }

    /// Schema aggregating keys seen on any relationship
    pub fn all_relations_schema(&self) -> &Schema {
        &self.all_relations_schema
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_interning_is_idempotent() {
        let mut catalog = Catalog::new();
        let person = catalog.get_or_create_label("Person");
        let city = catalog.get_or_create_label("City");
        assert_eq!(person, 0);
        assert_eq!(city, 1);
        assert_eq!(catalog.get_or_create_label("Person"), person);
        assert_eq!(catalog.label_count(), 2);
        assert_eq!(catalog.get_label_name(person), Some("Person"));
        assert_eq!(catalog.get_label_id("City"), Some(city));
        assert_eq!(catalog.get_label_id("Country"), None);
    }

    #[test]
    fn test_type_and_key_interning() {
        let mut catalog = Catalog::new();
        let knows = catalog.get_or_create_type("KNOWS");
        let name = catalog.get_or_create_key("name");
        let age = catalog.get_or_create_key("age");
        assert_eq!(knows, 0);
        assert_eq!((name, age), (0, 1));
        assert_eq!(catalog.get_type_name(knows), Some("KNOWS"));
        assert_eq!(catalog.get_key_name(age), Some("age"));
        assert_eq!(catalog.key_count(), 2);
    }

    #[test]
    fn test_schema_update_feeds_both_stores() {
        let mut catalog = Catalog::new();
        let person = catalog.get_or_create_label("Person");
        let name = catalog.get_or_create_key("name");
        let age = catalog.get_or_create_key("age");

        catalog.update_node_schema(person, &[name, age]);
        catalog.update_node_schema(person, &[age]); // already known

        let schema = catalog.node_schema(person).unwrap();
        assert_eq!(schema.key_ids(), &[name, age]);
        assert!(catalog.all_nodes_schema().contains(name));
        assert!(catalog.all_nodes_schema().contains(age));
        assert!(!catalog.all_relations_schema().contains(name));
    }
}
