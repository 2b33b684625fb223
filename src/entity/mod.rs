//! Result entities.
//!
//! An [`Entity`] is an immutable attribute view over one record. An
//! [`EntityCollection`] wraps an already-fetched record set and only builds
//! entities when they are indexed or iterated.

pub mod factory;

use serde::de::DeserializeOwned;
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::ops::Index;
use std::sync::Arc;

use crate::adapter::{Attributes, Record, RecordSet};
use crate::inflect;

pub use factory::EntityFactory;

static NULL: Value = Value::Null;

/// Builds an entity of a given type from one record's attributes.
pub type Constructor = Arc<dyn Fn(&EntityType, Attributes) -> Entity + Send + Sync>;

/// Named entity type, either registered explicitly or synthesized by convention.
///
/// Every type carries the constructor used to build its entities. Synthesized
/// types wrap attributes unchanged.
#[derive(Clone)]
pub struct EntityType {
    name: Arc<str>,
    constructor: Option<Constructor>,
}

impl EntityType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Arc::from(name.into()),
            constructor: None,
        }
    }

    /// A type whose entities are built by `constructor`.
    ///
    /// ```
    /// use get::entity::{Entity, EntityType};
    /// use serde_json::json;
    ///
    /// let account = EntityType::with_constructor("Account", |ty, mut attributes| {
    ///     attributes.insert("kind".to_string(), json!("account"));
    ///     Entity::new(ty.clone(), attributes)
    /// });
    /// let entity = account.construct(serde_json::Map::new());
    /// assert_eq!(entity["kind"], json!("account"));
    /// ```
    pub fn with_constructor<F>(name: impl Into<String>, constructor: F) -> Self
    where
        F: Fn(&EntityType, Attributes) -> Entity + Send + Sync + 'static,
    {
        Self {
            name: Arc::from(name.into()),
            constructor: Some(Arc::new(constructor)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn has_constructor(&self) -> bool {
        self.constructor.is_some()
    }

    /// Build one entity of this type.
    pub fn construct(&self, attributes: Attributes) -> Entity {
        match &self.constructor {
            Some(constructor) => constructor(self, attributes),
            None => Entity::new(self.clone(), attributes),
        }
    }

    /// Element type for a collection type (`GetUsers` -> `GetUser`). The
    /// constructor carries over to the elements.
    pub fn singular(&self) -> EntityType {
        EntityType {
            name: Arc::from(inflect::singularize(&self.name)),
            constructor: self.constructor.clone(),
        }
    }
}

impl PartialEq for EntityType {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for EntityType {}

impl fmt::Debug for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityType")
            .field("name", &self.name)
            .field("constructor", &self.constructor.is_some())
            .finish()
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// One record, exposed by attribute name.
#[derive(Debug, Clone)]
pub struct Entity {
    entity_type: EntityType,
    attributes: Attributes,
}

impl Entity {
    pub fn new(entity_type: EntityType, attributes: Attributes) -> Self {
        Self {
            entity_type,
            attributes,
        }
    }

    pub fn entity_type(&self) -> &EntityType {
        &self.entity_type
    }

    pub fn get(&self, attribute: &str) -> Option<&Value> {
        self.attributes.get(attribute)
    }

    pub fn contains(&self, attribute: &str) -> bool {
        self.attributes.contains_key(attribute)
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn into_attributes(self) -> Attributes {
        self.attributes
    }

    /// Convert into a caller-defined struct.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(Value::Object(self.attributes.clone()))
    }
}

impl PartialEq for Entity {
    fn eq(&self, other: &Self) -> bool {
        self.attributes == other.attributes
    }
}

impl Index<&str> for Entity {
    type Output = Value;

    /// Missing attributes read as `null`.
    fn index(&self, attribute: &str) -> &Value {
        self.attributes.get(attribute).unwrap_or(&NULL)
    }
}

impl Serialize for Entity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.attributes.serialize(serializer)
    }
}

impl From<&Entity> for Value {
    fn from(entity: &Entity) -> Self {
        Value::Object(entity.attributes.clone())
    }
}

/// Lazy view over a fetched record set.
#[derive(Debug, Clone)]
pub struct EntityCollection {
    collection_type: EntityType,
    element_type: EntityType,
    records: RecordSet,
}

impl EntityCollection {
    pub fn new(collection_type: EntityType, records: RecordSet) -> Self {
        Self {
            element_type: collection_type.singular(),
            collection_type,
            records,
        }
    }

    pub fn collection_type(&self) -> &EntityType {
        &self.collection_type
    }

    pub fn element_type(&self) -> &EntityType {
        &self.element_type
    }

    pub fn records(&self) -> &RecordSet {
        &self.records
    }

    fn wrap(&self, record: &Record) -> Entity {
        self.element_type.construct(record.to_hash())
    }

    pub fn get(&self, index: usize) -> Option<Entity> {
        self.records.get(index).map(|record| self.wrap(record))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn size(&self) -> usize {
        self.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn is_present(&self) -> bool {
        !self.is_empty()
    }

    pub fn first(&self) -> Option<Entity> {
        self.records.first().map(|record| self.wrap(record))
    }

    pub fn last(&self) -> Option<Entity> {
        self.records.last().map(|record| self.wrap(record))
    }

    /// Restartable: every call walks the record set again.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            collection: self,
            records: self.records.iter(),
        }
    }
}

impl PartialEq for EntityCollection {
    fn eq(&self, other: &Self) -> bool {
        self.records == other.records
    }
}

impl Serialize for EntityCollection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

/// Iterator producing entities one record at a time.
pub struct Iter<'a> {
    collection: &'a EntityCollection,
    records: std::slice::Iter<'a, Record>,
}

impl Iterator for Iter<'_> {
    type Item = Entity;

    fn next(&mut self) -> Option<Entity> {
        self.records.next().map(|record| self.collection.wrap(record))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.records.size_hint()
    }
}

impl ExactSizeIterator for Iter<'_> {}

impl<'a> IntoIterator for &'a EntityCollection {
    type Item = Entity;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Iter<'a> {
        self.iter()
    }
}

/// What a compiled query returns.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Output {
    Single(Entity),
    Collection(EntityCollection),
}

impl Output {
    pub fn is_collection(&self) -> bool {
        matches!(self, Output::Collection(_))
    }

    pub fn as_single(&self) -> Option<&Entity> {
        match self {
            Output::Single(entity) => Some(entity),
            Output::Collection(_) => None,
        }
    }

    pub fn as_collection(&self) -> Option<&EntityCollection> {
        match self {
            Output::Collection(collection) => Some(collection),
            Output::Single(_) => None,
        }
    }

    pub fn into_single(self) -> Option<Entity> {
        match self {
            Output::Single(entity) => Some(entity),
            Output::Collection(_) => None,
        }
    }

    pub fn into_collection(self) -> Option<EntityCollection> {
        match self {
            Output::Collection(collection) => Some(collection),
            Output::Single(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde::Deserialize;
    use serde_json::json;

    fn attrs(value: Value) -> Attributes {
        value.as_object().unwrap().clone()
    }

    fn users() -> EntityCollection {
        let records = vec![
            Record::new(attrs(json!({"id": 1, "name": "Ann"}))),
            Record::new(attrs(json!({"id": 2, "name": "Bob"}))),
            Record::new(attrs(json!({"id": 3, "name": "Cy"}))),
        ];
        EntityCollection::new(EntityType::new("GetUsers"), records.into())
    }

    #[test]
    fn test_entity_attribute_access() {
        let user = Entity::new(
            EntityType::new("GetUser"),
            attrs(json!({"id": 1, "email": "a@example.com"})),
        );
        assert_eq!(user.get("email"), Some(&json!("a@example.com")));
        assert_eq!(user["id"], json!(1));
        assert_eq!(user["missing"], Value::Null);
        assert!(user.contains("id"));
        assert!(!user.contains("name"));
    }

    #[test]
    fn test_entity_value_equality() {
        let a = Entity::new(EntityType::new("GetUser"), attrs(json!({"id": 1})));
        let b = Entity::new(EntityType::new("Account"), attrs(json!({"id": 1})));
        let c = Entity::new(EntityType::new("GetUser"), attrs(json!({"id": 2})));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_entity_deserialize() {
        #[derive(Deserialize, Debug, PartialEq)]
        struct User {
            id: u64,
            email: String,
        }

        let entity = Entity::new(
            EntityType::new("GetUser"),
            attrs(json!({"id": 4, "email": "d@example.com", "extra": true})),
        );
        assert_eq!(
            entity.deserialize::<User>().unwrap(),
            User {
                id: 4,
                email: "d@example.com".to_string()
            }
        );
    }

    #[test]
    fn test_collection_indexing_and_aggregates() {
        let users = users();
        assert_eq!(users.len(), 3);
        assert_eq!(users.size(), 3);
        assert!(users.is_present());
        assert!(!users.is_empty());
        assert_eq!(users.element_type().name(), "GetUser");

        let bob = users.get(1).unwrap();
        assert_eq!(bob["name"], json!("Bob"));
        assert_eq!(bob.entity_type().name(), "GetUser");
        assert_eq!(users.first().unwrap()["name"], json!("Ann"));
        assert_eq!(users.last().unwrap()["name"], json!("Cy"));
        assert_eq!(users.get(3), None);
    }

    #[test]
    fn test_collection_iteration_is_restartable() {
        let users = users();
        let names: Vec<Value> = users.iter().map(|u| u["name"].clone()).collect();
        assert_eq!(names, vec![json!("Ann"), json!("Bob"), json!("Cy")]);

        let again: Vec<Value> = (&users).into_iter().map(|u| u["id"].clone()).collect();
        assert_eq!(again, vec![json!(1), json!(2), json!(3)]);
        assert_eq!(users.iter().len(), 3);
    }

    #[test]
    fn test_constructor_builds_elements() {
        let typed = EntityType::with_constructor("Members", |ty, mut attributes| {
            let name = attributes["name"].as_str().unwrap_or_default().to_uppercase();
            attributes.insert("shout".to_string(), json!(name));
            Entity::new(ty.clone(), attributes)
        });
        let members = EntityCollection::new(typed, users().records().clone());

        let bob = members.get(1).unwrap();
        assert_eq!(bob["shout"], json!("BOB"));
        assert_eq!(bob.entity_type().name(), "Member");
        assert!(members.element_type().has_constructor());
        assert!(!EntityType::new("GetUser").has_constructor());
    }

    #[test]
    fn test_empty_collection() {
        let empty = EntityCollection::new(EntityType::new("GetPosts"), RecordSet::default());
        assert!(empty.is_empty());
        assert!(!empty.is_present());
        assert_eq!(empty.first(), None);
        assert_eq!(empty.last(), None);
        assert_eq!(empty.iter().count(), 0);
    }

    #[test]
    fn test_output_serializes_as_plain_json() {
        let output = Output::Collection(users());
        let value = serde_json::to_value(&output).unwrap();
        assert_eq!(value[1], json!({"id": 2, "name": "Bob"}));
        assert!(output.is_collection());
        assert!(output.as_single().is_none());
    }
}
