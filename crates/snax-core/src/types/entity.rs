//! Entities: named concepts identified by one or more join keys

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

/// Name of the synthetic entity used for sources declared without entities
pub const DUMMY_ENTITY_NAME: &str = "__dummy";

/// Join key of the synthetic dummy entity
pub const DUMMY_ENTITY_ID: &str = "__dummy_id";

/// Named concept identified by an ordered, non-empty list of join keys.
///
/// Equality and hashing use the name and the join keys; tags are ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "EntityDef", into = "EntityDef")]
pub struct Entity {
    name: String,
    join_keys: Vec<String>,
    tags: HashMap<String, String>,
}

impl Entity {
    /// Create an entity. Fails if `join_keys` is empty.
    pub fn new<S: Into<String>>(name: impl Into<String>, join_keys: Vec<S>) -> Result<Self> {
        let name = name.into();
        let join_keys: Vec<String> = join_keys.into_iter().map(Into::into).collect();
        if join_keys.is_empty() {
            return Err(CoreError::InvalidArgument(format!(
                "entity '{}' must have at least one join key",
                name
            )));
        }
        Ok(Self {
            name,
            join_keys,
            tags: HashMap::new(),
        })
    }

    /// The synthetic `__dummy` entity keyed by `__dummy_id`
    pub fn dummy() -> Self {
        Self {
            name: DUMMY_ENTITY_NAME.to_string(),
            join_keys: vec![DUMMY_ENTITY_ID.to_string()],
            tags: HashMap::new(),
        }
    }

    pub fn with_tags(mut self, tags: HashMap<String, String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn join_keys(&self) -> &[String] {
        &self.join_keys
    }

    pub fn tags(&self) -> &HashMap<String, String> {
        &self.tags
    }
}

impl PartialEq for Entity {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.join_keys == other.join_keys
    }
}

impl Eq for Entity {}

impl Hash for Entity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.join_keys.hash(state);
    }
}

/// Serialized form of an entity
#[derive(Debug, Clone, Serialize, Deserialize)]
struct EntityDef {
    name: String,
    join_keys: Vec<String>,
    #[serde(default)]
    tags: HashMap<String, String>,
}

impl TryFrom<EntityDef> for Entity {
    type Error = CoreError;

    fn try_from(def: EntityDef) -> Result<Self> {
        Ok(Entity::new(def.name, def.join_keys)?.with_tags(def.tags))
    }
}

impl From<Entity> for EntityDef {
    fn from(entity: Entity) -> Self {
        EntityDef {
            name: entity.name,
            join_keys: entity.join_keys,
            tags: entity.tags,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_join_keys_rejected() {
        let result = Entity::new("user", Vec::<String>::new());
        assert!(matches!(result, Err(CoreError::InvalidArgument(_))));
    }

    #[test]
    fn test_equality_ignores_tags() {
        let mut tags = HashMap::new();
        tags.insert("owner".to_string(), "team-a".to_string());
        let a = Entity::new("user", vec!["user_id"]).unwrap();
        let b = Entity::new("user", vec!["user_id"]).unwrap().with_tags(tags);
        assert_eq!(a, b);
        assert_ne!(a, Entity::new("user", vec!["user_id", "day"]).unwrap());
    }

    #[test]
    fn test_deserialize_validates() {
        let ok: Entity = serde_yaml::from_str("name: user\njoin_keys: [user_id]\n").unwrap();
        assert_eq!(ok.join_keys(), &["user_id".to_string()]);

        let err = serde_yaml::from_str::<Entity>("name: user\njoin_keys: []\n");
        assert!(err.is_err());
    }

    #[test]
    fn test_dummy() {
        let dummy = Entity::dummy();
        assert_eq!(dummy.name(), DUMMY_ENTITY_NAME);
        assert_eq!(dummy.join_keys(), &[DUMMY_ENTITY_ID.to_string()]);
    }
}
