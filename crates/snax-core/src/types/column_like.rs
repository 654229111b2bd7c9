//! Heterogeneous column references
//!
//! Anywhere a column is expected, callers may pass an entity (standing for its
//! join keys), a feature (standing for its name) or a raw column name.

use super::entity::Entity;
use super::feature::Feature;
use super::value_type::ValueType;
use crate::error::{CoreError, Result};

/// Reference to one or more columns
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ColumnLike {
    Entity(Entity),
    Feature(Feature),
    Name(String),
}

impl ColumnLike {
    /// Field names this reference stands for
    pub fn field_names(&self) -> Vec<String> {
        match self {
            ColumnLike::Entity(entity) => entity.join_keys().to_vec(),
            ColumnLike::Feature(feature) => vec![feature.name.clone()],
            ColumnLike::Name(name) => vec![name.clone()],
        }
    }
}

/// Flatten column references into field names.
///
/// Order is preserved and duplicates are kept, so the same column may be
/// referenced twice on purpose.
pub fn resolve(columns: &[ColumnLike]) -> Vec<String> {
    columns.iter().flat_map(ColumnLike::field_names).collect()
}

impl From<&str> for ColumnLike {
    fn from(name: &str) -> Self {
        ColumnLike::Name(name.to_string())
    }
}

impl From<String> for ColumnLike {
    fn from(name: String) -> Self {
        ColumnLike::Name(name)
    }
}

impl From<&String> for ColumnLike {
    fn from(name: &String) -> Self {
        ColumnLike::Name(name.clone())
    }
}

impl From<Entity> for ColumnLike {
    fn from(entity: Entity) -> Self {
        ColumnLike::Entity(entity)
    }
}

impl From<&Entity> for ColumnLike {
    fn from(entity: &Entity) -> Self {
        ColumnLike::Entity(entity.clone())
    }
}

impl From<Feature> for ColumnLike {
    fn from(feature: Feature) -> Self {
        ColumnLike::Feature(feature)
    }
}

impl From<&Feature> for ColumnLike {
    fn from(feature: &Feature) -> Self {
        ColumnLike::Feature(feature.clone())
    }
}

impl TryFrom<serde_json::Value> for ColumnLike {
    type Error = CoreError;

    /// Decode a dynamic column reference.
    ///
    /// A string is a raw name, `{"entity": .., "join_keys": [..]}` an entity and
    /// `{"feature": .., "dtype": ..}` a feature.
    fn try_from(value: serde_json::Value) -> Result<Self> {
        match &value {
            serde_json::Value::String(name) => Ok(ColumnLike::Name(name.clone())),
            serde_json::Value::Object(map) => {
                if let Some(name) = map.get("entity").and_then(|v| v.as_str()) {
                    let join_keys = map
                        .get("join_keys")
                        .and_then(|v| v.as_array())
                        .map(|keys| {
                            keys.iter()
                                .filter_map(|k| k.as_str().map(str::to_string))
                                .collect::<Vec<_>>()
                        })
                        .unwrap_or_default();
                    return Ok(ColumnLike::Entity(Entity::new(name, join_keys)?));
                }
                if let Some(name) = map.get("feature").and_then(|v| v.as_str()) {
                    let dtype = map
                        .get("dtype")
                        .and_then(|v| v.as_str())
                        .map(|s| s.parse::<ValueType>().unwrap_or_default())
                        .unwrap_or_default();
                    return Ok(ColumnLike::Feature(Feature::new(name, dtype)));
                }
                Err(unsupported(&value))
            }
            _ => Err(unsupported(&value)),
        }
    }
}

fn unsupported(value: &serde_json::Value) -> CoreError {
    CoreError::TypeError(format!(
        "column reference must be an entity, a feature or a column name, got {}",
        value
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_resolve_keeps_order_and_duplicates() {
        let user = Entity::new("user", vec!["user_id", "day"]).unwrap();
        let columns = vec![
            ColumnLike::from(&user),
            ColumnLike::from(Feature::new("age", ValueType::Int)),
            ColumnLike::from("age"),
        ];
        assert_eq!(resolve(&columns), vec!["user_id", "day", "age", "age"]);
    }

    #[test]
    fn test_resolve_empty() {
        assert!(resolve(&[]).is_empty());
    }

    #[test]
    fn test_try_from_json() {
        assert_eq!(
            ColumnLike::try_from(json!("a")).unwrap(),
            ColumnLike::Name("a".to_string())
        );
        let entity = ColumnLike::try_from(json!({"entity": "user", "join_keys": ["id"]})).unwrap();
        assert_eq!(entity.field_names(), vec!["id"]);
        let feature = ColumnLike::try_from(json!({"feature": "age", "dtype": "int"})).unwrap();
        assert_eq!(feature, ColumnLike::Feature(Feature::new("age", ValueType::Int)));
    }

    #[test]
    fn test_try_from_json_rejects_other_shapes() {
        assert!(matches!(ColumnLike::try_from(json!(42)), Err(CoreError::TypeError(_))));
        assert!(matches!(
            ColumnLike::try_from(json!({"column": "a"})),
            Err(CoreError::TypeError(_))
        ));
    }
}
