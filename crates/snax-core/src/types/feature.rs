//! Features: named, typed columns

use super::value_type::ValueType;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

/// Named column descriptor with a semantic type.
///
/// Equality and hashing use name and type only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feature {
    pub name: String,

    #[serde(default)]
    pub dtype: ValueType,

    #[serde(default)]
    pub tags: HashMap<String, String>,
}

impl Feature {
    pub fn new(name: impl Into<String>, dtype: ValueType) -> Self {
        Self {
            name: name.into(),
            dtype,
            tags: HashMap::new(),
        }
    }

    pub fn with_tags(mut self, tags: HashMap<String, String>) -> Self {
        self.tags = tags;
        self
    }
}

impl PartialEq for Feature {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.dtype == other.dtype
    }
}

impl Eq for Feature {}

impl Hash for Feature {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.dtype.hash(state);
    }
}
