//! Translation between storage field names and feature names

use crate::error::{Result, RuntimeError};
use std::collections::HashMap;

/// Invertible mapping from internal storage field names to external feature
/// names. Names without an entry map to themselves.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldMapping {
    to_external: HashMap<String, String>,
    to_internal: HashMap<String, String>,
}

impl FieldMapping {
    /// Build a mapping from `internal field -> external feature name` pairs.
    ///
    /// Fails if two fields map to the same feature name.
    pub fn new(mapping: HashMap<String, String>) -> Result<Self> {
        let mut to_internal = HashMap::with_capacity(mapping.len());
        for (internal, external) in &mapping {
            if let Some(previous) = to_internal.insert(external.clone(), internal.clone()) {
                return Err(RuntimeError::InvalidArgument(format!(
                    "field mapping is not invertible: '{}' and '{}' both map to '{}'",
                    previous, internal, external
                )));
            }
        }
        Ok(Self {
            to_external: mapping,
            to_internal,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.to_external.is_empty()
    }

    pub fn to_external(&self, internal: &str) -> String {
        self.to_external
            .get(internal)
            .cloned()
            .unwrap_or_else(|| internal.to_string())
    }

    pub fn to_internal(&self, external: &str) -> String {
        self.to_internal
            .get(external)
            .cloned()
            .unwrap_or_else(|| external.to_string())
    }

    pub fn internal_names(&self, external: &[String]) -> Vec<String> {
        external.iter().map(|name| self.to_internal(name)).collect()
    }

    /// `internal -> external` entries
    pub fn external_names(&self) -> &HashMap<String, String> {
        &self.to_external
    }

    /// `external -> internal` entries
    pub fn internal_lookup(&self) -> &HashMap<String, String> {
        &self.to_internal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(a, b)| (a.to_string(), b.to_string()))
            .collect()
    }

    #[test]
    fn test_round_trip() {
        let m = FieldMapping::new(mapping(&[("fname", "first_name")])).unwrap();
        assert_eq!(m.to_external("fname"), "first_name");
        assert_eq!(m.to_internal("first_name"), "fname");
        assert_eq!(m.to_internal("age"), "age");
        assert_eq!(
            m.internal_names(&["first_name".to_string(), "id".to_string()]),
            vec!["fname", "id"]
        );
    }

    #[test]
    fn test_not_invertible() {
        let err = FieldMapping::new(mapping(&[("a", "x"), ("b", "x")])).unwrap_err();
        assert!(matches!(err, RuntimeError::InvalidArgument(_)));
        assert!(err.to_string().contains("'x'"));
    }
}
