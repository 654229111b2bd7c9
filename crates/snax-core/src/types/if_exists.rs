//! Conflict policy for keyed inserts

use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What an insert does with incoming rows whose key is already stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IfExists {
    /// Reject the insert if it would overwrite populated data
    #[default]
    Error,
    /// Leave stored rows untouched
    Ignore,
    /// Overwrite stored rows at the given columns
    Replace,
}

impl IfExists {
    pub fn as_str(&self) -> &'static str {
        match self {
            IfExists::Error => "error",
            IfExists::Ignore => "ignore",
            IfExists::Replace => "replace",
        }
    }
}

impl fmt::Display for IfExists {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IfExists {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "error" => Ok(IfExists::Error),
            "ignore" => Ok(IfExists::Ignore),
            "replace" => Ok(IfExists::Replace),
            other => Err(CoreError::InvalidArgument(format!(
                "if_exists must be one of [error, ignore, replace], got '{}'",
                other
            ))),
        }
    }
}
