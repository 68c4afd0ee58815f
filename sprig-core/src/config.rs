//! Root configuration.

use serde::{Deserialize, Serialize};

/// Options for a single root.
///
/// Every field has a default, so a partial JSON document is enough:
///
/// ```rust
/// use sprig_core::RootConfig;
///
/// let config = RootConfig::from_json(r#"{ "nested_update_limit": 10 }"#).unwrap();
/// assert_eq!(config.nested_update_limit, 10);
/// assert!(config.warn_on_duplicate_keys);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RootConfig {
    /// How many render passes may be chained from effects before the root
    /// gives up with [`RenderError::NestedUpdateLimit`](crate::RenderError).
    pub nested_update_limit: u32,

    /// Log a diagnostic when two siblings share an explicit key.
    pub warn_on_duplicate_keys: bool,
}

impl RootConfig {
    pub fn from_json(source: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(source)
    }
}

impl Default for RootConfig {
    fn default() -> Self {
        Self {
            nested_update_limit: 50,
            warn_on_duplicate_keys: true,
        }
    }
}
