//! Wrapper layer configuration

use serde::{Deserialize, Serialize};

/// Configuration for a [`Context`](crate::Context). Missing fields
/// deserialize to their defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Prefix of generated wrapper identifiers (`<prefix>_<uuid>`)
    pub uid_prefix: String,
    /// Expando property the identifier is stamped under
    pub uid_property: String,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            uid_prefix: "yui".to_string(),
            uid_property: "_yuid".to_string(),
        }
    }
}

impl NodeConfig {
    /// Fresh identifier
    pub fn next_uid(&self) -> String {
        format!("{}_{}", self.uid_prefix, uuid::Uuid::new_v4().simple())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_from_json() {
        let config: NodeConfig = serde_json::from_str(r#"{"uid_prefix": "app"}"#).unwrap();
        assert_eq!(config.uid_property, "_yuid");
        assert!(config.next_uid().starts_with("app_"));

        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["uid_prefix"], "app");
    }
}
