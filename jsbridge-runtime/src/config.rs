// Runtime configuration, loaded from a `jsbridge.toml`-style file.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, BridgeResult};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BridgeConfig {
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub registration: RegistrationConfig,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DispatchConfig {
    /// Turn panics in host functions into script exceptions.
    #[serde(default = "default_true")]
    pub catch_panics: bool,
    /// Log calls whose argument count differs from the declared one.
    #[serde(default)]
    pub log_arity_mismatch: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        DispatchConfig {
            catch_panics: true,
            log_arity_mismatch: false,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegistrationConfig {
    /// Register every `#[js_type]` when a context is created instead of on
    /// first wrap.
    #[serde(default)]
    pub eager_inventory: bool,
}

fn default_true() -> bool {
    true
}

impl BridgeConfig {
    pub fn from_toml_str(source: &str) -> BridgeResult<Self> {
        toml::from_str(source).map_err(|e| BridgeError::Config(e.to_string()))
    }

    pub fn load(path: impl AsRef<Path>) -> BridgeResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|e| BridgeError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = BridgeConfig::from_toml_str("").unwrap();
        assert_eq!(config, BridgeConfig::default());
        assert!(config.dispatch.catch_panics);
        assert!(!config.registration.eager_inventory);
    }

    #[test]
    fn sections_override_defaults() {
        let config = BridgeConfig::from_toml_str(concat!(
            "[dispatch]\ncatch_panics = false\nlog_arity_mismatch = true\n\n",
            "[registration]\neager_inventory = true\n",
        ))
        .unwrap();
        assert!(!config.dispatch.catch_panics);
        assert!(config.dispatch.log_arity_mismatch);
        assert!(config.registration.eager_inventory);
    }

    #[test]
    fn unknown_keys_are_config_errors() {
        let err = BridgeConfig::from_toml_str("[dispatch]\ncatch_panic = true\n").unwrap_err();
        assert!(matches!(err, BridgeError::Config(_)));
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let err = BridgeConfig::load("/nonexistent/jsbridge.toml").unwrap_err();
        assert!(matches!(err, BridgeError::Config(msg) if msg.contains("jsbridge.toml")));
    }
}
