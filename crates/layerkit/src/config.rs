//! Engine configuration, loadable from TOML.
//!
//! ```toml
//! [fetch]
//! timeout_secs = 10
//!
//! [expression.defines]
//! big = "${pop} > 1000000"
//!
//! [pipeline]
//! delegated_types = ["mvt"]
//!
//! [log]
//! filter = "layerkit=debug"
//! ```

use crate::error::ConfigError;
use crate::model::DataType;
use layerkit_expression::Defines;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub fetch: FetchConfig,
    pub expression: ExpressionConfig,
    pub pipeline: PipelineConfig,
    pub log: LogConfig,
}

impl EngineConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: concat!("layerkit/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpressionConfig {
    /// Expression fragments available as `${name}` in every expression.
    pub defines: Defines,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Data types whose features are pushed in by an external producer.
    pub delegated_types: Vec<DataType>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default `tracing` filter directive; `RUST_LOG` takes precedence.
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_is_default() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.fetch.timeout_secs, 30);
        assert!(config.fetch.user_agent.starts_with("layerkit/"));
        assert_eq!(config.log.filter, "info");
    }

    #[test]
    fn test_sections() {
        let config = EngineConfig::from_toml_str(
            r#"
            [fetch]
            timeout_secs = 5

            [expression.defines]
            big = "${pop} > 1000000"

            [pipeline]
            delegated_types = ["mvt", "3dtiles"]
            "#,
        )
        .unwrap();
        assert_eq!(config.fetch.timeout_secs, 5);
        assert_eq!(config.expression.defines["big"], "${pop} > 1000000");
        assert_eq!(
            config.pipeline.delegated_types,
            vec![DataType::Mvt, DataType::Tiles3d]
        );
    }

    #[test]
    fn test_invalid_toml() {
        assert!(matches!(
            EngineConfig::from_toml_str("[fetch]\ntimeout_secs = \"soon\""),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            EngineConfig::load("/nonexistent/layerkit.toml"),
            Err(ConfigError::Io { .. })
        ));
    }
}
