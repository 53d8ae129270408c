use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use swap_client::{ClientConfig, DEFAULT_TIMEOUT};
use swap_core::{DEFAULT_COLUMNS, DEFAULT_ROWS};

/// Console configuration loaded from a JSON file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CliConfig {
    pub api_base_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub grid: GridDefaults,
}

/// Grid dimensions requested when a command does not give its own
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GridDefaults {
    pub rows: u32,
    pub columns: u32,
}

impl Default for GridDefaults {
    fn default() -> Self {
        GridDefaults {
            rows: DEFAULT_ROWS,
            columns: DEFAULT_COLUMNS,
        }
    }
}

impl GridDefaults {
    pub fn resolve(&self, rows: Option<u32>, columns: Option<u32>) -> (u32, u32) {
        (rows.unwrap_or(self.rows), columns.unwrap_or(self.columns))
    }
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}

impl CliConfig {
    pub async fn load(path: &Path) -> anyhow::Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
        let config: CliConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file '{}'", path.display()))?;
        tracing::info!(
            "Loaded config from {}: {}",
            path.display(),
            config.api_base_url
        );
        Ok(config)
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::new(self.api_base_url.clone())
            .with_timeout(Duration::from_secs(self.timeout_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_config_serialization() {
        let config = CliConfig {
            api_base_url: "https://swap.example.com/api".to_string(),
            timeout_secs: 5,
            access_token: Some("token".to_string()),
            grid: GridDefaults {
                rows: 3,
                columns: 4,
            },
        };

        let json = serde_json::to_string_pretty(&config).unwrap();
        assert!(json.contains("\"apiBaseUrl\""));

        let deserialized: CliConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config.api_base_url, deserialized.api_base_url);
        assert_eq!(config.timeout_secs, deserialized.timeout_secs);
        assert_eq!(config.grid, deserialized.grid);
    }

    #[test]
    fn test_json_defaults() {
        let json = r#"{ "apiBaseUrl": "http://localhost:4000/api" }"#;

        let config: CliConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.timeout_secs, 10);
        assert!(config.access_token.is_none());
        assert_eq!(config.grid, GridDefaults::default());
        assert_eq!(config.client_config().timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_grid_defaults_resolve() {
        let defaults = GridDefaults::default();
        assert_eq!(defaults.resolve(None, None), (2, 5));
        assert_eq!(defaults.resolve(Some(4), None), (4, 5));
        assert_eq!(defaults.resolve(None, Some(3)), (2, 3));
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let error = CliConfig::load(Path::new("/nonexistent/swapctl.json"))
            .await
            .unwrap_err();
        assert!(error.to_string().contains("Failed to read config file"));
    }
}
