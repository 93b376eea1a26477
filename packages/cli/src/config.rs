use redline_editor::EditorConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_NAME: &str = "redline.config.json";

/// Redline configuration file format
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Engine settings (tracking, history, highlight)
    #[serde(flatten)]
    pub editor: EditorConfig,

    /// Output format used when `--format` isn't given
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

impl Config {
    /// Load config from `explicit`, or from the default file in `cwd` if there is one
    pub fn load(cwd: &str, explicit: Option<&Path>) -> anyhow::Result<Self> {
        let config_path = match explicit {
            Some(path) => path.to_path_buf(),
            None => PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else if explicit.is_some() {
            Err(anyhow::anyhow!("Config file not found: {}", config_path.display()))
        } else {
            Ok(Config::default())
        }
    }
}
