//! Editor configuration (camelCase JSON, every field optional)

use crate::annotation::Author;
use crate::errors::EditorError;
use serde::{Deserialize, Serialize};
use chrono::Duration;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorConfig {
    #[serde(default)]
    pub tracking: TrackingConfig,

    #[serde(default)]
    pub history: HistoryConfig,

    #[serde(default)]
    pub highlight: HighlightConfig,
}

impl EditorConfig {
    pub fn from_json(json: &str) -> Result<Self, EditorError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, EditorError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingConfig {
    /// Start with track changes on
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_author_id")]
    pub author_id: String,

    #[serde(default = "default_author_name")]
    pub author_name: String,
}

fn default_author_id() -> String {
    "anonymous".to_string()
}

fn default_author_name() -> String {
    "Anonymous".to_string()
}

impl TrackingConfig {
    pub fn author(&self) -> Author {
        Author::new(&self.author_id, &self.author_name)
    }
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            author_id: default_author_id(),
            author_name: default_author_name(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryConfig {
    /// Maximum number of undo levels (0 = unlimited)
    #[serde(default = "default_max_levels")]
    pub max_levels: usize,
}

fn default_max_levels() -> usize {
    100
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_levels: default_max_levels(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HighlightConfig {
    /// How long a temporary highlight stays before it is cleared
    #[serde(default = "default_duration_ms")]
    pub duration_ms: u64,

    #[serde(default = "default_color")]
    pub default_color: String,
}

fn default_duration_ms() -> u64 {
    5000
}

fn default_color() -> String {
    "#fff59d".to_string()
}

impl HighlightConfig {
    /// Time a highlight stays up, saturating for absurd values
    pub fn duration(&self) -> Duration {
        Duration::milliseconds(i64::try_from(self.duration_ms).unwrap_or(i64::MAX))
    }
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            duration_ms: default_duration_ms(),
            default_color: default_color(),
        }
    }
}
