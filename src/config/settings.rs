//! Configuration settings for Gjort.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub store: StoreSettings,
    pub model: ModelSettings,
    pub chat: ChatSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for storing application data.
    pub data_dir: String,
    /// Default owner identity for CLI commands (overridden by --user).
    pub default_user: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.gjort".to_string(),
            default_user: "default".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Task and conversation store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// Store provider (sqlite, memory).
    pub provider: String,
    /// Path to SQLite database (for sqlite provider).
    pub sqlite_path: String,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            provider: "sqlite".to_string(),
            sqlite_path: "~/.gjort/gjort.db".to_string(),
        }
    }
}

/// Language model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    /// Chat model to use for the agent.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Maximum tokens per completion.
    pub max_tokens: u32,
    /// Custom API base URL for OpenAI-compatible services (optional).
    pub api_base: Option<String>,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            temperature: 0.7,
            max_tokens: 1024,
            api_base: None,
        }
    }
}

/// Chat orchestration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatSettings {
    /// Number of recent messages loaded as agent context.
    pub context_messages: usize,
    /// Maximum model round-trips per user message.
    pub max_iterations: usize,
    /// Default page size for history retrieval.
    pub history_page_size: usize,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            context_messages: 50,
            max_iterations: 5,
            history_page_size: 50,
        }
    }
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to the default configuration file.
    pub fn save(&self) -> crate::error::Result<()> {
        self.save_to(&Self::default_config_path())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::GjortError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("gjort")
            .join("config.toml")
    }

    /// Set one configuration value by dotted key (e.g. "model.model").
    ///
    /// The value string is parsed to match the type of the existing entry;
    /// unknown keys and unparseable values are rejected.
    pub fn set_value(&mut self, key: &str, value: &str) -> crate::error::Result<()> {
        use crate::error::GjortError;

        let unknown = || GjortError::Config(format!("Unknown configuration key: {}", key));

        let mut root =
            toml::Value::try_from(&*self).map_err(|e| GjortError::Config(e.to_string()))?;

        let mut node = &mut root;
        let mut parts = key.split('.').peekable();
        while let Some(part) = parts.next() {
            if parts.peek().is_some() {
                node = node.get_mut(part).ok_or_else(unknown)?;
            } else {
                let table = node.as_table_mut().ok_or_else(unknown)?;
                let parsed = match table.get(part) {
                    Some(toml::Value::Integer(_)) => toml::Value::Integer(
                        value
                            .parse()
                            .map_err(|_| GjortError::Config(format!("Expected an integer for {}: {}", key, value)))?,
                    ),
                    Some(toml::Value::Float(_)) => toml::Value::Float(
                        value
                            .parse()
                            .map_err(|_| GjortError::Config(format!("Expected a number for {}: {}", key, value)))?,
                    ),
                    Some(toml::Value::Boolean(_)) => toml::Value::Boolean(
                        value
                            .parse()
                            .map_err(|_| GjortError::Config(format!("Expected true or false for {}: {}", key, value)))?,
                    ),
                    _ => toml::Value::String(value.to_string()),
                };
                table.insert(part.to_string(), parsed);
            }
        }

        let updated: Settings = root
            .try_into()
            .map_err(|e| GjortError::Config(e.to_string()))?;

        // A typo key is silently dropped on deserialization; catch it by
        // checking the key survived the round trip.
        let check =
            toml::Value::try_from(&updated).map_err(|e| GjortError::Config(e.to_string()))?;
        let mut cursor = &check;
        for part in key.split('.') {
            cursor = cursor.get(part).ok_or_else(unknown)?;
        }

        *self = updated;
        Ok(())
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    /// Get the expanded SQLite database path.
    pub fn sqlite_path(&self) -> PathBuf {
        Self::expand_path(&self.store.sqlite_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.model.model, "gpt-4o-mini");
        assert_eq!(settings.chat.max_iterations, 5);
        assert_eq!(settings.chat.context_messages, 50);
        assert_eq!(settings.store.provider, "sqlite");
    }

    #[test]
    fn test_set_value_string() {
        let mut settings = Settings::default();
        settings
            .set_value("model.model", "llama-3.3-70b-versatile")
            .unwrap();
        assert_eq!(settings.model.model, "llama-3.3-70b-versatile");
    }

    #[test]
    fn test_set_value_typed() {
        let mut settings = Settings::default();

        settings.set_value("chat.max_iterations", "8").unwrap();
        assert_eq!(settings.chat.max_iterations, 8);

        settings.set_value("model.temperature", "0.2").unwrap();
        assert_eq!(settings.model.temperature, 0.2);

        // Optional field absent from the defaults can still be set
        settings
            .set_value("model.api_base", "https://api.groq.com/openai/v1")
            .unwrap();
        assert_eq!(
            settings.model.api_base.as_deref(),
            Some("https://api.groq.com/openai/v1")
        );
    }

    #[test]
    fn test_set_value_rejects_unknown_key() {
        let mut settings = Settings::default();
        assert!(settings.set_value("model.flavor", "spicy").is_err());
        assert!(settings.set_value("nonsense", "x").is_err());
    }

    #[test]
    fn test_set_value_rejects_bad_number() {
        let mut settings = Settings::default();
        assert!(settings.set_value("chat.max_iterations", "lots").is_err());
        // Settings untouched on failure
        assert_eq!(settings.chat.max_iterations, 5);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            [model]
            model = "llama-3.3-70b-versatile"
            api_base = "https://api.groq.com/openai/v1"
            "#,
        )
        .unwrap();

        assert_eq!(settings.model.model, "llama-3.3-70b-versatile");
        assert_eq!(
            settings.model.api_base.as_deref(),
            Some("https://api.groq.com/openai/v1")
        );
        assert_eq!(settings.chat.max_iterations, 5);
    }
}
