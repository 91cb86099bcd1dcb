use crate::chat::{CustomRule, Location};
use crate::i18n::Language;
use crate::session::DEFAULT_SESSION_KEY;
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Directory name used for user-level and project-level config
pub const CONFIG_DIR: &str = ".marine-portal";

/// A validation error in the configuration
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]: {}", self.field, self.message)
    }
}

/// Where the session record lives
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Storage file; defaults to ~/.marine-portal/storage.json
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default = "default_session_key")]
    pub session_key: String,
}

fn default_session_key() -> String {
    DEFAULT_SESSION_KEY.to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: None,
            session_key: default_session_key(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct UiConfig {
    #[serde(default)]
    pub language: Option<Language>,
}

/// A config-defined assistant reply
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatRuleConfig {
    /// Regex matched case-insensitively against the message
    pub pattern: String,
    pub reply: String,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct LocationConfig {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatConfig {
    #[serde(default = "default_reply_delay_ms")]
    pub reply_delay_ms: u64,
    #[serde(default = "default_max_image_bytes")]
    pub max_image_bytes: u64,
    #[serde(default)]
    pub rules: Vec<ChatRuleConfig>,
    /// Position reported by the "share location" action
    #[serde(default)]
    pub location: Option<LocationConfig>,
}

fn default_reply_delay_ms() -> u64 {
    1_000
}

fn default_max_image_bytes() -> u64 {
    5 * 1024 * 1024
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            reply_delay_ms: default_reply_delay_ms(),
            max_image_bytes: default_max_image_bytes(),
            rules: Vec::new(),
            location: None,
        }
    }
}

impl ChatConfig {
    pub fn reply_delay(&self) -> Duration {
        Duration::from_millis(self.reply_delay_ms)
    }

    /// Compile config rules, in file order
    pub fn compile_rules(&self) -> Result<Vec<CustomRule>> {
        self.rules
            .iter()
            .map(|rule| {
                CustomRule::new(&rule.pattern, &rule.reply)
                    .map_err(|e| anyhow!("invalid chat rule '{}': {}", rule.pattern, e))
            })
            .collect()
    }

    pub fn location(&self) -> Option<Location> {
        self.location
            .and_then(|l| Location::new(l.latitude, l.longitude).ok())
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub ui: UiConfig,
    #[serde(default)]
    pub chat: ChatConfig,
}

impl Config {
    /// Load configuration from default paths
    /// Priority: local (.marine-portal/config.local.toml) > project (.marine-portal/config.toml)
    /// > user (~/.marine-portal/config.toml)
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(CONFIG_DIR).join("config.toml");
            if user_config.exists() {
                let user = Self::load_from(&user_config)?;
                config.merge(user);
            }
        }

        let project_config = Path::new(CONFIG_DIR).join("config.toml");
        if project_config.exists() {
            let project = Self::load_from(&project_config)?;
            config.merge(project);
        }

        // Local overrides, should be gitignored
        let local_config = Path::new(CONFIG_DIR).join("config.local.toml");
        if local_config.exists() {
            let local = Self::load_from(&local_config)?;
            config.merge(local);
        }

        Ok(config)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Merge another config into this one (other takes priority)
    /// Chat rules are concatenated with the other config's rules first.
    pub fn merge(&mut self, other: Config) {
        if other.storage.path.is_some() {
            self.storage.path = other.storage.path;
        }
        if other.storage.session_key != DEFAULT_SESSION_KEY {
            self.storage.session_key = other.storage.session_key;
        }

        if other.ui.language.is_some() {
            self.ui.language = other.ui.language;
        }

        if other.chat.reply_delay_ms != default_reply_delay_ms() {
            self.chat.reply_delay_ms = other.chat.reply_delay_ms;
        }
        if other.chat.max_image_bytes != default_max_image_bytes() {
            self.chat.max_image_bytes = other.chat.max_image_bytes;
        }
        if other.chat.location.is_some() {
            self.chat.location = other.chat.location;
        }
        let mut rules = other.chat.rules;
        rules.append(&mut self.chat.rules);
        self.chat.rules = rules;
    }

    /// Storage file path: configured, else ~/.marine-portal/storage.json,
    /// else ./.marine-portal/storage.json
    pub fn storage_path(&self) -> PathBuf {
        if let Some(path) = &self.storage.path {
            return path.clone();
        }
        dirs::home_dir()
            .map(|home| home.join(CONFIG_DIR))
            .unwrap_or_else(|| PathBuf::from(CONFIG_DIR))
            .join("storage.json")
    }

    pub fn language(&self) -> Language {
        self.ui.language.unwrap_or_default()
    }

    /// Validate configuration and return any errors found
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if self.storage.session_key.trim().is_empty() {
            errors.push(ValidationError {
                field: "storage.session_key".to_string(),
                message: "Must not be empty".to_string(),
            });
        }

        if self.chat.max_image_bytes == 0 {
            errors.push(ValidationError {
                field: "chat.max_image_bytes".to_string(),
                message: "Must be greater than 0".to_string(),
            });
        }

        for (i, rule) in self.chat.rules.iter().enumerate() {
            if CustomRule::new(&rule.pattern, &rule.reply).is_err() {
                errors.push(ValidationError {
                    field: format!("chat.rules[{}].pattern", i),
                    message: format!("Invalid regex pattern '{}'", rule.pattern),
                });
            }
            if rule.reply.trim().is_empty() {
                errors.push(ValidationError {
                    field: format!("chat.rules[{}].reply", i),
                    message: "Reply must not be empty".to_string(),
                });
            }
        }

        if let Some(loc) = &self.chat.location {
            if let Err(e) = Location::new(loc.latitude, loc.longitude) {
                errors.push(ValidationError {
                    field: "chat.location".to_string(),
                    message: e.to_string(),
                });
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::reply_for;

    #[test]
    fn test_defaults_validate() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.storage.session_key, DEFAULT_SESSION_KEY);
        assert_eq!(config.chat.max_image_bytes, 5 * 1024 * 1024);
        assert_eq!(config.language(), Language::En);
    }

    #[test]
    fn test_load_from_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[storage]
path = "/tmp/portal.json"

[ui]
language = "ml"

[chat]
reply_delay_ms = 0

[[chat.rules]]
pattern = "mackerel"
reply = "Indian mackerel data is in the Data Explorer."

[chat.location]
latitude = 9.93
longitude = 76.26
"#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.storage_path(), PathBuf::from("/tmp/portal.json"));
        assert_eq!(config.language(), Language::Ml);
        assert_eq!(config.chat.reply_delay(), Duration::ZERO);
        assert_eq!(config.chat.compile_rules().unwrap().len(), 1);
        assert!(config.chat.location().is_some());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_uppercase_rule_pattern_matches() {
        let config: Config = toml::from_str(
            r#"
[[chat.rules]]
pattern = "IUU"
reply = "custom iuu reply"
"#,
        )
        .unwrap();
        assert!(config.validate().is_ok());
        let rules = config.chat.compile_rules().unwrap();
        assert_eq!(
            reply_for("Any IUU vessels today?", None, &rules),
            "custom iuu reply"
        );
    }

    #[test]
    fn test_unknown_language_is_rejected() {
        let result: Result<Config, _> = toml::from_str("[ui]\nlanguage = \"fr\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_merge_priority() {
        let mut base = Config::default();
        base.chat.rules.push(ChatRuleConfig {
            pattern: "base".to_string(),
            reply: "from base".to_string(),
        });
        base.ui.language = Some(Language::Ml);

        let mut over = Config::default();
        over.storage.session_key = "custom.user".to_string();
        over.chat.reply_delay_ms = 10;
        over.chat.rules.push(ChatRuleConfig {
            pattern: "over".to_string(),
            reply: "from override".to_string(),
        });

        base.merge(over);
        assert_eq!(base.storage.session_key, "custom.user");
        assert_eq!(base.chat.reply_delay_ms, 10);
        assert_eq!(base.ui.language, Some(Language::Ml));
        assert_eq!(base.chat.rules[0].pattern, "over");
        assert_eq!(base.chat.rules[1].pattern, "base");
    }

    #[test]
    fn test_validate_invalid_rule_regex() {
        let mut config = Config::default();
        config.chat.rules.push(ChatRuleConfig {
            pattern: "[invalid regex".to_string(),
            reply: "x".to_string(),
        });
        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].field.contains("chat.rules[0]"));
        assert!(errors[0].message.contains("Invalid regex"));
        assert!(config.chat.compile_rules().is_err());
    }

    #[test]
    fn test_validate_collects_all_errors() {
        let mut config = Config::default();
        config.storage.session_key = "  ".to_string();
        config.chat.max_image_bytes = 0;
        config.chat.location = Some(LocationConfig {
            latitude: 120.0,
            longitude: 0.0,
        });
        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors.iter().any(|e| e.field == "storage.session_key"));
        assert!(errors.iter().any(|e| e.field == "chat.location"));
        assert_eq!(config.chat.location(), None);
    }
}
