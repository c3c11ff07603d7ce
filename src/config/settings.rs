use crate::domain::model::SyncConfig;
use crate::domain::ports::SettingsStore;
use crate::utils::error::{Result, SyncError};
use crate::utils::validation::{validate_non_empty_string, validate_required_field, Validate};
use regex::Regex;
use std::collections::HashMap;
use std::path::Path;

pub const API_KEY: &str = "api_key";
pub const AUDIENCE_ID: &str = "audience_id";
/// Older settings name for the audience.
pub const LIST_ID: &str = "list_id";
pub const GLOBAL_TAG: &str = "global_tag";

/// Flat key-value settings read from a TOML file.
#[derive(Debug, Clone, Default)]
pub struct TomlSettings {
    values: HashMap<String, String>,
}

impl TomlSettings {
    /// Loads settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(SyncError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        let table: toml::Table =
            toml::from_str(&processed_content).map_err(|e| SyncError::ConfigValidationError {
                field: "toml_parsing".to_string(),
                message: format!("TOML parsing error: {}", e),
            })?;

        let mut values = HashMap::new();
        for (key, value) in table {
            let value = match value {
                toml::Value::String(s) => s,
                toml::Value::Integer(i) => i.to_string(),
                toml::Value::Float(f) => f.to_string(),
                toml::Value::Boolean(b) => b.to_string(),
                other => {
                    return Err(SyncError::InvalidConfigValueError {
                        field: key,
                        value: other.to_string(),
                        reason: "Settings must be scalar values".to_string(),
                    })
                }
            };
            values.insert(key, value);
        }

        Ok(Self { values })
    }

    /// Replaces `${VAR}` with the environment value; unset variables are left as-is.
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| SyncError::ConfigError {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures<'_>| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }
}

impl SettingsStore for TomlSettings {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

impl SyncConfig {
    /// Reads and validates the settings once per invocation.
    pub fn from_store(store: &dyn SettingsStore) -> Result<Self> {
        let api_key = validate_required_field(API_KEY, store.get(API_KEY).as_deref())?;

        let audience = store
            .get(AUDIENCE_ID)
            .filter(|v| !v.trim().is_empty())
            .or_else(|| store.get(LIST_ID));
        let audience_id = validate_required_field(AUDIENCE_ID, audience.as_deref())?;

        let global_tag = store
            .get(GLOBAL_TAG)
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());

        let config = Self {
            api_key,
            audience_id,
            global_tag,
        };
        config.validate()?;
        Ok(config)
    }
}

impl Validate for SyncConfig {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string(API_KEY, &self.api_key)?;
        validate_non_empty_string(AUDIENCE_ID, &self.audience_id)?;
        if self.api_key.chars().any(char::is_whitespace) {
            return Err(SyncError::InvalidConfigValueError {
                field: API_KEY.to_string(),
                value: "<redacted>".to_string(),
                reason: "API key cannot contain whitespace".to_string(),
            });
        }
        Ok(())
    }
}
