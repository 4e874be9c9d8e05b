use crate::paths;
use anyhow::{Context, Result};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use nomadize_core::directory::MIN_BUFFER_SIZE;
use nomadize_core::{DEFAULT_ACCOUNTS_ROOT, QueryConfig, SearchScope, ToolPaths};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Environment variable prefix; `__` separates nested keys
pub const ENV_PREFIX: &str = "NOMADIZE_";

#[derive(Deserialize, Serialize, Debug, Default, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub directory: QueryConfig,

    #[serde(default)]
    pub migration: MigrationConfig,

    #[serde(default)]
    pub tools: ToolPaths,

    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct MigrationConfig {
    /// Directory holding the local home directories
    pub accounts_root: PathBuf,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct OutputConfig {
    pub color_enabled: bool,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            accounts_root: PathBuf::from(DEFAULT_ACCOUNTS_ROOT),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            color_enabled: true,
        }
    }
}

impl AppConfig {
    /// Apply CLI argument overrides to the configuration
    pub fn apply_cli_overrides(&mut self, scope: Option<SearchScope>) {
        if let Some(scope) = scope {
            self.directory.scope = scope;
        }
    }
}

/// Configuration manager that handles XDG-compliant paths and layered configuration
pub struct ConfigManager {
    config_path: PathBuf,
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigManager {
    /// Create a new ConfigManager with default XDG-compliant paths
    pub fn new() -> Self {
        Self {
            config_path: paths::get_config_path(),
        }
    }

    /// Create a ConfigManager with a specific path (for testing)
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// Get the configuration file path
    pub fn get_config_path(&self) -> PathBuf {
        self.config_path.clone()
    }

    /// Load configuration with layered priority: CLI > ENV > File > Defaults
    pub fn load(&self) -> Result<AppConfig> {
        let mut figment = Figment::new();

        // Layer 1: Defaults
        figment = figment.merge(Serialized::defaults(AppConfig::default()));

        // Layer 2: Config file (if exists)
        if self.config_path.exists() {
            figment = figment.merge(Toml::file(&self.config_path));
        }

        // Layer 3: Environment variables
        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        let config: AppConfig = figment.extract().context("Failed to load configuration")?;
        config
            .directory
            .validate()
            .context("Invalid directory configuration")?;
        Ok(config)
    }

    /// Get a configuration value by key (dot notation)
    pub fn get(&self, key: &str) -> Result<String> {
        let config = self.load()?;
        let value = toml::Value::try_from(&config)?;

        let mut current = &value;
        for part in key.split('.') {
            match current {
                toml::Value::Table(table) => {
                    current = table
                        .get(part)
                        .ok_or_else(|| anyhow::anyhow!("Key '{}' not found", key))?;
                }
                _ => anyhow::bail!("Invalid key path: {}", key),
            }
        }

        match current {
            toml::Value::String(s) => Ok(s.clone()),
            toml::Value::Integer(i) => Ok(i.to_string()),
            toml::Value::Boolean(b) => Ok(b.to_string()),
            _ => anyhow::bail!("Value at '{}' is not a simple type", key),
        }
    }

    /// Set a configuration value by key (dot notation)
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.validate_config_value(key, value)?;

        let mut config = if self.config_path.exists() {
            let content = fs::read_to_string(&self.config_path)?;
            toml::from_str(&content)?
        } else {
            toml::Value::Table(toml::map::Map::new())
        };

        let parts: Vec<&str> = key.split('.').collect();
        let Some((last, parents)) = parts.split_last() else {
            anyhow::bail!("Empty key");
        };

        let mut current = &mut config;
        for part in parents {
            let toml::Value::Table(table) = current else {
                anyhow::bail!("Invalid key path: expected table at '{}'", part);
            };
            current = table
                .entry(part.to_string())
                .or_insert(toml::Value::Table(toml::map::Map::new()));
        }

        let toml::Value::Table(table) = current else {
            anyhow::bail!("Cannot set value on non-table");
        };
        table.insert(last.to_string(), self.parse_config_value(key, value)?);

        let toml_string = toml::to_string_pretty(&config)?;

        // The file must still load once the new value is merged in
        let merged: AppConfig = Figment::new()
            .merge(Serialized::defaults(AppConfig::default()))
            .merge(Toml::string(&toml_string))
            .extract()
            .with_context(|| format!("Invalid value for {key}: {value}"))?;
        merged
            .directory
            .validate()
            .with_context(|| format!("Invalid value for {key}: {value}"))?;

        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.config_path, toml_string)?;

        Ok(())
    }

    /// List all configuration values
    pub fn list(&self) -> Result<Vec<(String, String)>> {
        let config = self.load()?;
        let value = toml::Value::try_from(&config)?;

        let mut items = Vec::new();
        Self::collect_values(&value, String::new(), &mut items);
        items.sort_by(|a, b| a.0.cmp(&b.0));

        Ok(items)
    }

    /// Recursively collect all key-value pairs from TOML
    fn collect_values(value: &toml::Value, prefix: String, items: &mut Vec<(String, String)>) {
        match value {
            toml::Value::Table(table) => {
                for (key, val) in table {
                    let new_prefix = if prefix.is_empty() {
                        key.clone()
                    } else {
                        format!("{prefix}.{key}")
                    };
                    Self::collect_values(val, new_prefix, items);
                }
            }
            toml::Value::String(s) => items.push((prefix, s.clone())),
            toml::Value::Integer(i) => items.push((prefix, i.to_string())),
            toml::Value::Boolean(b) => items.push((prefix, b.to_string())),
            _ => {}
        }
    }

    /// Validate a configuration value
    fn validate_config_value(&self, key: &str, value: &str) -> Result<()> {
        match key {
            "directory.scope" => {
                value.parse::<SearchScope>()?;
            }
            "directory.node_buffer_size" | "directory.record_buffer_size" => {
                let size: u32 = value
                    .parse()
                    .context("buffer sizes must be positive integers")?;
                if size < MIN_BUFFER_SIZE {
                    anyhow::bail!("buffer sizes must be at least {MIN_BUFFER_SIZE} bytes");
                }
            }
            "migration.accounts_root" => {
                if !value.starts_with('/') {
                    anyhow::bail!("accounts_root must be an absolute path");
                }
            }
            "output.color_enabled" => {
                let _: bool = value.parse().context("Value must be 'true' or 'false'")?;
            }
            k if k.starts_with("tools.") => {
                if !value.starts_with('/') {
                    anyhow::bail!("tool paths must be absolute");
                }
            }
            _ => {} // No validation for unknown keys
        }
        Ok(())
    }

    /// Parse a value to the appropriate TOML type
    fn parse_config_value(&self, key: &str, value: &str) -> Result<toml::Value> {
        match key {
            k if k.ends_with("_size") => {
                let num: i64 = value.parse().context("Expected integer value")?;
                Ok(toml::Value::Integer(num))
            }
            k if k.ends_with("_enabled") => {
                let bool_val: bool = value
                    .parse()
                    .context("Expected boolean value (true/false)")?;
                Ok(toml::Value::Boolean(bool_val))
            }
            "directory.scope" => Ok(toml::Value::String(value.trim().to_ascii_lowercase())),
            k if k.starts_with("tools.") || k.starts_with("migration.") => {
                Ok(toml::Value::String(value.to_string()))
            }
            _ => {
                if let Ok(b) = value.parse::<bool>() {
                    Ok(toml::Value::Boolean(b))
                } else if let Ok(i) = value.parse::<i64>() {
                    Ok(toml::Value::Integer(i))
                } else {
                    Ok(toml::Value::String(value.to_string()))
                }
            }
        }
    }
}

/// Get the default configuration
pub fn get_config() -> Result<AppConfig, Box<figment::Error>> {
    ConfigManager::new()
        .load()
        .map_err(|e| Box::new(figment::Error::from(format!("{e:#}"))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.directory.scope, SearchScope::NetworkOnly);
        assert_eq!(config.migration.accounts_root, PathBuf::from("/Users"));
        assert_eq!(config.tools.dscl, PathBuf::from("/usr/bin/dscl"));
        assert!(config.output.color_enabled);
    }

    #[test]
    fn test_cli_override_wins() {
        let mut config = AppConfig::default();
        config.apply_cli_overrides(Some(SearchScope::LocalOnly));
        assert_eq!(config.directory.scope, SearchScope::LocalOnly);

        config.apply_cli_overrides(None);
        assert_eq!(config.directory.scope, SearchScope::LocalOnly);
    }

    #[test]
    fn test_parse_config_value_types() {
        let manager = ConfigManager::with_path(PathBuf::from("unused.toml"));

        assert_eq!(
            manager
                .parse_config_value("directory.node_buffer_size", "4096")
                .unwrap(),
            toml::Value::Integer(4096)
        );
        assert_eq!(
            manager
                .parse_config_value("output.color_enabled", "false")
                .unwrap(),
            toml::Value::Boolean(false)
        );
        assert_eq!(
            manager.parse_config_value("directory.scope", " Local ").unwrap(),
            toml::Value::String("local".to_string())
        );
        assert_eq!(
            manager.parse_config_value("tools.id", "/usr/bin/id").unwrap(),
            toml::Value::String("/usr/bin/id".to_string())
        );
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let manager = ConfigManager::with_path(PathBuf::from("unused.toml"));

        assert!(manager.validate_config_value("directory.scope", "ldap").is_err());
        assert!(
            manager
                .validate_config_value("directory.record_buffer_size", "64")
                .is_err()
        );
        assert!(
            manager
                .validate_config_value("migration.accounts_root", "Users")
                .is_err()
        );
        assert!(manager.validate_config_value("tools.chown", "chown").is_err());
        assert!(manager.validate_config_value("output.color_enabled", "yes").is_err());
        assert!(manager.validate_config_value("directory.scope", "combined").is_ok());
    }

    #[test]
    fn test_invalid_buffer_file_fails_to_load() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(
            &path,
            "[directory]\nnode_buffer_size = 4096\nrecord_buffer_size = 1024\n",
        )
        .unwrap();

        let error = ConfigManager::with_path(path).load().unwrap_err();

        assert!(format!("{error:#}").contains("record_buffer_size"));
    }
}
