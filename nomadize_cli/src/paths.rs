//! Centralized path management for the nomadize CLI

use std::path::PathBuf;

/// The name of the application directory used across all platforms
const APP_DIR: &str = "nomadize";

/// The name of the configuration file
const CONFIG_FILE: &str = "config.toml";

/// Returns the configuration directory
///
/// `$XDG_CONFIG_HOME/nomadize` when set, otherwise the platform config
/// directory (`~/.config/nomadize` on Linux,
/// `~/Library/Application Support/nomadize` on macOS). Falls back to
/// `.nomadize` in the current directory.
pub fn get_config_dir() -> PathBuf {
    #[cfg(not(target_os = "windows"))]
    if let Some(xdg_config) = std::env::var_os("XDG_CONFIG_HOME").filter(|v| !v.is_empty()) {
        return PathBuf::from(xdg_config).join(APP_DIR);
    }

    dirs::config_dir()
        .map(|d| d.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from(".nomadize"))
}

/// Returns the path to the configuration file
pub fn get_config_path() -> PathBuf {
    get_config_dir().join(CONFIG_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_dir_contains_app_name() {
        let config_dir = get_config_dir();
        assert!(
            config_dir.to_string_lossy().contains("nomadize"),
            "Config dir should contain 'nomadize': {}",
            config_dir.display()
        );
    }

    #[test]
    fn test_config_path_is_in_config_dir() {
        let config_path = get_config_path();
        let config_dir = get_config_dir();

        assert!(config_path.starts_with(&config_dir));
        assert_eq!(
            config_path.file_name().and_then(|n| n.to_str()),
            Some(CONFIG_FILE)
        );
    }
}
