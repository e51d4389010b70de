//! Configuration for the hook registry
//!
//! A single TOML file controls framework-level settings:
//! - Debug logging
//! - Hooks that must never be installed
//! - Whether primitives install when attached or on first use
//!
//! # Example
//!
//! ```toml
//! version = 1
//! debug = false
//! disabled_hooks = ["C_HLTVCamera::SetMode"]
//! install_on_attach = true
//! ```

mod loader;

use std::path::Path;

use serde::{Deserialize, Serialize};

pub use loader::{configs_dir, grouphook_base_dir, hook_config_path, CONFIG_FILE_NAME};

/// Configuration system errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read or write config file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse TOML content
    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// Failed to serialize config to TOML
    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Could not determine config directory from the host location
    #[error("Config directory not available - could not resolve base path")]
    NoConfigDirectory,
}

/// Result type for config operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Hook registry configuration.
///
/// Loaded from `<base>/configs/grouphook.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HookConfig {
    /// Config version for future migration support
    pub version: u32,

    /// Enable debug logging
    pub debug: bool,

    /// Names of hooks that are never installed
    pub disabled_hooks: Vec<String>,

    /// Install primitives as soon as their environment is attached.
    ///
    /// When false, installation waits for the first listener or the first
    /// request for the original.
    pub install_on_attach: bool,
}

impl Default for HookConfig {
    fn default() -> Self {
        Self {
            version: 1,
            debug: false,
            disabled_hooks: Vec::new(),
            install_on_attach: true,
        }
    }
}

impl HookConfig {
    /// Whether a hook name is listed as disabled
    pub fn is_disabled(&self, name: &str) -> bool {
        self.disabled_hooks.iter().any(|disabled| disabled == name)
    }

    /// Load hook config from the default path, creating it if missing.
    pub fn load() -> ConfigResult<Self> {
        Self::load_from(&hook_config_path()?)
    }

    /// Load hook config from `path`, creating a default file if missing.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = toml::from_str(&content)?;
            tracing::debug!("Loaded hook config from {:?}", path);
            Ok(config)
        } else {
            let default = Self::default();
            default.save_to(path)?;
            tracing::info!("Created default hook config at {:?}", path);
            Ok(default)
        }
    }

    /// Save hook config to the default path.
    pub fn save(&self) -> ConfigResult<()> {
        self.save_to(&hook_config_path()?)
    }

    /// Save hook config to `path`.
    ///
    /// Creates parent directories if they don't exist.
    pub fn save_to(&self, path: &Path) -> ConfigResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        tracing::debug!("Saved hook config to {:?}", path);
        Ok(())
    }

    /// Reload hook config from the default path.
    pub fn reload(&mut self) -> ConfigResult<()> {
        self.reload_from(&hook_config_path()?)
    }

    /// Reload hook config from `path`.
    pub fn reload_from(&mut self, path: &Path) -> ConfigResult<()> {
        let content = std::fs::read_to_string(path)?;
        *self = toml::from_str(&content)?;
        tracing::debug!("Reloaded hook config from {:?}", path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn temp_config_path(test: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("grouphook-{}-{}", test, std::process::id()))
            .join(CONFIG_FILE_NAME)
    }

    #[test]
    fn test_hook_config_default() {
        let config = HookConfig::default();
        assert_eq!(config.version, 1);
        assert!(!config.debug);
        assert!(config.disabled_hooks.is_empty());
        assert!(config.install_on_attach);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: HookConfig =
            toml::from_str("disabled_hooks = [\"C_HLTVCamera::SetMode\"]").unwrap();

        assert!(config.is_disabled("C_HLTVCamera::SetMode"));
        assert!(!config.is_disabled("C_HLTVCamera::SetCameraAngle"));
        assert!(config.install_on_attach);
        assert_eq!(config.version, 1);
    }

    #[test]
    fn test_hook_config_serialize() {
        let config = HookConfig {
            version: 2,
            debug: true,
            disabled_hooks: vec!["GetLocalPlayerIndex".to_string()],
            install_on_attach: false,
        };

        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("version = 2"));
        assert!(toml_str.contains("debug = true"));
        assert!(toml_str.contains("install_on_attach = false"));
    }

    #[test]
    fn test_load_creates_default_then_reloads() {
        let path = temp_config_path("load");
        let _ = std::fs::remove_file(&path);

        let mut config = HookConfig::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config, HookConfig::default());

        let edited = HookConfig {
            debug: true,
            ..HookConfig::default()
        };
        edited.save_to(&path).unwrap();

        config.reload_from(&path).unwrap();
        assert!(config.debug);

        std::fs::write(&path, "version = \"one\"").unwrap();
        assert!(matches!(
            HookConfig::load_from(&path),
            Err(ConfigError::Parse(_))
        ));

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }
}
