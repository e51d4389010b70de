//! Config path resolution
//!
//! Resolves configuration paths relative to the binary that hosts the hooks.

use std::path::PathBuf;

use super::{ConfigError, ConfigResult};

/// Config file name inside the configs directory
pub const CONFIG_FILE_NAME: &str = "grouphook.toml";

/// Returns the grouphook base directory by navigating up from the host binary.
///
/// The host is expected at:
/// `<base>/bin/<platform>/<module>`
///
/// This navigates up 3 levels to reach `<base>/`.
pub fn grouphook_base_dir() -> ConfigResult<PathBuf> {
    let exe = std::env::current_exe().map_err(ConfigError::Io)?;

    // Navigate: module -> platform -> bin -> base
    exe.parent()
        .and_then(|p| p.parent())
        .and_then(|p| p.parent())
        .map(PathBuf::from)
        .ok_or(ConfigError::NoConfigDirectory)
}

/// Returns the configs directory.
///
/// Path: `<base>/configs/`
pub fn configs_dir() -> ConfigResult<PathBuf> {
    Ok(grouphook_base_dir()?.join("configs"))
}

/// Returns the hook config path.
///
/// Path: `<base>/configs/grouphook.toml`
pub fn hook_config_path() -> ConfigResult<PathBuf> {
    Ok(configs_dir()?.join(CONFIG_FILE_NAME))
}
