use anyhow::{Context, Result};
use std::path::PathBuf;

/// Find the config directory, searching in priority order:
/// 1. Environment variable DVRCLIP_CONFIG_DIR
/// 2. User config directory (`~/.config/dvrclip/` on Unix, `%APPDATA%\dvrclip\` on Windows)
///
/// Creates the directory if it does not exist yet.
pub fn find_config_directory() -> Result<PathBuf> {
    if let Ok(env_path) = std::env::var("DVRCLIP_CONFIG_DIR") {
        let env_config = PathBuf::from(env_path);
        std::fs::create_dir_all(&env_config)
            .context("Failed to create config directory from DVRCLIP_CONFIG_DIR")?;
        tracing::debug!("Using config directory from DVRCLIP_CONFIG_DIR: {:?}", env_config);
        return Ok(env_config);
    }

    let user_config = get_user_config_dir()?;
    if !user_config.exists() {
        std::fs::create_dir_all(&user_config)
            .context("Failed to create user config directory")?;
        tracing::info!("Created config directory at: {:?}", user_config);
    }
    Ok(user_config)
}

/// Get platform-specific user config directory
/// - Windows: `%APPDATA%\dvrclip`
/// - Unix: `~/.config/dvrclip`
fn get_user_config_dir() -> Result<PathBuf> {
    let base_dir = dirs::config_dir()
        .ok_or_else(|| anyhow::anyhow!("Could not determine user config directory"))?;
    Ok(base_dir.join("dvrclip"))
}

/// Get absolute path to config.toml (application-level configuration)
pub fn get_config_path() -> Result<PathBuf> {
    let config_dir = find_config_directory()?;
    Ok(config_dir.join("config.toml"))
}

/// Get absolute path to state.toml (persisted runtime state, e.g. last save directory)
pub fn get_state_path() -> Result<PathBuf> {
    let config_dir = find_config_directory()?;
    Ok(config_dir.join("state.toml"))
}
