//! babble directory paths.
//!
//! Configuration lives under the XDG config home and logs under the XDG
//! state home, with the usual home-relative fallbacks when the variables are
//! unset. Every path derivation in the crate goes through here.

use std::path::PathBuf;

const APP_DIR: &str = "babble";

/// Path to the configuration file, creating its directory if needed.
///
/// # Errors
/// - If the home directory cannot be determined
/// - If the config directory cannot be created
pub fn config_path() -> anyhow::Result<PathBuf> {
    let config_dir = home()?.join(".config").join(APP_DIR);
    std::fs::create_dir_all(&config_dir)?;
    Ok(config_dir.join("babble.toml"))
}

/// Directory holding babble's rotated log files.
///
/// Respects XDG_STATE_HOME, defaulting to ~/.local/state/babble. Not created
/// here; the logging setup creates it before writing.
///
/// # Errors
/// - If the home directory cannot be determined
pub fn state_dir() -> anyhow::Result<PathBuf> {
    if let Some(xdg_state) = std::env::var_os("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg_state).join(APP_DIR));
    }
    Ok(home()?.join(".local/state").join(APP_DIR))
}

fn home() -> anyhow::Result<PathBuf> {
    dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))
}
