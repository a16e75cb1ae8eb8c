//! Default locations

use dirs::home_dir;
use std::path::PathBuf;

/// Environment variable overriding the binst home directory.
pub const HOME_ENV: &str = "BINST_HOME";

/// Returns the binst home directory, or None if the user's home cannot be resolved.
///
/// `BINST_HOME` wins when set and non-empty; otherwise `~/.binst`.
pub fn try_binst_home() -> Option<PathBuf> {
    home_from(std::env::var_os(HOME_ENV).map(PathBuf::from), home_dir())
}

fn home_from(env_home: Option<PathBuf>, user_home: Option<PathBuf>) -> Option<PathBuf> {
    match env_home {
        Some(path) if !path.as_os_str().is_empty() => Some(path),
        _ => user_home.map(|h| h.join(".binst")),
    }
}

/// Default install destination: `~/.binst/bin`
pub fn try_bin_path() -> Option<PathBuf> {
    try_binst_home().map(|home| home.join("bin"))
}

/// Extract the filename from a URL.
pub fn filename_from_url(url: &str) -> &str {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.split('/').next_back().unwrap_or("")
}
