//! Settings and configuration utilities.
//!
//! Reads settings from $HOME/.pr-notes/settings.json and uses them as a
//! fallback for environment variables, so the tool can run outside CI
//! without exporting credentials each time.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

/// Settings loaded from $HOME/.pr-notes/settings.json.
#[derive(Debug, Default, Deserialize)]
pub struct Settings {
    /// Environment variable fallbacks.
    #[serde(default)]
    pub env: HashMap<String, String>,
}

impl Settings {
    /// Loads settings from the default location.
    ///
    /// A missing file yields empty settings, not an error.
    pub fn load() -> Result<Self> {
        Self::load_from_path(Self::settings_path()?)
    }

    /// Loads settings from a specific path.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file: {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse settings file: {}", path.display()))
    }

    /// Returns the default settings path.
    pub fn settings_path() -> Result<PathBuf> {
        let home_dir = dirs::home_dir().context("Failed to determine home directory")?;
        Ok(home_dir.join(".pr-notes").join("settings.json"))
    }

    /// Returns an environment variable, falling back to these settings.
    pub fn env_var(&self, key: &str) -> Option<String> {
        env::var(key).ok().or_else(|| self.env.get(key).cloned())
    }
}

/// Returns an environment variable, falling back to the settings file.
pub fn env_var(key: &str) -> Result<String> {
    if let Ok(value) = env::var(key) {
        return Ok(value);
    }

    Settings::load()
        .ok()
        .and_then(|settings| settings.env.get(key).cloned())
        .with_context(|| format!("Environment variable not found: {key}"))
}

/// Returns the first of `keys` that resolves, from the environment or the
/// settings file.
pub fn first_env_var(keys: &[&str]) -> Result<String> {
    for key in keys {
        if let Ok(value) = env_var(key) {
            return Ok(value);
        }
    }

    anyhow::bail!("None of the environment variables found: {keys:?}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn settings_load_from_path() {
        let temp_dir = TempDir::new().unwrap();
        let settings_path = temp_dir.path().join("settings.json");

        let settings_json = r#"{
            "env": {
                "TEST_VAR": "test_value",
                "GITHUB_TOKEN": "test_token"
            }
        }"#;
        fs::write(&settings_path, settings_json).unwrap();

        let settings = Settings::load_from_path(&settings_path).unwrap();
        assert_eq!(settings.env.get("TEST_VAR").unwrap(), "test_value");
        assert_eq!(settings.env.get("GITHUB_TOKEN").unwrap(), "test_token");
    }

    #[test]
    fn settings_missing_file_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let settings = Settings::load_from_path(temp_dir.path().join("none.json")).unwrap();
        assert!(settings.env.is_empty());
    }

    #[test]
    fn settings_invalid_json_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let settings_path = temp_dir.path().join("settings.json");
        fs::write(&settings_path, "not json").unwrap();

        assert!(Settings::load_from_path(&settings_path).is_err());
    }

    #[test]
    fn settings_env_var_prefers_real_environment() {
        let temp_dir = TempDir::new().unwrap();
        let settings_path = temp_dir.path().join("settings.json");
        fs::write(
            &settings_path,
            r#"{"env": {"PR_NOTES_SETTINGS_ONLY": "from_settings"}}"#,
        )
        .unwrap();

        let settings = Settings::load_from_path(&settings_path).unwrap();

        // Not present in the real environment, so the settings value wins.
        assert_eq!(
            settings.env_var("PR_NOTES_SETTINGS_ONLY").as_deref(),
            Some("from_settings")
        );

        env::set_var("PR_NOTES_ENV_OVERRIDE", "from_env");
        assert_eq!(
            settings.env_var("PR_NOTES_ENV_OVERRIDE").as_deref(),
            Some("from_env")
        );
        env::remove_var("PR_NOTES_ENV_OVERRIDE");
    }
}
