use anyhow::{Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::resolver::DEFAULT_SITE_MARKER;

/// Settings file name inside the config directory
pub const SETTINGS_FILE: &str = "versiondropper.json";

/// Default log file name inside the data directory
pub const LOG_FILE: &str = "versiondropper.log";

/// Configuration for overriding default application paths
#[derive(Debug, Clone)]
pub struct PathConfig {
    /// Custom config directory (from CLI or ENV)
    pub config_dir: Option<PathBuf>,
}

impl PathConfig {
    /// Create PathConfig from CLI arguments and environment variables
    ///
    /// Priority: CLI args → ENV var (VERSIONDROPPER_CONFIG_DIR) → None (use defaults)
    pub fn from_env_and_cli(cli_dir: Option<PathBuf>) -> Self {
        let config_dir = cli_dir.or_else(|| {
            std::env::var("VERSIONDROPPER_CONFIG_DIR")
                .ok()
                .map(PathBuf::from)
        });

        Self { config_dir }
    }
}

/// Get path to a configuration file
///
/// Priority:
/// 1. CLI --config-dir argument
/// 2. VERSIONDROPPER_CONFIG_DIR environment variable
/// 3. Local folder IF any config files exist (versiondropper.json, versiondropper.log)
/// 4. Platform-specific config directory from dirs-next (default)
pub fn config_file(name: &str, config: &PathConfig) -> PathBuf {
    get_config_dir(config).join(name)
}

/// Get path to a data file (logs)
///
/// Same priority as [`config_file`], falling back to the platform data dir.
pub fn data_file(name: &str, config: &PathConfig) -> PathBuf {
    get_data_dir(config).join(name)
}

/// Ensure that configuration and data directories exist
pub fn ensure_dirs(config: &PathConfig) -> Result<()> {
    let config_dir = get_config_dir(config);
    let data_dir = get_data_dir(config);

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)
            .with_context(|| format!("Failed to create config directory: {}", config_dir.display()))?;
    }

    if data_dir != config_dir && !data_dir.exists() {
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;
    }

    Ok(())
}

fn has_local_config_files(dir: &Path) -> bool {
    [SETTINGS_FILE, LOG_FILE].iter().any(|f| dir.join(f).exists())
}

fn local_dir() -> Option<PathBuf> {
    std::env::current_dir()
        .ok()
        .filter(|dir| has_local_config_files(dir))
}

fn get_config_dir(config: &PathConfig) -> PathBuf {
    if let Some(dir) = &config.config_dir {
        return dir.clone();
    }
    if let Some(dir) = local_dir() {
        return dir;
    }
    dirs_next::config_dir()
        .map(|dir| dir.join("versiondropper"))
        .unwrap_or_else(|| PathBuf::from("."))
}

fn get_data_dir(config: &PathConfig) -> PathBuf {
    if let Some(dir) = &config.config_dir {
        return dir.clone();
    }
    if let Some(dir) = local_dir() {
        return dir;
    }
    dirs_next::data_dir()
        .map(|dir| dir.join("versiondropper"))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Color-space defaults and site settings, loaded once at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DropperSettings {
    /// Color space for frame sequences of Versions (and Shot/Asset drops)
    pub exr_colorspace: String,
    /// Color space for frame sequences of PublishedFiles
    pub published_file_colorspace: String,
    /// Color space for single movie files
    pub movie_colorspace: String,
    /// Text a dropped URL must contain to be treated as a tracking-site link
    pub site_marker: String,
    /// Read node localization policy (0 = on, 1 = from auto-localize path, 2 = on demand, 3 = off)
    pub localization_policy: i64,
}

impl Default for DropperSettings {
    fn default() -> Self {
        Self {
            exr_colorspace: "ACES - ACEScg".to_string(),
            published_file_colorspace: "ACES - ACEScg".to_string(),
            movie_colorspace: "Output - Rec.709".to_string(),
            site_marker: DEFAULT_SITE_MARKER.to_string(),
            localization_policy: 2,
        }
    }
}

impl DropperSettings {
    /// Read settings from a JSON file. Missing keys keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings: {}", path.display()))?;
        let settings: DropperSettings = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse settings: {}", path.display()))?;
        info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Settings from `explicit` if given, else from the config dir when the
    /// file exists there, else defaults.
    pub fn resolve(explicit: Option<&Path>, config: &PathConfig) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let path = config_file(SETTINGS_FILE, config);
        if path.exists() {
            Self::load(&path)
        } else {
            debug!("No settings at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text)
            .with_context(|| format!("Failed to write settings: {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_file_with_custom_dir() {
        let config = PathConfig {
            config_dir: Some(PathBuf::from("/custom")),
        };

        let path = config_file("test.json", &config);
        assert_eq!(path, PathBuf::from("/custom/test.json"));
    }

    #[test]
    fn test_data_file_with_custom_dir() {
        let config = PathConfig {
            config_dir: Some(PathBuf::from("/custom")),
        };

        let path = data_file(LOG_FILE, &config);
        assert_eq!(path, PathBuf::from("/custom/versiondropper.log"));
    }

    #[test]
    fn test_cli_dir_wins() {
        let config = PathConfig::from_env_and_cli(Some(PathBuf::from("/from/cli")));
        assert_eq!(config.config_dir, Some(PathBuf::from("/from/cli")));
    }

    #[test]
    fn test_partial_settings_keep_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        std::fs::write(&path, r#"{ "movie_colorspace": "sRGB" }"#).unwrap();

        let settings = DropperSettings::load(&path).unwrap();
        assert_eq!(settings.movie_colorspace, "sRGB");
        assert_eq!(settings.exr_colorspace, DropperSettings::default().exr_colorspace);
        assert_eq!(settings.localization_policy, 2);
    }

    #[test]
    fn test_resolve_from_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = PathConfig {
            config_dir: Some(dir.path().to_path_buf()),
        };
        assert_eq!(
            DropperSettings::resolve(None, &config).unwrap(),
            DropperSettings::default()
        );

        let custom = DropperSettings {
            site_marker: "tracker.lan".into(),
            ..Default::default()
        };
        custom.save(&config_file(SETTINGS_FILE, &config)).unwrap();
        assert_eq!(DropperSettings::resolve(None, &config).unwrap(), custom);
    }

    #[test]
    fn test_bad_settings_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = DropperSettings::load(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse settings"));
    }
}
