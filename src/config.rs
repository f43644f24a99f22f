use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::app_data::mirror_config;
use crate::loader::BundledSource;
use crate::mirror::MirrorUrls;

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub mirror: MirrorSettings,
    #[serde(default)]
    pub bundled: BundledSettings,
    #[serde(default)]
    pub loader: LoaderSettings,
}

/// Endpoint overrides; unset fields use the shipped URLs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirrorSettings {
    #[serde(default)]
    pub catalog_primary: Option<String>,
    #[serde(default)]
    pub catalog_fallback: Option<String>,
    #[serde(default)]
    pub meta_primary: Option<String>,
    #[serde(default)]
    pub meta_fallback: Option<String>,
    /// Per-request timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for MirrorSettings {
    fn default() -> Self {
        Self {
            catalog_primary: None,
            catalog_fallback: None,
            meta_primary: None,
            meta_fallback: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    mirror_config().http.timeout_secs
}

/// Offline catalog settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundledSettings {
    /// JSON file to use instead of the embedded catalog
    #[serde(default)]
    pub path: Option<String>,
}

/// Loader behavior settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoaderSettings {
    /// Delay between selecting a list and reporting "done"
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
    /// Show failures in a native dialog rather than on stderr
    #[serde(default = "default_true")]
    pub native_dialog: bool,
}

impl Default for LoaderSettings {
    fn default() -> Self {
        Self {
            settle_delay_ms: default_settle_delay_ms(),
            native_dialog: true,
        }
    }
}

fn default_settle_delay_ms() -> u64 {
    mirror_config().loader.settle_delay_ms
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let dirs = directories::ProjectDirs::from("com", "detectable", "DetectableCatalog")
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

        let config_dir = dirs.config_dir();
        std::fs::create_dir_all(config_dir)?;

        Ok(config_dir.join("config.toml"))
    }

    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from a file, falling back to defaults if it is missing
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = toml::from_str(&content)?;
            tracing::info!("Loaded configuration from {:?}", path);
            Ok(config)
        } else {
            tracing::info!("No configuration file found, using defaults");
            Ok(Self::default())
        }
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Save configuration to a file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        tracing::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Endpoints with user overrides applied
    pub fn mirror_urls(&self) -> MirrorUrls {
        let defaults = MirrorUrls::default();
        let pick = |value: &Option<String>, default: String| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .unwrap_or(default)
        };

        MirrorUrls {
            catalog_primary: pick(&self.mirror.catalog_primary, defaults.catalog_primary),
            catalog_fallback: pick(&self.mirror.catalog_fallback, defaults.catalog_fallback),
            meta_primary: pick(&self.mirror.meta_primary, defaults.meta_primary),
            meta_fallback: pick(&self.mirror.meta_fallback, defaults.meta_fallback),
        }
    }

    pub fn bundled_source(&self) -> BundledSource {
        match self.bundled.path.as_deref().map(str::trim) {
            Some(path) if !path.is_empty() => BundledSource::File(PathBuf::from(path)),
            _ => BundledSource::Embedded,
        }
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.mirror.timeout_secs.max(1))
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.loader.settle_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_match_embedded_config() {
        let config = Config::default();
        assert_eq!(config.mirror_urls(), MirrorUrls::default());
        assert_eq!(config.bundled_source(), BundledSource::Embedded);
        assert_eq!(config.settle_delay(), Duration::from_millis(1800));
        assert!(config.loader.native_dialog);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [mirror]
            catalog_primary = "http://localhost:8080/detectable.json"

            [loader]
            native_dialog = false
            "#,
        )
        .unwrap();

        let urls = config.mirror_urls();
        assert_eq!(urls.catalog_primary, "http://localhost:8080/detectable.json");
        assert_eq!(urls.catalog_fallback, MirrorUrls::default().catalog_fallback);
        assert_eq!(config.mirror.timeout_secs, mirror_config().http.timeout_secs);
        assert_eq!(config.loader.settle_delay_ms, 1800);
        assert!(!config.loader.native_dialog);
    }

    #[test]
    fn test_blank_overrides_are_ignored() {
        let mut config = Config::default();
        config.mirror.meta_primary = Some("   ".to_string());
        config.bundled.path = Some(String::new());

        assert_eq!(config.mirror_urls().meta_primary, MirrorUrls::default().meta_primary);
        assert_eq!(config.bundled_source(), BundledSource::Embedded);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.bundled.path = Some("/opt/games/gamelist.json".to_string());
        config.mirror.timeout_secs = 5;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(
            loaded.bundled_source(),
            BundledSource::File(PathBuf::from("/opt/games/gamelist.json"))
        );
        assert_eq!(loaded.http_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let loaded = Config::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(loaded, Config::default());
    }

    #[test]
    fn test_zero_timeout_is_clamped() {
        let mut config = Config::default();
        config.mirror.timeout_secs = 0;
        assert_eq!(config.http_timeout(), Duration::from_secs(1));
    }
}
