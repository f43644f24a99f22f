//! Application data embedded from TOML/JSON files at compile time.
//!
//! This module provides access to application-level constants that are:
//! - Embedded at compile time via `include_str!`
//! - Parsed lazily on first access via `OnceLock`
//! - Immutable at runtime
//!
//! This is distinct from `config.rs` which handles user overrides.
//! App data defines the shipped defaults (mirror endpoints, timings, the bundled
//! catalog), while config lets the user point the loader somewhere else.
//!
//! Data files are located in `embedded/`:
//! - `mirror_config.toml` - Mirror endpoints and loader timings
//! - `gamelist.json` - Bundled copy of the detectable games catalog

use serde::Deserialize;
use std::sync::OnceLock;

// Embed data files at compile time
const MIRROR_CONFIG_TOML: &str = include_str!("../embedded/mirror_config.toml");
const BUNDLED_GAMELIST_JSON: &str = include_str!("../embedded/gamelist.json");

// ============================================================================
// Mirror Configuration
// ============================================================================

/// Shipped mirror endpoints and timings
#[derive(Debug, Deserialize)]
pub struct MirrorConfig {
    pub catalog: EndpointPair,
    pub meta: EndpointPair,
    pub http: HttpConfig,
    pub loader: LoaderConfig,
}

/// A primary URL and the CDN copy tried when it fails
#[derive(Debug, Clone, Deserialize)]
pub struct EndpointPair {
    pub primary: String,
    pub fallback: String,
}

#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize)]
pub struct LoaderConfig {
    /// Delay between merge and the "all done" flag
    pub settle_delay_ms: u64,
}

/// Get mirror configuration (lazy-loaded)
pub fn mirror_config() -> &'static MirrorConfig {
    static CONFIG: OnceLock<MirrorConfig> = OnceLock::new();
    CONFIG.get_or_init(|| {
        toml::from_str(MIRROR_CONFIG_TOML).unwrap_or_else(|e| {
            panic!("Failed to parse mirror_config.toml: {}", e);
        })
    })
}

// ============================================================================
// Bundled Catalog
// ============================================================================

/// Raw JSON of the catalog shipped with the binary.
///
/// Left unparsed here: loading it is a guarded step of the loader, not a
/// startup invariant.
pub fn bundled_gamelist_json() -> &'static str {
    BUNDLED_GAMELIST_JSON
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mirror_config_parses() {
        let config = mirror_config();
        assert!(config.catalog.primary.starts_with("https://"));
        assert!(config.catalog.fallback.starts_with("https://"));
        assert!(config.meta.primary.ends_with("meta.json"));
        assert!(config.meta.fallback.ends_with("meta.json"));
        assert_eq!(config.loader.settle_delay_ms, 1800);
        assert!(config.http.timeout_secs > 0);
    }

    #[test]
    fn test_catalog_and_meta_hosts_differ_per_tier() {
        let config = mirror_config();
        assert_ne!(config.catalog.primary, config.catalog.fallback);
        assert_ne!(config.meta.primary, config.meta.fallback);
    }

    #[test]
    fn test_bundled_gamelist_is_json_array() {
        let value: serde_json::Value = serde_json::from_str(bundled_gamelist_json()).unwrap();
        assert!(value.as_array().is_some_and(|a| !a.is_empty()));
    }
}
