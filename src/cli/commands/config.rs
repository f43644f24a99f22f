//! Configuration management commands

use anyhow::Result;
use clap::Subcommand;
use serde::Serialize;

use crate::cli::output::{print_formatted, print_success, OutputFormat};
use crate::config::Config;

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Get a specific config value
    Get {
        /// Config key (e.g., "mirror.catalog_primary", "loader.settle_delay_ms")
        key: String,
    },

    /// Set a config value
    Set {
        /// Config key (e.g., "mirror.catalog_primary", "loader.settle_delay_ms")
        key: String,

        /// Value to set (an empty string clears optional keys)
        value: String,
    },

    /// Show config file path
    Path,
}

#[derive(Serialize)]
struct ConfigPathResult {
    path: String,
    exists: bool,
}

pub async fn run(command: ConfigCommands, format: OutputFormat, quiet: bool) -> Result<()> {
    match command {
        ConfigCommands::Show => show(format).await,
        ConfigCommands::Get { key } => get(&key, format).await,
        ConfigCommands::Set { key, value } => set(&key, &value, quiet).await,
        ConfigCommands::Path => path(format).await,
    }
}

async fn show(format: OutputFormat) -> Result<()> {
    let config = Config::load()?;

    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&config)?;
            println!("{}", json);
        }
        OutputFormat::Text => {
            let toml = toml::to_string_pretty(&config)?;
            println!("{}", toml);
        }
    }

    Ok(())
}

async fn get(key: &str, format: OutputFormat) -> Result<()> {
    let config = Config::load()?;

    // Parse dotted key path and extract value
    let value = get_config_value(&config, key)?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string(&value)?);
        }
        OutputFormat::Text => {
            println!("{}", value);
        }
    }

    Ok(())
}

fn or_default(value: &Option<String>, default: &str) -> String {
    value
        .clone()
        .unwrap_or_else(|| format!("<default: {}>", default))
}

fn get_config_value(config: &Config, key: &str) -> Result<String> {
    let parts: Vec<&str> = key.split('.').collect();
    let urls = config.mirror_urls();

    match parts.as_slice() {
        ["mirror", "catalog_primary"] => {
            Ok(or_default(&config.mirror.catalog_primary, &urls.catalog_primary))
        }
        ["mirror", "catalog_fallback"] => {
            Ok(or_default(&config.mirror.catalog_fallback, &urls.catalog_fallback))
        }
        ["mirror", "meta_primary"] => Ok(or_default(&config.mirror.meta_primary, &urls.meta_primary)),
        ["mirror", "meta_fallback"] => {
            Ok(or_default(&config.mirror.meta_fallback, &urls.meta_fallback))
        }
        ["mirror", "timeout_secs"] => Ok(config.mirror.timeout_secs.to_string()),
        ["bundled", "path"] => Ok(config
            .bundled
            .path
            .clone()
            .unwrap_or_else(|| "<embedded>".to_string())),
        ["loader", "settle_delay_ms"] => Ok(config.loader.settle_delay_ms.to_string()),
        ["loader", "native_dialog"] => Ok(config.loader.native_dialog.to_string()),
        _ => anyhow::bail!("Unknown config key: {}", key),
    }
}

async fn set(key: &str, value: &str, quiet: bool) -> Result<()> {
    let mut config = Config::load()?;

    set_config_value(&mut config, key, value)?;
    config.save()?;

    print_success(&format!("Set {} = {}", key, value), quiet);
    Ok(())
}

/// Empty input clears an optional override
fn optional(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn set_config_value(config: &mut Config, key: &str, value: &str) -> Result<()> {
    let parts: Vec<&str> = key.split('.').collect();

    match parts.as_slice() {
        ["mirror", "catalog_primary"] => config.mirror.catalog_primary = optional(value),
        ["mirror", "catalog_fallback"] => config.mirror.catalog_fallback = optional(value),
        ["mirror", "meta_primary"] => config.mirror.meta_primary = optional(value),
        ["mirror", "meta_fallback"] => config.mirror.meta_fallback = optional(value),
        ["mirror", "timeout_secs"] => {
            config.mirror.timeout_secs = value.parse()?;
        }
        ["bundled", "path"] => config.bundled.path = optional(value),
        ["loader", "settle_delay_ms"] => {
            config.loader.settle_delay_ms = value.parse()?;
        }
        ["loader", "native_dialog"] => {
            config.loader.native_dialog = value.parse()?;
        }
        _ => anyhow::bail!("Unknown or read-only config key: {}", key),
    }

    Ok(())
}

async fn path(format: OutputFormat) -> Result<()> {
    let path = Config::config_path()?;
    let exists = path.exists();

    let result = ConfigPathResult {
        path: path.to_string_lossy().to_string(),
        exists,
    };

    print_formatted(&result, format, |r| {
        format!("{}{}", r.path, if r.exists { "" } else { " (not found)" })
    });

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_get_values() {
        let mut config = Config::default();

        set_config_value(&mut config, "mirror.catalog_primary", "http://localhost/d.json").unwrap();
        set_config_value(&mut config, "loader.settle_delay_ms", "250").unwrap();
        set_config_value(&mut config, "loader.native_dialog", "false").unwrap();

        assert_eq!(
            get_config_value(&config, "mirror.catalog_primary").unwrap(),
            "http://localhost/d.json"
        );
        assert_eq!(get_config_value(&config, "loader.settle_delay_ms").unwrap(), "250");
        assert_eq!(get_config_value(&config, "loader.native_dialog").unwrap(), "false");
    }

    #[test]
    fn test_empty_value_clears_override() {
        let mut config = Config::default();
        set_config_value(&mut config, "bundled.path", "/tmp/list.json").unwrap();
        assert_eq!(config.bundled.path.as_deref(), Some("/tmp/list.json"));

        set_config_value(&mut config, "bundled.path", "").unwrap();
        assert!(config.bundled.path.is_none());
        assert_eq!(get_config_value(&config, "bundled.path").unwrap(), "<embedded>");
    }

    #[test]
    fn test_unset_url_reports_default() {
        let config = Config::default();
        let value = get_config_value(&config, "mirror.meta_fallback").unwrap();
        assert!(value.starts_with("<default: https://"));
    }

    #[test]
    fn test_invalid_keys_and_values() {
        let mut config = Config::default();
        assert!(get_config_value(&config, "mirror.unknown").is_err());
        assert!(set_config_value(&mut config, "loader", "1").is_err());
        assert!(set_config_value(&mut config, "mirror.timeout_secs", "soon").is_err());
    }
}
