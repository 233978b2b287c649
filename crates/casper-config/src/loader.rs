//! Config file discovery and layered loading.
//!
//! Implements the `Config::load()` algorithm:
//! 1. Parse `defaults.toml` → base
//! 2. Apply env var fallbacks (`PORT`, `CASPER_*`)
//! 3. Merge the config file (`--config` path, or `./casper.toml` if present)
//! 4. Deserialize merged tree → `Config`
//! 5. Validate

use std::collections::HashMap;
use std::path::Path;

use tracing::{debug, info};

use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;
use crate::validate;

/// Embedded default configuration.
const DEFAULTS_TOML: &str = include_str!("defaults.toml");

/// File picked up from the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "casper.toml";

/// Maximum allowed config file size (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1_048_576;

/// Environment fallbacks: variable → (section, key, kind).
const ENV_FALLBACKS: &[(&str, &str, &str, EnvKind)] = &[
    ("PORT", "http", "port", EnvKind::Port),
    ("CASPER_BRIDGE_URL", "session", "bridge_url", EnvKind::Text),
    ("CASPER_AUTH_DIR", "session", "auth_dir", EnvKind::Text),
    ("CASPER_LOG", "log", "level", EnvKind::Text),
];

#[derive(Clone, Copy)]
enum EnvKind {
    Text,
    Port,
}

/// Load configuration from the process environment and config file.
///
/// When `explicit` is `Some`, that file must exist. Otherwise
/// [`DEFAULT_CONFIG_FILE`] is merged if present in the working directory.
///
/// # Errors
///
/// Returns a [`ConfigError`] if a file is unreadable or malformed, an env
/// fallback is unparseable, or the merged configuration fails validation.
pub fn load(explicit: Option<&Path>) -> ConfigResult<Config> {
    load_with_env(explicit, &collect_env_vars())
}

/// Same as [`load`] with an explicit environment map.
///
/// # Errors
///
/// See [`load`].
pub fn load_with_env(
    explicit: Option<&Path>,
    env_vars: &HashMap<String, String>,
) -> ConfigResult<Config> {
    // 1. Parse embedded defaults.
    let mut merged: toml::Value =
        toml::from_str(DEFAULTS_TOML).map_err(|e| ConfigError::ParseError {
            path: "<embedded defaults>".to_owned(),
            source: e,
        })?;

    // 2. Env vars sit above defaults and below any file.
    let env_count = apply_env_fallbacks(&mut merged, env_vars)?;
    if env_count > 0 {
        debug!(count = env_count, "applied environment variable fallbacks");
    }

    // 3. Config file.
    let overlay = match explicit {
        Some(path) => Some((read_overlay(path)?, path)),
        None => {
            let path = Path::new(DEFAULT_CONFIG_FILE);
            try_load_file(path)?.map(|overlay| (overlay, path))
        },
    };
    if let Some((overlay, path)) = overlay {
        deep_merge(&mut merged, &overlay);
        info!(path = %path.display(), "loaded config file");
    }

    // 4. Deserialize.
    let config: Config =
        merged
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::ParseError {
                path: "<merged config>".to_owned(),
                source: e,
            })?;

    // 5. Validate.
    validate::validate(&config)?;
    Ok(config)
}

/// Snapshot the process environment.
fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars().collect()
}

/// Write env values into the tree. Returns how many were applied.
fn apply_env_fallbacks(
    merged: &mut toml::Value,
    env_vars: &HashMap<String, String>,
) -> ConfigResult<usize> {
    let mut applied = 0usize;
    for (var, section, key, kind) in ENV_FALLBACKS {
        let Some(raw) = env_vars.get(*var).map(|v| v.trim()) else {
            continue;
        };
        if raw.is_empty() {
            continue;
        }
        let value = match kind {
            EnvKind::Text => toml::Value::String(raw.to_owned()),
            EnvKind::Port => {
                let port: u16 = raw.parse().map_err(|_| ConfigError::ValidationError {
                    field: format!("{section}.{key}"),
                    message: format!("{var}={raw} is not a valid port number"),
                })?;
                toml::Value::Integer(i64::from(port))
            },
        };
        set_field(merged, section, key, value);
        applied = applied.saturating_add(1);
    }
    Ok(applied)
}

/// Set `[section].key`, creating the section table if needed.
fn set_field(root: &mut toml::Value, section: &str, key: &str, value: toml::Value) {
    let Some(root) = root.as_table_mut() else {
        return;
    };
    let entry = root
        .entry(section.to_owned())
        .or_insert_with(|| toml::Value::Table(toml::map::Map::new()));
    if let Some(table) = entry.as_table_mut() {
        table.insert(key.to_owned(), value);
    }
}

/// Recursively deep-merge `overlay` into `base`.
///
/// - Tables merge recursively per-field.
/// - Scalars and arrays from the overlay **replace** the base value.
pub(crate) fn deep_merge(base: &mut toml::Value, overlay: &toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                if let Some(base_val) = base_table.get_mut(key) {
                    deep_merge(base_val, overlay_val);
                } else {
                    base_table.insert(key.clone(), overlay_val.clone());
                }
            }
        },
        (base, overlay) => {
            *base = overlay.clone();
        },
    }
}

/// Try to load a file, returning `None` if the file doesn't exist.
fn try_load_file(path: &Path) -> ConfigResult<Option<toml::Value>> {
    match read_overlay(path) {
        Ok(value) => Ok(Some(value)),
        Err(ConfigError::ReadError { source, .. })
            if source.kind() == std::io::ErrorKind::NotFound =>
        {
            debug!(path = %path.display(), "config file not found, skipping");
            Ok(None)
        },
        Err(e) => Err(e),
    }
}

/// Read and parse a TOML file. Missing files are an error.
fn read_overlay(path: &Path) -> ConfigResult<toml::Value> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.display().to_string(),
        source: e,
    })?;

    // Check size after reading to avoid TOCTOU between stat and read.
    if content.len() as u64 > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::ValidationError {
            field: path.display().to_string(),
            message: format!(
                "config file is {} bytes, exceeding the {} byte limit",
                content.len(),
                MAX_CONFIG_FILE_SIZE
            ),
        });
    }

    toml::from_str(&content).map_err(|e| ConfigError::ParseError {
        path: path.display().to_string(),
        source: e,
    })
}
