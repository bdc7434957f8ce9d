// Configuration source loading.
//
// Priority order (highest first):
// 1. Process environment (ACCOUNT_ID, SENDER_EMAIL, ...)
// 2. Config file given explicitly (CLI --config)
// 3. Config file path from BLUEPRINT_INFRA_CONFIG
// 4. Default config file (./blueprint-infra.toml) when present
//
// Defaults for optional fields are applied by validation, not here, so the raw
// map only ever holds what the operator actually supplied.

use crate::error::{ConfigError, ConfigResult};
use crate::Field;
use log::{debug, info, warn};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};

/// Flat key/value input to [`crate::validate`]
pub type RawConfig = BTreeMap<String, String>;

/// Environment variable naming a config file
pub const CONFIG_PATH_ENV: &str = "BLUEPRINT_INFRA_CONFIG";

/// Config file picked up from the working directory when nothing else is given
pub const DEFAULT_CONFIG_FILE: &str = "./blueprint-infra.toml";

/// Read access to environment variables
pub trait EnvSource {
    fn get(&self, key: &str) -> Option<String>;
}

struct StdEnvSource;

impl EnvSource for StdEnvSource {
    fn get(&self, key: &str) -> Option<String> {
        env::var(key).ok()
    }
}

impl EnvSource for BTreeMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        BTreeMap::get(self, key).cloned()
    }
}

/// A config file value: a plain string, or a list joined with commas
/// (handy for `RECIPIENT_EMAILS = ["a@x.com", "b@x.com"]`).
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FileValue {
    Text(String),
    List(Vec<String>),
}

impl FileValue {
    fn into_raw(self) -> String {
        match self {
            FileValue::Text(text) => text,
            FileValue::List(items) => items.join(","),
        }
    }
}

/// Load the raw configuration map from the process environment and config file.
pub fn load_raw(explicit_path: Option<&Path>) -> ConfigResult<RawConfig> {
    load_raw_from(explicit_path, &StdEnvSource)
}

/// Load the raw configuration map using the given environment source.
pub fn load_raw_from(explicit_path: Option<&Path>, env: &impl EnvSource) -> ConfigResult<RawConfig> {
    let mut raw = match resolve_config_path(explicit_path, env) {
        Some(path) => load_file(&path)?,
        None => {
            debug!("No config file found, using environment only");
            RawConfig::new()
        }
    };

    for field in Field::ALL {
        match env.get(field.key()) {
            Some(value) if !value.trim().is_empty() => {
                if raw.insert(field.key().to_string(), value).is_some() {
                    debug!("{} from environment overrides config file", field.key());
                }
            }
            Some(_) => debug!("{} is set but blank in environment, ignoring", field.key()),
            None => {}
        }
    }

    Ok(raw)
}

fn resolve_config_path(explicit_path: Option<&Path>, env: &impl EnvSource) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return Some(path.to_path_buf());
    }
    if let Some(path) = env.get(CONFIG_PATH_ENV).filter(|p| !p.trim().is_empty()) {
        return Some(PathBuf::from(path));
    }
    let default = Path::new(DEFAULT_CONFIG_FILE);
    default.exists().then(|| default.to_path_buf())
}

fn load_file(path: &Path) -> ConfigResult<RawConfig> {
    info!("Loading configuration from {}", path.display());
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_file(path, &content)
}

fn parse_file(path: &Path, content: &str) -> ConfigResult<RawConfig> {
    let table: BTreeMap<String, FileValue> =
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    let mut raw = RawConfig::new();
    for (key, value) in table {
        if Field::from_key(&key).is_none() {
            warn!("Ignoring unknown key '{}' in {}", key, path.display());
            continue;
        }
        raw.insert(key, value.into_raw());
    }
    Ok(raw)
}
