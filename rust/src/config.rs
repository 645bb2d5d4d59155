//! Optional JSON configuration file. Every field may be omitted; values given
//! on the command line or through their environment variables win over the
//! file.
//!
//! String values of the exact form `$ENV{VAR_NAME}` are expanded before the
//! document is interpreted, so a checked-in config never has to carry a key.
//! An unset variable is a config error, except in `recipient`: there it means
//! no recipient was supplied, which capture reports as the missing secret.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::credentials::VariableNames;
use crate::environment::Environment;
use crate::session::{HoldMode, HoldPolicy};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file unreadable: {0}")]
    Io(String),
    #[error("config parse failed: {0}")]
    Parse(String),
    #[error("environment variable {0} is required but missing")]
    MissingEnvVar(String),
    #[error("invalid config structure: {0}")]
    InvalidShape(String),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawHold {
    mode: HoldMode,
    seconds: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    hold: Option<RawHold>,
    #[serde(default)]
    variables: VariableNames,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileConfig {
    pub recipient: Option<String>,
    pub hold: Option<HoldPolicy>,
    pub variables: VariableNames,
}

impl FileConfig {
    /// Reads and interprets the config file at `path`, resolving `$ENV{}`
    /// placeholders through `env`.
    pub fn load(path: impl AsRef<Path>, env: &impl Environment) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {e}", path.display())))?;
        Self::from_json(&raw, env)
    }

    pub fn from_json(text: &str, env: &impl Environment) -> Result<Self, ConfigError> {
        let mut value: Value =
            serde_json::from_str(text).map_err(|e| ConfigError::Parse(format!("{e}")))?;
        let Some(root) = value.as_object_mut() else {
            return Err(ConfigError::InvalidShape(
                "top-level JSON must be an object".into(),
            ));
        };
        let recipient = match root.remove("recipient") {
            None | Some(Value::Null) => None,
            Some(Value::String(text)) => resolve_optional_placeholder(text, env),
            Some(_) => {
                return Err(ConfigError::InvalidShape(
                    "field 'recipient' must be a string".into(),
                ));
            }
        };
        resolve_env_placeholders(&mut value, env)?;

        let raw: RawConfig =
            serde_json::from_value(value).map_err(|e| ConfigError::InvalidShape(format!("{e}")))?;

        let hold = raw
            .hold
            .map(|h| HoldPolicy::from_mode(h.mode, h.seconds))
            .transpose()
            .map_err(ConfigError::InvalidShape)?;

        Ok(FileConfig {
            recipient,
            hold,
            variables: raw.variables,
        })
    }
}

fn resolve_env_placeholders(value: &mut Value, env: &impl Environment) -> Result<(), ConfigError> {
    match value {
        Value::String(text) => {
            if let Some(var) = extract_env_placeholder(text) {
                let replacement = env
                    .var(&var)
                    .ok_or_else(|| ConfigError::MissingEnvVar(var.clone()))?;
                *text = replacement;
            }
        }
        Value::Object(map) => {
            for val in map.values_mut() {
                resolve_env_placeholders(val, env)?;
            }
        }
        Value::Array(items) => {
            for val in items.iter_mut() {
                resolve_env_placeholders(val, env)?;
            }
        }
        Value::Null | Value::Bool(_) | Value::Number(_) => {}
    }
    Ok(())
}

/// Like [`resolve_env_placeholders`] for a single string, but an unset
/// variable yields `None`.
fn resolve_optional_placeholder(text: String, env: &impl Environment) -> Option<String> {
    match extract_env_placeholder(&text) {
        Some(var) => {
            let value = env.var(&var);
            if value.is_none() {
                tracing::debug!(variable = %var, "recipient placeholder is unset");
            }
            value
        }
        None => Some(text),
    }
}

fn extract_env_placeholder(text: &str) -> Option<String> {
    let inner = text.strip_prefix("$ENV{")?.strip_suffix('}')?;
    if inner.is_empty() {
        None
    } else {
        Some(inner.to_string())
    }
}
