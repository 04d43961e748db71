use super::types::*;
use serde_json::Value;
use std::fs;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(String),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Invalid YAML configuration: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Invalid TOML configuration: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Invalid configuration structure: {0}")]
    SchemaError(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Log levels accepted in `logging.level` and on the command line
pub const LOG_LEVELS: [&str; 5] = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"];

/// Load, substitute and validate configuration from a YAML or TOML file
///
/// Files ending in `.toml` are parsed as TOML, everything else as YAML.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(ConfigError::NotFound(path.display().to_string()));
    }

    let contents = fs::read_to_string(path)?;
    let is_toml = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("toml"))
        .unwrap_or(false);

    if is_toml {
        parse_toml(&contents)
    } else {
        parse_yaml(&contents)
    }
}

/// Parse a YAML document into a validated [`Config`]
pub fn parse_yaml(contents: &str) -> Result<Config> {
    if contents.trim().is_empty() {
        return finish(Value::Null);
    }
    let raw: Value = serde_yaml::from_str(contents)?;
    finish(raw)
}

/// Parse a TOML document into a validated [`Config`]
pub fn parse_toml(contents: &str) -> Result<Config> {
    let raw: Value = toml::from_str(contents)?;
    finish(raw)
}

fn finish(mut raw: Value) -> Result<Config> {
    if raw.is_null() {
        raw = Value::Object(Default::default());
    }

    substitute_env_vars(&mut raw);
    validate_structure(&raw)?;

    let config: Config = serde_json::from_value(raw)?;
    validate_config(&config)?;
    Ok(config)
}

/// Replace `${VAR}` in every string with the value of the environment variable.
/// Unset variables are left untouched.
pub fn substitute_env_vars(value: &mut Value) {
    match value {
        Value::String(s) => {
            if s.contains("${") {
                *s = substitute_str(s);
            }
        }
        Value::Array(items) => items.iter_mut().for_each(substitute_env_vars),
        Value::Object(map) => map.values_mut().for_each(substitute_env_vars),
        _ => {}
    }
}

fn substitute_str(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];

        match after.find('}') {
            Some(end) if end > 0 => {
                let var = &after[..end];
                match std::env::var(var) {
                    Ok(v) => out.push_str(&v),
                    Err(_) => {
                        out.push_str("${");
                        out.push_str(var);
                        out.push('}');
                    }
                }
                rest = &after[end + 1..];
            }
            _ => {
                out.push_str("${");
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}

/// Structural checks on the raw document, so errors point at the offending entry
fn validate_structure(raw: &Value) -> Result<()> {
    let root = raw.as_object().ok_or_else(|| {
        ConfigError::ValidationError("Configuration must be a mapping".to_string())
    })?;

    let backups = root.get("backups").ok_or_else(|| {
        ConfigError::ValidationError("Configuration must contain 'backups' section".to_string())
    })?;

    let backups = backups
        .as_array()
        .ok_or_else(|| ConfigError::ValidationError("'backups' must be a list".to_string()))?;

    if backups.is_empty() {
        return Err(ConfigError::ValidationError(
            "'backups' list cannot be empty".to_string(),
        ));
    }

    for (idx, backup) in backups.iter().enumerate() {
        let entry = backup.as_object().ok_or_else(|| {
            ConfigError::ValidationError(format!("Backup {} must be a mapping", idx))
        })?;

        let backup_type = entry.get("type").ok_or_else(|| {
            ConfigError::ValidationError(format!("Backup {} must have 'type' field", idx))
        })?;

        let known = backup_type
            .as_str()
            .and_then(TargetKind::parse)
            .is_some();
        if !known {
            return Err(ConfigError::ValidationError(format!(
                "Backup {} has invalid type: {}. Must be 'database', 'prometheus', or 'filesystem'",
                idx, backup_type
            )));
        }
    }

    if let Some(retention) = root.get("retention") {
        if let Some(map) = retention.as_object() {
            for key in map.keys() {
                if TargetKind::parse(key).is_none() {
                    return Err(ConfigError::ValidationError(format!(
                        "Retention policy for unknown backup type: {}",
                        key
                    )));
                }
            }
        } else if !retention.is_null() {
            return Err(ConfigError::ValidationError(
                "'retention' must be a mapping of backup type to days".to_string(),
            ));
        }
    }

    Ok(())
}

/// Validate the typed configuration
fn validate_config(config: &Config) -> Result<()> {
    if config.backup_dir.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "'backup_dir' cannot be empty".to_string(),
        ));
    }

    for (kind, days) in &config.retention {
        if *days <= 0 || *days > u32::MAX as i64 {
            return Err(ConfigError::ValidationError(format!(
                "Retention for '{}' must be a positive number of days, got {}",
                kind, days
            )));
        }
    }

    if let Some(ref webhook) = config.notifications.webhook {
        if webhook.url.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "Webhook notifier requires a 'url'".to_string(),
            ));
        }
    }

    if let Some(ref remote) = config.remote_upload {
        if remote.host.trim().is_empty() || remote.remote_path.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "'remote_upload' requires 'host' and 'remote_path'".to_string(),
            ));
        }
    }

    let timeouts = [
        (
            "notifications.webhook.timeout_seconds",
            config.notifications.webhook.as_ref().map(|w| w.timeout_seconds),
        ),
        (
            "remote_upload.timeout_seconds",
            config.remote_upload.as_ref().map(|r| r.timeout_seconds),
        ),
    ];
    for (field, seconds) in timeouts {
        if let Some(seconds) = seconds.filter(|s| *s > MAX_TIMEOUT_SECONDS) {
            return Err(ConfigError::ValidationError(format!(
                "'{}' must be at most {} seconds, got {}",
                field, MAX_TIMEOUT_SECONDS, seconds
            )));
        }
    }

    if !is_valid_log_level(&config.logging.level) {
        return Err(ConfigError::ValidationError(format!(
            "Invalid log level '{}'. Must be one of {}",
            config.logging.level,
            LOG_LEVELS.join(", ")
        )));
    }

    Ok(())
}

pub fn is_valid_log_level(level: &str) -> bool {
    LOG_LEVELS.iter().any(|l| l.eq_ignore_ascii_case(level))
}
