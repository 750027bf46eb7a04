use std::path::{Path, PathBuf};

use crate::config::schema::{Config, EngineKind};
use crate::error::ConfigError;

const SCHEMA_JSON: &str = include_str!("../../schema/config-v1.json");

pub const ENV_WORKSPACE_ROOT: &str = "MONLUR_WORKSPACE_ROOT";
pub const ENV_ENGINE: &str = "MONLUR_ENGINE";
pub const ENV_ENGINE_DEADLINE_SECS: &str = "MONLUR_ENGINE_DEADLINE_SECS";
pub const ENV_EXTERNAL_PROGRAM: &str = "MONLUR_EXTERNAL_PROGRAM";

/// `<platform config dir>/monlur/config.json`, if the platform has one.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("monlur").join("config.json"))
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let json_value: serde_json::Value = serde_json::from_str(content)?;

    validate_schema(&json_value)?;

    let config: Config = serde_json::from_value(json_value)?;

    validate_config(&config)?;

    Ok(config)
}

/// Resolves the effective configuration: an explicit file, else the default
/// file if it exists, else built-in defaults; environment overrides last.
pub fn resolve_config(explicit: Option<&Path>) -> Result<Config, ConfigError> {
    let mut config = match explicit {
        Some(path) => load_config(path)?,
        None => match default_config_path().filter(|p| p.is_file()) {
            Some(path) => {
                tracing::debug!(path = %path.display(), "Loading default config file");
                load_config(path)?
            }
            None => Config::default(),
        },
    };

    apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;
    validate_config(&config)?;
    Ok(config)
}

/// Applies `MONLUR_*` overrides. `lookup` is injected so tests need not touch
/// the process environment.
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(root) = lookup(ENV_WORKSPACE_ROOT).filter(|v| !v.trim().is_empty()) {
        config.workspace.root = PathBuf::from(root);
    }

    if let Some(kind) = lookup(ENV_ENGINE) {
        config.engine.kind =
            kind.parse::<EngineKind>()
                .map_err(|reason| ConfigError::InvalidOverride {
                    name: ENV_ENGINE.to_string(),
                    reason,
                })?;
    }

    if let Some(secs) = lookup(ENV_ENGINE_DEADLINE_SECS) {
        config.engine.deadline_secs =
            secs.trim()
                .parse::<u64>()
                .map_err(|e| ConfigError::InvalidOverride {
                    name: ENV_ENGINE_DEADLINE_SECS.to_string(),
                    reason: e.to_string(),
                })?;
    }

    if let Some(program) = lookup(ENV_EXTERNAL_PROGRAM).filter(|v| !v.trim().is_empty()) {
        config.engine.external.program = program;
    }

    Ok(())
}

fn validate_schema(json_value: &serde_json::Value) -> Result<(), ConfigError> {
    let schema: serde_json::Value =
        serde_json::from_str(SCHEMA_JSON).map_err(|e| ConfigError::Validation {
            message: format!("Invalid embedded schema JSON: {}", e),
        })?;

    let validator = jsonschema::validator_for(&schema).map_err(|e| ConfigError::Validation {
        message: format!("Failed to compile JSON schema: {}", e),
    })?;

    let error_messages: Vec<String> = validator
        .iter_errors(json_value)
        .map(|e| e.to_string())
        .collect();
    if !error_messages.is_empty() {
        return Err(ConfigError::SchemaValidation {
            errors: error_messages.join("; "),
        });
    }

    Ok(())
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.engine.deadline_secs == 0 {
        return Err(ConfigError::Validation {
            message: "engine.deadlineSecs must be greater than zero".to_string(),
        });
    }

    if config.workspace.sweep_interval_secs == 0 {
        return Err(ConfigError::Validation {
            message: "workspace.sweepIntervalSecs must be greater than zero".to_string(),
        });
    }

    // The sweep deletes by age alone, so a workspace must outlive the longest
    // engine run that can still be using it.
    if config.workspace.retention_secs <= config.engine.deadline_secs {
        return Err(ConfigError::Validation {
            message: "workspace.retentionSecs must be greater than engine.deadlineSecs"
                .to_string(),
        });
    }

    if config.workspace.root.as_os_str().is_empty() {
        return Err(ConfigError::Validation {
            message: "workspace.root must not be empty".to_string(),
        });
    }

    let external = &config.engine.external;
    if config.engine.kind == EngineKind::External {
        if external.program.trim().is_empty() {
            return Err(ConfigError::Validation {
                message: "engine.external.program is required for the external engine"
                    .to_string(),
            });
        }
        if external.supported_presets.is_empty() {
            return Err(ConfigError::Validation {
                message: "engine.external.supportedPresets must not be empty".to_string(),
            });
        }
        if let Some(script) = &external.script {
            if !script.contains("{output}") {
                return Err(ConfigError::Validation {
                    message: "engine.external.script must reference {output}".to_string(),
                });
            }
        }
    }

    Ok(())
}
