// src/config/validate.rs

use crate::config::model::{ConfigFile, MAX_EXEC_DURATION_SEC};
use crate::errors::{Result, ScriptError};

/// Check invariants serde cannot express.
pub fn validate_config(cfg: &ConfigFile) -> Result<()> {
    validate_prefix(&cfg.command.prefix)?;
    validate_limits(cfg)?;
    validate_output(cfg)?;
    validate_images(cfg)?;
    Ok(())
}

fn validate_prefix(prefix: &str) -> Result<()> {
    // The command must sit on the first line, so the prefix cannot span lines
    // or contain the separator between command and arguments.
    if prefix.chars().any(char::is_whitespace) {
        return Err(ScriptError::ConfigError(format!(
            "[command].prefix must not contain whitespace (got {prefix:?})"
        )));
    }
    Ok(())
}

fn validate_limits(cfg: &ConfigFile) -> Result<()> {
    if cfg.limits.exec_duration_sec == 0 {
        return Err(ScriptError::ConfigError(
            "[limits].exec_duration_sec must be >= 1 (got 0)".to_string(),
        ));
    }
    if cfg.limits.exec_duration_sec > MAX_EXEC_DURATION_SEC {
        return Err(ScriptError::ConfigError(format!(
            "[limits].exec_duration_sec must be <= {MAX_EXEC_DURATION_SEC} (got {})",
            cfg.limits.exec_duration_sec
        )));
    }
    if cfg.runtime.program.trim().is_empty() {
        return Err(ScriptError::ConfigError(
            "[runtime].program must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_output(cfg: &ConfigFile) -> Result<()> {
    if cfg.output.flush_interval_ms == 0 {
        return Err(ScriptError::ConfigError(
            "[output].flush_interval_ms must be >= 1 (got 0)".to_string(),
        ));
    }
    if cfg.output.batch_lines == 0 {
        return Err(ScriptError::ConfigError(
            "[output].batch_lines must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_images(cfg: &ConfigFile) -> Result<()> {
    for (keyword, image) in cfg.images.iter() {
        if keyword.is_empty() || keyword.chars().any(char::is_whitespace) {
            return Err(ScriptError::ConfigError(format!(
                "[images] keyword {keyword:?} must be non-empty and contain no whitespace"
            )));
        }
        if image.trim().is_empty() {
            return Err(ScriptError::ConfigError(format!(
                "[images].{keyword} must name an image"
            )));
        }
    }
    Ok(())
}
