// src/config/loader.rs

use std::fs;
use std::path::Path;

use tracing::{debug, warn};

use crate::config::model::{ConfigFile, MAX_EXEC_DURATION_SEC};
use crate::config::validate::validate_config;
use crate::errors::Result;

pub const ENV_COMMAND_PREFIX: &str = "LXBOT_COMMAND_PREFIX";
pub const ENV_ALLOW_NETWORK: &str = "LXBOT_ALLOW_DOCKER_NETWORK";
pub const ENV_UNLIMITED_CPU: &str = "LXBOT_ALLOW_DOCKER_UNLIMIT_CPU";
pub const ENV_UNLIMITED_MEMORY: &str = "LXBOT_ALLOW_DOCKER_UNLIMIT_MEMORY";
pub const ENV_EXEC_DURATION_SEC: &str = "LXBOT_ALLOW_DOCKER_EXEC_DURATION_SEC";

/// Read a TOML configuration file without validating it.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    let config: ConfigFile = toml::from_str(&contents)?;
    Ok(config)
}

/// Build the effective configuration from the process environment.
///
/// - Reads `path` if given, otherwise starts from defaults.
/// - Overlays the `LXBOT_*` environment variables.
/// - Validates the result.
pub fn load(path: Option<&Path>) -> Result<ConfigFile> {
    load_with_env(path, |key| std::env::var(key).ok())
}

/// Same as [`load`], with an explicit environment lookup.
pub fn load_with_env<F>(path: Option<&Path>, lookup: F) -> Result<ConfigFile>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match path {
        Some(path) => {
            debug!(path = %path.display(), "loading config file");
            load_from_path(path)?
        }
        None => ConfigFile::default(),
    };

    apply_env(&mut config, lookup);
    validate_config(&config)?;
    Ok(config)
}

/// Overlay environment settings onto `config`.
///
/// A switch variable that is present decides the setting: only the exact
/// value `true` lifts the cap. An empty prefix counts as unset. A duration
/// that is not a whole number of seconds, or exceeds
/// [`MAX_EXEC_DURATION_SEC`], is ignored with a warning.
pub fn apply_env<F>(config: &mut ConfigFile, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(prefix) = lookup(ENV_COMMAND_PREFIX).filter(|p| !p.is_empty()) {
        config.command.prefix = prefix;
    }

    if let Some(v) = lookup(ENV_ALLOW_NETWORK) {
        config.limits.allow_network = is_enabled(&v);
    }
    if let Some(v) = lookup(ENV_UNLIMITED_CPU) {
        config.limits.unlimited_cpu = is_enabled(&v);
    }
    if let Some(v) = lookup(ENV_UNLIMITED_MEMORY) {
        config.limits.unlimited_memory = is_enabled(&v);
    }

    if let Some(v) = lookup(ENV_EXEC_DURATION_SEC).filter(|v| !v.is_empty()) {
        match v.trim().parse::<u64>() {
            Ok(secs) if secs <= MAX_EXEC_DURATION_SEC => config.limits.exec_duration_sec = secs,
            Ok(secs) => warn!(
                var = ENV_EXEC_DURATION_SEC,
                value = secs,
                max = MAX_EXEC_DURATION_SEC,
                "execution duration too large; keeping {}s",
                config.limits.exec_duration_sec
            ),
            Err(e) => warn!(
                var = ENV_EXEC_DURATION_SEC,
                value = %v,
                error = %e,
                "invalid execution duration; keeping {}s",
                config.limits.exec_duration_sec
            ),
        }
    }
}

fn is_enabled(value: &str) -> bool {
    value == "true"
}
