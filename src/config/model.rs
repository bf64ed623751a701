// src/config/model.rs

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;

/// Top-level configuration, optionally read from a TOML file:
///
/// ```toml
/// [command]
/// prefix = "!"
///
/// [limits]
/// allow_network = false
/// unlimited_cpu = false
/// unlimited_memory = false
/// exec_duration_sec = 600
///
/// [output]
/// flush_interval_ms = 3000
/// batch_lines = 30
///
/// [runtime]
/// program = "docker"
///
/// [images]
/// go = "golang:alpine"
/// ```
///
/// Every section is optional. Environment variables are layered on top by
/// [`crate::config::loader`].
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default)]
    pub command: CommandSection,

    #[serde(default)]
    pub limits: LimitsSection,

    #[serde(default)]
    pub output: OutputSection,

    #[serde(default)]
    pub runtime: RuntimeSection,

    /// Extra keyword → image entries, merged over the built-in table.
    #[serde(default)]
    pub images: BTreeMap<String, String>,
}

/// `[command]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct CommandSection {
    /// Text that must precede an image keyword, e.g. `/` in `/python`.
    #[serde(default = "default_prefix")]
    pub prefix: String,
}

fn default_prefix() -> String {
    "/".to_string()
}

impl Default for CommandSection {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
        }
    }
}

/// `[limits]` section: sandbox resource caps.
///
/// The `allow_*`/`unlimited_*` switches lift a cap; all caps are on by
/// default.
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsSection {
    #[serde(default)]
    pub allow_network: bool,

    #[serde(default)]
    pub unlimited_cpu: bool,

    #[serde(default)]
    pub unlimited_memory: bool,

    /// Hard wall-clock limit, in seconds, measured from launch.
    #[serde(default = "default_exec_duration_sec")]
    pub exec_duration_sec: u64,
}

/// Upper bound for `exec_duration_sec` (about 136 years).
pub const MAX_EXEC_DURATION_SEC: u64 = u32::MAX as u64;

fn default_exec_duration_sec() -> u64 {
    600
}

impl Default for LimitsSection {
    fn default() -> Self {
        Self {
            allow_network: false,
            unlimited_cpu: false,
            unlimited_memory: false,
            exec_duration_sec: default_exec_duration_sec(),
        }
    }
}

impl LimitsSection {
    pub fn exec_duration(&self) -> Duration {
        Duration::from_secs(self.exec_duration_sec)
    }
}

/// `[output]` section: partial-report batching.
#[derive(Debug, Clone, Deserialize)]
pub struct OutputSection {
    #[serde(default = "default_flush_interval_ms")]
    pub flush_interval_ms: u64,

    /// Line count in either stream that triggers an immediate partial report.
    #[serde(default = "default_batch_lines")]
    pub batch_lines: usize,
}

fn default_flush_interval_ms() -> u64 {
    3000
}

fn default_batch_lines() -> usize {
    30
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            flush_interval_ms: default_flush_interval_ms(),
            batch_lines: default_batch_lines(),
        }
    }
}

impl OutputSection {
    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }
}

/// `[runtime]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct RuntimeSection {
    /// Container runtime CLI. Anything accepting docker's `run`/`images`/`pull`
    /// syntax works (e.g. `podman`).
    #[serde(default = "default_program")]
    pub program: String,
}

fn default_program() -> String {
    "docker".to_string()
}

impl Default for RuntimeSection {
    fn default() -> Self {
        Self {
            program: default_program(),
        }
    }
}
