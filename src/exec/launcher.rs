// src/exec/launcher.rs

//! Starts one sandboxed script process.

use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::LimitsSection;
use crate::errors::{Result, ScriptError};
use crate::exec::backend::SandboxBackend;
use crate::message::Emitter;
use crate::report::Report;

const CPU_CAP: &str = "0.1";
const MEMORY_CAP: &str = "128mb";

/// Sandbox resource caps for one execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceLimits {
    pub allow_network: bool,
    pub unlimited_cpu: bool,
    pub unlimited_memory: bool,
    /// Hard wall-clock limit measured from launch.
    pub deadline: Duration,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self::from(&LimitsSection::default())
    }
}

impl From<&LimitsSection> for ResourceLimits {
    fn from(section: &LimitsSection) -> Self {
        Self {
            allow_network: section.allow_network,
            unlimited_cpu: section.unlimited_cpu,
            unlimited_memory: section.unlimited_memory,
            deadline: section.exec_duration(),
        }
    }
}

/// Arguments for `<runtime> run`.
///
/// The container is removed on exit, keeps stdin open for the script and
/// does not log. Network, CPU and memory are capped unless lifted.
pub fn run_args(image: &str, limits: &ResourceLimits) -> Vec<String> {
    let mut args: Vec<String> = ["run", "--rm", "-i", "--log-driver", "none"]
        .into_iter()
        .map(String::from)
        .collect();

    if !limits.allow_network {
        args.extend(["--network".to_string(), "none".to_string()]);
    }
    if !limits.unlimited_cpu {
        args.extend(["--cpus".to_string(), CPU_CAP.to_string()]);
    }
    if !limits.unlimited_memory {
        args.extend(["--memory".to_string(), MEMORY_CAP.to_string()]);
    }

    args.push(image.to_string());
    args
}

/// What to run.
#[derive(Debug, Clone)]
pub struct LaunchRequest {
    pub image: String,
    pub script: String,
    pub limits: ResourceLimits,
}

/// A started sandbox with its output pipes detached for the stream pumps.
#[derive(Debug)]
pub struct SpawnedProcess {
    pub child: Child,
    pub stdout: ChildStdout,
    pub stderr: ChildStderr,
    /// Writes the script to stdin, then closes it.
    pub stdin_feeder: JoinHandle<()>,
    pub started_at: Instant,
}

/// Start the sandbox for `request`.
///
/// If the image is missing locally a `DOWNLOAD` report is sent through
/// `emitter` before a blocking pull. A failed pull is only logged; the
/// launch itself then reports the real problem.
pub async fn launch(
    backend: &dyn SandboxBackend,
    request: &LaunchRequest,
    emitter: &Emitter,
) -> Result<SpawnedProcess> {
    let image = request.image.as_str();

    if !backend.has_image(image).await {
        info!(image, "image not present locally; pulling");
        emitter.emit(&Report::download(image)).await;
        match backend.pull_image(image).await {
            Ok(()) => info!(image, "image pulled"),
            Err(e) => warn!(image, error = %e, "image pull failed; launching anyway"),
        }
    }

    log_limits(image, &request.limits);

    let mut cmd = backend.command(image, &request.limits);
    cmd.stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd.spawn().map_err(|source| ScriptError::Launch {
        image: image.to_string(),
        source,
    })?;
    let started_at = Instant::now();

    let stdin = child.stdin.take().ok_or(ScriptError::MissingPipe("stdin"))?;
    let stdout = child.stdout.take().ok_or(ScriptError::MissingPipe("stdout"))?;
    let stderr = child.stderr.take().ok_or(ScriptError::MissingPipe("stderr"))?;

    info!(image, pid = ?child.id(), "sandbox started");

    let stdin_feeder = tokio::spawn(feed_stdin(stdin, request.script.clone()));

    Ok(SpawnedProcess {
        child,
        stdout,
        stderr,
        stdin_feeder,
        started_at,
    })
}

/// Write the whole script, then close stdin so the interpreter sees EOF.
async fn feed_stdin(mut stdin: ChildStdin, script: String) {
    if let Err(e) = stdin.write_all(script.as_bytes()).await {
        // The process may exit (or be killed) before reading everything.
        debug!(error = %e, "writing script to stdin failed");
        return;
    }
    if let Err(e) = stdin.shutdown().await {
        debug!(error = %e, "closing stdin failed");
    }
    debug!(bytes = script.len(), "script delivered");
}

fn log_limits(image: &str, limits: &ResourceLimits) {
    if !limits.allow_network {
        info!(image, "resource limit: network=none");
    }
    if !limits.unlimited_cpu {
        info!(image, "resource limit: cpus={CPU_CAP}");
    }
    if !limits.unlimited_memory {
        info!(image, "resource limit: memory={MEMORY_CAP}");
    }
    info!(
        image,
        "resource limit: exec duration={}s",
        limits.deadline.as_secs()
    );
}
