// src/exec/backend.rs

//! Pluggable container runtime abstraction.
//!
//! The launcher talks to a `SandboxBackend` instead of shelling out to
//! `docker` directly. Production uses [`DockerBackend`]; tests provide a
//! backend that runs the script with a local shell.

use std::future::Future;
use std::pin::Pin;
use std::process::Stdio;

use anyhow::anyhow;
use tokio::process::Command;
use tracing::debug;

use crate::errors::Result;
use crate::exec::launcher::{ResourceLimits, run_args};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Operations the launcher needs from a container runtime.
pub trait SandboxBackend: Send + Sync {
    /// Whether `image` is available locally. Errors count as "missing".
    fn has_image<'a>(&'a self, image: &'a str) -> BoxFuture<'a, bool>;

    /// Blocking pull of `image`.
    fn pull_image<'a>(&'a self, image: &'a str) -> BoxFuture<'a, Result<()>>;

    /// The command that runs a script (read from stdin) inside `image`.
    ///
    /// Stdio and kill-on-drop are configured by the launcher.
    fn command(&self, image: &str, limits: &ResourceLimits) -> Command;
}

/// Runs scripts through the `docker` CLI (or a compatible one).
#[derive(Debug, Clone)]
pub struct DockerBackend {
    program: String,
}

impl DockerBackend {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl Default for DockerBackend {
    fn default() -> Self {
        Self::new("docker")
    }
}

impl SandboxBackend for DockerBackend {
    fn has_image<'a>(&'a self, image: &'a str) -> BoxFuture<'a, bool> {
        Box::pin(async move {
            let output = Command::new(&self.program)
                .args(["images", image, "-q"])
                .stdin(Stdio::null())
                .stderr(Stdio::null())
                .output()
                .await;

            match output {
                Ok(out) if out.status.success() => !out.stdout.trim_ascii().is_empty(),
                Ok(out) => {
                    debug!(image, status = %out.status, "image lookup failed");
                    false
                }
                Err(e) => {
                    debug!(image, error = %e, "image lookup could not run");
                    false
                }
            }
        })
    }

    fn pull_image<'a>(&'a self, image: &'a str) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let status = Command::new(&self.program)
                .args(["pull", image])
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
                .await?;

            if !status.success() {
                return Err(anyhow!("`{} pull {image}` exited with {status}", self.program).into());
            }
            Ok(())
        })
    }

    fn command(&self, image: &str, limits: &ResourceLimits) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(run_args(image, limits));
        cmd
    }
}
