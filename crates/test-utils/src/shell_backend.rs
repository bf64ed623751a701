use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::anyhow;
use tokio::process::Command;

use script_docker::errors::Result;
use script_docker::exec::{BoxFuture, ResourceLimits, SandboxBackend};

/// A sandbox backend that runs the script with the local `sh` instead of a
/// container.
///
/// - records how often an image pull was requested
/// - can pretend images are missing (to exercise the DOWNLOAD path)
/// - can fail the pull or the spawn
#[derive(Debug, Clone)]
pub struct ShellBackend {
    program: String,
    image_present: bool,
    fail_pull: bool,
    pulls: Arc<AtomicUsize>,
}

impl ShellBackend {
    pub fn new() -> Self {
        Self {
            program: "sh".to_string(),
            image_present: true,
            fail_pull: false,
            pulls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Report every image as absent locally.
    pub fn missing_image(mut self) -> Self {
        self.image_present = false;
        self
    }

    pub fn failing_pull(mut self) -> Self {
        self.fail_pull = true;
        self
    }

    /// Use a program that does not exist, so spawning fails.
    pub fn unspawnable(mut self) -> Self {
        self.program = "/nonexistent/script-docker-test-shell".to_string();
        self
    }

    pub fn pulls(&self) -> usize {
        self.pulls.load(Ordering::SeqCst)
    }
}

impl Default for ShellBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl SandboxBackend for ShellBackend {
    fn has_image<'a>(&'a self, _image: &'a str) -> BoxFuture<'a, bool> {
        let present = self.image_present;
        Box::pin(async move { present })
    }

    fn pull_image<'a>(&'a self, image: &'a str) -> BoxFuture<'a, Result<()>> {
        self.pulls.fetch_add(1, Ordering::SeqCst);
        let fail = self.fail_pull;
        Box::pin(async move {
            if fail {
                return Err(anyhow!("pull of {image} refused").into());
            }
            Ok(())
        })
    }

    fn command(&self, _image: &str, _limits: &ResourceLimits) -> Command {
        // `sh` with no arguments reads the script from stdin, like the
        // interpreter inside the container does.
        Command::new(&self.program)
    }
}
