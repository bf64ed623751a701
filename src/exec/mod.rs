// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`backend`] abstracts the container runtime (`docker` in production).
//! - [`launcher`] builds the sandbox invocation, handles missing images and
//!   starts the process with the script on stdin.
//! - [`pump`] copies one output stream into a [`crate::buffer::LineBuffer`].

pub mod backend;
pub mod launcher;
pub mod pump;

pub use backend::{BoxFuture, DockerBackend, SandboxBackend};
pub use launcher::{LaunchRequest, ResourceLimits, SpawnedProcess, launch, run_args};
pub use pump::pump_lines;
