// src/plugin.rs

//! Host adapter.
//!
//! A chat host sees three entry points:
//! - [`ScriptPlugin::initialize`] with the outbound sink,
//! - [`ScriptPlugin::handle`] for every inbound message,
//! - [`ScriptPlugin::describe`] for help text.
//!
//! Everything below (launcher, session engine) is independent of the host.

use std::sync::Arc;

use tracing::{debug, error, info};

use crate::command::{CommandMatcher, ImageTable, extract_script};
use crate::config::ConfigFile;
use crate::engine::{Session, SessionOptions, SessionOutcome};
use crate::errors::Result;
use crate::exec::{DockerBackend, LaunchRequest, ResourceLimits, SandboxBackend, launch};
use crate::message::{Emitter, Message, OutboundSender};
use crate::report::Report;

#[derive(Clone)]
pub struct ScriptPlugin {
    matcher: CommandMatcher,
    limits: ResourceLimits,
    options: SessionOptions,
    backend: Arc<dyn SandboxBackend>,
    sink: OutboundSender,
}

impl std::fmt::Debug for ScriptPlugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptPlugin")
            .field("matcher", &self.matcher)
            .field("limits", &self.limits)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl ScriptPlugin {
    /// Plugin backed by the configured container runtime CLI.
    pub fn initialize(config: &ConfigFile, sink: OutboundSender) -> Self {
        let backend = Arc::new(DockerBackend::new(config.runtime.program.clone()));
        Self::with_backend(config, backend, sink)
    }

    pub fn with_backend(
        config: &ConfigFile,
        backend: Arc<dyn SandboxBackend>,
        sink: OutboundSender,
    ) -> Self {
        let images = ImageTable::with_overrides(&config.images);
        Self {
            matcher: CommandMatcher::new(config.command.prefix.clone(), images),
            limits: ResourceLimits::from(&config.limits),
            options: SessionOptions::from(config),
            backend,
            sink,
        }
    }

    pub fn describe(&self) -> String {
        self.matcher.describe()
    }

    /// Handle one inbound message. Errors are logged, never returned.
    pub async fn handle(&self, msg: &Message) {
        if let Err(e) = self.execute(msg).await {
            error!(error = %e, "script execution failed");
        }
    }

    /// Run the script in `msg` if it is a command.
    ///
    /// Returns `Ok(None)` for messages that are not commands. A launch
    /// failure is reported to the sender as an `ERROR` report and returned.
    pub async fn execute(&self, msg: &Message) -> Result<Option<SessionOutcome>> {
        let Some(command) = self.matcher.match_command(msg.text()) else {
            return Ok(None);
        };

        let script = extract_script(msg.text());
        info!(keyword = %command.keyword, image = %command.image, "use image");
        debug!(%script, "script");

        let emitter = Emitter::new(msg.clone(), self.sink.clone());
        let request = LaunchRequest {
            image: command.image,
            script,
            limits: self.limits,
        };

        let process = match launch(self.backend.as_ref(), &request, &emitter).await {
            Ok(process) => process,
            Err(e) => {
                emitter.emit(&Report::error(&e.to_string())).await;
                return Err(e);
            }
        };

        let outcome = Session::new(emitter, self.options).run(process).await;
        Ok(Some(outcome))
    }
}
