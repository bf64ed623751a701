#![allow(dead_code)]

use std::time::Duration;

use serde_json::{Map, Value, json};

use script_docker::config::ConfigFile;
use script_docker::message::{Message, MessageBody};

/// Builder for `ConfigFile` to simplify test setup.
///
/// Starts from defaults with short timings so sessions finish quickly.
pub struct ConfigFileBuilder {
    config: ConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        let mut config = ConfigFile::default();
        config.output.flush_interval_ms = 10_000;
        config.limits.exec_duration_sec = 5;
        Self { config }
    }

    pub fn prefix(mut self, prefix: &str) -> Self {
        self.config.command.prefix = prefix.to_string();
        self
    }

    pub fn flush_interval(mut self, interval: Duration) -> Self {
        self.config.output.flush_interval_ms = interval.as_millis() as u64;
        self
    }

    pub fn batch_lines(mut self, lines: usize) -> Self {
        self.config.output.batch_lines = lines;
        self
    }

    pub fn exec_duration_secs(mut self, secs: u64) -> Self {
        self.config.limits.exec_duration_sec = secs;
        self
    }

    pub fn image(mut self, keyword: &str, image: &str) -> Self {
        self.config
            .images
            .insert(keyword.to_string(), image.to_string());
        self
    }

    pub fn build(self) -> ConfigFile {
        self.config
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for inbound `Message`s carrying chat addressing metadata.
pub struct MessageBuilder {
    text: String,
    extra: Map<String, Value>,
}

impl MessageBuilder {
    pub fn new(text: &str) -> Self {
        let mut extra = Map::new();
        extra.insert("user".to_string(), json!({ "id": "tester" }));
        extra.insert("room".to_string(), json!({ "id": "sandbox" }));
        Self {
            text: text.to_string(),
            extra,
        }
    }

    /// A `/bash`-style command followed by `script`.
    pub fn command(keyword: &str, script: &str) -> Self {
        Self::new(&format!("/{keyword}\n{script}"))
    }

    pub fn build(self) -> Message {
        let mut body = Map::new();
        body.insert("id".to_string(), json!("m-1"));
        Message {
            message: MessageBody {
                text: self.text,
                extra: body,
            },
            mode: None,
            extra: self.extra,
        }
    }
}
