// src/command/matcher.rs

use tracing::trace;

use super::images::ImageTable;

/// A recognised command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandMatch {
    pub keyword: String,
    pub image: String,
}

/// Decides whether an inbound text is a script command.
#[derive(Debug, Clone)]
pub struct CommandMatcher {
    prefix: String,
    images: ImageTable,
}

impl CommandMatcher {
    pub fn new(prefix: impl Into<String>, images: ImageTable) -> Self {
        Self {
            prefix: prefix.into(),
            images,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn images(&self) -> &ImageTable {
        &self.images
    }

    /// Match `text` against `prefix + keyword`.
    ///
    /// When several keywords match (`/py` and `/python` for `/python3`), the
    /// longest keyword wins, so the result does not depend on table order.
    pub fn match_command(&self, text: &str) -> Option<CommandMatch> {
        let rest = text.strip_prefix(self.prefix.as_str())?;

        let (keyword, image) = self
            .images
            .iter()
            .filter(|(keyword, _)| rest.starts_with(keyword))
            .max_by_key(|(keyword, _)| keyword.len())?;

        trace!(keyword, image, "command matched");
        Some(CommandMatch {
            keyword: keyword.to_string(),
            image: image.to_string(),
        })
    }

    /// Help text: one line per keyword.
    pub fn describe(&self) -> String {
        self.images
            .iter()
            .map(|(keyword, image)| {
                format!("{}{keyword}: run script in \"{image}\"\n", self.prefix)
            })
            .collect()
    }
}

/// Script body: everything after the command line.
pub fn extract_script(text: &str) -> String {
    match text.split_once('\n') {
        Some((_command, body)) => body.to_string(),
        None => String::new(),
    }
}
