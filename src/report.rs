// src/report.rs

//! Rendering of captured output into report text.
//!
//! Reports are plain text meant for a chat transport. Each non-empty stream
//! becomes a labelled fenced block:
//!
//! ````text
//! STDOUT (PARTIAL)
//!
//! ```
//! line 1
//! line 2
//! ```
//! ````
//!
//! Every `@` is swapped for U+FF20 so script output cannot mention users.

use crate::types::StatusTag;

/// Reserved by chat transports for mentions.
const MENTION: char = '@';
/// FULLWIDTH COMMERCIAL AT, renders like `@` but is not a mention.
const MENTION_SUBSTITUTE: char = '\u{FF20}';

/// Render stdout/stderr lines under `tag`.
///
/// Returns an empty string when both slices are empty; callers decide whether
/// that means "send nothing" or "send the bare tag".
pub fn render(stdout: &[String], stderr: &[String], tag: StatusTag) -> String {
    let mut text = String::new();

    if !stdout.is_empty() {
        push_block(&mut text, "STDOUT", tag, stdout);
    }
    if !stderr.is_empty() {
        if !text.is_empty() {
            text.push_str("\n\n");
        }
        push_block(&mut text, "STDERR", tag, stderr);
    }

    escape_mentions(&text)
}

fn push_block(text: &mut String, label: &str, tag: StatusTag, lines: &[String]) {
    text.push_str(label);
    text.push(' ');
    text.push_str(&tag.to_string());
    text.push_str("\n\n```\n");
    text.push_str(&lines.join("\n"));
    text.push_str("\n```");
}

pub fn escape_mentions(text: &str) -> String {
    text.replace(MENTION, &MENTION_SUBSTITUTE.to_string())
}

/// A finished, immutable report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    tag: StatusTag,
    text: String,
}

impl Report {
    /// Interim report; `None` when there is nothing to say.
    pub fn partial(stdout: &[String], stderr: &[String]) -> Option<Self> {
        let text = render(stdout, stderr, StatusTag::Partial);
        if text.is_empty() {
            return None;
        }
        Some(Self {
            tag: StatusTag::Partial,
            text,
        })
    }

    /// Session-closing report. Never empty: falls back to the bare tag.
    pub fn terminal(tag: StatusTag, stdout: &[String], stderr: &[String]) -> Self {
        let mut text = render(stdout, stderr, tag);
        if text.is_empty() {
            text = tag.to_string();
        }
        Self { tag, text }
    }

    /// Sent before a blocking image pull.
    pub fn download(image: &str) -> Self {
        Self {
            tag: StatusTag::Download,
            text: escape_mentions(&format!("(DOWNLOAD {image})")),
        }
    }

    /// Sent instead of any output when the sandbox could not be started.
    pub fn error(detail: &str) -> Self {
        Self {
            tag: StatusTag::Error,
            text: escape_mentions(&format!("{}\n\n```\n{detail}\n```", StatusTag::Error)),
        }
    }

    pub fn tag(&self) -> StatusTag {
        self.tag
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn into_text(self) -> String {
        self.text
    }
}
