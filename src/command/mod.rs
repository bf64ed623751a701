// src/command/mod.rs

//! Recognition of script commands in inbound message text.
//!
//! A command is the configured prefix followed by an image keyword on the
//! first line (`/python`); the remaining lines are the script.

pub mod images;
pub mod matcher;

pub use images::{DEFAULT_IMAGES, ImageTable};
pub use matcher::{CommandMatch, CommandMatcher, extract_script};
