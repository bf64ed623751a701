// src/command/images.rs

use std::collections::BTreeMap;

/// Built-in keyword → image references.
pub const DEFAULT_IMAGES: &[(&str, &str)] = &[
    ("bash", "archlinux/base"),
    ("node", "node:lts-alpine"),
    ("php", "php:alpine"),
    ("python", "python:alpine"),
    ("ruby", "ruby:alpine"),
];

/// Keyword → fully qualified image reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageTable {
    entries: BTreeMap<String, String>,
}

impl Default for ImageTable {
    fn default() -> Self {
        Self {
            entries: DEFAULT_IMAGES
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}

impl ImageTable {
    pub fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// The built-in table with `extra` entries added (or replacing defaults).
    pub fn with_overrides<'a>(extra: impl IntoIterator<Item = (&'a String, &'a String)>) -> Self {
        let mut table = Self::default();
        for (keyword, image) in extra {
            table.insert(keyword.clone(), image.clone());
        }
        table
    }

    pub fn insert(&mut self, keyword: impl Into<String>, image: impl Into<String>) {
        self.entries.insert(keyword.into(), image.into());
    }

    pub fn get(&self, keyword: &str) -> Option<&str> {
        self.entries.get(keyword).map(String::as_str)
    }

    /// Entries in keyword order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
