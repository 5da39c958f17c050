//! Dotted queue-path parsing and normalization.

use std::fmt;

/// Separator between queue-path segments.
pub const DOT: char = '.';

/// Derived (parent, leaf) view of a dotted queue reference.
///
/// The leaf is the last dot-separated segment; the parent is everything
/// before it, absent when the reference has no dot. A path may later be
/// re-derived from the fully-qualified string returned by a topology lookup,
/// which replaces both fields and marks the path normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuePath {
    parent: Option<String>,
    leaf: String,
    normalized: bool,
}

impl QueuePath {
    /// Parse a full reference, splitting on the last dot.
    pub fn parse(full_path: &str) -> Self {
        let (parent, leaf) = split_full_path(full_path);
        Self {
            parent,
            leaf,
            normalized: false,
        }
    }

    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    pub fn leaf(&self) -> &str {
        &self.leaf
    }

    pub fn has_parent(&self) -> bool {
        self.parent.is_some()
    }

    pub fn full_path(&self) -> String {
        match &self.parent {
            Some(parent) => format!("{parent}{DOT}{}", self.leaf),
            None => self.leaf.clone(),
        }
    }

    /// Re-derive the path from a fully-qualified reference.
    pub fn normalize(&mut self, normalized_path: &str) {
        let (parent, leaf) = split_full_path(normalized_path);
        self.parent = parent;
        self.leaf = leaf;
        self.normalized = true;
    }

    pub fn is_normalized(&self) -> bool {
        self.normalized
    }
}

fn split_full_path(full_path: &str) -> (Option<String>, String) {
    match full_path.rfind(DOT) {
        Some(idx) => (
            Some(full_path[..idx].trim().to_string()),
            full_path[idx + 1..].trim().to_string(),
        ),
        None => (None, full_path.to_string()),
    }
}

impl fmt::Display for QueuePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.full_path())
    }
}
