//! Configuration-time validation of rule target queue paths.
//!
//! A path is *static* when none of its segments is a declared rule variable,
//! and *dynamic* otherwise. Static paths must reconcile fully against the
//! live topology; dynamic paths are checked as far as their static prefix
//! allows. Errors are stable strings surfaced to the host at initialization.

use std::collections::HashSet;

use crate::core::path::{DOT, QueuePath};
use crate::topology::QueueTopology;

/// Tracks the variable names known to the rule set and validates queue
/// paths against the topology.
///
/// Seeded with the engine's built-in variables; grows as rules declare the
/// variables they write. Once a name is known, any path segment equal to it
/// is classified dynamic for the remainder of validation.
pub struct ValidationContext<'a> {
    known_variables: HashSet<String>,
    immutable_variables: HashSet<String>,
    topology: &'a dyn QueueTopology,
}

impl<'a> ValidationContext<'a> {
    pub fn new(topology: &'a dyn QueueTopology) -> Self {
        Self {
            known_variables: HashSet::new(),
            immutable_variables: HashSet::new(),
            topology,
        }
    }

    /// Register a variable name that may appear in queue paths.
    pub fn add_variable(&mut self, variable: &str) {
        self.known_variables.insert(variable.to_string());
    }

    /// Register a variable that is immutable once seeded.
    pub fn add_immutable_variable(&mut self, variable: &str) {
        self.immutable_variables.insert(variable.to_string());
        self.add_variable(variable);
    }

    /// Register a variable written by a rule. Declaring an immutable
    /// variable as an update target is a configuration error.
    pub fn add_update_target(&mut self, variable: &str) -> Result<(), String> {
        if self.immutable_variables.contains(variable) {
            return Err(format!(
                "variable '{variable}' is immutable and cannot be a rule update target"
            ));
        }
        self.add_variable(variable);
        Ok(())
    }

    /// Snapshot of the currently known variable names.
    pub fn variables(&self) -> &HashSet<String> {
        &self.known_variables
    }

    /// True iff no dot-separated segment of `queue_path` is a known variable.
    pub fn is_path_static(&self, queue_path: &str) -> bool {
        queue_path
            .split(DOT)
            .all(|part| !self.known_variables.contains(part))
    }

    /// Validate a (possibly templated) queue path against the topology.
    pub fn validate_queue_path(&self, queue_path: &str) -> Result<(), String> {
        let path = QueuePath::parse(queue_path);
        if self.is_path_static(queue_path) {
            self.validate_static_path(&path)
        } else {
            self.validate_dynamic_path(&path)
        }
    }

    fn validate_static_path(&self, path: &QueuePath) -> Result<(), String> {
        let full_path = path.full_path();
        if let Some(queue) = self.topology.get_queue(&full_path) {
            // the reference resolved, it just has to be a placeable queue
            if !queue.is_leaf() {
                return Err(format!(
                    "target queue '{path}' references a non-leaf queue, \
                     target queues must always be leaf queues"
                ));
            }
            return Ok(());
        }

        if self.topology.is_ambiguous(&full_path) {
            return Err(format!(
                "target queue is an ambiguous leaf queue '{full_path}'"
            ));
        }

        // the leaf does not exist yet, so it can only be valid under a
        // managed parent or as a short reference into an existing parent
        let Some(parent) = path.parent() else {
            return Err(format!(
                "target queue does not exist and has no parent defined '{full_path}'"
            ));
        };

        let Some(parent_queue) = self.topology.get_queue(parent) else {
            if self.topology.is_ambiguous(parent) {
                return Err(format!(
                    "target queue path '{path}' contains an ambiguous parent queue '{parent}' reference"
                ));
            }
            return Err(format!(
                "target queue path '{path}' contains an invalid parent queue '{parent}'"
            ));
        };

        if parent_queue.is_managed_parent() {
            return Ok(());
        }

        // the parent may have been a short reference; look for the leaf
        // under the parent's full path
        let normalized = format!("{}{DOT}{}", parent_queue.full_path(), path.leaf());
        match self.topology.get_queue(&normalized) {
            Some(queue) if queue.is_leaf() => Ok(()),
            Some(_) => Err(format!(
                "target queue '{path}' references a non-leaf queue, \
                 target queues must always be leaf queues"
            )),
            None => Err(format!(
                "target queue '{full_path}' does not exist and has a non-managed parent queue defined"
            )),
        }
    }

    fn validate_dynamic_path(&self, path: &QueuePath) -> Result<(), String> {
        // the dynamic segment can be substituted to anything, so a lone
        // dynamic segment cannot be validated further
        let Some(parent) = path.parent() else {
            return Ok(());
        };

        // a dynamic parent is likewise unverifiable
        if !self.is_path_static(parent) {
            return Ok(());
        }

        let Some(parent_queue) = self.topology.get_queue(parent) else {
            return Err(format!(
                "target queue path '{path}' contains an invalid parent queue"
            ));
        };

        if parent_queue.is_managed_parent() {
            return Ok(());
        }

        // an unmanaged parent cannot auto-create, so the substituted leaf
        // can only land among already existing children
        let has_leaf_child = self
            .topology
            .children(parent_queue.full_path())
            .iter()
            .any(|child| child.is_leaf());
        if has_leaf_child {
            return Ok(());
        }

        Err(format!(
            "target queue path '{path}' has a non-managed parent queue which has no leaf queues either"
        ))
    }
}
