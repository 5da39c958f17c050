//! Test-only mock collaborators for the placement engine.

use std::collections::HashMap;

use anyhow::{Result, bail};

use crate::topology::{GroupResolver, QueueKind, QueueRef, QueueTopology};

/// In-memory queue hierarchy built from dotted path strings.
///
/// Every path component is registered under its full path and its short
/// (leaf segment) name; a short name shared by several queues becomes
/// ambiguous and resolves to nothing.
#[derive(Debug, Clone, Default)]
pub struct MockTopology {
    by_full_path: HashMap<String, QueueRef>,
    by_short_name: HashMap<String, Vec<String>>,
}

impl MockTopology {
    pub fn builder() -> MockTopologyBuilder {
        MockTopologyBuilder::default()
    }
}

impl QueueTopology for MockTopology {
    fn get_queue(&self, name_or_path: &str) -> Option<QueueRef> {
        if let Some(queue) = self.by_full_path.get(name_or_path) {
            return Some(queue.clone());
        }
        match self.by_short_name.get(name_or_path).map(Vec::as_slice) {
            Some([full_path]) => self.by_full_path.get(full_path).cloned(),
            _ => None,
        }
    }

    fn get_queue_by_full_name(&self, full_path: &str) -> Option<QueueRef> {
        self.by_full_path.get(full_path).cloned()
    }

    fn is_ambiguous(&self, name: &str) -> bool {
        self.by_short_name
            .get(name)
            .is_some_and(|paths| paths.len() > 1)
    }

    fn children(&self, full_path: &str) -> Vec<QueueRef> {
        let prefix = format!("{full_path}.");
        let mut children: Vec<QueueRef> = self
            .by_full_path
            .iter()
            .filter(|(path, _)| {
                path.strip_prefix(&prefix)
                    .is_some_and(|rest| !rest.contains('.'))
            })
            .map(|(_, queue)| queue.clone())
            .collect();
        children.sort_by(|a, b| a.full_path().cmp(b.full_path()));
        children
    }
}

/// Builder assembling a [`MockTopology`] from queue paths and managed-parent
/// markers.
///
/// Panics on inconsistent hierarchies (a queue under a managed parent, or a
/// managed parent that was also added as a plain queue); these are test
/// setup bugs.
#[derive(Debug, Clone, Default)]
pub struct MockTopologyBuilder {
    queue_paths: Vec<String>,
    managed_parents: Vec<String>,
}

impl MockTopologyBuilder {
    pub fn with_queue(mut self, path: &str) -> Self {
        self.queue_paths.push(path.to_string());
        self
    }

    pub fn with_managed_parent(mut self, path: &str) -> Self {
        self.managed_parents.push(path.to_string());
        self
    }

    pub fn build(self) -> MockTopology {
        let mut paths = self.queue_paths.clone();
        for managed in &self.managed_parents {
            assert!(
                !paths.contains(managed),
                "cannot add a managed parent and a plain queue with the same path"
            );
            paths.push(managed.clone());
        }

        let mut topology = MockTopology::default();
        for path in &paths {
            self.add_path(&mut topology, path);
        }
        topology
    }

    fn add_path(&self, topology: &mut MockTopology, path: &str) {
        let components: Vec<&str> = path.split('.').collect();
        let mut current = String::new();
        for (i, component) in components.iter().enumerate() {
            let is_last = i == components.len() - 1;
            let parent = current.clone();
            if current.is_empty() {
                current = (*component).to_string();
            } else {
                current = format!("{current}.{component}");
            }

            assert!(
                is_last || !self.managed_parents.contains(&parent),
                "cannot add a queue under managed parent '{parent}'"
            );

            if topology.by_full_path.contains_key(&current) {
                continue;
            }

            let kind = if current == "root" {
                QueueKind::Parent
            } else if self.managed_parents.contains(&current) {
                QueueKind::ManagedParent
            } else if is_last {
                QueueKind::Leaf
            } else {
                QueueKind::Parent
            };

            topology
                .by_full_path
                .insert(current.clone(), QueueRef::new(&current, kind));
            topology
                .by_short_name
                .entry((*component).to_string())
                .or_default()
                .push(current.clone());
        }
    }
}

/// Fixed user-to-groups mapping; the first group is the primary one.
#[derive(Debug, Clone, Default)]
pub struct StaticGroups {
    groups: HashMap<String, Vec<String>>,
}

impl StaticGroups {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, user: &str, groups: &[&str]) -> Self {
        self.groups.insert(
            user.to_string(),
            groups.iter().map(|g| (*g).to_string()).collect(),
        );
        self
    }
}

impl GroupResolver for StaticGroups {
    fn groups_of(&self, user: &str) -> Result<Vec<String>> {
        Ok(self.groups.get(user).cloned().unwrap_or_default())
    }
}

/// Group resolver that always fails, for error-path tests.
#[derive(Debug, Clone, Default)]
pub struct FailingGroups;

impl GroupResolver for FailingGroups {
    fn groups_of(&self, user: &str) -> Result<Vec<String>> {
        bail!("group lookup failed for '{user}'")
    }
}
