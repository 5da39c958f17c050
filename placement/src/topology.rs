//! Collaborator traits implemented by the host scheduler.
//!
//! The engine never mutates the queue hierarchy; it only performs in-memory
//! lookups through these seams. Implementations must be safe for
//! unsynchronized concurrent reads for the lifetime of the engine.

use anyhow::Result;

/// Classification of a queue within the hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueKind {
    /// Directly holds running applications.
    Leaf,
    /// Organizational parent; children must pre-exist.
    Parent,
    /// Auto-creating parent; leaf children may be referenced before they
    /// exist.
    ManagedParent,
}

/// Resolved reference to a queue in the live hierarchy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueRef {
    full_path: String,
    kind: QueueKind,
}

impl QueueRef {
    pub fn new(full_path: impl Into<String>, kind: QueueKind) -> Self {
        Self {
            full_path: full_path.into(),
            kind,
        }
    }

    /// Fully-qualified dotted path of the queue.
    pub fn full_path(&self) -> &str {
        &self.full_path
    }

    pub fn kind(&self) -> QueueKind {
        self.kind
    }

    pub fn is_leaf(&self) -> bool {
        self.kind == QueueKind::Leaf
    }

    pub fn is_managed_parent(&self) -> bool {
        self.kind == QueueKind::ManagedParent
    }
}

/// Read-only view of the live queue hierarchy.
///
/// Short (non-fully-qualified) names resolve only when unambiguous; an
/// ambiguous short name resolves to nothing and reports ambiguity instead.
pub trait QueueTopology {
    /// Resolve a full path or an unambiguous short name.
    fn get_queue(&self, name_or_path: &str) -> Option<QueueRef>;

    /// Resolve strictly by full path.
    fn get_queue_by_full_name(&self, full_path: &str) -> Option<QueueRef>;

    /// True if the short name resolves to more than one queue.
    fn is_ambiguous(&self, name: &str) -> bool;

    /// Direct children of the queue at `full_path`.
    fn children(&self, full_path: &str) -> Vec<QueueRef>;
}

/// Group membership resolution for submitting users.
pub trait GroupResolver {
    /// Ordered groups of `user`; the first entry is the primary group.
    fn groups_of(&self, user: &str) -> Result<Vec<String>>;
}
