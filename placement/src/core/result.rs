//! Rule evaluation outcomes.

use std::fmt;

/// The four-valued kind of a rule outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleResultKind {
    /// This rule does not decide; continue with the next one.
    Skip,
    /// The submission is rejected; stop.
    Reject,
    /// Place the submission into the carried queue, subject to validation.
    Place,
    /// Place the submission into whatever queue `%default` currently names.
    PlaceToDefault,
}

/// Outcome of evaluating a single rule's action.
///
/// Only `Place` carries data: the raw queue string produced by the action
/// and its normalized form, which starts equal to the raw string and is
/// overwritten exactly once by the engine after successful validation.
/// The other kinds are zero-data variants, so they cost nothing to produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleResult {
    Skip,
    Reject,
    Place {
        queue: String,
        normalized_queue: String,
    },
    PlaceToDefault,
}

impl RuleResult {
    /// Placement outcome carrying the (possibly variable-laden) queue string.
    pub fn place(queue: impl Into<String>) -> Self {
        let queue = queue.into();
        Self::Place {
            normalized_queue: queue.clone(),
            queue,
        }
    }

    pub fn kind(&self) -> RuleResultKind {
        match self {
            Self::Skip => RuleResultKind::Skip,
            Self::Reject => RuleResultKind::Reject,
            Self::Place { .. } => RuleResultKind::Place,
            Self::PlaceToDefault => RuleResultKind::PlaceToDefault,
        }
    }

    /// Raw queue string; only present for `Place`.
    pub fn queue(&self) -> Option<&str> {
        match self {
            Self::Place { queue, .. } => Some(queue),
            _ => None,
        }
    }

    /// Normalized queue string; only present for `Place`.
    pub fn normalized_queue(&self) -> Option<&str> {
        match self {
            Self::Place {
                normalized_queue, ..
            } => Some(normalized_queue),
            _ => None,
        }
    }

    /// Record the validated, fully-qualified queue. No-op for non-`Place`.
    pub fn update_normalized_queue(&mut self, normalized: impl Into<String>) {
        if let Self::Place {
            normalized_queue, ..
        } = self
        {
            *normalized_queue = normalized.into();
        }
    }
}

impl fmt::Display for RuleResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Skip => write!(f, "SKIP"),
            Self::Reject => write!(f, "REJECT"),
            Self::PlaceToDefault => write!(f, "PLACE_TO_DEFAULT"),
            Self::Place {
                queue,
                normalized_queue,
            } => write!(f, "PLACE: '{normalized_queue}' ('{queue}')"),
        }
    }
}
