//! Actions taken when a rule's matcher accepts a submission.

use std::fmt;

use crate::core::result::RuleResult;
use crate::core::variables::VariableContext;
use crate::validation::ValidationContext;

/// Name of the mutable variable holding the current default queue.
pub const DEFAULT_QUEUE_VARIABLE: &str = "%default";

/// Alternate result used when an action's primary result fails validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Fallback {
    Skip,
    #[default]
    Reject,
    PlaceToDefault,
}

impl Fallback {
    pub fn result(self) -> RuleResult {
        match self {
            Self::Skip => RuleResult::Skip,
            Self::Reject => RuleResult::Reject,
            Self::PlaceToDefault => RuleResult::PlaceToDefault,
        }
    }
}

/// Closed set of action behaviors.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ActionKind {
    /// Place into a queue template, path-substituted at execution time.
    PlaceToQueue { queue: String },
    /// Reject the submission.
    Reject,
    /// Place into the queue currently named by `%default`.
    PlaceToDefault,
    /// Overwrite a variable with a substituted value, then skip.
    VariableUpdate { variable: String, value: String },
}

/// A configured action plus its fallback.
///
/// Actions are configuration-time values, read-only for the lifetime of the
/// engine. The fallback defaults to reject unless set otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    kind: ActionKind,
    fallback: Fallback,
}

impl Action {
    pub fn place_to_queue(queue: impl Into<String>) -> Self {
        Self {
            kind: ActionKind::PlaceToQueue {
                queue: queue.into(),
            },
            fallback: Fallback::default(),
        }
    }

    pub fn reject() -> Self {
        Self {
            kind: ActionKind::Reject,
            fallback: Fallback::default(),
        }
    }

    pub fn place_to_default() -> Self {
        Self {
            kind: ActionKind::PlaceToDefault,
            fallback: Fallback::default(),
        }
    }

    pub fn variable_update(variable: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            kind: ActionKind::VariableUpdate {
                variable: variable.into(),
                value: value.into(),
            },
            fallback: Fallback::default(),
        }
    }

    /// Overwrite `%default` with a new queue reference.
    pub fn update_default(queue: impl Into<String>) -> Self {
        Self::variable_update(DEFAULT_QUEUE_VARIABLE, queue)
    }

    pub fn with_fallback(mut self, fallback: Fallback) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn fallback_skip(self) -> Self {
        self.with_fallback(Fallback::Skip)
    }

    pub fn fallback_reject(self) -> Self {
        self.with_fallback(Fallback::Reject)
    }

    pub fn fallback_default_placement(self) -> Self {
        self.with_fallback(Fallback::PlaceToDefault)
    }

    pub fn fallback(&self) -> Fallback {
        self.fallback
    }

    /// The result substituted by the engine when the primary result fails
    /// validation. Never a `Place` by construction.
    pub fn fallback_result(&self) -> RuleResult {
        self.fallback.result()
    }

    /// Produce this action's result against the variable context.
    ///
    /// The only failure mode is a variable update hitting an immutable
    /// variable, which aborts the whole evaluation pass.
    pub fn execute(&self, variables: &mut VariableContext) -> Result<RuleResult, String> {
        match &self.kind {
            ActionKind::PlaceToQueue { queue } => {
                Ok(RuleResult::place(variables.replace_path_variables(queue)))
            }
            ActionKind::Reject => Ok(RuleResult::Reject),
            ActionKind::PlaceToDefault => Ok(RuleResult::PlaceToDefault),
            ActionKind::VariableUpdate { variable, value } => {
                let substituted = variables.replace_variables(value);
                variables.put(variable, substituted)?;
                Ok(RuleResult::Skip)
            }
        }
    }

    /// Configuration-time self check against the validation context.
    ///
    /// Place actions prove their queue template can resolve to a leaf for
    /// some substitution; variable updates register their target name as a
    /// known variable. Reject and default placement have nothing to check.
    pub fn validate(&self, ctx: &mut ValidationContext<'_>) -> Result<(), String> {
        match &self.kind {
            ActionKind::PlaceToQueue { queue } => ctx.validate_queue_path(queue),
            ActionKind::VariableUpdate { variable, .. } => ctx.add_update_target(variable),
            ActionKind::Reject | ActionKind::PlaceToDefault => Ok(()),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ActionKind::PlaceToQueue { queue } => write!(f, "place('{queue}')"),
            ActionKind::Reject => write!(f, "reject"),
            ActionKind::PlaceToDefault => write!(f, "place_to_default"),
            ActionKind::VariableUpdate { variable, value } => {
                write!(f, "update('{variable}' = '{value}')")
            }
        }
    }
}
