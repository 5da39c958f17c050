//! A placement rule: one matcher paired with one action.

use std::fmt;

use crate::core::action::Action;
use crate::core::matcher::Matcher;
use crate::core::result::RuleResult;
use crate::core::variables::VariableContext;
use crate::validation::ValidationContext;

/// Immutable (matcher, action) pair evaluated in declared order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    matcher: Matcher,
    action: Action,
}

impl Rule {
    pub fn new(matcher: Matcher, action: Action) -> Self {
        Self { matcher, action }
    }

    /// Shorthand for the legacy one-letter rule notation: `u` matches a
    /// user, `g` a primary group, anything else an application name. The
    /// action always places to `path`.
    pub fn legacy(kind: &str, source: &str, path: &str) -> Self {
        let matcher = match kind {
            "u" => Matcher::user(source),
            "g" => Matcher::primary_group(source),
            _ => Matcher::application(source),
        };
        Self::new(matcher, Action::place_to_queue(path))
    }

    /// Evaluate the rule against the variable context.
    ///
    /// Returns `None` when the matcher does not accept the submission,
    /// otherwise the action's result (or the action's execution error).
    pub fn evaluate(&self, variables: &mut VariableContext) -> Option<Result<RuleResult, String>> {
        if self.matcher.matches(variables) {
            return Some(self.action.execute(variables));
        }
        None
    }

    /// The action's configured fallback result.
    pub fn fallback_result(&self) -> RuleResult {
        self.action.fallback_result()
    }

    /// Configuration-time validation, delegated to the action.
    pub fn validate(&self, ctx: &mut ValidationContext<'_>) -> Result<(), String> {
        self.action.validate(ctx)
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rule{{matcher={}, action={}}}", self.matcher, self.action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::result::RuleResultKind;

    fn context_for(user: &str) -> VariableContext {
        let mut ctx = VariableContext::new();
        ctx.put("%user", user).expect("put");
        ctx.put("%primary_group", "devs").expect("put");
        ctx.put("%application", "etl").expect("put");
        ctx
    }

    #[test]
    fn evaluate_returns_none_when_matcher_declines() {
        let rule = Rule::new(Matcher::user("bob"), Action::place_to_queue("root.a"));
        assert!(rule.evaluate(&mut context_for("alice")).is_none());
    }

    #[test]
    fn evaluate_runs_action_when_matcher_accepts() {
        let rule = Rule::new(Matcher::user("alice"), Action::place_to_queue("root.%user"));
        let result = rule
            .evaluate(&mut context_for("alice"))
            .expect("matched")
            .expect("executed");
        assert_eq!(result.queue(), Some("root.alice"));
    }

    #[test]
    fn legacy_shorthand_selects_matcher_by_kind() {
        let mut ctx = context_for("alice");
        assert!(Rule::legacy("u", "alice", "root.q").evaluate(&mut ctx).is_some());
        assert!(Rule::legacy("g", "devs", "root.q").evaluate(&mut ctx).is_some());
        assert!(Rule::legacy("a", "etl", "root.q").evaluate(&mut ctx).is_some());
        assert!(Rule::legacy("a", "other", "root.q").evaluate(&mut ctx).is_none());
    }

    #[test]
    fn fallback_result_comes_from_the_action() {
        let rule = Rule::new(
            Matcher::All,
            Action::place_to_queue("root.q").fallback_skip(),
        );
        assert_eq!(rule.fallback_result().kind(), RuleResultKind::Skip);
    }
}
