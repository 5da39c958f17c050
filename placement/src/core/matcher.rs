//! Predicates deciding whether a rule applies to a submission.

use std::fmt;

use crate::core::variables::VariableContext;

/// Closed set of matchers evaluated against the variable context.
///
/// The set is fixed and enumerable, so a sum type with exhaustive matching
/// replaces an open interface hierarchy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Matcher {
    /// Matches every submission.
    All,
    /// Compares a variable's value against a template. Variables inside the
    /// template are substituted before comparison. A missing variable name
    /// never matches.
    Variable {
        variable: Option<String>,
        value: String,
    },
    /// Short-circuiting conjunction, evaluated left to right. Vacuously true
    /// when empty.
    And(Vec<Matcher>),
    /// Short-circuiting disjunction, evaluated left to right. False when
    /// empty.
    Or(Vec<Matcher>),
}

impl Matcher {
    pub fn matches(&self, variables: &VariableContext) -> bool {
        match self {
            Self::All => true,
            Self::Variable { variable, value } => {
                let Some(variable) = variable else {
                    return false;
                };
                let substituted = variables.replace_variables(value);
                substituted == variables.get(variable)
            }
            Self::And(matchers) => matchers.iter().all(|m| m.matches(variables)),
            Self::Or(matchers) => matchers.iter().any(|m| m.matches(variables)),
        }
    }

    pub fn variable(variable: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Variable {
            variable: Some(variable.into()),
            value: value.into(),
        }
    }

    /// Matches the submitting user's name.
    pub fn user(user: impl Into<String>) -> Self {
        Self::variable("%user", user)
    }

    /// Matches the submitter's primary group.
    pub fn primary_group(group: impl Into<String>) -> Self {
        Self::variable("%primary_group", group)
    }

    /// Matches the submitted application's name.
    pub fn application(name: impl Into<String>) -> Self {
        Self::variable("%application", name)
    }

    /// Matches user name and primary group together.
    pub fn user_group(user: impl Into<String>, group: impl Into<String>) -> Self {
        Self::And(vec![Self::user(user), Self::primary_group(group)])
    }
}

impl fmt::Display for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => write!(f, "all"),
            Self::Variable { variable, value } => {
                write!(f, "{} == '{value}'", variable.as_deref().unwrap_or("<none>"))
            }
            Self::And(matchers) => {
                write!(f, "and(")?;
                fmt_list(f, matchers)?;
                write!(f, ")")
            }
            Self::Or(matchers) => {
                write!(f, "or(")?;
                fmt_list(f, matchers)?;
                write!(f, ")")
            }
        }
    }
}

fn fmt_list(f: &mut fmt::Formatter<'_>, matchers: &[Matcher]) -> fmt::Result {
    for (i, matcher) in matchers.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{matcher}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> VariableContext {
        let mut ctx = VariableContext::new();
        ctx.put("%user", "alice").expect("put");
        ctx.put("%primary_group", "devs").expect("put");
        ctx.put("%application", "etl").expect("put");
        ctx
    }

    #[test]
    fn all_matches_everything() {
        assert!(Matcher::All.matches(&context()));
    }

    #[test]
    fn variable_matcher_compares_against_stored_value() {
        let ctx = context();
        assert!(Matcher::user("alice").matches(&ctx));
        assert!(!Matcher::user("bob").matches(&ctx));
        assert!(Matcher::application("etl").matches(&ctx));
    }

    /// The template side is substituted before comparison.
    #[test]
    fn variable_matcher_substitutes_template() {
        let mut ctx = context();
        ctx.put("%alias", "alice").expect("put");
        assert!(Matcher::user("%alias").matches(&ctx));
    }

    /// A missing variable name never matches, even against empty values.
    #[test]
    fn variable_matcher_without_name_never_matches() {
        let matcher = Matcher::Variable {
            variable: None,
            value: String::new(),
        };
        assert!(!matcher.matches(&context()));
    }

    #[test]
    fn and_requires_all_to_match() {
        let ctx = context();
        assert!(Matcher::user_group("alice", "devs").matches(&ctx));
        assert!(!Matcher::user_group("alice", "ops").matches(&ctx));
        assert!(Matcher::And(Vec::new()).matches(&ctx));
    }

    #[test]
    fn or_requires_any_to_match() {
        let ctx = context();
        let either = Matcher::Or(vec![Matcher::user("bob"), Matcher::user("alice")]);
        assert!(either.matches(&ctx));
        let neither = Matcher::Or(vec![Matcher::user("bob"), Matcher::user("carol")]);
        assert!(!neither.matches(&ctx));
        assert!(!Matcher::Or(Vec::new()).matches(&ctx));
    }
}
