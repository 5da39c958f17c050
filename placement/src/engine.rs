//! Per-submission rule evaluation and placement construction.

use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, error, info, warn};

use crate::config::PlacementConfig;
use crate::core::action::DEFAULT_QUEUE_VARIABLE;
use crate::core::path::{DOT, QueuePath};
use crate::core::result::RuleResult;
use crate::core::rule::Rule;
use crate::core::variables::VariableContext;
use crate::topology::{GroupResolver, QueueTopology};
use crate::validation::ValidationContext;

/// Generic message surfaced to callers on rejection. Internal validation
/// detail is logged only; it must never leak topology information to
/// submitters.
pub const REJECTION_MESSAGE: &str =
    "Application has been rejected by a placement rule. Please see the logs for details.";

/// Requested-queue value meaning "no specific queue".
const DEFAULT_QUEUE_NAME: &str = "default";

/// Identity-derived variables, fixed once seeded for a submission.
const IMMUTABLE_VARIABLES: [&str; 5] = [
    "%user",
    "%primary_group",
    "%secondary_group",
    "%application",
    "%specified",
];

/// A job submission handed to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub user: String,
    /// Queue explicitly named by the submitter, if any.
    pub requested_queue: Option<String>,
    pub application: String,
}

impl Submission {
    pub fn new(user: impl Into<String>, application: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            requested_queue: None,
            application: application.into(),
        }
    }

    pub fn with_requested_queue(mut self, queue: impl Into<String>) -> Self {
        self.requested_queue = Some(queue.into());
        self
    }
}

/// A concrete queue assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    /// Leaf queue name.
    pub queue: String,
    /// Parent path, absent for root-level placements.
    pub parent: Option<String>,
}

impl Placement {
    fn from_normalized(queue_name: &str) -> Self {
        match queue_name.rfind(DOT) {
            Some(idx) => Self {
                queue: queue_name[idx + 1..].trim().to_string(),
                parent: Some(queue_name[..idx].trim().to_string()),
            },
            // reserved for future root-level placements; normalized paths
            // currently always carry a parent
            None => Self {
                queue: queue_name.to_string(),
                parent: None,
            },
        }
    }
}

/// Outcome of running the rule list for one submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlacementOutcome {
    /// A rule decided the queue; the placement is validated and normalized.
    Placed(Placement),
    /// The submission was rejected. Only [`REJECTION_MESSAGE`] may be shown
    /// to the submitter.
    Rejected,
    /// No rule decided; the caller should fall through to another placement
    /// mechanism.
    NoDecision,
}

/// Evaluates the configured rule list against submissions.
///
/// Rules, collaborators, and settings are fixed at construction and only
/// read afterwards, so one engine may serve concurrent submissions; each
/// `place` call owns its own variable context.
pub struct PlacementEngine {
    rules: Vec<Rule>,
    topology: Arc<dyn QueueTopology + Send + Sync>,
    groups: Arc<dyn GroupResolver + Send + Sync>,
    override_user_requests: bool,
    default_queue: String,
}

impl std::fmt::Debug for PlacementEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlacementEngine")
            .field("rules", &self.rules)
            .field("override_user_requests", &self.override_user_requests)
            .field("default_queue", &self.default_queue)
            .finish_non_exhaustive()
    }
}

impl PlacementEngine {
    /// Build an engine, validating every rule against the topology.
    ///
    /// A rule that fails validation is fatal unless
    /// `config.fail_on_config_error` is false, in which case it is logged
    /// and kept (its targets may exist by the time submissions arrive).
    pub fn new(
        config: PlacementConfig,
        rules: Vec<Rule>,
        topology: Arc<dyn QueueTopology + Send + Sync>,
        groups: Arc<dyn GroupResolver + Send + Sync>,
    ) -> Result<Self> {
        config.validate().context("placement config")?;

        let mut ctx = ValidationContext::new(topology.as_ref());
        for variable in IMMUTABLE_VARIABLES {
            ctx.add_immutable_variable(variable);
        }
        // immutables plus %default are the built-in variables; rules extend
        // the set as they declare update targets
        ctx.add_variable(DEFAULT_QUEUE_VARIABLE);

        for rule in &rules {
            if let Err(reason) = rule.validate(&mut ctx) {
                if config.fail_on_config_error {
                    return Err(anyhow!(reason).context(format!("validation of {rule} failed")));
                }
                warn!(rule = %rule, reason = %reason, "keeping rule that failed validation");
            }
        }

        info!(
            rules = rules.len(),
            override_user_requests = config.override_user_requests,
            "initialized placement rules"
        );

        Ok(Self {
            rules,
            topology,
            groups,
            override_user_requests: config.override_user_requests,
            default_queue: config.default_queue,
        })
    }

    /// Decide the admission queue for one submission.
    pub fn place(&self, submission: &Submission) -> PlacementOutcome {
        // an explicitly requested queue wins unless rules may override it;
        // an empty request string names no queue and is treated like no
        // request at all
        if let Some(requested) = submission.requested_queue.as_deref() {
            if !requested.is_empty()
                && requested != DEFAULT_QUEUE_NAME
                && !self.override_user_requests
            {
                debug!(
                    requested,
                    user = %submission.user,
                    "explicit queue requested and override disabled, no decision"
                );
                return PlacementOutcome::NoDecision;
            }
        }

        let mut variables = match self.create_variable_context(submission) {
            Ok(variables) => variables,
            Err(err) => {
                error!(user = %submission.user, err = %err, "unable to set up variable context");
                return PlacementOutcome::Rejected;
            }
        };

        for rule in &self.rules {
            let result = match rule.evaluate(&mut variables) {
                None => continue,
                Some(Ok(result)) => result,
                Some(Err(reason)) => {
                    error!(rule = %rule, reason = %reason, "rule execution failed, aborting evaluation");
                    return PlacementOutcome::Rejected;
                }
            };

            match self.validate_result(rule, result) {
                RuleResult::Skip => {}
                RuleResult::Reject => {
                    info!(
                        application = %submission.application,
                        rule = %rule,
                        "rejecting application"
                    );
                    return PlacementOutcome::Rejected;
                }
                RuleResult::Place {
                    normalized_queue, ..
                } => {
                    debug!(
                        application = %submission.application,
                        queue = %normalized_queue,
                        rule = %rule,
                        "application placed by rule"
                    );
                    return PlacementOutcome::Placed(Placement::from_normalized(
                        &normalized_queue,
                    ));
                }
                RuleResult::PlaceToDefault => {
                    return self.place_to_default(submission, &variables, rule);
                }
            }
        }

        // no rule decided; an external default mechanism may still apply
        PlacementOutcome::NoDecision
    }

    /// Validate a place result against the topology, substituting the rule's
    /// fallback on failure. Non-place results pass through untouched.
    fn validate_result(&self, rule: &Rule, mut result: RuleResult) -> RuleResult {
        let Some(queue) = result.queue().map(str::to_string) else {
            return result;
        };
        match self.validate_and_normalize_queue(&queue) {
            Ok(normalized) => {
                result.update_normalized_queue(normalized);
                result
            }
            Err(reason) => {
                info!(queue = %queue, reason = %reason, rule = %rule, "cannot place to queue, applying fallback");
                rule.fallback_result()
            }
        }
    }

    /// Place into the queue currently named by `%default`. Failure here is
    /// final; the default-placement path has no further fallback.
    fn place_to_default(
        &self,
        submission: &Submission,
        variables: &VariableContext,
        rule: &Rule,
    ) -> PlacementOutcome {
        let target = variables.replace_path_variables(DEFAULT_QUEUE_VARIABLE);
        match self.validate_and_normalize_queue(&target) {
            Ok(normalized) => {
                debug!(
                    application = %submission.application,
                    queue = %normalized,
                    rule = %rule,
                    "application placed to default queue"
                );
                PlacementOutcome::Placed(Placement::from_normalized(&normalized))
            }
            Err(reason) => {
                error!(
                    application = %submission.application,
                    target = %target,
                    reason = %reason,
                    "rejecting application, default placement failed"
                );
                PlacementOutcome::Rejected
            }
        }
    }

    fn create_variable_context(&self, submission: &Submission) -> Result<VariableContext> {
        let groups = self
            .groups
            .groups_of(&submission.user)
            .with_context(|| format!("resolve groups of '{}'", submission.user))?;

        let mut variables = VariableContext::new();
        seed(&mut variables, "%user", Some(&submission.user))?;
        seed(
            &mut variables,
            "%specified",
            submission.requested_queue.as_deref(),
        )?;
        seed(&mut variables, "%application", Some(&submission.application))?;
        seed(&mut variables, "%primary_group", groups.first().map(String::as_str))?;
        seed(
            &mut variables,
            "%secondary_group",
            self.secondary_group(&groups).as_deref(),
        )?;
        seed(
            &mut variables,
            DEFAULT_QUEUE_VARIABLE,
            Some(&self.default_queue),
        )?;

        variables
            .set_immutables(IMMUTABLE_VARIABLES)
            .map_err(|reason| anyhow!(reason))?;
        Ok(variables)
    }

    /// First group beyond the primary for which a queue of the same name
    /// exists. Position beyond the primary is not guaranteed, so all
    /// candidates are tried in order.
    fn secondary_group(&self, groups: &[String]) -> Option<String> {
        let secondary = groups
            .iter()
            .skip(1)
            .find(|group| self.topology.get_queue(group).is_some())
            .cloned();
        if secondary.is_none() {
            debug!("user has no secondary group with a matching queue");
        }
        secondary
    }

    /// Resolve a rule-produced queue reference to a fully-qualified leaf
    /// path, or explain why it cannot be placed into.
    fn validate_and_normalize_queue(&self, queue_name: &str) -> Result<String, String> {
        let path = QueuePath::parse(queue_name);
        let normalized = match path.parent() {
            Some(parent) => self.normalize_with_parent(parent, path.leaf())?,
            None => self.normalize_without_parent(path.leaf())?,
        };

        if let Some(queue) = self.topology.get_queue_by_full_name(&normalized) {
            if !queue.is_leaf() {
                return Err(format!(
                    "rule returned a non-leaf queue '{normalized}', cannot place application in it"
                ));
            }
        }
        Ok(normalized)
    }

    fn normalize_with_parent(&self, parent: &str, leaf: &str) -> Result<String, String> {
        let Some(parent_queue) = self.topology.get_queue(parent) else {
            if self.topology.is_ambiguous(parent) {
                return Err(format!(
                    "rule specified a parent queue '{parent}', but it is ambiguous"
                ));
            }
            return Err(format!(
                "rule specified a parent queue '{parent}', but it does not exist"
            ));
        };

        let full_path = format!("{}{DOT}{leaf}", parent_queue.full_path());

        // an unmanaged parent cannot create the leaf on demand, so it has
        // to exist already
        if !parent_queue.is_managed_parent() && self.topology.get_queue(&full_path).is_none() {
            return Err(format!(
                "rule specified a parent queue '{parent}', but it is not a managed parent queue, \
                 and no queue exists with name '{leaf}' under it"
            ));
        }
        Ok(full_path)
    }

    fn normalize_without_parent(&self, leaf: &str) -> Result<String, String> {
        let Some(queue) = self.topology.get_queue(leaf) else {
            if self.topology.is_ambiguous(leaf) {
                return Err(format!("queue '{leaf}' specified in rule is ambiguous"));
            }
            return Err(format!("queue '{leaf}' specified in rule does not exist"));
        };
        Ok(queue.full_path().to_string())
    }
}

/// Seed one variable, mapping an absent value to an absent-valued entry.
///
/// Seeding happens before the immutable set is installed, so failures here
/// indicate a programming error rather than a rule misconfiguration.
fn seed(variables: &mut VariableContext, name: &str, value: Option<&str>) -> Result<()> {
    match value {
        Some(value) => variables.put(name, value),
        None => variables.put_absent(name),
    }
    .map_err(|reason| anyhow!(reason))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::action::Action;
    use crate::core::matcher::Matcher;
    use crate::test_support::{FailingGroups, MockTopology, StaticGroups};

    fn topology() -> MockTopology {
        MockTopology::builder()
            .with_queue("root.default")
            .with_queue("root.unman")
            .with_queue("root.groups.devs")
            .with_managed_parent("root.man")
            .build()
    }

    fn engine_with(rules: Vec<Rule>) -> PlacementEngine {
        let groups = StaticGroups::new()
            .with("alice", &["devs", "admins"])
            .with("bob", &["ops"]);
        PlacementEngine::new(
            PlacementConfig::default(),
            rules,
            Arc::new(topology()),
            Arc::new(groups),
        )
        .expect("engine")
    }

    #[test]
    fn placement_splits_parent_and_leaf() {
        let placement = Placement::from_normalized("root.man.alice");
        assert_eq!(placement.queue, "alice");
        assert_eq!(placement.parent.as_deref(), Some("root.man"));

        let rootless = Placement::from_normalized("solo");
        assert_eq!(rootless.queue, "solo");
        assert_eq!(rootless.parent, None);
    }

    #[test]
    fn normalize_resolves_short_parent_references() {
        let engine = engine_with(Vec::new());
        assert_eq!(
            engine.validate_and_normalize_queue("groups.devs").expect("ok"),
            "root.groups.devs"
        );
        assert_eq!(
            engine.validate_and_normalize_queue("default").expect("ok"),
            "root.default"
        );
    }

    #[test]
    fn normalize_rejects_non_leaf_targets() {
        let engine = engine_with(Vec::new());
        let err = engine
            .validate_and_normalize_queue("root.groups")
            .expect_err("non-leaf");
        assert!(err.contains("non-leaf"));
    }

    #[test]
    fn normalize_allows_missing_leaf_under_managed_parent() {
        let engine = engine_with(Vec::new());
        assert_eq!(
            engine
                .validate_and_normalize_queue("root.man.newqueue")
                .expect("ok"),
            "root.man.newqueue"
        );
        let err = engine
            .validate_and_normalize_queue("root.groups.newqueue")
            .expect_err("unmanaged");
        assert!(err.contains("not a managed parent"));
    }

    #[test]
    fn normalize_rejects_ambiguous_parent_references() {
        let topology = MockTopology::builder()
            .with_queue("root.x.q1")
            .with_queue("root.other.x.q2")
            .build();
        let engine = PlacementEngine::new(
            PlacementConfig::default(),
            Vec::new(),
            Arc::new(topology),
            Arc::new(StaticGroups::new()),
        )
        .expect("engine");
        let err = engine
            .validate_and_normalize_queue("x.newq")
            .expect_err("ambiguous parent");
        assert!(err.contains("ambiguous"));
    }

    /// Group resolution failure aborts the pass with a rejection.
    #[test]
    fn group_resolver_failure_rejects() {
        let engine = PlacementEngine::new(
            PlacementConfig::default(),
            vec![Rule::new(Matcher::All, Action::place_to_default())],
            Arc::new(topology()),
            Arc::new(FailingGroups),
        )
        .expect("engine");
        let outcome = engine.place(&Submission::new("alice", "app"));
        assert_eq!(outcome, PlacementOutcome::Rejected);
    }

    /// Invalid rule targets are fatal at initialization by default.
    #[test]
    fn invalid_rule_fails_initialization() {
        let rules = vec![Rule::new(Matcher::All, Action::place_to_queue("root.nope.q"))];
        let err = PlacementEngine::new(
            PlacementConfig::default(),
            rules,
            Arc::new(topology()),
            Arc::new(StaticGroups::new()),
        )
        .expect_err("config error");
        assert!(err.to_string().contains("validation"));
    }

    /// With fail_on_config_error disabled the rule is kept.
    #[test]
    fn invalid_rule_tolerated_when_configured() {
        let config = PlacementConfig {
            fail_on_config_error: false,
            ..PlacementConfig::default()
        };
        let rules = vec![Rule::new(Matcher::All, Action::place_to_queue("root.nope.q"))];
        PlacementEngine::new(
            config,
            rules,
            Arc::new(topology()),
            Arc::new(StaticGroups::new()),
        )
        .expect("tolerated");
    }

    /// Targeting an immutable variable from a rule is a configuration error.
    #[test]
    fn update_of_immutable_variable_fails_initialization() {
        let rules = vec![Rule::new(
            Matcher::All,
            Action::variable_update("%user", "mallory"),
        )];
        let err = PlacementEngine::new(
            PlacementConfig::default(),
            rules,
            Arc::new(topology()),
            Arc::new(StaticGroups::new()),
        )
        .expect_err("config error");
        assert!(err.root_cause().to_string().contains("immutable"));
    }

    /// When config errors are tolerated, the violation still aborts the
    /// evaluation pass at runtime with a generic rejection.
    #[test]
    fn identity_variables_are_immutable_during_evaluation() {
        let config = PlacementConfig {
            fail_on_config_error: false,
            ..PlacementConfig::default()
        };
        let rules = vec![
            Rule::new(Matcher::All, Action::variable_update("%user", "mallory")),
            Rule::new(Matcher::All, Action::place_to_queue("root.default")),
        ];
        let engine = PlacementEngine::new(
            config,
            rules,
            Arc::new(topology()),
            Arc::new(StaticGroups::new().with("alice", &["devs"])),
        )
        .expect("engine");
        let outcome = engine.place(&Submission::new("alice", "app"));
        assert_eq!(outcome, PlacementOutcome::Rejected);
    }
}
