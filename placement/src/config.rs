//! Engine settings (TOML) and the rule-description document (JSON).

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::action::{Action, Fallback};
use crate::core::matcher::Matcher;
use crate::core::rule::Rule;

/// Full path of the built-in default queue.
const FULL_DEFAULT_QUEUE_PATH: &str = "root.default";
/// Short name accepted as an alias of the built-in default queue.
const DEFAULT_QUEUE: &str = "default";

/// Engine settings (TOML).
///
/// This file is intended to be edited by operators and must remain stable
/// and automatable. Missing fields default to sensible values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PlacementConfig {
    /// Whether rules may override an explicitly requested queue.
    pub override_user_requests: bool,

    /// Queue the `%default` variable is seeded with for each submission.
    pub default_queue: String,

    /// Whether a rule failing validation at initialization is fatal.
    pub fail_on_config_error: bool,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            override_user_requests: false,
            default_queue: FULL_DEFAULT_QUEUE_PATH.to_string(),
            fail_on_config_error: true,
        }
    }
}

impl PlacementConfig {
    pub fn validate(&self) -> Result<()> {
        if self.default_queue.trim().is_empty() {
            return Err(anyhow!("default_queue must be non-empty"));
        }
        Ok(())
    }
}

/// Load engine settings from a TOML file.
///
/// If the file is missing, returns `PlacementConfig::default()`.
pub fn load_config(path: &Path) -> Result<PlacementConfig> {
    if !path.exists() {
        let cfg = PlacementConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: PlacementConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Matcher selector in a rule description.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MatcherKind {
    User,
    Group,
    Application,
    All,
}

/// Placement policy in a rule description.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    /// Place into the configured `queue` as written.
    CustomQueue,
    /// Reject the submission.
    Reject,
    /// Place into `queue.%user` (or bare `%user` without a queue).
    User,
    /// Place into `queue.%primary_group`.
    PrimaryGroup,
    /// Place into `queue.%secondary_group`.
    SecondaryGroup,
    /// Place into the queue the submitter asked for.
    Specified,
    /// Place into the configured default queue.
    DefaultQueue,
    /// Overwrite the `%default` variable instead of placing.
    SetDefaultQueue,
}

/// Fallback selector in a rule description.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum FallbackKind {
    Skip,
    #[default]
    Reject,
    PlaceDefault,
}

impl From<FallbackKind> for Fallback {
    fn from(kind: FallbackKind) -> Self {
        match kind {
            FallbackKind::Skip => Fallback::Skip,
            FallbackKind::Reject => Fallback::Reject,
            FallbackKind::PlaceDefault => Fallback::PlaceToDefault,
        }
    }
}

/// One rule in the description document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RuleDescription {
    #[serde(rename = "type")]
    pub kind: MatcherKind,
    /// Value the matcher compares against; ignored for `all`.
    #[serde(default)]
    pub matches: String,
    pub policy: PolicyKind,
    /// Target (or parent) queue, required by some policies.
    #[serde(default)]
    pub queue: Option<String>,
    #[serde(default)]
    pub fallback: FallbackKind,
}

/// The whole rule-description document: an ordered rule list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RulesDescription {
    pub rules: Vec<RuleDescription>,
}

/// Load a rule-description document (JSON) and build the rule list.
pub fn load_rules(path: &Path) -> Result<Vec<Rule>> {
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let description: RulesDescription =
        serde_json::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    build_rules(&description)
}

/// Build the configured rule list from a description.
///
/// Unknown matcher/policy/fallback names are already rejected by
/// deserialization; this step catches structurally valid descriptions that
/// are still incomplete (e.g. a policy requiring `queue` without one).
pub fn build_rules(description: &RulesDescription) -> Result<Vec<Rule>> {
    description.rules.iter().map(build_rule).collect()
}

fn build_rule(desc: &RuleDescription) -> Result<Rule> {
    let matcher = match desc.kind {
        MatcherKind::User => Matcher::user(&desc.matches),
        MatcherKind::Group => Matcher::primary_group(&desc.matches),
        MatcherKind::Application => Matcher::application(&desc.matches),
        MatcherKind::All => Matcher::All,
    };

    let action = match desc.policy {
        PolicyKind::CustomQueue => Action::place_to_queue(required_queue(desc)?),
        PolicyKind::Reject => Action::reject(),
        PolicyKind::User => Action::place_to_queue(target_queue(desc.queue.as_deref(), "%user")),
        PolicyKind::PrimaryGroup => {
            Action::place_to_queue(target_queue(desc.queue.as_deref(), "%primary_group"))
        }
        PolicyKind::SecondaryGroup => {
            Action::place_to_queue(target_queue(desc.queue.as_deref(), "%secondary_group"))
        }
        PolicyKind::Specified => Action::place_to_queue("%specified"),
        PolicyKind::DefaultQueue => Action::place_to_queue(default_queue(desc.queue.as_deref())),
        PolicyKind::SetDefaultQueue => Action::update_default(required_queue(desc)?),
    };

    Ok(Rule::new(matcher, action.with_fallback(desc.fallback.into())))
}

fn required_queue(desc: &RuleDescription) -> Result<&str> {
    desc.queue
        .as_deref()
        .filter(|queue| !queue.trim().is_empty())
        .ok_or_else(|| anyhow!("policy {:?} requires a queue", desc.policy))
}

/// Prefix a placeholder with a configured parent queue, if any.
fn target_queue(parent: Option<&str>, placeholder: &str) -> String {
    match parent {
        Some(parent) => format!("{parent}.{placeholder}"),
        None => placeholder.to_string(),
    }
}

/// The `default` short name and an unset queue both mean the built-in
/// default queue path.
fn default_queue(queue: Option<&str>) -> String {
    match queue {
        None | Some(DEFAULT_QUEUE) | Some(FULL_DEFAULT_QUEUE_PATH) => {
            FULL_DEFAULT_QUEUE_PATH.to_string()
        }
        Some(queue) => queue.to_string(),
    }
}
