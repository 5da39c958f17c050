//! Rule-driven queue placement for multi-tenant job schedulers.
//!
//! Given a submitter's identity, an optional requested queue, and application
//! metadata, the engine runs an ordered list of configured placement rules
//! and returns either a concrete queue assignment, a rejection, or no
//! decision at all. The architecture enforces a strict separation:
//!
//! - **[`core`]**: Pure, deterministic rule machinery (variables, matchers,
//!   actions, results, paths). No I/O, fully testable in isolation.
//! - **[`topology`]**: Collaborator traits for the live queue hierarchy and
//!   group membership. Implemented by the host scheduler, mocked in tests.
//!
//! Orchestration modules ([`engine`], [`validation`], [`config`]) wire core
//! logic to the collaborators: rules are validated against the topology at
//! initialization, and each submission is evaluated in a single sequential
//! pass over the rule list.

pub mod config;
pub mod core;
pub mod engine;
pub mod logging;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod topology;
pub mod validation;
