//! Deterministic, pure rule machinery.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data structures and return deterministic outputs suitable for tests.

pub mod action;
pub mod matcher;
pub mod path;
pub mod result;
pub mod rule;
pub mod variables;
