//! Per-submission variable store with runtime-checked immutability.

use std::collections::{HashMap, HashSet};

/// Key/value store for placement variables (`%user`, `%default`, ...).
///
/// A fresh context is built for every submission, mutated by actions during
/// the evaluation pass, and discarded afterwards. Identity-derived variables
/// are marked immutable after seeding; overwriting one is a configuration
/// defect surfaced as a stable error message.
///
/// Values may be absent (e.g. a user without a secondary group). Absent
/// values read back as the empty string but still count as present for
/// [`contains_key`](Self::contains_key).
#[derive(Debug, Clone, Default)]
pub struct VariableContext {
    variables: HashMap<String, Option<String>>,
    immutable_names: Option<HashSet<String>>,
}

impl VariableContext {
    pub fn new() -> Self {
        Self::default()
    }

    fn is_immutable(&self, name: &str) -> bool {
        self.immutable_names
            .as_ref()
            .is_some_and(|names| names.contains(name))
    }

    /// Install the set of immutable variable names.
    ///
    /// May be called at most once per context; a second call is an error.
    pub fn set_immutables<I, S>(&mut self, names: I) -> Result<(), String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if self.immutable_names.is_some() {
            return Err(
                "immutable variables are already defined, immutability cannot be changed once set"
                    .to_string(),
            );
        }
        self.immutable_names = Some(names.into_iter().map(Into::into).collect());
        Ok(())
    }

    /// Set or overwrite a variable.
    ///
    /// Fails if `name` is immutable and already holds a non-absent value.
    pub fn put(&mut self, name: &str, value: impl Into<String>) -> Result<(), String> {
        self.insert(name, Some(value.into()))
    }

    /// Register a variable with an absent value.
    ///
    /// The variable becomes known (`contains_key` is true) but reads back as
    /// the empty string.
    pub fn put_absent(&mut self, name: &str) -> Result<(), String> {
        self.insert(name, None)
    }

    fn insert(&mut self, name: &str, value: Option<String>) -> Result<(), String> {
        let holds_value = matches!(self.variables.get(name), Some(Some(_)));
        if holds_value && self.is_immutable(name) {
            return Err(format!(
                "variable '{name}' is immutable, cannot update its value"
            ));
        }
        self.variables.insert(name.to_string(), value);
        Ok(())
    }

    /// Value of a variable; absent values and unknown names read as `""`.
    pub fn get(&self, name: &str) -> &str {
        match self.variables.get(name) {
            Some(Some(value)) => value,
            _ => "",
        }
    }

    /// True if the variable was ever put, even with an absent value.
    pub fn contains_key(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    /// Replace every occurrence of every known variable name in `input`.
    ///
    /// Names are substituted longest-first so a shorter name never partially
    /// consumes a longer one (`%user` must not corrupt `%username`). Each
    /// name is replaced in a single pass; values inserted by earlier
    /// replacements are not re-scanned.
    pub fn replace_variables(&self, input: &str) -> String {
        let mut names: Vec<&str> = self.variables.keys().map(String::as_str).collect();
        names.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

        let mut result = input.to_string();
        for name in names {
            if result.contains(name) {
                result = result.replace(name, self.get(name));
            }
        }
        result
    }

    /// Replace whole dot-separated path segments that exactly equal a known
    /// variable name.
    ///
    /// Composite segments (`%user%group`) and unknown tokens pass through
    /// verbatim; an absent value substitutes as the empty string.
    pub fn replace_path_variables(&self, input: &str) -> String {
        input
            .split('.')
            .map(|part| match self.variables.get(part) {
                Some(Some(value)) => value.as_str(),
                Some(None) => "",
                None => part,
            })
            .collect::<Vec<_>>()
            .join(".")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> VariableContext {
        let mut ctx = VariableContext::new();
        ctx.put("%user", "alice").expect("put");
        ctx.put("%primary_group", "devs").expect("put");
        ctx.put("%default", "root.default").expect("put");
        ctx
    }

    /// First put of an immutable name succeeds, a second put fails.
    #[test]
    fn immutable_variable_rejects_overwrite() {
        let mut ctx = VariableContext::new();
        ctx.set_immutables(["%user"]).expect("set immutables");
        ctx.put("%user", "alice").expect("first put");
        let err = ctx.put("%user", "bob").expect_err("expected violation");
        assert!(err.contains("%user"));
        assert!(err.contains("immutable"));
        assert_eq!(ctx.get("%user"), "alice");
    }

    /// Immutability only locks a name once it holds a non-absent value.
    #[test]
    fn immutable_absent_value_can_be_filled_once() {
        let mut ctx = VariableContext::new();
        ctx.set_immutables(["%secondary_group"]).expect("set");
        ctx.put_absent("%secondary_group").expect("absent put");
        ctx.put("%secondary_group", "ops").expect("fill");
        ctx.put("%secondary_group", "other")
            .expect_err("now locked");
    }

    /// The immutable set can be installed at most once.
    #[test]
    fn set_immutables_twice_is_an_error() {
        let mut ctx = VariableContext::new();
        ctx.set_immutables(["%user"]).expect("first");
        let err = ctx.set_immutables(["%default"]).expect_err("second");
        assert!(err.contains("already defined"));
    }

    /// Mutable variables can be overwritten freely.
    #[test]
    fn mutable_variable_overwrites() {
        let mut ctx = seeded();
        ctx.put("%default", "root.other").expect("overwrite");
        assert_eq!(ctx.get("%default"), "root.other");
    }

    /// Unknown and absent variables both read as the empty string.
    #[test]
    fn get_maps_absent_to_empty() {
        let mut ctx = VariableContext::new();
        ctx.put_absent("%secondary_group").expect("put");
        assert_eq!(ctx.get("%secondary_group"), "");
        assert_eq!(ctx.get("%missing"), "");
        assert!(ctx.contains_key("%secondary_group"));
        assert!(!ctx.contains_key("%missing"));
    }

    /// Longer names are substituted before their prefixes.
    #[test]
    fn replace_variables_is_longest_name_first() {
        let mut ctx = VariableContext::new();
        ctx.put("%a", "short").expect("put");
        ctx.put("%aa", "long").expect("put");
        assert_eq!(ctx.replace_variables("%aa"), "long");
        assert_eq!(ctx.replace_variables("%a %aa"), "short long");
    }

    /// All occurrences of a name are replaced in one pass.
    #[test]
    fn replace_variables_handles_repeats_and_literals() {
        let ctx = seeded();
        assert_eq!(
            ctx.replace_variables("%user-%user@%unknown"),
            "alice-alice@%unknown"
        );
    }

    /// Path replacement only substitutes whole segments.
    #[test]
    fn replace_path_variables_requires_exact_segment() {
        let mut ctx = seeded();
        ctx.put("%x", "one").expect("put");
        ctx.put("%y", "two").expect("put");
        assert_eq!(ctx.replace_path_variables("a.%x.b"), "a.one.b");
        assert_eq!(ctx.replace_path_variables("%x%y.b"), "%x%y.b");
        assert_eq!(ctx.replace_path_variables("root.%user"), "root.alice");
    }

    /// Absent values substitute as empty segments, unknown tokens pass through.
    #[test]
    fn replace_path_variables_absent_and_unknown() {
        let mut ctx = seeded();
        ctx.put_absent("%secondary_group").expect("put");
        assert_eq!(
            ctx.replace_path_variables("root.%secondary_group"),
            "root."
        );
        assert_eq!(ctx.replace_path_variables("root.%nope"), "root.%nope");
    }
}
