//! Name filtering over context trees.
//!
//! A test's qualified name is the names of its ancestor contexts (the root
//! excluded) followed by its own name, joined with single spaces.

use crate::context::model::Context;
use regex::{Regex, RegexBuilder};

/// Selects tests by qualified name.
#[derive(Clone, Debug)]
pub enum NameFilter {
    /// Every test passes.
    All,
    Pattern(Regex),
    /// Passes when any alternative passes; no alternatives passes everything.
    AnyOf(Vec<NameFilter>),
}

impl Default for NameFilter {
    fn default() -> Self {
        NameFilter::All
    }
}

impl NameFilter {
    /// Case-insensitive pattern; strings that are not valid regexes match literally.
    pub fn pattern(pattern: &str) -> Self {
        let regex = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .or_else(|_| {
                RegexBuilder::new(&regex::escape(pattern))
                    .case_insensitive(true)
                    .build()
            });
        match regex {
            Ok(regex) => NameFilter::Pattern(regex),
            Err(_) => NameFilter::All,
        }
    }

    pub fn any_of<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        NameFilter::AnyOf(
            patterns
                .into_iter()
                .map(|pattern| NameFilter::pattern(pattern.as_ref()))
                .collect(),
        )
    }

    pub fn matches(&self, qualified_name: &str) -> bool {
        match self {
            NameFilter::All => true,
            NameFilter::Pattern(regex) => regex.is_match(qualified_name),
            NameFilter::AnyOf(alternatives) => {
                alternatives.is_empty()
                    || alternatives
                        .iter()
                        .any(|alternative| alternative.matches(qualified_name))
            }
        }
    }
}

impl From<&str> for NameFilter {
    fn from(pattern: &str) -> Self {
        NameFilter::pattern(pattern)
    }
}

impl From<Regex> for NameFilter {
    fn from(regex: Regex) -> Self {
        NameFilter::Pattern(regex)
    }
}

impl From<Option<NameFilter>> for NameFilter {
    fn from(filter: Option<NameFilter>) -> Self {
        filter.unwrap_or_default()
    }
}

/// Derive a tree holding only the tests that pass `name_filter`.
///
/// Returns `None` when nothing under `context` survives. Hooks and
/// requirements are carried over unchanged; focus is recomputed.
pub fn filter(context: &Context, name_filter: &NameFilter) -> Option<Context> {
    filter_node(context, &[], name_filter)
}

fn filter_node(context: &Context, prefix: &[&str], name_filter: &NameFilter) -> Option<Context> {
    let qualify = |name: &str| {
        let mut parts = prefix.to_vec();
        parts.push(name);
        parts.join(" ")
    };

    let tests: Vec<_> = context
        .tests
        .iter()
        .filter(|test| name_filter.matches(&qualify(&test.name)))
        .cloned()
        .collect();

    let contexts: Vec<Context> = context
        .contexts
        .iter()
        .filter_map(|child| {
            let mut child_prefix = prefix.to_vec();
            child_prefix.push(child.name.as_str());
            filter_node(child, &child_prefix, name_filter)
        })
        .collect();

    if tests.is_empty() && contexts.is_empty() {
        return None;
    }

    let mut filtered = Context {
        name: context.name.clone(),
        tests,
        contexts,
        hooks: context.hooks.clone(),
        requirements: context.requirements.clone(),
        deferred: context.deferred,
        focus_marked: context.focus_marked,
        focused: false,
    };
    filtered.refresh_focus();
    Some(filtered)
}
