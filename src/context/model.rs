//! Context tree: named contexts holding tests, child contexts and hooks.
//!
//! Trees are immutable once built. The runner keeps all per-run state outside
//! the tree, so the same tree can be run any number of times.

use crate::context::requirements::SupportRequirements;
use crate::runner::work::Body;
use std::sync::Arc;

/// Hooks declared directly on one context.
#[derive(Clone, Debug, Default)]
pub struct ContextHooks {
    /// Runs before every test in this context and its descendants.
    pub set_up: Option<Body>,
    /// Runs after every test in this context and its descendants.
    pub tear_down: Option<Body>,
    /// Runs once before anything in this context.
    pub context_set_up: Option<Body>,
    /// Runs once after everything in this context.
    pub context_tear_down: Option<Body>,
}

/// A leaf unit of work.
#[derive(Clone, Debug)]
pub struct Test {
    pub(crate) name: String,
    pub(crate) body: Option<Body>,
    pub(crate) deferred: bool,
    pub(crate) focused: bool,
    pub(crate) comment: Option<String>,
}

impl Test {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn body(&self) -> Option<&Body> {
        self.body.as_ref()
    }

    pub fn is_deferred(&self) -> bool {
        self.deferred
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }
}

/// A named node in the suite tree.
#[derive(Clone, Debug)]
pub struct Context {
    pub(crate) name: String,
    pub(crate) tests: Vec<Arc<Test>>,
    pub(crate) contexts: Vec<Context>,
    pub(crate) hooks: ContextHooks,
    pub(crate) requirements: SupportRequirements,
    pub(crate) deferred: bool,
    /// Focus marker on this context itself (explicit or inherited downward).
    pub(crate) focus_marked: bool,
    pub(crate) focused: bool,
}

impl Context {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tests(&self) -> &[Arc<Test>] {
        &self.tests
    }

    pub fn contexts(&self) -> &[Context] {
        &self.contexts
    }

    pub fn hooks(&self) -> &ContextHooks {
        &self.hooks
    }

    pub fn requirements(&self) -> &SupportRequirements {
        &self.requirements
    }

    pub fn is_deferred(&self) -> bool {
        self.deferred
    }

    /// True if this context or anything below it is focused.
    pub fn is_focused(&self) -> bool {
        self.focused
    }

    pub fn is_empty(&self) -> bool {
        self.tests.is_empty() && self.contexts.is_empty()
    }

    /// Recompute `focused` from this node's own marker and its contents.
    pub(crate) fn refresh_focus(&mut self) {
        self.focused = self.focus_marked
            || self.tests.iter().any(|test| test.focused)
            || self.contexts.iter().any(|context| context.focused);
    }

    /// Number of tests, deferred or not, in the whole subtree.
    pub fn test_count(&self) -> usize {
        self.tests.len()
            + self
                .contexts
                .iter()
                .map(Context::test_count)
                .sum::<usize>()
    }

    /// Non-deferred tests that a run would execute, honoring focus mode.
    pub(crate) fn runnable_count(&self, focus_mode: bool) -> usize {
        let own = self
            .tests
            .iter()
            .filter(|test| !test.deferred && (!focus_mode || test.focused))
            .count();
        let nested: usize = self
            .contexts
            .iter()
            .filter(|context| !focus_mode || context.focused)
            .map(|context| context.runnable_count(focus_mode))
            .sum();
        own + nested
    }

    /// Indented listing of context and test names, for comparisons and debugging.
    pub fn outline(&self) -> String {
        let mut out = String::new();
        self.write_outline(0, &mut out);
        out
    }

    fn write_outline(&self, depth: usize, out: &mut String) {
        let indent = "  ".repeat(depth);
        out.push_str(&format!("{}{}{}\n", indent, self.name, flags(self.deferred, self.focused)));
        for test in &self.tests {
            out.push_str(&format!(
                "{}  - {}{}\n",
                indent,
                test.name,
                flags(test.deferred, test.focused)
            ));
        }
        for context in &self.contexts {
            context.write_outline(depth + 1, out);
        }
    }
}

fn flags(deferred: bool, focused: bool) -> &'static str {
    match (deferred, focused) {
        (true, true) => " [deferred, focused]",
        (true, false) => " [deferred]",
        (false, true) => " [focused]",
        (false, false) => "",
    }
}
