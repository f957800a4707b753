//! Focus and deferral invariants of built trees, and filter laws

use proptest::prelude::*;
use proptest::test_runner::{TestCaseError, TestRunner};
use suite_runner::{filter, Body, Context, ContextBuilder, Description, NameFilter};

/// Shape of a generated suite.
#[derive(Debug, Clone)]
struct TreeShape {
    deferred: bool,
    focused: bool,
    /// (deferred, focused) per test.
    tests: Vec<(bool, bool)>,
    children: Vec<TreeShape>,
}

fn marked(name: &str, deferred: bool, focused: bool) -> String {
    let mut out = String::new();
    if deferred {
        out.push_str("//");
    }
    if focused {
        out.push_str("=>");
    }
    out.push_str(name);
    out
}

fn flags() -> impl Strategy<Value = (bool, bool)> {
    (prop::bool::weighted(0.2), prop::bool::weighted(0.15))
}

fn tree_strategy() -> impl Strategy<Value = TreeShape> {
    let leaf = (flags(), prop::collection::vec(flags(), 0..4)).prop_map(|((deferred, focused), tests)| {
        TreeShape {
            deferred,
            focused,
            tests,
            children: Vec::new(),
        }
    });
    leaf.prop_recursive(3, 32, 3, |inner| {
        (
            flags(),
            prop::collection::vec(flags(), 0..4),
            prop::collection::vec(inner, 0..3),
        )
            .prop_map(|((deferred, focused), tests, children)| TreeShape {
                deferred,
                focused,
                tests,
                children,
            })
    })
}

fn description(shape: &TreeShape) -> Description {
    let mut description = Description::new();
    for (i, (deferred, focused)) in shape.tests.iter().enumerate() {
        let body = Body::sync(|fixture| Ok(fixture.assert(true, "ok")?));
        description = description.test(marked(&format!("t{}", i), *deferred, *focused), body);
    }
    for (i, child) in shape.children.iter().enumerate() {
        description = description.context(
            marked(&format!("c{}", i), child.deferred, child.focused),
            self::description(child),
        );
    }
    description
}

fn build(shape: &TreeShape) -> Context {
    ContextBuilder::new()
        .build(&marked("root", shape.deferred, shape.focused), description(shape))
        .unwrap()
}

fn expected_focus(shape: &TreeShape, parent_forced: bool) -> bool {
    let forced = parent_forced || shape.focused;
    forced
        || shape.tests.iter().any(|(_, focused)| *focused)
        || shape
            .children
            .iter()
            .any(|child| expected_focus(child, forced))
}

fn check(
    context: &Context,
    shape: &TreeShape,
    parent_deferred: bool,
    parent_forced: bool,
) -> Result<(), TestCaseError> {
    let deferred = parent_deferred || shape.deferred;
    let forced = parent_forced || shape.focused;

    prop_assert_eq!(context.is_deferred(), deferred);
    prop_assert_eq!(context.is_focused(), expected_focus(shape, parent_forced));
    prop_assert_eq!(context.tests().len(), shape.tests.len());
    for (test, (test_deferred, test_focused)) in context.tests().iter().zip(&shape.tests) {
        prop_assert_eq!(test.is_deferred(), deferred || *test_deferred);
        prop_assert_eq!(test.is_focused(), forced || *test_focused);
    }

    prop_assert_eq!(context.contexts().len(), shape.children.len());
    for (child, child_shape) in context.contexts().iter().zip(&shape.children) {
        check(child, child_shape, deferred, forced)?;
    }
    Ok(())
}

/// Focused iff itself or something below it is focused.
fn focus_is_consistent(context: &Context) -> bool {
    let below = context.tests().iter().any(|test| test.is_focused())
        || context.contexts().iter().any(Context::is_focused);
    (!below || context.is_focused()) && context.contexts().iter().all(focus_is_consistent)
}

#[test]
fn test_built_flags_follow_markers() {
    let mut runner = TestRunner::default();
    runner
        .run(&tree_strategy(), |shape| {
            let context = build(&shape);
            check(&context, &shape, false, false)?;
            prop_assert!(focus_is_consistent(&context));
            Ok(())
        })
        .unwrap();
}

#[test]
fn test_filter_is_idempotent() {
    let patterns = prop::sample::select(vec!["t0", "t1", "c0 t", "c1 c0", "T2", "nothing"]);
    let mut runner = TestRunner::default();
    runner
        .run(&(tree_strategy(), patterns), |(shape, pattern)| {
            let context = build(&shape);
            let name_filter = NameFilter::pattern(pattern);

            let once = filter(&context, &name_filter);
            let twice = once.as_ref().and_then(|tree| filter(tree, &name_filter));
            prop_assert_eq!(
                once.as_ref().map(Context::outline),
                twice.as_ref().map(Context::outline)
            );
            if let Some(tree) = &once {
                prop_assert!(focus_is_consistent(tree));
            }
            Ok(())
        })
        .unwrap();
}

#[test]
fn test_empty_alternatives_pass_everything() {
    let mut runner = TestRunner::default();
    runner
        .run(&tree_strategy(), |shape| {
            let context = build(&shape);
            let none: Vec<&str> = Vec::new();
            let by_empty = filter(&context, &NameFilter::any_of(none));
            let by_all = filter(&context, &NameFilter::All);
            prop_assert_eq!(
                by_empty.as_ref().map(Context::outline),
                by_all.as_ref().map(Context::outline)
            );
            Ok(())
        })
        .unwrap();
}
