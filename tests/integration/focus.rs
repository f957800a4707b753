//! Focus mode restricts a run to the focused subset

use super::support::{passing, sequential_runner, CallLog};
use suite_runner::{ContextBuilder, Description, Recorder};

#[tokio::test]
async fn test_single_focused_test_runs_alone() {
    let log = CallLog::new();
    let recorder = Recorder::new();
    let root = ContextBuilder::new()
        .build(
            "root",
            Description::new()
                .test("first", log.body("first"))
                .test("=>chosen", log.body("chosen"))
                .test("last", log.body("last")),
        )
        .unwrap();

    let stats = sequential_runner(&recorder).run_suite(&[root]).await;

    assert_eq!(recorder.count("runner:focus"), 1);
    let outcomes: Vec<_> = recorder
        .events()
        .into_iter()
        .filter(|event| event.is_test_outcome())
        .collect();
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].subject(), Some("chosen"));
    assert_eq!(log.calls(), vec!["chosen"]);
    assert_eq!(stats.tests, 1);
}

#[tokio::test]
async fn test_unfocused_roots_emit_nothing() {
    let recorder = Recorder::new();
    let builder = ContextBuilder::new();
    let plain = builder
        .build("plain", Description::new().test("a", passing()))
        .unwrap();
    let focused = builder
        .build(
            "focused",
            Description::new().context("inner", Description::new().test("=>b", passing())),
        )
        .unwrap();

    sequential_runner(&recorder).run_suite(&[plain, focused]).await;

    assert_eq!(
        recorder.labels(),
        vec![
            "suite:start",
            "runner:focus",
            "context:start(focused)",
            "context:start(inner)",
            "test:start(b)",
            "test:success(b)",
            "context:end(inner)",
            "context:end(focused)",
            "suite:end",
        ]
    );
}

#[tokio::test]
async fn test_focused_context_runs_all_of_its_tests() {
    let log = CallLog::new();
    let recorder = Recorder::new();
    let root = ContextBuilder::new()
        .build(
            "root",
            Description::new()
                .test("outside", log.body("outside"))
                .context(
                    "=>group",
                    Description::new()
                        .test("one", log.body("one"))
                        .context("deeper", Description::new().test("two", log.body("two"))),
                ),
        )
        .unwrap();

    sequential_runner(&recorder).run_suite(&[root]).await;

    assert_eq!(log.calls(), vec!["two", "one"]);
    assert_eq!(recorder.count("runner:focus"), 1);
}

#[tokio::test]
async fn test_no_focus_no_focus_event() {
    let recorder = Recorder::new();
    let root = ContextBuilder::new()
        .build("root", Description::new().test("a", passing()))
        .unwrap();

    sequential_runner(&recorder).run_suite(&[root]).await;

    assert_eq!(recorder.count("runner:focus"), 0);
}
