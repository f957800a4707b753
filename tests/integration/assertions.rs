//! Assertion counting and the no-assertions safety net

use super::support::{failures, sequential_runner};
use suite_runner::events::SuiteEvent;
use suite_runner::{Body, ContextBuilder, Description, Recorder, Runner, RunnerConfig};

fn silent_suite() -> suite_runner::Context {
    ContextBuilder::new()
        .build("root", Description::new().test("silent", Body::sync(|_| Ok(()))))
        .unwrap()
}

#[tokio::test]
async fn test_no_assertions_fails_when_configured() {
    let recorder = Recorder::new();
    let stats = sequential_runner(&recorder).run_suite(&[silent_suite()]).await;

    let failed = failures(&recorder, "test:failure");
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].error.kind, "AssertionError");
    assert_eq!(failed[0].error.message, "No assertions!");
    assert!(!stats.ok);
}

#[tokio::test]
async fn test_no_assertions_passes_when_disabled() {
    let recorder = Recorder::new();
    let runner = Runner::new(
        RunnerConfig::default()
            .sequential()
            .fail_on_no_assertions(false),
    )
    .with_sink(recorder.clone());

    let stats = runner.run_suite(&[silent_suite()]).await;

    assert_eq!(recorder.count("test:success"), 1);
    assert!(stats.ok);
}

#[tokio::test]
async fn test_counter_resets_per_test() {
    let recorder = Recorder::new();
    let root = ContextBuilder::new()
        .build(
            "root",
            Description::new()
                .test(
                    "three",
                    Body::sync(|fixture| {
                        for n in 0..3 {
                            fixture.assert(n < 3, "small")?;
                        }
                        Ok(())
                    }),
                )
                .test("one", Body::sync(|fixture| Ok(fixture.assert_eq("a", "a")?))),
        )
        .unwrap();

    let stats = sequential_runner(&recorder).run_suite(&[root]).await;

    let counts: Vec<(String, usize)> = recorder
        .events()
        .into_iter()
        .filter_map(|event| match event {
            SuiteEvent::TestSuccess(data) => Some((data.name, data.assertions)),
            _ => None,
        })
        .collect();
    assert_eq!(
        counts,
        vec![("three".to_string(), 3), ("one".to_string(), 1)]
    );
    assert_eq!(stats.assertions, 4);
}

#[tokio::test]
async fn test_failing_assertion_is_a_failure() {
    let recorder = Recorder::new();
    let root = ContextBuilder::new()
        .build(
            "root",
            Description::new().test(
                "wrong",
                Body::sync(|fixture| Ok(fixture.assert_eq(2 + 2, 5)?)),
            ),
        )
        .unwrap();

    let stats = sequential_runner(&recorder).run_suite(&[root]).await;

    let failed = failures(&recorder, "test:failure");
    assert_eq!(failed[0].error.message, "Expected 4 to equal 5");
    assert_eq!(stats.failures, 1);
    assert_eq!(stats.assertions, 1);
}

#[tokio::test]
async fn test_count_check_skipped_for_other_errors() {
    let recorder = Recorder::new();
    let root = ContextBuilder::new()
        .build(
            "root",
            Description::new().test("errors", Body::sync(|_| Err(anyhow::anyhow!("io")))),
        )
        .unwrap();

    sequential_runner(&recorder).run_suite(&[root]).await;

    assert_eq!(recorder.count("test:error"), 1);
    assert_eq!(recorder.count("test:failure"), 0);
}

#[tokio::test]
async fn test_assertion_error_through_callback() {
    let recorder = Recorder::new();
    let root = ContextBuilder::new()
        .build(
            "root",
            Description::new().test(
                "later",
                Body::callback(|fixture, done| {
                    let check = done.wrap(move || Ok(fixture.assert(false, "checked later")?));
                    tokio::spawn(async move { check() });
                }),
            ),
        )
        .unwrap();

    sequential_runner(&recorder).run_suite(&[root]).await;

    let failed = failures(&recorder, "test:failure");
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].error.message, "checked later");
}
