//! Timeboxing of hooks and test bodies

use super::support::{failures, passing};
use std::future::pending;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use suite_runner::events::SuiteEvent;
use suite_runner::{Body, ContextBuilder, Description, Recorder, Runner, RunnerConfig};

fn runner_with_timeout(recorder: &Recorder, millis: u64) -> Runner {
    Runner::new(
        RunnerConfig::default()
            .sequential()
            .with_timeout(Duration::from_millis(millis)),
    )
    .with_sink(recorder.clone())
}

fn hanging() -> Body {
    Body::future(|_| async {
        pending::<()>().await;
        Ok(())
    })
}

#[tokio::test]
async fn test_late_completion_after_timeout_is_ignored() {
    let recorder = Recorder::new();
    let root = ContextBuilder::new()
        .build(
            "root",
            Description::new().test(
                "slow",
                Body::callback(|fixture, done| {
                    fixture.record_assertion();
                    tokio::spawn(async move {
                        tokio::time::sleep(Duration::from_millis(100)).await;
                        done.ok();
                    });
                }),
            ),
        )
        .unwrap();

    let stats = runner_with_timeout(&recorder, 20).run_suite(&[root]).await;
    tokio::time::sleep(Duration::from_millis(150)).await;

    assert_eq!(recorder.count("test:timeout"), 1);
    assert_eq!(recorder.count("test:success"), 0);
    assert_eq!(recorder.count("test:async"), 1);
    assert_eq!(stats.timeouts, 1);
    assert!(!stats.ok);

    let timeout = &failures(&recorder, "test:timeout")[0];
    assert_eq!(timeout.error.kind, "TimeoutError");
    assert_eq!(timeout.error.message, "test function timed out after 20ms");
}

#[tokio::test]
async fn test_callback_never_called_times_out() {
    let recorder = Recorder::new();
    let root = ContextBuilder::new()
        .build(
            "root",
            Description::new().test("forgets done", Body::callback(|_, _done| {})),
        )
        .unwrap();

    let stats = runner_with_timeout(&recorder, 20).run_suite(&[root]).await;

    assert_eq!(stats.timeouts, 1);
    assert_eq!(recorder.count("context:end"), 1);
}

#[tokio::test]
async fn test_timed_out_work_keeps_running() {
    let finished = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&finished);
    let recorder = Recorder::new();
    let root = ContextBuilder::new()
        .build(
            "root",
            Description::new().test(
                "outlives its budget",
                Body::future(move |_| {
                    let flag = Arc::clone(&flag);
                    async move {
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        flag.store(true, Ordering::SeqCst);
                        Ok(())
                    }
                }),
            ),
        )
        .unwrap();

    runner_with_timeout(&recorder, 10).run_suite(&[root]).await;
    assert!(!finished.load(Ordering::SeqCst));
    tokio::time::sleep(Duration::from_millis(120)).await;

    assert!(finished.load(Ordering::SeqCst));
    assert_eq!(recorder.count("test:timeout"), 1);
    assert_eq!(recorder.count("test:success"), 0);
}

#[tokio::test]
async fn test_set_up_timeout_skips_body() {
    let recorder = Recorder::new();
    let root = ContextBuilder::new()
        .build(
            "root",
            Description::new().set_up(hanging()).test("T", passing()),
        )
        .unwrap();

    runner_with_timeout(&recorder, 20).run_suite(&[root]).await;

    let test_events: Vec<String> = recorder
        .labels()
        .into_iter()
        .filter(|label| label.starts_with("test:"))
        .collect();
    assert_eq!(
        test_events,
        vec!["test:setUp(T)", "test:async(T)", "test:timeout(T)"]
    );
    let timeout = &failures(&recorder, "test:timeout")[0];
    assert_eq!(timeout.error.source.map(|p| p.as_str()), Some("setUp"));
}

#[tokio::test]
async fn test_tear_down_timeout_after_success_is_the_outcome() {
    let recorder = Recorder::new();
    let root = ContextBuilder::new()
        .build(
            "root",
            Description::new().tear_down(hanging()).test("T", passing()),
        )
        .unwrap();

    let stats = runner_with_timeout(&recorder, 20).run_suite(&[root]).await;

    assert_eq!(recorder.count("test:success"), 0);
    let timeout = &failures(&recorder, "test:timeout")[0];
    assert_eq!(timeout.error.source.map(|p| p.as_str()), Some("tearDown"));
    assert_eq!(stats.tests, 1);
    assert_eq!(stats.timeouts, 1);
}

#[tokio::test]
async fn test_async_is_announced_once_per_test() {
    let recorder = Recorder::new();
    let root = ContextBuilder::new()
        .build(
            "root",
            Description::new()
                .set_up(Body::future(|_| async { Ok(()) }))
                .tear_down(Body::callback(|_, done| {
                    done.ok();
                }))
                .test(
                    "T",
                    Body::future(|fixture| async move {
                        tokio::task::yield_now().await;
                        Ok(fixture.assert(true, "after yield")?)
                    }),
                ),
        )
        .unwrap();

    runner_with_timeout(&recorder, 200).run_suite(&[root]).await;

    assert_eq!(recorder.count("test:async"), 1);
    assert_eq!(recorder.count("test:success"), 1);
}

#[tokio::test]
async fn test_fixture_timeout_extends_budget() {
    let recorder = Recorder::new();
    let root = ContextBuilder::new()
        .build(
            "root",
            Description::new().test(
                "needs longer",
                Body::callback(|fixture, done| {
                    fixture.set_timeout(Duration::from_millis(500));
                    tokio::spawn(async move {
                        tokio::time::sleep(Duration::from_millis(60)).await;
                        fixture.record_assertion();
                        done.ok();
                    });
                }),
            ),
        )
        .unwrap();

    let stats = runner_with_timeout(&recorder, 20).run_suite(&[root]).await;

    assert_eq!(recorder.count("test:success"), 1, "{:?}", recorder.labels());
    assert!(stats.ok);
}

#[tokio::test]
async fn test_fixture_timeout_shortens_budget() {
    let recorder = Recorder::new();
    let root = ContextBuilder::new()
        .build(
            "root",
            Description::new().test(
                "impatient",
                Body::callback(|fixture, _done| {
                    fixture.set_timeout(Duration::from_millis(10));
                }),
            ),
        )
        .unwrap();

    runner_with_timeout(&recorder, 5_000).run_suite(&[root]).await;

    let timeout = &failures(&recorder, "test:timeout")[0];
    assert_eq!(timeout.error.message, "test function timed out after 10ms");
}

#[tokio::test]
async fn test_context_set_up_timeout_is_uncaught() {
    let recorder = Recorder::new();
    let root = ContextBuilder::new()
        .build(
            "root",
            Description::new()
                .context_set_up(hanging())
                .test("T", passing()),
        )
        .unwrap();

    let stats = runner_with_timeout(&recorder, 20).run_suite(&[root]).await;

    let uncaught = recorder
        .events()
        .into_iter()
        .find_map(|event| match event {
            SuiteEvent::UncaughtException(data) => Some(data.error),
            _ => None,
        })
        .unwrap();
    assert_eq!(uncaught.kind, "TimeoutError");
    assert_eq!(uncaught.source.map(|p| p.as_str()), Some("contextSetUp"));
    assert_eq!(recorder.count("test:start"), 0);
    assert_eq!(recorder.count("context:end"), 1);
    assert_eq!(stats.errors, 1);
}
