//! Event transport: bus, JSON lines and the fixture carried by test events

use super::support::{passing, sequential_runner};
use parking_lot::Mutex;
use std::io::{self, Write};
use std::sync::Arc;
use suite_runner::events::{EventBus, EventLog, JsonLinesSink, SuiteEvent, TracingSink};
use suite_runner::{Body, ContextBuilder, Description, Recorder, Runner, RunnerConfig};

#[derive(Clone, Default)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn suite() -> suite_runner::Context {
    ContextBuilder::new()
        .build(
            "root",
            Description::new()
                .test("a", passing())
                .test("//b", passing())
                .context("child", Description::new().test("c", passing())),
        )
        .unwrap()
}

#[tokio::test]
async fn test_bus_delivers_sequenced_events() {
    let (bus, receiver) = EventBus::new_pair();
    let recorder = Recorder::new();
    let runner = sequential_runner(&recorder).with_sink(bus);

    runner.run_suite(&[suite()]).await;

    let mut log = EventLog::new(receiver);
    let drained = log.drain();
    assert_eq!(drained, recorder.names().len());

    let events = log.events();
    assert_eq!(events[0].seq, 1);
    assert_eq!(events[0].event.name(), "suite:start");
    assert_eq!(events[drained - 1].event.name(), "suite:end");
    assert!(events.windows(2).all(|pair| pair[0].seq + 1 == pair[1].seq));
    assert!(events.iter().all(|event| event.ts.ends_with('Z')));
}

#[tokio::test]
async fn test_json_lines_output() {
    let buffer = SharedBuffer::default();
    let runner = Runner::new(RunnerConfig::default().sequential())
        .with_sink(JsonLinesSink::new(buffer.clone()))
        .with_sink(TracingSink);

    runner.run_suite(&[suite()]).await;

    let output = String::from_utf8(buffer.0.lock().clone()).unwrap();
    let lines: Vec<serde_json::Value> = output
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();

    assert_eq!(lines.first().unwrap()["event"], "suite:start");
    let end = lines.last().unwrap();
    assert_eq!(end["event"], "suite:end");
    assert_eq!(end["data"]["tests"], 2);
    assert_eq!(end["data"]["deferred"], 1);
    assert_eq!(end["data"]["ok"], true);

    let nested_start = lines
        .iter()
        .find(|line| line["event"] == "test:start" && line["data"]["name"] == "c")
        .unwrap();
    assert_eq!(nested_start["data"]["path"], serde_json::json!(["root", "child"]));
    assert!(nested_start["data"].get("fixture").is_none());
}

#[tokio::test]
async fn test_test_events_carry_the_fixture() {
    let recorder = Recorder::new();
    let root = ContextBuilder::new()
        .build(
            "root",
            Description::new()
                .set_up(Body::sync(|fixture| {
                    fixture.set("answer", 42u32);
                    Ok(())
                }))
                .test("reads", passing()),
        )
        .unwrap();

    sequential_runner(&recorder).run_suite(&[root]).await;

    let fixture = recorder
        .events()
        .into_iter()
        .find_map(|event| match event {
            SuiteEvent::TestStart(data) => data.fixture,
            _ => None,
        })
        .unwrap();
    assert_eq!(fixture.name(), "reads");
    assert_eq!(fixture.get::<u32>("answer"), Some(42));
    assert_eq!(fixture.assertion_count(), 1);
}
