//! Scheduler: walks context trees and runs their tests.
//!
//! A [`Runner`] executes one stream of work at a time. Hooks and test bodies
//! are timeboxed individually, their outcomes are classified, and every step
//! is reported to the registered [`EventSink`]s. Nothing about a run is
//! stored on the tree itself; per-run state lives in the runner and in the
//! per-test [`Fixture`].

pub mod guard;
pub mod outcome;
pub mod random;
pub mod stats;
pub mod timebox;
pub mod uncaught;
pub mod work;

use crate::config::{RunnerConfig, SuiteConfig};
use crate::context::model::{Context, Test};
use crate::error::SuiteError;
use crate::events::event::{
    ConfigurationData, ContextData, DeferredData, FailureData, RuntimeInfo, SuccessData,
    SuiteEvent, TestData, UncaughtData, UnsupportedData,
};
use crate::events::sink::EventSink;
use crate::fixture::{Fixture, Scope, TestRun};
use futures::future::BoxFuture;
use futures::FutureExt;
use outcome::{AssertionError, ErrorReport, Failure, Phase};
use parking_lot::{Mutex, RwLock};
use random::Randomizer;
use stats::RunStatistics;
use std::sync::{Arc, Weak};
use std::time::Duration;
use timebox::Started;
use tracing::{debug, info, warn};
use uncaught::{Registration, UncaughtHandler};
use work::{Body, Done};

/// How long the panic hook waits for the run state before giving up.
const UNCAUGHT_LOCK_WAIT: Duration = Duration::from_millis(100);

struct RunState {
    stats: RunStatistics,
    randomizer: Randomizer,
    current_test: Option<Arc<TestRun>>,
    current_op: Option<Done>,
}

/// State shared with the process-wide panic hook.
struct Core {
    sinks: RwLock<Vec<Arc<dyn EventSink>>>,
    state: Mutex<RunState>,
    /// Uncaught errors raised by the panic hook, reported at the next step.
    pending: Mutex<Vec<ErrorReport>>,
}

impl Core {
    fn emit(&self, event: SuiteEvent) {
        let sinks = self.sinks.read().clone();
        for sink in sinks {
            if let Err(panic) = guard::call(|| sink.handle(&event)) {
                warn!(event = event.name(), panic = %panic, "Event listener panicked");
            }
        }
    }

    fn record_uncaught(&self, error: ErrorReport) {
        self.state.lock().stats.errors += 1;
        warn!(message = %error.message, "Uncaught exception");
        self.emit(SuiteEvent::UncaughtException(UncaughtData { error }));
    }

    fn flush_uncaught(&self) {
        let pending = std::mem::take(&mut *self.pending.lock());
        for error in pending {
            self.record_uncaught(error);
        }
    }
}

impl UncaughtHandler for Core {
    fn uncaught(&self, message: String, location: Option<String>) {
        let (op, test) = match self.state.try_lock_for(UNCAUGHT_LOCK_WAIT) {
            Some(state) => (state.current_op.clone(), state.current_test.clone()),
            None => {
                warn!(%message, "Dropping uncaught panic: run state is busy");
                return;
            }
        };

        if let Some(done) = op {
            if done.fail(anyhow::anyhow!(message.clone())) {
                return;
            }
        }
        if let Some(run) = test {
            if run.attach_stray(message.clone()) {
                return;
            }
        }
        // Sinks never run inside the panic hook.
        self.pending.lock().push(ErrorReport {
            kind: "Error".to_string(),
            message,
            stack: location,
            source: None,
        });
    }
}

/// Hook chain and naming context accumulated while descending the tree.
#[derive(Clone)]
struct Frame {
    path: Vec<String>,
    /// Outermost first.
    set_ups: Vec<Body>,
    /// Innermost first.
    tear_downs: Vec<Body>,
    scope: Arc<Scope>,
    /// Only focused contexts and tests run.
    focus_mode: bool,
}

impl Frame {
    fn root(focus_mode: bool) -> Self {
        Self {
            path: Vec::new(),
            set_ups: Vec::new(),
            tear_downs: Vec::new(),
            scope: Scope::root(),
            focus_mode,
        }
    }

    fn enter(&self, context: &Context) -> Self {
        let mut frame = Self {
            path: self.path.clone(),
            set_ups: self.set_ups.clone(),
            tear_downs: self.tear_downs.clone(),
            scope: Scope::child(&self.scope),
            focus_mode: self.focus_mode,
        };
        frame.path.push(context.name().to_string());
        if let Some(set_up) = &context.hooks().set_up {
            frame.set_ups.push(set_up.clone());
        }
        if let Some(tear_down) = &context.hooks().tear_down {
            frame.tear_downs.insert(0, tear_down.clone());
        }
        frame
    }
}

/// Runs context trees.
pub struct Runner {
    config: RunnerConfig,
    seed: Option<u64>,
    runtime: Option<RuntimeInfo>,
    core: Arc<Core>,
}

impl Default for Runner {
    fn default() -> Self {
        Self::new(RunnerConfig::default())
    }
}

impl Runner {
    pub fn new(config: RunnerConfig) -> Self {
        uncaught::install();
        let seed = if config.random {
            Some(config.random_seed.unwrap_or_else(random::generate_seed))
        } else {
            None
        };
        let state = RunState {
            stats: RunStatistics::default(),
            randomizer: Randomizer::from_seed(seed),
            current_test: None,
            current_op: None,
        };
        Self {
            config,
            seed,
            runtime: None,
            core: Arc::new(Core {
                sinks: RwLock::new(Vec::new()),
                state: Mutex::new(state),
                pending: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Create a runner from loaded configuration, validating it first.
    pub fn from_config(config: &SuiteConfig) -> Result<Self, SuiteError> {
        config.validate()?;
        Ok(Self::new(config.runner.clone()))
    }

    pub fn with_sink(self, sink: impl EventSink + 'static) -> Self {
        self.add_sink(Arc::new(sink));
        self
    }

    pub fn add_sink(&self, sink: Arc<dyn EventSink>) {
        self.core.sinks.write().push(sink);
    }

    /// Describe the runtime; enables the `suite:configuration` event.
    pub fn with_runtime(mut self, runtime: RuntimeInfo) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Seed used for ordering, or `None` when randomization is disabled.
    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Statistics accumulated since the last `run_suite` started.
    pub fn statistics(&self) -> RunStatistics {
        self.core.state.lock().stats.clone()
    }

    /// Run every root context and report the final statistics.
    ///
    /// Never fails: test and context failures are reported as events and
    /// counted in the returned statistics.
    pub async fn run_suite(&self, roots: &[Context]) -> RunStatistics {
        let _registration = self.register();
        let focus_mode = roots.iter().any(Context::is_focused);
        {
            let mut state = self.core.state.lock();
            state.stats = RunStatistics::default();
            state.randomizer = Randomizer::from_seed(self.seed);
            state.current_test = None;
            state.current_op = None;
        }

        info!(seed = ?self.seed, roots = roots.len(), focus_mode, "Suite started");
        self.emit(SuiteEvent::SuiteStart);

        if let Some(runtime) = &self.runtime {
            let tests = roots
                .iter()
                .filter(|root| !focus_mode || root.is_focused())
                .map(|root| root.runnable_count(focus_mode))
                .sum();
            self.emit(SuiteEvent::SuiteConfiguration(ConfigurationData {
                runtime: runtime.clone(),
                tests,
                seed: self.seed,
            }));
        }
        if focus_mode {
            self.emit(SuiteEvent::RunnerFocus);
        }

        let mut order: Vec<&Context> = roots
            .iter()
            .filter(|root| !focus_mode || root.is_focused())
            .collect();
        self.permute(&mut order);

        let frame = Frame::root(focus_mode);
        for context in order {
            self.run_context_in(context, &frame).await;
        }
        self.core.flush_uncaught();

        let stats = {
            let mut state = self.core.state.lock();
            state.stats.settle(self.config.fail_on_no_assertions);
            state.stats.clone()
        };
        info!(
            ok = stats.ok,
            tests = stats.tests,
            failures = stats.failures,
            errors = stats.errors,
            timeouts = stats.timeouts,
            deferred = stats.deferred,
            "Suite finished"
        );
        self.emit(SuiteEvent::SuiteEnd(stats.clone()));
        stats
    }

    /// Run a single context tree outside of a suite.
    ///
    /// Statistics accumulate on the runner; no suite events are emitted.
    /// Focus mode applies when `context` itself contains focused items.
    pub async fn run_context(&self, context: &Context) {
        let _registration = self.register();
        let frame = Frame::root(context.is_focused());
        self.run_context_in(context, &frame).await;
        self.core.flush_uncaught();
    }

    /// Run a single test with no surrounding hooks.
    pub async fn run_test(&self, test: &Test) {
        let _registration = self.register();
        self.run_test_in(test, &Frame::root(false)).await;
        self.core.flush_uncaught();
    }

    fn register(&self) -> Registration {
        let core: Weak<Core> = Arc::downgrade(&self.core);
        let handler: Weak<dyn UncaughtHandler> = core;
        uncaught::register(handler)
    }

    fn emit(&self, event: SuiteEvent) {
        self.core.emit(event);
    }

    fn permute<T>(&self, items: &mut [T]) {
        self.core.state.lock().randomizer.permute(items);
    }

    fn run_context_in<'a>(&'a self, context: &'a Context, parent: &'a Frame) -> BoxFuture<'a, ()> {
        async move {
            let path = parent.path.clone();

            let unmet = if context.requirements().is_empty() {
                Vec::new()
            } else {
                match guard::call(|| context.requirements().unmet()) {
                    Ok(unmet) => unmet,
                    Err(panic) => {
                        self.core.record_uncaught(error_report(panic));
                        return;
                    }
                }
            };
            if !unmet.is_empty() {
                debug!(context = context.name(), ?unmet, "Context unsupported");
                self.emit(SuiteEvent::ContextUnsupported(UnsupportedData {
                    name: context.name().to_string(),
                    path,
                    unsupported: unmet,
                }));
                return;
            }

            self.core.state.lock().stats.contexts += 1;
            debug!(context = context.name(), "Context started");
            self.emit(SuiteEvent::ContextStart(ContextData {
                name: context.name().to_string(),
                path: path.clone(),
            }));

            let frame = parent.enter(context);
            let run_hooks = !context.is_deferred();

            let prepared = match (&context.hooks().context_set_up, run_hooks) {
                (Some(hook), true) => {
                    match self.context_hook(hook, context, &frame, Phase::ContextSetUp).await {
                        Ok(()) => true,
                        Err(failure) => {
                            self.core.record_uncaught(failure.report());
                            false
                        }
                    }
                }
                _ => true,
            };

            if prepared {
                let focus_mode = frame.focus_mode;
                let mut children: Vec<&Context> = context
                    .contexts()
                    .iter()
                    .filter(|child| !focus_mode || child.is_focused())
                    .collect();
                let mut tests: Vec<&Arc<Test>> = context
                    .tests()
                    .iter()
                    .filter(|test| !focus_mode || test.is_focused())
                    .collect();
                self.permute(&mut children);
                self.permute(&mut tests);

                for child in children {
                    self.run_context_in(child, &frame).await;
                }
                for test in tests {
                    self.run_test_in(test, &frame).await;
                }
            }

            if let (Some(hook), true) = (&context.hooks().context_tear_down, run_hooks) {
                if let Err(failure) = self
                    .context_hook(hook, context, &frame, Phase::ContextTearDown)
                    .await
                {
                    self.core.record_uncaught(failure.report());
                }
            }

            self.core.flush_uncaught();
            debug!(context = context.name(), "Context finished");
            self.emit(SuiteEvent::ContextEnd(ContextData {
                name: context.name().to_string(),
                path,
            }));
        }
        .boxed()
    }

    async fn context_hook(
        &self,
        hook: &Body,
        context: &Context,
        frame: &Frame,
        phase: Phase,
    ) -> Result<(), Failure> {
        let fixture = Fixture::new(Arc::clone(&frame.scope), TestRun::new(context.name()));
        self.invoke(hook, &fixture, phase, None).await
    }

    async fn run_test_in(&self, test: &Test, frame: &Frame) {
        let path = frame.path.clone();

        if test.is_deferred() {
            self.core.state.lock().stats.deferred += 1;
            debug!(test = test.name(), "Test deferred");
            self.emit(SuiteEvent::TestDeferred(DeferredData {
                name: test.name().to_string(),
                path,
                comment: test.comment().map(str::to_string),
            }));
            return;
        }

        let run = TestRun::new(test.name());
        let fixture = Fixture::new(Scope::child(&frame.scope), Arc::clone(&run));
        let data = TestData {
            name: test.name().to_string(),
            path,
            fixture: Some(fixture.clone()),
        };
        self.core.state.lock().current_test = Some(Arc::clone(&run));

        let mut failure = None;

        if !frame.set_ups.is_empty() {
            self.emit(SuiteEvent::TestSetUp(data.clone()));
            for hook in &frame.set_ups {
                if let Err(err) = self.invoke(hook, &fixture, Phase::SetUp, Some(&data)).await {
                    failure = Some(err);
                    break;
                }
            }
        }

        if failure.is_none() {
            self.emit(SuiteEvent::TestStart(data.clone()));
            if let Some(body) = test.body() {
                if let Err(err) = self
                    .invoke(body, &fixture, Phase::TestFunction, Some(&data))
                    .await
                {
                    failure = Some(err);
                }
            }
            if failure.is_none() {
                failure = run.take_stray().map(|message| Failure::Error {
                    error: anyhow::anyhow!(message),
                    phase: Phase::TestFunction,
                });
            }
            if failure.is_none() {
                failure = self.verify_assertions(&run);
            }
        }

        if !frame.tear_downs.is_empty() {
            self.emit(SuiteEvent::TestTearDown(data.clone()));
            for hook in &frame.tear_downs {
                let Err(err) = self.invoke(hook, &fixture, Phase::TearDown, Some(&data)).await
                else {
                    continue;
                };
                if failure.is_some() {
                    warn!(test = test.name(), error = %err, "tearDown failed after test failure");
                } else if err.is_timeout() {
                    failure = Some(err);
                } else {
                    self.core.record_uncaught(err.report());
                }
            }
        }

        let late = run.complete();
        {
            let mut state = self.core.state.lock();
            state.current_test = None;
            state.current_op = None;
        }
        if let Some(message) = late {
            warn!(test = test.name(), %message, "Late error after test completed");
        }

        self.conclude(data, &run, failure);
        self.core.flush_uncaught();
    }

    fn verify_assertions(&self, run: &TestRun) -> Option<Failure> {
        let count = run.assertion_count();
        match run.expected_assertions() {
            Some(expected) if expected != count => Some(Failure::Assertion(
                AssertionError::wrong_count(expected, count),
            )),
            Some(_) => None,
            None if self.config.fail_on_no_assertions && count == 0 => {
                Some(Failure::Assertion(AssertionError::no_assertions()))
            }
            None => None,
        }
    }

    fn conclude(&self, data: TestData, run: &TestRun, failure: Option<Failure>) {
        let assertions = run.assertion_count();
        {
            let mut state = self.core.state.lock();
            state.stats.tests += 1;
            state.stats.assertions += assertions;
            match &failure {
                None => {}
                Some(Failure::Assertion(_)) => state.stats.failures += 1,
                Some(Failure::Timeout(_)) => state.stats.timeouts += 1,
                Some(Failure::Error { .. }) => state.stats.errors += 1,
            }
        }

        let TestData { name, path, .. } = data;
        let event = match failure {
            None => {
                debug!(test = %name, assertions, "Test passed");
                SuiteEvent::TestSuccess(SuccessData {
                    name,
                    path,
                    assertions,
                })
            }
            Some(failure) => {
                debug!(test = %name, %failure, "Test did not pass");
                let report = FailureData {
                    name,
                    path,
                    error: failure.report(),
                };
                match failure {
                    Failure::Assertion(_) => SuiteEvent::TestFailure(report),
                    Failure::Timeout(_) => SuiteEvent::TestTimeout(report),
                    Failure::Error { .. } => SuiteEvent::TestError(report),
                }
            }
        };
        self.emit(event);
    }

    /// Run one hook or body, waiting for it at most the effective timeout.
    async fn invoke(
        &self,
        body: &Body,
        fixture: &Fixture,
        phase: Phase,
        announce: Option<&TestData>,
    ) -> Result<(), Failure> {
        let (done, receiver) = match timebox::start(body, fixture, phase) {
            Started::Finished(result) => {
                self.core.flush_uncaught();
                return result;
            }
            Started::Pending(done, receiver) => (done, receiver),
        };

        if let Some(data) = announce {
            if fixture.run().announce_async() {
                self.emit(SuiteEvent::TestAsync(data.clone()));
            }
        }

        self.core.state.lock().current_op = Some(done.clone());
        if let Some(message) = fixture.run().take_stray() {
            done.fail(anyhow::anyhow!(message));
        }

        let limit = fixture.run().timeout().unwrap_or_else(|| self.config.timeout());
        let result = timebox::settle_within(&done, receiver, limit, phase).await;
        self.core.state.lock().current_op = None;
        self.core.flush_uncaught();
        result
    }
}

fn error_report(message: String) -> ErrorReport {
    ErrorReport {
        kind: "Error".to_string(),
        message,
        stack: None,
        source: None,
    }
}
