//! Execution context handed to hooks and test bodies.
//!
//! Every context visit opens a fresh scope chained to its parent's scope, and
//! every test opens a fresh scope chained to its context's scope. Values set
//! by `contextSetUp` are therefore visible to all tests of the context, values
//! set by `setUp` only to the test they prepare, and nothing written by one
//! test is visible to its siblings.

use crate::runner::outcome::AssertionError;
use parking_lot::Mutex;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

type Value = Arc<dyn Any + Send + Sync>;

/// One level of fixture values.
#[derive(Default)]
pub(crate) struct Scope {
    values: Mutex<HashMap<String, Value>>,
    parent: Option<Arc<Scope>>,
}

impl Scope {
    pub(crate) fn root() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn child(parent: &Arc<Scope>) -> Arc<Self> {
        Arc::new(Self {
            values: Mutex::new(HashMap::new()),
            parent: Some(Arc::clone(parent)),
        })
    }

    fn lookup(&self, key: &str) -> Option<Value> {
        if let Some(value) = self.values.lock().get(key) {
            return Some(Arc::clone(value));
        }
        self.parent.as_ref().and_then(|parent| parent.lookup(key))
    }
}

/// Transient bookkeeping for one execution of a test (or context hook pair).
///
/// Lives only for the duration of the run; the test definition itself is
/// never mutated.
pub(crate) struct TestRun {
    name: String,
    assertions: AtomicUsize,
    expected: Mutex<Option<usize>>,
    timeout: Mutex<Option<Duration>>,
    announced_async: AtomicBool,
    completed: AtomicBool,
    stray: Mutex<Option<String>>,
}

impl TestRun {
    pub(crate) fn new(name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            assertions: AtomicUsize::new(0),
            expected: Mutex::new(None),
            timeout: Mutex::new(None),
            announced_async: AtomicBool::new(false),
            completed: AtomicBool::new(false),
            stray: Mutex::new(None),
        })
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn assertion_count(&self) -> usize {
        self.assertions.load(Ordering::SeqCst)
    }

    pub(crate) fn expected_assertions(&self) -> Option<usize> {
        *self.expected.lock()
    }

    pub(crate) fn timeout(&self) -> Option<Duration> {
        *self.timeout.lock()
    }

    /// Returns true only the first time it is called.
    pub(crate) fn announce_async(&self) -> bool {
        !self.announced_async.swap(true, Ordering::SeqCst)
    }

    /// Close the run to stray errors, returning one that arrived after the
    /// last check.
    pub(crate) fn complete(&self) -> Option<String> {
        let mut stray = self.stray.lock();
        self.completed.store(true, Ordering::SeqCst);
        stray.take()
    }

    /// Keep the first error attributed to this run from outside its operations.
    ///
    /// Returns false once the run has completed; the caller reports the error
    /// elsewhere.
    pub(crate) fn attach_stray(&self, message: String) -> bool {
        let mut stray = self.stray.lock();
        if self.completed.load(Ordering::SeqCst) {
            return false;
        }
        if stray.is_none() {
            *stray = Some(message);
        }
        true
    }

    pub(crate) fn take_stray(&self) -> Option<String> {
        self.stray.lock().take()
    }
}

/// Handle passed to every hook and test body.
#[derive(Clone)]
pub struct Fixture {
    scope: Arc<Scope>,
    run: Arc<TestRun>,
}

impl Fixture {
    pub(crate) fn new(scope: Arc<Scope>, run: Arc<TestRun>) -> Self {
        Self { scope, run }
    }

    /// A standalone fixture with its own root scope.
    pub fn detached(name: impl Into<String>) -> Self {
        Self::new(Scope::root(), TestRun::new(name))
    }

    /// Name of the test (or context, for context hooks) being executed.
    pub fn name(&self) -> &str {
        self.run.name()
    }

    /// Store a value in the innermost scope.
    pub fn set<T: Any + Send + Sync>(&self, key: impl Into<String>, value: T) {
        self.scope.values.lock().insert(key.into(), Arc::new(value));
    }

    /// Look a value up through the scope chain.
    pub fn get<T: Any + Send + Sync + Clone>(&self, key: &str) -> Option<T> {
        self.scope
            .lookup(key)
            .and_then(|value| value.downcast_ref::<T>().cloned())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.scope.lookup(key).is_some()
    }

    /// Override the timeout for the remaining operations of this test.
    pub fn set_timeout(&self, timeout: Duration) {
        *self.run.timeout.lock() = Some(timeout);
    }

    /// Declare how many assertions this test is expected to run.
    pub fn expect_assertions(&self, count: usize) {
        *self.run.expected.lock() = Some(count);
    }

    pub fn assertion_count(&self) -> usize {
        self.run.assertion_count()
    }

    /// Count one assertion. Assertion libraries call this for every check.
    pub fn record_assertion(&self) {
        self.run.assertions.fetch_add(1, Ordering::SeqCst);
    }

    pub fn assert(&self, condition: bool, message: impl Into<String>) -> Result<(), AssertionError> {
        self.record_assertion();
        if condition {
            Ok(())
        } else {
            Err(AssertionError::new(message))
        }
    }

    pub fn assert_eq<T: PartialEq + fmt::Debug>(
        &self,
        actual: T,
        expected: T,
    ) -> Result<(), AssertionError> {
        self.record_assertion();
        if actual == expected {
            Ok(())
        } else {
            Err(AssertionError::new(format!(
                "Expected {:?} to equal {:?}",
                actual, expected
            )))
        }
    }

    pub(crate) fn run(&self) -> &Arc<TestRun> {
        &self.run
    }
}

impl fmt::Debug for Fixture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fixture")
            .field("name", &self.run.name())
            .field("assertions", &self.run.assertion_count())
            .finish()
    }
}
