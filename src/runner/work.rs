//! Hook and test bodies, and the completion callback for callback-style work.

use crate::fixture::Fixture;
use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::oneshot;

/// Result of one hook or test body.
pub type WorkResult = anyhow::Result<()>;

type SyncFn = dyn Fn(&Fixture) -> WorkResult + Send + Sync;
type FutureFn = dyn Fn(Fixture) -> BoxFuture<'static, WorkResult> + Send + Sync;
type CallbackFn = dyn Fn(Fixture, Done) + Send + Sync;

/// A unit of work with its execution mode fixed at registration time.
#[derive(Clone)]
pub enum Body {
    /// Runs inline; returns when done.
    Immediate(Arc<SyncFn>),
    /// Returns a future that settles the operation.
    Awaitable(Arc<FutureFn>),
    /// Receives a [`Done`] handle and signals completion through it.
    CallbackStyle(Arc<CallbackFn>),
}

impl Body {
    pub fn sync<F>(f: F) -> Self
    where
        F: Fn(&Fixture) -> WorkResult + Send + Sync + 'static,
    {
        Body::Immediate(Arc::new(f))
    }

    pub fn future<F, Fut>(f: F) -> Self
    where
        F: Fn(Fixture) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = WorkResult> + Send + 'static,
    {
        Body::Awaitable(Arc::new(move |fixture| f(fixture).boxed()))
    }

    pub fn callback<F>(f: F) -> Self
    where
        F: Fn(Fixture, Done) + Send + Sync + 'static,
    {
        Body::CallbackStyle(Arc::new(f))
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Body::Immediate(_) => f.write_str("Body::Immediate"),
            Body::Awaitable(_) => f.write_str("Body::Awaitable"),
            Body::CallbackStyle(_) => f.write_str("Body::CallbackStyle"),
        }
    }
}

/// Completion handle for one timeboxed operation.
///
/// Settling is first-wins: the first call to [`Done::complete`] (or one of its
/// shorthands) delivers the result, every later call is ignored. After the
/// runner stops waiting (timeout) the handle is disarmed and late completions
/// are dropped silently.
#[derive(Clone)]
pub struct Done {
    slot: Arc<Mutex<Option<oneshot::Sender<WorkResult>>>>,
}

impl Done {
    pub(crate) fn pair() -> (Self, oneshot::Receiver<WorkResult>) {
        let (sender, receiver) = oneshot::channel();
        (
            Self {
                slot: Arc::new(Mutex::new(Some(sender))),
            },
            receiver,
        )
    }

    /// Deliver `result`. Returns whether this call settled the operation.
    pub fn complete(&self, result: WorkResult) -> bool {
        let sender = self.slot.lock().take();
        match sender {
            Some(sender) => sender.send(result).is_ok(),
            None => false,
        }
    }

    pub fn ok(&self) -> bool {
        self.complete(Ok(()))
    }

    pub fn fail(&self, error: impl Into<anyhow::Error>) -> bool {
        self.complete(Err(error.into()))
    }

    /// Wrap a continuation so that an error or panic inside it fails the
    /// operation. A successful continuation does not settle anything.
    pub fn wrap<F>(&self, f: F) -> impl FnOnce() + Send + 'static
    where
        F: FnOnce() -> WorkResult + Send + 'static,
    {
        let done = self.clone();
        move || match crate::runner::guard::call(f) {
            Ok(Ok(())) => {}
            Ok(Err(error)) => {
                done.fail(error);
            }
            Err(panic) => {
                done.fail(anyhow::anyhow!(panic));
            }
        }
    }

    pub fn is_settled(&self) -> bool {
        self.slot.lock().is_none()
    }

    pub(crate) fn disarm(&self) {
        self.slot.lock().take();
    }
}

impl fmt::Debug for Done {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Done")
            .field("settled", &self.is_settled())
            .finish()
    }
}
