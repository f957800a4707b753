//! Panic capture for the invocation paths the runner owns.
//!
//! A panic raised while a hook, test body or listener is being driven by the
//! runner is caught and turned into a failure. The depth counter tells the
//! process-wide panic hook that such a panic is already accounted for.

use futures::FutureExt;
use std::any::Any;
use std::cell::Cell;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::task::{Context, Poll};

thread_local! {
    static GUARD_DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// Whether the current thread is inside a guarded invocation.
pub(crate) fn is_guarded() -> bool {
    GUARD_DEPTH.with(|depth| depth.get() > 0)
}

struct DepthGuard;

impl DepthGuard {
    fn enter() -> Self {
        GUARD_DEPTH.with(|depth| depth.set(depth.get() + 1));
        DepthGuard
    }
}

impl Drop for DepthGuard {
    fn drop(&mut self) {
        GUARD_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

/// Run `f`, converting a panic into an error message.
pub(crate) fn call<T>(f: impl FnOnce() -> T) -> Result<T, String> {
    let _depth = DepthGuard::enter();
    panic::catch_unwind(AssertUnwindSafe(f)).map_err(|payload| panic_message(&*payload))
}

/// Future adapter that marks every poll as guarded.
struct Guarded<F> {
    inner: Pin<Box<F>>,
}

impl<F: Future> Future for Guarded<F> {
    type Output = F::Output;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let _depth = DepthGuard::enter();
        self.inner.as_mut().poll(cx)
    }
}

/// Drive `future` to completion, converting a panic into an error message.
pub(crate) async fn drive<F: Future>(future: F) -> Result<F::Output, String> {
    AssertUnwindSafe(Guarded {
        inner: Box::pin(future),
    })
    .catch_unwind()
    .await
    .map_err(|payload| panic_message(&*payload))
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}
