//! Starting an operation and racing its completion against a timer.

use crate::fixture::Fixture;
use crate::runner::guard;
use crate::runner::outcome::{Failure, Phase, TimeoutError};
use crate::runner::work::{Body, Done, WorkResult};
use std::time::Duration;
use tokio::sync::oneshot;

/// State of an operation right after it was invoked.
pub(crate) enum Started {
    /// Immediate work; nothing to wait for.
    Finished(Result<(), Failure>),
    /// Suspended work settling through `Done`.
    Pending(Done, oneshot::Receiver<WorkResult>),
}

pub(crate) fn start(body: &Body, fixture: &Fixture, phase: Phase) -> Started {
    match body {
        Body::Immediate(f) => Started::Finished(match guard::call(|| f(fixture)) {
            Ok(Ok(())) => Ok(()),
            Ok(Err(error)) => Err(Failure::classify(error, phase)),
            Err(panic) => Err(Failure::Error {
                error: anyhow::anyhow!(panic),
                phase,
            }),
        }),
        Body::Awaitable(f) => {
            let (done, receiver) = Done::pair();
            match guard::call(|| f(fixture.clone())) {
                Ok(future) => {
                    let settle = done.clone();
                    // Detached: a timeout stops the wait, not the work.
                    tokio::spawn(async move {
                        let result = match guard::drive(future).await {
                            Ok(result) => result,
                            Err(panic) => Err(anyhow::anyhow!(panic)),
                        };
                        settle.complete(result);
                    });
                }
                Err(panic) => {
                    done.fail(anyhow::anyhow!(panic));
                }
            }
            Started::Pending(done, receiver)
        }
        Body::CallbackStyle(f) => {
            let (done, receiver) = Done::pair();
            if let Err(panic) = guard::call(|| f(fixture.clone(), done.clone())) {
                done.fail(anyhow::anyhow!(panic));
            }
            Started::Pending(done, receiver)
        }
    }
}

/// Wait for `done` to settle, at most `limit`.
///
/// On timeout the handle is disarmed, so a completion arriving later is
/// dropped without effect.
pub(crate) async fn settle_within(
    done: &Done,
    receiver: oneshot::Receiver<WorkResult>,
    limit: Duration,
    phase: Phase,
) -> Result<(), Failure> {
    match tokio::time::timeout(limit, receiver).await {
        Ok(Ok(Ok(()))) => Ok(()),
        Ok(Ok(Err(error))) => Err(Failure::classify(error, phase)),
        Ok(Err(_)) => Err(Failure::Error {
            error: anyhow::anyhow!("completion handle dropped without settling"),
            phase,
        }),
        Err(_) => {
            done.disarm();
            Err(Failure::Timeout(TimeoutError {
                phase,
                after: limit,
            }))
        }
    }
}
