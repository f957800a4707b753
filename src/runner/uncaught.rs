//! Process-wide routing of panics that escape every guarded path.
//!
//! The panic hook is installed once, the first time a runner is created, and
//! stays for the lifetime of the process. Panics raised while the runner is
//! driving a hook, body or listener are already captured and are ignored
//! here. Anything else (a panic on a thread or task a test spawned, say) goes
//! to the most recently registered runner that is still alive.

use crate::runner::guard;
use parking_lot::Mutex;
use std::panic;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Once, Weak};

/// Receives panics that no guarded path captured.
pub(crate) trait UncaughtHandler: Send + Sync {
    fn uncaught(&self, message: String, location: Option<String>);
}

static INSTALL: Once = Once::new();
static NEXT_ID: AtomicU64 = AtomicU64::new(1);
static HANDLERS: Mutex<Vec<(u64, Weak<dyn UncaughtHandler>)>> = Mutex::new(Vec::new());

pub(crate) fn install() {
    INSTALL.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if guard::is_guarded() {
                return;
            }
            let handler = HANDLERS
                .lock()
                .iter()
                .rev()
                .find_map(|(_, handler)| handler.upgrade());
            if let Some(handler) = handler {
                let location = info
                    .location()
                    .map(|location| format!("at {}:{}", location.file(), location.line()));
                handler.uncaught(guard::panic_message(info.payload()), location);
            }
            previous(info);
        }));
    });
}

/// Keeps a handler registered until dropped.
pub(crate) struct Registration {
    id: u64,
}

pub(crate) fn register(handler: Weak<dyn UncaughtHandler>) -> Registration {
    let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    HANDLERS.lock().push((id, handler));
    Registration { id }
}

impl Drop for Registration {
    fn drop(&mut self) {
        HANDLERS
            .lock()
            .retain(|(id, handler)| *id != self.id && handler.strong_count() > 0);
    }
}
