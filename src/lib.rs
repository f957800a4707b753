//! Suite Runner: asynchronous test-suite execution
//!
//! Builds trees of named contexts from declarative descriptions, then runs
//! them one operation at a time with per-operation timeouts, setUp/tearDown
//! chains, focus and deferral, seeded ordering and outcome classification.
//! Progress is reported as a stream of lifecycle events.

pub mod config;
pub mod context;
pub mod error;
pub mod events;
pub mod fixture;
pub mod logging;
pub mod runner;

pub use config::{ConfigLoader, RunnerConfig, SuiteConfig};
pub use context::{filter, Context, ContextBuilder, Description, Item, NameFilter, Test};
pub use error::{ConfigurationError, SuiteError};
pub use events::{EventSink, Recorder, SuiteEvent};
pub use fixture::Fixture;
pub use runner::outcome::{AssertionError, Phase, TimeoutError};
pub use runner::stats::RunStatistics;
pub use runner::work::{Body, Done, WorkResult};
pub use runner::Runner;
