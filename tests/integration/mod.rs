//! Integration tests for the suite runner

mod assertions;
mod event_stream;
mod focus;
mod timeouts;
