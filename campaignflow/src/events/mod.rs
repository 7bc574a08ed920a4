//! Run lifecycle events and the sinks that receive them.
//!
//! The execution driver emits one [`RunEvent`] per lifecycle transition.
//! Sinks are injected per driver; there is no process-wide sink.

mod run_event;
mod sink;

pub use run_event::RunEvent;
pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
