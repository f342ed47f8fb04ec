//! Event handler adapters.
//!
//! - `LoggingEventHandler` - Writes each chat event to the structured log
//! - `RecordingEventHandler` - Captures events for test assertions

mod logging;
mod recording;

pub use logging::LoggingEventHandler;
pub use recording::RecordingEventHandler;
