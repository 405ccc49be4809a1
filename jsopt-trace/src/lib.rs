//! Nested event-trace logger for the jsopt toolchain.
//!
//! Instrumented code opens and closes named events on its own thread; the
//! logger rebuilds the call tree from a per-thread stack and hands every
//! finished root event to a background writer thread, which streams JSON
//! records to the configured sink.
//!
//!   start/end/mark (any thread)
//!     -> per-thread pending stack (no locking)
//!     -> mpsc queue (completed roots only)
//!     -> writer thread (sole owner of the sink)

// ---------------------------------------------------------------------
// Errors and configuration
// ---------------------------------------------------------------------

pub mod error;
pub mod config;

// ---------------------------------------------------------------------
// Event model and time sources
// ---------------------------------------------------------------------

pub mod event;
pub mod clock;
pub mod pause;

// ---------------------------------------------------------------------
// Logger and background writer
// ---------------------------------------------------------------------

pub mod writer;
pub mod logger;
pub mod global;

// ---------------------------------------------------------------------
// Public API re-exports
// ---------------------------------------------------------------------

pub use config::{ClockSource, OutputFormat, TraceConfig};
pub use error::{Result, TraceError};
pub use event::{Event, EventType};
pub use logger::{EventHandle, TraceLogger};
pub use pause::{CollectorStats, PauseSource};
