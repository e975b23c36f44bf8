//! gf-core: stable foundation for gridflow.
//!
//! Contains:
//! - numeric (tolerant power comparisons, finiteness checks)
//! - timing (stopwatch and accumulating timers for round telemetry)
//! - error (shared error type)

pub mod error;
pub mod numeric;
pub mod timing;

// Re-exports: nice ergonomics for downstream crates
pub use error::{GfError, GfResult};
pub use numeric::*;
pub use timing::{AccumulatingTimer, Timer, TimingSummary};
