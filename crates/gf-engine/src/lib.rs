//! gf-engine: incremental, parallel recalculation of segmented grids.
//!
//! - [`WorkerPool`]: long-lived worker slots, one solver per slot
//! - [`Orchestrator`]: segmentation, selective dispatch and the partition cache
//! - [`RoundReport`]: per-segment status and timing of one round
//! - [`EngineConfig`]: pool size, calculation method, export directory

pub mod config;
pub mod error;
pub mod orchestrator;
pub mod pool;
pub mod report;

pub use config::{DEFAULT_INITIAL_SLOTS, EngineConfig};
pub use error::{EngineError, EngineResult};
pub use orchestrator::Orchestrator;
pub use pool::{PoolStats, WorkerPool};
pub use report::{RoundMode, RoundReport, SegmentReport, SegmentStatus};
