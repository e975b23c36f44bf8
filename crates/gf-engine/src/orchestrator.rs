//! Recalculation rounds over a segmented grid.
//!
//! The orchestrator keeps the signatures of the partition produced by the
//! last completed round. A selective round re-segments the input model and
//! dispatches only the segments that no cached signature matches; a forced
//! round dispatches all of them. After either round the `changed` flags of
//! the input model are cleared and the new partition replaces the cache.

use std::collections::BTreeSet;
use std::sync::Arc;

use gf_core::Timer;
use gf_model::{Model, ModelSignature, Snapshots, segment_with_stats};
use gf_solver::{CalculationMethod, SolverFactory};
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::pool::WorkerPool;
use crate::report::{RoundMode, RoundReport};

#[derive(Debug)]
pub struct Orchestrator {
    pool: WorkerPool,
    input: Model,
    previous: Option<Vec<ModelSignature>>,
    retry_failed_segments: bool,
}

impl Orchestrator {
    /// Start a worker pool from `config` and wrap it.
    pub fn start(factory: Arc<dyn SolverFactory>, config: &EngineConfig) -> EngineResult<Self> {
        let pool = WorkerPool::start(factory, config)?;
        Ok(Self::with_pool(pool, config))
    }

    pub fn with_pool(pool: WorkerPool, config: &EngineConfig) -> Self {
        Self {
            pool,
            input: Model::new(),
            previous: None,
            retry_failed_segments: config.retry_failed_segments,
        }
    }

    /// Replace the combined model used by the next round.
    pub fn set_input_model(&mut self, model: Model) {
        self.input = model;
    }

    /// Replace the snapshot list. Cached segments carry outputs for the old
    /// list, so a different list makes the next selective round dispatch
    /// everything.
    pub fn set_snapshots(&mut self, snapshots: Snapshots) {
        if &snapshots != self.pool.snapshots() {
            debug!(snapshots = snapshots.len(), "snapshots changed, dropping cache");
            self.previous = None;
        }
        self.pool.set_snapshots(snapshots);
    }

    /// Switch the calculation method. Cached segments were solved with the
    /// old method, so the next selective round dispatches everything.
    pub fn set_calculation_method(&mut self, method: CalculationMethod) -> EngineResult<()> {
        let previous = self.pool.method();
        self.pool.set_calculation_method(method)?;
        if method != previous {
            self.previous = None;
        }
        Ok(())
    }

    /// The combined model. Its entities carry the outputs of every segment
    /// solved so far.
    pub fn output_model(&self) -> &Model {
        &self.input
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// Number of segments cached by the last completed round.
    pub fn previous_segment_count(&self) -> Option<usize> {
        self.previous.as_ref().map(Vec::len)
    }

    pub fn force_calculate(&mut self) -> EngineResult<RoundReport> {
        self.run_round(RoundMode::Force)
    }

    pub fn selective_calculate(&mut self) -> EngineResult<RoundReport> {
        self.run_round(RoundMode::Selective)
    }

    /// Stop the worker pool. Later rounds fail with
    /// [`EngineError::PoolShutDown`].
    pub fn shutdown(&mut self) {
        self.pool.shutdown();
    }

    fn run_round(&mut self, mode: RoundMode) -> EngineResult<RoundReport> {
        if self.pool.is_shut_down() {
            return Err(EngineError::PoolShutDown);
        }
        let wall = Timer::start("round");

        let (segments, stats) = segment_with_stats(&self.input);

        let diff = Timer::start("selective preprocessing");
        let dispatch: Vec<usize> = match (mode, &self.previous) {
            (RoundMode::Selective, Some(previous)) => segments
                .iter()
                .enumerate()
                .filter(|(_, segment)| {
                    let signature = segment.signature();
                    !previous.iter().any(|old| old.matches(&signature))
                })
                .map(|(i, _)| i)
                .collect(),
            _ => (0..segments.len()).collect(),
        };
        let diff_time_s = diff.stop();
        info!(
            %mode,
            models = dispatch.len(),
            total = segments.len(),
            diff_time_s,
            "models to calculate"
        );

        let batch: Vec<Model> = dispatch.iter().map(|&i| segments[i].clone()).collect();
        let reports = self.pool.calculate(batch)?;
        for report in &reports {
            debug!(slot = report.slot, segment = dispatch[report.slot], "segment dispatched");
        }

        let failed: BTreeSet<usize> = reports
            .iter()
            .filter(|r| !r.status.is_ok())
            .map(|r| dispatch[r.slot])
            .collect();

        self.input.reset_changed_components();
        let cache: Vec<ModelSignature> = segments
            .iter()
            .enumerate()
            .filter(|(i, _)| !(self.retry_failed_segments && failed.contains(i)))
            .map(|(_, segment)| segment.signature())
            .collect();
        self.previous = Some(cache);

        let report = RoundReport {
            mode,
            segments_total: segments.len(),
            segments_skipped: segments.len() - reports.len(),
            segments: reports,
            segmentation_time_s: stats.elapsed_s,
            diff_time_s,
            wall_time_s: wall.stop(),
        };
        report.log_summary();
        Ok(report)
    }
}
