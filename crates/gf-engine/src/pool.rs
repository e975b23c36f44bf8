//! Long-lived worker slots that solve segments concurrently.
//!
//! Every slot is a thread blocked on its own start channel. A round hands
//! slot `i` the `i`-th segment, then waits on the shared completion channel
//! for exactly as many reports as segments were started, so no signal of a
//! round can leak into the next one. The pool starts with a fixed number of
//! slots and only ever grows.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{Receiver, SendError, Sender, channel};
use std::thread::{self, JoinHandle};

use gf_core::{AccumulatingTimer, TimingSummary};
use gf_model::{Model, Snapshots};
use gf_solver::{
    CONDITION_FAILED, CONDITION_NO_GENERATION, CalculationMethod, GridSolver, SolverFactory,
};
use tracing::{debug, info, warn};

use crate::config::{EngineConfig, slot_export_dir};
use crate::error::{EngineError, EngineResult};
use crate::report::{SegmentReport, SegmentStatus};

/// Work handed to one slot for one round.
struct Assignment {
    segment: Model,
    snapshots: Snapshots,
    method: CalculationMethod,
    export_dir: Option<PathBuf>,
}

enum SlotSignal {
    Start(Box<Assignment>),
    Stop,
}

struct SlotHandle {
    start_tx: Sender<SlotSignal>,
    thread: Option<JoinHandle<()>>,
}

/// Cumulative counters over the lifetime of a pool.
#[derive(Debug, Default)]
pub struct PoolStats {
    build: AccumulatingTimer,
    solve: AccumulatingTimer,
    rounds: AtomicU64,
    failures: AtomicU64,
}

impl PoolStats {
    /// Segments that reached the solver.
    pub fn segments_solved(&self) -> u64 {
        self.solve.count()
    }

    pub fn total_build_s(&self) -> f64 {
        self.build.total_seconds()
    }

    pub fn total_solve_s(&self) -> f64 {
        self.solve.total_seconds()
    }

    pub fn solve_summary(&self) -> TimingSummary {
        self.solve.summary()
    }

    pub fn rounds(&self) -> u64 {
        self.rounds.load(Ordering::Relaxed)
    }

    /// Segments reported with a status other than ok.
    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }
}

pub struct WorkerPool {
    slots: Vec<SlotHandle>,
    factory: Arc<dyn SolverFactory>,
    method: CalculationMethod,
    snapshots: Snapshots,
    export_dir: Option<PathBuf>,
    shutdown: Arc<AtomicBool>,
    done_tx: Sender<SegmentReport>,
    done_rx: Receiver<SegmentReport>,
    stats: Arc<PoolStats>,
}

impl fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerPool")
            .field("slots", &self.slots.len())
            .field("method", &self.method)
            .field("snapshots", &self.snapshots.len())
            .field("export_dir", &self.export_dir)
            .field("shut_down", &self.is_shut_down())
            .finish()
    }
}

impl WorkerPool {
    /// Start `config.initial_slots` slots bound to `config.method`.
    ///
    /// Fails if the factory cannot create a solver for the method.
    pub fn start(factory: Arc<dyn SolverFactory>, config: &EngineConfig) -> EngineResult<Self> {
        config.validate()?;
        factory.create(config.method)?;

        let (done_tx, done_rx) = channel();
        let mut pool = Self {
            slots: Vec::with_capacity(config.initial_slots),
            factory,
            method: config.method,
            snapshots: Snapshots::default(),
            export_dir: config.export_dir.clone(),
            shutdown: Arc::new(AtomicBool::new(false)),
            done_tx,
            done_rx,
            stats: Arc::new(PoolStats::default()),
        };
        for _ in 0..config.initial_slots {
            pool.add_slot()?;
        }
        debug!(slots = pool.slots.len(), method = %pool.method, "worker pool started");
        Ok(pool)
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn method(&self) -> CalculationMethod {
        self.method
    }

    pub fn snapshots(&self) -> &Snapshots {
        &self.snapshots
    }

    pub fn stats(&self) -> &PoolStats {
        &self.stats
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Switch every slot to `method`. Slots rebind their solver on their
    /// next assignment.
    pub fn set_calculation_method(&mut self, method: CalculationMethod) -> EngineResult<()> {
        if self.is_shut_down() {
            return Err(EngineError::PoolShutDown);
        }
        self.factory.create(method)?;
        if method != self.method {
            info!(from = %self.method, to = %method, "calculation method changed");
        }
        self.method = method;
        Ok(())
    }

    pub fn set_snapshots(&mut self, snapshots: Snapshots) {
        self.snapshots = snapshots;
    }

    /// Solve `segments` concurrently, one slot each, and block until all of
    /// them have reported. Reports come back in segment order.
    ///
    /// Per-segment failures are reported in the segment's status; only
    /// pool-level problems return an error.
    pub fn calculate(&mut self, segments: Vec<Model>) -> EngineResult<Vec<SegmentReport>> {
        if self.is_shut_down() {
            return Err(EngineError::PoolShutDown);
        }
        while self.slots.len() < segments.len() {
            self.add_slot()?;
        }

        let mut started = 0;
        let mut unavailable = None;
        for (slot, segment) in segments.into_iter().enumerate() {
            let assignment = Assignment {
                segment,
                snapshots: self.snapshots.clone(),
                method: self.method,
                export_dir: slot_export_dir(self.export_dir.as_deref(), slot),
            };
            if let Err(e) = self.start_slot(slot, assignment) {
                unavailable = Some(e);
                break;
            }
            started += 1;
        }

        // Drain every started slot, even when a later one was unavailable.
        let mut reports = Vec::with_capacity(started);
        for _ in 0..started {
            let report = self
                .done_rx
                .recv()
                .map_err(|_| EngineError::PoolShutDown)?;
            reports.push(report);
        }
        if let Some(err) = unavailable {
            return Err(err);
        }

        reports.sort_by_key(|r| r.slot);
        let failures = reports.iter().filter(|r| !r.status.is_ok()).count();
        self.stats.failures.fetch_add(failures as u64, Ordering::Relaxed);
        self.stats.rounds.fetch_add(1, Ordering::Relaxed);
        Ok(reports)
    }

    /// Stop every slot and wait for its thread to exit. Calling it again is
    /// a no-op.
    pub fn shutdown(&mut self) {
        if self.shutdown.swap(true, Ordering::SeqCst) {
            return;
        }
        for slot in &self.slots {
            // A slot that already exited has dropped its receiver.
            let _ = slot.start_tx.send(SlotSignal::Stop);
        }
        for (id, slot) in self.slots.iter_mut().enumerate() {
            if let Some(thread) = slot.thread.take()
                && thread.join().is_err()
            {
                warn!(slot = id, "worker slot terminated abnormally");
            }
        }
        info!(slots = self.slots.len(), "worker pool shut down");
    }

    /// Hand `assignment` to slot `id`. A slot whose thread has exited is
    /// replaced once before giving up.
    fn start_slot(&mut self, id: usize, assignment: Assignment) -> EngineResult<()> {
        let signal = SlotSignal::Start(Box::new(assignment));
        let Err(SendError(signal)) = self.slots[id].start_tx.send(signal) else {
            return Ok(());
        };

        warn!(slot = id, "worker slot exited, respawning");
        let replacement = self.spawn_slot(id)?;
        let dead = std::mem::replace(&mut self.slots[id], replacement);
        if let Some(thread) = dead.thread
            && thread.join().is_err()
        {
            warn!(slot = id, "worker slot terminated abnormally");
        }
        self.slots[id]
            .start_tx
            .send(signal)
            .map_err(|_| EngineError::SlotUnavailable { slot: id })
    }

    fn add_slot(&mut self) -> EngineResult<()> {
        let id = self.slots.len();
        let handle = self.spawn_slot(id)?;
        self.slots.push(handle);
        info!(slot = id + 1, "adding calculation worker slot");
        Ok(())
    }

    fn spawn_slot(&self, id: usize) -> EngineResult<SlotHandle> {
        let (start_tx, start_rx) = channel();
        let worker = SlotWorker {
            id,
            factory: Arc::clone(&self.factory),
            shutdown: Arc::clone(&self.shutdown),
            done_tx: self.done_tx.clone(),
            stats: Arc::clone(&self.stats),
            solver: None,
        };
        let thread = thread::Builder::new()
            .name(format!("gf-slot-{}", id + 1))
            .spawn(move || worker.run(start_rx))?;
        Ok(SlotHandle {
            start_tx,
            thread: Some(thread),
        })
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// State owned by one slot thread.
struct SlotWorker {
    id: usize,
    factory: Arc<dyn SolverFactory>,
    shutdown: Arc<AtomicBool>,
    done_tx: Sender<SegmentReport>,
    stats: Arc<PoolStats>,
    solver: Option<Box<dyn GridSolver>>,
}

impl SlotWorker {
    fn run(mut self, start_rx: Receiver<SlotSignal>) {
        while let Ok(signal) = start_rx.recv() {
            if self.shutdown.load(Ordering::SeqCst) {
                break;
            }
            let assignment = match signal {
                SlotSignal::Start(assignment) => assignment,
                SlotSignal::Stop => break,
            };

            let mut report = SegmentReport::new(self.id, assignment.segment.bus_names());
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                self.solve(&assignment, &mut report)
            }));
            let solved = match outcome {
                Ok(solved) => solved,
                Err(_) => {
                    warn!(slot = self.id, "solver panicked");
                    report.status = SegmentStatus::Warning;
                    report.condition = CONDITION_FAILED.to_string();
                    self.solver = None;
                    false
                }
            };
            if !report.status.is_ok() {
                debug!(
                    slot = self.id,
                    status = %report.status,
                    condition = %report.condition,
                    "segment not solved"
                );
            }

            if self.done_tx.send(report).is_err() {
                break;
            }
            if solved && let Some(dir) = &assignment.export_dir {
                self.export(dir);
            }
        }
        debug!(slot = self.id, "worker slot exiting");
    }

    /// Run one segment through the bound solver. Returns whether the solver
    /// ran without error and holds results worth exporting.
    fn solve(&mut self, assignment: &Assignment, report: &mut SegmentReport) -> bool {
        if !assignment.segment.has_generation() {
            report.status = SegmentStatus::Failed;
            report.condition = CONDITION_NO_GENERATION.to_string();
            return false;
        }

        let rebind = self
            .solver
            .as_ref()
            .is_none_or(|solver| solver.method() != assignment.method);
        if rebind {
            match self.factory.create(assignment.method) {
                Ok(solver) => self.solver = Some(solver),
                Err(e) => {
                    warn!(
                        slot = self.id,
                        method = %assignment.method,
                        error = %e,
                        "cannot create solver"
                    );
                    report.status = SegmentStatus::Failed;
                    report.condition = e.to_string();
                    return false;
                }
            }
        }
        let Some(solver) = self.solver.as_mut() else {
            return false;
        };

        solver.set_input_model(assignment.segment.clone());
        solver.set_snapshots(assignment.snapshots.clone());
        let outcome = solver.build_model().and_then(|()| solver.calculate());
        let ran = outcome.is_ok();
        report.build_time_s = solver.network_build_time();
        self.stats.build.record(report.build_time_s);

        match outcome {
            Ok(_) => {
                report.status = SegmentStatus::from_solver(solver.status());
                report.condition = solver.condition().to_string();
                report.solve_time_s = solver.calculation_time();
                self.stats.solve.record(report.solve_time_s);
            }
            Err(e) => {
                warn!(
                    slot = self.id,
                    method = %assignment.method,
                    error = %e,
                    "segment calculation failed"
                );
                report.status = SegmentStatus::Warning;
                report.condition = CONDITION_FAILED.to_string();
            }
        }
        debug!(
            slot = self.id,
            method = %assignment.method,
            status = %report.status,
            build_time_s = report.build_time_s,
            solve_time_s = report.solve_time_s,
            total_time_s = report.total_time_s(),
            "segment calculated"
        );
        ran
    }

    /// Best effort: errors and panics are logged and never reach the round.
    fn export(&mut self, dir: &std::path::Path) {
        let Some(solver) = self.solver.as_ref() else {
            return;
        };
        match panic::catch_unwind(AssertUnwindSafe(|| solver.export_result(dir))) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                warn!(slot = self.id, dir = %dir.display(), error = %e, "result export failed");
            }
            Err(_) => {
                warn!(slot = self.id, dir = %dir.display(), "result export panicked");
                self.solver = None;
            }
        }
    }
}
