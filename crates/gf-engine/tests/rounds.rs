//! Recalculation rounds driven through a scripted solver.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use gf_engine::{EngineConfig, EngineError, Orchestrator, RoundReport, SegmentStatus};
use gf_model::{
    Bus, Entity, Generator, Injection, Line, Load, Model, ModelBuilder, Shared, Snapshots,
};
use gf_solver::{
    BuiltinSolverFactory, CONDITION_FAILED, CONDITION_NO_GENERATION, CONDITION_SUCCESS,
    CalculationMethod, GridSolver, STATUS_OK, SolverError, SolverFactory, SolverResult,
};
use parking_lot::Mutex;
use proptest::prelude::*;

/// Records every segment the solvers were asked to calculate.
#[derive(Default)]
struct Script {
    calls: AtomicUsize,
    seen: Mutex<Vec<Vec<String>>>,
}

impl Script {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

/// Panics on buses named `panic_*`, errors on buses named `broken_*`.
/// Export panics on buses named `export_panic_*`.
struct ScriptedSolver {
    method: CalculationMethod,
    script: Arc<Script>,
    input: Model,
    status: String,
    condition: String,
}

impl GridSolver for ScriptedSolver {
    fn method(&self) -> CalculationMethod {
        self.method
    }

    fn set_input_model(&mut self, model: Model) {
        self.input = model;
    }

    fn set_snapshots(&mut self, _snapshots: Snapshots) {}

    fn build_model(&mut self) -> SolverResult<()> {
        Ok(())
    }

    fn calculate(&mut self) -> SolverResult<bool> {
        let names = self.input.bus_names();
        self.script.calls.fetch_add(1, Ordering::SeqCst);
        self.script.seen.lock().push(names.clone());
        if names.iter().any(|n| n.starts_with("panic_")) {
            panic!("scripted panic");
        }
        if names.iter().any(|n| n.starts_with("broken_")) {
            return Err(SolverError::Build {
                what: "scripted failure".to_string(),
            });
        }
        self.status = STATUS_OK.to_string();
        self.condition = CONDITION_SUCCESS.to_string();
        Ok(true)
    }

    fn status(&self) -> &str {
        &self.status
    }

    fn condition(&self) -> &str {
        &self.condition
    }

    fn calculation_time(&self) -> f64 {
        0.0
    }

    fn network_build_time(&self) -> f64 {
        0.0
    }

    fn export_result(&self, _dir: &Path) -> SolverResult<()> {
        if self.input.bus_names().iter().any(|n| n.starts_with("export_panic_")) {
            panic!("scripted export panic");
        }
        Ok(())
    }
}

struct ScriptedFactory {
    script: Arc<Script>,
}

impl SolverFactory for ScriptedFactory {
    fn create(&self, method: CalculationMethod) -> SolverResult<Box<dyn GridSolver>> {
        if method == CalculationMethod::Pf {
            return Err(SolverError::Unsupported { method });
        }
        Ok(Box::new(ScriptedSolver {
            method,
            script: Arc::clone(&self.script),
            input: Model::new(),
            status: String::new(),
            condition: String::new(),
        }))
    }
}

struct Grid {
    model: Model,
    loads: Vec<Shared<Load>>,
}

/// One bus per name, each with a generator (unless `dark_*`) and a load.
fn islands(names: &[String]) -> Grid {
    let mut builder = ModelBuilder::new();
    let mut loads = Vec::new();
    for name in names {
        builder.add_bus(Bus::new(name.clone(), 20.0));
        if !name.starts_with("dark_") {
            let generator = Generator::new(format!("{name}_g"), name.clone()).with_p_nom(10.0);
            builder.add_generator(generator);
        }
        let load = Load::new(format!("{name}_d"), name.clone()).with_p_set(1.0);
        loads.push(builder.add_load(load));
    }
    Grid {
        model: builder.build().unwrap(),
        loads,
    }
}

fn names(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("island_{i}")).collect()
}

fn scripted(config: &EngineConfig) -> (Orchestrator, Arc<Script>) {
    let script = Arc::new(Script::default());
    let factory = ScriptedFactory {
        script: Arc::clone(&script),
    };
    (Orchestrator::start(Arc::new(factory), config).unwrap(), script)
}

fn dispatched_buses(report: &RoundReport) -> Vec<Vec<String>> {
    report.segments.iter().map(|s| s.bus_names.clone()).collect()
}

#[test]
fn unchanged_grid_dispatches_nothing_the_second_time() {
    let grid = islands(&names(3));
    let (mut engine, script) = scripted(&EngineConfig::default());
    engine.set_input_model(grid.model.clone());

    let first = engine.selective_calculate().unwrap();
    assert_eq!(first.dispatched(), 3);
    assert_eq!(first.segments_skipped, 0);

    let second = engine.selective_calculate().unwrap();
    assert_eq!(second.dispatched(), 0);
    assert_eq!(second.segments_skipped, 3);
    assert_eq!(script.calls(), 3);
    assert_eq!(engine.previous_segment_count(), Some(3));
}

#[test]
fn only_the_touched_island_is_recomputed() {
    let grid = islands(&names(4));
    let (mut engine, script) = scripted(&EngineConfig::default());
    engine.set_input_model(grid.model.clone());
    engine.selective_calculate().unwrap();

    grid.loads[2].write().set_p_set(3.0);
    let report = engine.selective_calculate().unwrap();
    assert_eq!(dispatched_buses(&report), vec![vec!["island_2".to_string()]]);
    assert_eq!(report.segments[0].slot, 0);
    assert_eq!(script.calls(), 5);
    assert_eq!(
        script.seen.lock().last(),
        Some(&vec!["island_2".to_string()])
    );
}

#[test]
fn splitting_a_segment_recomputes_both_halves() {
    let mut builder = ModelBuilder::new();
    builder.add_bus(Bus::new("west", 20.0));
    builder.add_bus(Bus::new("east", 20.0));
    builder.add_bus(Bus::new("far", 20.0));
    let tie = builder.add_line(Line::new("tie", "west", "east"));
    builder.add_generator(Generator::new("g_west", "west").with_p_nom(5.0));
    builder.add_generator(Generator::new("g_east", "east").with_p_nom(5.0));
    builder.add_generator(Generator::new("g_far", "far").with_p_nom(5.0));
    let (mut engine, _) = scripted(&EngineConfig::default());
    engine.set_input_model(builder.build().unwrap());
    assert_eq!(engine.selective_calculate().unwrap().dispatched(), 2);

    tie.write().set_active(false);
    let report = engine.selective_calculate().unwrap();
    assert_eq!(report.segments_total, 3);
    assert_eq!(
        dispatched_buses(&report),
        vec![vec!["west".to_string()], vec!["east".to_string()]]
    );
}

#[test]
fn forced_rounds_are_repeatable() {
    let grid = islands(&["island_0".to_string(), "dark_1".to_string()]);
    let (mut engine, script) = scripted(&EngineConfig::default());
    engine.set_input_model(grid.model.clone());

    let first = engine.force_calculate().unwrap();
    let second = engine.force_calculate().unwrap();
    assert_eq!(dispatched_buses(&first), dispatched_buses(&second));
    let statuses = |r: &RoundReport| r.segments.iter().map(|s| s.status).collect::<Vec<_>>();
    assert_eq!(statuses(&first), statuses(&second));
    assert_eq!(
        statuses(&first),
        vec![SegmentStatus::Ok, SegmentStatus::Failed]
    );
    assert_eq!(script.calls(), 2);
}

#[test]
fn pool_grows_on_demand_and_never_shrinks() {
    let (mut engine, _) = scripted(&EngineConfig::default());
    assert_eq!(engine.pool().slot_count(), 5);

    engine.set_input_model(islands(&names(7)).model);
    let report = engine.force_calculate().unwrap();
    assert_eq!(report.dispatched(), 7);
    assert!(report.all_ok());
    assert_eq!(engine.pool().slot_count(), 7);

    engine.set_input_model(islands(&names(2)).model);
    engine.force_calculate().unwrap();
    assert_eq!(engine.pool().slot_count(), 7);
}

#[test]
fn segment_without_generation_never_reaches_the_solver() {
    let grid = islands(&["dark_0".to_string()]);
    let (mut engine, script) = scripted(&EngineConfig::default());
    engine.set_input_model(grid.model.clone());

    let report = engine.force_calculate().unwrap();
    assert_eq!(report.segments[0].status, SegmentStatus::Failed);
    assert_eq!(report.segments[0].condition, CONDITION_NO_GENERATION);
    assert_eq!(script.calls(), 0);
}

#[test]
fn solver_panic_is_contained_to_its_segment() {
    let names = ["island_0", "panic_1", "island_2"].map(String::from);
    let grid = islands(&names);
    let (mut engine, script) = scripted(&EngineConfig::default());
    engine.set_input_model(grid.model.clone());

    let report = engine.force_calculate().unwrap();
    let statuses: Vec<SegmentStatus> = report.segments.iter().map(|s| s.status).collect();
    assert_eq!(
        statuses,
        vec![SegmentStatus::Ok, SegmentStatus::Warning, SegmentStatus::Ok]
    );
    assert_eq!(report.segments[1].condition, CONDITION_FAILED);

    // The slot survives and keeps serving rounds.
    engine.force_calculate().unwrap();
    assert_eq!(script.calls(), 6);
}

#[test]
fn solver_error_is_reported_as_warning() {
    let grid = islands(&["broken_0".to_string(), "island_1".to_string()]);
    let (mut engine, _) = scripted(&EngineConfig::default());
    engine.set_input_model(grid.model.clone());

    let report = engine.force_calculate().unwrap();
    assert_eq!(report.segments[0].status, SegmentStatus::Warning);
    assert_eq!(report.segments[0].condition, CONDITION_FAILED);
    assert_eq!(report.segments[1].status, SegmentStatus::Ok);
    assert_eq!(report.failed_segments().count(), 1);
}

#[test]
fn failed_segments_are_cached_unless_retry_is_enabled() {
    let names = vec!["broken_0".to_string(), "island_1".to_string()];

    let (mut cached, _) = scripted(&EngineConfig::default());
    cached.set_input_model(islands(&names).model);
    cached.selective_calculate().unwrap();
    assert_eq!(cached.selective_calculate().unwrap().dispatched(), 0);

    let config = EngineConfig {
        retry_failed_segments: true,
        ..EngineConfig::default()
    };
    let (mut retrying, _) = scripted(&config);
    retrying.set_input_model(islands(&names).model);
    retrying.selective_calculate().unwrap();
    let report = retrying.selective_calculate().unwrap();
    assert_eq!(dispatched_buses(&report), vec![vec!["broken_0".to_string()]]);
}

#[test]
fn unsupported_method_is_rejected() {
    let (mut engine, _) = scripted(&EngineConfig::default());
    let err = engine
        .set_calculation_method(CalculationMethod::Pf)
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Solver(SolverError::Unsupported { .. })
    ));
    assert_eq!(engine.pool().method(), CalculationMethod::Lpf);
}

#[test]
fn method_switch_rebinds_solvers() {
    let grid = islands(&names(1));
    let (mut engine, script) = scripted(&EngineConfig::default());
    engine.set_input_model(grid.model.clone());
    engine.force_calculate().unwrap();

    engine.set_calculation_method(CalculationMethod::Lopf).unwrap();
    assert_eq!(engine.pool().method(), CalculationMethod::Lopf);
    let report = engine.selective_calculate().unwrap();
    assert_eq!(report.dispatched(), 1);
    assert_eq!(script.calls(), 2);
}

#[test]
fn shutdown_stops_all_rounds() {
    let grid = islands(&names(2));
    let (mut engine, script) = scripted(&EngineConfig::default());
    engine.set_input_model(grid.model.clone());
    engine.force_calculate().unwrap();

    engine.shutdown();
    engine.shutdown();
    assert!(engine.pool().is_shut_down());
    assert!(matches!(
        engine.force_calculate(),
        Err(EngineError::PoolShutDown)
    ));
    assert!(matches!(
        engine.selective_calculate(),
        Err(EngineError::PoolShutDown)
    ));
    assert_eq!(script.calls(), 2);
}

#[test]
fn builtin_solvers_write_outputs_and_export() {
    let dir = std::env::temp_dir().join(format!("gf_engine_export_{}", std::process::id()));
    let config = EngineConfig {
        export_dir: Some(dir.clone()),
        ..EngineConfig::default()
    };
    let mut builder = ModelBuilder::new();
    builder.add_bus(Bus::new("a", 20.0));
    builder.add_bus(Bus::new("b", 20.0));
    builder.add_line(Line::new("ab", "a", "b").with_impedance(0.0, 0.1));
    let generator = builder.add_generator(Generator::new("g", "a").with_p_nom(10.0));
    builder.add_load(Load::new("d", "b").with_p_set(4.0));

    let mut engine = Orchestrator::start(Arc::new(BuiltinSolverFactory), &config).unwrap();
    engine.set_snapshots(Snapshots::steps(3).unwrap());
    engine.set_input_model(builder.build().unwrap());
    let report = engine.force_calculate().unwrap();
    assert!(report.all_ok());
    assert_eq!(generator.read().outputs().active_power(), &[4.0, 4.0, 4.0]);
    assert!((engine.output_model().total_generation(2) - 4.0).abs() < 1e-9);

    // Exports run after completion; joining the slots waits for them.
    engine.shutdown();
    assert!(dir.join("model_1").join("results.json").exists());
    assert!(!generator.read().is_changed());
    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn export_panic_leaves_the_slot_usable() {
    let dir = std::env::temp_dir().join(format!("gf_engine_export_panic_{}", std::process::id()));
    let config = EngineConfig {
        export_dir: Some(dir.clone()),
        ..EngineConfig::default()
    };
    let (mut engine, script) = scripted(&config);
    let grid = islands(&["export_panic_a".to_string()]);
    engine.set_input_model(grid.model);

    for _ in 0..3 {
        let report = engine.force_calculate().unwrap();
        assert_eq!(report.dispatched(), 1);
        assert!(report.all_ok());
    }
    assert_eq!(script.calls(), 3);
    assert_eq!(engine.pool().slot_count(), 5);
    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn segment_moving_between_slots_uses_current_parameters() {
    let mut builder = ModelBuilder::new();
    let mut loads = Vec::new();
    let mut generators = Vec::new();
    for name in ["w", "x"] {
        builder.add_bus(Bus::new(name, 20.0));
        let generator = Generator::new(format!("g{name}"), name).with_p_nom(10.0);
        generators.push(builder.add_generator(generator));
        loads.push(builder.add_load(Load::new(format!("d{name}"), name).with_p_set(1.0)));
    }
    let (dw, dx, gx) = (&loads[0], &loads[1], &generators[1]);

    let mut engine = Orchestrator::start(Arc::new(BuiltinSolverFactory), &EngineConfig::default())
        .unwrap();
    engine.set_input_model(builder.build().unwrap());

    // x is built on slot 1, then solved on slot 0 after its load moves.
    assert_eq!(engine.selective_calculate().unwrap().dispatched(), 2);
    dx.write().set_p_set(3.0);
    let report = engine.selective_calculate().unwrap();
    assert_eq!(dispatched_buses(&report), vec![vec!["x".to_string()]]);
    assert_eq!(report.segments[0].slot, 0);

    // Back on slot 1, whose network still holds the old load.
    dw.write().set_p_set(2.0);
    gx.write().set_p_set(0.5);
    let report = engine.selective_calculate().unwrap();
    assert_eq!(report.dispatched(), 2);
    assert_eq!(report.segments[1].bus_names, vec!["x".to_string()]);
    assert!(report.all_ok());
    assert_eq!(dx.read().outputs().active_power(), &[3.0]);
    assert_eq!(gx.read().outputs().active_power(), &[3.0]);
}

#[test]
fn snapshot_change_recomputes_every_segment() {
    let mut builder = ModelBuilder::new();
    builder.add_bus(Bus::new("a", 20.0));
    let generator = builder.add_generator(Generator::new("g", "a").with_p_nom(10.0));
    builder.add_load(Load::new("d", "a").with_p_set(1.0));

    let mut engine = Orchestrator::start(Arc::new(BuiltinSolverFactory), &EngineConfig::default())
        .unwrap();
    engine.set_input_model(builder.build().unwrap());
    assert_eq!(engine.selective_calculate().unwrap().dispatched(), 1);

    engine.set_snapshots(Snapshots::steps(1).unwrap());
    assert_eq!(engine.selective_calculate().unwrap().dispatched(), 0);

    engine.set_snapshots(Snapshots::steps(3).unwrap());
    assert_eq!(engine.previous_segment_count(), None);
    assert_eq!(engine.selective_calculate().unwrap().dispatched(), 1);
    assert_eq!(generator.read().outputs().active_power(), &[1.0, 1.0, 1.0]);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn selective_rounds_follow_the_touched_islands(
        count in 1usize..9,
        touched in prop::collection::btree_set(0usize..9, 0..4),
    ) {
        let grid = islands(&names(count));
        let (mut engine, _) = scripted(&EngineConfig::default());
        engine.set_input_model(grid.model.clone());
        engine.selective_calculate().unwrap();

        let touched: Vec<usize> = touched.into_iter().filter(|&i| i < count).collect();
        for &i in &touched {
            grid.loads[i].write().set_p_set(2.0);
        }
        let report = engine.selective_calculate().unwrap();
        let expected: Vec<Vec<String>> =
            touched.iter().map(|&i| vec![format!("island_{i}")]).collect();
        prop_assert_eq!(dispatched_buses(&report), expected);
        prop_assert_eq!(report.segments_skipped, count - touched.len());
    }
}
