//! The demo grid shipped under `demos/`, run through the built-in solvers.

use std::path::PathBuf;
use std::sync::Arc;

use gf_engine::{EngineConfig, Orchestrator, SegmentStatus};
use gf_model::{Branch, Entity, load_grid_yaml};
use gf_solver::{BuiltinSolverFactory, CONDITION_NO_GENERATION};

fn demos_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../demos")
}

fn engine(config: &EngineConfig) -> Orchestrator {
    let grid = load_grid_yaml(&demos_dir().join("two_islands.yaml")).unwrap();
    let mut engine = Orchestrator::start(Arc::new(BuiltinSolverFactory), config).unwrap();
    engine.set_snapshots(grid.snapshots());
    engine.set_input_model(grid.to_model().unwrap());
    engine
}

#[test]
fn demo_config_loads() {
    let config = EngineConfig::from_yaml_file(&demos_dir().join("engine.yaml")).unwrap();
    assert_eq!(config.method.as_str(), "lopf");
    assert_eq!(config.initial_slots, 5);
    assert!(config.export_dir.is_none());
}

#[test]
fn dispatch_covers_both_feeders_and_leaves_the_cabin_dark() {
    let config = EngineConfig::from_yaml_file(&demos_dir().join("engine.yaml")).unwrap();
    let mut engine = engine(&config);

    let report = engine.selective_calculate().unwrap();
    assert_eq!(report.segments_total, 3);
    let statuses: Vec<SegmentStatus> = report.segments.iter().map(|s| s.status).collect();
    assert_eq!(
        statuses,
        vec![SegmentStatus::Ok, SegmentStatus::Ok, SegmentStatus::Failed]
    );
    assert_eq!(report.segments[2].bus_names, vec!["cabin".to_string()]);
    assert_eq!(report.segments[2].condition, CONDITION_NO_GENERATION);

    let model = engine.output_model();
    for snapshot in 0..3 {
        assert!((model.total_generation(snapshot) - 34.1).abs() < 1e-6);
        assert!((model.total_load(snapshot) - 34.1).abs() < 1e-6);
    }
}

#[test]
fn closing_the_tie_merges_the_feeders() {
    let mut engine = engine(&EngineConfig::default());
    engine.selective_calculate().unwrap();

    let tie = engine
        .output_model()
        .lines()
        .iter()
        .find(|line| line.read().name() == "tie")
        .cloned()
        .unwrap();
    tie.write().set_active(true);

    let report = engine.selective_calculate().unwrap();
    assert_eq!(report.segments_total, 2);
    assert_eq!(report.dispatched(), 1);
    assert_eq!(report.segments[0].bus_names.len(), 6);
    assert_eq!(report.segments[0].status, SegmentStatus::Ok);
    assert!(tie.read().outputs().value(0).is_some());
}
