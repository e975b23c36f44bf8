//! Segmentation: split a combined model into independent connected sub-models.
//!
//! Only active lines and transformers connect buses. Every bus (active or
//! not) ends up in exactly one segment. Segments are ordered by the input
//! position of their first bus, and within a segment every entity keeps its
//! input order, so the result is a deterministic function of the input.
//!
//! Edges are placed in the segment of their `bus0`; both endpoints of an
//! active edge always share a segment. Injections are placed in the segment
//! of their bus when active; inactive edges and injections are left out.

use std::collections::HashSet;

use gf_core::Timer;
use tracing::debug;

use crate::entity::{Branch, Injection, Shared};
use crate::error::{ModelError, ModelResult};
use crate::indexing::{Adjacency, BusIndex};
use crate::model::Model;

/// Telemetry of one segmentation call.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SegmentationStats {
    pub segments: usize,
    /// Buses popped from the flood-fill frontier.
    pub iterations: usize,
    pub elapsed_s: f64,
}

/// Partition `model` into connected segments.
pub fn segment(model: &Model) -> Vec<Model> {
    segment_with_stats(model).0
}

pub fn segment_with_stats(model: &Model) -> (Vec<Model>, SegmentationStats) {
    let timer = Timer::start("segmentation");

    let index = BusIndex::from_model(model);
    let adjacency = Adjacency::active_edges(model, &index);
    let (assignment, segment_count, iterations) = flood_fill(&adjacency, index.len());

    let mut segments = vec![Model::new(); segment_count];
    for (bus, &seg) in model.buses.iter().zip(&assignment) {
        segments[seg].buses.push(bus.clone());
    }

    place_branches(&model.lines, &index, &assignment, &mut segments, |m| &mut m.lines);
    place_branches(&model.transformers, &index, &assignment, &mut segments, |m| {
        &mut m.transformers
    });
    place_injections(&model.generators, &index, &assignment, &mut segments, |m| {
        &mut m.generators
    });
    place_injections(&model.loads, &index, &assignment, &mut segments, |m| &mut m.loads);
    place_injections(&model.storage_units, &index, &assignment, &mut segments, |m| {
        &mut m.storage_units
    });

    let stats = SegmentationStats {
        segments: segment_count,
        iterations,
        elapsed_s: timer.stop(),
    };
    debug!(
        segments = stats.segments,
        iterations = stats.iterations,
        elapsed_s = stats.elapsed_s,
        "model segmentation finished"
    );
    (segments, stats)
}

/// Assign a segment id to every bus position. Returns (assignment, count, iterations).
fn flood_fill(adjacency: &Adjacency, bus_count: usize) -> (Vec<usize>, usize, usize) {
    let mut assignment: Vec<Option<usize>> = vec![None; bus_count];
    let mut stack = Vec::new();
    let mut next_id = 0;
    let mut iterations = 0;

    for start in 0..bus_count {
        if assignment[start].is_some() {
            continue;
        }
        let id = next_id;
        next_id += 1;
        assignment[start] = Some(id);
        stack.push(start);

        while let Some(bus) = stack.pop() {
            iterations += 1;
            for &next in adjacency.neighbors(bus) {
                if assignment[next].is_none() {
                    assignment[next] = Some(id);
                    stack.push(next);
                }
            }
        }
    }

    let assignment = assignment.into_iter().map(|seg| seg.unwrap_or(0)).collect();
    (assignment, next_id, iterations)
}

fn place_branches<T: Branch>(
    edges: &[Shared<T>],
    index: &BusIndex,
    assignment: &[usize],
    segments: &mut [Model],
    target: impl Fn(&mut Model) -> &mut Vec<Shared<T>>,
) {
    for edge in edges {
        let seg = {
            let guard = edge.read();
            if !guard.is_active() {
                continue;
            }
            index.position(guard.bus0()).map(|pos| assignment[pos])
        };
        if let Some(seg) = seg {
            target(&mut segments[seg]).push(edge.clone());
        }
    }
}

fn place_injections<T: Injection>(
    injections: &[Shared<T>],
    index: &BusIndex,
    assignment: &[usize],
    segments: &mut [Model],
    target: impl Fn(&mut Model) -> &mut Vec<Shared<T>>,
) {
    for injection in injections {
        let seg = {
            let guard = injection.read();
            if !guard.is_active() {
                continue;
            }
            index.position(guard.bus0()).map(|pos| assignment[pos])
        };
        if let Some(seg) = seg {
            target(&mut segments[seg]).push(injection.clone());
        }
    }
}

/// Check that `segments` partition the buses of `model`: every bus appears
/// in exactly one segment and no segment holds a foreign bus.
pub fn verify_partition(model: &Model, segments: &[Model]) -> ModelResult<()> {
    let expected: HashSet<String> = model.bus_names().into_iter().collect();
    let mut seen = HashSet::with_capacity(expected.len());

    for (i, segment) in segments.iter().enumerate() {
        if segment.buses().is_empty() {
            return Err(ModelError::Partition {
                what: format!("segment {i} has no buses"),
            });
        }
        for name in segment.bus_names() {
            if !expected.contains(&name) {
                return Err(ModelError::Partition {
                    what: format!("segment {i} holds unknown bus {name}"),
                });
            }
            if !seen.insert(name.clone()) {
                return Err(ModelError::Partition {
                    what: format!("bus {name} appears in more than one segment"),
                });
            }
        }
    }

    if seen.len() != expected.len() {
        let mut missing: Vec<&String> = expected.difference(&seen).collect();
        missing.sort();
        return Err(ModelError::Partition {
            what: format!("buses missing from every segment: {missing:?}"),
        });
    }
    Ok(())
}
