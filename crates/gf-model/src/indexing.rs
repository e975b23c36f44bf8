//! Stable bus indexing and active-edge adjacency.
//!
//! Edges and injections refer to buses by name. [`BusIndex`] resolves names
//! to contiguous positions (input order) once per call, and [`Adjacency`]
//! stores the undirected active-edge neighbourhood of every bus in CSR form
//! so a flood fill visits each edge a constant number of times.

use std::collections::HashMap;

use crate::entity::{Branch, Shared};
use crate::model::Model;

/// Bus name to position lookup, in model order.
#[derive(Debug, Clone, Default)]
pub struct BusIndex {
    names: Vec<String>,
    positions: HashMap<String, usize>,
}

impl BusIndex {
    pub fn from_model(model: &Model) -> Self {
        let names: Vec<String> = model.bus_names();
        let positions = names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();
        Self { names, positions }
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }

    pub fn name(&self, position: usize) -> Option<&str> {
        self.names.get(position).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Undirected adjacency over active lines and transformers.
#[derive(Debug, Clone)]
pub struct Adjacency {
    offsets: Vec<usize>,
    neighbors: Vec<usize>,
}

impl Adjacency {
    /// Build from every active edge whose endpoints both resolve in `index`.
    pub fn active_edges(model: &Model, index: &BusIndex) -> Self {
        let mut pairs = Vec::with_capacity(model.edge_count());
        collect_pairs(model.lines(), index, &mut pairs);
        collect_pairs(model.transformers(), index, &mut pairs);

        let mut degree = vec![0usize; index.len()];
        for &(a, b) in &pairs {
            degree[a] += 1;
            degree[b] += 1;
        }

        let mut offsets = Vec::with_capacity(index.len() + 1);
        offsets.push(0);
        for d in &degree {
            let last = offsets.last().copied().unwrap_or(0);
            offsets.push(last + d);
        }

        let mut fill = offsets.clone();
        let mut neighbors = vec![0usize; offsets.last().copied().unwrap_or(0)];
        for &(a, b) in &pairs {
            neighbors[fill[a]] = b;
            fill[a] += 1;
            neighbors[fill[b]] = a;
            fill[b] += 1;
        }

        Self { offsets, neighbors }
    }

    pub fn neighbors(&self, position: usize) -> &[usize] {
        match (self.offsets.get(position), self.offsets.get(position + 1)) {
            (Some(&start), Some(&end)) => &self.neighbors[start..end],
            _ => &[],
        }
    }

    pub fn bus_count(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }
}

fn collect_pairs<T: Branch>(edges: &[Shared<T>], index: &BusIndex, out: &mut Vec<(usize, usize)>) {
    for edge in edges {
        let edge = edge.read();
        if !edge.is_active() {
            continue;
        }
        match (index.position(edge.bus0()), index.position(edge.bus1())) {
            (Some(a), Some(b)) => out.push((a, b)),
            _ => tracing::warn!(
                edge = edge.name(),
                bus0 = edge.bus0(),
                bus1 = edge.bus1(),
                "{} refers to an unknown bus, ignoring it for connectivity",
                edge.kind()
            ),
        }
    }
}
