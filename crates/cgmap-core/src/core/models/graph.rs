use super::topology::Topology;
use std::collections::{HashMap, VecDeque};

/// Undirected bond graph over particle indices.
///
/// Built once from a [`Topology`] and queried for neighbors (angle triplet
/// enumeration) and bond-path distances (1-n exclusions).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BondGraph {
    adjacency: Vec<Vec<usize>>,
    n_edges: usize,
}

impl BondGraph {
    pub fn from_topology(topology: &Topology) -> Self {
        let mut adjacency = vec![Vec::new(); topology.n_particles()];
        let mut n_edges = 0;
        for bond in topology.bonds() {
            adjacency[bond.particle1].push(bond.particle2);
            adjacency[bond.particle2].push(bond.particle1);
            n_edges += 1;
        }
        Self { adjacency, n_edges }
    }

    pub fn n_nodes(&self) -> usize {
        self.adjacency.len()
    }

    pub fn n_edges(&self) -> usize {
        self.n_edges
    }

    /// Particles directly bonded to `index`. Unknown indices have no neighbors.
    pub fn neighbors(&self, index: usize) -> &[usize] {
        self.adjacency.get(index).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Breadth-first bond-path lengths from `source`, up to `max_depth` bonds.
    ///
    /// Returns `(particle, n_bonds)` for every particle reachable within the
    /// depth limit, excluding `source` itself.
    pub fn bond_path_lengths(&self, source: usize, max_depth: usize) -> Vec<(usize, usize)> {
        if source >= self.adjacency.len() || max_depth == 0 {
            return Vec::new();
        }
        let mut depth = HashMap::from([(source, 0usize)]);
        let mut queue = VecDeque::from([(source, 0usize)]);
        let mut reached = Vec::new();

        while let Some((current, current_depth)) = queue.pop_front() {
            let next_depth = current_depth + 1;
            if next_depth > max_depth {
                continue;
            }
            for &neighbor in &self.adjacency[current] {
                if !depth.contains_key(&neighbor) {
                    depth.insert(neighbor, next_depth);
                    reached.push((neighbor, next_depth));
                    queue.push_back((neighbor, next_depth));
                }
            }
        }
        reached
    }

    /// Returns `true` if `a` and `b` are separated by at most `max_bonds` bonds.
    pub fn within_bonds(&self, a: usize, b: usize, max_bonds: usize) -> bool {
        self.bond_path_lengths(a, max_bonds)
            .iter()
            .any(|&(particle, _)| particle == b)
    }
}
