use crate::core::models::graph::BondGraph;
use crate::core::models::topology::Topology;
use crate::core::models::trajectory::Trajectory;
use crate::core::stats::observable::ObservableKind;
use crate::core::utils::geometry;
use itertools::iproduct;
use std::collections::BTreeSet;
use std::fmt;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// An interaction type, identified by the particle type labels it connects.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum InteractionQuery {
    Bond([String; 2]),
    /// The second label is the vertex.
    Angle([String; 3]),
}

impl InteractionQuery {
    pub fn bond(type_i: &str, type_j: &str) -> Self {
        Self::Bond([type_i.to_string(), type_j.to_string()])
    }

    pub fn angle(type_i: &str, type_j: &str, type_k: &str) -> Self {
        Self::Angle([type_i.to_string(), type_j.to_string(), type_k.to_string()])
    }

    /// Parses a dash-separated label: `A-B` is a bond, `A-B-C` an angle.
    pub fn parse(label: &str) -> Option<Self> {
        let parts: Vec<&str> = label.split('-').map(str::trim).collect();
        if parts.iter().any(|part| part.is_empty()) {
            return None;
        }
        match parts.as_slice() {
            [i, j] => Some(Self::bond(i, j)),
            [i, j, k] => Some(Self::angle(i, j, k)),
            _ => None,
        }
    }

    pub fn kind(&self) -> ObservableKind {
        match self {
            Self::Bond(_) => ObservableKind::Distance,
            Self::Angle(_) => ObservableKind::Angle,
        }
    }

    pub fn labels(&self) -> &[String] {
        match self {
            Self::Bond(labels) => labels,
            Self::Angle(labels) => labels,
        }
    }
}

impl fmt::Display for InteractionQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.labels().join("-"))
    }
}

/// Raw samples of one observable over every matching particle group and frame.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservableSamples {
    pub query: InteractionQuery,
    pub values: Vec<f64>,
}

impl ObservableSamples {
    pub fn kind(&self) -> ObservableKind {
        self.query.kind()
    }

    pub fn label(&self) -> String {
        self.query.to_string()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Bonds whose endpoint names are exactly `{type_i, type_j}`, in either order.
pub fn bond_pairs(topology: &Topology, type_i: &str, type_j: &str) -> Vec<(usize, usize)> {
    let name = |index: usize| topology.particle(index).map(|p| p.name.as_str());
    topology
        .bonds()
        .iter()
        .filter(|bond| {
            let (a, b) = (name(bond.particle1), name(bond.particle2));
            (a == Some(type_i) && b == Some(type_j)) || (a == Some(type_j) && b == Some(type_i))
        })
        .map(|bond| (bond.particle1, bond.particle2))
        .collect()
}

/// Every `a-j-c` path with `j` named `type_j` and ordered neighbors `a ≠ c`
/// named `type_i` and `type_k`.
///
/// Labels match whole names only: `"C1"` never selects a `"C12"` bead, so a
/// type that is a substring of another does not pick up its angles.
pub fn angle_triplets(
    topology: &Topology,
    graph: &BondGraph,
    type_i: &str,
    type_j: &str,
    type_k: &str,
) -> Vec<[usize; 3]> {
    let named = |index: usize, label: &str| {
        topology
            .particle(index)
            .is_some_and(|particle| particle.name == label)
    };
    topology
        .select_by_name(type_j)
        .flat_map(|vertex| {
            let neighbors = graph.neighbors(vertex);
            iproduct!(neighbors.iter().copied(), neighbors.iter().copied())
                .filter(move |&(a, c)| a != c && named(a, type_i) && named(c, type_k))
                .map(move |(a, c)| [a, vertex, c])
        })
        .collect()
}

/// Distinct bonded type pairs, each with its labels in sorted order.
pub fn bonded_type_pairs(topology: &Topology) -> Vec<InteractionQuery> {
    topology
        .bonds()
        .iter()
        .filter_map(|bond| {
            let a = topology.particle(bond.particle1)?.name.as_str();
            let b = topology.particle(bond.particle2)?.name.as_str();
            Some(if a <= b { (a, b) } else { (b, a) })
        })
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(|(a, b)| InteractionQuery::bond(a, b))
        .collect()
}

/// Distinct angle type triplets; the outer labels of each are in sorted order.
pub fn angle_type_triplets(topology: &Topology, graph: &BondGraph) -> Vec<InteractionQuery> {
    let name = |index: usize| topology.particle(index).map(|p| p.name.as_str());
    let mut triplets = BTreeSet::new();
    for vertex in 0..topology.n_particles() {
        let Some(center) = name(vertex) else {
            continue;
        };
        let neighbors = graph.neighbors(vertex);
        for (n, &a) in neighbors.iter().enumerate() {
            for &c in &neighbors[n + 1..] {
                if let (Some(first), Some(last)) = (name(a), name(c)) {
                    let (first, last) = if first <= last {
                        (first, last)
                    } else {
                        (last, first)
                    };
                    triplets.insert((first, center, last));
                }
            }
        }
    }
    triplets
        .into_iter()
        .map(|(i, j, k)| InteractionQuery::angle(i, j, k))
        .collect()
}

/// Pair distances of every frame, frame-major. Minimum image is applied
/// when the frame is periodic.
pub fn collect_distances<T>(trajectory: &T, pairs: &[(usize, usize)]) -> Vec<f64>
where
    T: Trajectory + Sync,
{
    collect_per_frame(trajectory, |positions, box_lengths| {
        pairs
            .iter()
            .map(|&(a, b)| geometry::distance(&positions[a], &positions[b], box_lengths))
            .collect()
    })
}

/// Vertex angles of every frame in radians, frame-major. Degenerate
/// triplets are dropped.
pub fn collect_angles<T>(trajectory: &T, triplets: &[[usize; 3]]) -> Vec<f64>
where
    T: Trajectory + Sync,
{
    collect_per_frame(trajectory, |positions, box_lengths| {
        triplets
            .iter()
            .map(|&[a, b, c]| {
                geometry::angle(&positions[a], &positions[b], &positions[c], box_lengths)
            })
            .filter(|value| value.is_finite())
            .collect()
    })
}

fn collect_per_frame<T, F>(trajectory: &T, measure: F) -> Vec<f64>
where
    T: Trajectory + Sync,
    F: Fn(&[nalgebra::Point3<f64>], Option<&nalgebra::Vector3<f64>>) -> Vec<f64> + Sync,
{
    #[cfg(not(feature = "parallel"))]
    let iterator = 0..trajectory.n_frames();

    #[cfg(feature = "parallel")]
    let iterator = (0..trajectory.n_frames()).into_par_iter();

    iterator
        .map(|frame| {
            let box_lengths = trajectory.box_lengths(frame);
            measure(trajectory.positions(frame), box_lengths.as_ref())
        })
        .collect::<Vec<Vec<f64>>>()
        .concat()
}

/// Samples the observable `query` names over the whole trajectory.
pub fn sample<T>(trajectory: &T, graph: &BondGraph, query: &InteractionQuery) -> ObservableSamples
where
    T: Trajectory + Sync,
{
    let topology = trajectory.topology();
    let values = match query {
        InteractionQuery::Bond([i, j]) => {
            collect_distances(trajectory, &bond_pairs(topology, i, j))
        }
        InteractionQuery::Angle([i, j, k]) => {
            collect_angles(trajectory, &angle_triplets(topology, graph, i, j, k))
        }
    };
    ObservableSamples {
        query: query.clone(),
        values,
    }
}
