use crate::core::models::graph::BondGraph;
use crate::core::models::trajectory::Trajectory;
use crate::core::stats::rdf::{Rdf, RdfAccumulator};
use crate::core::utils::geometry;
use crate::engine::config::RdfOptions;
use crate::engine::error::EngineError;
use itertools::{Itertools, iproduct};
use std::collections::HashSet;
use tracing::{debug, instrument};

/// Unique unordered pairs between particles named `type_i` and `type_j`,
/// minus those within `exclude_up_to` bonds of each other.
///
/// Exclusions are gathered once per `type_i` particle by a bounded search
/// of the bond graph.
pub fn select_pairs<T: Trajectory>(
    trajectory: &T,
    graph: &BondGraph,
    type_i: &str,
    type_j: &str,
    exclude_up_to: Option<usize>,
) -> Vec<(usize, usize)> {
    let topology = trajectory.topology();
    let first: Vec<usize> = topology.select_by_name(type_i).collect();
    let excluded: Vec<HashSet<usize>> = first
        .iter()
        .map(|&a| match exclude_up_to {
            Some(max_bonds) => graph
                .bond_path_lengths(a, max_bonds)
                .into_iter()
                .map(|(particle, _)| particle)
                .collect(),
            None => HashSet::new(),
        })
        .collect();

    let candidates: Vec<(usize, usize)> = if type_i == type_j {
        (0..first.len())
            .tuple_combinations()
            .map(|(i, j)| (i, first[j]))
            .collect()
    } else {
        let second: Vec<usize> = topology.select_by_name(type_j).collect();
        iproduct!(0..first.len(), second).collect()
    };

    candidates
        .into_iter()
        .filter(|&(i, b)| !excluded[i].contains(&b))
        .map(|(i, b)| (first[i], b))
        .collect()
}

#[instrument(skip_all, name = "rdf_task", fields(type_i = %type_i, type_j = %type_j))]
pub fn run<T: Trajectory>(
    trajectory: &T,
    graph: &BondGraph,
    type_i: &str,
    type_j: &str,
    options: &RdfOptions,
) -> Result<Option<Rdf>, EngineError> {
    let pairs = select_pairs(trajectory, graph, type_i, type_j, options.exclude_up_to);
    if pairs.is_empty() {
        debug!("No particle pairs left after exclusions.");
        return Ok(None);
    }

    let mut accumulator = RdfAccumulator::new(options.r_range, options.bin_width, pairs.len())?;
    for frame in 0..trajectory.n_frames() {
        let box_lengths = trajectory
            .box_lengths(frame)
            .ok_or(EngineError::MissingUnitCell { frame })?;
        let positions = trajectory.positions(frame);
        let distances = pairs
            .iter()
            .map(|&(a, b)| geometry::distance(&positions[a], &positions[b], Some(&box_lengths)));
        accumulator.add_frame(distances, box_lengths.product());
    }

    debug!(
        pairs = pairs.len(),
        bins = accumulator.n_bins(),
        frames = trajectory.n_frames(),
        "Accumulated radial distribution."
    );
    Ok(Some(accumulator.finish()))
}
