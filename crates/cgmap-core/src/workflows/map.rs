use crate::core::mapping::assembler::{CgTopology, build_cg_topology};
use crate::core::mapping::coordinates::{SolventClusterer, average_box_lengths, map_trajectory};
use crate::core::mapping::definition::MoleculeMapping;
use crate::core::models::trajectory::{InMemoryTrajectory, Trajectory};
use crate::engine::config::MappingOptions;
use crate::engine::error::EngineError;
use nalgebra::Vector3;
use std::collections::HashMap;
use tracing::{info, instrument};

/// A coarse-grained system: bead bookkeeping, the mapped trajectory and its
/// mean periodic box.
#[derive(Debug, Clone)]
pub struct MappedSystem {
    pub cg: CgTopology,
    pub trajectory: InMemoryTrajectory,
    pub average_box_lengths: Option<Vector3<f64>>,
}

#[instrument(skip_all, name = "mapping_workflow")]
pub fn run<T>(
    trajectory: &T,
    mappings: &HashMap<String, MoleculeMapping>,
    options: &MappingOptions,
    clusterer: Option<&dyn SolventClusterer>,
) -> Result<MappedSystem, EngineError>
where
    T: Trajectory + Sync,
{
    let cg = build_cg_topology(trajectory.topology(), mappings, options.waters_per_bead)?;
    info!(
        beads = cg.n_beads(),
        water_beads = cg.n_water_beads(),
        frames = trajectory.n_frames(),
        "Mapping trajectory onto coarse-grained beads."
    );
    let mapped = map_trajectory(trajectory, &cg, clusterer)?;
    Ok(MappedSystem {
        cg,
        trajectory: mapped,
        average_box_lengths: average_box_lengths(trajectory),
    })
}
