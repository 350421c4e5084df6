use super::definition::{MappingValidationError, MoleculeMapping};
use crate::core::models::topology::Topology;
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

pub const WATER_BEAD_TYPE: &str = "W";
pub const WATER_BEAD_RESIDUE: &str = "HOH";
pub const DEFAULT_WATERS_PER_BEAD: usize = 4;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MappingError {
    #[error("No mapping for residue '{name}' (residue {index})")]
    UnmappedResidue { name: String, index: usize },
    #[error("Mapping '{mapping}' refers to atom {atom}, but residue {residue} has only {size} atoms")]
    AtomOutOfRange {
        mapping: String,
        residue: usize,
        atom: usize,
        size: usize,
    },
    #[error("Mapping '{mapping}' is invalid: {kind}")]
    InvalidMapping {
        mapping: String,
        kind: MappingValidationError,
    },
    #[error("Waters per bead must be positive")]
    ZeroWatersPerBead,
    #[error("Topology has water beads but no solvent clusterer was supplied")]
    MissingSolventClusterer,
    #[error("Solvent clusterer returned {found} clusters, expected {expected}")]
    ClusterCountMismatch { expected: usize, found: usize },
    #[error("Water cluster is empty in frame {frame}")]
    EmptyCluster { frame: usize },
    #[error("Frame {frame} is inconsistent with the bead topology")]
    FrameMismatch { frame: usize },
}

/// A coarse-grained bead and the all-atom particles it stands for.
#[derive(Debug, Clone, PartialEq)]
pub struct Bead {
    /// Position of the bead within its molecule mapping.
    pub index: usize,
    pub bead_type: String,
    pub residue_name: String,
    /// Global all-atom indices; empty for water beads, which are placed by clustering.
    pub atom_indices: Vec<usize>,
}

impl Bead {
    pub fn is_water(&self) -> bool {
        self.atom_indices.is_empty() && self.residue_name == WATER_BEAD_RESIDUE
    }
}

/// Beads in coarse-grained particle order, together with the CG topology they form.
#[derive(Debug, Clone, PartialEq)]
pub struct CgTopology {
    pub beads: Vec<Bead>,
    pub topology: Topology,
    /// Number of all-atom water residues represented by each water bead.
    pub waters_per_bead: usize,
}

impl CgTopology {
    pub fn n_beads(&self) -> usize {
        self.beads.len()
    }

    pub fn water_beads(&self) -> impl Iterator<Item = usize> + '_ {
        self.beads
            .iter()
            .enumerate()
            .filter(|(_, bead)| bead.is_water())
            .map(|(index, _)| index)
    }

    pub fn n_water_beads(&self) -> usize {
        self.water_beads().count()
    }
}

/// Builds the coarse-grained topology of an all-atom topology.
///
/// Residues are visited in order. A non-water residue is replaced by the
/// beads of the mapping registered under its name, with the mapping's bonds.
/// Every `waters_per_bead`-th water residue contributes one `W` bead in its
/// own `HOH` residue. Bead masses are the summed masses of their atoms; water
/// beads carry the mass of `waters_per_bead` water residues.
///
/// Mappings are checked before use, so hand-built ones must list their beads
/// in index order; [`MoleculeMapping::validated`] arranges that.
pub fn build_cg_topology(
    aa: &Topology,
    mappings: &HashMap<String, MoleculeMapping>,
    waters_per_bead: usize,
) -> Result<CgTopology, MappingError> {
    if waters_per_bead == 0 {
        return Err(MappingError::ZeroWatersPerBead);
    }

    let mut names: Vec<&String> = mappings.keys().collect();
    names.sort();
    for name in names {
        mappings[name]
            .check()
            .map_err(|kind| MappingError::InvalidMapping {
                mapping: name.clone(),
                kind,
            })?;
    }

    let mut topology = Topology::new();
    let mut beads = Vec::new();
    let mut water_counter = 0usize;
    let mut pending_water_mass = 0.0;

    for (residue_index, residue) in aa.residues().iter().enumerate() {
        let residue_mass: f64 = residue
            .particles()
            .iter()
            .filter_map(|&p| aa.particle(p))
            .map(|p| p.mass)
            .sum();

        if residue.is_water {
            water_counter += 1;
            pending_water_mass += residue_mass;
            if water_counter % waters_per_bead == 0 {
                let cg_residue = topology.add_residue(WATER_BEAD_RESIDUE);
                topology
                    .add_particle(cg_residue, WATER_BEAD_TYPE, pending_water_mass)
                    .ok_or(MappingError::UnmappedResidue {
                        name: residue.name.clone(),
                        index: residue_index,
                    })?;
                beads.push(Bead {
                    index: 0,
                    bead_type: WATER_BEAD_TYPE.to_string(),
                    residue_name: WATER_BEAD_RESIDUE.to_string(),
                    atom_indices: Vec::new(),
                });
                pending_water_mass = 0.0;
            }
            continue;
        }

        let mapping = mappings
            .get(&residue.name)
            .ok_or_else(|| MappingError::UnmappedResidue {
                name: residue.name.clone(),
                index: residue_index,
            })?;

        let cg_residue = topology.add_residue(&residue.name);
        let mut cg_particles = Vec::with_capacity(mapping.beads.len());
        for definition in &mapping.beads {
            let atom_indices = definition
                .atom_indices
                .iter()
                .map(|&local| {
                    residue.particle(local).ok_or(MappingError::AtomOutOfRange {
                        mapping: mapping.name.clone(),
                        residue: residue_index,
                        atom: local,
                        size: residue.particles().len(),
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            let mass = atom_indices
                .iter()
                .filter_map(|&i| aa.particle(i))
                .map(|p| p.mass)
                .sum();

            let particle = topology
                .add_particle(cg_residue, &definition.bead_type, mass)
                .ok_or_else(|| MappingError::UnmappedResidue {
                    name: residue.name.clone(),
                    index: residue_index,
                })?;
            cg_particles.push(particle);
            beads.push(Bead {
                index: definition.index,
                bead_type: definition.bead_type.clone(),
                residue_name: residue.name.clone(),
                atom_indices,
            });
        }

        for &(i, j) in &mapping.bonds {
            let invalid_bond = || MappingError::InvalidMapping {
                mapping: mapping.name.clone(),
                kind: MappingValidationError::UnknownBondBead(i, j),
            };
            let (&a, &b) = cg_particles
                .get(i)
                .zip(cg_particles.get(j))
                .ok_or_else(invalid_bond)?;
            topology.add_bond(a, b).ok_or_else(invalid_bond)?;
        }
    }

    debug!(
        beads = beads.len(),
        bonds = topology.bonds().len(),
        waters = water_counter,
        "Assembled coarse-grained topology"
    );

    Ok(CgTopology {
        beads,
        topology,
        waters_per_bead,
    })
}
