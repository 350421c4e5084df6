use super::assembler::{CgTopology, MappingError};
use crate::core::models::topology::Topology;
use crate::core::models::trajectory::{Frame, InMemoryTrajectory, Trajectory, TrajectoryError};
use crate::core::utils::geometry::center_of_mass;
use nalgebra::{Point3, Vector3};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Groups solvent positions into a fixed number of clusters.
///
/// Implementations must return one cluster label in `0..n_clusters` per point.
/// k-means over water oxygens is the usual choice.
pub trait SolventClusterer: Sync {
    fn cluster(&self, points: &[Point3<f64>], n_clusters: usize) -> Vec<usize>;
}

/// Indices of the oxygen atoms of all water residues, in topology order.
pub fn water_oxygens(topology: &Topology) -> Vec<usize> {
    topology
        .residues()
        .iter()
        .filter(|residue| residue.is_water)
        .flat_map(|residue| residue.particles().iter().copied())
        .filter(|&index| {
            topology
                .particle(index)
                .is_some_and(|particle| particle.name.starts_with('O'))
        })
        .collect()
}

/// Maps every frame of an all-atom trajectory onto the beads of `cg`.
///
/// Non-water beads sit at the center of mass of their atoms. Water oxygens
/// are clustered per frame into as many groups as there are water beads, and
/// the n-th water bead sits at the center of mass of the n-th cluster. Box
/// lengths and times are carried over unchanged.
pub fn map_trajectory<T>(
    trajectory: &T,
    cg: &CgTopology,
    clusterer: Option<&dyn SolventClusterer>,
) -> Result<InMemoryTrajectory, MappingError>
where
    T: Trajectory + Sync,
{
    let water_beads: Vec<usize> = cg.water_beads().collect();
    let oxygens = if water_beads.is_empty() {
        Vec::new()
    } else {
        if clusterer.is_none() {
            return Err(MappingError::MissingSolventClusterer);
        }
        water_oxygens(trajectory.topology())
    };
    if !water_beads.is_empty() && oxygens.len() / cg.waters_per_bead != water_beads.len() {
        return Err(MappingError::ClusterCountMismatch {
            expected: water_beads.len(),
            found: oxygens.len() / cg.waters_per_bead,
        });
    }

    let masses: Vec<f64> = trajectory
        .topology()
        .particles()
        .iter()
        .map(|particle| particle.mass)
        .collect();
    let mapper = FrameMapper {
        cg,
        masses: &masses,
        water_beads: &water_beads,
        oxygens: &oxygens,
        clusterer,
    };

    #[cfg(not(feature = "parallel"))]
    let iterator = 0..trajectory.n_frames();

    #[cfg(feature = "parallel")]
    let iterator = (0..trajectory.n_frames()).into_par_iter();

    let frames = iterator
        .map(|frame| mapper.map_frame(trajectory, frame))
        .collect::<Result<Vec<Frame>, MappingError>>()?;

    InMemoryTrajectory::new(cg.topology.clone(), frames).map_err(
        |TrajectoryError::ParticleCountMismatch { frame, .. }| MappingError::FrameMismatch { frame },
    )
}

struct FrameMapper<'a> {
    cg: &'a CgTopology,
    masses: &'a [f64],
    water_beads: &'a [usize],
    oxygens: &'a [usize],
    clusterer: Option<&'a dyn SolventClusterer>,
}

impl FrameMapper<'_> {
    fn map_frame<T: Trajectory>(&self, trajectory: &T, frame: usize) -> Result<Frame, MappingError> {
        let positions = trajectory.positions(frame);
        let mut mapped = vec![Point3::origin(); self.cg.n_beads()];

        for (slot, bead) in mapped.iter_mut().zip(&self.cg.beads) {
            if bead.is_water() {
                continue;
            }
            *slot = self
                .center_of(positions, &bead.atom_indices)
                .ok_or(MappingError::FrameMismatch { frame })?;
        }

        if let Some(clusterer) = self.clusterer.filter(|_| !self.water_beads.is_empty()) {
            let points: Vec<Point3<f64>> = self
                .oxygens
                .iter()
                .map(|&i| positions.get(i).copied().ok_or(MappingError::FrameMismatch { frame }))
                .collect::<Result<_, _>>()?;
            let n_clusters = self.water_beads.len();
            let labels = clusterer.cluster(&points, n_clusters);
            if labels.len() != points.len() || labels.iter().any(|&label| label >= n_clusters) {
                return Err(MappingError::ClusterCountMismatch {
                    expected: n_clusters,
                    found: labels.iter().max().map_or(0, |&max| max + 1),
                });
            }

            let mut members: Vec<Vec<usize>> = vec![Vec::new(); n_clusters];
            for (&atom, &label) in self.oxygens.iter().zip(&labels) {
                members[label].push(atom);
            }
            for (&bead, cluster) in self.water_beads.iter().zip(&members) {
                mapped[bead] = self
                    .center_of(positions, cluster)
                    .ok_or(MappingError::EmptyCluster { frame })?;
            }
        }

        let mut mapped_frame = Frame::new(mapped).at_time(trajectory.time(frame));
        if let Some(box_lengths) = trajectory.box_lengths(frame) {
            mapped_frame = mapped_frame.with_box(box_lengths);
        }
        Ok(mapped_frame)
    }

    fn center_of(&self, positions: &[Point3<f64>], atoms: &[usize]) -> Option<Point3<f64>> {
        let selected: Vec<Point3<f64>> = atoms
            .iter()
            .map(|&i| positions.get(i).copied())
            .collect::<Option<_>>()?;
        let masses: Vec<f64> = atoms
            .iter()
            .map(|&i| self.masses.get(i).copied())
            .collect::<Option<_>>()?;
        center_of_mass(&selected, &masses)
    }
}

/// Mean box lengths over all periodic frames, or `None` if no frame is periodic.
pub fn average_box_lengths<T: Trajectory>(trajectory: &T) -> Option<Vector3<f64>> {
    let (sum, count) = (0..trajectory.n_frames())
        .filter_map(|frame| trajectory.box_lengths(frame))
        .fold((Vector3::zeros(), 0usize), |(sum, count), lengths| {
            (sum + lengths, count + 1)
        });
    (count > 0).then(|| sum / count as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::mapping::assembler::build_cg_topology;
    use crate::core::mapping::definition::{BeadDefinition, MoleculeMapping};
    use std::collections::HashMap;

    /// Splits points into equally sized groups along x.
    struct SliceClusterer;

    impl SolventClusterer for SliceClusterer {
        fn cluster(&self, points: &[Point3<f64>], n_clusters: usize) -> Vec<usize> {
            let mut order: Vec<usize> = (0..points.len()).collect();
            order.sort_by(|&a, &b| points[a].x.total_cmp(&points[b].x));
            let per_cluster = points.len().div_ceil(n_clusters.max(1));
            let mut labels = vec![0; points.len()];
            for (rank, &index) in order.iter().enumerate() {
                labels[index] = (rank / per_cluster).min(n_clusters - 1);
            }
            labels
        }
    }

    fn dimer_with_waters(n_waters: usize) -> (Topology, HashMap<String, MoleculeMapping>) {
        let mut topology = Topology::new();
        let residue = topology.add_residue("DIM");
        for (name, mass) in [("C1", 12.0), ("H1", 1.0), ("C2", 12.0), ("O2", 16.0)] {
            topology.add_particle(residue, name, mass).unwrap();
        }
        topology.add_bond(0, 2).unwrap();
        for _ in 0..n_waters {
            let residue = topology.add_residue("SOL");
            topology.add_particle(residue, "OW", 16.0).unwrap();
            topology.add_particle(residue, "HW1", 1.0).unwrap();
            topology.add_particle(residue, "HW2", 1.0).unwrap();
        }
        let mapping = MoleculeMapping {
            name: "DIM".to_string(),
            bonds: vec![(0, 1)],
            beads: vec![
                BeadDefinition {
                    index: 0,
                    bead_type: "A".to_string(),
                    atom_indices: vec![0, 1],
                },
                BeadDefinition {
                    index: 1,
                    bead_type: "B".to_string(),
                    atom_indices: vec![2, 3],
                },
            ],
        };
        (topology, HashMap::from([("DIM".to_string(), mapping)]))
    }

    fn dimer_frame(offset: f64, n_waters: usize) -> Frame {
        let mut positions = vec![
            Point3::new(offset, 0.0, 0.0),
            Point3::new(offset + 1.3, 0.0, 0.0),
            Point3::new(offset + 2.0, 0.0, 0.0),
            Point3::new(offset + 2.0, 0.7, 0.0),
        ];
        for w in 0..n_waters {
            let x = 10.0 + w as f64;
            positions.push(Point3::new(x, 0.0, 0.0));
            positions.push(Point3::new(x, 0.1, 0.0));
            positions.push(Point3::new(x, -0.1, 0.0));
        }
        Frame::new(positions).at_time(offset)
    }

    #[test]
    fn beads_are_placed_at_the_center_of_mass_of_their_atoms() {
        let (aa, mappings) = dimer_with_waters(0);
        let cg = build_cg_topology(&aa, &mappings, 4).unwrap();
        let trajectory =
            InMemoryTrajectory::new(aa, vec![dimer_frame(0.0, 0), dimer_frame(5.0, 0)]).unwrap();

        let mapped = map_trajectory(&trajectory, &cg, None).unwrap();

        assert_eq!(mapped.n_frames(), 2);
        let first = mapped.positions(0);
        assert!((first[0].x - 0.1).abs() < 1e-12);
        assert!((first[1].x - 2.0).abs() < 1e-12);
        assert!((first[1].y - 0.4).abs() < 1e-12);
        assert!((mapped.positions(1)[0].x - 5.1).abs() < 1e-12);
        assert_eq!(mapped.time(1), 5.0);
        assert_eq!(mapped.topology().bonds().len(), 1);
    }

    #[test]
    fn water_beads_sit_at_the_center_of_their_oxygen_cluster() {
        let (aa, mappings) = dimer_with_waters(8);
        let cg = build_cg_topology(&aa, &mappings, 4).unwrap();
        let trajectory = InMemoryTrajectory::new(aa, vec![dimer_frame(0.0, 8)]).unwrap();

        let mapped = map_trajectory(&trajectory, &cg, Some(&SliceClusterer)).unwrap();

        let positions = mapped.positions(0);
        assert_eq!(positions.len(), 4);
        assert!((positions[2].x - 11.5).abs() < 1e-12);
        assert!((positions[3].x - 15.5).abs() < 1e-12);
        assert_eq!(positions[2].y, 0.0);
    }

    #[test]
    fn water_beads_require_a_clusterer() {
        let (aa, mappings) = dimer_with_waters(4);
        let cg = build_cg_topology(&aa, &mappings, 4).unwrap();
        let trajectory = InMemoryTrajectory::new(aa, vec![dimer_frame(0.0, 4)]).unwrap();

        let result = map_trajectory(&trajectory, &cg, None);
        assert_eq!(result.unwrap_err(), MappingError::MissingSolventClusterer);
    }

    #[test]
    fn out_of_range_cluster_labels_are_rejected() {
        struct Broken;
        impl SolventClusterer for Broken {
            fn cluster(&self, points: &[Point3<f64>], n_clusters: usize) -> Vec<usize> {
                vec![n_clusters; points.len()]
            }
        }

        let (aa, mappings) = dimer_with_waters(4);
        let cg = build_cg_topology(&aa, &mappings, 4).unwrap();
        let trajectory = InMemoryTrajectory::new(aa, vec![dimer_frame(0.0, 4)]).unwrap();

        let result = map_trajectory(&trajectory, &cg, Some(&Broken));
        assert!(matches!(result, Err(MappingError::ClusterCountMismatch { .. })));
    }

    #[test]
    fn box_lengths_are_carried_over_and_averaged() {
        let (aa, mappings) = dimer_with_waters(0);
        let cg = build_cg_topology(&aa, &mappings, 4).unwrap();
        let frames = vec![
            dimer_frame(0.0, 0).with_box(Vector3::new(4.0, 4.0, 6.0)),
            dimer_frame(1.0, 0).with_box(Vector3::new(6.0, 4.0, 8.0)),
        ];
        let trajectory = InMemoryTrajectory::new(aa, frames).unwrap();

        assert_eq!(
            average_box_lengths(&trajectory),
            Some(Vector3::new(5.0, 4.0, 7.0))
        );
        let mapped = map_trajectory(&trajectory, &cg, None).unwrap();
        assert_eq!(mapped.box_lengths(1), Some(Vector3::new(6.0, 4.0, 8.0)));
    }

    #[test]
    fn non_periodic_trajectories_have_no_average_box() {
        let (aa, _) = dimer_with_waters(0);
        let trajectory = InMemoryTrajectory::new(aa, vec![dimer_frame(0.0, 0)]).unwrap();
        assert_eq!(average_box_lengths(&trajectory), None);
    }

    #[test]
    fn water_oxygens_selects_only_water_oxygens() {
        let (aa, _) = dimer_with_waters(2);
        assert_eq!(water_oxygens(&aa), vec![4, 7]);
    }
}
