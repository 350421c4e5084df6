use super::topology::Topology;
use nalgebra::{Point3, Vector3};
use thiserror::Error;

/// Read access to a molecular dynamics trajectory.
///
/// Trajectory file formats are handled outside this crate; anything that can
/// hand out a topology and per-frame coordinates can be parameterized.
/// Coordinates follow the topology's particle order. Box lengths describe an
/// orthorhombic periodic cell; `None` means the frame is not periodic.
pub trait Trajectory {
    fn topology(&self) -> &Topology;

    fn n_frames(&self) -> usize;

    fn positions(&self, frame: usize) -> &[Point3<f64>];

    fn box_lengths(&self, frame: usize) -> Option<Vector3<f64>>;

    fn time(&self, frame: usize) -> f64;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub positions: Vec<Point3<f64>>,
    pub box_lengths: Option<Vector3<f64>>,
    pub time: f64,
}

impl Frame {
    pub fn new(positions: Vec<Point3<f64>>) -> Self {
        Self {
            positions,
            box_lengths: None,
            time: 0.0,
        }
    }

    pub fn with_box(mut self, box_lengths: Vector3<f64>) -> Self {
        self.box_lengths = Some(box_lengths);
        self
    }

    pub fn at_time(mut self, time: f64) -> Self {
        self.time = time;
        self
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TrajectoryError {
    #[error("Frame {frame} has {found} positions but the topology has {expected} particles")]
    ParticleCountMismatch {
        frame: usize,
        expected: usize,
        found: usize,
    },
}

/// A trajectory held entirely in memory.
#[derive(Debug, Clone, PartialEq)]
pub struct InMemoryTrajectory {
    topology: Topology,
    frames: Vec<Frame>,
}

impl InMemoryTrajectory {
    pub fn new(topology: Topology, frames: Vec<Frame>) -> Result<Self, TrajectoryError> {
        for (index, frame) in frames.iter().enumerate() {
            if frame.positions.len() != topology.n_particles() {
                return Err(TrajectoryError::ParticleCountMismatch {
                    frame: index,
                    expected: topology.n_particles(),
                    found: frame.positions.len(),
                });
            }
        }
        Ok(Self { topology, frames })
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }
}

impl Trajectory for InMemoryTrajectory {
    fn topology(&self) -> &Topology {
        &self.topology
    }

    fn n_frames(&self) -> usize {
        self.frames.len()
    }

    fn positions(&self, frame: usize) -> &[Point3<f64>] {
        &self.frames[frame].positions
    }

    fn box_lengths(&self, frame: usize) -> Option<Vector3<f64>> {
        self.frames[frame].box_lengths
    }

    fn time(&self, frame: usize) -> f64 {
        self.frames[frame].time
    }
}
