use super::config::{DiagnosticsConfig, RdfOptions, ThermoState};
use super::error::EngineError;
use super::observables::{self, InteractionQuery, ObservableSamples};
use super::tasks;
use crate::core::fitting::harmonic::{FitOptions, HarmonicFit};
use crate::core::io::diagnostics::DiagnosticsWriter;
use crate::core::models::graph::BondGraph;
use crate::core::models::trajectory::Trajectory;
use crate::core::stats::rdf::Rdf;
use tracing::debug;

/// A trajectory, its bond graph and the thermodynamic state to invert at.
///
/// The context never changes after construction. Use [`with_state`] or
/// [`with_trajectory`] to derive a context for other conditions.
///
/// [`with_state`]: ThermodynamicContext::with_state
/// [`with_trajectory`]: ThermodynamicContext::with_trajectory
pub struct ThermodynamicContext<'a, T>
where
    T: Trajectory + Sync,
{
    trajectory: &'a T,
    graph: BondGraph,
    state: ThermoState,
    diagnostics: Option<DiagnosticsWriter>,
}

impl<'a, T> ThermodynamicContext<'a, T>
where
    T: Trajectory + Sync,
{
    /// # Errors
    ///
    /// Returns [`EngineError::MissingTopology`] if the trajectory's topology
    /// has no bonds.
    pub fn new(trajectory: &'a T, state: ThermoState) -> Result<Self, EngineError> {
        let topology = trajectory.topology();
        if topology.bonds().is_empty() {
            return Err(EngineError::MissingTopology);
        }
        let graph = BondGraph::from_topology(topology);
        debug!(
            particles = graph.n_nodes(),
            bonds = graph.n_edges(),
            frames = trajectory.n_frames(),
            kt = state.kt(),
            "Built thermodynamic context."
        );
        Ok(Self {
            trajectory,
            graph,
            state,
            diagnostics: None,
        })
    }

    /// Writes diagnostic tables for every fit into `config.output_dir`.
    pub fn with_diagnostics(mut self, config: &DiagnosticsConfig) -> Self {
        self.diagnostics = Some(DiagnosticsWriter::new(config.output_dir.clone()));
        self
    }

    pub fn with_state(&self, state: ThermoState) -> Self {
        Self {
            trajectory: self.trajectory,
            graph: self.graph.clone(),
            state,
            diagnostics: self.diagnostics.clone(),
        }
    }

    pub fn with_trajectory<'b, U>(
        &self,
        trajectory: &'b U,
    ) -> Result<ThermodynamicContext<'b, U>, EngineError>
    where
        U: Trajectory + Sync,
    {
        let mut context = ThermodynamicContext::new(trajectory, self.state)?;
        context.diagnostics = self.diagnostics.clone();
        Ok(context)
    }

    pub fn trajectory(&self) -> &'a T {
        self.trajectory
    }

    pub fn graph(&self) -> &BondGraph {
        &self.graph
    }

    pub fn state(&self) -> ThermoState {
        self.state
    }

    pub fn kt(&self) -> f64 {
        self.state.kt()
    }

    pub fn diagnostics(&self) -> Option<&DiagnosticsWriter> {
        self.diagnostics.as_ref()
    }

    pub fn samples(&self, query: &InteractionQuery) -> ObservableSamples {
        observables::sample(self.trajectory, &self.graph, query)
    }

    /// Harmonic parameters for the interaction type `query` names.
    ///
    /// Returns `Ok(None)` when no particle group of that type exists.
    pub fn compute_parameters(
        &self,
        query: &InteractionQuery,
        options: &FitOptions,
    ) -> Result<Option<HarmonicFit>, EngineError> {
        let samples = self.samples(query);
        if samples.is_empty() {
            debug!(interaction = %query, "Interaction does not occur in the topology.");
            return Ok(None);
        }
        tasks::inversion::run(&samples, self.kt(), options, self.diagnostics())
    }

    pub fn compute_bond_parameters(
        &self,
        type_i: &str,
        type_j: &str,
        options: &FitOptions,
    ) -> Result<Option<HarmonicFit>, EngineError> {
        self.compute_parameters(&InteractionQuery::bond(type_i, type_j), options)
    }

    /// `type_j` is the vertex of the angle.
    pub fn compute_angle_parameters(
        &self,
        type_i: &str,
        type_j: &str,
        type_k: &str,
        options: &FitOptions,
    ) -> Result<Option<HarmonicFit>, EngineError> {
        self.compute_parameters(&InteractionQuery::angle(type_i, type_j, type_k), options)
    }

    pub fn compute_rdf(
        &self,
        type_i: &str,
        type_j: &str,
        options: &RdfOptions,
    ) -> Result<Option<Rdf>, EngineError> {
        tasks::rdf::run(self.trajectory, &self.graph, type_i, type_j, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fitting::harmonic::FitQuality;
    use crate::core::models::topology::Topology;
    use crate::core::models::trajectory::{Frame, InMemoryTrajectory};
    use nalgebra::{Point3, Vector3};
    use std::f64::consts::FRAC_PI_2;
    use tempfile::tempdir;

    /// Standard normal scores repeated in proportion to their density.
    fn normal_scores() -> Vec<f64> {
        (-400..=400)
            .flat_map(|i| {
                let z = i as f64 / 100.0;
                let count = (12.0 * (-0.5 * z * z).exp()).round() as usize;
                std::iter::repeat_n(z, count)
            })
            .collect()
    }

    fn triatomic() -> Topology {
        let mut topology = Topology::new();
        let residue = topology.add_residue("TRI");
        for name in ["A", "B", "C"] {
            topology.add_particle(residue, name, 12.0).unwrap();
        }
        topology.add_bond(0, 1).unwrap();
        topology.add_bond(1, 2).unwrap();
        topology
    }

    /// A-B lengths around 0.47 and A-B-C angles around π/2, one molecule per frame.
    fn trajectory() -> InMemoryTrajectory {
        let frames = normal_scores()
            .into_iter()
            .map(|z| {
                let length = 0.47 + 0.02 * z;
                let theta = FRAC_PI_2 + 0.1 * z;
                Frame::new(vec![
                    Point3::new(length, 0.0, 0.0),
                    Point3::origin(),
                    Point3::new(0.5 * theta.cos(), 0.5 * theta.sin(), 0.0),
                ])
                .with_box(Vector3::new(5.0, 5.0, 5.0))
            })
            .collect();
        InMemoryTrajectory::new(triatomic(), frames).unwrap()
    }

    #[test]
    fn topology_without_bonds_is_rejected() {
        let mut topology = Topology::new();
        let residue = topology.add_residue("ION");
        topology.add_particle(residue, "NA", 23.0).unwrap();
        let trajectory =
            InMemoryTrajectory::new(topology, vec![Frame::new(vec![Point3::origin()])]).unwrap();

        let result = ThermodynamicContext::new(&trajectory, ThermoState::default());
        assert!(matches!(result, Err(EngineError::MissingTopology)));
    }

    #[test]
    fn bond_parameters_are_centered_on_the_mean_length() {
        let trajectory = trajectory();
        let context = ThermodynamicContext::new(&trajectory, ThermoState::default()).unwrap();

        let fit = context
            .compute_bond_parameters("A", "B", &FitOptions::default())
            .unwrap()
            .unwrap();

        assert!((fit.parameters.x0 - 0.47).abs() < 0.47 * 0.05);
        assert!(fit.parameters.force_constant > 0.0);
        assert_ne!(fit.quality, FitQuality::MomentEstimate);
    }

    #[test]
    fn angle_peaked_at_right_angle_fits_near_half_pi() {
        let trajectory = trajectory();
        let context = ThermodynamicContext::new(&trajectory, ThermoState::default()).unwrap();

        let fit = context
            .compute_angle_parameters("A", "B", "C", &FitOptions::default())
            .unwrap()
            .unwrap();

        assert!((fit.parameters.x0 - FRAC_PI_2).abs() < FRAC_PI_2 * 0.05);
        assert!(fit.parameters.force_constant > 0.0);
    }

    #[test]
    fn absent_interactions_are_none() {
        let trajectory = trajectory();
        let context = ThermodynamicContext::new(&trajectory, ThermoState::default()).unwrap();
        let options = FitOptions::default();

        assert_eq!(context.compute_bond_parameters("A", "C", &options).unwrap(), None);
        assert_eq!(context.compute_bond_parameters("X", "Y", &options).unwrap(), None);
        assert_eq!(
            context.compute_angle_parameters("B", "A", "C", &options).unwrap(),
            None
        );
    }

    #[test]
    fn with_state_derives_a_new_context() {
        let trajectory = trajectory();
        let context = ThermodynamicContext::new(&trajectory, ThermoState::default()).unwrap();
        let hotter = context.with_state(ThermoState::new(8.314e-3, 610.0).unwrap());

        assert!((hotter.kt() - 2.0 * context.kt()).abs() < 1e-12);
        assert_eq!(context.state(), ThermoState::default());
        assert_eq!(hotter.graph(), context.graph());
    }

    #[test]
    fn force_constant_scales_with_temperature() {
        let trajectory = trajectory();
        let cold = ThermodynamicContext::new(&trajectory, ThermoState::default()).unwrap();
        let hot = cold.with_state(ThermoState::new(8.314e-3, 610.0).unwrap());
        let options = FitOptions::default();

        let k_cold = cold
            .compute_bond_parameters("A", "B", &options)
            .unwrap()
            .unwrap()
            .parameters
            .force_constant;
        let k_hot = hot
            .compute_bond_parameters("A", "B", &options)
            .unwrap()
            .unwrap()
            .parameters
            .force_constant;
        assert!((k_hot / k_cold - 2.0).abs() < 1e-6);
    }

    #[test]
    fn with_trajectory_requires_bonds_too() {
        let trajectory = trajectory();
        let context = ThermodynamicContext::new(&trajectory, ThermoState::default()).unwrap();

        let mut unbonded = Topology::new();
        let residue = unbonded.add_residue("ION");
        unbonded.add_particle(residue, "CL", 35.0).unwrap();
        let other =
            InMemoryTrajectory::new(unbonded, vec![Frame::new(vec![Point3::origin()])]).unwrap();

        assert!(matches!(
            context.with_trajectory(&other),
            Err(EngineError::MissingTopology)
        ));
    }

    #[test]
    fn diagnostics_are_written_when_configured() {
        let dir = tempdir().unwrap();
        let trajectory = trajectory();
        let context = ThermodynamicContext::new(&trajectory, ThermoState::default())
            .unwrap()
            .with_diagnostics(&DiagnosticsConfig {
                output_dir: dir.path().to_path_buf(),
            });

        context
            .compute_bond_parameters("A", "B", &FitOptions::default())
            .unwrap();

        assert!(dir.path().join("A-B_bond_distribution.csv").exists());
        assert!(dir.path().join("A-B_bond_energies.csv").exists());
    }

    #[test]
    fn rdf_excludes_bonded_neighbors_by_default() {
        let trajectory = trajectory();
        let context = ThermodynamicContext::new(&trajectory, ThermoState::default()).unwrap();

        assert!(context.compute_rdf("A", "C", &RdfOptions::default()).unwrap().is_none());
        let options = RdfOptions {
            exclude_up_to: Some(1),
            ..RdfOptions::default()
        };
        let rdf = context.compute_rdf("A", "C", &options).unwrap().unwrap();
        assert_eq!(rdf.radii.len(), 200);
        assert!(rdf.g_r.iter().any(|&g| g > 0.0));
    }
}
