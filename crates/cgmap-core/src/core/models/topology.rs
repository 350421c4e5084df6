const WATER_RESIDUE_NAMES: &[&str] = &["HOH", "WAT", "SOL", "TIP3", "TIP4", "TIP5", "SPC", "T3P"];

/// Returns `true` if the residue name is one of the common water residue names.
pub fn is_water_residue_name(name: &str) -> bool {
    WATER_RESIDUE_NAMES
        .iter()
        .any(|water| water.eq_ignore_ascii_case(name.trim()))
}

/// A particle of a topology: an atom in an all-atom system or a bead in a
/// coarse-grained one. The name doubles as the particle type label.
#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    /// The type label (atom name or bead type, e.g. "C3", "PCN", "O").
    pub name: String,
    /// Index of the residue this particle belongs to.
    pub residue_index: usize,
    /// Mass in atomic mass units, used for center-of-mass calculations.
    pub mass: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Residue {
    pub name: String,
    pub is_water: bool,
    particles: Vec<usize>,
}

impl Residue {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            is_water: is_water_residue_name(name),
            particles: Vec::new(),
        }
    }

    /// Global indices of the particles in this residue, in insertion order.
    pub fn particles(&self) -> &[usize] {
        &self.particles
    }

    /// Maps a residue-local particle index to its global index.
    pub fn particle(&self, local_index: usize) -> Option<usize> {
        self.particles.get(local_index).copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Bond {
    pub particle1: usize,
    pub particle2: usize,
}

impl Bond {
    pub fn new(particle1: usize, particle2: usize) -> Self {
        Self {
            particle1,
            particle2,
        }
    }

    pub fn contains(&self, index: usize) -> bool {
        self.particle1 == index || self.particle2 == index
    }
}

/// Particles, residues and bonds of a molecular system.
///
/// Particle indices are dense and assigned in insertion order, matching the
/// column order of the coordinates supplied by a [`Trajectory`](super::trajectory::Trajectory).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Topology {
    particles: Vec<Particle>,
    residues: Vec<Residue>,
    bonds: Vec<Bond>,
    /// Bonded partners per particle.
    bonded: Vec<Vec<usize>>,
}

impl Topology {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_residue(&mut self, name: &str) -> usize {
        self.residues.push(Residue::new(name));
        self.residues.len() - 1
    }

    /// Adds a particle to an existing residue.
    ///
    /// Returns the global index of the new particle, or `None` if the residue
    /// does not exist.
    pub fn add_particle(&mut self, residue_index: usize, name: &str, mass: f64) -> Option<usize> {
        let residue = self.residues.get_mut(residue_index)?;
        let index = self.particles.len();
        residue.particles.push(index);
        self.bonded.push(Vec::new());
        self.particles.push(Particle {
            name: name.to_string(),
            residue_index,
            mass,
        });
        Some(index)
    }

    /// Adds a bond between two particles.
    ///
    /// Adding an existing bond (in either orientation) is a no-op. Returns
    /// `None` if either particle does not exist or both indices are equal.
    pub fn add_bond(&mut self, particle1: usize, particle2: usize) -> Option<()> {
        if particle1 == particle2
            || particle1 >= self.particles.len()
            || particle2 >= self.particles.len()
        {
            return None;
        }
        if !self.bonded[particle1].contains(&particle2) {
            self.bonded[particle1].push(particle2);
            self.bonded[particle2].push(particle1);
            self.bonds.push(Bond::new(particle1, particle2));
        }
        Some(())
    }

    pub fn particle(&self, index: usize) -> Option<&Particle> {
        self.particles.get(index)
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn residue(&self, index: usize) -> Option<&Residue> {
        self.residues.get(index)
    }

    pub fn residues(&self) -> &[Residue] {
        &self.residues
    }

    pub fn bonds(&self) -> &[Bond] {
        &self.bonds
    }

    /// Particles bonded to `index`, in bond insertion order.
    pub fn bonded_to(&self, index: usize) -> &[usize] {
        self.bonded.get(index).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn n_particles(&self) -> usize {
        self.particles.len()
    }

    /// Indices of all particles whose name equals `name`.
    pub fn select_by_name<'a>(&'a self, name: &'a str) -> impl Iterator<Item = usize> + 'a {
        self.particles
            .iter()
            .enumerate()
            .filter(move |(_, particle)| particle.name == name)
            .map(|(index, _)| index)
    }
}
