//! Physical constants, unit systems and engine defaults.

/// The Boltzmann constant in electronvolt per kelvin
pub const KB_EV_PER_KELVIN: f64 = 8.617_333e-5;

/// Coulomb constant in eV·Å per squared elementary charge
pub const COULOMB_EV_ANGSTROM: f64 = 14.399_645;

/// 1 amu·Å²/fs² expressed in eV
pub const AMU_A2_PER_FS2_IN_EV: f64 = 103.642_7;

/// Default cutoff, as a multiple of the pair sigma.
pub const DEFAULT_CUTOFF: f64 = 2.5;

/// Default neighbour-list radius, as a multiple of the pair sigma.
pub const DEFAULT_LIST_RADIUS: f64 = 3.0;

/// Ceiling on (σ/r)² to keep overlapping pairs finite.
pub const MAX_SIGMA_RATIO_SQ: f64 = 2.0;

/// Collision diameter as a fraction of the summed van der Waals diameters.
pub const COLLISION_FRACTION: f64 = 0.55;

/// Gay-Berne cutoff as a multiple of the longer particle length.
pub const GB_CUTOFF_RATIO: f64 = 2.5;

/// Temperature used to seed velocities of a frozen system before rescaling.
pub const SEED_TEMPERATURE: f64 = 1.0;

/// Areal density above which a particle counts as a heavy obstacle for drift removal.
pub const HEAVY_DENSITY_THRESHOLD: f64 = 1.0e4;

/// Below this, a participant set is considered to be at rest.
pub const KE_EPSILON: f64 = 1.0e-12;

/// Conversion factors that tie force, mass, length and time together.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Units {
    /// Boltzmann constant in energy units per temperature unit
    pub boltzmann: f64,
    /// Coulomb constant in energy·length per squared charge
    pub coulomb: f64,
    /// Energy carried by one mass·length²/time² unit
    pub mvv_to_energy: f64,
}

impl Units {
    /// Lennard-Jones reduced units: every constant is one.
    pub fn reduced() -> Self {
        Self {
            boltzmann: 1.0,
            coulomb: 1.0,
            mvv_to_energy: 1.0,
        }
    }

    /// eV, Å, amu and fs, with temperatures in kelvin.
    pub fn workbench() -> Self {
        Self {
            boltzmann: KB_EV_PER_KELVIN,
            coulomb: COULOMB_EV_ANGSTROM,
            mvv_to_energy: AMU_A2_PER_FS2_IN_EV,
        }
    }

    pub fn acceleration(&self, force: f64, mass: f64) -> f64 {
        force / (mass * self.mvv_to_energy)
    }
}

impl Default for Units {
    fn default() -> Self {
        Self::workbench()
    }
}

/// Time step a new model starts with (fs in workbench units).
pub const DEFAULT_TIME_STEP: f64 = 1.0;
