//! Engines that advance a particle population one time step at a time: `atomic` for point
//! atoms with bonds and chemistry, `meso` for oriented Gay-Berne bodies.
pub mod atomic;
mod forces;
pub mod meso;
pub mod minimize;
pub mod shared;

use crate::errors::{KineticaError, Result};
use crate::potentials::potential::PotentialTerms;
use crate::reactions::ReactionTally;

/// On/off switches for the optional force contributors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForceSwitches {
    pub fields: bool,
    pub friction: bool,
    pub restraints: bool,
    pub radial_bonds: bool,
    pub angular_bonds: bool,
    /// Charge interactions between particles
    pub coulomb: bool,
    /// Skip the non-bonded terms between atoms joined by a radial bond
    pub exclude_bonded: bool,
}

impl Default for ForceSwitches {
    fn default() -> Self {
        Self {
            fields: true,
            friction: true,
            restraints: true,
            radial_bonds: true,
            angular_bonds: true,
            coulomb: true,
            exclude_bonded: true,
        }
    }
}

/// What one call to `advance` did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepReport {
    pub step: usize,
    pub time: f64,
    pub potential: PotentialTerms,
    pub kinetic: f64,
    pub temperature: f64,
    pub neighbour_rebuilt: bool,
    pub reactions: ReactionTally,
}

impl StepReport {
    pub fn total_energy(&self) -> f64 {
        self.potential.total() + self.kinetic
    }
}

pub(crate) fn check_time_step(dt: f64) -> Result<()> {
    if !(dt > 0.0) || !dt.is_finite() {
        return Err(KineticaError::InvalidTimeStep { value: dt });
    }
    Ok(())
}
