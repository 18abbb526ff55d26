use na::Vector2;

use crate::errors::{KineticaError, Result};
use crate::model::atomic::AtomicModel;

/// Shortest step, as a fraction of the initial one, before the descent gives up.
const MIN_STEP_FRACTION: f64 = 1.0e-9;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MinimizationReport {
    pub steps: usize,
    pub initial_energy: f64,
    pub final_energy: f64,
    /// Largest force on a movable atom was below the tolerance
    pub converged: bool,
}

impl AtomicModel {
    fn max_mobile_force(&self) -> f64 {
        self.atoms
            .mobile()
            .map(|i| self.atoms.forces.column(i).norm())
            .fold(0.0, f64::max)
    }

    /// Steepest descent on the potential energy. Each step moves every movable atom along its
    /// force, scaled so the largest move is the current step length; a step that raises the
    /// energy is undone and the step length halved. Velocities are zeroed.
    pub fn minimize(
        &mut self,
        max_steps: usize,
        max_displacement: f64,
        tolerance: f64,
    ) -> Result<MinimizationReport> {
        if !(max_displacement > 0.0) {
            return Err(KineticaError::InvalidParameter {
                name: "minimization displacement",
                value: max_displacement,
            });
        }
        if !(tolerance >= 0.0) {
            return Err(KineticaError::InvalidParameter {
                name: "minimization tolerance",
                value: tolerance,
            });
        }
        for i in 0..self.atoms.n_atoms {
            self.atoms.set_velocity(i, &Vector2::zeros());
        }

        let mut energy = self.compute_force(-1.0).total();
        let initial_energy = energy;
        let mut step_length = max_displacement;
        let mut steps = 0;
        let mut converged = false;

        while steps < max_steps {
            let max_force = self.max_mobile_force();
            if max_force <= tolerance {
                converged = true;
                break;
            }
            if step_length < MIN_STEP_FRACTION * max_displacement {
                break;
            }
            steps += 1;

            let saved_positions = self.atoms.positions.clone();
            let saved_forces = self.atoms.forces.clone();
            let scale = step_length / max_force;
            for i in self.atoms.mobile().collect::<Vec<_>>() {
                let push = self.atoms.forces.column(i) * scale;
                let mut r_i = self.atoms.positions.column_mut(i);
                r_i += push;
            }
            self.enforce_boundary();

            let trial = self.compute_force(-1.0).total();
            if trial > energy {
                self.atoms.positions = saved_positions;
                self.atoms.forces = saved_forces;
                step_length *= 0.5;
            } else {
                energy = trial;
            }
        }

        for i in 0..self.atoms.n_atoms {
            self.atoms.set_velocity(i, &Vector2::zeros());
        }
        self.compute_force(self.time());
        let units = *self.units();
        self.atoms.prime_accelerations(&units);
        log::debug!("minimization: {steps} steps, energy {initial_energy:.6} -> {energy:.6}");
        Ok(MinimizationReport {
            steps,
            initial_energy,
            final_energy: energy,
            converged,
        })
    }
}
