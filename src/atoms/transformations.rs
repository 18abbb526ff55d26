use na::Vector2;

use crate::atoms::new::Atoms;
use crate::constants::Units;
use crate::simulation_box::SimulationBox;
use crate::species::SpeciesTable;

impl Atoms {
    /// Predictor: Taylor step from the stored acceleration, then the boundary rules.
    pub fn predict(&mut self, dt: f64, sim_box: &SimulationBox, species: &SpeciesTable) {
        let dt2 = 0.5 * dt * dt;
        for i in 0..self.n_atoms {
            if !self.alive[i] || !self.movable[i] {
                continue;
            }
            let a_i = self.accelerations.column(i).into_owned();
            let mut r_i = self.position(i);
            let mut v_i = self.velocity(i);

            r_i += v_i * dt + a_i * dt2;
            v_i += a_i * dt;

            let radius = species
                .get(self.species[i])
                .map(|s| 0.5 * s.sigma)
                .unwrap_or(0.0);
            sim_box.apply_boundary_conditions_pos(&mut r_i, &mut v_i, radius);

            self.positions.set_column(i, &r_i);
            self.velocities.set_column(i, &v_i);
        }
    }

    /// Corrector: blends the fresh acceleration into the predicted velocity. `forces` must
    /// hold the totals of every contributor at the predicted configuration.
    pub fn correct(&mut self, dt: f64, units: &Units) {
        let half_dt = 0.5 * dt;
        for i in 0..self.n_atoms {
            if !self.alive[i] {
                continue;
            }
            if !self.movable[i] {
                self.velocities.set_column(i, &Vector2::zeros());
                self.accelerations.set_column(i, &Vector2::zeros());
                continue;
            }
            let a_new = self.current_acceleration(i, units);
            let a_old = self.accelerations.column(i).into_owned();
            let mut v_i = self.velocities.column_mut(i);
            v_i += (a_new - a_old) * half_dt;
            self.accelerations.set_column(i, &a_new);
        }
    }

    /// Adopts the current forces as the stored acceleration without touching velocities,
    /// so the first predictor step after setup starts from consistent derivatives.
    pub fn prime_accelerations(&mut self, units: &Units) {
        for i in 0..self.n_atoms {
            let a = if self.alive[i] && self.movable[i] {
                self.current_acceleration(i, units)
            } else {
                Vector2::zeros()
            };
            self.accelerations.set_column(i, &a);
        }
    }

    /// Applies the boundary rules without integrating, e.g. after a manual move.
    pub fn enforce_boundary(&mut self, sim_box: &SimulationBox, species: &SpeciesTable) {
        for i in self.mobile().collect::<Vec<_>>() {
            let mut r_i = self.position(i);
            let mut v_i = self.velocity(i);
            let radius = species
                .get(self.species[i])
                .map(|s| 0.5 * s.sigma)
                .unwrap_or(0.0);
            sim_box.apply_boundary_conditions_pos(&mut r_i, &mut v_i, radius);
            self.positions.set_column(i, &r_i);
            self.velocities.set_column(i, &v_i);
        }
    }
}
