use std::f64::consts::PI;

use na::Vector2;
use rand::Rng;
use rand_distr::{Distribution, Normal, Uniform};

use crate::atoms::new::Atoms;
use crate::atoms::properties::Selection;
use crate::constants::{Units, HEAVY_DENSITY_THRESHOLD, SEED_TEMPERATURE};
use crate::errors::{KineticaError, Result};
use crate::species::SpeciesTable;

fn check_temperature(temperature: f64) -> Result<()> {
    if temperature < 0.0 || !temperature.is_finite() {
        return Err(KineticaError::InvalidParameter {
            name: "temperature",
            value: temperature,
        });
    }
    Ok(())
}

/// Velocity of magnitude `speed` in a uniformly random direction.
pub fn random_direction<R: Rng>(speed: f64, rng: &mut R) -> Vector2<f64> {
    let angle = Uniform::new(0.0, 2.0 * PI).sample(rng);
    Vector2::new(angle.cos(), angle.sin()) * speed
}

impl Atoms {
    /// Maxwell-Boltzmann velocities, drift removed, rescaled exactly to `temperature`.
    pub fn start_velocities<R: Rng>(
        &mut self,
        temperature: f64,
        selection: &Selection,
        units: &Units,
        species: &SpeciesTable,
        rng: &mut R,
    ) -> Result<()> {
        check_temperature(temperature)?;
        let members = self.thermal_members(selection);
        self.initialise_velocities(&members, temperature, units, rng);
        if members.len() >= 2 {
            self.remove_drift(&members, species);
            let current = self.members_temperature(&members, units);
            if current > 0.0 {
                self.scale(&members, (temperature / current).sqrt());
            }
        }
        Ok(())
    }

    fn initialise_velocities<R: Rng>(
        &mut self,
        members: &[usize],
        temperature: f64,
        units: &Units,
        rng: &mut R,
    ) {
        for &i in members {
            let sigma = (units.boltzmann * temperature / (self.mass_i(i) * units.mvv_to_energy))
                .sqrt();
            if sigma > 0.0 {
                if let Ok(normal) = Normal::new(0.0, sigma) {
                    self.velocities[(0, i)] = normal.sample(rng);
                    self.velocities[(1, i)] = normal.sample(rng);
                    continue;
                }
            }
            self.velocities.set_column(i, &Vector2::zeros());
        }
    }

    fn is_heavy(&self, i: usize, species: &SpeciesTable) -> bool {
        match species.get(self.species[i]) {
            Ok(s) => {
                let radius = 0.5 * s.sigma;
                self.mass_i(i) / (PI * radius * radius) > HEAVY_DENSITY_THRESHOLD
            }
            Err(_) => false,
        }
    }

    /// Subtracts the mass-weighted mean velocity. Heavy obstacles neither count nor move.
    fn remove_drift(&mut self, members: &[usize], species: &SpeciesTable) {
        let drifting: Vec<usize> = members
            .iter()
            .copied()
            .filter(|&i| !self.is_heavy(i, species))
            .collect();

        let mut total_mass: f64 = 0.0;
        let mut total_momentum: Vector2<f64> = Vector2::zeros();
        for &i in &drifting {
            let a_mass = self.mass_i(i);
            total_mass += a_mass;
            total_momentum += self.velocities.column(i) * a_mass;
        }
        if total_mass <= 0.0 {
            return;
        }

        let velocity_cm = total_momentum / total_mass;
        for &i in &drifting {
            let mut v_i = self.velocities.column_mut(i);
            v_i -= velocity_cm;
        }
    }

    fn scale(&mut self, members: &[usize], lambda: f64) {
        for &i in members {
            let mut v_i = self.velocities.column_mut(i);
            v_i *= lambda;
        }
    }

    /// Rescales to `temperature`, seeding a frozen selection with thermal noise first.
    pub fn rescale_to_temperature<R: Rng>(
        &mut self,
        temperature: f64,
        selection: &Selection,
        units: &Units,
        species: &SpeciesTable,
        rng: &mut R,
    ) -> Result<()> {
        check_temperature(temperature)?;
        let members = self.thermal_members(selection);
        let mut current = self.members_temperature(&members, units);
        if current <= 0.0 {
            if temperature == 0.0 {
                return Ok(());
            }
            self.initialise_velocities(&members, SEED_TEMPERATURE, units, rng);
            if members.len() >= 2 {
                self.remove_drift(&members, species);
            }
            current = self.members_temperature(&members, units);
            if current <= 0.0 {
                return Ok(());
            }
        }
        self.scale(&members, (temperature / current).sqrt());
        Ok(())
    }

    pub fn rescale_velocities(&mut self, ratio: f64, selection: &Selection) {
        let members = self.thermal_members(selection);
        self.scale(&members, ratio);
    }

    /// Changes every member's own kinetic energy by `amount`, never below zero.
    /// Returns the energy actually added.
    pub fn transfer_heat<R: Rng>(
        &mut self,
        amount: f64,
        selection: &Selection,
        units: &Units,
        rng: &mut R,
    ) -> f64 {
        let members = self.thermal_members(selection);
        let mut transferred = 0.0;
        for i in members {
            let before = self.kinetic_energy_i(i, units);
            let after = (before + amount).max(0.0);
            if before > 0.0 {
                let mut v_i = self.velocities.column_mut(i);
                v_i *= (after / before).sqrt();
            } else if after > 0.0 {
                let speed = (2.0 * after / (self.mass_i(i) * units.mvv_to_energy)).sqrt();
                self.velocities.set_column(i, &random_direction(speed, rng));
            }
            transferred += after - before;
        }
        transferred
    }
}
