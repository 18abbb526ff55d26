//! Oriented elliptical bodies for the mesoscale engine. Same column layout and lifecycle as
//! [`Atoms`](crate::atoms::new::Atoms), plus the rotational degree of freedom.
use na::{DVector, Matrix2xX, Vector2};
use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::atoms::new::{push_column, push_scalar};
use crate::constants::{Units, SEED_TEMPERATURE};
use crate::errors::{KineticaError, Result};
use crate::potentials::gay_berne::{Multipole, Shape};
use crate::simulation_box::SimulationBox;

#[derive(Debug, Clone)]
pub struct BodySpec {
    pub position: Vector2<f64>,
    pub velocity: Vector2<f64>,
    pub theta: f64,
    pub omega: f64,
    pub mass: f64,
    /// `None` uses a uniform solid ellipse
    pub inertia: Option<f64>,
    pub length: f64,
    pub breadth: f64,
    pub epsilon: f64,
    pub well_ratio: f64,
    pub charge: f64,
    pub dipole: f64,
    pub friction: f64,
    pub movable: bool,
}

impl BodySpec {
    pub fn new(x: f64, y: f64, theta: f64) -> Self {
        Self {
            position: Vector2::new(x, y),
            velocity: Vector2::zeros(),
            theta,
            omega: 0.0,
            mass: 1.0,
            inertia: None,
            length: 1.0,
            breadth: 1.0,
            epsilon: 1.0,
            well_ratio: 1.0,
            charge: 0.0,
            dipole: 0.0,
            friction: 0.0,
            movable: true,
        }
    }

    pub fn with_shape(mut self, length: f64, breadth: f64) -> Self {
        self.length = length;
        self.breadth = breadth;
        self
    }

    pub fn with_mass(mut self, mass: f64) -> Self {
        self.mass = mass;
        self
    }

    pub fn with_well(mut self, epsilon: f64, well_ratio: f64) -> Self {
        self.epsilon = epsilon;
        self.well_ratio = well_ratio;
        self
    }

    pub fn with_velocity(mut self, vx: f64, vy: f64, omega: f64) -> Self {
        self.velocity = Vector2::new(vx, vy);
        self.omega = omega;
        self
    }

    pub fn with_charge(mut self, charge: f64) -> Self {
        self.charge = charge;
        self
    }

    pub fn with_dipole(mut self, dipole: f64) -> Self {
        self.dipole = dipole;
        self
    }

    pub fn with_friction(mut self, friction: f64) -> Self {
        self.friction = friction;
        self
    }

    pub fn fixed(mut self) -> Self {
        self.movable = false;
        self
    }

    fn validate(&self) -> Result<()> {
        let checks = [
            ("body mass", self.mass, self.mass > 0.0),
            ("body length", self.length, self.length > 0.0),
            ("body breadth", self.breadth, self.breadth > 0.0),
            ("body epsilon", self.epsilon, self.epsilon >= 0.0),
            ("body well ratio", self.well_ratio, self.well_ratio > 0.0),
        ];
        for (name, value, ok) in checks {
            if !ok {
                return Err(KineticaError::InvalidParameter { name, value });
            }
        }
        if let Some(inertia) = self.inertia {
            if !(inertia > 0.0) {
                return Err(KineticaError::InvalidParameter {
                    name: "body inertia",
                    value: inertia,
                });
            }
        }
        Ok(())
    }

    // I = m (a^2 + b^2) / 4 with semi-axes a = length / 2, b = breadth / 2
    fn moment_of_inertia(&self) -> f64 {
        self.inertia.unwrap_or(
            self.mass * (self.length * self.length + self.breadth * self.breadth) / 16.0,
        )
    }
}

#[derive(Debug, Clone)]
pub struct Bodies {
    pub n_bodies: usize,
    pub positions: Matrix2xX<f64>,
    pub velocities: Matrix2xX<f64>,
    pub accelerations: Matrix2xX<f64>,
    pub forces: Matrix2xX<f64>,
    pub theta: DVector<f64>,
    pub omega: DVector<f64>,
    pub alpha: DVector<f64>,
    pub torques: DVector<f64>,
    pub masses: DVector<f64>,
    pub inertia: DVector<f64>,
    pub length: DVector<f64>,
    pub breadth: DVector<f64>,
    pub epsilon: DVector<f64>,
    pub well_ratio: DVector<f64>,
    pub charges: DVector<f64>,
    pub dipoles: DVector<f64>,
    pub friction: Vec<f64>,
    pub movable: Vec<bool>,
    pub alive: Vec<bool>,
}

impl Default for Bodies {
    fn default() -> Self {
        Self::new()
    }
}

impl Bodies {
    pub fn new() -> Self {
        Self {
            n_bodies: 0,
            positions: Matrix2xX::zeros(0),
            velocities: Matrix2xX::zeros(0),
            accelerations: Matrix2xX::zeros(0),
            forces: Matrix2xX::zeros(0),
            theta: DVector::zeros(0),
            omega: DVector::zeros(0),
            alpha: DVector::zeros(0),
            torques: DVector::zeros(0),
            masses: DVector::zeros(0),
            inertia: DVector::zeros(0),
            length: DVector::zeros(0),
            breadth: DVector::zeros(0),
            epsilon: DVector::zeros(0),
            well_ratio: DVector::zeros(0),
            charges: DVector::zeros(0),
            dipoles: DVector::zeros(0),
            friction: Vec::new(),
            movable: Vec::new(),
            alive: Vec::new(),
        }
    }

    pub fn push(&mut self, spec: &BodySpec) -> Result<usize> {
        spec.validate()?;
        let (velocity, omega) = if spec.movable {
            (spec.velocity, spec.omega)
        } else {
            (Vector2::zeros(), 0.0)
        };
        push_column(&mut self.positions, &spec.position);
        push_column(&mut self.velocities, &velocity);
        push_column(&mut self.accelerations, &Vector2::zeros());
        push_column(&mut self.forces, &Vector2::zeros());
        push_scalar(&mut self.theta, spec.theta);
        push_scalar(&mut self.omega, omega);
        push_scalar(&mut self.alpha, 0.0);
        push_scalar(&mut self.torques, 0.0);
        push_scalar(&mut self.masses, spec.mass);
        push_scalar(&mut self.inertia, spec.moment_of_inertia());
        push_scalar(&mut self.length, spec.length);
        push_scalar(&mut self.breadth, spec.breadth);
        push_scalar(&mut self.epsilon, spec.epsilon);
        push_scalar(&mut self.well_ratio, spec.well_ratio);
        push_scalar(&mut self.charges, spec.charge);
        push_scalar(&mut self.dipoles, spec.dipole);
        self.friction.push(spec.friction);
        self.movable.push(spec.movable);
        self.alive.push(true);
        self.n_bodies += 1;
        Ok(self.n_bodies - 1)
    }

    pub fn check(&self, index: usize) -> Result<()> {
        if index < self.n_bodies && self.alive[index] {
            Ok(())
        } else {
            Err(KineticaError::InvalidBodyIndex {
                index,
                n_bodies: self.n_bodies,
            })
        }
    }

    pub fn remove(&mut self, index: usize) -> Result<()> {
        self.check(index)?;
        self.alive[index] = false;
        self.velocities.set_column(index, &Vector2::zeros());
        self.accelerations.set_column(index, &Vector2::zeros());
        self.forces.set_column(index, &Vector2::zeros());
        self.omega[index] = 0.0;
        self.alpha[index] = 0.0;
        self.torques[index] = 0.0;
        Ok(())
    }

    pub fn live(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.n_bodies).filter(move |&i| self.alive[i])
    }

    pub fn mobile(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.n_bodies).filter(move |&i| self.alive[i] && self.movable[i])
    }

    pub fn n_live(&self) -> usize {
        self.live().count()
    }

    pub fn position(&self, i: usize) -> Vector2<f64> {
        self.positions.column(i).into_owned()
    }

    pub fn velocity(&self, i: usize) -> Vector2<f64> {
        self.velocities.column(i).into_owned()
    }

    pub fn shape(&self, i: usize) -> Shape {
        Shape {
            theta: self.theta[i],
            length: self.length[i],
            breadth: self.breadth[i],
            epsilon: self.epsilon[i],
            well_ratio: self.well_ratio[i],
        }
    }

    pub fn multipole(&self, i: usize) -> Multipole {
        Multipole {
            charge: self.charges[i],
            dipole: self.dipoles[i],
            theta: self.theta[i],
        }
    }

    pub fn kinetic_energy_i(&self, i: usize, units: &Units) -> f64 {
        let translational = self.masses[i] * self.velocities.column(i).norm_squared();
        let rotational = self.inertia[i] * self.omega[i] * self.omega[i];
        0.5 * (translational + rotational) * units.mvv_to_energy
    }

    pub fn kinetic_energy(&self, units: &Units) -> f64 {
        self.live().map(|i| self.kinetic_energy_i(i, units)).sum()
    }

    /// Three degrees of freedom per body: two translational, one rotational.
    pub fn temperature(&self, units: &Units) -> f64 {
        let n = self.n_live();
        if n == 0 {
            return 0.0;
        }
        2.0 * self.kinetic_energy(units) / (3.0 * n as f64 * units.boltzmann)
    }

    fn mobile_temperature(&self, units: &Units) -> f64 {
        let members: Vec<usize> = self.mobile().collect();
        if members.is_empty() {
            return 0.0;
        }
        let kinetic_energy: f64 = members.iter().map(|&i| self.kinetic_energy_i(i, units)).sum();
        2.0 * kinetic_energy / (3.0 * members.len() as f64 * units.boltzmann)
    }

    pub fn predict(&mut self, dt: f64, sim_box: &SimulationBox) {
        let dt2 = 0.5 * dt * dt;
        for i in 0..self.n_bodies {
            if !self.alive[i] || !self.movable[i] {
                continue;
            }
            let a_i = self.accelerations.column(i).into_owned();
            let mut r_i = self.position(i);
            let mut v_i = self.velocity(i);
            r_i += v_i * dt + a_i * dt2;
            v_i += a_i * dt;
            sim_box.apply_boundary_conditions_pos(&mut r_i, &mut v_i, 0.5 * self.breadth[i]);
            self.positions.set_column(i, &r_i);
            self.velocities.set_column(i, &v_i);

            self.theta[i] += self.omega[i] * dt + self.alpha[i] * dt2;
            self.omega[i] += self.alpha[i] * dt;
        }
    }

    fn current_accelerations(&self, i: usize, units: &Units) -> (Vector2<f64>, f64) {
        (
            self.forces.column(i) / (self.masses[i] * units.mvv_to_energy),
            self.torques[i] / (self.inertia[i] * units.mvv_to_energy),
        )
    }

    pub fn correct(&mut self, dt: f64, units: &Units) {
        let half_dt = 0.5 * dt;
        for i in 0..self.n_bodies {
            if !self.alive[i] {
                continue;
            }
            if !self.movable[i] {
                self.velocities.set_column(i, &Vector2::zeros());
                self.accelerations.set_column(i, &Vector2::zeros());
                self.omega[i] = 0.0;
                self.alpha[i] = 0.0;
                continue;
            }
            let (a_new, alpha_new) = self.current_accelerations(i, units);
            let a_old = self.accelerations.column(i).into_owned();
            let mut v_i = self.velocities.column_mut(i);
            v_i += (a_new - a_old) * half_dt;
            self.accelerations.set_column(i, &a_new);
            self.omega[i] += (alpha_new - self.alpha[i]) * half_dt;
            self.alpha[i] = alpha_new;
        }
    }

    pub fn prime_accelerations(&mut self, units: &Units) {
        for i in 0..self.n_bodies {
            let (a, alpha) = if self.alive[i] && self.movable[i] {
                self.current_accelerations(i, units)
            } else {
                (Vector2::zeros(), 0.0)
            };
            self.accelerations.set_column(i, &a);
            self.alpha[i] = alpha;
        }
    }

    fn sample_velocities<R: Rng>(&mut self, temperature: f64, units: &Units, rng: &mut R) {
        let members: Vec<usize> = self.mobile().collect();
        for &i in &members {
            let kt = units.boltzmann * temperature / units.mvv_to_energy;
            let sd_v = (kt / self.masses[i]).sqrt();
            let sd_w = (kt / self.inertia[i]).sqrt();
            match (Normal::new(0.0, sd_v), Normal::new(0.0, sd_w)) {
                (Ok(nv), Ok(nw)) if sd_v > 0.0 => {
                    self.velocities[(0, i)] = nv.sample(rng);
                    self.velocities[(1, i)] = nv.sample(rng);
                    self.omega[i] = nw.sample(rng);
                }
                _ => {
                    self.velocities.set_column(i, &Vector2::zeros());
                    self.omega[i] = 0.0;
                }
            }
        }
        if members.len() >= 2 {
            let total_mass: f64 = members.iter().map(|&i| self.masses[i]).sum();
            let momentum = members
                .iter()
                .fold(Vector2::zeros(), |p, &i| p + self.velocity(i) * self.masses[i]);
            let velocity_cm = momentum / total_mass;
            for &i in &members {
                let mut v_i = self.velocities.column_mut(i);
                v_i -= velocity_cm;
            }
        }
    }

    pub fn rescale_velocities(&mut self, ratio: f64) {
        for i in self.mobile().collect::<Vec<_>>() {
            let mut v_i = self.velocities.column_mut(i);
            v_i *= ratio;
            self.omega[i] *= ratio;
        }
    }

    pub fn start_velocities<R: Rng>(
        &mut self,
        temperature: f64,
        units: &Units,
        rng: &mut R,
    ) -> Result<()> {
        if temperature < 0.0 || !temperature.is_finite() {
            return Err(KineticaError::InvalidParameter {
                name: "temperature",
                value: temperature,
            });
        }
        self.sample_velocities(temperature, units, rng);
        let current = self.mobile_temperature(units);
        if self.mobile().count() >= 2 && current > 0.0 {
            self.rescale_velocities((temperature / current).sqrt());
        }
        Ok(())
    }

    pub fn rescale_to_temperature<R: Rng>(
        &mut self,
        temperature: f64,
        units: &Units,
        rng: &mut R,
    ) -> Result<()> {
        if temperature < 0.0 || !temperature.is_finite() {
            return Err(KineticaError::InvalidParameter {
                name: "temperature",
                value: temperature,
            });
        }
        let mut current = self.mobile_temperature(units);
        if current <= 0.0 {
            if temperature == 0.0 {
                return Ok(());
            }
            self.sample_velocities(SEED_TEMPERATURE, units, rng);
            current = self.mobile_temperature(units);
            if current <= 0.0 {
                return Ok(());
            }
        }
        self.rescale_velocities((temperature / current).sqrt());
        Ok(())
    }
}
