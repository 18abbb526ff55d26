use na::Vector2;
use rand::rngs::SmallRng;
use rand::SeedableRng;

use crate::bodies::{Bodies, BodySpec};
use crate::constants::{Units, DEFAULT_TIME_STEP, MAX_SIGMA_RATIO_SQ};
use crate::ensemble::heat_bath::HeatBath;
use crate::errors::{KineticaError, Result};
use crate::model::{check_time_step, ForceSwitches, StepReport};
use crate::potentials::fields::{friction_force, Field, FieldContributor, FieldProbe};
use crate::potentials::gay_berne::{electrostatic, GayBerne};
use crate::potentials::potential::{ForceAccumulator, PotentialTerms};
use crate::reactions::ReactionTally;
use crate::simulation_box::SimulationBox;

/// The mesoscale engine: rigid elliptical bodies under Gay-Berne, multipole electrostatics
/// and external fields. Every pair is visited on each evaluation.
#[derive(Debug, Clone)]
pub struct MesoModel {
    pub bodies: Bodies,
    sim_box: SimulationBox,
    units: Units,
    gay_berne: GayBerne,
    fields: Vec<Field>,
    switches: ForceSwitches,
    time_step: f64,
    time: f64,
    primed: bool,
    rng: SmallRng,
    heat_bath: Option<HeatBath>,
}

impl MesoModel {
    pub fn new(sim_box: SimulationBox, units: Units) -> Self {
        Self {
            bodies: Bodies::new(),
            sim_box,
            units,
            gay_berne: GayBerne::default(),
            fields: Vec::new(),
            switches: ForceSwitches::default(),
            time_step: DEFAULT_TIME_STEP,
            time: 0.0,
            primed: false,
            rng: SmallRng::seed_from_u64(0),
            heat_bath: None,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = SmallRng::seed_from_u64(seed);
        self
    }

    pub fn boundary(&self) -> &SimulationBox {
        &self.sim_box
    }

    pub fn units(&self) -> &Units {
        &self.units
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn time_step(&self) -> f64 {
        self.time_step
    }

    pub fn gay_berne(&self) -> &GayBerne {
        &self.gay_berne
    }

    pub fn set_gay_berne(&mut self, gay_berne: GayBerne) -> Result<()> {
        if !(gay_berne.mu > 0.0) {
            return Err(KineticaError::InvalidParameter {
                name: "Gay-Berne mu",
                value: gay_berne.mu,
            });
        }
        self.gay_berne = gay_berne;
        self.primed = false;
        Ok(())
    }

    pub fn set_time_step(&mut self, dt: f64) -> Result<()> {
        check_time_step(dt)?;
        self.time_step = dt;
        Ok(())
    }

    pub fn set_switches(&mut self, switches: ForceSwitches) {
        self.switches = switches;
        self.primed = false;
    }

    pub fn add_field(&mut self, field: Field) {
        self.fields.push(field);
        self.primed = false;
    }

    pub fn set_heat_bath(&mut self, heat_bath: Option<HeatBath>) {
        self.heat_bath = heat_bath;
    }

    pub fn add_body(&mut self, spec: BodySpec) -> Result<usize> {
        let index = self.bodies.push(&spec)?;
        self.primed = false;
        Ok(index)
    }

    pub fn remove_body(&mut self, index: usize) -> Result<()> {
        self.bodies.remove(index)?;
        self.primed = false;
        Ok(())
    }

    fn pair_terms(&self, acc: &mut ForceAccumulator, terms: &mut PotentialTerms) {
        if self.bodies.n_live() < 2 {
            return;
        }
        let live: Vec<usize> = self.bodies.live().collect();
        let strength = self.units.coulomb / self.sim_box.dielectric;
        for (n, &i) in live.iter().enumerate() {
            let si = self.bodies.shape(i);
            let mi = self.bodies.multipole(i);
            for &j in &live[n + 1..] {
                let sj = self.bodies.shape(j);
                let rij = self
                    .sim_box
                    .min_image(self.bodies.position(i) - self.bodies.position(j));

                if rij.norm_squared() < self.gay_berne.cutoff_sq(&si, &sj) {
                    let pair = self.gay_berne.compute(&si, &sj, &rij);
                    acc.add_pair(i, j, &pair.force_i, pair.energy);
                    acc.add_torque(i, pair.torque_i);
                    acc.add_torque(j, pair.torque_j);
                    terms.gay_berne += pair.energy;
                }

                if self.switches.coulomb {
                    let sigma0_sq = 0.5 * (si.breadth * si.breadth + sj.breadth * sj.breadth);
                    let mj = self.bodies.multipole(j);
                    let pair =
                        electrostatic(strength, &mi, &mj, &rij, sigma0_sq / MAX_SIGMA_RATIO_SQ);
                    acc.add_pair(i, j, &pair.force_i, pair.energy);
                    acc.add_torque(i, pair.torque_i);
                    acc.add_torque(j, pair.torque_j);
                    terms.electrostatic += pair.energy;
                }
            }
        }
    }

    fn external(&self, time: f64, acc: &mut ForceAccumulator, terms: &mut PotentialTerms) {
        let origin = self.sim_box.origin();
        for i in self.bodies.live() {
            if self.switches.fields {
                let probe = FieldProbe {
                    position: self.bodies.position(i),
                    velocity: self.bodies.velocity(i),
                    mass: self.bodies.masses[i] * self.units.mvv_to_energy,
                    charge: self.bodies.charges[i],
                    dipole: self.bodies.multipole(i).moment(),
                };
                for field in &self.fields {
                    let response = field.respond(&probe, time, &origin);
                    acc.add_single(i, &response.force, response.potential);
                    acc.add_torque(i, response.torque);
                    terms.field += response.potential;
                }
            }
            let gamma = self.bodies.friction[i];
            if self.switches.friction && time >= 0.0 && gamma > 0.0 {
                let viscosity = self.sim_box.viscosity;
                let drag = friction_force(gamma, viscosity, &self.bodies.velocity(i));
                acc.add_force(i, &drag);
                acc.add_torque(i, -gamma * viscosity * self.bodies.omega[i]);
            }
        }
    }

    /// Refills `bodies.forces` and `bodies.torques`. A negative `time` leaves out the
    /// velocity-dependent terms.
    pub fn compute_force(&mut self, time: f64) -> PotentialTerms {
        let mut acc = ForceAccumulator::new(self.bodies.n_bodies);
        let mut terms = PotentialTerms::default();
        self.pair_terms(&mut acc, &mut terms);
        self.external(time, &mut acc, &mut terms);
        self.bodies.forces = acc.forces;
        self.bodies.torques = acc.torques;
        terms
    }

    pub fn advance(&mut self, step: usize) -> StepReport {
        if !self.primed {
            self.compute_force(self.time);
            self.bodies.prime_accelerations(&self.units);
            self.primed = true;
        }
        let dt = self.time_step;
        self.bodies.predict(dt, &self.sim_box);
        self.time += dt;
        let potential = self.compute_force(self.time);
        self.bodies.correct(dt, &self.units);

        let kinetic = self.bodies.kinetic_energy(&self.units);
        let temperature = self.bodies.temperature(&self.units);
        if let Some(bath) = self.heat_bath.as_mut() {
            let lambda = bath.couple(temperature, kinetic);
            self.bodies.rescale_velocities(lambda);
        }

        let kinetic = self.bodies.kinetic_energy(&self.units);
        log::trace!(
            "meso step {step}: potential {:.6} kinetic {kinetic:.6}",
            potential.total()
        );
        StepReport {
            step,
            time: self.time,
            potential,
            kinetic,
            temperature: self.bodies.temperature(&self.units),
            neighbour_rebuilt: false,
            reactions: ReactionTally::default(),
        }
    }

    pub fn run(&mut self, steps: usize) -> Vec<StepReport> {
        (1..=steps).map(|step| self.advance(step)).collect()
    }

    pub fn kinetic_energy(&self) -> f64 {
        self.bodies.kinetic_energy(&self.units)
    }

    pub fn temperature(&self) -> f64 {
        self.bodies.temperature(&self.units)
    }

    pub fn set_temperature(&mut self, temperature: f64) -> Result<()> {
        self.bodies
            .rescale_to_temperature(temperature, &self.units, &mut self.rng)
    }

    pub fn assign_temperature(&mut self, temperature: f64) -> Result<()> {
        self.bodies
            .start_velocities(temperature, &self.units, &mut self.rng)
    }

    pub fn rescale_velocities(&mut self, ratio: f64) -> Result<()> {
        if ratio < 0.0 || !ratio.is_finite() {
            return Err(KineticaError::InvalidParameter {
                name: "velocity ratio",
                value: ratio,
            });
        }
        self.bodies.rescale_velocities(ratio);
        Ok(())
    }

    /// Net linear momentum of the live bodies.
    pub fn momentum(&self) -> Vector2<f64> {
        self.bodies.live().fold(Vector2::zeros(), |p, i| {
            p + self.bodies.velocity(i) * self.bodies.masses[i]
        })
    }
}
