use std::ops::AddAssign;

use na::{DVector, Matrix2xX, Vector2};

/// A two-body interaction evaluated at separation `rij = r_i - r_j`.
pub trait PairPotential {
    /// Potential energy and the force acting on `i` (the force on `j` is its negative).
    fn compute_potential(&self, rij: &Vector2<f64>, r2: f64) -> (f64, Vector2<f64>);

    /// Squared separation beyond which the pair does not interact.
    fn get_rcut_sq(&self) -> f64;

    fn within_cutoff(&self, r2: f64) -> bool {
        r2 < self.get_rcut_sq()
    }
}

/// Potential energy broken down by contributor, as returned by one force evaluation.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PotentialTerms {
    pub lennard_jones: f64,
    pub coulomb: f64,
    pub radial_bond: f64,
    pub angular_bond: f64,
    /// Minus the dissociation depths of the chemically reactive bonds
    pub chemical: f64,
    pub restraint: f64,
    pub field: f64,
    pub gay_berne: f64,
    /// Charge and dipole interactions between anisotropic bodies
    pub electrostatic: f64,
}

impl PotentialTerms {
    pub fn total(&self) -> f64 {
        self.lennard_jones
            + self.coulomb
            + self.radial_bond
            + self.angular_bond
            + self.chemical
            + self.restraint
            + self.field
            + self.gay_berne
            + self.electrostatic
    }

    pub fn per_particle(&self, n_particles: usize) -> f64 {
        if n_particles == 0 {
            0.0
        } else {
            self.total() / n_particles as f64
        }
    }
}

impl AddAssign for PotentialTerms {
    fn add_assign(&mut self, other: Self) {
        self.lennard_jones += other.lennard_jones;
        self.coulomb += other.coulomb;
        self.radial_bond += other.radial_bond;
        self.angular_bond += other.angular_bond;
        self.chemical += other.chemical;
        self.restraint += other.restraint;
        self.field += other.field;
        self.gay_berne += other.gay_berne;
        self.electrostatic += other.electrostatic;
    }
}

/// Scratch space a force evaluation writes into: forces, torques and the share of
/// potential energy attributed to each particle.
#[derive(Debug, Clone)]
pub struct ForceAccumulator {
    pub forces: Matrix2xX<f64>,
    pub torques: DVector<f64>,
    pub per_particle: Vec<f64>,
}

impl ForceAccumulator {
    pub fn new(n: usize) -> Self {
        Self {
            forces: Matrix2xX::zeros(n),
            torques: DVector::zeros(n),
            per_particle: vec![0.0; n],
        }
    }

    /// Newton's third law: `force` acts on `i`, its negative on `j`.
    #[inline]
    pub fn add_pair(&mut self, i: usize, j: usize, force: &Vector2<f64>, energy: f64) {
        {
            let mut fi = self.forces.column_mut(i);
            fi += force;
        }
        {
            let mut fj = self.forces.column_mut(j);
            fj -= force;
        }
        self.per_particle[i] += 0.5 * energy;
        self.per_particle[j] += 0.5 * energy;
    }

    #[inline]
    pub fn add_single(&mut self, i: usize, force: &Vector2<f64>, energy: f64) {
        let mut fi = self.forces.column_mut(i);
        fi += force;
        self.per_particle[i] += energy;
    }

    pub fn add_force(&mut self, i: usize, force: &Vector2<f64>) {
        let mut fi = self.forces.column_mut(i);
        fi += force;
    }

    pub fn add_torque(&mut self, i: usize, torque: f64) {
        self.torques[i] += torque;
    }

    /// Splits `energy` evenly over `members`.
    pub fn share(&mut self, members: &[usize], energy: f64) {
        if members.is_empty() {
            return;
        }
        let part = energy / members.len() as f64;
        for &i in members {
            self.per_particle[i] += part;
        }
    }
}
