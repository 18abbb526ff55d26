use na::Vector2;

use crate::constants::MAX_SIGMA_RATIO_SQ;
use crate::potentials::potential::PairPotential;
use crate::species::PairParameters;

/// Lennard-Jones 12-6 between one species pair, with the optional cutoff shift and the
/// purely repulsive branch used for incompatible species.
#[derive(Debug, Clone, Copy)]
pub struct LennardJones {
    epsilon: f64,
    sigma: f64,
    rcut_sq: f64,
    shift: f64,
    repulsive: bool,
}

impl LennardJones {
    pub fn new(epsilon: f64, sigma: f64, rcut: f64, shift: bool) -> Self {
        let u_cutoff = if shift {
            let cutoff_inv2 = (sigma / rcut).powi(2);
            let cutoff_attraction = cutoff_inv2.powi(3);
            let cutoff_repulsion = cutoff_attraction.powi(2);
            4.0 * epsilon * (cutoff_repulsion - cutoff_attraction)
        } else {
            0.0
        };
        Self {
            epsilon,
            sigma,
            rcut_sq: rcut * rcut,
            shift: u_cutoff,
            repulsive: false,
        }
    }

    pub fn from_pair(params: &PairParameters) -> Self {
        Self {
            epsilon: params.epsilon,
            sigma: params.sigma,
            rcut_sq: params.cutoff_sq,
            shift: params.shift,
            repulsive: params.repulsive,
        }
    }
}

impl PairPotential for LennardJones {
    fn compute_potential(&self, rij: &Vector2<f64>, r2: f64) -> (f64, Vector2<f64>) {
        let inv_rij2 = 1.0 / r2;
        // overlap guard: the ratio never exceeds its ceiling
        let sr2 = (self.sigma * self.sigma * inv_rij2).min(MAX_SIGMA_RATIO_SQ);
        let vanderwaals_attraction = sr2.powi(3);
        let lj_repulsion = vanderwaals_attraction.powi(2);

        if self.repulsive {
            let potential_energy = 8.0 * self.epsilon * lj_repulsion - self.shift;
            let force = 96.0 * self.epsilon * lj_repulsion * inv_rij2 * rij;
            return (potential_energy, force);
        }

        let potential_energy =
            4.0 * self.epsilon * (lj_repulsion - vanderwaals_attraction) - self.shift;
        let force = 24.0
            * self.epsilon
            * (2.0 * lj_repulsion - vanderwaals_attraction)
            * inv_rij2
            * rij;
        (potential_energy, force)
    }

    fn get_rcut_sq(&self) -> f64 {
        self.rcut_sq
    }
}
