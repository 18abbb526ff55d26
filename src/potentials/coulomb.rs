use na::Vector2;

use crate::potentials::potential::PairPotential;

/// Screened Coulomb interaction between two point charges. It has no cutoff; a floor on the
/// squared separation keeps overlapping opposite charges finite.
#[derive(Debug, Clone, Copy)]
pub struct Coulomb {
    /// k q_i q_j / dielectric
    strength: f64,
    min_r2: f64,
}

impl Coulomb {
    pub fn new(coulomb_constant: f64, dielectric: f64, q_i: f64, q_j: f64, min_r2: f64) -> Self {
        Self {
            strength: coulomb_constant * q_i * q_j / dielectric,
            min_r2,
        }
    }

    pub fn is_active(&self) -> bool {
        self.strength != 0.0
    }
}

impl PairPotential for Coulomb {
    fn compute_potential(&self, rij: &Vector2<f64>, r2: f64) -> (f64, Vector2<f64>) {
        let r2 = r2.max(self.min_r2);
        let r = r2.sqrt();
        let potential_energy = self.strength / r;
        let force = self.strength / (r2 * r) * rij;
        (potential_energy, force)
    }

    fn get_rcut_sq(&self) -> f64 {
        f64::INFINITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn opposite_charges_attract() {
        let coulomb = Coulomb::new(14.4, 1.0, 1.0, -1.0, 0.0);
        let (u, f) = coulomb.compute_potential(&Vector2::new(2.0, 0.0), 4.0);
        assert_relative_eq!(u, -7.2, epsilon = 1e-12);
        // i is pulled towards j, i.e. against rij
        assert_relative_eq!(f.x, -3.6, epsilon = 1e-12);
    }

    #[test]
    fn dielectric_screens() {
        let vacuum = Coulomb::new(1.0, 1.0, 1.0, 1.0, 0.0);
        let water = Coulomb::new(1.0, 80.0, 1.0, 1.0, 0.0);
        let rij = Vector2::new(0.0, 1.0);
        assert_relative_eq!(
            vacuum.compute_potential(&rij, 1.0).0 / water.compute_potential(&rij, 1.0).0,
            80.0
        );
    }

    #[test]
    fn neutral_pairs_are_inactive() {
        assert!(!Coulomb::new(1.0, 1.0, 0.0, 1.0, 0.0).is_active());
        assert!(Coulomb::new(1.0, 1.0, 1.0, 1.0, 0.0).within_cutoff(1.0e12));
    }
}
