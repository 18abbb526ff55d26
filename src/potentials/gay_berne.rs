//! Gay-Berne interaction between elongated rigid bodies (Cleaver's form for unlike shapes),
//! and the charge/dipole electrostatics that goes with it.
//!
//! The energy is written as `U(R, a, b, c)` with `a = r̂·u_i`, `b = r̂·u_j`, `c = u_i·u_j`,
//! so forces and torques follow from its four partial derivatives.
use na::Vector2;

use crate::constants::{GB_CUTOFF_RATIO, MAX_SIGMA_RATIO_SQ};
use crate::math::{perp, unit};

/// Shape and well of one body, everything the pair kernel needs besides position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shape {
    pub theta: f64,
    pub length: f64,
    pub breadth: f64,
    pub epsilon: f64,
    /// Side-by-side over end-to-end well depth
    pub well_ratio: f64,
}

/// Force on `i` (minus that on `j`) and the torque on each body.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PairInteraction {
    pub energy: f64,
    pub force_i: Vector2<f64>,
    pub torque_i: f64,
    pub torque_j: f64,
}

/// Anisotropy term of both σ and ε, with partial derivatives in (a, b, c).
struct Anisotropy {
    value: f64,
    d_a: f64,
    d_b: f64,
    d_c: f64,
}

fn anisotropy(x_a: f64, x_b: f64, chi: f64, a: f64, b: f64, c: f64) -> Anisotropy {
    let plus = x_a * a * a + 2.0 * chi * a * b + x_b * b * b;
    let minus = x_a * a * a - 2.0 * chi * a * b + x_b * b * b;
    let p = 1.0 + chi * c;
    let m = 1.0 - chi * c;
    Anisotropy {
        value: 0.5 * (plus / p + minus / m),
        d_a: (x_a * a + chi * b) / p + (x_a * a - chi * b) / m,
        d_b: (x_b * b + chi * a) / p + (x_b * b - chi * a) / m,
        d_c: 0.5 * chi * (minus / (m * m) - plus / (p * p)),
    }
}

/// Shared exponents of the strength function.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GayBerne {
    pub mu: f64,
    pub nu: f64,
}

impl Default for GayBerne {
    fn default() -> Self {
        Self { mu: 2.0, nu: 1.0 }
    }
}

impl GayBerne {
    pub fn cutoff_sq(&self, si: &Shape, sj: &Shape) -> f64 {
        (GB_CUTOFF_RATIO * si.length.max(sj.length)).powi(2)
    }

    /// Contact-shape coefficients: (χ α², χ / α², χ).
    fn shape_coefficients(si: &Shape, sj: &Shape) -> (f64, f64, f64) {
        let (li2, di2) = (si.length * si.length, si.breadth * si.breadth);
        let (lj2, dj2) = (sj.length * sj.length, sj.breadth * sj.breadth);
        let x_a = (li2 - di2) / (li2 + dj2);
        let x_b = (lj2 - dj2) / (lj2 + di2);
        let chi = (x_a * x_b).max(0.0).sqrt();
        (x_a, x_b, chi)
    }

    fn chi_prime(&self, si: &Shape, sj: &Shape) -> f64 {
        let kappa = (si.well_ratio * sj.well_ratio).sqrt().powf(1.0 / self.mu);
        (kappa - 1.0) / (kappa + 1.0)
    }

    /// Pair term for `rij = r_i - r_j`. Returns zeros beyond the cutoff.
    pub fn compute(&self, si: &Shape, sj: &Shape, rij: &Vector2<f64>) -> PairInteraction {
        let r2 = rij.norm_squared();
        if r2 >= self.cutoff_sq(si, sj) || r2 == 0.0 {
            return PairInteraction::default();
        }
        let r = r2.sqrt();
        let rhat = rij / r;
        let (ui, uj) = (unit(si.theta), unit(sj.theta));
        let a = rhat.dot(&ui);
        let b = rhat.dot(&uj);
        let c = ui.dot(&uj);

        let sigma0 = (0.5 * (si.breadth * si.breadth + sj.breadth * sj.breadth)).sqrt();
        let epsilon0 = (si.epsilon * sj.epsilon).sqrt();

        // contact distance
        let (x_a, x_b, chi) = Self::shape_coefficients(si, sj);
        let h_sigma = anisotropy(x_a, x_b, chi, a, b, c);
        let sigma = sigma0 / (1.0 - h_sigma.value).sqrt();
        let dsigma = 0.5 * sigma.powi(3) / (sigma0 * sigma0);

        // strength
        let chi_p = self.chi_prime(si, sj);
        let h_eps = anisotropy(chi_p, chi_p, chi_p, a, b, c);
        let eps1_base = 1.0 - chi * chi * c * c;
        let eps1 = eps1_base.powf(-0.5);
        let eps2 = 1.0 - h_eps.value;
        let epsilon = epsilon0 * eps1.powf(self.nu) * eps2.powf(self.mu);
        let dln_eps_c = self.nu * chi * chi * c / eps1_base - self.mu * h_eps.d_c / eps2;
        let dln_eps_a = -self.mu * h_eps.d_a / eps2;
        let dln_eps_b = -self.mu * h_eps.d_b / eps2;

        // radial part, with the same overlap ceiling as the isotropic kernel
        let rho = ((r - sigma + sigma0) / sigma0).max(MAX_SIGMA_RATIO_SQ.sqrt().recip());
        let rho6 = rho.powi(-6);
        let rho12 = rho6 * rho6;
        let g = rho12 - rho6;
        let dg = (-12.0 * rho12 + 6.0 * rho6) / rho;

        let energy = 4.0 * epsilon * g;
        let u_r = 4.0 * epsilon * dg / sigma0;
        let partial = |dln_eps: f64, dh_sigma: f64| {
            4.0 * epsilon * (g * dln_eps - dg * dsigma * dh_sigma / sigma0)
        };
        let u_a = partial(dln_eps_a, h_sigma.d_a);
        let u_b = partial(dln_eps_b, h_sigma.d_b);
        let u_c = partial(dln_eps_c, h_sigma.d_c);

        let force_i = -(u_r * rhat + u_a * (ui - a * rhat) / r + u_b * (uj - b * rhat) / r);
        let (pi, pj) = (perp(&ui), perp(&uj));
        PairInteraction {
            energy,
            force_i,
            torque_i: -(u_a * rhat.dot(&pi) + u_c * pi.dot(&uj)),
            torque_j: -(u_b * rhat.dot(&pj) + u_c * ui.dot(&pj)),
        }
    }
}

/// Point charge plus a point dipole along the body axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Multipole {
    pub charge: f64,
    pub dipole: f64,
    pub theta: f64,
}

impl Multipole {
    pub fn is_neutral(&self) -> bool {
        self.charge == 0.0 && self.dipole == 0.0
    }

    pub fn moment(&self) -> Vector2<f64> {
        unit(self.theta) * self.dipole
    }
}

/// Charge-charge, charge-dipole and dipole-dipole terms for `rij = r_i - r_j`, scaled by
/// `strength` (Coulomb constant over dielectric). `min_r2` floors the squared separation.
pub fn electrostatic(
    strength: f64,
    mi: &Multipole,
    mj: &Multipole,
    rij: &Vector2<f64>,
    min_r2: f64,
) -> PairInteraction {
    if strength == 0.0 || mi.is_neutral() || mj.is_neutral() {
        return PairInteraction::default();
    }
    let r2 = rij.norm_squared().max(min_r2);
    let r = r2.sqrt();
    let inv_r3 = 1.0 / (r2 * r);
    let inv_r5 = inv_r3 / r2;
    let inv_r7 = inv_r5 / r2;
    let (pi, pj) = (mi.moment(), mj.moment());
    let (qi, qj) = (mi.charge, mj.charge);
    let pi_r = pi.dot(rij);
    let pj_r = pj.dot(rij);
    let pi_pj = pi.dot(&pj);

    let energy = strength
        * (qi * qj / r + qi * pj_r * inv_r3 - qj * pi_r * inv_r3
            + pi_pj * inv_r3
            - 3.0 * pi_r * pj_r * inv_r5);

    let grad = qi * qj * (-rij * inv_r3)
        + qi * (pj * inv_r3 - 3.0 * pj_r * inv_r5 * rij)
        - qj * (pi * inv_r3 - 3.0 * pi_r * inv_r5 * rij)
        - 3.0 * pi_pj * inv_r5 * rij
        - 3.0 * (pj_r * pi + pi_r * pj) * inv_r5
        + 15.0 * pi_r * pj_r * inv_r7 * rij;

    let d_pi = -qj * inv_r3 * rij + pj * inv_r3 - 3.0 * pj_r * inv_r5 * rij;
    let d_pj = qi * inv_r3 * rij + pi * inv_r3 - 3.0 * pi_r * inv_r5 * rij;

    PairInteraction {
        energy,
        force_i: -strength * grad,
        torque_i: -strength * d_pi.dot(&perp(&pi)),
        torque_j: -strength * d_pj.dot(&perp(&pj)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    fn rod(theta: f64) -> Shape {
        Shape {
            theta,
            length: 3.0,
            breadth: 1.0,
            epsilon: 1.0,
            well_ratio: 5.0,
        }
    }

    fn disc() -> Shape {
        Shape {
            theta: 0.4,
            length: 1.2,
            breadth: 1.2,
            epsilon: 0.5,
            well_ratio: 1.0,
        }
    }

    fn numeric_check(gb: &GayBerne, si: Shape, sj: Shape, rij: Vector2<f64>) {
        let h = 1e-6;
        let pair = gb.compute(&si, &sj, &rij);
        let e = |si: &Shape, sj: &Shape, r: Vector2<f64>| gb.compute(si, sj, &r).energy;

        let dx = Vector2::new(h, 0.0);
        let dy = Vector2::new(0.0, h);
        let fx = -(e(&si, &sj, rij + dx) - e(&si, &sj, rij - dx)) / (2.0 * h);
        let fy = -(e(&si, &sj, rij + dy) - e(&si, &sj, rij - dy)) / (2.0 * h);
        assert_relative_eq!(pair.force_i.x, fx, epsilon = 1e-5, max_relative = 1e-5);
        assert_relative_eq!(pair.force_i.y, fy, epsilon = 1e-5, max_relative = 1e-5);

        let turn = |s: &Shape, d: f64| Shape {
            theta: s.theta + d,
            ..*s
        };
        let ti = -(e(&turn(&si, h), &sj, rij) - e(&turn(&si, -h), &sj, rij)) / (2.0 * h);
        let tj = -(e(&si, &turn(&sj, h), rij) - e(&si, &turn(&sj, -h), rij)) / (2.0 * h);
        assert_relative_eq!(pair.torque_i, ti, epsilon = 1e-5, max_relative = 1e-5);
        assert_relative_eq!(pair.torque_j, tj, epsilon = 1e-5, max_relative = 1e-5);
    }

    #[test]
    fn contact_distance_of_like_rods() {
        let gb = GayBerne::default();
        // side by side the contact is the breadth
        let side = gb.compute(&rod(FRAC_PI_2), &rod(FRAC_PI_2), &Vector2::new(1.0, 0.0));
        assert_relative_eq!(side.energy, 0.0, epsilon = 1e-10);
        // end to end the contact is the length
        let end = gb.compute(&rod(0.0), &rod(0.0), &Vector2::new(3.0, 0.0));
        assert_relative_eq!(end.energy, 0.0, epsilon = 1e-10);
    }

    #[test]
    fn side_by_side_is_deeper_than_end_to_end() {
        let gb = GayBerne::default();
        let r_min = 2f64.powf(1.0 / 6.0);
        let side = gb.compute(&rod(FRAC_PI_2), &rod(FRAC_PI_2), &Vector2::new(r_min, 0.0));
        let end = gb.compute(&rod(0.0), &rod(0.0), &Vector2::new(2.0 + r_min, 0.0));
        assert!(side.energy < end.energy);
        assert!(end.energy < 0.0);
    }

    #[test]
    fn forces_and_torques_are_energy_gradients() {
        let gb = GayBerne::default();
        numeric_check(&gb, rod(0.3), rod(1.1), Vector2::new(3.4, 1.5));
        numeric_check(&gb, rod(-0.7), disc(), Vector2::new(-2.4, 2.2));
        numeric_check(
            &GayBerne { mu: 1.0, nu: 3.0 },
            disc(),
            rod(2.0),
            Vector2::new(0.9, -3.3),
        );
    }

    #[test]
    fn nothing_beyond_cutoff() {
        let gb = GayBerne::default();
        let far = gb.compute(&rod(0.0), &rod(0.0), &Vector2::new(7.6, 0.0));
        assert_eq!(far, PairInteraction::default());
    }

    #[test]
    fn electrostatics_match_gradients() {
        let mi = Multipole {
            charge: 0.5,
            dipole: 0.8,
            theta: 0.3,
        };
        let mj = Multipole {
            charge: -1.0,
            dipole: 0.4,
            theta: 2.2,
        };
        let rij = Vector2::new(1.3, -0.6);
        let h = 1e-6;
        let pair = electrostatic(2.0, &mi, &mj, &rij, 0.0);
        let e = |mi: &Multipole, mj: &Multipole, r: Vector2<f64>| {
            electrostatic(2.0, mi, mj, &r, 0.0).energy
        };
        let dx = Vector2::new(h, 0.0);
        let fx = -(e(&mi, &mj, rij + dx) - e(&mi, &mj, rij - dx)) / (2.0 * h);
        assert_relative_eq!(pair.force_i.x, fx, epsilon = 1e-6);

        let turn = |m: &Multipole, d: f64| Multipole {
            theta: m.theta + d,
            ..*m
        };
        let ti = -(e(&turn(&mi, h), &mj, rij) - e(&turn(&mi, -h), &mj, rij)) / (2.0 * h);
        let tj = -(e(&mi, &turn(&mj, h), rij) - e(&mi, &turn(&mj, -h), rij)) / (2.0 * h);
        assert_relative_eq!(pair.torque_i, ti, epsilon = 1e-6);
        assert_relative_eq!(pair.torque_j, tj, epsilon = 1e-6);
    }

    #[test]
    fn point_charges_reduce_to_coulomb() {
        let q = |charge| Multipole {
            charge,
            dipole: 0.0,
            theta: 0.0,
        };
        let pair = electrostatic(1.0, &q(1.0), &q(1.0), &Vector2::new(2.0, 0.0), 0.0);
        assert_relative_eq!(pair.energy, 0.5);
        assert_relative_eq!(pair.force_i.x, 0.25);
    }
}
