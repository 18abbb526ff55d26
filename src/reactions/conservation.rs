use rand::Rng;

use crate::atoms::new::Atoms;
use crate::atoms::velocities::random_direction;
use crate::constants::{Units, KE_EPSILON};

/// Pays for a potential energy change `delta_v` out of the participants' kinetic energy.
/// Returns false, leaving every velocity untouched, when they cannot afford it.
pub fn conserve_locally<R: Rng>(
    atoms: &mut Atoms,
    participants: &[usize],
    delta_v: f64,
    units: &Units,
    rng: &mut R,
) -> bool {
    let mobile: Vec<usize> = participants
        .iter()
        .copied()
        .filter(|&i| atoms.is_live(i) && atoms.movable[i])
        .collect();
    let ke_before: f64 = mobile.iter().map(|&i| atoms.kinetic_energy_i(i, units)).sum();
    let ke_after = ke_before - delta_v;
    if ke_after < 0.0 {
        return false;
    }
    if mobile.is_empty() {
        return delta_v == 0.0;
    }

    if ke_before < KE_EPSILON {
        let share = ke_after / mobile.len() as f64;
        for &i in &mobile {
            let speed = (2.0 * share / (atoms.mass_i(i) * units.mvv_to_energy)).sqrt();
            let v = random_direction(speed, rng);
            atoms.set_velocity(i, &v);
        }
    } else {
        let lambda = (ke_after / ke_before).sqrt();
        for &i in &mobile {
            let mut v_i = atoms.velocities.column_mut(i);
            v_i *= lambda;
        }
    }
    true
}
