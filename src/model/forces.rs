use na::Vector2;

use crate::atoms::neighbour_list::for_each_pair_brute;
use crate::atoms::new::Atoms;
use crate::constants::{Units, MAX_SIGMA_RATIO_SQ};
use crate::model::ForceSwitches;
use crate::potentials::bonded::{BondSet, ExclusionTable};
use crate::potentials::coulomb::Coulomb;
use crate::potentials::fields::{
    friction_force, restraint_force, Field, FieldContributor, FieldProbe,
};
use crate::potentials::lennard_jones::LennardJones;
use crate::potentials::potential::{ForceAccumulator, PairPotential, PotentialTerms};
use crate::simulation_box::SimulationBox;
use crate::species::PairTable;

/// Read-only view of everything the atomic force evaluation depends on.
pub(crate) struct AtomicForces<'a> {
    pub atoms: &'a Atoms,
    pub bonds: &'a BondSet,
    pub sim_box: &'a SimulationBox,
    pub pairs: &'a PairTable,
    /// `None` when bonded pairs keep their non-bonded terms
    pub exclusions: Option<&'a ExclusionTable>,
    pub fields: &'a [Field],
    pub switches: ForceSwitches,
    pub units: &'a Units,
}

impl AtomicForces<'_> {
    fn separation(&self, i: usize, j: usize) -> Vector2<f64> {
        self.sim_box
            .min_image(self.atoms.position(i) - self.atoms.position(j))
    }

    fn is_excluded(&self, i: usize, j: usize) -> bool {
        self.exclusions.is_some_and(|table| table.contains(i, j))
    }

    /// Lennard-Jones for one candidate pair. Returns the energy it added.
    pub fn lennard_jones(
        &self,
        i: usize,
        j: usize,
        rij: &Vector2<f64>,
        r2: f64,
        acc: &mut ForceAccumulator,
    ) -> f64 {
        let params = self.pairs.get(self.atoms.species[i], self.atoms.species[j]);
        if r2 >= params.cutoff_sq || params.epsilon == 0.0 || self.is_excluded(i, j) {
            return 0.0;
        }
        let (uij, force_ij) = LennardJones::from_pair(params).compute_potential(rij, r2);
        acc.add_pair(i, j, &force_ij, uij);
        uij
    }

    /// Coulomb over every charged pair; the neighbour list is not consulted.
    pub fn coulomb(&self, acc: &mut ForceAccumulator) -> f64 {
        if !self.switches.coulomb {
            return 0.0;
        }
        let charged: Vec<usize> = self
            .atoms
            .live()
            .filter(|&i| self.atoms.charges[i] != 0.0)
            .collect();
        let mut potential_energy = 0.0;
        for (n, &i) in charged.iter().enumerate() {
            for &j in &charged[n + 1..] {
                if self.is_excluded(i, j) {
                    continue;
                }
                let sigma = self
                    .pairs
                    .get(self.atoms.species[i], self.atoms.species[j])
                    .sigma;
                let coulomb = Coulomb::new(
                    self.units.coulomb,
                    self.sim_box.dielectric,
                    self.atoms.charges[i],
                    self.atoms.charges[j],
                    sigma * sigma / MAX_SIGMA_RATIO_SQ,
                );
                let rij = self.separation(i, j);
                let (uij, force_ij) = coulomb.compute_potential(&rij, rij.norm_squared());
                acc.add_pair(i, j, &force_ij, uij);
                potential_energy += uij;
            }
        }
        potential_energy
    }

    pub fn bonded(&self, acc: &mut ForceAccumulator, terms: &mut PotentialTerms) {
        for bond in self.bonds.radial() {
            if bond.is_reactive() {
                terms.chemical -= bond.chemical_energy;
                acc.share(&[bond.i, bond.j], -bond.chemical_energy);
            }
            if !self.switches.radial_bonds {
                continue;
            }
            let (u, force) = bond.compute(&self.separation(bond.i, bond.j));
            acc.add_pair(bond.i, bond.j, &force, u);
            terms.radial_bond += u;
        }

        if !self.switches.angular_bonds {
            return;
        }
        for angle in self.bonds.angular() {
            let a = self.separation(angle.i, angle.vertex);
            let b = self.separation(angle.j, angle.vertex);
            let (u, f_i, f_j) = angle.compute(&a, &b);
            acc.add_force(angle.i, &f_i);
            acc.add_force(angle.j, &f_j);
            acc.add_force(angle.vertex, &-(f_i + f_j));
            acc.share(&angle.atoms(), u);
            terms.angular_bond += u;
        }
    }

    /// Fields, restraints and friction: everything acting on one atom at a time.
    pub fn external(&self, time: f64, acc: &mut ForceAccumulator, terms: &mut PotentialTerms) {
        let origin = self.sim_box.origin();
        let apply_fields = self.switches.fields && !self.fields.is_empty();
        for i in self.atoms.live() {
            let position = self.atoms.position(i);
            if apply_fields {
                let probe = FieldProbe {
                    position,
                    velocity: self.atoms.velocity(i),
                    mass: self.atoms.mass_i(i) * self.units.mvv_to_energy,
                    charge: self.atoms.charges[i],
                    dipole: Vector2::zeros(),
                };
                for field in self.fields {
                    let response = field.respond(&probe, time, &origin);
                    acc.add_single(i, &response.force, response.potential);
                    terms.field += response.potential;
                }
            }
            if self.switches.restraints {
                if let Some(restraint) = &self.atoms.restraints[i] {
                    let (force, u) = restraint_force(restraint, &position);
                    acc.add_single(i, &force, u);
                    terms.restraint += u;
                }
            }
            // velocity-dependent, so skipped by static evaluations
            if self.switches.friction && time >= 0.0 && self.atoms.friction[i] > 0.0 {
                let drag = friction_force(
                    self.atoms.friction[i],
                    self.sim_box.viscosity,
                    &self.atoms.velocity(i),
                );
                acc.add_force(i, &drag);
            }
        }
    }

    /// Every term that does not go through the neighbour list.
    pub fn unlisted(&self, time: f64, acc: &mut ForceAccumulator, terms: &mut PotentialTerms) {
        terms.coulomb += self.coulomb(acc);
        self.bonded(acc, terms);
        self.external(time, acc, terms);
    }

    /// Full evaluation over all pairs, independent of any cached list.
    pub fn brute_force(&self, time: f64) -> (PotentialTerms, ForceAccumulator) {
        let mut acc = ForceAccumulator::new(self.atoms.n_atoms);
        let mut terms = PotentialTerms::default();
        if self.atoms.n_live() >= 2 {
            for_each_pair_brute(self.atoms, self.sim_box, |i, j, rij, r2| {
                terms.lennard_jones += self.lennard_jones(i, j, &rij, r2, &mut acc);
            });
        }
        self.unlisted(time, &mut acc, &mut terms);
        (terms, acc)
    }
}
