//! Collision-driven chemistry: bonds break when overstretched and form or exchange partners
//! when atoms collide head-on, with the energy balance settled among the participants.
pub mod conservation;
pub mod scheme;

use std::ops::AddAssign;

use na::Vector2;
use rand::Rng;

use crate::atoms::new::Atoms;
use crate::constants::{Units, MAX_SIGMA_RATIO_SQ};
use crate::math::bond_angle;
use crate::model::ForceSwitches;
use crate::potentials::bonded::{AngularBond, BondSet, RadialBond};
use crate::potentials::coulomb::Coulomb;
use crate::potentials::lennard_jones::LennardJones;
use crate::potentials::potential::PairPotential;
use crate::reactions::conservation::conserve_locally;
use crate::reactions::scheme::{CollisionPattern, ReactionRule, ReactionScheme};
use crate::simulation_box::SimulationBox;
use crate::species::PairTable;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReactionTally {
    pub formed: usize,
    pub broken: usize,
    pub substituted: usize,
    /// Moves the participants could not pay for
    pub rejected: usize,
}

impl ReactionTally {
    pub fn changed_bonds(&self) -> bool {
        self.formed + self.broken + self.substituted > 0
    }
}

impl AddAssign for ReactionTally {
    fn add_assign(&mut self, other: Self) {
        self.formed += other.formed;
        self.broken += other.broken;
        self.substituted += other.substituted;
        self.rejected += other.rejected;
    }
}

/// Everything a reaction scan reads or mutates.
pub struct ReactionSite<'a> {
    pub atoms: &'a mut Atoms,
    pub bonds: &'a mut BondSet,
    pub sim_box: &'a SimulationBox,
    pub pairs: &'a PairTable,
    pub units: &'a Units,
    /// `exclude_bonded` decides whether a bond change also switches non-bonded terms
    pub switches: ForceSwitches,
}

impl ReactionSite<'_> {
    fn separation(&self, i: usize, j: usize) -> Vector2<f64> {
        self.sim_box
            .min_image(self.atoms.position(i) - self.atoms.position(j))
    }

    fn angle_at(&self, vertex: usize, a: usize, b: usize) -> f64 {
        bond_angle(&self.separation(a, vertex), &self.separation(b, vertex))
    }

    fn bend_energy(&self, angle: &AngularBond) -> f64 {
        angle.bend_energy(self.angle_at(angle.vertex, angle.i, angle.j))
    }

    fn equilibrium_length(&self, i: usize, j: usize, length_ratio: f64) -> f64 {
        let pair = self.pairs.get(self.atoms.species[i], self.atoms.species[j]);
        length_ratio * pair.sigma
    }

    /// Non-bonded energy of a pair that a radial bond between them would exclude. Zero when
    /// bonded pairs keep their non-bonded terms.
    fn exclusion_energy(&self, i: usize, j: usize) -> f64 {
        if !self.switches.exclude_bonded {
            return 0.0;
        }
        let rij = self.separation(i, j);
        let r2 = rij.norm_squared();
        let params = self.pairs.get(self.atoms.species[i], self.atoms.species[j]);
        let mut energy = 0.0;
        if r2 < params.cutoff_sq && params.epsilon != 0.0 {
            energy += LennardJones::from_pair(params).compute_potential(&rij, r2).0;
        }
        let (qi, qj) = (self.atoms.charges[i], self.atoms.charges[j]);
        if self.switches.coulomb && qi != 0.0 && qj != 0.0 {
            let coulomb = Coulomb::new(
                self.units.coulomb,
                self.sim_box.dielectric,
                qi,
                qj,
                params.sigma * params.sigma / MAX_SIGMA_RATIO_SQ,
            );
            energy += coulomb.compute_potential(&rij, r2).0;
        }
        energy
    }

    /// Kinetic energy of the relative motion along the line of centres.
    fn line_of_centers_energy(&self, i: usize, j: usize, rij: &Vector2<f64>) -> f64 {
        let (mi, mj) = (self.atoms.mass_i(i), self.atoms.mass_i(j));
        let mu = mi * mj / (mi + mj);
        let v_rel = self.atoms.velocity(i) - self.atoms.velocity(j);
        let radial = v_rel.dot(&(rij / rij.norm()));
        0.5 * mu * radial * radial * self.units.mvv_to_energy
    }
}

#[derive(Debug, Clone)]
pub struct ReactionEngine {
    pub scheme: ReactionScheme,
    /// When false, bond changes are applied without touching velocities
    pub conserve_energy: bool,
}

impl ReactionEngine {
    pub fn new(scheme: ReactionScheme) -> Self {
        Self {
            scheme,
            conserve_energy: true,
        }
    }

    fn settle<R: Rng>(
        &self,
        site: &mut ReactionSite<'_>,
        participants: &[usize],
        delta_v: f64,
        rng: &mut R,
    ) -> bool {
        !self.conserve_energy
            || conserve_locally(site.atoms, participants, delta_v, site.units, rng)
    }

    /// One reaction step: dissociation first, then the collisions among `candidates`.
    /// No atom takes part in more than one reaction.
    pub fn react<R: Rng>(
        &self,
        site: &mut ReactionSite<'_>,
        candidates: &[(usize, usize)],
        rng: &mut R,
    ) -> ReactionTally {
        let mut reacted = vec![false; site.atoms.n_atoms];
        let mut tally = self.dissociate(site, &mut reacted, rng);
        tally += self.collide(site, candidates, &mut reacted, rng);
        tally
    }

    pub fn dissociate<R: Rng>(
        &self,
        site: &mut ReactionSite<'_>,
        reacted: &mut [bool],
        rng: &mut R,
    ) -> ReactionTally {
        let mut tally = ReactionTally::default();
        let overstretched: Vec<RadialBond> = site
            .bonds
            .radial()
            .iter()
            .filter(|bond| bond.is_reactive())
            .filter(|bond| {
                let r = site.separation(bond.i, bond.j).norm();
                bond.stretch_energy(r) > bond.chemical_energy
            })
            .copied()
            .collect();

        for bond in overstretched {
            if reacted[bond.i] || reacted[bond.j] {
                continue;
            }
            let dependent = site.bonds.dependent_angular(bond.i, bond.j);
            let r = site.separation(bond.i, bond.j).norm();
            let bends: f64 = dependent.iter().map(|a| site.bend_energy(a)).sum();
            let delta_v = bond.chemical_energy - bond.stretch_energy(r) - bends
                + site.exclusion_energy(bond.i, bond.j);

            let mut participants = vec![bond.i, bond.j];
            participants.extend(dependent.iter().map(|a| a.third_atom(bond.i, bond.j)));
            if participants.iter().any(|&p| reacted[p]) {
                continue;
            }

            if !self.settle(site, &participants, delta_v, rng) {
                tally.rejected += 1;
                continue;
            }
            site.bonds.remove_radial(bond.i, bond.j);
            for &p in &participants {
                reacted[p] = true;
            }
            tally.broken += 1;
            log::debug!("bond {}-{} dissociated (dV = {delta_v:.4})", bond.i, bond.j);
        }
        tally
    }

    pub fn collide<R: Rng>(
        &self,
        site: &mut ReactionSite<'_>,
        candidates: &[(usize, usize)],
        reacted: &mut [bool],
        rng: &mut R,
    ) -> ReactionTally {
        let mut tally = ReactionTally::default();
        for &(i, j) in candidates {
            if reacted[i] || reacted[j] || !site.atoms.is_live(i) || !site.atoms.is_live(j) {
                continue;
            }
            if site.bonds.is_bonded(i, j) {
                continue;
            }
            let rij = site.separation(i, j);
            let pair = site.pairs.get(site.atoms.species[i], site.atoms.species[j]);
            if rij.norm_squared() >= pair.collision_sq {
                continue;
            }
            // approaching only: separating or grazing pairs never react
            let v_rel = site.atoms.velocity(i) - site.atoms.velocity(j);
            if v_rel.dot(&rij) >= 0.0 {
                continue;
            }

            let (radical_i, radical_j) = (site.bonds.is_radical(i), site.bonds.is_radical(j));
            let outcome = match (radical_i, radical_j) {
                (true, true) => self.form(site, i, j, &rij, rng),
                (true, false) => self.exchange(site, i, j, reacted, rng),
                (false, true) => self.exchange(site, j, i, reacted, rng),
                (false, false) => None,
            };

            match outcome {
                Some(Outcome::Applied {
                    participants,
                    channel,
                }) => {
                    for p in participants {
                        reacted[p] = true;
                    }
                    match channel {
                        Channel::Formed => tally.formed += 1,
                        Channel::Substituted => tally.substituted += 1,
                    }
                }
                Some(Outcome::Rejected) => tally.rejected += 1,
                None => {}
            }
        }
        tally
    }

    fn form<R: Rng>(
        &self,
        site: &mut ReactionSite<'_>,
        i: usize,
        j: usize,
        rij: &Vector2<f64>,
        rng: &mut R,
    ) -> Option<Outcome> {
        let (si, sj) = (site.atoms.species[i], site.atoms.species[j]);
        self.scheme.rule(&CollisionPattern::Radicals { a: si, b: sj })?;
        let params = *self.scheme.bond(si, sj)?;
        if params.energy <= 0.0 {
            return None;
        }
        let length = site.equilibrium_length(i, j, params.length_ratio);
        let bond =
            RadialBond::new(i, j, length, params.stiffness).with_chemical_energy(params.energy);
        let delta_v =
            bond.stretch_energy(rij.norm()) - params.energy - site.exclusion_energy(i, j);

        let participants = vec![i, j];
        if !self.settle(site, &participants, delta_v, rng) {
            return Some(Outcome::Rejected);
        }
        site.bonds.add_radial(bond).ok()?;
        log::debug!("bond {i}-{j} formed (dV = {delta_v:.4})");
        Some(Outcome::Applied {
            participants,
            channel: Channel::Formed,
        })
    }

    /// Radical `i` hits `j`, which holds exactly one bond.
    fn exchange<R: Rng>(
        &self,
        site: &mut ReactionSite<'_>,
        i: usize,
        j: usize,
        reacted: &[bool],
        rng: &mut R,
    ) -> Option<Outcome> {
        let partners = site.bonds.partners(j);
        if partners.len() != 1 || reacted[partners[0]] {
            return None;
        }
        let k = partners[0];
        let (si, sj, sk) = (
            site.atoms.species[i],
            site.atoms.species[j],
            site.atoms.species[k],
        );
        if self.scheme.valence(sj) > 1 {
            let pattern = CollisionPattern::Addition {
                attacker: si,
                vertex: sj,
                existing: sk,
            };
            let rule = *self.scheme.rule(&pattern)?;
            self.add(site, &rule, [i, j, k], rng)
        } else {
            let pattern = CollisionPattern::Substitution {
                attacker: si,
                target: sj,
                leaving: sk,
            };
            let rule = *self.scheme.rule(&pattern)?;
            self.substitute(site, &rule, [i, j, k], reacted, rng)
        }
    }

    fn substitute<R: Rng>(
        &self,
        site: &mut ReactionSite<'_>,
        rule: &ReactionRule,
        [i, j, k]: [usize; 3],
        reacted: &[bool],
        rng: &mut R,
    ) -> Option<Outcome> {
        let old = site.bonds.radial()[site.bonds.find_radial(j, k)?];
        if !old.is_reactive() {
            return None;
        }
        let params = *self
            .scheme
            .bond(site.atoms.species[i], site.atoms.species[j])?;
        if params.energy <= 0.0 {
            return None;
        }

        let rij = site.separation(i, j);
        let threshold = rule.activation.threshold(old.chemical_energy, params.energy);
        if site.line_of_centers_energy(i, j, &rij) <= threshold {
            return None;
        }

        let length = site.equilibrium_length(i, j, params.length_ratio);
        let new =
            RadialBond::new(i, j, length, params.stiffness).with_chemical_energy(params.energy);
        let dependent = site.bonds.dependent_angular(j, k);
        let r_jk = site.separation(j, k).norm();
        let bends: f64 = dependent.iter().map(|a| site.bend_energy(a)).sum();
        let delta_v = (new.stretch_energy(rij.norm()) - new.chemical_energy)
            - (old.stretch_energy(r_jk) - old.chemical_energy)
            - bends
            - site.exclusion_energy(i, j)
            + site.exclusion_energy(j, k);

        let mut participants = vec![i, j, k];
        for angle in &dependent {
            let third = angle.third_atom(j, k);
            if !participants.contains(&third) {
                participants.push(third);
            }
        }
        if participants.iter().any(|&p| reacted[p]) {
            return None;
        }
        if !self.settle(site, &participants, delta_v, rng) {
            return Some(Outcome::Rejected);
        }
        site.bonds.remove_radial(j, k);
        if site.bonds.add_radial(new).is_err() {
            // restore the leaving bond if the product cannot be stored
            let _ = site.bonds.add_radial(old);
            return None;
        }
        log::debug!("atom {i} took {j} from {k} (dV = {delta_v:.4})");
        Some(Outcome::Applied {
            participants,
            channel: Channel::Substituted,
        })
    }

    fn add<R: Rng>(
        &self,
        site: &mut ReactionSite<'_>,
        rule: &ReactionRule,
        [i, j, k]: [usize; 3],
        rng: &mut R,
    ) -> Option<Outcome> {
        let theta = site.angle_at(j, i, k);
        if let Some(gate) = &rule.gate {
            if !gate.admits(theta) {
                return None;
            }
        }
        let params = *self
            .scheme
            .bond(site.atoms.species[i], site.atoms.species[j])?;
        if params.energy <= 0.0 {
            return None;
        }
        let rij = site.separation(i, j);
        let threshold = rule.activation.threshold(0.0, params.energy);
        if site.line_of_centers_energy(i, j, &rij) <= threshold {
            return None;
        }

        let length = site.equilibrium_length(i, j, params.length_ratio);
        let bond =
            RadialBond::new(i, j, length, params.stiffness).with_chemical_energy(params.energy);
        let angle = rule.gate.map(|gate| AngularBond {
            i,
            j: k,
            vertex: j,
            angle: gate.angle,
            stiffness: gate.stiffness,
        });
        let bend = angle.as_ref().map_or(0.0, |a| a.bend_energy(theta));
        let delta_v = bond.stretch_energy(rij.norm()) - bond.chemical_energy + bend
            - site.exclusion_energy(i, j);

        let participants = vec![i, j, k];
        if !self.settle(site, &participants, delta_v, rng) {
            return Some(Outcome::Rejected);
        }
        site.bonds.add_radial(bond).ok()?;
        if let Some(angle) = angle {
            if site.bonds.add_angular(angle).is_err() {
                site.bonds.remove_radial(i, j);
                return None;
            }
        }
        log::debug!("atom {i} added to {j} next to {k} (dV = {delta_v:.4})");
        Some(Outcome::Applied {
            participants,
            channel: Channel::Formed,
        })
    }
}

enum Channel {
    Formed,
    Substituted,
}

enum Outcome {
    Applied {
        participants: Vec<usize>,
        channel: Channel,
    },
    Rejected,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atoms::new::AtomSpec;
    use crate::reactions::scheme::{SchemeEnergies, TETRAHEDRAL_ANGLE};
    use crate::simulation_box::BoundaryMode;
    use crate::species::{CutoffSettings, Species, SpeciesId, SpeciesTable};
    use approx::assert_relative_eq;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    struct World {
        atoms: Atoms,
        bonds: BondSet,
        sim_box: SimulationBox,
        pairs: PairTable,
        species: SpeciesTable,
        units: Units,
        switches: ForceSwitches,
    }

    impl World {
        fn new() -> Self {
            let mut species = SpeciesTable::new();
            species.add(Species::new("A", 1.0, 1.0, 0.1)).unwrap();
            species.add(Species::new("B", 2.0, 1.0, 0.1)).unwrap();
            let pairs = PairTable::build(&species, CutoffSettings::default());
            Self {
                atoms: Atoms::new(),
                bonds: BondSet::new(),
                sim_box: SimulationBox::new(0.0, 0.0, 20.0, 20.0, BoundaryMode::Reflective)
                    .unwrap(),
                pairs,
                species,
                units: Units::reduced(),
                switches: ForceSwitches {
                    exclude_bonded: false,
                    ..ForceSwitches::default()
                },
            }
        }

        fn add(&mut self, species: usize, x: f64, vx: f64) -> usize {
            self.add_at(species, x, 10.0, vx, 0.0)
        }

        fn add_at(&mut self, species: usize, x: f64, y: f64, vx: f64, vy: f64) -> usize {
            let id = SpeciesId(species);
            let s = self.species.get(id).unwrap().clone();
            self.atoms
                .push(&AtomSpec::new(id, x, y).with_velocity(vx, vy), &s)
        }

        /// Oxygen (species 1) at (10, 10) holding one hydrogen at (11, 10).
        fn hydroxyl(&mut self) -> (usize, usize) {
            let o = self.add_at(1, 10.0, 10.0, 0.0, 0.0);
            let h = self.add_at(0, 11.0, 10.0, 0.0, 0.0);
            self.bonds
                .add_radial(RadialBond::new(o, h, 1.0, 10.0).with_chemical_energy(1.0))
                .unwrap();
            (o, h)
        }

        fn site(&mut self) -> ReactionSite<'_> {
            ReactionSite {
                atoms: &mut self.atoms,
                bonds: &mut self.bonds,
                sim_box: &self.sim_box,
                pairs: &self.pairs,
                units: &self.units,
                switches: self.switches,
            }
        }
    }

    fn water() -> ReactionEngine {
        ReactionEngine::new(
            ReactionScheme::water(SpeciesId(0), SpeciesId(1), SchemeEnergies::default(), 0.2)
                .unwrap(),
        )
    }

    fn engine(energies: SchemeEnergies) -> ReactionEngine {
        ReactionEngine::new(ReactionScheme::a2_b2(SpeciesId(0), SpeciesId(1), energies).unwrap())
    }

    #[test]
    fn colliding_radicals_bond() {
        let mut world = World::new();
        let i = world.add(0, 10.0, 1.0);
        let j = world.add(0, 10.9, -1.0);
        let before = world.atoms.kinetic_energy(&world.units);
        let engine = engine(SchemeEnergies::default());
        let mut rng = SmallRng::seed_from_u64(1);
        let tally = engine.react(&mut world.site(), &[(i, j)], &mut rng);

        assert_eq!(tally.formed, 1);
        assert!(!world.bonds.is_radical(i) && !world.bonds.is_radical(j));
        let bond = world.bonds.radial()[0];
        let declared = bond.stretch_energy(0.9) - bond.chemical_energy;
        assert_relative_eq!(
            world.atoms.kinetic_energy(&world.units),
            before - declared,
            epsilon = 1e-12
        );
    }

    #[test]
    fn no_bond_without_positive_energy() {
        let mut world = World::new();
        let i = world.add(0, 10.0, 1.0);
        let j = world.add(0, 10.9, -1.0);
        let engine = engine(SchemeEnergies {
            first: 0.0,
            ..SchemeEnergies::default()
        });
        let mut rng = SmallRng::seed_from_u64(1);
        let tally = engine.react(&mut world.site(), &[(i, j)], &mut rng);
        assert_eq!(tally, ReactionTally::default());
        assert!(world.bonds.radial().is_empty());
    }

    #[test]
    fn separating_pairs_do_not_react() {
        let mut world = World::new();
        let i = world.add(0, 10.0, -1.0);
        let j = world.add(0, 10.9, 1.0);
        let mut rng = SmallRng::seed_from_u64(1);
        let engine = engine(SchemeEnergies::default());
        let tally = engine.react(&mut world.site(), &[(i, j)], &mut rng);
        assert_eq!(tally.formed, 0);
    }

    #[test]
    fn overstretched_bond_breaks_and_pays_back() {
        let mut world = World::new();
        let i = world.add(0, 10.0, 0.5);
        let j = world.add(0, 11.0, 0.0);
        world
            .bonds
            .add_radial(RadialBond::new(i, j, 0.4, 10.0).with_chemical_energy(1.0))
            .unwrap();
        let before = world.atoms.kinetic_energy(&world.units);
        let mut rng = SmallRng::seed_from_u64(1);
        let engine = engine(SchemeEnergies::default());
        let tally = engine.react(&mut world.site(), &[], &mut rng);
        assert_eq!(tally.broken, 1);
        // stretch energy 1.8 exceeds D = 1, the surplus goes to motion
        assert_relative_eq!(
            world.atoms.kinetic_energy(&world.units),
            before + 0.8,
            epsilon = 1e-12
        );
    }

    #[test]
    fn unaffordable_formation_is_rejected_untouched() {
        let mut world = World::new();
        let i = world.add(0, 10.0, 0.1);
        let j = world.add(0, 10.5, -0.1);
        let engine = engine(SchemeEnergies {
            first: 0.1,
            stiffness: 100.0,
            ..SchemeEnergies::default()
        });
        let before = world.atoms.velocities.clone();
        let mut rng = SmallRng::seed_from_u64(1);
        let tally = engine.react(&mut world.site(), &[(i, j)], &mut rng);
        // compressed to 0.5 of a unit-length bond: 12.5 - 0.1 cannot be paid from 0.01
        assert_eq!(tally.rejected, 1);
        assert!(world.bonds.radial().is_empty());
        assert_eq!(world.atoms.velocities, before);
    }

    #[test]
    fn substitution_needs_line_of_centers_energy() {
        let mut world = World::new();
        // B-B molecule hit by an A radical
        let a = world.add(0, 9.1, 3.0);
        let b1 = world.add(1, 10.0, 0.0);
        let b2 = world.add(1, 11.0, 0.0);
        world
            .bonds
            .add_radial(RadialBond::new(b1, b2, 1.0, 10.0).with_chemical_energy(1.0))
            .unwrap();

        let slow = engine(SchemeEnergies {
            cross: 0.5,
            activation: 5.0,
            ..SchemeEnergies::default()
        });
        let mut rng = SmallRng::seed_from_u64(2);
        assert_eq!(slow.react(&mut world.site(), &[(a, b1)], &mut rng).substituted, 0);

        let fast = engine(SchemeEnergies {
            cross: 1.5,
            activation: 0.1,
            ..SchemeEnergies::default()
        });
        let before = world.atoms.kinetic_energy(&world.units);
        let tally = fast.react(&mut world.site(), &[(a, b1)], &mut rng);
        assert_eq!(tally.substituted, 1);
        assert!(world.bonds.is_bonded(a, b1));
        assert!(world.bonds.is_radical(b2));

        let new = world.bonds.radial()[world.bonds.find_radial(a, b1).unwrap()];
        let declared = (new.stretch_energy(0.9) - 1.5) - (0.0 - 1.0);
        assert_relative_eq!(
            world.atoms.kinetic_energy(&world.units),
            before - declared,
            epsilon = 1e-12
        );
    }

    #[test]
    fn formation_charges_the_excluded_pair_energy() {
        let mut world = World::new();
        world.switches.exclude_bonded = true;
        let i = world.add(0, 10.0, 1.0);
        let j = world.add(0, 10.9, -1.0);
        let before = world.atoms.kinetic_energy(&world.units);
        let pair = *world.pairs.get(SpeciesId(0), SpeciesId(0));
        let sr6 = (1.0f64 / 0.9).powi(6);
        let lj = 4.0 * 0.1 * (sr6 * sr6 - sr6) - pair.shift;

        let mut rng = SmallRng::seed_from_u64(1);
        let engine = engine(SchemeEnergies::default());
        let tally = engine.react(&mut world.site(), &[(i, j)], &mut rng);
        assert_eq!(tally.formed, 1);
        let bond = world.bonds.radial()[0];
        let declared = bond.stretch_energy(0.9) - bond.chemical_energy - lj;
        assert_relative_eq!(
            world.atoms.kinetic_energy(&world.units),
            before - declared,
            epsilon = 1e-12
        );
    }

    #[test]
    fn addition_at_the_tetrahedral_angle_bends_the_molecule() {
        let mut world = World::new();
        let (o, h) = world.hydroxyl();
        let (c, s) = (TETRAHEDRAL_ANGLE.cos(), TETRAHEDRAL_ANGLE.sin());
        let i = world.add_at(0, 10.0 + 0.9 * c, 10.0 + 0.9 * s, -2.0 * c, -2.0 * s);
        let before = world.atoms.kinetic_energy(&world.units);

        let mut rng = SmallRng::seed_from_u64(3);
        let tally = water().react(&mut world.site(), &[(i, o)], &mut rng);
        assert_eq!(tally.formed, 1);
        assert_eq!(world.bonds.radial().len(), 2);
        assert!(world.bonds.is_bonded(i, o) && world.bonds.is_bonded(h, o));
        let angle = world.bonds.angular()[0];
        assert_eq!(world.bonds.angular().len(), 1);
        assert_eq!(angle.vertex, o);
        assert_relative_eq!(angle.angle, TETRAHEDRAL_ANGLE);

        // stretch of the new bond at 0.9, its well depth, and no bend at the gate angle
        let delta_v = 0.5 * 10.0 * 0.01 - 1.0;
        assert_relative_eq!(
            world.atoms.kinetic_energy(&world.units),
            before - delta_v,
            epsilon = 1e-9
        );
    }

    #[test]
    fn addition_outside_the_angle_window_is_ignored() {
        let mut world = World::new();
        let (o, _) = world.hydroxyl();
        let theta: f64 = 3.0;
        let (c, s) = (theta.cos(), theta.sin());
        let i = world.add_at(0, 10.0 + 0.9 * c, 10.0 + 0.9 * s, -2.0 * c, -2.0 * s);
        let velocities = world.atoms.velocities.clone();

        let mut rng = SmallRng::seed_from_u64(3);
        let tally = water().react(&mut world.site(), &[(i, o)], &mut rng);
        assert_eq!(tally, ReactionTally::default());
        assert_eq!(world.bonds.radial().len(), 1);
        assert!(world.bonds.angular().is_empty());
        assert_eq!(world.atoms.velocities, velocities);
    }

    #[test]
    fn substitution_drops_the_dependent_angle() {
        let mut world = World::new();
        let (o, j) = world.hydroxyl();
        let h2 = world.add_at(0, 10.0, 11.0, 0.0, 0.5);
        world
            .bonds
            .add_radial(RadialBond::new(o, h2, 1.0, 10.0).with_chemical_energy(1.0))
            .unwrap();
        let bend = AngularBond {
            i: j,
            j: h2,
            vertex: o,
            angle: TETRAHEDRAL_ANGLE,
            stiffness: 2.0,
        };
        world.bonds.add_angular(bend).unwrap();
        let i = world.add(0, 11.9, -2.0);
        let before = world.atoms.kinetic_energy(&world.units);

        let mut rng = SmallRng::seed_from_u64(4);
        let tally = water().react(&mut world.site(), &[(i, j)], &mut rng);
        assert_eq!(tally.substituted, 1);
        assert!(world.bonds.is_bonded(i, j));
        assert!(!world.bonds.is_bonded(j, o));
        assert!(world.bonds.angular().is_empty());

        // new H-H bond at 0.9, the unstrained O-H bond it replaces, and the released bend
        let released = bend.bend_energy(std::f64::consts::FRAC_PI_2);
        let delta_v = (0.5 * 10.0 * 0.01 - 1.0) - (0.0 - 1.0) - released;
        let after = world.atoms.kinetic_energy(&world.units);
        assert_relative_eq!(after, before - delta_v, epsilon = 1e-9);
        // the fourth atom shares the rescale
        assert_relative_eq!(
            world.atoms.velocity(h2).y,
            0.5 * (after / before).sqrt(),
            epsilon = 1e-12
        );
    }
}
