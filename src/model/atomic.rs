use na::{Matrix2xX, Vector2};
use rand::rngs::SmallRng;
use rand::SeedableRng;

use crate::atoms::neighbour_list::NeighbourList;
use crate::atoms::new::{square_lattice, AtomSpec, Atoms};
use crate::atoms::properties::Selection;
use crate::constants::{Units, DEFAULT_TIME_STEP};
use crate::ensemble::heat_bath::HeatBath;
use crate::errors::{KineticaError, Result};
use crate::model::forces::AtomicForces;
use crate::model::{check_time_step, ForceSwitches, StepReport};
use crate::potentials::bonded::{AngularBond, BondSet, ExclusionTable, Molecules, RadialBond};
use crate::potentials::fields::Field;
use crate::potentials::potential::{ForceAccumulator, PotentialTerms};
use crate::reactions::{ReactionEngine, ReactionSite, ReactionTally};
use crate::simulation_box::SimulationBox;
use crate::species::{Affinity, CutoffSettings, PairTable, Species, SpeciesId, SpeciesTable};

/// The atomic engine: point atoms under Lennard-Jones, Coulomb, bonds and external fields,
/// with optional collision chemistry and a heat bath.
///
/// Every derived table (pair parameters, neighbour list, bonded exclusions, molecules) is
/// rebuilt lazily from the version of the data it was derived from, so mutating the species
/// table or the bond set through the model never leaves a stale cache behind.
///
/// # Examples
///
/// ```
/// use kinetica::atoms::new::AtomSpec;
/// use kinetica::constants::Units;
/// use kinetica::model::atomic::AtomicModel;
/// use kinetica::simulation_box::SimulationBox;
/// use kinetica::species::{Species, SpeciesTable};
///
/// let mut species = SpeciesTable::new();
/// let ar = species.add(Species::new("Ar", 1.0, 1.0, 0.1)).unwrap();
/// let mut model = AtomicModel::new(species, SimulationBox::default(), Units::reduced());
/// model.add_atom(AtomSpec::new(ar, 10.0, 10.0)).unwrap();
/// model.add_atom(AtomSpec::new(ar, 11.5, 10.0)).unwrap();
/// model.set_time_step(0.005).unwrap();
/// let report = model.advance(1);
/// assert!(report.potential.lennard_jones < 0.0);
/// ```
#[derive(Debug, Clone)]
pub struct AtomicModel {
    pub atoms: Atoms,
    species: SpeciesTable,
    bonds: BondSet,
    sim_box: SimulationBox,
    units: Units,
    fields: Vec<Field>,
    switches: ForceSwitches,
    settings: CutoffSettings,
    pairs: PairTable,
    list: NeighbourList,
    exclusions: ExclusionTable,
    molecules: Molecules,
    time_step: f64,
    time: f64,
    /// Whether the stored accelerations match the current forces
    primed: bool,
    rng: SmallRng,
    heat_bath: Option<HeatBath>,
    reactions: Option<ReactionEngine>,
}

impl AtomicModel {
    pub fn new(species: SpeciesTable, sim_box: SimulationBox, units: Units) -> Self {
        let settings = CutoffSettings::default();
        let pairs = PairTable::build(&species, settings);
        Self {
            atoms: Atoms::new(),
            species,
            bonds: BondSet::new(),
            sim_box,
            units,
            fields: Vec::new(),
            switches: ForceSwitches::default(),
            settings,
            pairs,
            list: NeighbourList::new(),
            exclusions: ExclusionTable::default(),
            molecules: Molecules::default(),
            time_step: DEFAULT_TIME_STEP,
            time: 0.0,
            primed: false,
            rng: SmallRng::seed_from_u64(0),
            heat_bath: None,
            reactions: None,
        }
    }

    /// Reseeds the generator behind velocity sampling and reaction bookkeeping.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = SmallRng::seed_from_u64(seed);
        self
    }

    // accessors

    pub fn species(&self) -> &SpeciesTable {
        &self.species
    }

    pub fn bonds(&self) -> &BondSet {
        &self.bonds
    }

    pub fn boundary(&self) -> &SimulationBox {
        &self.sim_box
    }

    pub fn units(&self) -> &Units {
        &self.units
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn switches(&self) -> ForceSwitches {
        self.switches
    }

    pub fn cutoff_settings(&self) -> &CutoffSettings {
        &self.settings
    }

    pub fn pair_table(&self) -> &PairTable {
        &self.pairs
    }

    pub fn neighbour_list(&self) -> &NeighbourList {
        &self.list
    }

    pub fn time_step(&self) -> f64 {
        self.time_step
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn heat_bath(&self) -> Option<&HeatBath> {
        self.heat_bath.as_ref()
    }

    pub fn reactions(&self) -> Option<&ReactionEngine> {
        self.reactions.as_ref()
    }

    pub fn reactions_mut(&mut self) -> Option<&mut ReactionEngine> {
        self.reactions.as_mut()
    }

    // configuration

    fn update_settings(&mut self, settings: CutoffSettings) -> Result<()> {
        settings.validate()?;
        self.settings = settings;
        self.pairs = PairTable::build(&self.species, settings);
        self.list.invalidate();
        self.primed = false;
        Ok(())
    }

    /// Cutoff radius as a multiple of the pair sigma. Must stay below the list radius.
    pub fn set_cutoff(&mut self, cutoff: f64) -> Result<()> {
        self.update_settings(CutoffSettings {
            cutoff,
            ..self.settings
        })
    }

    pub fn set_list_radius(&mut self, list_radius: f64) -> Result<()> {
        self.update_settings(CutoffSettings {
            list_radius,
            ..self.settings
        })
    }

    /// Replaces cutoff, list radius and shift together, validated as a whole.
    pub fn set_cutoff_settings(&mut self, settings: CutoffSettings) -> Result<()> {
        self.update_settings(settings)
    }

    pub fn set_cutoff_shift(&mut self, shift: bool) -> Result<()> {
        self.update_settings(CutoffSettings {
            shift,
            ..self.settings
        })
    }

    pub fn set_time_step(&mut self, dt: f64) -> Result<()> {
        check_time_step(dt)?;
        self.time_step = dt;
        Ok(())
    }

    /// Replaces the cell and pulls every atom back inside it.
    pub fn set_boundary(&mut self, sim_box: SimulationBox) {
        self.sim_box = sim_box;
        self.enforce_boundary();
        self.list.invalidate();
        self.primed = false;
    }

    pub fn set_units(&mut self, units: Units) {
        self.units = units;
        self.primed = false;
    }

    pub fn set_switches(&mut self, switches: ForceSwitches) {
        self.switches = switches;
        self.primed = false;
    }

    pub fn add_field(&mut self, field: Field) {
        self.fields.push(field);
        self.primed = false;
    }

    pub fn clear_fields(&mut self) {
        self.fields.clear();
        self.primed = false;
    }

    pub fn set_heat_bath(&mut self, heat_bath: Option<HeatBath>) {
        self.heat_bath = heat_bath;
    }

    pub fn set_reactions(&mut self, reactions: Option<ReactionEngine>) {
        self.reactions = reactions;
    }

    // species

    pub fn add_species(&mut self, species: Species) -> Result<SpeciesId> {
        self.species.add(species)
    }

    /// Edits a species in place; atoms of that species pick up the new mass.
    pub fn update_species<F>(&mut self, id: SpeciesId, edit: F) -> Result<()>
    where
        F: FnOnce(&mut Species),
    {
        self.species.update(id, edit)?;
        self.atoms.refresh_masses(&self.species);
        self.primed = false;
        Ok(())
    }

    pub fn set_affinity(&mut self, a: SpeciesId, b: SpeciesId, affinity: Affinity) -> Result<()> {
        self.species.set_affinity(a, b, affinity)?;
        self.primed = false;
        Ok(())
    }

    // atoms

    pub fn add_atom(&mut self, spec: AtomSpec) -> Result<usize> {
        let species = self.species.get(spec.species)?;
        if spec.friction < 0.0 {
            return Err(KineticaError::InvalidParameter {
                name: "atom friction",
                value: spec.friction,
            });
        }
        let index = self.atoms.push(&spec, species);
        self.list.invalidate();
        self.primed = false;
        Ok(index)
    }

    /// Places an `nx` by `ny` square lattice of atoms and returns their indices.
    pub fn add_lattice(
        &mut self,
        species: SpeciesId,
        origin: Vector2<f64>,
        nx: usize,
        ny: usize,
        spacing: f64,
    ) -> Result<Vec<usize>> {
        let template = self.species.get(species)?;
        let specs: Vec<AtomSpec> = square_lattice(origin, nx, ny, spacing)?
            .iter()
            .map(|site| AtomSpec::new(species, site.x, site.y))
            .collect();
        let indices = self.atoms.extend(&specs, template).collect();
        self.list.invalidate();
        self.primed = false;
        Ok(indices)
    }

    /// Removes an atom together with every bond that references it.
    pub fn remove_atom(&mut self, index: usize) -> Result<()> {
        self.atoms.check(index)?;
        let dropped = self.bonds.remove_atom(index);
        self.atoms.remove(index)?;
        if dropped > 0 {
            log::debug!("removing atom {index} dropped {dropped} bonds");
        }
        self.list.invalidate();
        self.primed = false;
        Ok(())
    }

    /// Applies the boundary rules to the current positions, e.g. after a manual move.
    pub fn enforce_boundary(&mut self) {
        self.atoms.enforce_boundary(&self.sim_box, &self.species);
    }

    // bonds

    pub fn add_radial_bond(&mut self, bond: RadialBond) -> Result<usize> {
        self.atoms.check(bond.i)?;
        self.atoms.check(bond.j)?;
        let index = self.bonds.add_radial(bond)?;
        self.primed = false;
        Ok(index)
    }

    /// Removes the bond between `a` and `b` and the angular bonds built on it.
    pub fn remove_radial_bond(
        &mut self,
        a: usize,
        b: usize,
    ) -> Option<(RadialBond, Vec<AngularBond>)> {
        let removed = self.bonds.remove_radial(a, b);
        if removed.is_some() {
            self.primed = false;
        }
        removed
    }

    pub fn add_angular_bond(&mut self, bond: AngularBond) -> Result<usize> {
        for atom in bond.atoms() {
            self.atoms.check(atom)?;
        }
        let index = self.bonds.add_angular(bond)?;
        self.primed = false;
        Ok(index)
    }

    pub fn remove_angular_bond(&mut self, i: usize, j: usize, vertex: usize) -> Option<AngularBond> {
        let removed = self.bonds.remove_angular(i, j, vertex);
        if removed.is_some() {
            self.primed = false;
        }
        removed
    }

    /// Connected components of the bond graph, re-derived when the bonds have changed.
    pub fn molecules(&mut self) -> &Molecules {
        if !self.molecules.is_current(&self.bonds, self.atoms.n_atoms) {
            self.molecules = Molecules::build(&self.bonds, &self.atoms.alive);
        }
        &self.molecules
    }

    // forces

    fn refresh_tables(&mut self) {
        if !self.pairs.is_current(&self.species, &self.settings) {
            self.pairs = PairTable::build(&self.species, self.settings);
            self.list.invalidate();
        }
        if self.switches.exclude_bonded && !self.exclusions.is_current(&self.bonds) {
            self.exclusions = ExclusionTable::build(&self.bonds);
        }
    }

    fn force_field<'a>(
        &'a self,
        pairs: &'a PairTable,
        exclusions: &'a ExclusionTable,
    ) -> AtomicForces<'a> {
        AtomicForces {
            atoms: &self.atoms,
            bonds: &self.bonds,
            sim_box: &self.sim_box,
            pairs,
            exclusions: self.switches.exclude_bonded.then_some(exclusions),
            fields: &self.fields,
            switches: self.switches,
            units: &self.units,
        }
    }

    /// Zeroes and refills `atoms.forces`. Reports whether the neighbour list was rebuilt.
    fn evaluate(&mut self, time: f64) -> (PotentialTerms, bool) {
        self.refresh_tables();
        let mut list = std::mem::take(&mut self.list);
        let mut acc = ForceAccumulator::new(self.atoms.n_atoms);
        let mut terms = PotentialTerms::default();
        let mut rebuilt = false;

        let forces = self.force_field(&self.pairs, &self.exclusions);
        // a lone atom has no pairwise terms, so the list is left alone
        if self.atoms.n_live() >= 2 {
            let mut visit = |i: usize, j: usize, rij: Vector2<f64>, r2: f64| {
                terms.lennard_jones += forces.lennard_jones(i, j, &rij, r2, &mut acc);
            };
            if list.needs_rebuild(&self.atoms, &self.sim_box, &self.pairs) {
                list.rebuild_with(&self.atoms, &self.sim_box, &self.pairs, &mut visit);
                rebuilt = true;
            } else {
                list.for_each_pair(&self.atoms, &self.sim_box, &mut visit);
            }
        }
        forces.unlisted(time, &mut acc, &mut terms);

        self.list = list;
        self.atoms.forces = acc.forces;
        (terms, rebuilt)
    }

    /// Evaluates every enabled contributor at the current positions and writes the totals
    /// into `atoms.forces`. A negative `time` leaves out velocity-dependent terms.
    pub fn compute_force(&mut self, time: f64) -> PotentialTerms {
        self.evaluate(time).0
    }

    /// Brute-force evaluation that leaves the model untouched.
    fn evaluate_detached(&self, time: f64) -> (PotentialTerms, ForceAccumulator) {
        let fresh_pairs;
        let pairs = if self.pairs.is_current(&self.species, &self.settings) {
            &self.pairs
        } else {
            fresh_pairs = PairTable::build(&self.species, self.settings);
            &fresh_pairs
        };
        let fresh_exclusions;
        let exclusions = if self.exclusions.is_current(&self.bonds) {
            &self.exclusions
        } else {
            fresh_exclusions = ExclusionTable::build(&self.bonds);
            &fresh_exclusions
        };
        self.force_field(pairs, exclusions).brute_force(time)
    }

    /// Forces and energies from the all-pairs path, without touching any cached list.
    pub fn compute_force_brute_force(&self, time: f64) -> (PotentialTerms, Matrix2xX<f64>) {
        let (terms, acc) = self.evaluate_detached(time);
        (terms, acc.forces)
    }

    // dynamics

    fn mobile_thermal_state(&self) -> (f64, f64) {
        let mobile: Vec<usize> = self.atoms.mobile().collect();
        let kinetic_energy: f64 = mobile
            .iter()
            .map(|&i| self.atoms.kinetic_energy_i(i, &self.units))
            .sum();
        let temperature = self
            .atoms
            .current_temperature(kinetic_energy, mobile.len(), &self.units);
        (kinetic_energy, temperature)
    }

    fn couple_heat_bath(&mut self) {
        let (kinetic_energy, temperature) = self.mobile_thermal_state();
        if let Some(bath) = self.heat_bath.as_mut() {
            let lambda = bath.couple(temperature, kinetic_energy);
            self.atoms.rescale_velocities(lambda, &Selection::all());
        }
    }

    fn react(&mut self) -> ReactionTally {
        let Some(engine) = self.reactions.as_ref() else {
            return ReactionTally::default();
        };
        let mut candidates = Vec::new();
        let (atoms, pairs) = (&self.atoms, &self.pairs);
        self.list.for_each_pair(atoms, &self.sim_box, |i, j, _, r2| {
            if r2 < pairs.get(atoms.species[i], atoms.species[j]).collision_sq {
                candidates.push((i, j));
            }
        });
        let mut site = ReactionSite {
            atoms: &mut self.atoms,
            bonds: &mut self.bonds,
            sim_box: &self.sim_box,
            pairs: &self.pairs,
            units: &self.units,
            switches: self.switches,
        };
        engine.react(&mut site, &candidates, &mut self.rng)
    }

    /// One predict, force, correct, heat bath and reaction cycle.
    pub fn advance(&mut self, step: usize) -> StepReport {
        if !self.primed {
            self.evaluate(self.time);
            self.atoms.prime_accelerations(&self.units);
            self.primed = true;
        }
        let dt = self.time_step;
        self.atoms.predict(dt, &self.sim_box, &self.species);
        self.time += dt;
        let (mut potential, neighbour_rebuilt) = self.evaluate(self.time);
        self.atoms.correct(dt, &self.units);
        self.couple_heat_bath();

        let reactions = self.react();
        if reactions.changed_bonds() {
            potential = self.evaluate(self.time).0;
            self.atoms.prime_accelerations(&self.units);
        }

        let kinetic = self.atoms.kinetic_energy(&self.units);
        let (_, temperature) = self.mobile_thermal_state();
        log::trace!(
            "step {step}: potential {:.6} kinetic {kinetic:.6} total {:.6}",
            potential.total(),
            potential.total() + kinetic
        );
        StepReport {
            step,
            time: self.time,
            potential,
            kinetic,
            temperature,
            neighbour_rebuilt,
            reactions,
        }
    }

    pub fn run(&mut self, steps: usize) -> Vec<StepReport> {
        (1..=steps).map(|step| self.advance(step)).collect()
    }

    // thermostat

    pub fn set_temperature(&mut self, temperature: f64) -> Result<()> {
        self.set_temperature_of(temperature, &Selection::all())
    }

    /// Rescales the selection to `temperature`; a frozen selection is seeded first.
    pub fn set_temperature_of(&mut self, temperature: f64, selection: &Selection) -> Result<()> {
        self.atoms.rescale_to_temperature(
            temperature,
            selection,
            &self.units,
            &self.species,
            &mut self.rng,
        )
    }

    pub fn assign_temperature(&mut self, temperature: f64) -> Result<()> {
        self.assign_temperature_of(temperature, &Selection::all())
    }

    /// Fresh Maxwell-Boltzmann velocities with the net drift removed.
    pub fn assign_temperature_of(&mut self, temperature: f64, selection: &Selection) -> Result<()> {
        self.atoms.start_velocities(
            temperature,
            selection,
            &self.units,
            &self.species,
            &mut self.rng,
        )
    }

    pub fn transfer_heat(&mut self, amount: f64) -> f64 {
        self.transfer_heat_of(amount, &Selection::all())
    }

    /// Changes each selected atom's kinetic energy by `amount`; returns the net energy added.
    pub fn transfer_heat_of(&mut self, amount: f64, selection: &Selection) -> f64 {
        self.atoms
            .transfer_heat(amount, selection, &self.units, &mut self.rng)
    }

    pub fn rescale_velocities(&mut self, ratio: f64) -> Result<()> {
        self.rescale_velocities_of(ratio, &Selection::all())
    }

    pub fn rescale_velocities_of(&mut self, ratio: f64, selection: &Selection) -> Result<()> {
        if ratio < 0.0 || !ratio.is_finite() {
            return Err(KineticaError::InvalidParameter {
                name: "velocity ratio",
                value: ratio,
            });
        }
        self.atoms.rescale_velocities(ratio, selection);
        Ok(())
    }

    // energy queries

    pub fn kinetic_energy(&self) -> f64 {
        self.atoms.kinetic_energy(&self.units)
    }

    pub fn kinetic_energy_of(&self, selection: &Selection) -> f64 {
        self.atoms.kinetic_energy_of(selection, &self.units)
    }

    /// Potential energy by contributor, recomputed from the current positions.
    pub fn potential_terms(&self) -> PotentialTerms {
        self.evaluate_detached(self.time).0
    }

    pub fn potential_energy(&self) -> f64 {
        self.potential_terms().total()
    }

    pub fn potential_energy_per_atom(&self) -> f64 {
        self.potential_terms().per_particle(self.atoms.n_live())
    }

    /// Potential energy attributed to the selected atoms: half of each pair term, a third of
    /// each angular term, all of a single-atom term.
    pub fn potential_energy_of(&self, selection: &Selection) -> f64 {
        let (_, acc) = self.evaluate_detached(self.time);
        self.atoms
            .selected(selection)
            .map(|i| acc.per_particle[i])
            .sum()
    }

    pub fn total_energy(&self) -> f64 {
        self.kinetic_energy() + self.potential_energy()
    }

    pub fn temperature(&self) -> f64 {
        self.mobile_thermal_state().1
    }

    pub fn temperature_of(&self, selection: &Selection) -> f64 {
        self.atoms.temperature_of(selection, &self.units)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atoms::properties::Region;
    use crate::simulation_box::BoundaryMode;
    use approx::assert_relative_eq;

    fn argon_box(mode: BoundaryMode) -> (AtomicModel, SpeciesId) {
        let mut species = SpeciesTable::new();
        let ar = species.add(Species::new("Ar", 1.0, 1.0, 0.1)).unwrap();
        let sim_box = SimulationBox::new(0.0, 0.0, 20.0, 20.0, mode).unwrap();
        let mut model = AtomicModel::new(species, sim_box, Units::reduced());
        model.set_time_step(0.005).unwrap();
        (model, ar)
    }

    #[test]
    fn invalid_configuration_leaves_state_untouched() {
        let (mut model, _) = argon_box(BoundaryMode::Reflective);
        assert!(matches!(
            model.set_cutoff(-1.0),
            Err(KineticaError::InvalidCutoff { .. })
        ));
        assert!(matches!(
            model.set_list_radius(2.0),
            Err(KineticaError::InvalidListRadius { .. })
        ));
        assert!(matches!(
            model.set_time_step(0.0),
            Err(KineticaError::InvalidTimeStep { .. })
        ));
        assert_eq!(*model.cutoff_settings(), CutoffSettings::default());
        assert_relative_eq!(model.time_step(), 0.005);
        assert!(model.add_atom(AtomSpec::new(SpeciesId(3), 1.0, 1.0)).is_err());
        assert_eq!(model.atoms.n_atoms, 0);
    }

    #[test]
    fn negative_lattice_spacing_is_rejected() {
        let (mut model, ar) = argon_box(BoundaryMode::Reflective);
        let result = model.add_lattice(ar, Vector2::new(1.0, 1.0), 3, 3, -1.0);
        assert!(matches!(result, Err(KineticaError::NegativeSpacing { .. })));
        assert_eq!(model.atoms.n_atoms, 0);
        let placed = model.add_lattice(ar, Vector2::new(1.0, 1.0), 3, 2, 1.5).unwrap();
        assert_eq!(placed, (0..6).collect::<Vec<_>>());
        assert_eq!(model.atoms.position(5), Vector2::new(4.0, 2.5));
    }

    #[test]
    fn excluded_bonded_pairs_skip_lennard_jones() {
        let (mut model, ar) = argon_box(BoundaryMode::Reflective);
        model.add_atom(AtomSpec::new(ar, 5.0, 5.0)).unwrap();
        model.add_atom(AtomSpec::new(ar, 6.2, 5.0)).unwrap();
        let free = model.compute_force(0.0).lennard_jones;
        assert!(free < 0.0);

        model.add_radial_bond(RadialBond::new(0, 1, 1.2, 5.0)).unwrap();
        let terms = model.compute_force(0.0);
        assert_eq!(terms.lennard_jones, 0.0);
        assert_relative_eq!(terms.radial_bond, 0.0);

        model.set_switches(ForceSwitches {
            exclude_bonded: false,
            ..ForceSwitches::default()
        });
        assert_relative_eq!(model.compute_force(0.0).lennard_jones, free);
    }

    #[test]
    fn removing_an_atom_drops_its_bonds() {
        let (mut model, ar) = argon_box(BoundaryMode::Reflective);
        for x in [4.0, 5.0, 6.0] {
            model.add_atom(AtomSpec::new(ar, x, 5.0)).unwrap();
        }
        model.add_radial_bond(RadialBond::new(0, 1, 1.0, 5.0)).unwrap();
        model.add_radial_bond(RadialBond::new(1, 2, 1.0, 5.0)).unwrap();
        assert_eq!(model.molecules().len(), 1);

        model.remove_atom(1).unwrap();
        assert!(model.bonds().radial().is_empty());
        assert_eq!(model.molecules().len(), 2);
        assert!(model.add_radial_bond(RadialBond::new(0, 1, 1.0, 5.0)).is_err());
    }

    #[test]
    fn single_atom_still_feels_fields() {
        let (mut model, ar) = argon_box(BoundaryMode::Open);
        model.add_atom(AtomSpec::new(ar, 5.0, 5.0)).unwrap();
        model.add_field(Field::gravity(2.0));
        let terms = model.compute_force(0.0);
        assert_relative_eq!(terms.field, 10.0);
        assert_relative_eq!(model.atoms.forces[(1, 0)], -2.0);
        assert!(model.neighbour_list().is_empty());
    }

    #[test]
    fn uniform_acceleration_is_unit_independent() {
        let mut species = SpeciesTable::new();
        let ar = species.add(Species::new("Ar", 39.948, 3.4, 0.0103)).unwrap();
        let sim_box = SimulationBox::new(0.0, 0.0, 50.0, 50.0, BoundaryMode::Open).unwrap();
        let units = Units::workbench();
        let mut model = AtomicModel::new(species, sim_box, units);
        model.add_atom(AtomSpec::new(ar, 5.0, 5.0)).unwrap();
        model.add_field(Field::Acceleration {
            a: 1e-4,
            direction: Vector2::x(),
        });
        let terms = model.compute_force(0.0);
        let acceleration = model.atoms.current_acceleration(0, &units);
        assert_relative_eq!(acceleration.x, 1e-4, epsilon = 1e-15);
        assert_relative_eq!(acceleration.y, 0.0);
        assert_relative_eq!(
            terms.field,
            -39.948 * units.mvv_to_energy * 1e-4 * 5.0,
            epsilon = 1e-15
        );
    }

    #[test]
    fn static_evaluation_skips_friction() {
        let (mut model, ar) = argon_box(BoundaryMode::Open);
        model
            .add_atom(AtomSpec::new(ar, 5.0, 5.0).with_velocity(1.0, 0.0).with_friction(0.5))
            .unwrap();
        model.compute_force(0.0);
        assert_relative_eq!(model.atoms.forces[(0, 0)], -0.5);
        model.compute_force(-1.0);
        assert_eq!(model.atoms.forces[(0, 0)], 0.0);
    }

    #[test]
    fn species_edits_reach_the_pair_table() {
        let (mut model, ar) = argon_box(BoundaryMode::Reflective);
        model.add_atom(AtomSpec::new(ar, 5.0, 5.0)).unwrap();
        model.add_atom(AtomSpec::new(ar, 6.5, 5.0)).unwrap();
        let before = model.compute_force(0.0).lennard_jones;
        model.update_species(ar, |s| s.epsilon = 0.2).unwrap();
        assert_relative_eq!(model.compute_force(0.0).lennard_jones, 2.0 * before, epsilon = 1e-12);
        model.update_species(ar, |s| s.mass = 3.0).unwrap();
        assert_relative_eq!(model.atoms.masses[1], 3.0);
    }

    #[test]
    fn subset_potential_halves_pair_terms() {
        let (mut model, ar) = argon_box(BoundaryMode::Reflective);
        model.add_atom(AtomSpec::new(ar, 5.0, 5.0)).unwrap();
        model.add_atom(AtomSpec::new(ar, 6.3, 5.0)).unwrap();
        let total = model.potential_energy();
        let corner = Selection::all().within(Region {
            x: 4.0,
            y: 4.0,
            width: 2.0,
            height: 2.0,
        });
        assert_relative_eq!(model.potential_energy_of(&corner), 0.5 * total, epsilon = 1e-12);
        assert_relative_eq!(model.potential_energy_per_atom(), 0.5 * total, epsilon = 1e-12);

        model.remove_atom(1).unwrap();
        assert_eq!(model.potential_energy_per_atom(), 0.0);
    }

    #[test]
    fn lattice_fills_every_column_store() {
        let (mut model, ar) = argon_box(BoundaryMode::Reflective);
        model.add_atom(AtomSpec::new(ar, 1.0, 1.0)).unwrap();
        let indices = model
            .add_lattice(ar, Vector2::new(4.0, 4.0), 3, 2, 1.5)
            .unwrap();
        assert_eq!(indices, (1..7).collect::<Vec<_>>());
        let atoms = &model.atoms;
        assert_eq!(atoms.n_atoms, 7);
        assert_eq!(atoms.positions.ncols(), 7);
        assert_eq!(atoms.accelerations.ncols(), 7);
        assert_eq!(atoms.masses.len(), 7);
        assert_eq!(atoms.alive.len(), 7);
        assert_eq!(atoms.position(6), Vector2::new(7.0, 5.5));
        assert_relative_eq!(atoms.masses[6], 1.0);
    }
}
