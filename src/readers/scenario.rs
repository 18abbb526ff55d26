//! YAML scenario files.
//!
//! A scenario is a `serde` view of everything needed to set up an [`AtomicModel`]: engine
//! settings, the cell, the species table, the atoms and their bonds, external fields and the
//! optional thermostat and chemistry. [`ScenarioConfig::build`] turns it into a ready model,
//! going through the same validated setters as hand-written code.
//!
//! # YAML format
//!
//! ```yaml
//! engine:
//!   time_step: 0.005
//!   steps: 1000
//!   cutoff: 2.5
//!   list_radius: 3.0
//!   units: reduced          # or "workbench" (eV, Å, amu, fs)
//!   seed: 7
//!
//! boundary:
//!   width: 20.0
//!   height: 20.0
//!   mode: reflective        # open | reflective | periodic | periodic_x | periodic_y
//!
//! species:
//!   - { name: A, mass: 1.0, sigma: 1.0, epsilon: 0.1 }
//!   - { name: B, mass: 2.0, sigma: 1.2, epsilon: 0.1 }
//!
//! lattice: { species: A, origin: [2.0, 2.0], nx: 4, ny: 4, spacing: 1.5 }
//!
//! atoms:
//!   - { species: B, x: 12.0, y: 12.0, vx: -0.5 }
//!   - { species: B, x: 13.1, y: 12.0 }
//!
//! bonds:
//!   radial:
//!     - { i: 16, j: 17, stiffness: 20.0, chemical_energy: 1.5 }   # length from geometry
//!
//! fields:
//!   - { kind: gravity, g: 0.01 }
//!
//! temperature: 0.5
//! heat_bath: { temperature: 0.5, relaxation_steps: 100 }
//!
//! reaction:
//!   scheme: a2b2
//!   first: A
//!   second: B
//!   energies: { first: 1.0, second: 1.5, cross: 2.0 }
//! ```
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use na::Vector2;
use serde::Deserialize;

use crate::atoms::new::AtomSpec;
use crate::constants::{Units, DEFAULT_CUTOFF, DEFAULT_LIST_RADIUS, DEFAULT_TIME_STEP};
use crate::ensemble::heat_bath::HeatBath;
use crate::errors::{KineticaError, Result};
use crate::math::bond_angle;
use crate::model::atomic::AtomicModel;
use crate::model::ForceSwitches;
use crate::potentials::bonded::{AngularBond, RadialBond};
use crate::potentials::fields::Field;
use crate::reactions::scheme::{ReactionScheme, SchemeEnergies};
use crate::reactions::ReactionEngine;
use crate::simulation_box::{BoundaryMode, SimulationBox};
use crate::species::{Affinity, CutoffSettings, Species, SpeciesTable};

fn yes() -> bool {
    true
}

fn down() -> [f64; 2] {
    [0.0, -1.0]
}

fn vector([x, y]: [f64; 2]) -> Vector2<f64> {
    Vector2::new(x, y)
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum UnitsConfig {
    Reduced,
    #[default]
    Workbench,
}

impl From<UnitsConfig> for Units {
    fn from(config: UnitsConfig) -> Self {
        match config {
            UnitsConfig::Reduced => Units::reduced(),
            UnitsConfig::Workbench => Units::workbench(),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct EngineConfig {
    pub time_step: f64,
    /// Steps the command line runner takes when `--steps` is not given
    pub steps: usize,
    pub cutoff: f64,
    pub list_radius: f64,
    pub cutoff_shift: bool,
    pub units: UnitsConfig,
    pub seed: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            time_step: DEFAULT_TIME_STEP,
            steps: 1000,
            cutoff: DEFAULT_CUTOFF,
            list_radius: DEFAULT_LIST_RADIUS,
            cutoff_shift: true,
            units: UnitsConfig::default(),
            seed: 0,
        }
    }
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryModeConfig {
    Open,
    Reflective,
    Periodic,
    PeriodicX,
    PeriodicY,
}

impl From<BoundaryModeConfig> for BoundaryMode {
    fn from(config: BoundaryModeConfig) -> Self {
        match config {
            BoundaryModeConfig::Open => BoundaryMode::Open,
            BoundaryModeConfig::Reflective => BoundaryMode::Reflective,
            BoundaryModeConfig::Periodic => BoundaryMode::Periodic,
            BoundaryModeConfig::PeriodicX => BoundaryMode::PeriodicX,
            BoundaryModeConfig::PeriodicY => BoundaryMode::PeriodicY,
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct BoundaryConfig {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub mode: BoundaryModeConfig,
    pub viscosity: f64,
    pub dielectric: f64,
}

impl Default for BoundaryConfig {
    fn default() -> Self {
        let sim_box = SimulationBox::default();
        Self {
            x: sim_box.x,
            y: sim_box.y,
            width: sim_box.width,
            height: sim_box.height,
            mode: BoundaryModeConfig::Reflective,
            viscosity: sim_box.viscosity,
            dielectric: sim_box.dielectric,
        }
    }
}

impl BoundaryConfig {
    fn build(&self) -> Result<SimulationBox> {
        let mut sim_box =
            SimulationBox::new(self.x, self.y, self.width, self.height, self.mode.into())?;
        if !(self.viscosity >= 0.0) {
            return Err(KineticaError::InvalidParameter {
                name: "viscosity",
                value: self.viscosity,
            });
        }
        if !(self.dielectric > 0.0) {
            return Err(KineticaError::InvalidParameter {
                name: "dielectric constant",
                value: self.dielectric,
            });
        }
        sim_box.viscosity = self.viscosity;
        sim_box.dielectric = self.dielectric;
        Ok(sim_box)
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct SpeciesConfig {
    pub name: String,
    pub mass: f64,
    pub sigma: f64,
    pub epsilon: f64,
    #[serde(default)]
    pub charge: f64,
}

#[derive(Deserialize, Debug, Clone)]
pub struct AffinityConfig {
    pub a: String,
    pub b: String,
    pub epsilon: Option<f64>,
    pub sigma: Option<f64>,
    #[serde(default)]
    pub repulsive: bool,
}

#[derive(Deserialize, Debug, Clone)]
pub struct RestraintConfig {
    pub anchor: [f64; 2],
    pub k: f64,
}

#[derive(Deserialize, Debug, Clone)]
pub struct AtomConfig {
    pub species: String,
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub vx: f64,
    #[serde(default)]
    pub vy: f64,
    /// Falls back to the species charge
    pub charge: Option<f64>,
    #[serde(default)]
    pub friction: f64,
    #[serde(default = "yes")]
    pub movable: bool,
    pub restraint: Option<RestraintConfig>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct LatticeConfig {
    pub species: String,
    pub origin: [f64; 2],
    pub nx: usize,
    pub ny: usize,
    pub spacing: f64,
}

#[derive(Deserialize, Debug, Clone)]
pub struct RadialBondConfig {
    pub i: usize,
    pub j: usize,
    /// Defaults to the current separation
    pub length: Option<f64>,
    pub stiffness: f64,
    #[serde(default)]
    pub chemical_energy: f64,
}

#[derive(Deserialize, Debug, Clone)]
pub struct AngularBondConfig {
    pub i: usize,
    pub j: usize,
    pub vertex: usize,
    /// Defaults to the current angle, in radians
    pub angle: Option<f64>,
    pub stiffness: f64,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct BondsConfig {
    pub radial: Vec<RadialBondConfig>,
    pub angular: Vec<AngularBondConfig>,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum FieldConfig {
    Gravity {
        g: f64,
        #[serde(default = "down")]
        direction: [f64; 2],
    },
    Electric {
        intensity: f64,
        direction: [f64; 2],
        #[serde(default)]
        frequency: f64,
    },
    Magnetic {
        b: f64,
    },
    Acceleration {
        a: f64,
        direction: [f64; 2],
    },
}

impl From<FieldConfig> for Field {
    fn from(config: FieldConfig) -> Self {
        match config {
            FieldConfig::Gravity { g, direction } => Field::Gravity {
                g,
                direction: vector(direction),
            },
            FieldConfig::Electric {
                intensity,
                direction,
                frequency,
            } => Field::Electric {
                intensity,
                direction: vector(direction),
                frequency,
            },
            FieldConfig::Magnetic { b } => Field::Magnetic { b },
            FieldConfig::Acceleration { a, direction } => Field::Acceleration {
                a,
                direction: vector(direction),
            },
        }
    }
}

/// Force contributors to switch off; everything is on unless listed as `false`.
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ForcesConfig {
    pub fields: bool,
    pub friction: bool,
    pub restraints: bool,
    pub radial_bonds: bool,
    pub angular_bonds: bool,
    pub coulomb: bool,
    pub exclude_bonded: bool,
}

impl Default for ForcesConfig {
    fn default() -> Self {
        let on = ForceSwitches::default();
        Self {
            fields: on.fields,
            friction: on.friction,
            restraints: on.restraints,
            radial_bonds: on.radial_bonds,
            angular_bonds: on.angular_bonds,
            coulomb: on.coulomb,
            exclude_bonded: on.exclude_bonded,
        }
    }
}

impl From<&ForcesConfig> for ForceSwitches {
    fn from(config: &ForcesConfig) -> Self {
        Self {
            fields: config.fields,
            friction: config.friction,
            restraints: config.restraints,
            radial_bonds: config.radial_bonds,
            angular_bonds: config.angular_bonds,
            coulomb: config.coulomb,
            exclude_bonded: config.exclude_bonded,
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct HeatBathConfig {
    pub temperature: f64,
    pub relaxation_steps: usize,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SchemeKind {
    A2b2,
    /// `first` is hydrogen, `second` oxygen
    Water,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct EnergiesConfig {
    pub first: f64,
    pub second: f64,
    pub cross: f64,
    pub activation: f64,
    pub stiffness: f64,
    pub length_ratio: f64,
}

impl Default for EnergiesConfig {
    fn default() -> Self {
        let energies = SchemeEnergies::default();
        Self {
            first: energies.first,
            second: energies.second,
            cross: energies.cross,
            activation: energies.activation,
            stiffness: energies.stiffness,
            length_ratio: energies.length_ratio,
        }
    }
}

impl From<&EnergiesConfig> for SchemeEnergies {
    fn from(config: &EnergiesConfig) -> Self {
        Self {
            first: config.first,
            second: config.second,
            cross: config.cross,
            activation: config.activation,
            stiffness: config.stiffness,
            length_ratio: config.length_ratio,
        }
    }
}

fn default_angle_tolerance() -> f64 {
    0.2
}

#[derive(Deserialize, Debug, Clone)]
pub struct ReactionConfig {
    pub scheme: SchemeKind,
    pub first: String,
    pub second: String,
    #[serde(default)]
    pub energies: EnergiesConfig,
    /// Radians either side of the gated angle, water scheme only
    #[serde(default = "default_angle_tolerance")]
    pub angle_tolerance: f64,
    #[serde(default = "yes")]
    pub conserve_energy: bool,
}

/// Top-level scenario file.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct ScenarioConfig {
    pub engine: EngineConfig,
    pub boundary: BoundaryConfig,
    pub species: Vec<SpeciesConfig>,
    pub affinities: Vec<AffinityConfig>,
    pub lattice: Option<LatticeConfig>,
    pub atoms: Vec<AtomConfig>,
    pub bonds: BondsConfig,
    pub fields: Vec<FieldConfig>,
    pub forces: ForcesConfig,
    pub temperature: Option<f64>,
    pub heat_bath: Option<HeatBathConfig>,
    pub reaction: Option<ReactionConfig>,
}

impl ScenarioConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| KineticaError::ScenarioFile {
            path: path.display().to_string(),
            source,
        })?;
        serde_yaml::from_reader(BufReader::new(file)).map_err(|source| {
            KineticaError::ScenarioParse {
                path: path.display().to_string(),
                source,
            }
        })
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).map_err(|source| KineticaError::ScenarioParse {
            path: String::from("<inline>"),
            source,
        })
    }

    fn species_table(&self) -> Result<SpeciesTable> {
        let mut table = SpeciesTable::new();
        for s in &self.species {
            table.add(Species::new(&s.name, s.mass, s.sigma, s.epsilon).with_charge(s.charge))?;
        }
        for affinity in &self.affinities {
            let a = table.find(&affinity.a)?;
            let b = table.find(&affinity.b)?;
            table.set_affinity(
                a,
                b,
                Affinity {
                    epsilon: affinity.epsilon,
                    sigma: affinity.sigma,
                    repulsive: affinity.repulsive,
                },
            )?;
        }
        Ok(table)
    }

    fn place_atoms(&self, model: &mut AtomicModel) -> Result<()> {
        if let Some(lattice) = &self.lattice {
            let species = model.species().find(&lattice.species)?;
            model.add_lattice(
                species,
                vector(lattice.origin),
                lattice.nx,
                lattice.ny,
                lattice.spacing,
            )?;
        }
        for atom in &self.atoms {
            let species = model.species().find(&atom.species)?;
            let mut spec = AtomSpec::new(species, atom.x, atom.y)
                .with_velocity(atom.vx, atom.vy)
                .with_friction(atom.friction);
            spec.charge = atom.charge;
            spec.movable = atom.movable;
            if let Some(restraint) = &atom.restraint {
                spec = spec.with_restraint(vector(restraint.anchor), restraint.k);
            }
            model.add_atom(spec)?;
        }
        model.enforce_boundary();
        Ok(())
    }

    fn separation(model: &AtomicModel, i: usize, j: usize) -> Result<Vector2<f64>> {
        model.atoms.check(i)?;
        model.atoms.check(j)?;
        Ok(model
            .boundary()
            .min_image(model.atoms.position(i) - model.atoms.position(j)))
    }

    fn connect(&self, model: &mut AtomicModel) -> Result<()> {
        for bond in &self.bonds.radial {
            let length = match bond.length {
                Some(length) => length,
                None => Self::separation(model, bond.i, bond.j)?.norm(),
            };
            model.add_radial_bond(
                RadialBond::new(bond.i, bond.j, length, bond.stiffness)
                    .with_chemical_energy(bond.chemical_energy),
            )?;
        }
        for bond in &self.bonds.angular {
            let angle = match bond.angle {
                Some(angle) => angle,
                None => bond_angle(
                    &Self::separation(model, bond.i, bond.vertex)?,
                    &Self::separation(model, bond.j, bond.vertex)?,
                ),
            };
            model.add_angular_bond(AngularBond {
                i: bond.i,
                j: bond.j,
                vertex: bond.vertex,
                angle,
                stiffness: bond.stiffness,
            })?;
        }
        Ok(())
    }

    fn reaction_engine(&self, model: &AtomicModel) -> Result<Option<ReactionEngine>> {
        let Some(reaction) = &self.reaction else {
            return Ok(None);
        };
        let first = model.species().find(&reaction.first)?;
        let second = model.species().find(&reaction.second)?;
        let energies = SchemeEnergies::from(&reaction.energies);
        let scheme = match reaction.scheme {
            SchemeKind::A2b2 => ReactionScheme::a2_b2(first, second, energies)?,
            SchemeKind::Water => {
                ReactionScheme::water(first, second, energies, reaction.angle_tolerance)?
            }
        };
        let mut engine = ReactionEngine::new(scheme);
        engine.conserve_energy = reaction.conserve_energy;
        Ok(Some(engine))
    }

    /// Builds the model, in the order: engine settings, atoms, bonds, forces, thermostat,
    /// chemistry.
    pub fn build(&self) -> Result<AtomicModel> {
        let engine = &self.engine;
        let mut model = AtomicModel::new(
            self.species_table()?,
            self.boundary.build()?,
            engine.units.into(),
        )
        .with_seed(engine.seed);
        model.set_cutoff_settings(CutoffSettings {
            cutoff: engine.cutoff,
            list_radius: engine.list_radius,
            shift: engine.cutoff_shift,
        })?;
        model.set_time_step(engine.time_step)?;

        self.place_atoms(&mut model)?;
        self.connect(&mut model)?;

        model.set_switches(ForceSwitches::from(&self.forces));
        for &field in &self.fields {
            model.add_field(field.into());
        }

        if let Some(temperature) = self.temperature {
            model.assign_temperature(temperature)?;
        }
        if let Some(bath) = &self.heat_bath {
            model.set_heat_bath(Some(HeatBath::new(bath.temperature, bath.relaxation_steps)?));
        }
        let reactions = self.reaction_engine(&model)?;
        model.set_reactions(reactions);

        log::info!(
            "scenario: {} species, {} atoms, {} radial and {} angular bonds",
            model.species().len(),
            model.atoms.n_live(),
            model.bonds().radial().len(),
            model.bonds().angular().len()
        );
        Ok(model)
    }
}
