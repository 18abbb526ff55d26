//! Per-species parameters, the pairwise mixing rules, and the flattened pair table derived from them.
use std::collections::HashMap;

use crate::constants::{COLLISION_FRACTION, DEFAULT_CUTOFF, DEFAULT_LIST_RADIUS};
use crate::errors::{KineticaError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpeciesId(pub usize);

#[derive(Debug, Clone, PartialEq)]
pub struct Species {
    pub name: String,
    pub mass: f64,
    /// Van der Waals diameter
    pub sigma: f64,
    /// Well depth
    pub epsilon: f64,
    /// Charge given to new atoms of this species
    pub charge: f64,
}

impl Species {
    pub fn new(name: &str, mass: f64, sigma: f64, epsilon: f64) -> Self {
        Self {
            name: name.to_string(),
            mass,
            sigma,
            epsilon,
            charge: 0.0,
        }
    }

    pub fn with_charge(mut self, charge: f64) -> Self {
        self.charge = charge;
        self
    }

    fn validate(&self) -> Result<()> {
        if !(self.mass > 0.0) {
            return Err(KineticaError::InvalidParameter {
                name: "species mass",
                value: self.mass,
            });
        }
        if !(self.sigma > 0.0) {
            return Err(KineticaError::InvalidParameter {
                name: "species sigma",
                value: self.sigma,
            });
        }
        if self.epsilon < 0.0 {
            return Err(KineticaError::InvalidParameter {
                name: "species epsilon",
                value: self.epsilon,
            });
        }
        Ok(())
    }
}

/// Override of the combination rule for one unordered species pair.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Affinity {
    /// `None` keeps the Berthelot geometric mean
    pub epsilon: Option<f64>,
    /// `None` keeps the Lorentz arithmetic mean
    pub sigma: Option<f64>,
    /// Incompatible species: doubled repulsion, no attraction
    pub repulsive: bool,
}

impl Affinity {
    pub fn repulsive() -> Self {
        Self {
            repulsive: true,
            ..Self::default()
        }
    }

    pub fn is_mixed(&self) -> bool {
        self.epsilon.is_none() && self.sigma.is_none()
    }
}

fn ordered(a: SpeciesId, b: SpeciesId) -> (SpeciesId, SpeciesId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

#[derive(Debug, Clone, Default)]
pub struct SpeciesTable {
    species: Vec<Species>,
    affinities: HashMap<(SpeciesId, SpeciesId), Affinity>,
    version: u64,
}

impl SpeciesTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, species: Species) -> Result<SpeciesId> {
        species.validate()?;
        self.species.push(species);
        self.version += 1;
        Ok(SpeciesId(self.species.len() - 1))
    }

    pub fn len(&self) -> usize {
        self.species.len()
    }

    pub fn is_empty(&self) -> bool {
        self.species.is_empty()
    }

    /// Bumped on every change; pair caches compare against it.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn check(&self, id: SpeciesId) -> Result<()> {
        if id.0 < self.species.len() {
            Ok(())
        } else {
            Err(KineticaError::UnknownSpecies {
                id: id.0,
                n_species: self.species.len(),
            })
        }
    }

    pub fn get(&self, id: SpeciesId) -> Result<&Species> {
        self.check(id)?;
        Ok(&self.species[id.0])
    }

    pub fn iter(&self) -> impl Iterator<Item = (SpeciesId, &Species)> {
        self.species
            .iter()
            .enumerate()
            .map(|(i, s)| (SpeciesId(i), s))
    }

    pub fn find(&self, name: &str) -> Result<SpeciesId> {
        self.species
            .iter()
            .position(|s| s.name == name)
            .map(SpeciesId)
            .ok_or_else(|| KineticaError::UnknownSpeciesName {
                name: name.to_string(),
            })
    }

    /// Applies `edit` to a copy of the species and stores it only if it stays valid.
    pub fn update<F>(&mut self, id: SpeciesId, edit: F) -> Result<()>
    where
        F: FnOnce(&mut Species),
    {
        self.check(id)?;
        let mut edited = self.species[id.0].clone();
        edit(&mut edited);
        edited.validate()?;
        self.species[id.0] = edited;
        self.version += 1;
        Ok(())
    }

    pub fn set_affinity(&mut self, a: SpeciesId, b: SpeciesId, affinity: Affinity) -> Result<()> {
        self.check(a)?;
        self.check(b)?;
        if a == b && !affinity.is_mixed() {
            return Err(KineticaError::DiagonalAffinityOverride { id: a.0 });
        }
        if let Some(sigma) = affinity.sigma {
            if !(sigma > 0.0) {
                return Err(KineticaError::InvalidParameter {
                    name: "affinity sigma",
                    value: sigma,
                });
            }
        }
        if let Some(epsilon) = affinity.epsilon {
            if epsilon < 0.0 {
                return Err(KineticaError::InvalidParameter {
                    name: "affinity epsilon",
                    value: epsilon,
                });
            }
        }
        self.affinities.insert(ordered(a, b), affinity);
        self.version += 1;
        Ok(())
    }

    pub fn affinity(&self, a: SpeciesId, b: SpeciesId) -> Affinity {
        self.affinities
            .get(&ordered(a, b))
            .copied()
            .unwrap_or_default()
    }

    /// Combined (sigma, epsilon, repulsive) for a pair.
    pub fn mix(&self, a: SpeciesId, b: SpeciesId) -> (f64, f64, bool) {
        let (sa, sb) = (&self.species[a.0], &self.species[b.0]);
        let affinity = self.affinity(a, b);
        let sigma = affinity.sigma.unwrap_or(0.5 * (sa.sigma + sb.sigma));
        let epsilon = affinity
            .epsilon
            .unwrap_or((sa.epsilon * sb.epsilon).sqrt());
        (sigma, epsilon, affinity.repulsive)
    }
}

/// Cutoff settings, all as multiples of the pair sigma.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CutoffSettings {
    pub cutoff: f64,
    pub list_radius: f64,
    pub shift: bool,
}

impl CutoffSettings {
    pub fn validate(&self) -> Result<()> {
        if !(self.cutoff > 0.0) {
            return Err(KineticaError::InvalidCutoff { value: self.cutoff });
        }
        if !(self.list_radius > self.cutoff) {
            return Err(KineticaError::InvalidListRadius {
                list: self.list_radius,
                cutoff: self.cutoff,
            });
        }
        Ok(())
    }
}

impl Default for CutoffSettings {
    fn default() -> Self {
        Self {
            cutoff: DEFAULT_CUTOFF,
            list_radius: DEFAULT_LIST_RADIUS,
            shift: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairParameters {
    pub sigma: f64,
    pub epsilon: f64,
    pub repulsive: bool,
    pub cutoff_sq: f64,
    pub list_sq: f64,
    /// Potential at the cutoff, subtracted when shifting is on (zero otherwise)
    pub shift: f64,
    pub collision_sq: f64,
}

/// A flattened matrix of pair parameters, indexed by `a * n + b`.
#[derive(Debug, Clone)]
pub struct PairTable {
    n_species: usize,
    pairs: Vec<PairParameters>,
    species_version: u64,
    settings: CutoffSettings,
    min_skin: f64,
}

impl PairTable {
    pub fn build(species: &SpeciesTable, settings: CutoffSettings) -> Self {
        let n = species.len();
        let mut pairs = Vec::with_capacity(n * n);
        let mut min_skin = f64::INFINITY;

        for a in 0..n {
            for b in 0..n {
                let (sigma, epsilon, repulsive) = species.mix(SpeciesId(a), SpeciesId(b));
                let range = if repulsive { 2.0 } else { 1.0 };
                let cutoff = range * settings.cutoff * sigma;
                let list = range * settings.list_radius * sigma;

                let shift = if settings.shift {
                    let sr2 = (sigma / cutoff).powi(2);
                    let sr6 = sr2.powi(3);
                    if repulsive {
                        8.0 * epsilon * sr6 * sr6
                    } else {
                        4.0 * epsilon * (sr6 * sr6 - sr6)
                    }
                } else {
                    0.0
                };

                let contact =
                    COLLISION_FRACTION * (species.species[a].sigma + species.species[b].sigma);

                min_skin = min_skin.min(list - cutoff);
                pairs.push(PairParameters {
                    sigma,
                    epsilon,
                    repulsive,
                    cutoff_sq: cutoff * cutoff,
                    list_sq: list * list,
                    shift,
                    collision_sq: contact * contact,
                });
            }
        }

        log::debug!("pair table rebuilt for {n} species (version {})", species.version());

        Self {
            n_species: n,
            pairs,
            species_version: species.version(),
            settings,
            min_skin: if min_skin.is_finite() { min_skin } else { 0.0 },
        }
    }

    pub fn is_current(&self, species: &SpeciesTable, settings: &CutoffSettings) -> bool {
        self.species_version == species.version() && self.settings == *settings
    }

    #[inline(always)]
    pub fn get(&self, a: SpeciesId, b: SpeciesId) -> &PairParameters {
        &self.pairs[a.0 * self.n_species + b.0]
    }

    /// Smallest list-minus-cutoff margin over all species pairs.
    pub fn min_skin(&self) -> f64 {
        self.min_skin
    }

    pub fn settings(&self) -> &CutoffSettings {
        &self.settings
    }
}
