//! Declarative description of which collisions react and what they produce.
use std::collections::HashMap;
use std::f64::consts::PI;

use crate::errors::{KineticaError, Result};
use crate::species::SpeciesId;

fn ordered(a: SpeciesId, b: SpeciesId) -> (SpeciesId, SpeciesId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Bond formed between two species. The equilibrium length is `length_ratio` times the pair sigma.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BondParameters {
    /// Dissociation energy D
    pub energy: f64,
    pub stiffness: f64,
    pub length_ratio: f64,
}

/// Bonding context of a collision, in species.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollisionPattern {
    /// Two radicals meet. Unordered.
    Radicals { a: SpeciesId, b: SpeciesId },
    /// A radical takes the target away from its only partner.
    Substitution {
        attacker: SpeciesId,
        target: SpeciesId,
        leaving: SpeciesId,
    },
    /// A radical binds to a vertex that keeps its existing partner.
    Addition {
        attacker: SpeciesId,
        vertex: SpeciesId,
        existing: SpeciesId,
    },
}

impl CollisionPattern {
    fn key(&self) -> Self {
        match *self {
            CollisionPattern::Radicals { a, b } => {
                let (a, b) = ordered(a, b);
                CollisionPattern::Radicals { a, b }
            }
            other => other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Activation {
    /// Fixed barrier.
    Fixed(f64),
    /// `base + max(0, D_old - D_new)`: a less stable product pays the difference up front.
    Exchange { base: f64 },
}

impl Activation {
    pub fn threshold(&self, old_energy: f64, new_energy: f64) -> f64 {
        match *self {
            Activation::Fixed(barrier) => barrier,
            Activation::Exchange { base } => base + (old_energy - new_energy).max(0.0),
        }
    }
}

/// Accepted window around the bond angle an addition would create, and the stiffness of the
/// angular bond that holds it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AngleGate {
    pub angle: f64,
    pub tolerance: f64,
    pub stiffness: f64,
}

impl AngleGate {
    pub fn admits(&self, theta: f64) -> bool {
        (theta - self.angle).abs() <= self.tolerance
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReactionRule {
    pub pattern: CollisionPattern,
    pub activation: Activation,
    pub gate: Option<AngleGate>,
}

/// Tetrahedral angle, the geometry the water scheme gates additions on.
pub const TETRAHEDRAL_ANGLE: f64 = 1.910_633_236_249_019;

/// Energies shared by the two built-in two-species schemes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SchemeEnergies {
    /// Same-species bond of the first species
    pub first: f64,
    /// Same-species bond of the second species
    pub second: f64,
    /// Cross-species bond
    pub cross: f64,
    pub activation: f64,
    pub stiffness: f64,
    pub length_ratio: f64,
}

impl Default for SchemeEnergies {
    fn default() -> Self {
        Self {
            first: 1.0,
            second: 1.0,
            cross: 1.0,
            activation: 0.0,
            stiffness: 10.0,
            length_ratio: 1.0,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReactionScheme {
    valence: HashMap<SpeciesId, usize>,
    bonds: HashMap<(SpeciesId, SpeciesId), BondParameters>,
    rules: HashMap<CollisionPattern, ReactionRule>,
}

impl ReactionScheme {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_valence(&mut self, species: SpeciesId, valence: usize) {
        self.valence.insert(species, valence);
    }

    /// Species without an explicit entry bind once.
    pub fn valence(&self, species: SpeciesId) -> usize {
        self.valence.get(&species).copied().unwrap_or(1)
    }

    pub fn set_bond(&mut self, a: SpeciesId, b: SpeciesId, params: BondParameters) -> Result<()> {
        if !(params.stiffness >= 0.0) {
            return Err(KineticaError::InvalidParameter {
                name: "reaction bond stiffness",
                value: params.stiffness,
            });
        }
        if !(params.length_ratio > 0.0) {
            return Err(KineticaError::InvalidParameter {
                name: "reaction bond length ratio",
                value: params.length_ratio,
            });
        }
        self.bonds.insert(ordered(a, b), params);
        Ok(())
    }

    pub fn bond(&self, a: SpeciesId, b: SpeciesId) -> Option<&BondParameters> {
        self.bonds.get(&ordered(a, b))
    }

    pub fn add_rule(&mut self, rule: ReactionRule) {
        self.rules.insert(rule.pattern.key(), rule);
    }

    pub fn rule(&self, pattern: &CollisionPattern) -> Option<&ReactionRule> {
        self.rules.get(&pattern.key())
    }

    pub fn n_rules(&self) -> usize {
        self.rules.len()
    }

    fn bond_from(energies: &SchemeEnergies, energy: f64) -> BondParameters {
        BondParameters {
            energy,
            stiffness: energies.stiffness,
            length_ratio: energies.length_ratio,
        }
    }

    /// A2 + B2 <-> 2AB: every species binds once, so every exchange is a substitution.
    pub fn a2_b2(a: SpeciesId, b: SpeciesId, energies: SchemeEnergies) -> Result<Self> {
        let mut scheme = Self::new();
        scheme.set_bond(a, a, Self::bond_from(&energies, energies.first))?;
        scheme.set_bond(b, b, Self::bond_from(&energies, energies.second))?;
        scheme.set_bond(a, b, Self::bond_from(&energies, energies.cross))?;

        let both = [a, b];
        for &x in &both {
            for &y in &both {
                scheme.add_rule(ReactionRule {
                    pattern: CollisionPattern::Radicals { a: x, b: y },
                    activation: Activation::Fixed(0.0),
                    gate: None,
                });
                for &z in &both {
                    scheme.add_rule(ReactionRule {
                        pattern: CollisionPattern::Substitution {
                            attacker: x,
                            target: y,
                            leaving: z,
                        },
                        activation: Activation::Exchange {
                            base: energies.activation,
                        },
                        gate: None,
                    });
                }
            }
        }
        Ok(scheme)
    }

    /// 2H2 + O2 <-> 2H2O. Oxygen binds twice; adding the second hydrogen is gated on the
    /// tetrahedral angle.
    pub fn water(
        h: SpeciesId,
        o: SpeciesId,
        energies: SchemeEnergies,
        angle_tolerance: f64,
    ) -> Result<Self> {
        let mut scheme = Self::new();
        scheme.set_valence(h, 1);
        scheme.set_valence(o, 2);
        scheme.set_bond(h, h, Self::bond_from(&energies, energies.first))?;
        scheme.set_bond(o, o, Self::bond_from(&energies, energies.second))?;
        scheme.set_bond(h, o, Self::bond_from(&energies, energies.cross))?;

        for (x, y) in [(h, h), (o, o), (h, o)] {
            scheme.add_rule(ReactionRule {
                pattern: CollisionPattern::Radicals { a: x, b: y },
                activation: Activation::Fixed(0.0),
                gate: None,
            });
        }
        // H + H2, H + HO, O + H2 and O + HO (on the hydrogen) exchange a partner
        for (attacker, leaving) in [(h, h), (h, o), (o, h), (o, o)] {
            scheme.add_rule(ReactionRule {
                pattern: CollisionPattern::Substitution {
                    attacker,
                    target: h,
                    leaving,
                },
                activation: Activation::Exchange {
                    base: energies.activation,
                },
                gate: None,
            });
        }
        scheme.add_rule(ReactionRule {
            pattern: CollisionPattern::Addition {
                attacker: h,
                vertex: o,
                existing: h,
            },
            activation: Activation::Fixed(energies.activation),
            gate: Some(AngleGate {
                angle: TETRAHEDRAL_ANGLE,
                tolerance: angle_tolerance.clamp(0.0, PI),
                stiffness: energies.stiffness,
            }),
        });
        Ok(scheme)
    }
}
