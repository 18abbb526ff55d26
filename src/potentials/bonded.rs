use std::collections::HashSet;

use na::Vector2;

use crate::errors::{KineticaError, Result};

fn ordered(a: usize, b: usize) -> (usize, usize) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Harmonic spring between two atoms. A positive `chemical_energy` is the dissociation depth
/// that makes the bond eligible for reactions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RadialBond {
    pub i: usize,
    pub j: usize,
    pub length: f64,
    pub stiffness: f64,
    pub chemical_energy: f64,
}

impl RadialBond {
    pub fn new(i: usize, j: usize, length: f64, stiffness: f64) -> Self {
        Self {
            i,
            j,
            length,
            stiffness,
            chemical_energy: 0.0,
        }
    }

    pub fn with_chemical_energy(mut self, energy: f64) -> Self {
        self.chemical_energy = energy;
        self
    }

    pub fn connects(&self, a: usize, b: usize) -> bool {
        ordered(self.i, self.j) == ordered(a, b)
    }

    pub fn involves(&self, a: usize) -> bool {
        self.i == a || self.j == a
    }

    pub fn other(&self, a: usize) -> Option<usize> {
        if self.i == a {
            Some(self.j)
        } else if self.j == a {
            Some(self.i)
        } else {
            None
        }
    }

    pub fn is_reactive(&self) -> bool {
        self.chemical_energy > 0.0
    }

    /// Spring energy at separation `r`.
    pub fn stretch_energy(&self, r: f64) -> f64 {
        0.5 * self.stiffness * (r - self.length).powi(2)
    }

    /// Energy and force on `i` for `rij = r_i - r_j`.
    pub fn compute(&self, rij: &Vector2<f64>) -> (f64, Vector2<f64>) {
        let r = rij.norm();
        let energy = self.stretch_energy(r);
        if r == 0.0 {
            return (energy, Vector2::zeros());
        }
        let force = -self.stiffness * (r - self.length) / r * rij;
        (energy, force)
    }
}

/// Harmonic bend of the angle at `vertex` between the arms to `i` and `j`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AngularBond {
    pub i: usize,
    pub j: usize,
    pub vertex: usize,
    pub angle: f64,
    pub stiffness: f64,
}

impl AngularBond {
    pub fn atoms(&self) -> [usize; 3] {
        [self.i, self.j, self.vertex]
    }

    pub fn involves(&self, a: usize) -> bool {
        self.i == a || self.j == a || self.vertex == a
    }

    /// Whether this angle is built on the radial bond `a`-`b`.
    pub fn uses_radial(&self, a: usize, b: usize) -> bool {
        (self.vertex == a && (self.i == b || self.j == b))
            || (self.vertex == b && (self.i == a || self.j == a))
    }

    /// The outer atom that is not part of the radial bond `a`-`b`.
    pub fn third_atom(&self, a: usize, b: usize) -> usize {
        if self.i != a && self.i != b {
            self.i
        } else {
            self.j
        }
    }

    pub fn bend_energy(&self, theta: f64) -> f64 {
        0.5 * self.stiffness * (theta - self.angle).powi(2)
    }

    /// Energy and the forces on `i` and `j` for arms `a = r_i - r_vertex`, `b = r_j - r_vertex`.
    /// The vertex takes minus their sum.
    pub fn compute(&self, a: &Vector2<f64>, b: &Vector2<f64>) -> (f64, Vector2<f64>, Vector2<f64>) {
        let (la, lb) = (a.norm(), b.norm());
        if la == 0.0 || lb == 0.0 {
            return (0.0, Vector2::zeros(), Vector2::zeros());
        }
        let (ua, ub) = (a / la, b / lb);
        let cos = ua.dot(&ub).clamp(-1.0, 1.0);
        let theta = cos.acos();
        let sin = (1.0 - cos * cos).sqrt().max(1e-8);

        let energy = self.bend_energy(theta);
        let torque = self.stiffness * (theta - self.angle) / sin;
        let f_i = torque * (ub - cos * ua) / la;
        let f_j = torque * (ua - cos * ub) / lb;
        (energy, f_i, f_j)
    }
}

/// Radial and angular bonds. Every mutation bumps `version`, which is what derived tables
/// (exclusions, molecules) compare against.
#[derive(Debug, Clone, Default)]
pub struct BondSet {
    radial: Vec<RadialBond>,
    angular: Vec<AngularBond>,
    version: u64,
}

impl BondSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn radial(&self) -> &[RadialBond] {
        &self.radial
    }

    pub fn angular(&self) -> &[AngularBond] {
        &self.angular
    }

    pub fn find_radial(&self, a: usize, b: usize) -> Option<usize> {
        self.radial.iter().position(|bond| bond.connects(a, b))
    }

    pub fn is_bonded(&self, a: usize, b: usize) -> bool {
        self.find_radial(a, b).is_some()
    }

    pub fn degree(&self, a: usize) -> usize {
        self.radial.iter().filter(|bond| bond.involves(a)).count()
    }

    pub fn partners(&self, a: usize) -> Vec<usize> {
        self.radial.iter().filter_map(|bond| bond.other(a)).collect()
    }

    /// An atom with no radial bond.
    pub fn is_radical(&self, a: usize) -> bool {
        !self.radial.iter().any(|bond| bond.involves(a))
    }

    pub fn add_radial(&mut self, bond: RadialBond) -> Result<usize> {
        if bond.i == bond.j {
            return Err(KineticaError::SelfBond { i: bond.i });
        }
        if self.is_bonded(bond.i, bond.j) {
            return Err(KineticaError::DuplicateBond {
                i: bond.i,
                j: bond.j,
            });
        }
        if !(bond.stiffness >= 0.0) {
            return Err(KineticaError::InvalidParameter {
                name: "bond stiffness",
                value: bond.stiffness,
            });
        }
        if !(bond.length >= 0.0) {
            return Err(KineticaError::InvalidParameter {
                name: "bond length",
                value: bond.length,
            });
        }
        self.radial.push(bond);
        self.version += 1;
        Ok(self.radial.len() - 1)
    }

    /// Removes the bond and every angular bond built on it.
    pub fn remove_radial(&mut self, a: usize, b: usize) -> Option<(RadialBond, Vec<AngularBond>)> {
        let index = self.find_radial(a, b)?;
        let bond = self.radial.remove(index);
        let (dependent, kept): (Vec<_>, Vec<_>) = self
            .angular
            .drain(..)
            .partition(|angle| angle.uses_radial(a, b));
        self.angular = kept;
        self.version += 1;
        Some((bond, dependent))
    }

    pub fn add_angular(&mut self, bond: AngularBond) -> Result<usize> {
        if bond.i == bond.j || bond.i == bond.vertex || bond.j == bond.vertex {
            return Err(KineticaError::SelfBond { i: bond.vertex });
        }
        for outer in [bond.i, bond.j] {
            if !self.is_bonded(outer, bond.vertex) {
                return Err(KineticaError::MissingRadialBond {
                    i: outer,
                    j: bond.vertex,
                });
            }
        }
        if self.find_angular(bond.i, bond.j, bond.vertex).is_some() {
            return Err(KineticaError::DuplicateBond {
                i: bond.i,
                j: bond.j,
            });
        }
        if !(bond.stiffness >= 0.0) {
            return Err(KineticaError::InvalidParameter {
                name: "angular bond stiffness",
                value: bond.stiffness,
            });
        }
        self.angular.push(bond);
        self.version += 1;
        Ok(self.angular.len() - 1)
    }

    pub fn find_angular(&self, i: usize, j: usize, vertex: usize) -> Option<usize> {
        self.angular
            .iter()
            .position(|b| b.vertex == vertex && ordered(b.i, b.j) == ordered(i, j))
    }

    pub fn remove_angular(&mut self, i: usize, j: usize, vertex: usize) -> Option<AngularBond> {
        let index = self.find_angular(i, j, vertex)?;
        self.version += 1;
        Some(self.angular.remove(index))
    }

    /// Angular bonds that would go if the radial bond `a`-`b` went.
    pub fn dependent_angular(&self, a: usize, b: usize) -> Vec<AngularBond> {
        self.angular
            .iter()
            .filter(|angle| angle.uses_radial(a, b))
            .copied()
            .collect()
    }

    /// Drops every bond touching `a`. Returns how many went.
    pub fn remove_atom(&mut self, a: usize) -> usize {
        let before = self.radial.len() + self.angular.len();
        self.radial.retain(|bond| !bond.involves(a));
        self.angular.retain(|angle| !angle.involves(a));
        let removed = before - self.radial.len() - self.angular.len();
        if removed > 0 {
            self.version += 1;
        }
        removed
    }

    pub fn clear(&mut self) {
        self.radial.clear();
        self.angular.clear();
        self.version += 1;
    }
}

/// Bonded pairs skipped by the non-bonded force, valid for one bond-set version.
#[derive(Debug, Clone, Default)]
pub struct ExclusionTable {
    version: Option<u64>,
    pairs: HashSet<(usize, usize)>,
}

impl ExclusionTable {
    pub fn build(bonds: &BondSet) -> Self {
        Self {
            version: Some(bonds.version()),
            pairs: bonds.radial().iter().map(|b| ordered(b.i, b.j)).collect(),
        }
    }

    pub fn is_current(&self, bonds: &BondSet) -> bool {
        self.version == Some(bonds.version())
    }

    #[inline]
    pub fn contains(&self, a: usize, b: usize) -> bool {
        self.pairs.contains(&ordered(a, b))
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// Connected components of the radial-bond graph over the live atoms.
#[derive(Debug, Clone, Default)]
pub struct Molecules {
    version: Option<u64>,
    groups: Vec<Vec<usize>>,
    membership: Vec<Option<usize>>,
}

fn find_root(parent: &mut [usize], mut x: usize) -> usize {
    while parent[x] != x {
        parent[x] = parent[parent[x]];
        x = parent[x];
    }
    x
}

impl Molecules {
    pub fn build(bonds: &BondSet, alive: &[bool]) -> Self {
        let n = alive.len();
        let mut parent: Vec<usize> = (0..n).collect();
        for bond in bonds.radial() {
            if bond.i >= n || bond.j >= n {
                continue;
            }
            let (ri, rj) = (find_root(&mut parent, bond.i), find_root(&mut parent, bond.j));
            if ri != rj {
                parent[ri.max(rj)] = ri.min(rj);
            }
        }

        let mut groups: Vec<Vec<usize>> = Vec::new();
        let mut group_of_root = vec![None; n];
        let mut membership = vec![None; n];
        for a in 0..n {
            if !alive[a] {
                continue;
            }
            let root = find_root(&mut parent, a);
            let g = *group_of_root[root].get_or_insert_with(|| {
                groups.push(Vec::new());
                groups.len() - 1
            });
            groups[g].push(a);
            membership[a] = Some(g);
        }

        Self {
            version: Some(bonds.version()),
            groups,
            membership,
        }
    }

    pub fn is_current(&self, bonds: &BondSet, n_atoms: usize) -> bool {
        self.version == Some(bonds.version()) && self.membership.len() == n_atoms
    }

    pub fn groups(&self) -> &[Vec<usize>] {
        &self.groups
    }

    pub fn molecule_of(&self, a: usize) -> Option<usize> {
        self.membership.get(a).copied().flatten()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}
