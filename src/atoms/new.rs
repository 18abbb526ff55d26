use std::ops::Range;

use na::{DVector, Matrix2xX, Vector2};

use crate::errors::{KineticaError, Result};
use crate::species::{Species, SpeciesId, SpeciesTable};

/// Harmonic tether of an atom to a fixed anchor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Restraint {
    pub anchor: Vector2<f64>,
    pub k: f64,
}

/// Everything needed to insert one atom.
#[derive(Debug, Clone)]
pub struct AtomSpec {
    pub species: SpeciesId,
    pub position: Vector2<f64>,
    pub velocity: Vector2<f64>,
    /// `None` takes the species charge
    pub charge: Option<f64>,
    pub friction: f64,
    pub movable: bool,
    pub visible: bool,
    pub restraint: Option<Restraint>,
}

impl AtomSpec {
    pub fn new(species: SpeciesId, x: f64, y: f64) -> Self {
        Self {
            species,
            position: Vector2::new(x, y),
            velocity: Vector2::zeros(),
            charge: None,
            friction: 0.0,
            movable: true,
            visible: true,
            restraint: None,
        }
    }

    pub fn with_velocity(mut self, vx: f64, vy: f64) -> Self {
        self.velocity = Vector2::new(vx, vy);
        self
    }

    pub fn with_charge(mut self, charge: f64) -> Self {
        self.charge = Some(charge);
        self
    }

    pub fn with_friction(mut self, friction: f64) -> Self {
        self.friction = friction;
        self
    }

    pub fn with_restraint(mut self, anchor: Vector2<f64>, k: f64) -> Self {
        self.restraint = Some(Restraint { anchor, k });
        self
    }

    pub fn fixed(mut self) -> Self {
        self.movable = false;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }
}

/// Point atoms stored column-wise. Slots are never reused or compacted, so an index stays
/// valid for the lifetime of the store; removed atoms are flagged dead.
#[derive(Debug, Clone)]
pub struct Atoms {
    pub n_atoms: usize,
    pub positions: Matrix2xX<f64>,
    pub velocities: Matrix2xX<f64>,
    /// Acceleration from the previous force evaluation (the predictor's Taylor term)
    pub accelerations: Matrix2xX<f64>,
    pub forces: Matrix2xX<f64>,
    pub masses: DVector<f64>,
    pub charges: DVector<f64>,
    pub species: Vec<SpeciesId>,
    pub friction: Vec<f64>,
    pub restraints: Vec<Option<Restraint>>,
    pub movable: Vec<bool>,
    pub visible: Vec<bool>,
    pub alive: Vec<bool>,
}

/// Adds `extra` zeroed columns at the end in a single reallocation.
pub(crate) fn grow_columns(matrix: &mut Matrix2xX<f64>, extra: usize) {
    let n = matrix.ncols();
    *matrix = std::mem::replace(matrix, Matrix2xX::zeros(0)).insert_columns(n, extra, 0.0);
}

pub(crate) fn grow_rows(vector: &mut DVector<f64>, extra: usize) {
    let n = vector.len();
    *vector = std::mem::replace(vector, DVector::zeros(0)).insert_rows(n, extra, 0.0);
}

pub(crate) fn push_column(matrix: &mut Matrix2xX<f64>, value: &Vector2<f64>) {
    let n = matrix.ncols();
    grow_columns(matrix, 1);
    matrix.set_column(n, value);
}

pub(crate) fn push_scalar(vector: &mut DVector<f64>, value: f64) {
    let n = vector.len();
    grow_rows(vector, 1);
    vector[n] = value;
}

impl Atoms {
    pub fn new() -> Self {
        Self {
            n_atoms: 0,
            positions: Matrix2xX::zeros(0),
            velocities: Matrix2xX::zeros(0),
            accelerations: Matrix2xX::zeros(0),
            forces: Matrix2xX::zeros(0),
            masses: DVector::zeros(0),
            charges: DVector::zeros(0),
            species: Vec::new(),
            friction: Vec::new(),
            restraints: Vec::new(),
            movable: Vec::new(),
            visible: Vec::new(),
            alive: Vec::new(),
        }
    }

    /// Appends an atom; the caller has checked that `species` belongs to `spec.species`.
    pub fn push(&mut self, spec: &AtomSpec, species: &Species) -> usize {
        self.extend(std::slice::from_ref(spec), species).start
    }

    /// Appends a batch of atoms of one species. Every column store grows once for the whole
    /// batch.
    pub fn extend(&mut self, specs: &[AtomSpec], species: &Species) -> Range<usize> {
        let start = self.n_atoms;
        let extra = specs.len();
        for matrix in [
            &mut self.positions,
            &mut self.velocities,
            &mut self.accelerations,
            &mut self.forces,
        ] {
            grow_columns(matrix, extra);
        }
        grow_rows(&mut self.masses, extra);
        grow_rows(&mut self.charges, extra);
        for spec in specs {
            self.fill_slot(spec, species);
        }
        start..self.n_atoms
    }

    // columns are already sized; the vector fields grow here
    fn fill_slot(&mut self, spec: &AtomSpec, species: &Species) {
        let index = self.n_atoms;
        let velocity = if spec.movable {
            spec.velocity
        } else {
            Vector2::zeros()
        };
        self.positions.set_column(index, &spec.position);
        self.velocities.set_column(index, &velocity);
        self.masses[index] = species.mass;
        self.charges[index] = spec.charge.unwrap_or(species.charge);
        self.species.push(spec.species);
        self.friction.push(spec.friction);
        self.restraints.push(spec.restraint);
        self.movable.push(spec.movable);
        self.visible.push(spec.visible);
        self.alive.push(true);
        self.n_atoms += 1;
    }

    /// Flags the slot dead. Its kinematic state is zeroed so it never contributes again.
    pub fn remove(&mut self, index: usize) -> Result<()> {
        self.check(index)?;
        self.alive[index] = false;
        self.velocities.set_column(index, &Vector2::zeros());
        self.accelerations.set_column(index, &Vector2::zeros());
        self.forces.set_column(index, &Vector2::zeros());
        Ok(())
    }

    pub fn check(&self, index: usize) -> Result<()> {
        if index < self.n_atoms && self.alive[index] {
            Ok(())
        } else {
            Err(KineticaError::InvalidAtomIndex {
                index,
                n_atoms: self.n_atoms,
            })
        }
    }

    pub fn is_live(&self, index: usize) -> bool {
        index < self.n_atoms && self.alive[index]
    }

    pub fn live(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.n_atoms).filter(move |&i| self.alive[i])
    }

    pub fn n_live(&self) -> usize {
        self.alive.iter().filter(|&&a| a).count()
    }

    /// Live atoms the integrator may displace.
    pub fn mobile(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.n_atoms).filter(move |&i| self.alive[i] && self.movable[i])
    }

    pub fn position(&self, i: usize) -> Vector2<f64> {
        self.positions.column(i).into_owned()
    }

    pub fn velocity(&self, i: usize) -> Vector2<f64> {
        self.velocities.column(i).into_owned()
    }

    pub fn set_velocity(&mut self, i: usize, velocity: &Vector2<f64>) {
        self.velocities.set_column(i, velocity);
    }

    /// Re-reads the species mass, used after a species edit.
    pub fn refresh_masses(&mut self, table: &SpeciesTable) {
        for i in 0..self.n_atoms {
            if let Ok(species) = table.get(self.species[i]) {
                self.masses[i] = species.mass;
            }
        }
    }
}

impl Default for Atoms {
    fn default() -> Self {
        Self::new()
    }
}

/// Sites of an `nx` by `ny` square lattice starting at `origin`.
pub fn square_lattice(
    origin: Vector2<f64>,
    nx: usize,
    ny: usize,
    spacing: f64,
) -> Result<Vec<Vector2<f64>>> {
    if spacing < 0.0 || spacing.is_nan() {
        return Err(KineticaError::NegativeSpacing { spacing });
    }
    let mut sites = Vec::with_capacity(nx * ny);
    for iy in 0..ny {
        for ix in 0..nx {
            sites.push(origin + Vector2::new(ix as f64 * spacing, iy as f64 * spacing));
        }
    }
    Ok(sites)
}
