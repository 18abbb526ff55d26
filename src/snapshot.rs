//! Flat, column-wise copy of an atomic model's state. Any persistence layer can read and write
//! these vectors without the engine knowing about its format.
use na::Vector2;

use crate::atoms::new::AtomSpec;
use crate::errors::{KineticaError, Result};
use crate::model::atomic::AtomicModel;
use crate::potentials::bonded::{AngularBond, RadialBond};
use crate::simulation_box::SimulationBox;
use crate::species::{SpeciesId, SpeciesTable};

#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub species: Vec<usize>,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub vx: Vec<f64>,
    pub vy: Vec<f64>,
    pub charge: Vec<f64>,
    pub friction: Vec<f64>,
    pub movable: Vec<bool>,
    pub visible: Vec<bool>,
    /// `(anchor_x, anchor_y, k)` for tethered atoms
    pub restraint: Vec<Option<(f64, f64, f64)>>,
    /// `(i, j, length, stiffness, chemical_energy)`
    pub radial_bonds: Vec<(usize, usize, f64, f64, f64)>,
    /// `(i, j, vertex, angle, stiffness)`
    pub angular_bonds: Vec<(usize, usize, usize, f64, f64)>,
    pub boundary: SimulationBox,
}

impl Snapshot {
    pub fn n_atoms(&self) -> usize {
        self.species.len()
    }

    /// Every per-atom column has one entry per atom.
    pub fn validate(&self) -> Result<()> {
        let expected = self.n_atoms();
        let columns = [
            ("x", self.x.len()),
            ("y", self.y.len()),
            ("vx", self.vx.len()),
            ("vy", self.vy.len()),
            ("charge", self.charge.len()),
            ("friction", self.friction.len()),
            ("movable", self.movable.len()),
            ("visible", self.visible.len()),
            ("restraint", self.restraint.len()),
        ];
        for (column, len) in columns {
            if len != expected {
                return Err(KineticaError::InconsistentSnapshot {
                    column,
                    len,
                    expected,
                });
            }
        }
        Ok(())
    }
}

impl AtomicModel {
    /// Live atoms only, renumbered densely; bonds follow the new numbering.
    pub fn snapshot(&self) -> Snapshot {
        let live: Vec<usize> = self.atoms.live().collect();
        let mut remap = vec![usize::MAX; self.atoms.n_atoms];
        for (new, &old) in live.iter().enumerate() {
            remap[old] = new;
        }

        let radial_bonds = self
            .bonds()
            .radial()
            .iter()
            .map(|b| (remap[b.i], remap[b.j], b.length, b.stiffness, b.chemical_energy))
            .collect();
        let angular_bonds = self
            .bonds()
            .angular()
            .iter()
            .map(|b| (remap[b.i], remap[b.j], remap[b.vertex], b.angle, b.stiffness))
            .collect();

        let atoms = &self.atoms;
        Snapshot {
            species: live.iter().map(|&i| atoms.species[i].0).collect(),
            x: live.iter().map(|&i| atoms.positions[(0, i)]).collect(),
            y: live.iter().map(|&i| atoms.positions[(1, i)]).collect(),
            vx: live.iter().map(|&i| atoms.velocities[(0, i)]).collect(),
            vy: live.iter().map(|&i| atoms.velocities[(1, i)]).collect(),
            charge: live.iter().map(|&i| atoms.charges[i]).collect(),
            friction: live.iter().map(|&i| atoms.friction[i]).collect(),
            movable: live.iter().map(|&i| atoms.movable[i]).collect(),
            visible: live.iter().map(|&i| atoms.visible[i]).collect(),
            restraint: live
                .iter()
                .map(|&i| atoms.restraints[i].map(|r| (r.anchor.x, r.anchor.y, r.k)))
                .collect(),
            radial_bonds,
            angular_bonds,
            boundary: *self.boundary(),
        }
    }

    /// Rebuilds a model from a snapshot. Species, atom and bond indices are all checked, so a
    /// bad snapshot is rejected instead of producing a half-built model.
    pub fn from_snapshot(species: SpeciesTable, snapshot: &Snapshot) -> Result<Self> {
        snapshot.validate()?;
        let mut model = AtomicModel::new(species, snapshot.boundary, Default::default());
        for n in 0..snapshot.n_atoms() {
            let species = SpeciesId(snapshot.species[n]);
            let mut spec = AtomSpec::new(species, snapshot.x[n], snapshot.y[n])
                .with_velocity(snapshot.vx[n], snapshot.vy[n])
                .with_charge(snapshot.charge[n])
                .with_friction(snapshot.friction[n]);
            spec.movable = snapshot.movable[n];
            spec.visible = snapshot.visible[n];
            if let Some((x, y, k)) = snapshot.restraint[n] {
                spec = spec.with_restraint(Vector2::new(x, y), k);
            }
            model.add_atom(spec)?;
        }
        for &(i, j, length, stiffness, chemical_energy) in &snapshot.radial_bonds {
            model.add_radial_bond(
                RadialBond::new(i, j, length, stiffness).with_chemical_energy(chemical_energy),
            )?;
        }
        for &(i, j, vertex, angle, stiffness) in &snapshot.angular_bonds {
            model.add_angular_bond(AngularBond {
                i,
                j,
                vertex,
                angle,
                stiffness,
            })?;
        }
        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::Units;
    use crate::species::Species;
    use approx::assert_relative_eq;

    fn water_like() -> AtomicModel {
        let mut species = SpeciesTable::new();
        let o = species.add(Species::new("O", 16.0, 1.2, 0.1)).unwrap();
        let h = species.add(Species::new("H", 1.0, 0.8, 0.05)).unwrap();
        let mut model = AtomicModel::new(species, SimulationBox::default(), Units::reduced());
        model.add_atom(AtomSpec::new(h, 3.0, 3.0)).unwrap();
        model.add_atom(AtomSpec::new(o, 5.0, 5.0).with_velocity(0.1, -0.2)).unwrap();
        model
            .add_atom(
                AtomSpec::new(h, 6.0, 5.0)
                    .with_charge(0.4)
                    .with_restraint(Vector2::new(6.5, 5.0), 4.0),
            )
            .unwrap();
        model.add_atom(AtomSpec::new(h, 5.0, 6.0).fixed().hidden()).unwrap();
        model.add_radial_bond(RadialBond::new(1, 2, 1.0, 10.0)).unwrap();
        model
            .add_radial_bond(RadialBond::new(1, 3, 1.0, 10.0).with_chemical_energy(2.0))
            .unwrap();
        model
            .add_angular_bond(AngularBond {
                i: 2,
                j: 3,
                vertex: 1,
                angle: 1.6,
                stiffness: 5.0,
            })
            .unwrap();
        model
    }

    #[test]
    fn removed_atoms_are_compacted_away() {
        let mut model = water_like();
        model.remove_atom(0).unwrap();
        let snapshot = model.snapshot();
        assert_eq!(snapshot.n_atoms(), 3);
        assert_eq!(snapshot.radial_bonds[0].0, 0);
        assert_eq!(snapshot.radial_bonds[1], (0, 2, 1.0, 10.0, 2.0));
        assert_eq!(snapshot.angular_bonds, vec![(1, 2, 0, 1.6, 5.0)]);
        assert_eq!(snapshot.movable, vec![true, true, false]);
        assert_eq!(snapshot.visible, vec![true, true, false]);
        assert_eq!(snapshot.restraint, vec![None, Some((6.5, 5.0, 4.0)), None]);

        let mut rebuilt = AtomicModel::from_snapshot(model.species().clone(), &snapshot).unwrap();
        rebuilt.set_units(Units::reduced());
        assert_eq!(rebuilt.bonds().radial().len(), 2);
        assert_relative_eq!(rebuilt.atoms.charges[1], 0.4);
        assert!(!rebuilt.atoms.visible[2]);
        assert_relative_eq!(rebuilt.potential_terms().restraint, 0.5, epsilon = 1e-12);
        assert_relative_eq!(rebuilt.potential_energy(), model.potential_energy(), epsilon = 1e-12);
    }

    #[test]
    fn ragged_columns_are_rejected() {
        let mut snapshot = water_like().snapshot();
        snapshot.vy.pop();
        let err = AtomicModel::from_snapshot(SpeciesTable::new(), &snapshot).unwrap_err();
        assert!(matches!(
            err,
            KineticaError::InconsistentSnapshot { column: "vy", .. }
        ));
    }

    #[test]
    fn dangling_bond_index_is_rejected() {
        let model = water_like();
        let mut snapshot = model.snapshot();
        snapshot.radial_bonds.push((0, 9, 1.0, 1.0, 0.0));
        assert!(AtomicModel::from_snapshot(model.species().clone(), &snapshot).is_err());
    }
}
