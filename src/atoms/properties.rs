use na::Vector2;

use crate::atoms::new::Atoms;
use crate::constants::Units;
use crate::species::SpeciesId;

/// Axis-aligned rectangle used to restrict queries to part of the cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Region {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Region {
    pub fn contains(&self, p: &Vector2<f64>) -> bool {
        p.x >= self.x && p.x <= self.x + self.width && p.y >= self.y && p.y <= self.y + self.height
    }
}

/// Which atoms a thermostat operation or energy query applies to.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    pub species: Option<Vec<SpeciesId>>,
    pub region: Option<Region>,
}

impl Selection {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn of_species(species: &[SpeciesId]) -> Self {
        Self {
            species: Some(species.to_vec()),
            region: None,
        }
    }

    pub fn within(mut self, region: Region) -> Self {
        self.region = Some(region);
        self
    }

    pub fn includes(&self, atoms: &Atoms, i: usize) -> bool {
        if !atoms.is_live(i) {
            return false;
        }
        if let Some(species) = &self.species {
            if !species.contains(&atoms.species[i]) {
                return false;
            }
        }
        match &self.region {
            Some(region) => region.contains(&atoms.position(i)),
            None => true,
        }
    }
}

impl Atoms {
    pub fn selected<'a>(&'a self, selection: &'a Selection) -> impl Iterator<Item = usize> + 'a {
        (0..self.n_atoms).filter(move |&i| selection.includes(self, i))
    }

    pub fn mass_i(&self, i: usize) -> f64 {
        self.masses[i]
    }

    pub fn kinetic_energy_i(&self, i: usize, units: &Units) -> f64 {
        0.5 * self.masses[i] * self.velocities.column(i).norm_squared() * units.mvv_to_energy
    }

    pub fn kinetic_energy(&self, units: &Units) -> f64 {
        self.live().map(|i| self.kinetic_energy_i(i, units)).sum()
    }

    pub fn kinetic_energy_of(&self, selection: &Selection, units: &Units) -> f64 {
        self.selected(selection)
            .map(|i| self.kinetic_energy_i(i, units))
            .sum()
    }

    /// Two translational degrees of freedom per atom.
    pub fn current_temperature(&self, kinetic_energy: f64, n_atoms: usize, units: &Units) -> f64 {
        if n_atoms == 0 {
            return 0.0;
        }
        kinetic_energy / (n_atoms as f64 * units.boltzmann)
    }

    /// Temperature of the movable part of `selection`; fixed atoms carry no degrees of freedom.
    pub fn temperature_of(&self, selection: &Selection, units: &Units) -> f64 {
        self.members_temperature(&self.thermal_members(selection), units)
    }

    /// Movable atoms in the selection; these are the only ones a thermostat touches.
    pub(crate) fn thermal_members(&self, selection: &Selection) -> Vec<usize> {
        self.selected(selection)
            .filter(|&i| self.movable[i])
            .collect()
    }

    pub(crate) fn members_temperature(&self, members: &[usize], units: &Units) -> f64 {
        let kinetic_energy: f64 = members
            .iter()
            .map(|&i| self.kinetic_energy_i(i, units))
            .sum();
        self.current_temperature(kinetic_energy, members.len(), units)
    }

    pub fn momentum(&self) -> Vector2<f64> {
        self.live()
            .fold(Vector2::zeros(), |p, i| p + self.velocity(i) * self.masses[i])
    }

    pub fn current_acceleration(&self, i: usize, units: &Units) -> Vector2<f64> {
        self.forces.column(i) / (self.masses[i] * units.mvv_to_energy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atoms::new::AtomSpec;
    use crate::species::Species;
    use approx::assert_relative_eq;

    fn pair() -> Atoms {
        let mut atoms = Atoms::new();
        let light = Species::new("L", 1.0, 1.0, 0.1);
        let heavy = Species::new("H", 4.0, 1.0, 0.1);
        atoms.push(&AtomSpec::new(SpeciesId(0), 0.0, 0.0).with_velocity(2.0, 0.0), &light);
        atoms.push(&AtomSpec::new(SpeciesId(1), 5.0, 5.0).with_velocity(0.0, 1.0), &heavy);
        atoms
    }

    #[test]
    fn kinetic_energy_and_temperature() {
        let atoms = pair();
        let units = Units::reduced();
        assert_relative_eq!(atoms.kinetic_energy(&units), 4.0);
        let all = Selection::all();
        assert_relative_eq!(atoms.temperature_of(&all, &units), 2.0);
    }

    #[test]
    fn selections_filter_by_species_and_region() {
        let atoms = pair();
        let units = Units::reduced();
        let heavy = Selection::of_species(&[SpeciesId(1)]);
        assert_relative_eq!(atoms.kinetic_energy_of(&heavy, &units), 2.0);

        let corner = Selection::all().within(Region {
            x: -1.0,
            y: -1.0,
            width: 2.0,
            height: 2.0,
        });
        assert_eq!(atoms.selected(&corner).collect::<Vec<_>>(), vec![0]);
    }

    #[test]
    fn fixed_atoms_do_not_dilute_temperature() {
        let mut atoms = pair();
        let light = Species::new("L", 1.0, 1.0, 0.1);
        atoms.push(&AtomSpec::new(SpeciesId(0), 2.0, 2.0).fixed(), &light);
        let units = Units::reduced();
        assert_relative_eq!(atoms.temperature_of(&Selection::all(), &units), 2.0);
        assert_eq!(atoms.thermal_members(&Selection::all()), vec![0, 1]);
    }

    #[test]
    fn workbench_units_scale_kinetic_energy() {
        let atoms = pair();
        let units = Units::workbench();
        assert_relative_eq!(atoms.kinetic_energy(&units), 4.0 * units.mvv_to_energy);
    }
}
