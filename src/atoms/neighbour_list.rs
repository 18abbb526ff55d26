use na::Vector2;

use crate::atoms::new::Atoms;
use crate::simulation_box::SimulationBox;
use crate::species::PairTable;

/// Verlet skin list. Neighbours of atom `i` (all with a larger index) are
/// `neighbours[start[i]..end[i]]`.
#[derive(Debug, Clone, Default)]
pub struct NeighbourList {
    pub neighbours: Vec<usize>,
    pub start: Vec<usize>,
    pub end: Vec<usize>,
    reference: Vec<Vector2<f64>>,
    pending: bool,
}

impl NeighbourList {
    pub fn new() -> Self {
        Self {
            pending: true,
            ..Self::default()
        }
    }

    /// Forces a brute-force pass on the next evaluation.
    pub fn invalidate(&mut self) {
        self.pending = true;
    }

    pub fn len(&self) -> usize {
        self.neighbours.len()
    }

    pub fn is_empty(&self) -> bool {
        self.neighbours.is_empty()
    }

    /// Largest minimum-image displacement since the last rebuild.
    pub fn max_displacement(&self, atoms: &Atoms, sim_box: &SimulationBox) -> f64 {
        let mut max_sq: f64 = 0.0;
        for i in atoms.live() {
            let d = sim_box.min_image(atoms.position(i) - self.reference[i]);
            max_sq = max_sq.max(d.norm_squared());
        }
        max_sq.sqrt()
    }

    /// Two atoms closing in on each other can each cover half of the skin.
    pub fn needs_rebuild(&self, atoms: &Atoms, sim_box: &SimulationBox, table: &PairTable) -> bool {
        if self.pending || self.reference.len() != atoms.n_atoms {
            return true;
        }
        let displacement = self.max_displacement(atoms, sim_box);
        if 2.0 * displacement > table.min_skin() {
            log::debug!(
                "neighbour list stale: displacement {displacement:.4} against skin {:.4}",
                table.min_skin()
            );
            return true;
        }
        false
    }

    /// Brute-force pass over every live pair: records the pairs inside the list radius and
    /// hands each of them to `visit`, so a rebuild doubles as a force evaluation.
    pub fn rebuild_with<F>(
        &mut self,
        atoms: &Atoms,
        sim_box: &SimulationBox,
        table: &PairTable,
        mut visit: F,
    ) where
        F: FnMut(usize, usize, Vector2<f64>, f64),
    {
        let n = atoms.n_atoms;
        self.neighbours.clear();
        self.start.clear();
        self.end.clear();
        self.start.resize(n, 0);
        self.end.resize(n, 0);
        self.reference.clear();
        self.reference.extend((0..n).map(|i| atoms.position(i)));

        for i in 0..n {
            self.start[i] = self.neighbours.len();
            if atoms.alive[i] {
                let r_i = atoms.positions.column(i);
                for j in (i + 1)..n {
                    if !atoms.alive[j] {
                        continue;
                    }
                    let mut rij = r_i - atoms.positions.column(j);
                    sim_box.apply_boundary_conditions_dis(&mut rij);
                    let r2 = rij.norm_squared();
                    if r2 < table.get(atoms.species[i], atoms.species[j]).list_sq {
                        self.neighbours.push(j);
                        visit(i, j, rij, r2);
                    }
                }
            }
            self.end[i] = self.neighbours.len();
        }
        self.pending = false;
        log::debug!(
            "neighbour list rebuilt: {} pairs over {} atoms",
            self.neighbours.len(),
            atoms.n_live()
        );
    }

    pub fn rebuild(&mut self, atoms: &Atoms, sim_box: &SimulationBox, table: &PairTable) {
        self.rebuild_with(atoms, sim_box, table, |_, _, _, _| {});
    }

    /// Visits the cached pairs with fresh separations `r_i - r_j`.
    pub fn for_each_pair<F>(&self, atoms: &Atoms, sim_box: &SimulationBox, mut visit: F)
    where
        F: FnMut(usize, usize, Vector2<f64>, f64),
    {
        for i in 0..self.start.len().min(atoms.n_atoms) {
            if !atoms.alive[i] {
                continue;
            }
            let r_i = atoms.positions.column(i);
            for &j in &self.neighbours[self.start[i]..self.end[i]] {
                if !atoms.alive[j] {
                    continue;
                }
                let mut rij = r_i - atoms.positions.column(j);
                sim_box.apply_boundary_conditions_dis(&mut rij);
                visit(i, j, rij, rij.norm_squared());
            }
        }
    }
}

/// Every live pair, without touching any list.
pub fn for_each_pair_brute<F>(atoms: &Atoms, sim_box: &SimulationBox, mut visit: F)
where
    F: FnMut(usize, usize, Vector2<f64>, f64),
{
    for i in 0..atoms.n_atoms {
        if !atoms.alive[i] {
            continue;
        }
        let r_i = atoms.positions.column(i);
        for j in (i + 1)..atoms.n_atoms {
            if !atoms.alive[j] {
                continue;
            }
            let mut rij = r_i - atoms.positions.column(j);
            sim_box.apply_boundary_conditions_dis(&mut rij);
            visit(i, j, rij, rij.norm_squared());
        }
    }
}
