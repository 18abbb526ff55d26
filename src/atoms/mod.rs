//! The atom store that the atomic engine integrates, split by concern across `impl Atoms` blocks.
pub mod neighbour_list;
pub mod new;
pub mod properties;
pub mod transformations;
pub mod velocities;
