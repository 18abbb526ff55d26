pub mod bonded;
pub mod coulomb;
pub mod fields;
pub mod gay_berne;
pub mod lennard_jones;
pub mod potential;
