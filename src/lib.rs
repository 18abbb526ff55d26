//! A 2D classical-mechanics kernel for interactive molecular dynamics: point atoms under
//! Lennard-Jones, Coulomb, bonded and external forces with optional collision chemistry, and
//! rigid Gay-Berne bodies for mesoscale work.
extern crate nalgebra as na;

pub mod atoms;
pub mod bodies;
pub mod constants;
pub mod ensemble;
pub mod errors;
pub mod math;
pub mod model;
pub mod potentials;
pub mod reactions;
pub mod readers;
pub mod simulation_box;
pub mod snapshot;
pub mod species;
