//! The rectangular cell the particles live in, together with the ambient medium constants.
use na::Vector2;

use crate::errors::{KineticaError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryMode {
    /// Particles may leave the cell freely.
    Open,
    /// Walls on all four sides.
    Reflective,
    /// Wraps on both axes.
    Periodic,
    /// Wraps along x, walls at the top and bottom.
    PeriodicX,
    /// Wraps along y, walls left and right.
    PeriodicY,
}

impl BoundaryMode {
    pub fn pbc(&self) -> [bool; 2] {
        match self {
            BoundaryMode::Periodic => [true, true],
            BoundaryMode::PeriodicX => [true, false],
            BoundaryMode::PeriodicY => [false, true],
            BoundaryMode::Open | BoundaryMode::Reflective => [false, false],
        }
    }

    pub fn walls(&self) -> [bool; 2] {
        match self {
            BoundaryMode::Reflective => [true, true],
            BoundaryMode::PeriodicX => [false, true],
            BoundaryMode::PeriodicY => [true, false],
            BoundaryMode::Open | BoundaryMode::Periodic => [false, false],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub mode: BoundaryMode,
    /// Ambient viscosity used by friction
    pub viscosity: f64,
    /// Relative permittivity of the medium
    pub dielectric: f64,
}

impl SimulationBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64, mode: BoundaryMode) -> Result<Self> {
        if !(width > 0.0) {
            return Err(KineticaError::InvalidParameter {
                name: "box width",
                value: width,
            });
        }
        if !(height > 0.0) {
            return Err(KineticaError::InvalidParameter {
                name: "box height",
                value: height,
            });
        }
        Ok(Self {
            x,
            y,
            width,
            height,
            mode,
            viscosity: 1.0,
            dielectric: 1.0,
        })
    }

    pub fn origin(&self) -> Vector2<f64> {
        Vector2::new(self.x, self.y)
    }

    fn extent(&self, axis: usize) -> f64 {
        if axis == 0 {
            self.width
        } else {
            self.height
        }
    }

    fn low(&self, axis: usize) -> f64 {
        if axis == 0 {
            self.x
        } else {
            self.y
        }
    }

    /// Minimum-image displacement along the periodic axes.
    pub fn apply_boundary_conditions_dis(&self, rij: &mut Vector2<f64>) {
        let pbc = self.mode.pbc();
        for axis in 0..2 {
            if pbc[axis] {
                let len = self.extent(axis);
                rij[axis] -= len * (rij[axis] / len).round();
            }
        }
    }

    pub fn min_image(&self, mut rij: Vector2<f64>) -> Vector2<f64> {
        self.apply_boundary_conditions_dis(&mut rij);
        rij
    }

    /// Re-enters the cell along periodic axes and bounces off walls. `radius` is the
    /// contact distance to a wall. Returns true if the particle hit a wall.
    pub fn apply_boundary_conditions_pos(
        &self,
        position: &mut Vector2<f64>,
        velocity: &mut Vector2<f64>,
        radius: f64,
    ) -> bool {
        let pbc = self.mode.pbc();
        let walls = self.mode.walls();
        let mut bounced = false;

        for axis in 0..2 {
            let low = self.low(axis);
            let len = self.extent(axis);
            if pbc[axis] {
                position[axis] = low + (position[axis] - low).rem_euclid(len);
                // rem_euclid can round up to exactly len
                if position[axis] >= low + len {
                    position[axis] = low;
                }
            } else if walls[axis] {
                let radius = radius.min(0.5 * len);
                let lo = low + radius;
                let hi = low + len - radius;
                if position[axis] < lo {
                    position[axis] = (2.0 * lo - position[axis]).min(hi);
                    velocity[axis] = velocity[axis].abs();
                    bounced = true;
                } else if position[axis] > hi {
                    position[axis] = (2.0 * hi - position[axis]).max(lo);
                    velocity[axis] = -velocity[axis].abs();
                    bounced = true;
                }
            }
        }
        bounced
    }

    /// Whether a point lies in the rectangle the cell covers.
    pub fn contains(&self, position: &Vector2<f64>) -> bool {
        position.x >= self.x
            && position.x < self.x + self.width
            && position.y >= self.y
            && position.y < self.y + self.height
    }
}

impl Default for SimulationBox {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: 100.0,
            height: 100.0,
            mode: BoundaryMode::Reflective,
            viscosity: 1.0,
            dielectric: 1.0,
        }
    }
}
