//! External fields, point restraints and friction. Every contributor is independent of the
//! others, so the order they are applied in does not matter.
use na::Vector2;

use crate::atoms::new::Restraint;
use crate::math::{cross, normalize_or_x};

/// What a field needs to know about the particle it acts on.
#[derive(Debug, Clone, Copy)]
pub struct FieldProbe {
    pub position: Vector2<f64>,
    pub velocity: Vector2<f64>,
    /// Mass already multiplied by `Units::mvv_to_energy`, so mass times acceleration is a force
    pub mass: f64,
    pub charge: f64,
    /// Zero for point atoms
    pub dipole: Vector2<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FieldResponse {
    pub force: Vector2<f64>,
    pub torque: f64,
    pub potential: f64,
}

pub trait FieldContributor {
    /// Response of one particle at model time `time`. A negative time evaluates statically:
    /// velocity-dependent terms vanish and oscillating fields take their t = 0 value.
    /// Potentials are measured from `origin`.
    fn respond(&self, probe: &FieldProbe, time: f64, origin: &Vector2<f64>) -> FieldResponse;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Field {
    Gravity {
        g: f64,
        direction: Vector2<f64>,
    },
    /// E(t) = intensity · cos(frequency · t) along `direction`.
    Electric {
        intensity: f64,
        direction: Vector2<f64>,
        frequency: f64,
    },
    /// Out-of-plane field; only moving charges feel it.
    Magnetic { b: f64 },
    Acceleration {
        a: f64,
        direction: Vector2<f64>,
    },
}

impl Field {
    pub fn gravity(g: f64) -> Self {
        Field::Gravity {
            g,
            direction: -Vector2::y(),
        }
    }

    pub fn electric(intensity: f64, direction: Vector2<f64>) -> Self {
        Field::Electric {
            intensity,
            direction,
            frequency: 0.0,
        }
    }

    pub fn is_velocity_dependent(&self) -> bool {
        matches!(self, Field::Magnetic { .. })
    }
}

fn uniform(
    strength: f64,
    direction: &Vector2<f64>,
    position: &Vector2<f64>,
    origin: &Vector2<f64>,
) -> FieldResponse {
    let force = normalize_or_x(direction) * strength;
    FieldResponse {
        force,
        torque: 0.0,
        potential: -force.dot(&(position - origin)),
    }
}

impl FieldContributor for Field {
    fn respond(&self, probe: &FieldProbe, time: f64, origin: &Vector2<f64>) -> FieldResponse {
        match *self {
            Field::Gravity { g, direction } => {
                uniform(probe.mass * g, &direction, &probe.position, origin)
            }
            Field::Acceleration { a, direction } => {
                uniform(probe.mass * a, &direction, &probe.position, origin)
            }
            Field::Electric {
                intensity,
                direction,
                frequency,
            } => {
                let t = time.max(0.0);
                let e = normalize_or_x(&direction) * intensity * (frequency * t).cos();
                let force = e * probe.charge;
                FieldResponse {
                    force,
                    torque: cross(&probe.dipole, &e),
                    potential: -force.dot(&(probe.position - origin)) - probe.dipole.dot(&e),
                }
            }
            Field::Magnetic { b } => {
                if time < 0.0 {
                    return FieldResponse::default();
                }
                let v = probe.velocity;
                FieldResponse {
                    force: Vector2::new(v.y, -v.x) * (probe.charge * b),
                    torque: 0.0,
                    potential: 0.0,
                }
            }
        }
    }
}

/// Harmonic pull towards the anchor: force and stored energy.
pub fn restraint_force(restraint: &Restraint, position: &Vector2<f64>) -> (Vector2<f64>, f64) {
    let dr = position - restraint.anchor;
    (-restraint.k * dr, 0.5 * restraint.k * dr.norm_squared())
}

/// Linear drag from the ambient viscosity.
pub fn friction_force(friction: f64, viscosity: f64, velocity: &Vector2<f64>) -> Vector2<f64> {
    -friction * viscosity * velocity
}
