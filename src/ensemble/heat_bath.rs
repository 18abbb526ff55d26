use crate::errors::{KineticaError, Result};

/// Weak velocity-rescaling coupling to a reservoir at `expected_temperature`. Each step closes
/// a `1 / relaxation_steps` share of the gap between the current and expected temperature.
#[derive(Debug, Clone, PartialEq)]
pub struct HeatBath {
    pub expected_temperature: f64,
    pub relaxation_steps: usize,
    /// Net energy the bath has put into the system (negative when it has drained heat)
    pub exchanged_energy: f64,
}

impl HeatBath {
    pub fn new(expected_temperature: f64, relaxation_steps: usize) -> Result<Self> {
        if expected_temperature < 0.0 || !expected_temperature.is_finite() {
            return Err(KineticaError::InvalidParameter {
                name: "heat bath temperature",
                value: expected_temperature,
            });
        }
        let relaxation_steps = if relaxation_steps == 0 {
            log::warn!("heat bath relaxation of 0 steps clamped to 1");
            1
        } else {
            relaxation_steps
        };
        Ok(Self {
            expected_temperature,
            relaxation_steps,
            exchanged_energy: 0.0,
        })
    }

    // lambda = sqrt(1 + (T0 / T - 1) / tau)
    pub fn scaling_factor(&self, current_temperature: f64) -> f64 {
        if current_temperature <= 0.0 {
            return 1.0;
        }
        let ratio = self.expected_temperature / current_temperature;
        (1.0 + (ratio - 1.0) / self.relaxation_steps as f64)
            .max(0.0)
            .sqrt()
    }

    /// Velocity factor for this step. The energy it implies is booked as exchanged.
    pub fn couple(&mut self, current_temperature: f64, kinetic_energy: f64) -> f64 {
        let lambda = self.scaling_factor(current_temperature);
        self.exchanged_energy += kinetic_energy * (lambda * lambda - 1.0);
        lambda
    }
}
