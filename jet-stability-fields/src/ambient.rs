use serde::{Deserialize, Serialize};

/// Ambient gas state used to non-dimensionalise the mean flow.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AmbientConditions {
    /// Specific gas constant (J/(kg K)).
    pub gas_constant: f64,
    /// Ratio of specific heats.
    pub gamma: f64,
    /// Nozzle diameter (m).
    pub nozzle_diameter: f64,
    /// Ambient pressure (Pa).
    pub pressure: f64,
    /// Ambient temperature (K).
    pub temperature: f64,
}

impl Default for AmbientConditions {
    fn default() -> Self {
        Self {
            gas_constant: 287.1,
            gamma: 1.4,
            nozzle_diameter: 0.038,
            pressure: 98_000.0,
            temperature: 288.15,
        }
    }
}

impl AmbientConditions {
    pub fn density(&self) -> f64 {
        self.pressure / (self.gas_constant * self.temperature)
    }

    pub fn sound_speed(&self) -> f64 {
        self.speed_of_sound_at(self.temperature)
    }

    pub fn speed_of_sound_at(&self, temperature: f64) -> f64 {
        (self.gamma * self.gas_constant * temperature).sqrt()
    }

    /// `(gamma - 1) T_0`, the temperature scale of the mean-flow convention.
    pub fn temperature_scale(&self) -> f64 {
        (self.gamma - 1.0) * self.temperature
    }

    /// `gamma p_0`, the pressure scale of the mean-flow convention.
    pub fn pressure_scale(&self) -> f64 {
        self.gamma * self.pressure
    }

    pub fn validate(&self) -> Result<(), String> {
        let positive = [
            ("gas_constant", self.gas_constant),
            ("nozzle_diameter", self.nozzle_diameter),
            ("pressure", self.pressure),
            ("temperature", self.temperature),
        ];
        for (name, value) in positive {
            if !(value > 0.0) {
                return Err(format!("{} must be positive, got {}", name, value));
            }
        }
        if !(self.gamma > 1.0) {
            return Err(format!("gamma must exceed 1, got {}", self.gamma));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn derived_state() {
        let air = AmbientConditions::default();
        assert_relative_eq!(air.density(), 1.184607, epsilon = 1e-6);
        assert_relative_eq!(air.sound_speed(), 340.322, epsilon = 1e-3);
        assert_relative_eq!(air.temperature_scale(), 115.26, epsilon = 1e-9);
    }

    #[test]
    fn rejects_unphysical_state() {
        let air = AmbientConditions {
            gamma: 1.0,
            ..Default::default()
        };
        assert!(air.validate().is_err());
        assert!(AmbientConditions::default().validate().is_ok());
    }
}
