use serde::{Deserialize, Serialize};

use super::SessionError;

/// Point-mass-at-radius model: `v = ω·L`, `E = ½·m·v²`
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct MotionParams {
    pub mass: f64,
    pub total_length: f64,
}

impl Default for MotionParams {
    fn default() -> Self {
        Self {
            mass: 0.0,
            total_length: 0.0,
        }
    }
}

impl MotionParams {
    pub fn new(mass: f64, total_length: f64) -> Self {
        Self { mass, total_length }
    }

    /// Parse form fields. Both values must be finite and greater than zero.
    pub fn from_user_input(mass: &str, total_length: &str) -> Result<Self, SessionError> {
        let mass = parse_positive(mass).ok_or(SessionError::InvalidParameters)?;
        let total_length = parse_positive(total_length).ok_or(SessionError::InvalidParameters)?;
        Ok(Self { mass, total_length })
    }

    pub fn tip_speed(&self, omega: f64) -> f64 {
        omega * guard(self.total_length)
    }

    pub fn kinetic_energy(&self, tip_speed: f64) -> f64 {
        0.5 * guard(self.mass) * tip_speed * tip_speed
    }
}

// degenerate values fall back to zero rather than erroring
fn guard(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

fn parse_positive(text: &str) -> Option<f64> {
    text.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite() && *value > 0.0)
}

/// Where `(mass, total_length)` come from for a measurement
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ParameterSource {
    /// Constants from configuration (the elementary screen)
    Fixed,
    /// Form fields entered before each measurement
    UserInput,
    /// Catalog presets, measured infantry then cavalry
    Preset,
}

/// Raw text of the mass / length form fields
#[derive(Clone, Debug, PartialEq)]
pub struct UserInput {
    pub mass: String,
    pub total_length: String,
}

impl UserInput {
    pub fn new(mass: impl Into<String>, total_length: impl Into<String>) -> Self {
        Self {
            mass: mass.into(),
            total_length: total_length.into(),
        }
    }

    pub fn parse(&self) -> Result<MotionParams, SessionError> {
        MotionParams::from_user_input(&self.mass, &self.total_length)
    }
}

impl Default for UserInput {
    fn default() -> Self {
        Self::new("0.5", "0.3")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn energy_round_trip_for_infantry_constants() {
        let params = MotionParams::new(1.9, 2.375);
        let tip = params.tip_speed(10.0);
        assert!((tip - 23.75).abs() < 1e-9);
        let energy = params.kinetic_energy(tip);
        assert!((energy - 535.953125).abs() < 1e-9);
    }

    #[test]
    fn degenerate_params_give_zero_energy() {
        let zero_mass = MotionParams::new(0.0, 2.0);
        assert_eq!(zero_mass.kinetic_energy(zero_mass.tip_speed(5.0)), 0.0);

        let zero_length = MotionParams::new(1.0, 0.0);
        assert_eq!(zero_length.tip_speed(5.0), 0.0);
        assert_eq!(zero_length.kinetic_energy(0.0), 0.0);

        let nan = MotionParams::new(f64::NAN, -1.0);
        assert_eq!(nan.tip_speed(5.0), 0.0);
        assert_eq!(nan.kinetic_energy(3.0), 0.0);
    }

    #[test]
    fn user_input_must_parse_and_be_positive() {
        assert_eq!(
            MotionParams::from_user_input(" 0.5 ", "0.3").unwrap(),
            MotionParams::new(0.5, 0.3)
        );
        assert_eq!(MotionParams::from_user_input("", "0.3"), Err(SessionError::InvalidParameters));
        assert_eq!(MotionParams::from_user_input("abc", "0.3"), Err(SessionError::InvalidParameters));
        assert_eq!(MotionParams::from_user_input("0.5", "0"), Err(SessionError::InvalidParameters));
        assert_eq!(MotionParams::from_user_input("-1", "0.3"), Err(SessionError::InvalidParameters));
    }

    #[test]
    fn default_form_values() {
        assert_eq!(UserInput::default().parse().unwrap(), MotionParams::new(0.5, 0.3));
    }
}
