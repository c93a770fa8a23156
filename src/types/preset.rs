use std::fmt;

use serde::{Deserialize, Serialize};

use crate::motion::MotionParams;

/// The two flail builds that can be compared head to head
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum FlailType {
    Infantry,
    Cavalry,
}

impl FlailType {
    pub fn key(&self) -> &'static str {
        match self {
            FlailType::Infantry => "infantry",
            FlailType::Cavalry => "cavalry",
        }
    }
}

impl fmt::Display for FlailType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Physical description of a flail. Lengths in metres, mass in kilograms.
#[derive(Debug, Clone, PartialEq)]
pub struct PresetSpec {
    pub name: &'static str,
    pub body_length: f64,
    pub head_length: f64,
    pub link_length: f64,
    pub total_length: f64,
    pub mass: f64,
}

impl PresetSpec {
    pub fn params(&self) -> MotionParams {
        MotionParams::new(self.mass, self.total_length)
    }

    /// e.g. `body 185cm / head 47cm / link 5.5cm / mass 1.9kg`
    pub fn description(&self) -> String {
        format!(
            "body {}cm / head {}cm / link {}cm / mass {}kg",
            trim_cm(self.body_length),
            trim_cm(self.head_length),
            trim_cm(self.link_length),
            self.mass
        )
    }
}

fn trim_cm(metres: f64) -> String {
    // 0.055 * 100.0 is not exactly 5.5 in binary
    let cm = (metres * 1000.0).round() / 10.0;
    format!("{}", cm)
}

static INFANTRY: PresetSpec = PresetSpec {
    name: "Infantry flail",
    body_length: 1.85,
    head_length: 0.47,
    link_length: 0.055,
    total_length: 2.375,
    mass: 1.9,
};

static CAVALRY: PresetSpec = PresetSpec {
    name: "Cavalry flail",
    body_length: 1.35,
    head_length: 0.33,
    link_length: 0.035,
    total_length: 1.715,
    mass: 1.1,
};

pub struct PresetCatalog;

impl PresetCatalog {
    pub fn get(flail_type: FlailType) -> &'static PresetSpec {
        match flail_type {
            FlailType::Infantry => &INFANTRY,
            FlailType::Cavalry => &CAVALRY,
        }
    }

    pub fn all() -> [(FlailType, &'static PresetSpec); 2] {
        [
            (FlailType::Infantry, &INFANTRY),
            (FlailType::Cavalry, &CAVALRY),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn total_length_is_sum_of_parts() {
        for (_, spec) in PresetCatalog::all() {
            let sum = spec.body_length + spec.head_length + spec.link_length;
            assert!((sum - spec.total_length).abs() < EPS, "{}", spec.name);
        }
        assert!((PresetCatalog::get(FlailType::Infantry).total_length - 2.375).abs() < EPS);
        assert!((PresetCatalog::get(FlailType::Cavalry).total_length - 1.715).abs() < EPS);
    }

    #[test]
    fn params_come_from_catalog() {
        let params = PresetCatalog::get(FlailType::Cavalry).params();
        assert_eq!(params.mass, 1.1);
        assert_eq!(params.total_length, 1.715);
    }

    #[test]
    fn description_uses_centimetres() {
        assert_eq!(
            PresetCatalog::get(FlailType::Infantry).description(),
            "body 185cm / head 47cm / link 5.5cm / mass 1.9kg"
        );
    }

    #[test]
    fn flail_type_serializes_as_key() {
        assert_eq!(serde_json::to_string(&FlailType::Cavalry).unwrap(), "\"cavalry\"");
        assert_eq!(FlailType::Infantry.to_string(), "infantry");
    }
}
