use std::fmt;

use serde::{Deserialize, Serialize};

use super::FlailType;

/// Immutable snapshot of the running maxima, taken when a measurement stops
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq)]
pub struct MeasurementResult {
    pub max_acceleration: f64,
    pub max_angular_velocity: f64,
    pub max_energy: f64,
    pub max_tip_speed: f64,
    pub timestamp: i64,
}

/// Outcome of the two-phase flow
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Comparison {
    pub infantry: MeasurementResult,
    pub cavalry: MeasurementResult,
    pub winner: FlailType,
    pub difference: f64,
}

impl Comparison {
    /// Ties go to infantry.
    pub fn new(infantry: MeasurementResult, cavalry: MeasurementResult) -> Self {
        let winner = if infantry.max_energy >= cavalry.max_energy {
            FlailType::Infantry
        } else {
            FlailType::Cavalry
        };

        Self {
            infantry,
            cavalry,
            winner,
            difference: (infantry.max_energy - cavalry.max_energy).abs(),
        }
    }

    pub fn result_for(&self, flail_type: FlailType) -> &MeasurementResult {
        match flail_type {
            FlailType::Infantry => &self.infantry,
            FlailType::Cavalry => &self.cavalry,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GradeLevel {
    Elementary,
    Secondary,
}

impl GradeLevel {
    pub fn key(&self) -> &'static str {
        match self {
            GradeLevel::Elementary => "elementary",
            GradeLevel::Secondary => "secondary",
        }
    }
}

impl fmt::Display for GradeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Where an uploaded result is appended: `[gradeLevel, flailType]`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResultPath {
    pub grade_level: GradeLevel,
    pub flail_type: FlailType,
}

impl ResultPath {
    pub fn new(grade_level: GradeLevel, flail_type: FlailType) -> Self {
        Self {
            grade_level,
            flail_type,
        }
    }

    /// Topic under `prefix`, e.g. `measurements/secondary/cavalry`
    pub fn topic(&self, prefix: &str) -> String {
        format!("{}/{}/{}", prefix.trim_end_matches('/'), self.grade_level.key(), self.flail_type.key())
    }
}

/// Record appended to the remote sink
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UploadRecord {
    pub max_energy: f64,
    pub max_angular_velocity: f64,
    pub timestamp: i64,
}

impl From<&MeasurementResult> for UploadRecord {
    fn from(result: &MeasurementResult) -> Self {
        Self {
            max_energy: result.max_energy,
            max_angular_velocity: result.max_angular_velocity,
            timestamp: result.timestamp,
        }
    }
}

/// Result of a session history save
#[derive(Debug)]
pub struct SaveResult {
    pub session_name: Option<String>,
    pub samples_saved: usize,
    pub error: Option<String>,
}

impl SaveResult {
    pub fn success(session_name: String, samples_saved: usize) -> Self {
        Self {
            session_name: Some(session_name),
            samples_saved,
            error: None,
        }
    }

    pub fn error(error: String) -> Self {
        Self {
            session_name: None,
            samples_saved: 0,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(max_energy: f64) -> MeasurementResult {
        MeasurementResult {
            max_energy,
            ..Default::default()
        }
    }

    #[test]
    fn larger_energy_wins() {
        let comparison = Comparison::new(result(5.0), result(3.0));
        assert_eq!(comparison.winner, FlailType::Infantry);
        assert!((comparison.difference - 2.0).abs() < 1e-12);

        let comparison = Comparison::new(result(1.0), result(4.5));
        assert_eq!(comparison.winner, FlailType::Cavalry);
        assert!((comparison.difference - 3.5).abs() < 1e-12);
    }

    #[test]
    fn upload_record_uses_camel_case() {
        let record = UploadRecord {
            max_energy: 1.5,
            max_angular_velocity: 2.0,
            timestamp: 42,
        };
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"maxEnergy":1.5,"maxAngularVelocity":2.0,"timestamp":42}"#);
    }

    #[test]
    fn result_path_topic() {
        let path = ResultPath::new(GradeLevel::Secondary, FlailType::Cavalry);
        assert_eq!(path.topic("measurements"), "measurements/secondary/cavalry");
        assert_eq!(path.topic("measurements/"), "measurements/secondary/cavalry");
    }
}
