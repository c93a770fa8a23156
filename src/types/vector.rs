use serde::{Deserialize, Serialize};

/// Three-axis reading, either acceleration (m/s²) or angular velocity (rad/s)
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub const ZERO: Vector3 = Vector3 { x: 0.0, y: 0.0, z: 0.0 };

    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn magnitude(&self) -> f64 {
        magnitude(*self)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// Euclidean norm. Zero only for the zero vector.
pub fn magnitude(v: Vector3) -> f64 {
    (v.x * v.x + v.y * v.y + v.z * v.z).sqrt()
}

/// Elementwise `a - b`, used as `subtract(raw, gravity_offset)`
pub fn subtract(a: Vector3, b: Vector3) -> Vector3 {
    Vector3 {
        x: a.x - b.x,
        y: a.y - b.y,
        z: a.z - b.z,
    }
}

/// One sensor callback: a reading plus its capture time (Unix ms)
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct TimestampedSample {
    #[serde(flatten)]
    pub vector: Vector3,
    pub timestamp: i64,
}

impl TimestampedSample {
    pub fn new(x: f64, y: f64, z: f64, timestamp: i64) -> Self {
        Self {
            vector: Vector3::new(x, y, z),
            timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn magnitude_is_never_negative() {
        let samples = [
            Vector3::new(-3.0, -4.0, 0.0),
            Vector3::new(0.1, -0.2, 9.8),
            Vector3::new(-1e-9, 0.0, 0.0),
        ];
        for v in samples {
            assert!(magnitude(v) > 0.0);
        }
        assert_eq!(magnitude(Vector3::new(3.0, 4.0, 0.0)), 5.0);
    }

    #[test]
    fn magnitude_is_zero_only_for_zero_vector() {
        assert_eq!(magnitude(Vector3::ZERO), 0.0);
        assert!(magnitude(Vector3::new(0.0, 0.0, 1e-12)) > 0.0);
    }

    #[test]
    fn subtract_is_pure() {
        let raw = Vector3::new(1.0, 0.0, 9.8);
        let offset = Vector3::new(0.0, 0.0, 9.8);
        let first = subtract(raw, offset);
        let second = subtract(raw, offset);
        assert_eq!(first, second);
        assert_eq!(first, Vector3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn sample_json_matches_device_payload() {
        let sample: TimestampedSample =
            serde_json::from_str(r#"{"x":0.5,"y":-1.0,"z":9.81,"timestamp":1700000000000}"#).unwrap();
        assert_eq!(sample.vector, Vector3::new(0.5, -1.0, 9.81));
        assert_eq!(sample.timestamp, 1_700_000_000_000);
    }

    #[test]
    fn non_finite_components_are_detected() {
        assert!(Vector3::new(1.0, 2.0, 3.0).is_finite());
        assert!(!Vector3::new(f64::NAN, 0.0, 0.0).is_finite());
        assert!(!Vector3::new(0.0, f64::INFINITY, 0.0).is_finite());
    }
}
