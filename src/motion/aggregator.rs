use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::ops::ControlFlow;
use std::rc::Rc;

use log::debug;

use super::MotionParams;
use crate::sensor::SampleCallback;
use crate::types::{magnitude, subtract, MeasurementResult, TimestampedSample, Vector3};

const DEFAULT_HISTORY: usize = 50;

/// Gravity offset shared between the calibrator (single writer) and the
/// aggregator's sample callbacks. `None` until calibrated.
#[derive(Clone, Debug, Default)]
pub struct GravityCell(Rc<Cell<Option<Vector3>>>);

impl GravityCell {
    pub fn new(offset: Option<Vector3>) -> Self {
        Self(Rc::new(Cell::new(offset)))
    }

    pub fn get(&self) -> Option<Vector3> {
        self.0.get()
    }

    /// The correction applied to raw readings; zero while uncalibrated
    pub fn offset(&self) -> Vector3 {
        self.0.get().unwrap_or(Vector3::ZERO)
    }

    pub fn set(&self, offset: Vector3) {
        self.0.set(Some(offset));
    }

    pub fn is_calibrated(&self) -> bool {
        self.0.get().is_some()
    }
}

/// Mass/length constants, swapped in by the session before each measurement
#[derive(Clone, Debug, Default)]
pub struct ParamsCell(Rc<Cell<MotionParams>>);

impl ParamsCell {
    pub fn new(params: MotionParams) -> Self {
        Self(Rc::new(Cell::new(params)))
    }

    pub fn get(&self) -> MotionParams {
        self.0.get()
    }

    pub fn set(&self, params: MotionParams) {
        self.0.set(params);
    }
}

/// Live values for one measuring interval. Max fields never decrease until reset.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LiveMeasurementState {
    pub angular_velocity: f64,
    pub kinetic_energy: f64,
    pub max_acceleration: f64,
    pub max_angular_velocity: f64,
    pub max_energy: f64,
    pub max_tip_speed: f64,
}

pub type SharedAggregator = Rc<RefCell<MotionAggregator>>;

pub struct MotionAggregator {
    gravity: GravityCell,
    params: ParamsCell,
    live: LiveMeasurementState,
    latest_corrected: Option<Vector3>,
    latest_magnitude: f64,
    recording: bool,
    recorded: Vec<TimestampedSample>,
    magnitude_history: VecDeque<f64>,
    history_capacity: usize,
    dropped_samples: u64,
}

impl MotionAggregator {
    pub fn new(gravity: GravityCell, params: ParamsCell) -> Self {
        Self::with_history_capacity(gravity, params, DEFAULT_HISTORY)
    }

    pub fn with_history_capacity(gravity: GravityCell, params: ParamsCell, history_capacity: usize) -> Self {
        Self {
            gravity,
            params,
            live: LiveMeasurementState::default(),
            latest_corrected: None,
            latest_magnitude: 0.0,
            recording: false,
            recorded: Vec::new(),
            magnitude_history: VecDeque::with_capacity(history_capacity),
            history_capacity,
            dropped_samples: 0,
        }
    }

    pub fn shared(self) -> SharedAggregator {
        Rc::new(RefCell::new(self))
    }

    /// Gravity-correct one accelerometer sample and fold it into the maxima.
    /// Returns the corrected magnitude, or `None` if the sample was dropped.
    pub fn on_acceleration(&mut self, sample: TimestampedSample) -> Option<f64> {
        if !sample.vector.is_finite() {
            self.dropped_samples += 1;
            debug!("Dropping non-finite accelerometer sample at {}", sample.timestamp);
            return None;
        }

        let corrected = subtract(sample.vector, self.gravity.offset());
        let value = magnitude(corrected);
        if !value.is_finite() {
            self.dropped_samples += 1;
            debug!("Dropping accelerometer sample at {}, magnitude overflows", sample.timestamp);
            return None;
        }

        self.live.max_acceleration = self.live.max_acceleration.max(value);
        self.latest_corrected = Some(corrected);
        self.latest_magnitude = value;

        self.magnitude_history.push_back(value);
        while self.magnitude_history.len() > self.history_capacity {
            self.magnitude_history.pop_front();
        }

        if self.recording {
            self.recorded.push(sample);
        }

        Some(value)
    }

    /// Convert one gyroscope sample into tip speed and kinetic energy.
    /// Gyroscope readings carry no bias correction. Returns the instantaneous energy.
    pub fn on_rotation(&mut self, sample: TimestampedSample) -> Option<f64> {
        if !sample.vector.is_finite() {
            self.dropped_samples += 1;
            debug!("Dropping non-finite gyroscope sample at {}", sample.timestamp);
            return None;
        }

        let params = self.params.get();
        let omega = magnitude(sample.vector);
        let tip_speed = params.tip_speed(omega);
        let energy = params.kinetic_energy(tip_speed);
        if !energy.is_finite() || !tip_speed.is_finite() {
            self.dropped_samples += 1;
            debug!("Dropping gyroscope sample at {}, energy overflows", sample.timestamp);
            return None;
        }

        self.live.angular_velocity = omega;
        self.live.kinetic_energy = energy;
        self.live.max_angular_velocity = self.live.max_angular_velocity.max(omega);
        self.live.max_energy = self.live.max_energy.max(energy);
        self.live.max_tip_speed = self.live.max_tip_speed.max(tip_speed);

        Some(energy)
    }

    /// Zero every running value for a new measuring interval
    pub fn reset(&mut self) {
        self.live = LiveMeasurementState::default();
        self.latest_corrected = None;
        self.latest_magnitude = 0.0;
        self.magnitude_history.clear();
    }

    pub fn snapshot(&self, timestamp: i64) -> MeasurementResult {
        MeasurementResult {
            max_acceleration: self.live.max_acceleration,
            max_angular_velocity: self.live.max_angular_velocity,
            max_energy: self.live.max_energy,
            max_tip_speed: self.live.max_tip_speed,
            timestamp,
        }
    }

    pub fn live(&self) -> LiveMeasurementState {
        self.live
    }

    pub fn latest_corrected(&self) -> Option<Vector3> {
        self.latest_corrected
    }

    pub fn latest_magnitude(&self) -> f64 {
        self.latest_magnitude
    }

    pub fn magnitude_history(&self) -> &VecDeque<f64> {
        &self.magnitude_history
    }

    pub fn dropped_samples(&self) -> u64 {
        self.dropped_samples
    }

    /// Begin appending raw accelerometer samples. Clears the previous
    /// recording and the acceleration maximum.
    pub fn start_recording(&mut self) {
        self.recorded.clear();
        self.live.max_acceleration = 0.0;
        self.recording = true;
    }

    pub fn stop_recording(&mut self) -> usize {
        self.recording = false;
        self.recorded.len()
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    pub fn recorded(&self) -> &[TimestampedSample] {
        &self.recorded
    }

    pub fn clear_recording(&mut self) {
        self.recording = false;
        self.recorded.clear();
    }

    pub fn acceleration_callback(aggregator: &SharedAggregator) -> SampleCallback {
        let aggregator = Rc::clone(aggregator);
        Box::new(move |sample| {
            aggregator.borrow_mut().on_acceleration(sample);
            ControlFlow::Continue(())
        })
    }

    pub fn rotation_callback(aggregator: &SharedAggregator) -> SampleCallback {
        let aggregator = Rc::clone(aggregator);
        Box::new(move |sample| {
            aggregator.borrow_mut().on_rotation(sample);
            ControlFlow::Continue(())
        })
    }
}

/// Verbal energy scale shown to younger students
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnergyLevel {
    Barely,
    ALittle,
    Quite,
    ALot,
    Tremendous,
}

impl EnergyLevel {
    pub fn from_energy(energy: f64) -> Self {
        if energy < 0.01 {
            EnergyLevel::Barely
        } else if energy < 0.1 {
            EnergyLevel::ALittle
        } else if energy < 0.5 {
            EnergyLevel::Quite
        } else if energy < 1.0 {
            EnergyLevel::ALot
        } else {
            EnergyLevel::Tremendous
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            EnergyLevel::Barely => "Barely any",
            EnergyLevel::ALittle => "A little",
            EnergyLevel::Quite => "Quite a bit!",
            EnergyLevel::ALot => "A lot!",
            EnergyLevel::Tremendous => "Tremendous!!",
        }
    }
}
