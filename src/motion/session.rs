use std::fmt;
use std::time::Duration;

use log::{debug, error, info};
use serde::{Deserialize, Serialize};

use super::{GravityCell, MotionAggregator, MotionParams, ParameterSource, ParamsCell, SessionError, SharedAggregator, UserInput};
use crate::sensor::{SensorChannel, SensorSource, SubscriptionHandle};
use crate::types::{Comparison, FlailType, GradeLevel, MeasurementResult, PresetCatalog, ResultPath, TimestampedSample, UploadRecord};
use crate::upload::ResultSink;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MeasurementState {
    Ready,
    Measuring,
    Result,
    InfantryReady,
    InfantryMeasuring,
    InfantryResult,
    CavalryReady,
    CavalryMeasuring,
    CavalryResult,
    FinalResult,
}

impl MeasurementState {
    pub fn name(&self) -> &'static str {
        match self {
            MeasurementState::Ready => "ready",
            MeasurementState::Measuring => "measuring",
            MeasurementState::Result => "result",
            MeasurementState::InfantryReady => "infantry_ready",
            MeasurementState::InfantryMeasuring => "infantry_measuring",
            MeasurementState::InfantryResult => "infantry_result",
            MeasurementState::CavalryReady => "cavalry_ready",
            MeasurementState::CavalryMeasuring => "cavalry_measuring",
            MeasurementState::CavalryResult => "cavalry_result",
            MeasurementState::FinalResult => "final_result",
        }
    }

    pub fn is_measuring(&self) -> bool {
        matches!(
            self,
            MeasurementState::Measuring | MeasurementState::InfantryMeasuring | MeasurementState::CavalryMeasuring
        )
    }

    pub fn is_ready(&self) -> bool {
        matches!(
            self,
            MeasurementState::Ready | MeasurementState::InfantryReady | MeasurementState::CavalryReady
        )
    }

    /// Preset being measured in the two-phase flow
    pub fn flail_type(&self) -> Option<FlailType> {
        match self {
            MeasurementState::InfantryReady | MeasurementState::InfantryMeasuring | MeasurementState::InfantryResult => {
                Some(FlailType::Infantry)
            }
            MeasurementState::CavalryReady | MeasurementState::CavalryMeasuring | MeasurementState::CavalryResult => {
                Some(FlailType::Cavalry)
            }
            _ => None,
        }
    }

    fn initial(parameter_source: ParameterSource) -> Self {
        match parameter_source {
            ParameterSource::Preset => MeasurementState::InfantryReady,
            ParameterSource::Fixed | ParameterSource::UserInput => MeasurementState::Ready,
        }
    }

    fn measuring(&self) -> Option<Self> {
        match self {
            MeasurementState::Ready => Some(MeasurementState::Measuring),
            MeasurementState::InfantryReady => Some(MeasurementState::InfantryMeasuring),
            MeasurementState::CavalryReady => Some(MeasurementState::CavalryMeasuring),
            _ => None,
        }
    }

    fn result(&self) -> Option<Self> {
        match self {
            MeasurementState::Measuring => Some(MeasurementState::Result),
            MeasurementState::InfantryMeasuring => Some(MeasurementState::InfantryResult),
            MeasurementState::CavalryMeasuring => Some(MeasurementState::CavalryResult),
            _ => None,
        }
    }
}

impl fmt::Display for MeasurementState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// When two-phase results are sent to the result sink
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum UploadPolicy {
    /// Each preset result is appended as soon as it is measured
    #[default]
    PerMeasurement,
    /// Both results are appended together when the comparison is shown
    OnFinalize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SessionOptions {
    pub parameter_source: ParameterSource,
    pub fixed_params: MotionParams,
    pub grade_level: GradeLevel,
    pub upload_policy: UploadPolicy,
    pub update_interval: Duration,
    /// Recent magnitudes kept for the live plot
    pub history_len: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            parameter_source: ParameterSource::Preset,
            fixed_params: MotionParams::new(0.5, 0.3),
            grade_level: GradeLevel::Secondary,
            upload_policy: UploadPolicy::PerMeasurement,
            update_interval: Duration::from_millis(100),
            history_len: 50,
        }
    }
}

/// Drives one measurement flow: a single measurement, or infantry then
/// cavalry followed by a comparison.
pub struct MeasurementSession {
    state: MeasurementState,
    options: SessionOptions,
    user_input: UserInput,
    gravity: GravityCell,
    params: ParamsCell,
    aggregator: SharedAggregator,
    subscriptions: Vec<SubscriptionHandle>,
    last_result: Option<MeasurementResult>,
    infantry: Option<MeasurementResult>,
    cavalry: Option<MeasurementResult>,
    comparison: Option<Comparison>,
    sink: Box<dyn ResultSink>,
}

impl MeasurementSession {
    pub fn new(options: SessionOptions, gravity: GravityCell, sink: Box<dyn ResultSink>) -> Self {
        let params = ParamsCell::new(options.fixed_params);
        let aggregator =
            MotionAggregator::with_history_capacity(gravity.clone(), params.clone(), options.history_len).shared();

        Self {
            state: MeasurementState::initial(options.parameter_source),
            options,
            user_input: UserInput::default(),
            gravity,
            params,
            aggregator,
            subscriptions: Vec::new(),
            last_result: None,
            infantry: None,
            cavalry: None,
            comparison: None,
            sink,
        }
    }

    pub fn start(&mut self, source: &mut dyn SensorSource) -> Result<(), SessionError> {
        let next = self.state.measuring().ok_or(SessionError::InvalidTransition {
            action: "start",
            state: self.state.name(),
        })?;

        if !self.gravity.is_calibrated() {
            return Err(SessionError::NotCalibrated);
        }
        for channel in SensorChannel::ALL {
            if !source.is_available(channel) {
                return Err(SessionError::SensorUnavailable(channel));
            }
        }

        let params = self.resolve_params()?;
        self.params.set(params);
        self.aggregator.borrow_mut().reset();

        for channel in SensorChannel::ALL {
            source.set_update_interval(channel, self.options.update_interval);
        }
        self.subscriptions.push(source.subscribe(
            SensorChannel::Accelerometer,
            MotionAggregator::acceleration_callback(&self.aggregator),
        ));
        self.subscriptions.push(source.subscribe(
            SensorChannel::Gyroscope,
            MotionAggregator::rotation_callback(&self.aggregator),
        ));

        info!(
            "Measurement started ({} -> {}, m={} kg, L={} m)",
            self.state, next, params.mass, params.total_length
        );
        self.state = next;
        Ok(())
    }

    /// Stop the running measurement and snapshot its maxima. Outside a
    /// measuring state this does nothing and returns `None`.
    pub fn stop(&mut self, source: &mut dyn SensorSource, now_ms: i64) -> Option<MeasurementResult> {
        let Some(next) = self.state.result() else {
            debug!("Stop ignored in state {}", self.state);
            return None;
        };

        self.unsubscribe(source);
        let result = {
            let mut aggregator = self.aggregator.borrow_mut();
            if aggregator.is_recording() {
                aggregator.stop_recording();
            }
            aggregator.snapshot(now_ms)
        };

        match self.state.flail_type() {
            Some(flail_type) => {
                match flail_type {
                    FlailType::Infantry => self.infantry = Some(result),
                    FlailType::Cavalry => self.cavalry = Some(result),
                }
                if self.options.upload_policy == UploadPolicy::PerMeasurement {
                    let path = ResultPath::new(self.options.grade_level, flail_type);
                    if !self.sink.append(&path, &UploadRecord::from(&result)) {
                        error!("Failed to upload {} result", flail_type);
                    }
                }
            }
            None => self.last_result = Some(result),
        }

        info!(
            "Measurement stopped ({} -> {}): max energy {:.3} J, max ω {:.3} rad/s",
            self.state, next, result.max_energy, result.max_angular_velocity
        );
        self.state = next;
        Some(result)
    }

    /// Move from the infantry result to measuring cavalry. Calibration is kept.
    pub fn proceed(&mut self) -> Result<(), SessionError> {
        if self.state != MeasurementState::InfantryResult {
            return Err(SessionError::InvalidTransition {
                action: "proceed",
                state: self.state.name(),
            });
        }

        self.aggregator.borrow_mut().reset();
        info!("Proceeding to cavalry measurement");
        self.state = MeasurementState::CavalryReady;
        Ok(())
    }

    pub fn finalize(&mut self) -> Result<Comparison, SessionError> {
        if self.state != MeasurementState::CavalryResult {
            return Err(SessionError::InvalidTransition {
                action: "finalize",
                state: self.state.name(),
            });
        }
        let infantry = self.infantry.ok_or(SessionError::MissingResult(FlailType::Infantry))?;
        let cavalry = self.cavalry.ok_or(SessionError::MissingResult(FlailType::Cavalry))?;

        let comparison = Comparison::new(infantry, cavalry);
        if self.options.upload_policy == UploadPolicy::OnFinalize
            && !self.sink.append_final(self.options.grade_level, &infantry, &cavalry)
        {
            error!("Failed to upload final results");
        }

        info!(
            "Comparison: {} wins by {:.3} J",
            comparison.winner, comparison.difference
        );
        self.comparison = Some(comparison);
        self.state = MeasurementState::FinalResult;
        Ok(comparison)
    }

    /// Back to the initial state from anywhere. Discards results and maxima.
    pub fn reset(&mut self, source: &mut dyn SensorSource) {
        self.unsubscribe(source);
        {
            let mut aggregator = self.aggregator.borrow_mut();
            aggregator.reset();
            aggregator.clear_recording();
        }
        self.last_result = None;
        self.infantry = None;
        self.cavalry = None;
        self.comparison = None;

        let initial = MeasurementState::initial(self.options.parameter_source);
        info!("Session reset ({} -> {})", self.state, initial);
        self.state = initial;
    }

    /// Switch between fixed, form and preset parameters. Resets the session.
    pub fn set_parameter_source(&mut self, source: &mut dyn SensorSource, parameter_source: ParameterSource) {
        self.options.parameter_source = parameter_source;
        self.reset(source);
    }

    pub fn set_grade_level(&mut self, grade_level: GradeLevel) {
        self.options.grade_level = grade_level;
    }

    /// Toggle raw-sample recording during a single-flow measurement
    pub fn set_recording(&mut self, enabled: bool) -> Result<(), SessionError> {
        if self.state != MeasurementState::Measuring {
            return Err(SessionError::InvalidTransition {
                action: if enabled { "record" } else { "stop recording" },
                state: self.state.name(),
            });
        }

        let mut aggregator = self.aggregator.borrow_mut();
        if enabled && !aggregator.is_recording() {
            aggregator.start_recording();
            info!("Recording started");
        } else if !enabled && aggregator.is_recording() {
            let count = aggregator.stop_recording();
            info!("Recording stopped with {} samples", count);
        }
        Ok(())
    }

    pub fn is_recording(&self) -> bool {
        self.aggregator.borrow().is_recording()
    }

    pub fn recorded_samples(&self) -> Vec<TimestampedSample> {
        self.aggregator.borrow().recorded().to_vec()
    }

    pub fn clear_recording(&mut self) {
        self.aggregator.borrow_mut().clear_recording();
    }

    pub fn state(&self) -> MeasurementState {
        self.state
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    pub fn user_input_mut(&mut self) -> &mut UserInput {
        &mut self.user_input
    }

    pub fn aggregator(&self) -> &SharedAggregator {
        &self.aggregator
    }

    /// Params in effect for the current or next measurement
    pub fn active_params(&self) -> MotionParams {
        self.params.get()
    }

    pub fn last_result(&self) -> Option<MeasurementResult> {
        self.last_result
    }

    pub fn result_for(&self, flail_type: FlailType) -> Option<MeasurementResult> {
        match flail_type {
            FlailType::Infantry => self.infantry,
            FlailType::Cavalry => self.cavalry,
        }
    }

    pub fn comparison(&self) -> Option<Comparison> {
        self.comparison
    }

    fn resolve_params(&self) -> Result<MotionParams, SessionError> {
        match self.options.parameter_source {
            ParameterSource::Fixed => Ok(self.options.fixed_params),
            ParameterSource::UserInput => self.user_input.parse(),
            ParameterSource::Preset => {
                let flail_type = self.state.flail_type().ok_or(SessionError::InvalidTransition {
                    action: "start",
                    state: self.state.name(),
                })?;
                Ok(PresetCatalog::get(flail_type).params())
            }
        }
    }

    fn unsubscribe(&mut self, source: &mut dyn SensorSource) {
        for handle in self.subscriptions.drain(..) {
            source.unsubscribe(handle);
        }
    }
}
