//! # Sandbox Core
//!
//! Shared types for the dynamics sandbox: the system-descriptor contract,
//! trajectories, gating rate functions and run limits.
//!
//! ## Model Families
//!
//! | Family | Models | Integrator | Output |
//! |--------|--------|------------|--------|
//! | Neuron excitability | Hodgkin-Huxley, FitzHugh-Nagumo, Hindmarsh-Rose | RK4 / Euler | `time`, `voltage` |
//! | Chaotic attractors | Lorenz, Rossler | Euler | flat `(x, y, z)` triples |
//!
//! ## Design Philosophy
//!
//! 1. Every run is a pure, blocking computation with its own local state
//! 2. Parameter bounds are advisory metadata, never enforced by the integrators
//! 3. Numerical blow-up is not an error; callers filter non-finite samples

use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Common errors
#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("Unknown model type: {0}")]
    UnknownModel(String),

    #[error("Unknown test type: {0}")]
    UnknownTestType(String),

    #[error("Unknown system: {0}")]
    UnknownSystem(String),

    #[error("Dimension mismatch for {what}: expected {expected}, got {got}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("Run of {steps} steps exceeds the limit of {max}")]
    LimitExceeded { steps: usize, max: usize },

    #[error("Invalid step: {0}")]
    InvalidStep(String),

    #[error("Simulation error: {0}")]
    SimulationError(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SandboxError>;

/// Time point (ms for neuron models, arbitrary units for attractors)
pub type Time = f64;

/// Voltage (mV)
pub type Voltage = f64;

/// Current density (uA/cm^2)
pub type Current = f64;

/// Conductance (mS/cm^2)
pub type Conductance = f64;

/// Membrane capacitance (uF/cm^2)
pub type Capacitance = f64;

/// State vector for ODE systems
pub type StateVector = Array1<f64>;

/// Number of fixed steps that fit in `duration`: `floor(duration / dt)`.
///
/// Negative and NaN ratios give zero steps.
pub fn step_count(duration: Time, dt: Time) -> usize {
    (duration / dt).floor() as usize
}

/// [`step_count`] for untrusted input.
///
/// Rejects a non-finite or non-positive `dt`, a non-finite or negative
/// `duration`, and step counts that do not fit in `usize`.
pub fn checked_step_count(duration: Time, dt: Time) -> Result<usize> {
    if !dt.is_finite() || dt <= 0.0 {
        return Err(SandboxError::InvalidStep(format!(
            "dt must be positive and finite, got {}",
            dt
        )));
    }
    if !duration.is_finite() || duration < 0.0 {
        return Err(SandboxError::InvalidStep(format!(
            "duration must be non-negative and finite, got {}",
            duration
        )));
    }

    let steps = (duration / dt).floor();
    if steps >= usize::MAX as f64 {
        return Err(SandboxError::InvalidStep(format!(
            "{} / {} overflows the step counter",
            duration, dt
        )));
    }
    Ok(steps as usize)
}

// ============================================================================
// SYSTEM DESCRIPTORS
// ============================================================================

/// Display language for labels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Ru,
}

/// Localized display label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Label {
    pub en: &'static str,
    pub ru: &'static str,
}

impl Label {
    pub fn get(&self, locale: Locale) -> &'static str {
        match locale {
            Locale::En => self.en,
            Locale::Ru => self.ru,
        }
    }
}

/// One scalar knob of a system.
///
/// `min`/`max` feed slider ranges; nothing in the simulation clamps to them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Parameter {
    pub name: &'static str,
    pub min: f64,
    pub max: f64,
    pub default_value: f64,
}

impl Parameter {
    pub const fn new(name: &'static str, default_value: f64, min: f64, max: f64) -> Self {
        Self {
            name,
            min,
            max,
            default_value,
        }
    }

    /// Whether `value` lies inside the advisory range
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// One component of a state vector and its plausible display range
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StateVariable {
    pub name: &'static str,
    pub min: f64,
    pub max: f64,
    pub default_value: f64,
}

impl StateVariable {
    pub const fn new(name: &'static str, default_value: f64, min: f64, max: f64) -> Self {
        Self {
            name,
            min,
            max,
            default_value,
        }
    }
}

/// Serializable description of a pluggable system.
///
/// `params` and `state_variables` are positional: their order is the order
/// the system's transition function reads them in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SystemDescriptor {
    /// Unique registry key
    pub name: &'static str,
    pub label: Label,
    pub params: &'static [Parameter],
    pub state_variables: &'static [StateVariable],
    /// Rendering scale hint
    pub scale: f64,
}

impl SystemDescriptor {
    /// State-space dimension
    pub fn dimension(&self) -> usize {
        self.state_variables.len()
    }

    pub fn default_params(&self) -> Vec<f64> {
        self.params.iter().map(|p| p.default_value).collect()
    }

    pub fn default_state(&self) -> Vec<f64> {
        self.state_variables.iter().map(|s| s.default_value).collect()
    }

    /// Check positional vector lengths against the descriptor
    pub fn check_dimensions(&self, params: &[f64], state: &[f64]) -> Result<()> {
        if params.len() != self.params.len() {
            return Err(SandboxError::DimensionMismatch {
                what: "parameters",
                expected: self.params.len(),
                got: params.len(),
            });
        }
        if state.len() != self.state_variables.len() {
            return Err(SandboxError::DimensionMismatch {
                what: "state variables",
                expected: self.state_variables.len(),
                got: state.len(),
            });
        }
        Ok(())
    }
}

/// A system that can be plugged into the generic explicit driver.
///
/// `transition` must be pure: identical arguments give identical derivatives.
pub trait PhaseSystem {
    fn descriptor(&self) -> &'static SystemDescriptor;

    /// Derivatives of `state` under positional `params`
    fn transition(&self, params: &[f64], state: &[f64]) -> Vec<f64>;
}

/// ODE system trait (for the neuron drivers)
pub trait OdeSystem {
    /// System dimension
    fn dimension(&self) -> usize;

    /// Compute derivatives: dy/dt = f(t, y)
    fn derivatives(&self, t: Time, y: &StateVector) -> StateVector;
}

// ============================================================================
// TRAJECTORIES
// ============================================================================

/// Output of a neuron run: parallel `time` / `voltage` sequences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    /// Run name (model and test type)
    pub name: String,
    /// Time points, evenly spaced by `dt`
    pub time: Vec<Time>,
    /// Membrane voltage at each time point
    pub voltage: Vec<Voltage>,
}

impl Trajectory {
    pub fn with_capacity(name: &str, capacity: usize) -> Self {
        Self {
            name: name.to_string(),
            time: Vec::with_capacity(capacity),
            voltage: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, t: Time, v: Voltage) {
        self.time.push(t);
        self.voltage.push(v);
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Peak voltage, ignoring non-finite samples
    pub fn max_voltage(&self) -> Option<Voltage> {
        self.voltage
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .fold(None, |acc, v| Some(acc.map_or(v, |m: f64| m.max(v))))
    }

    /// Keep every k-th sample so that at most `max_points` remain.
    ///
    /// The first sample is always kept.
    pub fn downsample(&self, max_points: usize) -> Trajectory {
        if max_points == 0 {
            return Trajectory::with_capacity(&self.name, 0);
        }
        if self.len() <= max_points {
            return self.clone();
        }

        let stride = self.len().div_ceil(max_points);
        Trajectory {
            name: self.name.clone(),
            time: self.time.iter().step_by(stride).copied().collect(),
            voltage: self.voltage.iter().step_by(stride).copied().collect(),
        }
    }
}

/// Output of a pluggable-system run: consecutive state vectors, flattened
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseTrajectory {
    /// Components per point
    pub dimension: usize,
    /// `dimension` values per point, initial state first
    pub values: Vec<f64>,
}

impl PhaseTrajectory {
    pub fn new(dimension: usize, values: Vec<f64>) -> Self {
        Self { dimension, values }
    }

    /// Number of points
    pub fn len(&self) -> usize {
        if self.dimension == 0 {
            0
        } else {
            self.values.len() / self.dimension
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn points(&self) -> impl Iterator<Item = &[f64]> {
        self.values.chunks_exact(self.dimension.max(1))
    }

    /// Points whose every coordinate is finite
    pub fn finite_points(&self) -> Vec<&[f64]> {
        let finite: Vec<&[f64]> = self
            .points()
            .filter(|p| p.iter().all(|x| x.is_finite()))
            .collect();

        let dropped = self.len() - finite.len();
        if dropped > 0 {
            log::warn!("Dropped {} non-finite points of {}", dropped, self.len());
        }
        finite
    }
}

// ============================================================================
// GATING KINETICS
// ============================================================================

/// Voltage-dependent rate function for a gating variable
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum RateFunction {
    /// Standard HH form: A*(V+B)/(exp((V+B)/C)-1)
    HodgkinHuxley { a: f64, b: f64, c: f64 },
    /// Exponential: A*exp((V+B)/C)
    Exponential { a: f64, b: f64, c: f64 },
    /// Sigmoid: A/(1+exp((V+B)/C))
    Sigmoid { a: f64, b: f64, c: f64 },
}

impl RateFunction {
    /// Evaluate rate at given voltage
    pub fn eval(&self, v: Voltage) -> f64 {
        match *self {
            Self::HodgkinHuxley { a, b, c } => {
                let x = (v + b) / c;
                if x.abs() < 1e-6 {
                    // Removable singularity at V = -B: the limit is A*C
                    a * c
                } else {
                    a * (v + b) / (x.exp() - 1.0)
                }
            }
            Self::Exponential { a, b, c } => a * ((v + b) / c).exp(),
            Self::Sigmoid { a, b, c } => a / (1.0 + ((v + b) / c).exp()),
        }
    }
}

// ============================================================================
// RUN LIMITS
// ============================================================================

/// Caller-side ceiling on run size.
///
/// The integrators loop unconditionally for `floor(duration/dt)` steps, so
/// front ends check requests against these limits before calling them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationLimits {
    /// Largest accepted `floor(duration/dt)`
    pub max_steps: usize,
    /// Smallest accepted time step
    pub min_dt: f64,
}

impl Default for SimulationLimits {
    fn default() -> Self {
        Self {
            max_steps: 2_000_000,
            min_dt: 1e-6,
        }
    }
}

impl SimulationLimits {
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| SandboxError::Config(e.to_string()))
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Validate a run request and return its step count
    pub fn check(&self, duration: Time, dt: Time) -> Result<usize> {
        if !dt.is_finite() || dt <= 0.0 {
            return Err(SandboxError::InvalidStep(format!(
                "dt must be positive and finite, got {}",
                dt
            )));
        }
        if dt < self.min_dt {
            return Err(SandboxError::InvalidStep(format!(
                "dt {} is below the minimum {}",
                dt, self.min_dt
            )));
        }
        if !duration.is_finite() || duration <= 0.0 {
            return Err(SandboxError::InvalidStep(format!(
                "duration must be positive and finite, got {}",
                duration
            )));
        }

        let steps = checked_step_count(duration, dt)?;
        if steps > self.max_steps {
            return Err(SandboxError::LimitExceeded {
                steps,
                max: self.max_steps,
            });
        }
        Ok(steps)
    }
}
