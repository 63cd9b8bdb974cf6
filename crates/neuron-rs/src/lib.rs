//! # Sandbox Neuron
//!
//! Neuron excitability models and the simulation dispatcher.
//!
//! ## Models
//!
//! | Tag | Model | State | Integrator | Default I |
//! |-----|-------|-------|------------|-----------|
//! | `hh` | Hodgkin-Huxley | V, m, h, n | RK4 | 10 |
//! | `fhn` | FitzHugh-Nagumo | v, w | Euler | 0.5 |
//! | `hr` | Hindmarsh-Rose | x, y, z | Euler | 3 |
//!
//! Every run starts from the model's fixed initial state, holds the injected
//! current constant, and returns `time`/`voltage` sampled before each step.
//! Only the Hodgkin-Huxley model reads [`HhParameters`]; the reduced models
//! use their own fixed constants.

pub mod hodgkin_huxley;
pub mod reduced;

pub use hodgkin_huxley::{HhParameters, HhState, HodgkinHuxley, IonicCurrents};
pub use reduced::{FitzHughNagumo, HindmarshRose};

use sandbox_core::{
    checked_step_count, Current, OdeSystem, Result, SandboxError, StateVector, Time, Trajectory,
    Voltage,
};
use sandbox_integrators::{integrate, IntegrationMethod};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A neuron model runnable by the dispatcher
pub trait NeuronModel: OdeSystem {
    /// Short tag (`hh`, `fhn`, `hr`)
    fn name(&self) -> &'static str;

    /// Fixed state every run starts from
    fn initial_state(&self) -> StateVector;

    /// Displayed voltage for a state
    fn membrane_voltage(&self, y: &StateVector) -> Voltage;

    fn method(&self) -> IntegrationMethod;

    /// Integrate from the initial state for `floor(duration/dt)` steps.
    ///
    /// The trajectory is named `"{name}/{test}"`.
    fn run(&self, test: TestType, duration: Time, dt: Time) -> Trajectory {
        integrate(
            self,
            self.initial_state(),
            duration,
            dt,
            self.method(),
            &format!("{}/{}", self.name(), test.tag()),
            |y| self.membrane_voltage(y),
        )
    }
}

// ============================================================================
// SELECTORS
// ============================================================================

/// Model selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelType {
    #[serde(rename = "hh")]
    HodgkinHuxley,
    #[serde(rename = "fhn")]
    FitzHughNagumo,
    #[serde(rename = "hr")]
    HindmarshRose,
}

impl ModelType {
    pub fn all() -> &'static [Self] {
        &[Self::HodgkinHuxley, Self::FitzHughNagumo, Self::HindmarshRose]
    }

    pub fn tag(&self) -> &'static str {
        match self {
            Self::HodgkinHuxley => "hh",
            Self::FitzHughNagumo => "fhn",
            Self::HindmarshRose => "hr",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::HodgkinHuxley => "Hodgkin-Huxley",
            Self::FitzHughNagumo => "FitzHugh-Nagumo",
            Self::HindmarshRose => "Hindmarsh-Rose",
        }
    }

    /// Current used when the protocol does not set one
    pub fn default_current(&self) -> Current {
        match self {
            Self::HodgkinHuxley => HodgkinHuxley::DEFAULT_CURRENT,
            Self::FitzHughNagumo => FitzHughNagumo::DEFAULT_CURRENT,
            Self::HindmarshRose => HindmarshRose::DEFAULT_CURRENT,
        }
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for ModelType {
    type Err = SandboxError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "hh" => Ok(Self::HodgkinHuxley),
            "fhn" => Ok(Self::FitzHughNagumo),
            "hr" => Ok(Self::HindmarshRose),
            other => Err(SandboxError::UnknownModel(other.to_string())),
        }
    }
}

/// Test-type selector.
///
/// Carried into the run name; it does not change the stimulus protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestType {
    #[default]
    Excitability,
    Rheobase,
    Threshold,
}

impl TestType {
    pub fn all() -> &'static [Self] {
        &[Self::Excitability, Self::Rheobase, Self::Threshold]
    }

    pub fn tag(&self) -> &'static str {
        match self {
            Self::Excitability => "excitability",
            Self::Rheobase => "rheobase",
            Self::Threshold => "threshold",
        }
    }
}

impl fmt::Display for TestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for TestType {
    type Err = SandboxError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "excitability" => Ok(Self::Excitability),
            "rheobase" => Ok(Self::Rheobase),
            "threshold" => Ok(Self::Threshold),
            other => Err(SandboxError::UnknownTestType(other.to_string())),
        }
    }
}

// ============================================================================
// DISPATCHER
// ============================================================================

/// Stimulus protocol of one run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Protocol {
    /// Run length (ms)
    pub duration: Time,
    /// Fixed step (ms)
    pub dt: Time,
    /// Injected current; `None` uses the model default
    pub i_ext: Option<Current>,
}

impl Default for Protocol {
    fn default() -> Self {
        Self {
            duration: 100.0,
            dt: 0.01,
            i_ext: None,
        }
    }
}

impl Protocol {
    /// Step count of this protocol, rejecting an unusable `dt` or `duration`
    pub fn step_count(&self) -> Result<usize> {
        checked_step_count(self.duration, self.dt)
    }
}

/// Run a model with the default protocol
pub fn simulate(model: ModelType, test: TestType, params: &HhParameters) -> Trajectory {
    run_model(model, test, params, &Protocol::default())
}

/// Run a model with an explicit protocol.
///
/// Fails before integrating if the protocol's `dt` or `duration` is unusable.
pub fn simulate_with(
    model: ModelType,
    test: TestType,
    params: &HhParameters,
    protocol: &Protocol,
) -> Result<Trajectory> {
    protocol.step_count()?;
    Ok(run_model(model, test, params, protocol))
}

fn run_model(
    model: ModelType,
    test: TestType,
    params: &HhParameters,
    protocol: &Protocol,
) -> Trajectory {
    let i_ext = protocol.i_ext.unwrap_or_else(|| model.default_current());
    log::debug!("Simulating {}/{} with I_ext={}", model.tag(), test.tag(), i_ext);

    let Protocol { duration, dt, .. } = *protocol;
    match model {
        ModelType::HodgkinHuxley => HodgkinHuxley::new(*params, i_ext).run(test, duration, dt),
        ModelType::FitzHughNagumo => FitzHughNagumo::with_current(i_ext).run(test, duration, dt),
        ModelType::HindmarshRose => HindmarshRose::with_current(i_ext).run(test, duration, dt),
    }
}

/// Dispatch by string tags, failing on an unrecognized model or test type
pub fn simulate_tagged(model: &str, test: &str, params: &HhParameters) -> Result<Trajectory> {
    let model: ModelType = model.parse()?;
    let test: TestType = test.parse()?;
    Ok(simulate(model, test, params))
}

// ============================================================================
// SPIKE ANALYSIS
// ============================================================================

/// Voltage above which a Hodgkin-Huxley excursion counts as a spike (mV)
pub const SPIKE_THRESHOLD: Voltage = 0.0;

/// Number of upward crossings of `threshold`
pub fn count_spikes(trajectory: &Trajectory, threshold: Voltage) -> usize {
    trajectory
        .voltage
        .windows(2)
        .filter(|w| w[0] <= threshold && w[1] > threshold)
        .count()
}

fn fires(params: &HhParameters, protocol: &Protocol, i_ext: Current) -> bool {
    let trajectory =
        HodgkinHuxley::new(*params, i_ext).run(TestType::Rheobase, protocol.duration, protocol.dt);
    trajectory
        .max_voltage()
        .is_some_and(|v| v > SPIKE_THRESHOLD)
}

/// Smallest constant current in `[low, high]` that fires a Hodgkin-Huxley
/// spike within the protocol duration, found by bisection to `tolerance`.
///
/// The protocol's own `i_ext` is ignored. `low` must not fire and `high` must.
/// Bisection also stops once the bracket cannot be split any further in
/// `f64`, so a `tolerance` below the bracket's resolution still terminates.
pub fn find_rheobase(
    params: &HhParameters,
    protocol: &Protocol,
    low: Current,
    high: Current,
    tolerance: Current,
) -> Result<Current> {
    if !(tolerance > 0.0) || !(low < high) || !low.is_finite() || !high.is_finite() {
        return Err(SandboxError::SimulationError(format!(
            "Invalid rheobase bracket [{}, {}] with tolerance {}",
            low, high, tolerance
        )));
    }
    protocol.step_count()?;
    if fires(params, protocol, low) {
        return Err(SandboxError::SimulationError(format!(
            "Lower bracket {} already fires",
            low
        )));
    }
    if !fires(params, protocol, high) {
        return Err(SandboxError::SimulationError(format!(
            "Upper bracket {} does not fire",
            high
        )));
    }

    let (mut lo, mut hi) = (low, high);
    while hi - lo > tolerance {
        let mid = lo + 0.5 * (hi - lo);
        if mid <= lo || mid >= hi {
            break;
        }
        if fires(params, protocol, mid) {
            hi = mid;
        } else {
            lo = mid;
        }
    }

    log::debug!("Rheobase bracketed in [{}, {}]", lo, hi);
    Ok(hi)
}
