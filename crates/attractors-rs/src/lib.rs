//! # Sandbox Attractors
//!
//! Chaotic attractor systems for the phase-space view.
//!
//! | Name | Params (default) | State (default) | Scale |
//! |------|------------------|-----------------|-------|
//! | `lorenz` | σ=10, ρ=28, β=2.67 | x=0.1, y=0, z=0 | 0.5 |
//! | `rossler` | a=0.2, b=0.2, c=5.7 | x=0.1, y=0, z=0 | 2 |
//!
//! Each system is advanced by forward Euler and produces one flat sequence
//! of consecutive `(x, y, z)` triples, initial state first, which a 3-D
//! renderer can consume directly as line geometry.

use sandbox_core::{
    checked_step_count, Label, Parameter, PhaseSystem, PhaseTrajectory, Result, SandboxError,
    StateVariable, SystemDescriptor, Time,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Unchecked driver. Prefer [`simulate_attractor`], which validates vector
/// lengths and the step before integrating.
pub use sandbox_integrators::integrate_system;

// ============================================================================
// DESCRIPTORS
// ============================================================================

/// Initial-condition sliders shared by both systems
static XYZ: [StateVariable; 3] = [
    StateVariable::new("x", 0.1, 0.0, 1.0),
    StateVariable::new("y", 0.0, 0.0, 1.0),
    StateVariable::new("z", 0.0, 0.0, 1.0),
];

static LORENZ_PARAMS: [Parameter; 3] = [
    Parameter::new("σ", 10.0, 0.0, 40.0),
    Parameter::new("ρ", 28.0, 0.0, 50.0),
    Parameter::new("β", 2.67, 0.0, 5.0),
];

static ROSSLER_PARAMS: [Parameter; 3] = [
    Parameter::new("a", 0.2, 0.0, 0.3),
    Parameter::new("b", 0.2, 0.0, 1.0),
    Parameter::new("c", 5.7, 4.0, 8.0),
];

pub static LORENZ: SystemDescriptor = SystemDescriptor {
    name: "lorenz",
    label: Label {
        en: "Lorenz",
        ru: "Лоренц",
    },
    params: &LORENZ_PARAMS,
    state_variables: &XYZ,
    scale: 0.5,
};

pub static ROSSLER: SystemDescriptor = SystemDescriptor {
    name: "rossler",
    label: Label {
        en: "Rossler",
        ru: "Рёсслер",
    },
    params: &ROSSLER_PARAMS,
    state_variables: &XYZ,
    scale: 2.0,
};

// ============================================================================
// SYSTEMS
// ============================================================================

/// Registered attractor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Attractor {
    Lorenz,
    Rossler,
}

impl Attractor {
    /// Registry order, as shown in the system selector
    pub fn all() -> &'static [Self] {
        &[Self::Lorenz, Self::Rossler]
    }

    pub fn name(&self) -> &'static str {
        self.descriptor().name
    }

    pub fn default_params(&self) -> Vec<f64> {
        self.descriptor().default_params()
    }

    pub fn default_state(&self) -> Vec<f64> {
        self.descriptor().default_state()
    }
}

impl PhaseSystem for Attractor {
    fn descriptor(&self) -> &'static SystemDescriptor {
        match self {
            Self::Lorenz => &LORENZ,
            Self::Rossler => &ROSSLER,
        }
    }

    /// # Panics
    ///
    /// If `params` or `state` is shorter than three values.
    fn transition(&self, params: &[f64], state: &[f64]) -> Vec<f64> {
        debug_assert!(
            params.len() >= 3 && state.len() >= 3,
            "{} needs 3 params and 3 state values, got {} and {}",
            self.name(),
            params.len(),
            state.len()
        );
        let (x, y, z) = (state[0], state[1], state[2]);
        match self {
            Self::Lorenz => {
                let (sigma, rho, beta) = (params[0], params[1], params[2]);
                vec![sigma * (y - x), x * (rho - z) - y, x * y - beta * z]
            }
            Self::Rossler => {
                let (a, b, c) = (params[0], params[1], params[2]);
                vec![-y - z, x + a * y, b + z * (x - c)]
            }
        }
    }
}

impl fmt::Display for Attractor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Attractor {
    type Err = SandboxError;

    fn from_str(s: &str) -> Result<Self> {
        Self::all()
            .iter()
            .copied()
            .find(|system| system.name() == s)
            .ok_or_else(|| SandboxError::UnknownSystem(s.to_string()))
    }
}

/// Descriptors of every registered system, in registry order
pub fn registry() -> impl Iterator<Item = &'static SystemDescriptor> {
    Attractor::all().iter().map(|system| system.descriptor())
}

/// Look up a system by name and run it with forward Euler.
///
/// Vector lengths are checked against the descriptor and `dt` must be
/// positive and finite; values are not checked against the advisory bounds.
pub fn simulate_attractor(
    name: &str,
    params: &[f64],
    initial_state: &[f64],
    time: Time,
    dt: Time,
) -> Result<PhaseTrajectory> {
    let system: Attractor = name.parse()?;
    let descriptor = system.descriptor();
    descriptor.check_dimensions(params, initial_state)?;

    let dimension = descriptor.dimension();
    let steps = checked_step_count(time, dt)?;
    steps
        .checked_add(1)
        .and_then(|n| n.checked_mul(dimension))
        .ok_or_else(|| {
            SandboxError::InvalidStep(format!("{} steps of {} values overflow", steps, dimension))
        })?;
    log::debug!(
        "Running {} ({}-d) for {} steps, dt={}, params={:?}",
        system,
        dimension,
        steps,
        dt,
        params
    );

    let values = integrate_system(&system, params, initial_state, time, dt);
    Ok(PhaseTrajectory::new(dimension, values))
}
