//! Hodgkin-Huxley squid-axon model.
//!
//! Conductance-based membrane with sodium (`m`, `h`) and potassium (`n`)
//! gating, in the modern convention with rest near -65 mV:
//!
//!   C dV/dt = -gNa m³h (V - ENa) - gK n⁴ (V - EK) - gL (V - EL) + I_ext
//!   dx/dt   = αx(V)(1 - x) - βx(V) x          for x in {m, h, n}
//!
//! Units: mV, ms, mS/cm², uA/cm², uF/cm².

use ndarray::array;
use sandbox_core::{
    Capacitance, Conductance, Current, OdeSystem, RateFunction, StateVector, Time, Voltage,
};
use sandbox_integrators::IntegrationMethod;
use serde::{Deserialize, Serialize};

use crate::NeuronModel;

const ALPHA_M: RateFunction = RateFunction::HodgkinHuxley { a: -0.1, b: 40.0, c: -10.0 };
const BETA_M: RateFunction = RateFunction::Exponential { a: 4.0, b: 65.0, c: -18.0 };
const ALPHA_H: RateFunction = RateFunction::Exponential { a: 0.07, b: 65.0, c: -20.0 };
const BETA_H: RateFunction = RateFunction::Sigmoid { a: 1.0, b: 35.0, c: -10.0 };
const ALPHA_N: RateFunction = RateFunction::HodgkinHuxley { a: -0.01, b: 55.0, c: -10.0 };
const BETA_N: RateFunction = RateFunction::Exponential { a: 0.125, b: 65.0, c: -80.0 };

/// Sodium activation opening rate, `0.1(V+40)/(1-exp(-(V+40)/10))`; 1 at V = -40
pub fn alpha_m(v: Voltage) -> f64 {
    ALPHA_M.eval(v)
}

pub fn beta_m(v: Voltage) -> f64 {
    BETA_M.eval(v)
}

pub fn alpha_h(v: Voltage) -> f64 {
    ALPHA_H.eval(v)
}

pub fn beta_h(v: Voltage) -> f64 {
    BETA_H.eval(v)
}

/// Potassium activation opening rate; 0.1 at V = -55
pub fn alpha_n(v: Voltage) -> f64 {
    ALPHA_N.eval(v)
}

pub fn beta_n(v: Voltage) -> f64 {
    BETA_N.eval(v)
}

/// Membrane constants
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HhParameters {
    /// Sodium conductance (mS/cm^2)
    pub g_na: Conductance,
    /// Potassium conductance (mS/cm^2)
    pub g_k: Conductance,
    /// Leak conductance (mS/cm^2)
    pub g_l: Conductance,
    /// Sodium reversal (mV)
    pub e_na: Voltage,
    /// Potassium reversal (mV)
    pub e_k: Voltage,
    /// Leak reversal (mV)
    pub e_l: Voltage,
    /// Membrane capacitance (uF/cm^2)
    pub cm: Capacitance,
}

impl Default for HhParameters {
    fn default() -> Self {
        Self {
            g_na: 120.0,
            g_k: 36.0,
            g_l: 0.3,
            e_na: 50.0,
            e_k: -77.0,
            e_l: -54.4,
            cm: 1.0,
        }
    }
}

/// Membrane voltage plus the three gating variables
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HhState {
    pub v: Voltage,
    pub m: f64,
    pub h: f64,
    pub n: f64,
}

impl HhState {
    /// Initial state of every run
    pub const RESTING: Self = Self {
        v: -65.0,
        m: 0.05,
        h: 0.6,
        n: 0.32,
    };

    pub fn to_vector(&self) -> StateVector {
        array![self.v, self.m, self.h, self.n]
    }

    pub fn from_vector(y: &StateVector) -> Self {
        Self {
            v: y[0],
            m: y[1],
            h: y[2],
            n: y[3],
        }
    }
}

/// Ionic current densities (uA/cm^2)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IonicCurrents {
    pub i_na: Current,
    pub i_k: Current,
    pub i_l: Current,
}

/// Hodgkin-Huxley neuron under a constant injected current
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HodgkinHuxley {
    pub params: HhParameters,
    pub i_ext: Current,
}

impl HodgkinHuxley {
    pub const DEFAULT_CURRENT: Current = 10.0;

    pub fn new(params: HhParameters, i_ext: Current) -> Self {
        Self { params, i_ext }
    }

    pub fn ionic_currents(&self, s: &HhState) -> IonicCurrents {
        let p = &self.params;
        IonicCurrents {
            i_na: p.g_na * s.m.powi(3) * s.h * (s.v - p.e_na),
            i_k: p.g_k * s.n.powi(4) * (s.v - p.e_k),
            i_l: p.g_l * (s.v - p.e_l),
        }
    }
}

impl Default for HodgkinHuxley {
    fn default() -> Self {
        Self::new(HhParameters::default(), Self::DEFAULT_CURRENT)
    }
}

impl OdeSystem for HodgkinHuxley {
    fn dimension(&self) -> usize {
        4
    }

    fn derivatives(&self, _t: Time, y: &StateVector) -> StateVector {
        let s = HhState::from_vector(y);
        let IonicCurrents { i_na, i_k, i_l } = self.ionic_currents(&s);

        array![
            (-i_na - i_k - i_l + self.i_ext) / self.params.cm,
            alpha_m(s.v) * (1.0 - s.m) - beta_m(s.v) * s.m,
            alpha_h(s.v) * (1.0 - s.h) - beta_h(s.v) * s.h,
            alpha_n(s.v) * (1.0 - s.n) - beta_n(s.v) * s.n,
        ]
    }
}

impl NeuronModel for HodgkinHuxley {
    fn name(&self) -> &'static str {
        "hh"
    }

    fn initial_state(&self) -> StateVector {
        HhState::RESTING.to_vector()
    }

    fn membrane_voltage(&self, y: &StateVector) -> Voltage {
        y[0]
    }

    fn method(&self) -> IntegrationMethod {
        IntegrationMethod::RungeKutta4
    }
}
