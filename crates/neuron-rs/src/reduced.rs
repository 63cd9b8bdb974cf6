//! Reduced excitability models integrated with forward Euler.
//!
//! Both are qualitative demonstrations: their dimensionless voltage is
//! rescaled to mV-like display units so traces share an axis with
//! Hodgkin-Huxley.

use ndarray::array;
use sandbox_core::{Current, OdeSystem, StateVector, Time, Voltage};
use sandbox_integrators::IntegrationMethod;
use serde::{Deserialize, Serialize};

use crate::NeuronModel;

/// FitzHugh-Nagumo two-variable reduction
///
///   dv/dt = v - v³/3 - w + I
///   dw/dt = (v + a - b·w) / τ
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitzHughNagumo {
    pub a: f64,
    pub b: f64,
    pub tau: f64,
    pub i_ext: Current,
}

impl FitzHughNagumo {
    pub const DEFAULT_CURRENT: Current = 0.5;
    /// Display factor applied to `v`
    pub const VOLTAGE_SCALE: f64 = 100.0;
    /// Initial `(v, w)`
    pub const INITIAL: [f64; 2] = [-1.5, 0.0];

    pub fn with_current(i_ext: Current) -> Self {
        Self {
            i_ext,
            ..Self::default()
        }
    }
}

impl Default for FitzHughNagumo {
    fn default() -> Self {
        Self {
            a: 0.7,
            b: 0.8,
            tau: 12.5,
            i_ext: Self::DEFAULT_CURRENT,
        }
    }
}

impl OdeSystem for FitzHughNagumo {
    fn dimension(&self) -> usize {
        2
    }

    fn derivatives(&self, _t: Time, y: &StateVector) -> StateVector {
        let (v, w) = (y[0], y[1]);
        array![
            v - v * v * v / 3.0 - w + self.i_ext,
            (v + self.a - self.b * w) / self.tau,
        ]
    }
}

impl NeuronModel for FitzHughNagumo {
    fn name(&self) -> &'static str {
        "fhn"
    }

    fn initial_state(&self) -> StateVector {
        StateVector::from(Self::INITIAL.to_vec())
    }

    fn membrane_voltage(&self, y: &StateVector) -> Voltage {
        y[0] * Self::VOLTAGE_SCALE
    }

    fn method(&self) -> IntegrationMethod {
        IntegrationMethod::Euler
    }
}

/// Hindmarsh-Rose three-variable bursting model
///
///   dx/dt = y - a·x³ + b·x² - z + I
///   dy/dt = c - d·x² - y
///   dz/dt = r·(s·(x - xR) - z)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HindmarshRose {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub r: f64,
    pub s: f64,
    pub x_r: f64,
    pub i_ext: Current,
}

impl HindmarshRose {
    pub const DEFAULT_CURRENT: Current = 3.0;
    /// Display factor applied to `x`
    pub const VOLTAGE_SCALE: f64 = 20.0;
    /// Initial `(x, y, z)`
    pub const INITIAL: [f64; 3] = [-1.6, -10.0, 2.0];

    pub fn with_current(i_ext: Current) -> Self {
        Self {
            i_ext,
            ..Self::default()
        }
    }
}

impl Default for HindmarshRose {
    fn default() -> Self {
        Self {
            a: 1.0,
            b: 3.0,
            c: 1.0,
            d: 5.0,
            r: 0.001,
            s: 4.0,
            x_r: -1.6,
            i_ext: Self::DEFAULT_CURRENT,
        }
    }
}

impl OdeSystem for HindmarshRose {
    fn dimension(&self) -> usize {
        3
    }

    fn derivatives(&self, _t: Time, state: &StateVector) -> StateVector {
        let (x, y, z) = (state[0], state[1], state[2]);
        array![
            y - self.a * x * x * x + self.b * x * x - z + self.i_ext,
            self.c - self.d * x * x - y,
            self.r * (self.s * (x - self.x_r) - z),
        ]
    }
}

impl NeuronModel for HindmarshRose {
    fn name(&self) -> &'static str {
        "hr"
    }

    fn initial_state(&self) -> StateVector {
        StateVector::from(Self::INITIAL.to_vec())
    }

    fn membrane_voltage(&self, y: &StateVector) -> Voltage {
        y[0] * Self::VOLTAGE_SCALE
    }

    fn method(&self) -> IntegrationMethod {
        IntegrationMethod::Euler
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_fhn_derivatives_at_start() {
        let fhn = FitzHughNagumo::default();
        let d = fhn.derivatives(0.0, &fhn.initial_state());
        // -1.5 + 1.125 - 0 + 0.5
        assert_relative_eq!(d[0], 0.125, epsilon = 1e-12);
        assert_relative_eq!(d[1], (-1.5 + 0.7) / 12.5, epsilon = 1e-12);
    }

    #[test]
    fn test_fhn_voltage_scale() {
        let fhn = FitzHughNagumo::default();
        assert_eq!(fhn.membrane_voltage(&fhn.initial_state()), -150.0);
        assert_eq!(fhn.method(), IntegrationMethod::Euler);
    }

    #[test]
    fn test_hr_derivatives_at_start() {
        let hr = HindmarshRose::default();
        let d = hr.derivatives(0.0, &hr.initial_state());
        // -10 + 4.096 + 7.68 - 2 + 3
        assert_relative_eq!(d[0], 2.776, epsilon = 1e-12);
        // 1 - 5*2.56 + 10
        assert_relative_eq!(d[1], -1.8, epsilon = 1e-12);
        // 0.001 * (4*0 - 2)
        assert_relative_eq!(d[2], -0.002, epsilon = 1e-12);
    }

    #[test]
    fn test_hr_voltage_scale() {
        let hr = HindmarshRose::default();
        assert_relative_eq!(hr.membrane_voltage(&hr.initial_state()), -32.0);
    }

    #[test]
    fn test_with_current() {
        assert_eq!(FitzHughNagumo::with_current(1.0).i_ext, 1.0);
        assert_eq!(FitzHughNagumo::with_current(1.0).tau, 12.5);
        assert_eq!(HindmarshRose::with_current(2.0).i_ext, 2.0);
        assert_eq!(HindmarshRose::with_current(2.0).x_r, -1.6);
    }
}
