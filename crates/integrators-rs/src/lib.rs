//! # Sandbox Integrators
//!
//! Fixed-step explicit integration for the dynamics sandbox.
//!
//! ## Methods
//!
//! | Method | Order | Evaluations / step | Used by |
//! |--------|-------|--------------------|---------|
//! | Forward Euler | 1 | 1 | attractors, FitzHugh-Nagumo, Hindmarsh-Rose |
//! | Runge-Kutta 4 | 4 | 4 | Hodgkin-Huxley |
//!
//! There is no error estimation and no step-size adaptation. Large `dt` on a
//! stiff system silently yields non-finite states; choosing a stable step is
//! the caller's job.

use ndarray::Array1;
use sandbox_core::{step_count, OdeSystem, PhaseSystem, StateVector, Time, Trajectory, Voltage};
use serde::{Deserialize, Serialize};

/// Integration methods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntegrationMethod {
    Euler,
    RungeKutta4,
}

impl IntegrationMethod {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Euler => "euler",
            Self::RungeKutta4 => "rk4",
        }
    }

    /// Advance `y` by one step of this method
    pub fn step<S: OdeSystem + ?Sized>(
        &self,
        system: &S,
        t: Time,
        y: &StateVector,
        dt: Time,
    ) -> StateVector {
        match self {
            Self::Euler => euler_step(system, t, y, dt),
            Self::RungeKutta4 => rk4_step(system, t, y, dt),
        }
    }
}

// ============================================================================
// SINGLE STEPS
// ============================================================================

/// Forward Euler: y + f(t, y) * dt
pub fn euler_step<S: OdeSystem + ?Sized>(
    system: &S,
    t: Time,
    y: &StateVector,
    dt: Time,
) -> StateVector {
    let dy = system.derivatives(t, y);
    y + &(dy * dt)
}

/// Classical 4th-order Runge-Kutta step.
///
/// Any forcing the system carries (e.g. an injected current) is read from
/// `system` and therefore stays fixed across the four stages.
pub fn rk4_step<S: OdeSystem + ?Sized>(
    system: &S,
    t: Time,
    y: &StateVector,
    dt: Time,
) -> StateVector {
    let half = dt / 2.0;

    let k1 = system.derivatives(t, y);
    let k2 = system.derivatives(t + half, &(y + &(&k1 * half)));
    let k3 = system.derivatives(t + half, &(y + &(&k2 * half)));
    let k4 = system.derivatives(t + dt, &(y + &(&k3 * dt)));

    let weighted: Array1<f64> = &k1 + &(&k2 * 2.0) + &(&k3 * 2.0) + &k4;
    y + &(weighted * dt / 6.0)
}

// ============================================================================
// DRIVERS
// ============================================================================

/// Run `system` for `floor(duration/dt)` steps and record one observable.
///
/// Sample `i` is taken at `t = i*dt` before the state is advanced, so the
/// first sample is `observe(initial)` and the final state is never recorded.
pub fn integrate<S, F>(
    system: &S,
    initial: StateVector,
    duration: Time,
    dt: Time,
    method: IntegrationMethod,
    name: &str,
    observe: F,
) -> Trajectory
where
    S: OdeSystem + ?Sized,
    F: Fn(&StateVector) -> Voltage,
{
    let steps = step_count(duration, dt);
    debug_assert_eq!(initial.len(), system.dimension(), "initial state width");
    log::debug!(
        "Integrating {} ({}-d) with {}: {} steps, dt={}",
        name,
        system.dimension(),
        method.name(),
        steps,
        dt
    );

    let mut trajectory = Trajectory::with_capacity(name, steps);
    let mut state = initial;

    for i in 0..steps {
        let t = i as f64 * dt;
        trajectory.push(t, observe(&state));
        state = method.step(system, t, &state, dt);
    }

    trajectory
}

/// Explicit forward-Euler run of a pluggable system.
///
/// Returns one flat sequence: the initial state followed by
/// `floor(time/dt)` successive states, each `state.len()` values wide.
///
/// Inputs are trusted: `dt` must be positive and finite, and `params` and
/// `initial_state` must match the descriptor. Validate untrusted requests
/// with [`sandbox_core::checked_step_count`] first.
pub fn integrate_system<P: PhaseSystem + ?Sized>(
    system: &P,
    params: &[f64],
    initial_state: &[f64],
    time: Time,
    dt: Time,
) -> Vec<f64> {
    let steps = step_count(time, dt);
    let dimension = initial_state.len();
    log::debug!(
        "Integrating {} with euler: {} steps, dt={}",
        system.descriptor().name,
        steps,
        dt
    );

    let capacity = steps
        .checked_add(1)
        .and_then(|n| n.checked_mul(dimension))
        .unwrap_or(0);
    let mut points = Vec::with_capacity(capacity);
    points.extend_from_slice(initial_state);

    let mut state = initial_state.to_vec();
    for _ in 0..steps {
        let derivatives = system.transition(params, &state);
        for (x, dx) in state.iter_mut().zip(&derivatives) {
            *x += dx * dt;
        }
        points.extend_from_slice(&state);
    }

    points
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;
    use sandbox_core::{Label, Parameter, StateVariable, SystemDescriptor};

    /// dy/dt = -k*y
    struct Decay {
        k: f64,
    }

    impl OdeSystem for Decay {
        fn dimension(&self) -> usize {
            1
        }

        fn derivatives(&self, _t: Time, y: &StateVector) -> StateVector {
            y * -self.k
        }
    }

    /// Harmonic oscillator, dx/dt = y, dy/dt = -w^2 x
    struct Oscillator;

    static OSC_PARAMS: [Parameter; 1] = [Parameter::new("w", 1.0, 0.0, 5.0)];
    static OSC_STATE: [StateVariable; 2] = [
        StateVariable::new("x", 1.0, -1.0, 1.0),
        StateVariable::new("y", 0.0, -1.0, 1.0),
    ];
    static OSC: SystemDescriptor = SystemDescriptor {
        name: "oscillator",
        label: Label { en: "Oscillator", ru: "Осциллятор" },
        params: &OSC_PARAMS,
        state_variables: &OSC_STATE,
        scale: 1.0,
    };

    impl PhaseSystem for Oscillator {
        fn descriptor(&self) -> &'static SystemDescriptor {
            &OSC
        }

        fn transition(&self, params: &[f64], state: &[f64]) -> Vec<f64> {
            let w = params[0];
            vec![state[1], -w * w * state[0]]
        }
    }

    #[test]
    fn test_euler_exponential_decay() {
        let system = Decay { k: 1.0 };
        let mut y = array![1.0];
        for i in 0..10_000 {
            y = euler_step(&system, i as f64 * 1e-4, &y, 1e-4);
        }
        assert!((y[0] - (-1.0_f64).exp()).abs() < 1e-3);
    }

    #[test]
    fn test_rk4_more_accurate_than_euler() {
        let system = Decay { k: 1.0 };
        let expected = (-1.0_f64).exp();
        let mut euler = array![1.0];
        let mut rk4 = array![1.0];
        for i in 0..100 {
            let t = i as f64 * 0.01;
            euler = euler_step(&system, t, &euler, 0.01);
            rk4 = rk4_step(&system, t, &rk4, 0.01);
        }

        let euler_err = (euler[0] - expected).abs();
        let rk4_err = (rk4[0] - expected).abs();
        assert!(rk4_err < euler_err);
        assert!(rk4_err < 1e-8, "RK4 error {}", rk4_err);
    }

    #[test]
    fn test_rk4_single_step_matches_taylor() {
        // For dy/dt = -y one RK4 step is the 4th-order Taylor polynomial
        let system = Decay { k: 1.0 };
        let h: f64 = 0.1;
        let y = rk4_step(&system, 0.0, &array![1.0], h);
        let taylor = 1.0 - h + h.powi(2) / 2.0 - h.powi(3) / 6.0 + h.powi(4) / 24.0;
        assert_relative_eq!(y[0], taylor, epsilon = 1e-14);
    }

    #[test]
    fn test_integrate_records_before_advancing() {
        let system = Decay { k: 0.5 };
        let traj = integrate(
            &system,
            array![2.0],
            1.0,
            0.1,
            IntegrationMethod::RungeKutta4,
            "decay",
            |y| y[0],
        );

        assert_eq!(traj.len(), step_count(1.0, 0.1));
        assert_eq!(traj.time.len(), traj.voltage.len());
        assert_eq!(traj.voltage[0], 2.0);
        assert_eq!(traj.name, "decay");
        for (i, t) in traj.time.iter().enumerate() {
            assert_relative_eq!(*t, i as f64 * 0.1);
        }
        assert!(traj.voltage.windows(2).all(|w| w[1] < w[0]));
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "initial state width")]
    fn test_integrate_checks_dimension() {
        let system = Decay { k: 1.0 };
        integrate(&system, array![1.0, 2.0], 1.0, 0.1, IntegrationMethod::Euler, "d", |y| y[0]);
    }

    #[test]
    fn test_integrate_empty_duration() {
        let system = Decay { k: 1.0 };
        let traj = integrate(&system, array![1.0], 0.0, 0.1, IntegrationMethod::Euler, "d", |y| y[0]);
        assert!(traj.is_empty());
    }

    #[test]
    fn test_integrate_system_layout() {
        let out = integrate_system(&Oscillator, &[1.0], &[1.0, 0.0], 1.0, 0.01);
        let steps = step_count(1.0, 0.01);

        assert_eq!(out.len(), 2 * (steps + 1));
        assert_eq!(&out[..2], &[1.0, 0.0]);
        // x1 = x0 + y0*dt, y1 = y0 - x0*dt
        assert_relative_eq!(out[2], 1.0);
        assert_relative_eq!(out[3], -0.01);
    }

    #[test]
    fn test_integrate_system_deterministic() {
        let a = integrate_system(&Oscillator, &[2.0], &[0.3, 0.1], 5.0, 0.001);
        let b = integrate_system(&Oscillator, &[2.0], &[0.3, 0.1], 5.0, 0.001);
        assert_eq!(a, b);
    }

    #[test]
    fn test_method_names() {
        assert_eq!(IntegrationMethod::Euler.name(), "euler");
        assert_eq!(IntegrationMethod::RungeKutta4.name(), "rk4");
    }
}
