//! Whole-run properties of the attractor systems.

use sandbox_attractors::{integrate_system, simulate_attractor, Attractor};
use sandbox_core::{step_count, PhaseSystem, SandboxError};

#[test]
fn test_flat_layout() {
    for system in Attractor::all() {
        let init = system.default_state();
        let out = integrate_system(system, &system.default_params(), &init, 10.0, 0.01);

        assert_eq!(out.len(), 3 * (step_count(10.0, 0.01) + 1));
        assert_eq!(&out[..3], init.as_slice());
    }
}

#[test]
fn test_lorenz_bounded_and_chaotic() {
    let traj = simulate_attractor(
        "lorenz",
        &Attractor::Lorenz.default_params(),
        &Attractor::Lorenz.default_state(),
        10.0,
        0.01,
    )
    .unwrap();

    assert_eq!(traj.len(), step_count(10.0, 0.01) + 1);
    for p in traj.points() {
        assert!(p.iter().all(|v| v.is_finite()));
        assert!(p[0].abs() < 50.0 && p[1].abs() < 50.0, "escaped: {:?}", p);
        assert!(p[2] > -1.0 && p[2] < 60.0, "escaped: {:?}", p);
    }

    // Not collapsed to a point: x sweeps both lobes
    let xs: Vec<f64> = traj.points().map(|p| p[0]).collect();
    let min = xs.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = xs.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    assert!(max - min > 10.0);
    assert!(min < 0.0 && max > 0.0);
}

#[test]
fn test_rossler_bounded() {
    let traj = simulate_attractor(
        "rossler",
        &Attractor::Rossler.default_params(),
        &Attractor::Rossler.default_state(),
        100.0,
        0.01,
    )
    .unwrap();

    assert_eq!(traj.finite_points().len(), traj.len());
    for p in traj.points() {
        assert!(p[0].abs() < 30.0 && p[1].abs() < 30.0 && p[2].abs() < 60.0);
    }
}

#[test]
fn test_deterministic() {
    let params = Attractor::Lorenz.default_params();
    let init = Attractor::Lorenz.default_state();
    let a = integrate_system(&Attractor::Lorenz, &params, &init, 20.0, 0.005);
    let b = integrate_system(&Attractor::Lorenz, &params, &init, 20.0, 0.005);
    assert_eq!(a, b);
}

#[test]
fn test_large_step_blows_up_without_error() {
    // Instability is reported as non-finite samples, never as an error
    let traj = simulate_attractor("lorenz", &[40.0, 50.0, 5.0], &[1.0, 1.0, 1.0], 1000.0, 0.5).unwrap();
    assert!(traj.finite_points().len() < traj.len());
}

#[test]
fn test_unknown_system() {
    assert!(matches!(
        simulate_attractor("chua", &[], &[], 1.0, 0.01),
        Err(SandboxError::UnknownSystem(_))
    ));
}

#[test]
fn test_descriptor_matches_transition_arity() {
    for system in Attractor::all() {
        let d = system.descriptor();
        let derivatives = system.transition(&d.default_params(), &d.default_state());
        assert_eq!(derivatives.len(), d.dimension());
    }
}
