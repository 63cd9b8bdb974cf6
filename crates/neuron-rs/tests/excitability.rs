//! Whole-run properties of the neuron models.

use sandbox_core::{step_count, SandboxError};
use sandbox_neuron::{
    count_spikes, find_rheobase, hodgkin_huxley::alpha_m, simulate, simulate_tagged,
    simulate_with, HhParameters, ModelType, Protocol, TestType, SPIKE_THRESHOLD,
};

fn hh_protocol(i_ext: f64) -> Protocol {
    Protocol {
        i_ext: Some(i_ext),
        ..Protocol::default()
    }
}

#[test]
fn test_lengths_and_time_axis() {
    let params = HhParameters::default();
    for model in ModelType::all() {
        let traj = simulate(*model, TestType::Excitability, &params);

        assert_eq!(traj.len(), step_count(100.0, 0.01));
        assert_eq!(traj.time.len(), traj.voltage.len());
        for (i, t) in traj.time.iter().enumerate() {
            assert!((t - i as f64 * 0.01).abs() < 1e-9, "{}: time[{}] = {}", model, i, t);
        }
        assert!(traj.time.windows(2).all(|w| w[1] > w[0]));
    }
}

#[test]
fn test_hh_fires_above_rheobase() {
    let params = HhParameters::default();
    let traj = simulate_with(
        ModelType::HodgkinHuxley,
        TestType::Excitability,
        &params,
        &hh_protocol(10.0),
    )
    .unwrap();

    assert!(traj.max_voltage().unwrap() > 0.0);
    assert!(count_spikes(&traj, SPIKE_THRESHOLD) >= 1);
}

#[test]
fn test_hh_default_current_fires() {
    let traj = simulate(ModelType::HodgkinHuxley, TestType::Excitability, &HhParameters::default());
    assert!(count_spikes(&traj, SPIKE_THRESHOLD) >= 1);
}

#[test]
fn test_hh_stays_at_rest_without_current() {
    let traj = simulate_with(
        ModelType::HodgkinHuxley,
        TestType::Excitability,
        &HhParameters::default(),
        &hh_protocol(0.0),
    )
    .unwrap();

    assert_eq!(traj.voltage[0], -65.0);
    for v in &traj.voltage {
        assert!((v + 65.0).abs() < 5.0, "resting voltage drifted to {}", v);
    }
    assert_eq!(count_spikes(&traj, SPIKE_THRESHOLD), 0);
}

#[test]
fn test_first_sample_is_initial_state() {
    let params = HhParameters::default();
    assert_eq!(simulate(ModelType::HodgkinHuxley, TestType::Excitability, &params).voltage[0], -65.0);
    assert_eq!(simulate(ModelType::FitzHughNagumo, TestType::Excitability, &params).voltage[0], -150.0);
    let hr = simulate(ModelType::HindmarshRose, TestType::Excitability, &params);
    assert!((hr.voltage[0] + 32.0).abs() < 1e-12);
}

#[test]
fn test_reduced_models_stay_finite() {
    let params = HhParameters::default();

    let fhn = simulate(ModelType::FitzHughNagumo, TestType::Excitability, &params);
    assert!(fhn.voltage.iter().all(|v| v.is_finite()));
    assert!(fhn.max_voltage().unwrap() > 100.0);

    let hr = simulate(ModelType::HindmarshRose, TestType::Excitability, &params);
    assert!(hr.voltage.iter().all(|v| v.is_finite() && v.abs() < 100.0));
}

#[test]
fn test_runs_are_deterministic() {
    let params = HhParameters::default();
    for model in ModelType::all() {
        let a = simulate(*model, TestType::Excitability, &params);
        let b = simulate(*model, TestType::Excitability, &params);
        assert_eq!(a, b);
    }
}

#[test]
fn test_unknown_model_fails() {
    let result = simulate_tagged("xyz", "excitability", &HhParameters::default());
    assert!(matches!(result, Err(SandboxError::UnknownModel(_))));
}

#[test]
fn test_tagged_dispatch() {
    let traj = simulate_tagged("fhn", "rheobase", &HhParameters::default()).unwrap();
    assert_eq!(traj.name, "fhn/rheobase");
    assert_eq!(traj.len(), step_count(100.0, 0.01));
}

#[test]
fn test_alpha_m_removable_singularity() {
    assert_eq!(alpha_m(-40.0), 1.0);
}

#[test]
fn test_rheobase_inside_bracket() {
    let params = HhParameters::default();
    let protocol = Protocol {
        duration: 50.0,
        ..Protocol::default()
    };

    let rheobase = find_rheobase(&params, &protocol, 0.0, 10.0, 0.05).unwrap();
    assert!(rheobase > 0.0 && rheobase <= 10.0);

    let at = simulate_with(
        ModelType::HodgkinHuxley,
        TestType::Rheobase,
        &params,
        &Protocol { i_ext: Some(rheobase), ..protocol },
    )
    .unwrap();
    assert!(at.max_voltage().unwrap() > SPIKE_THRESHOLD);
}
