//! End-to-end tests of the landmark particle filter
//!
//! These tests drive [`ParticleFilter`] through complete predict / update / resample cycles on
//! synthetic scenarios where the true pose is known exactly:
//!
//! 1. A single-particle, single-landmark cycle whose weight has a closed form.
//! 2. A vehicle driving a constant-curvature arc through a grid of landmarks, observed without
//!    measurement noise. The filter must track the true pose with every resampling strategy.
//! 3. Reproducibility: two filters with the same seed produce identical populations.
//!
//! The tracking tolerances are empirical bounds with a wide margin, not design goals.
use std::f64::consts::PI;

use assert_approx_eq::assert_approx_eq;
use landmark_pf::config::FilterConfig;
use landmark_pf::filter::ParticleFilter;
use landmark_pf::geometry::{distance, wrap_to_pi};
use landmark_pf::map::{Landmark, LandmarkMap};
use landmark_pf::measurements::{LandmarkNoise, LandmarkObservation, ProcessNoise};
use landmark_pf::motion::{DEFAULT_YAW_RATE_THRESHOLD, deterministic_motion};
use landmark_pf::particle::{ParticleAveragingStrategy, ParticleResamplingStrategy};
use landmark_pf::{Axis, ControlInput, FilterError, Pose};

const SENSOR_RANGE: f64 = 20.0;
const DT: f64 = 0.1;
const STEPS: usize = 100;

/// Landmarks every 10 m on a grid covering the test trajectory.
fn grid_map() -> LandmarkMap {
    let mut id = 0;
    let mut landmarks = Vec::new();
    for i in -2..=6 {
        for j in -2..=6 {
            id += 1;
            landmarks.push(Landmark::new(id, i as f64 * 10.0, j as f64 * 10.0));
        }
    }
    LandmarkMap::new(landmarks)
}

/// Noise-free observations of every landmark within range, in the agent's local frame.
fn observe(truth: &Pose, map: &LandmarkMap) -> Vec<LandmarkObservation> {
    let (sin, cos) = truth.theta.sin_cos();
    map.iter()
        .filter(|l| distance(truth.x, truth.y, l.x, l.y) <= SENSOR_RANGE)
        .map(|l| {
            let dx = l.x - truth.x;
            let dy = l.y - truth.y;
            LandmarkObservation::new(cos * dx + sin * dy, -sin * dx + cos * dy)
        })
        .collect()
}

#[test]
fn single_particle_cycle_has_closed_form_weight() {
    let mut pf = ParticleFilter::with_seed(1, 1).unwrap();
    pf.init(Pose::new(0.0, 0.0, 0.0), &ProcessNoise::zero()).unwrap();
    let map = LandmarkMap::new(vec![Landmark::new(1, 5.0, 5.0)]);
    let noise = LandmarkNoise::new(0.3, 0.3).unwrap();

    pf.update_weights(50.0, &noise, &[LandmarkObservation::new(5.0, 5.0)], &map)
        .unwrap();
    assert_approx_eq!(pf.weights()[0], 1.0 / (2.0 * PI * 0.3 * 0.3), 1e-12);

    pf.resample().unwrap();
    let particle = &pf.particles()[0];
    assert_eq!(particle.pose, Pose::new(0.0, 0.0, 0.0));
    assert_eq!(pf.get_associations(particle), "1");
    assert_eq!(pf.get_sense_coordinates(particle, Axis::X), "5");
    assert_eq!(pf.get_sense_coordinates(particle, Axis::Y), "5");
}

#[test]
fn tracks_curved_trajectory_with_every_strategy() {
    let map = grid_map();
    let control = ControlInput::new(2.0, 0.1);
    let process_noise = ProcessNoise::new(0.1, 0.1, 0.01).unwrap();
    let landmark_noise = LandmarkNoise::new(0.3, 0.3).unwrap();

    for strategy in [
        ParticleResamplingStrategy::Multinomial,
        ParticleResamplingStrategy::Systematic,
        ParticleResamplingStrategy::Stratified,
        ParticleResamplingStrategy::Residual,
    ] {
        let config = FilterConfig {
            num_particles: 200,
            seed: Some(2024),
            resampling_strategy: strategy,
            averaging_strategy: ParticleAveragingStrategy::HighestWeight,
            ..FilterConfig::default()
        };
        let mut pf = ParticleFilter::new(config).unwrap();
        let mut truth = Pose::new(0.0, 0.0, 0.0);
        pf.init(truth, &ProcessNoise::new(0.3, 0.3, 0.01).unwrap())
            .unwrap();

        for step in 0..STEPS {
            truth = deterministic_motion(&truth, control, DT, DEFAULT_YAW_RATE_THRESHOLD);
            let observations = observe(&truth, &map);
            assert!(!observations.is_empty());

            pf.predict(DT, &process_noise, control).unwrap();
            pf.update_weights(SENSOR_RANGE, &landmark_noise, &observations, &map)
                .unwrap();
            let estimate = pf.estimate().unwrap();
            pf.resample().unwrap();

            let position_error = distance(estimate.x, estimate.y, truth.x, truth.y);
            let heading_error = wrap_to_pi(estimate.theta - truth.theta).abs();
            assert!(
                position_error < 0.5,
                "{strategy:?} step {step}: position error {position_error}"
            );
            assert!(
                heading_error < 0.1,
                "{strategy:?} step {step}: heading error {heading_error}"
            );
            assert_eq!(pf.particles().len(), 200);
        }
        assert_approx_eq!(truth.theta, 1.0, 1e-9);
    }
}

#[test]
fn dead_reckoning_without_observations_keeps_uniform_weights() {
    let mut pf = ParticleFilter::with_seed(50, 3).unwrap();
    pf.init(Pose::new(0.0, 0.0, 0.0), &ProcessNoise::zero()).unwrap();
    let noise = LandmarkNoise::new(0.3, 0.3).unwrap();
    let map = grid_map();
    for _ in 0..10 {
        pf.predict(DT, &ProcessNoise::zero(), ControlInput::new(1.0, 0.0))
            .unwrap();
        pf.update_weights(SENSOR_RANGE, &noise, &[], &map).unwrap();
        pf.resample().unwrap();
    }
    assert!(pf.weights().iter().all(|&w| w == 1.0));
    for particle in pf.particles() {
        assert_approx_eq!(particle.pose.x, 1.0, 1e-9);
        assert_eq!(particle.pose.y, 0.0);
        assert_eq!(pf.get_associations(particle), "");
    }
}

#[test]
fn same_seed_reproduces_population() {
    let run = || {
        let mut pf = ParticleFilter::with_seed(100, 77).unwrap();
        let map = grid_map();
        let truth = Pose::new(1.0, 2.0, 0.2);
        pf.init(truth, &ProcessNoise::new(0.5, 0.5, 0.05).unwrap())
            .unwrap();
        let control = ControlInput::new(3.0, -0.2);
        pf.predict(DT, &ProcessNoise::new(0.2, 0.2, 0.02).unwrap(), control)
            .unwrap();
        let moved = deterministic_motion(&truth, control, DT, DEFAULT_YAW_RATE_THRESHOLD);
        pf.update_weights(
            SENSOR_RANGE,
            &LandmarkNoise::new(0.3, 0.3).unwrap(),
            &observe(&moved, &map),
            &map,
        )
        .unwrap();
        pf.resample().unwrap();
        pf.particles().to_vec()
    };
    assert_eq!(run(), run());
}

#[test]
fn errors_surface_without_corrupting_state() {
    let mut pf = ParticleFilter::with_seed(10, 5).unwrap();
    assert_eq!(pf.resample(), Err(FilterError::NotInitialized));

    pf.init(Pose::new(0.0, 0.0, 0.0), &ProcessNoise::new(0.2, 0.2, 0.02).unwrap())
        .unwrap();
    let before = pf.particles().to_vec();
    let noise = LandmarkNoise::new(0.3, 0.3).unwrap();
    assert_eq!(
        pf.update_weights(
            SENSOR_RANGE,
            &noise,
            &[LandmarkObservation::new(1.0, 0.0)],
            &LandmarkMap::default()
        ),
        Err(FilterError::EmptyLandmarkSet)
    );
    assert_eq!(
        pf.predict(-0.1, &ProcessNoise::zero(), ControlInput::new(1.0, 0.0)),
        Err(FilterError::InvalidTimeStep(-0.1))
    );
    assert_eq!(pf.particles(), before.as_slice());
    assert!(LandmarkNoise::new(0.0, 0.3).is_err());
}
