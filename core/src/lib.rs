//! Landmark-based particle filter localization
//!
//! This crate implements the algorithmic core of a sequential Monte Carlo (particle filter)
//! localizer. It estimates the planar pose $(x, y, \theta)$ of a mobile agent by maintaining a
//! population of weighted pose hypotheses ("particles"), propagating them through a motion model,
//! reweighting them against observations matched to known landmarks, and resampling the
//! population proportional to weight.
//!
//! Loading the landmark map, parsing sensor logs and driving the per-timestep loop are left to the
//! caller. The filter consumes already-parsed numeric inputs.
//!
//! This crate is primarily built off of the following dependencies:
//! - [`nalgebra`](https://crates.io/crates/nalgebra): rigid-body transforms between the agent and map frames.
//! - [`rand`](https://crates.io/crates/rand) and [`rand_distr`](https://crates.io/crates/rand_distr): process noise, prior sampling and resampling.
//! - [`rayon`](https://crates.io/crates/rayon): optional data-parallel weight update.
//! - [`serde`](https://crates.io/crates/serde): configuration and state (de)serialization.
//!
//! ## Crate overview
//!
//! - [geometry]: distance, Gaussian density and frame transform helpers.
//! - [map]: the landmark set and nearest-landmark data association.
//! - [measurements]: landmark observations and the noise parameter types.
//! - [motion]: the velocity / yaw-rate motion model used in the prediction step.
//! - [particle]: the particle type, resampling and averaging strategies.
//! - [filter]: the [`filter::ParticleFilter`] service tying the steps together.
//! - [config]: serializable filter configuration.
//! - [error]: the [`error::FilterError`] type.
//!
//! ## Filter cycle
//!
//! Per timestep the caller invokes, in order:
//!
//! 1. [`filter::ParticleFilter::predict`] with the control input and elapsed time,
//! 2. [`filter::ParticleFilter::update_weights`] with the observations and landmark map,
//! 3. [`filter::ParticleFilter::resample`].
//!
//! ```rust
//! use landmark_pf::filter::ParticleFilter;
//! use landmark_pf::map::{Landmark, LandmarkMap};
//! use landmark_pf::measurements::{LandmarkNoise, LandmarkObservation, ProcessNoise};
//! use landmark_pf::{ControlInput, Pose};
//!
//! let mut pf = ParticleFilter::with_seed(50, 7).unwrap();
//! pf.init(Pose::new(0.0, 0.0, 0.0), &ProcessNoise::new(0.3, 0.3, 0.01).unwrap())
//!     .unwrap();
//!
//! let map = LandmarkMap::new(vec![Landmark::new(1, 5.0, 5.0), Landmark::new(2, 10.0, -3.0)]);
//! let observations = vec![LandmarkObservation::new(4.0, 5.0)];
//!
//! pf.predict(0.1, &ProcessNoise::new(0.3, 0.3, 0.01).unwrap(), ControlInput::new(10.0, 0.0))
//!     .unwrap();
//! pf.update_weights(50.0, &LandmarkNoise::new(0.3, 0.3).unwrap(), &observations, &map)
//!     .unwrap();
//! pf.resample().unwrap();
//! assert_eq!(pf.num_particles(), 50);
//! ```
pub mod config;
pub mod error;
pub mod filter;
pub mod geometry;
pub mod map;
pub mod measurements;
pub mod motion;
pub mod particle;

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

pub use error::{FilterError, Result};

/// Planar pose of the agent (or of one pose hypothesis) in the map frame.
///
/// `theta` is the heading in radians measured counter-clockwise from the map x-axis. It is not
/// normalized; prediction simply accumulates the yaw increments.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub x: f64,
    pub y: f64,
    pub theta: f64,
}
impl Pose {
    pub fn new(x: f64, y: f64, theta: f64) -> Self {
        Pose { x, y, theta }
    }
}
impl Display for Pose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pose(x: {:.4}, y: {:.4}, theta: {:.4} rad)", self.x, self.y, self.theta)
    }
}
impl From<(f64, f64, f64)> for Pose {
    fn from(tuple: (f64, f64, f64)) -> Self {
        Pose::new(tuple.0, tuple.1, tuple.2)
    }
}
impl From<Pose> for Vec<f64> {
    fn from(pose: Pose) -> Self {
        vec![pose.x, pose.y, pose.theta]
    }
}

/// Control input supplied by the odometry collaborator for one prediction step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ControlInput {
    /// Linear velocity along the heading (map units per second)
    pub velocity: f64,
    /// Yaw rate (radians per second)
    pub yaw_rate: f64,
}
impl ControlInput {
    pub fn new(velocity: f64, yaw_rate: f64) -> Self {
        ControlInput { velocity, yaw_rate }
    }
}
impl Display for ControlInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ControlInput(velocity: {:.4}, yaw_rate: {:.4} rad/s)",
            self.velocity, self.yaw_rate
        )
    }
}

/// Coordinate axis selector for the diagnostic sense-coordinate rendering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
}
