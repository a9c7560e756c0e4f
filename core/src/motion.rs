//! Velocity / yaw-rate motion model for the prediction step.
//!
//! Each particle is advanced with the standard unicycle model. For a yaw rate $\omega$ above the
//! threshold the curved-path update is
//!
//! $$
//! x(+) = x(-) + \frac{v}{\omega} \left( \sin(\theta + \omega t) - \sin\theta \right) \\\\
//! y(+) = y(-) + \frac{v}{\omega} \left( \cos\theta - \cos(\theta + \omega t) \right) \\\\
//! \theta(+) = \theta(-) + \omega t
//! $$
//!
//! and below it the straight-line limit $x(+) = x(-) + v t \cos\theta$, $y(+) = y(-) + v t \sin\theta$
//! is used to avoid dividing by a vanishing yaw rate. Zero-mean Gaussian process noise is then
//! added to all three pose components in both branches.

use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::error::{FilterError, Result};
use crate::measurements::ProcessNoise;
use crate::{ControlInput, Pose};

/// Yaw rates with a magnitude below this use the straight-line branch.
pub const DEFAULT_YAW_RATE_THRESHOLD: f64 = 1e-4;

/// Deterministic part of the motion model.
pub fn deterministic_motion(
    pose: &Pose,
    control: ControlInput,
    dt: f64,
    yaw_rate_threshold: f64,
) -> Pose {
    let ControlInput { velocity, yaw_rate } = control;
    if yaw_rate.abs() < yaw_rate_threshold {
        Pose {
            x: pose.x + velocity * pose.theta.cos() * dt,
            y: pose.y + velocity * pose.theta.sin() * dt,
            theta: pose.theta,
        }
    } else {
        let theta_next = pose.theta + yaw_rate * dt;
        Pose {
            x: pose.x + velocity / yaw_rate * (theta_next.sin() - pose.theta.sin()),
            y: pose.y + velocity / yaw_rate * (pose.theta.cos() - theta_next.cos()),
            theta: theta_next,
        }
    }
}

/// Motion model with its process noise distributions built once per prediction step.
#[derive(Clone, Debug)]
pub struct MotionModel {
    noise_x: Normal<f64>,
    noise_y: Normal<f64>,
    noise_theta: Normal<f64>,
    yaw_rate_threshold: f64,
}
impl MotionModel {
    pub fn new(noise: &ProcessNoise, yaw_rate_threshold: f64) -> Result<Self> {
        Ok(MotionModel {
            noise_x: zero_mean_normal("std_x", noise.std_x())?,
            noise_y: zero_mean_normal("std_y", noise.std_y())?,
            noise_theta: zero_mean_normal("std_theta", noise.std_theta())?,
            yaw_rate_threshold,
        })
    }

    /// Advance `pose` in place by `dt` seconds under `control`, then add process noise.
    pub fn propagate<R: Rng + ?Sized>(
        &self,
        pose: &mut Pose,
        control: ControlInput,
        dt: f64,
        rng: &mut R,
    ) {
        let predicted = deterministic_motion(pose, control, dt, self.yaw_rate_threshold);
        pose.x = predicted.x + self.noise_x.sample(rng);
        pose.y = predicted.y + self.noise_y.sample(rng);
        pose.theta = predicted.theta + self.noise_theta.sample(rng);
    }

    /// Draw a pose around `mean` with the model's noise as the spread.
    ///
    /// Used to scatter the initial population around the prior.
    pub fn sample_around<R: Rng + ?Sized>(&self, mean: &Pose, rng: &mut R) -> Pose {
        Pose {
            x: mean.x + self.noise_x.sample(rng),
            y: mean.y + self.noise_y.sample(rng),
            theta: mean.theta + self.noise_theta.sample(rng),
        }
    }
}

fn zero_mean_normal(name: &'static str, std_dev: f64) -> Result<Normal<f64>> {
    Normal::new(0.0, std_dev).map_err(|_| FilterError::InvalidNoiseParameter {
        name,
        value: std_dev,
    })
}
