//! Landmark observations and the noise models used by the filter.
//!
//! Observations arrive in the agent's local frame: x forward, y to the left, relative to the pose
//! at the time of sensing. They are transformed into the map frame per particle during the weight
//! update. The noise types validate their standard deviations at construction so the density
//! evaluation never divides by zero.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

use crate::Pose;
use crate::error::{FilterError, Result};
use crate::geometry::{bivariate_gaussian_pdf, local_to_map};
use crate::map::Landmark;

/// A landmark measurement relative to the agent.
///
/// `id` is `None` until the observation has been associated with a landmark.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LandmarkObservation {
    pub id: Option<i32>,
    pub x: f64,
    pub y: f64,
}
impl LandmarkObservation {
    /// Create an unassociated observation in the agent's local frame.
    pub fn new(x: f64, y: f64) -> Self {
        LandmarkObservation { id: None, x, y }
    }
    pub fn with_id(id: i32, x: f64, y: f64) -> Self {
        LandmarkObservation { id: Some(id), x, y }
    }
    /// Express this observation in the map frame as seen from `pose`.
    ///
    /// The returned observation keeps the current `id`.
    pub fn to_map_frame(&self, pose: &Pose) -> LandmarkObservation {
        let (x, y) = local_to_map(pose, self.x, self.y);
        LandmarkObservation { id: self.id, x, y }
    }
}
impl Display for LandmarkObservation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id {
            Some(id) => write!(f, "Observation {} at ({:.4}, {:.4})", id, self.x, self.y),
            None => write!(f, "Observation (unassociated) at ({:.4}, {:.4})", self.x, self.y),
        }
    }
}

/// Landmark measurement noise: independent standard deviations along x and y.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LandmarkNoise {
    std_x: f64,
    std_y: f64,
}
impl LandmarkNoise {
    /// # Errors
    /// [`FilterError::InvalidNoiseParameter`] if either deviation is not strictly positive and
    /// finite.
    pub fn new(std_x: f64, std_y: f64) -> Result<Self> {
        require_positive("std_landmark_x", std_x)?;
        require_positive("std_landmark_y", std_y)?;
        Ok(LandmarkNoise { std_x, std_y })
    }
    pub fn std_x(&self) -> f64 {
        self.std_x
    }
    pub fn std_y(&self) -> f64 {
        self.std_y
    }
    /// Density of a map-frame observation given the landmark it was associated with.
    pub fn likelihood(&self, observation: &LandmarkObservation, landmark: &Landmark) -> f64 {
        bivariate_gaussian_pdf(
            self.std_x,
            self.std_y,
            observation.x,
            observation.y,
            landmark.x,
            landmark.y,
        )
    }
}
impl TryFrom<[f64; 2]> for LandmarkNoise {
    type Error = FilterError;
    fn try_from(std: [f64; 2]) -> Result<Self> {
        LandmarkNoise::new(std[0], std[1])
    }
}

/// Per-axis pose standard deviations.
///
/// Used both as the spread of the initialization prior and as the process noise added during
/// prediction. Zero is allowed and disables the noise on that axis.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessNoise {
    std_x: f64,
    std_y: f64,
    std_theta: f64,
}
impl ProcessNoise {
    /// # Errors
    /// [`FilterError::InvalidNoiseParameter`] if any deviation is negative or non-finite.
    pub fn new(std_x: f64, std_y: f64, std_theta: f64) -> Result<Self> {
        require_non_negative("std_x", std_x)?;
        require_non_negative("std_y", std_y)?;
        require_non_negative("std_theta", std_theta)?;
        Ok(ProcessNoise {
            std_x,
            std_y,
            std_theta,
        })
    }
    /// No noise on any axis.
    pub fn zero() -> Self {
        ProcessNoise::default()
    }
    pub fn std_x(&self) -> f64 {
        self.std_x
    }
    pub fn std_y(&self) -> f64 {
        self.std_y
    }
    pub fn std_theta(&self) -> f64 {
        self.std_theta
    }
}
impl TryFrom<[f64; 3]> for ProcessNoise {
    type Error = FilterError;
    fn try_from(std: [f64; 3]) -> Result<Self> {
        ProcessNoise::new(std[0], std[1], std[2])
    }
}

fn require_positive(name: &'static str, value: f64) -> Result<()> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(FilterError::InvalidNoiseParameter { name, value })
    }
}

fn require_non_negative(name: &'static str, value: f64) -> Result<()> {
    if value >= 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(FilterError::InvalidNoiseParameter { name, value })
    }
}
