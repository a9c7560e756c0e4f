//! Planar geometry and probability density helpers.
//!
//! These are pure functions with no state. They are shared by the motion model, the
//! data association step and the observation model.

use nalgebra::{Isometry2, Point2, Vector2};
use std::f64::consts::PI;

use crate::Pose;

/// Euclidean distance between two points in the plane.
///
/// # Example
/// ```rust
/// use landmark_pf::geometry::distance;
/// assert_eq!(distance(0.0, 0.0, 3.0, 4.0), 5.0);
/// ```
pub fn distance(x1: f64, y1: f64, x2: f64, y2: f64) -> f64 {
    (x2 - x1).hypot(y2 - y1)
}

/// Bivariate Gaussian density with an axis-aligned covariance.
///
/// Evaluates
///
/// $$
/// p = \frac{1}{2 \pi \sigma_x \sigma_y} \exp\left( -\left[ \frac{(x - \mu_x)^2}{2 \sigma_x^2} + \frac{(y - \mu_y)^2}{2 \sigma_y^2} \right] \right)
/// $$
///
/// There is no correlation term. Callers are responsible for passing strictly positive standard
/// deviations; [`crate::measurements::LandmarkNoise`] enforces this at construction.
///
/// # Arguments
/// * `std_x`, `std_y` - standard deviations along each axis
/// * `x`, `y` - the point being evaluated (the transformed observation)
/// * `mu_x`, `mu_y` - the mean (the matched landmark)
pub fn bivariate_gaussian_pdf(std_x: f64, std_y: f64, x: f64, y: f64, mu_x: f64, mu_y: f64) -> f64 {
    let normalizer = 1.0 / (2.0 * PI * std_x * std_y);
    let dx = x - mu_x;
    let dy = y - mu_y;
    let exponent = dx * dx / (2.0 * std_x * std_x) + dy * dy / (2.0 * std_y * std_y);
    normalizer * (-exponent).exp()
}

/// Transform a point from the agent's local frame into the map frame.
///
/// Rotates by the pose heading and then translates by the pose position:
///
/// $$
/// x_m = x_p + x_l \cos\theta - y_l \sin\theta \\\\
/// y_m = y_p + x_l \sin\theta + y_l \cos\theta
/// $$
pub fn local_to_map(pose: &Pose, local_x: f64, local_y: f64) -> (f64, f64) {
    let isometry = Isometry2::new(Vector2::new(pose.x, pose.y), pose.theta);
    let mapped = isometry * Point2::new(local_x, local_y);
    (mapped.x, mapped.y)
}

/// Wrap an angle to the range -π to π radians
///
/// # Example
/// ```rust
/// use landmark_pf::geometry::wrap_to_pi;
/// use std::f64::consts::PI;
/// let wrapped = wrap_to_pi(3.0 * PI / 2.0);
/// assert!((wrapped + PI / 2.0).abs() < 1e-12);
/// ```
pub fn wrap_to_pi(angle: f64) -> f64 {
    let mut wrapped = angle;
    while wrapped > PI {
        wrapped -= 2.0 * PI;
    }
    while wrapped < -PI {
        wrapped += 2.0 * PI;
    }
    wrapped
}

/// Weighted circular mean of a set of headings.
///
/// Returns `None` when the resultant vector has zero length (no weight, or headings that
/// cancel exactly), in which case the mean direction is undefined.
pub fn circular_mean<I>(headings: I) -> Option<f64>
where
    I: IntoIterator<Item = (f64, f64)>,
{
    let (sin_sum, cos_sum) = headings
        .into_iter()
        .fold((0.0, 0.0), |(s, c), (theta, weight)| {
            (s + weight * theta.sin(), c + weight * theta.cos())
        });
    if sin_sum == 0.0 && cos_sum == 0.0 {
        None
    } else {
        Some(sin_sum.atan2(cos_sum))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn distance_is_symmetric() {
        assert_approx_eq!(distance(1.0, 2.0, 4.0, 6.0), 5.0, 1e-12);
        assert_approx_eq!(distance(4.0, 6.0, 1.0, 2.0), 5.0, 1e-12);
        assert_eq!(distance(3.0, 3.0, 3.0, 3.0), 0.0);
    }

    #[test]
    fn gaussian_peak_matches_normalizer() {
        let std_x = 0.3;
        let std_y = 0.3;
        let peak = bivariate_gaussian_pdf(std_x, std_y, 5.0, 5.0, 5.0, 5.0);
        assert_approx_eq!(peak, 1.0 / (2.0 * PI * std_x * std_y), 1e-12);
    }

    #[test]
    fn gaussian_off_peak_value() {
        // One standard deviation off along x only.
        let density = bivariate_gaussian_pdf(2.0, 1.0, 2.0, 0.0, 0.0, 0.0);
        let expected = 1.0 / (2.0 * PI * 2.0) * (-0.5_f64).exp();
        assert_approx_eq!(density, expected, 1e-12);
        assert!(density < bivariate_gaussian_pdf(2.0, 1.0, 0.0, 0.0, 0.0, 0.0));
    }

    #[test]
    fn local_to_map_identity_pose() {
        let pose = Pose::new(0.0, 0.0, 0.0);
        let (x, y) = local_to_map(&pose, 5.0, 5.0);
        assert_eq!((x, y), (5.0, 5.0));
    }

    #[test]
    fn local_to_map_rotated_and_translated() {
        let pose = Pose::new(4.0, 5.0, -FRAC_PI_2);
        let (x, y) = local_to_map(&pose, 2.0, 2.0);
        assert_approx_eq!(x, 6.0, 1e-9);
        assert_approx_eq!(y, 3.0, 1e-9);
    }

    #[test]
    fn wrap_to_pi_bounds() {
        assert_approx_eq!(wrap_to_pi(2.0 * PI + 0.1), 0.1, 1e-12);
        assert_approx_eq!(wrap_to_pi(-2.0 * PI - 0.1), -0.1, 1e-12);
        assert_eq!(wrap_to_pi(0.5), 0.5);
    }

    #[test]
    fn circular_mean_across_the_seam() {
        let mean = circular_mean(vec![(PI - 0.1, 1.0), (-PI + 0.1, 1.0)]).unwrap();
        assert_approx_eq!(mean.abs(), PI, 1e-9);
        assert!(circular_mean(vec![(0.0, 0.0)]).is_none());
    }
}
