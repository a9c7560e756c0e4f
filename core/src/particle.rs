//! Particles, resampling strategies and estimate extraction.
//!
//! A [`Particle`] is one weighted pose hypothesis. Besides its pose and (unnormalized) importance
//! weight it carries a diagnostic association record: the ids of the landmarks its last set of
//! observations were matched to, and those observations expressed in the map frame.
use rand::Rng;
use rand::distr::weighted::WeightedIndex;
use rand_distr::Distribution;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

use crate::error::{FilterError, Result};
use crate::geometry::circular_mean;
use crate::map::LandmarkMap;
use crate::measurements::{LandmarkNoise, LandmarkObservation};
use crate::{Axis, Pose};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Particle {
    pub id: usize,
    pub pose: Pose,
    pub weight: f64,
    /// Ids of the landmarks matched by the most recent weight update.
    pub associations: Vec<i32>,
    /// Map-frame x of each associated observation, parallel to `associations`.
    pub sense_x: Vec<f64>,
    /// Map-frame y of each associated observation, parallel to `associations`.
    pub sense_y: Vec<f64>,
}
impl Display for Particle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Particle")
            .field("id", &self.id)
            .field("x", &self.pose.x)
            .field("y", &self.pose.y)
            .field("theta", &self.pose.theta)
            .field("weight", &self.weight)
            .field("associations", &self.associations.len())
            .finish()
    }
}
impl Particle {
    pub fn new(id: usize, pose: Pose, weight: f64) -> Particle {
        Particle {
            id,
            pose,
            weight,
            associations: Vec::new(),
            sense_x: Vec::new(),
            sense_y: Vec::new(),
        }
    }

    /// Replace the diagnostic association record.
    ///
    /// The three sequences must be parallel.
    pub fn set_associations(&mut self, associations: Vec<i32>, sense_x: Vec<f64>, sense_y: Vec<f64>) {
        debug_assert_eq!(associations.len(), sense_x.len());
        debug_assert_eq!(associations.len(), sense_y.len());
        self.associations = associations;
        self.sense_x = sense_x;
        self.sense_y = sense_y;
    }

    /// Space-separated associated landmark ids, e.g. `"1 4 7"`.
    pub fn associations_string(&self) -> String {
        join_space_separated(&self.associations)
    }

    /// Space-separated map-frame coordinates of the associated observations along `axis`.
    ///
    /// Each coordinate is printed with six significant digits, e.g. `"5.12346 -0.5 1.23457e+06"`.
    pub fn sense_coordinates_string(&self, axis: Axis) -> String {
        let values = match axis {
            Axis::X => &self.sense_x,
            Axis::Y => &self.sense_y,
        };
        values
            .iter()
            .map(|&v| format_significant(v))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Compute this particle's importance weight for a set of local-frame observations.
    ///
    /// Every observation is transformed into the map frame using the particle pose, matched to
    /// its nearest landmark and scored with the bivariate Gaussian density. The weight is the
    /// product of the per-observation densities, so an empty observation set yields `1.0`.
    /// The association record is replaced with this update's matches.
    ///
    /// # Errors
    /// [`FilterError::EmptyLandmarkSet`] if there are observations but no landmarks. The
    /// particle is left unchanged in that case.
    pub fn update_weight(
        &mut self,
        observations: &[LandmarkObservation],
        landmarks: &LandmarkMap,
        noise: &LandmarkNoise,
    ) -> Result<f64> {
        let mut weight = 1.0;
        let mut associations = Vec::with_capacity(observations.len());
        let mut sense_x = Vec::with_capacity(observations.len());
        let mut sense_y = Vec::with_capacity(observations.len());
        for observation in observations {
            let mapped = observation.to_map_frame(&self.pose);
            let landmark = landmarks.nearest(mapped.x, mapped.y)?;
            weight *= noise.likelihood(&mapped, landmark);
            associations.push(landmark.id);
            sense_x.push(mapped.x);
            sense_y.push(mapped.y);
        }
        self.weight = weight;
        self.set_associations(associations, sense_x, sense_y);
        Ok(weight)
    }
}

fn join_space_separated<T: Display>(values: &[T]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

const SIGNIFICANT_DIGITS: usize = 6;

/// Shortest rendering of `value` with at most six significant digits.
///
/// Fixed notation is used for decimal exponents in `-4..6`, scientific notation with a signed
/// two-digit exponent otherwise. Trailing zeros are dropped.
fn format_significant(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }
    let scientific = format!("{:.*e}", SIGNIFICANT_DIGITS - 1, value);
    let (mantissa, exponent) = match scientific.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (scientific.as_str(), 0),
    };
    if (-4..SIGNIFICANT_DIGITS as i32).contains(&exponent) {
        let decimals = (SIGNIFICANT_DIGITS as i32 - 1 - exponent) as usize;
        trim_fraction(&format!("{:.*}", decimals, value)).to_string()
    } else {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", trim_fraction(mantissa), sign, exponent.abs())
    }
}

fn trim_fraction(number: &str) -> &str {
    if number.contains('.') {
        number.trim_end_matches('0').trim_end_matches('.')
    } else {
        number
    }
}

/// How a single pose estimate is extracted from the population.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParticleAveragingStrategy {
    WeightedAverage,
    UnweightedAverage,
    #[default]
    HighestWeight,
}
impl ParticleAveragingStrategy {
    /// # Errors
    /// [`FilterError::DegenerateWeights`] when a weighted average is requested and the weights
    /// sum to zero. [`FilterError::NotInitialized`] for an empty population.
    pub fn estimate(&self, particles: &[Particle]) -> Result<Pose> {
        if particles.is_empty() {
            return Err(FilterError::NotInitialized);
        }
        match self {
            ParticleAveragingStrategy::WeightedAverage => {
                let weights: Vec<f64> = particles.iter().map(|p| p.weight).collect();
                let total = validate_weights(&weights)?;
                Ok(average_pose(particles, |p| p.weight / total))
            }
            ParticleAveragingStrategy::UnweightedAverage => {
                let n = particles.len() as f64;
                Ok(average_pose(particles, |_| 1.0 / n))
            }
            ParticleAveragingStrategy::HighestWeight => highest_weight(particles)
                .map(|p| p.pose)
                .ok_or(FilterError::NotInitialized),
        }
    }
}

/// The highest-weight particle; the first one wins a tie.
pub fn highest_weight(particles: &[Particle]) -> Option<&Particle> {
    particles
        .iter()
        .reduce(|best, p| if p.weight > best.weight { p } else { best })
}

fn average_pose(particles: &[Particle], weight_of: impl Fn(&Particle) -> f64) -> Pose {
    let mut x = 0.0;
    let mut y = 0.0;
    for particle in particles {
        let w = weight_of(particle);
        x += w * particle.pose.x;
        y += w * particle.pose.y;
    }
    let theta = circular_mean(particles.iter().map(|p| (p.pose.theta, weight_of(p))))
        .unwrap_or(particles[0].pose.theta);
    Pose { x, y, theta }
}

/// Check that a weight vector can define a discrete distribution and return its sum.
///
/// # Errors
/// [`FilterError::DegenerateWeights`] if any weight is negative or non-finite, or if the sum is
/// not strictly positive and finite.
pub fn validate_weights(weights: &[f64]) -> Result<f64> {
    if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
        return Err(FilterError::DegenerateWeights);
    }
    let total: f64 = weights.iter().sum();
    if total > 0.0 && total.is_finite() {
        Ok(total)
    } else {
        Err(FilterError::DegenerateWeights)
    }
}

/// Resampling schemes. All draw `n` indices with probability proportional to weight.
///
/// `Multinomial` draws every index independently with replacement. The others are
/// lower-variance schemes that keep the same expected selection counts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParticleResamplingStrategy {
    #[default]
    Multinomial,
    Systematic,
    Stratified,
    Residual,
}
impl ParticleResamplingStrategy {
    /// Draw `n` parent indices from the (possibly unnormalized) `weights`.
    pub fn resample_indices<R: Rng + ?Sized>(
        &self,
        weights: &[f64],
        n: usize,
        rng: &mut R,
    ) -> Result<Vec<usize>> {
        match self {
            ParticleResamplingStrategy::Multinomial => multinomial_resample(weights, n, rng),
            ParticleResamplingStrategy::Systematic => systematic_resample(weights, n, rng),
            ParticleResamplingStrategy::Stratified => stratified_resample(weights, n, rng),
            ParticleResamplingStrategy::Residual => residual_resample(weights, n, rng),
        }
    }
}

/// Independent draws with replacement from the discrete distribution defined by `weights`.
pub fn multinomial_resample<R: Rng + ?Sized>(
    weights: &[f64],
    n: usize,
    rng: &mut R,
) -> Result<Vec<usize>> {
    validate_weights(weights)?;
    let distribution = WeightedIndex::new(weights).map_err(|_| FilterError::DegenerateWeights)?;
    Ok((0..n).map(|_| distribution.sample(rng)).collect())
}

/// One uniform offset, `n` evenly spaced pointers into the cumulative weights.
pub fn systematic_resample<R: Rng + ?Sized>(
    weights: &[f64],
    n: usize,
    rng: &mut R,
) -> Result<Vec<usize>> {
    let offset = rng.random::<f64>();
    comb_resample(weights, n, |_| offset)
}

/// One uniform draw inside each of `n` equal strata of the cumulative weights.
pub fn stratified_resample<R: Rng + ?Sized>(
    weights: &[f64],
    n: usize,
    rng: &mut R,
) -> Result<Vec<usize>> {
    comb_resample(weights, n, |_| rng.random::<f64>())
}

fn comb_resample(
    weights: &[f64],
    n: usize,
    mut jitter: impl FnMut(usize) -> f64,
) -> Result<Vec<usize>> {
    let total = validate_weights(weights)?;
    // The normalized sum can fall just short of 1.0; never walk past the last positive weight.
    let last = weights
        .iter()
        .rposition(|&w| w > 0.0)
        .ok_or(FilterError::DegenerateWeights)?;
    let mut indices = Vec::with_capacity(n);
    let mut j = 0;
    let mut cumulative = weights[0] / total;
    for i in 0..n {
        let target = (i as f64 + jitter(i)) / n as f64;
        while cumulative <= target && j < last {
            j += 1;
            cumulative += weights[j] / total;
        }
        indices.push(j);
    }
    Ok(indices)
}

/// Deterministic copies of `floor(n * w)` followed by systematic resampling of the residuals.
pub fn residual_resample<R: Rng + ?Sized>(
    weights: &[f64],
    n: usize,
    rng: &mut R,
) -> Result<Vec<usize>> {
    let total = validate_weights(weights)?;
    let mut indices = Vec::with_capacity(n);
    let mut residual = Vec::with_capacity(weights.len());
    for (i, &w) in weights.iter().enumerate() {
        let expected = w / total * n as f64;
        let copies = (expected.floor() as usize).min(n - indices.len());
        indices.extend(std::iter::repeat_n(i, copies));
        residual.push(expected - copies as f64);
    }
    let remaining = n - indices.len();
    if remaining > 0 {
        let drawn = match validate_weights(&residual) {
            Ok(_) => systematic_resample(&residual, remaining, rng)?,
            // Rounding left no residual mass; fall back to the input weights.
            Err(_) => systematic_resample(weights, remaining, rng)?,
        };
        indices.extend(drawn);
    }
    Ok(indices)
}
