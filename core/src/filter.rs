//! The landmark particle filter.
//!
//! [`ParticleFilter`] owns the particle population, the parallel weight vector and a single
//! seeded random number generator that is reused across every call. The external control loop
//! drives it with [`ParticleFilter::predict`], [`ParticleFilter::update_weights`] and
//! [`ParticleFilter::resample`], once per control and observation pair.
//!
//! Every operation validates its inputs before touching the population, so a call that returns
//! an error leaves the filter exactly as it was.
use log::{debug, trace, warn};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rayon::prelude::*;
use std::fmt::{self, Debug};

use crate::config::FilterConfig;
use crate::error::{FilterError, Result};
use crate::map::LandmarkMap;
use crate::measurements::{LandmarkNoise, LandmarkObservation, ProcessNoise};
use crate::motion::MotionModel;
use crate::particle::{Particle, highest_weight};
use crate::{Axis, ControlInput, Pose};

#[derive(Clone)]
pub struct ParticleFilter {
    config: FilterConfig,
    particles: Vec<Particle>,
    weights: Vec<f64>,
    rng: StdRng,
    is_initialized: bool,
}

impl Debug for ParticleFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let min_weight = self.weights.iter().copied().fold(f64::INFINITY, f64::min);
        let max_weight = self.weights.iter().copied().fold(0.0, f64::max);
        f.debug_struct("ParticleFilter")
            .field("num_particles", &self.config.num_particles)
            .field("is_initialized", &self.is_initialized)
            .field("effective_particles", &self.effective_sample_size())
            .field(
                "weight_range",
                &format_args!("[{:.4e}, {:.4e}]", min_weight, max_weight),
            )
            .field("resampling_strategy", &self.config.resampling_strategy)
            .finish()
    }
}

impl ParticleFilter {
    /// Create an uninitialized filter.
    ///
    /// # Errors
    /// [`FilterError::InvalidParticleCount`] if `config.num_particles` is zero, or
    /// [`FilterError::InvalidNoiseParameter`] for an unusable yaw-rate threshold.
    pub fn new(config: FilterConfig) -> Result<Self> {
        config.validate()?;
        let seed = config.seed.unwrap_or_else(rand::random);
        debug!(
            "Creating particle filter with {} particles (seed {})",
            config.num_particles, seed
        );
        Ok(ParticleFilter {
            particles: Vec::with_capacity(config.num_particles),
            weights: Vec::with_capacity(config.num_particles),
            rng: StdRng::seed_from_u64(seed),
            is_initialized: false,
            config,
        })
    }

    /// Create a filter with `num_particles` particles and a fixed seed; all other settings default.
    ///
    /// This is useful for reproducible tests.
    pub fn with_seed(num_particles: usize, seed: u64) -> Result<Self> {
        Self::new(FilterConfig {
            num_particles,
            seed: Some(seed),
            ..FilterConfig::default()
        })
    }

    /// Scatter the population around a prior pose.
    ///
    /// Each particle is drawn independently from three uncorrelated Gaussians centred on `prior`
    /// with the deviations in `std`. All weights start at `1.0`. Calling `init` again discards
    /// the current population and starts over.
    pub fn init(&mut self, prior: Pose, std: &ProcessNoise) -> Result<()> {
        let spread = MotionModel::new(std, self.config.yaw_rate_threshold)?;
        let n = self.config.num_particles;
        let particles: Vec<Particle> = (0..n)
            .map(|id| Particle::new(id, spread.sample_around(&prior, &mut self.rng), 1.0))
            .collect();
        self.weights = vec![1.0; n];
        self.particles = particles;
        self.is_initialized = true;
        debug!("Initialized {} particles around {}", n, prior);
        Ok(())
    }

    /// Propagate every particle through the motion model.
    ///
    /// Weights are not touched.
    ///
    /// # Errors
    /// - [`FilterError::NotInitialized`] before [`ParticleFilter::init`].
    /// - [`FilterError::InvalidTimeStep`] if `dt` is not positive and finite.
    pub fn predict(&mut self, dt: f64, noise: &ProcessNoise, control: ControlInput) -> Result<()> {
        self.require_initialized()?;
        if !(dt > 0.0 && dt.is_finite()) {
            return Err(FilterError::InvalidTimeStep(dt));
        }
        let model = MotionModel::new(noise, self.config.yaw_rate_threshold)?;
        trace!("Predict dt = {dt}, {control}");
        for particle in &mut self.particles {
            model.propagate(&mut particle.pose, control, dt, &mut self.rng);
        }
        Ok(())
    }

    /// Reweight every particle against a set of local-frame observations.
    ///
    /// `sensor_range` is the sensor's nominal reach. It must be non-negative but is only recorded
    /// in the trace log; landmarks outside it are still considered for association.
    ///
    /// An empty observation set gives every particle a weight of `1.0` and clears its
    /// associations.
    ///
    /// # Errors
    /// - [`FilterError::NotInitialized`] before [`ParticleFilter::init`].
    /// - [`FilterError::InvalidNoiseParameter`] if `sensor_range` is negative or not finite.
    /// - [`FilterError::EmptyLandmarkSet`] if there are observations but `landmarks` is empty.
    pub fn update_weights(
        &mut self,
        sensor_range: f64,
        noise: &LandmarkNoise,
        observations: &[LandmarkObservation],
        landmarks: &LandmarkMap,
    ) -> Result<()> {
        self.require_initialized()?;
        if !(sensor_range >= 0.0 && sensor_range.is_finite()) {
            return Err(FilterError::InvalidNoiseParameter {
                name: "sensor_range",
                value: sensor_range,
            });
        }
        if !observations.is_empty() && landmarks.is_empty() {
            return Err(FilterError::EmptyLandmarkSet);
        }
        trace!(
            "Updating weights with {} observations against {} landmarks (sensor range {})",
            observations.len(),
            landmarks.len(),
            sensor_range
        );
        let weights: Vec<f64> = if self.config.parallel {
            self.particles
                .par_iter_mut()
                .map(|particle| particle.update_weight(observations, landmarks, noise))
                .collect::<Result<_>>()?
        } else {
            self.particles
                .iter_mut()
                .map(|particle| particle.update_weight(observations, landmarks, noise))
                .collect::<Result<_>>()?
        };
        self.weights = weights;
        Ok(())
    }

    /// Draw a new population of the same size, with replacement, proportional to weight.
    ///
    /// Each drawn particle is an independent copy of its parent. Ids are reassigned `0..N` so
    /// they stay unique within the new population; weights are carried over unchanged.
    ///
    /// # Errors
    /// - [`FilterError::NotInitialized`] before [`ParticleFilter::init`].
    /// - [`FilterError::DegenerateWeights`] if the weights cannot form a distribution (for
    ///   example all zero). The population is left unchanged; recovering, for instance by
    ///   calling [`ParticleFilter::init`] again, is up to the caller.
    pub fn resample(&mut self) -> Result<()> {
        self.require_initialized()?;
        let n = self.config.num_particles;
        let indices = self
            .config
            .resampling_strategy
            .resample_indices(&self.weights, n, &mut self.rng)
            .inspect_err(|_| warn!("Resampling aborted: degenerate particle weights"))?;
        let particles: Vec<Particle> = indices
            .into_iter()
            .enumerate()
            .map(|(id, parent)| Particle {
                id,
                ..self.particles[parent].clone()
            })
            .collect();
        self.weights = particles.iter().map(|p| p.weight).collect();
        self.particles = particles;
        debug!(
            "Resampled {} particles ({:?})",
            n, self.config.resampling_strategy
        );
        Ok(())
    }

    /// Resample only when the effective sample size drops below `threshold_ratio * N`.
    ///
    /// Returns true if resampling was performed.
    pub fn resample_if_needed(&mut self, threshold_ratio: f64) -> Result<bool> {
        self.require_initialized()?;
        let threshold = threshold_ratio * self.config.num_particles as f64;
        if self.effective_sample_size() < threshold {
            self.resample()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Space-separated ids of the landmarks `particle` was associated with.
    pub fn get_associations(&self, particle: &Particle) -> String {
        particle.associations_string()
    }

    /// Space-separated map-frame coordinates of `particle`'s associated observations.
    pub fn get_sense_coordinates(&self, particle: &Particle, axis: Axis) -> String {
        particle.sense_coordinates_string(axis)
    }

    /// Effective sample size of the normalized weights, $(\sum w)^2 / \sum w^2$.
    ///
    /// Returns `0.0` when the weights are all zero or the filter is uninitialized.
    pub fn effective_sample_size(&self) -> f64 {
        let sum: f64 = self.weights.iter().sum();
        let sum_of_squares: f64 = self.weights.iter().map(|w| w * w).sum();
        if sum_of_squares > 0.0 && sum_of_squares.is_finite() {
            sum * sum / sum_of_squares
        } else {
            0.0
        }
    }

    /// The highest-weight particle; the first one wins a tie.
    pub fn best_particle(&self) -> Option<&Particle> {
        highest_weight(&self.particles)
    }

    /// Pose estimate according to the configured averaging strategy.
    pub fn estimate(&self) -> Result<Pose> {
        self.require_initialized()?;
        self.config.averaging_strategy.estimate(&self.particles)
    }

    pub fn is_initialized(&self) -> bool {
        self.is_initialized
    }
    pub fn num_particles(&self) -> usize {
        self.config.num_particles
    }
    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }
    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    fn require_initialized(&self) -> Result<()> {
        if self.is_initialized {
            Ok(())
        } else {
            Err(FilterError::NotInitialized)
        }
    }
}
