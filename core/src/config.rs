//! Filter configuration.
//!
//! [`FilterConfig`] collects the design constants of a [`crate::filter::ParticleFilter`]: the
//! population size, the random seed, the yaw-rate guard of the motion model and the strategy
//! choices. It can be written to and read from JSON, YAML or TOML.
//!
//! ```
//! use landmark_pf::config::FilterConfig;
//! use landmark_pf::particle::ParticleResamplingStrategy;
//!
//! let cfg = FilterConfig {
//!     num_particles: 500,
//!     seed: Some(42),
//!     resampling_strategy: ParticleResamplingStrategy::Systematic,
//!     ..FilterConfig::default()
//! };
//! assert!(cfg.validate().is_ok());
//! ```
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;

use crate::error::{FilterError, Result};
use crate::motion::DEFAULT_YAW_RATE_THRESHOLD;
use crate::particle::{ParticleAveragingStrategy, ParticleResamplingStrategy};

/// Number of particles used when none is configured.
pub const DEFAULT_NUM_PARTICLES: usize = 100;

fn default_num_particles() -> usize {
    DEFAULT_NUM_PARTICLES
}

fn default_yaw_rate_threshold() -> f64 {
    DEFAULT_YAW_RATE_THRESHOLD
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Population size. Fixed for the lifetime of the filter.
    #[serde(default = "default_num_particles")]
    pub num_particles: usize,

    /// Seed for the filter's random number generator.
    ///
    /// `None` seeds once from system entropy when the filter is constructed. Use a fixed seed to
    /// repeat runs exactly.
    #[serde(default)]
    pub seed: Option<u64>,

    /// Yaw rates with a smaller magnitude use the straight-line motion branch.
    #[serde(default = "default_yaw_rate_threshold")]
    pub yaw_rate_threshold: f64,

    #[serde(default)]
    pub resampling_strategy: ParticleResamplingStrategy,

    #[serde(default)]
    pub averaging_strategy: ParticleAveragingStrategy,

    /// Run the per-particle weight update on the rayon thread pool.
    #[serde(default)]
    pub parallel: bool,
}

impl Default for FilterConfig {
    fn default() -> Self {
        FilterConfig {
            num_particles: default_num_particles(),
            seed: None,
            yaw_rate_threshold: default_yaw_rate_threshold(),
            resampling_strategy: ParticleResamplingStrategy::default(),
            averaging_strategy: ParticleAveragingStrategy::default(),
            parallel: false,
        }
    }
}

impl FilterConfig {
    /// # Errors
    /// - [`FilterError::InvalidParticleCount`] when `num_particles` is zero.
    /// - [`FilterError::InvalidNoiseParameter`] when `yaw_rate_threshold` is negative or not finite.
    pub fn validate(&self) -> Result<()> {
        if self.num_particles == 0 {
            return Err(FilterError::InvalidParticleCount(self.num_particles));
        }
        if !(self.yaw_rate_threshold >= 0.0 && self.yaw_rate_threshold.is_finite()) {
            return Err(FilterError::InvalidNoiseParameter {
                name: "yaw_rate_threshold",
                value: self.yaw_rate_threshold,
            });
        }
        Ok(())
    }

    /// Render the configuration as text in `format`.
    pub fn to_string_as(&self, format: ConfigFormat) -> io::Result<String> {
        match format {
            ConfigFormat::Json => serde_json::to_string_pretty(self).map_err(io::Error::other),
            ConfigFormat::Yaml => serde_yaml::to_string(self).map_err(io::Error::other),
            ConfigFormat::Toml => toml::to_string(self).map_err(io::Error::other),
        }
    }

    /// Parse a configuration from text in `format`. Missing fields take their defaults.
    pub fn from_str_as(format: ConfigFormat, text: &str) -> io::Result<Self> {
        let config: FilterConfig = match format {
            ConfigFormat::Json => serde_json::from_str(text).map_err(io::Error::other)?,
            ConfigFormat::Yaml => serde_yaml::from_str(text).map_err(io::Error::other)?,
            ConfigFormat::Toml => toml::from_str(text).map_err(io::Error::other)?,
        };
        debug!("Loaded {:?} filter config: {:?}", format, config);
        Ok(config)
    }

    /// Write to `path`, choosing the format from its extension.
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let path = path.as_ref();
        let text = self.to_string_as(ConfigFormat::from_path(path)?)?;
        fs::write(path, text)
    }

    /// Read from `path`, choosing the format from its extension.
    pub fn from_file<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref();
        let format = ConfigFormat::from_path(path)?;
        Self::from_str_as(format, &fs::read_to_string(path)?)
    }
}

/// On-disk encodings understood by [`FilterConfig::to_file`] and [`FilterConfig::from_file`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Yaml,
    Toml,
}
impl ConfigFormat {
    /// `.json`, `.yaml` / `.yml` or `.toml`, case-insensitive.
    ///
    /// # Errors
    /// [`io::ErrorKind::InvalidInput`] for any other (or no) extension.
    pub fn from_path(path: &Path) -> io::Result<Self> {
        let extension = path
            .extension()
            .and_then(|s| s.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("json") => Ok(ConfigFormat::Json),
            Some("yaml") | Some("yml") => Ok(ConfigFormat::Yaml),
            Some("toml") => Ok(ConfigFormat::Toml),
            _ => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("unsupported config file extension: {}", path.display()),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn custom_config() -> FilterConfig {
        FilterConfig {
            num_particles: 250,
            seed: Some(9),
            yaw_rate_threshold: 1e-3,
            resampling_strategy: ParticleResamplingStrategy::Stratified,
            averaging_strategy: ParticleAveragingStrategy::WeightedAverage,
            parallel: true,
        }
    }

    #[test]
    fn default_config_is_valid() {
        let cfg = FilterConfig::default();
        assert_eq!(cfg.num_particles, 100);
        assert_eq!(cfg.resampling_strategy, ParticleResamplingStrategy::Multinomial);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn validate_rejects_bad_values() {
        let zero = FilterConfig {
            num_particles: 0,
            ..FilterConfig::default()
        };
        assert_eq!(zero.validate(), Err(FilterError::InvalidParticleCount(0)));

        let negative = FilterConfig {
            yaw_rate_threshold: -1.0,
            ..FilterConfig::default()
        };
        assert!(matches!(
            negative.validate(),
            Err(FilterError::InvalidNoiseParameter { name: "yaw_rate_threshold", .. })
        ));
    }

    #[test]
    fn file_formats_preserve_config() {
        let dir = tempdir().unwrap();
        let cfg = custom_config();
        for name in ["filter.json", "filter.yaml", "filter.toml"] {
            let path = dir.path().join(name);
            cfg.to_file(&path).unwrap();
            let read = FilterConfig::from_file(&path).unwrap();
            assert_eq!(read, cfg, "{name}");
        }
    }

    #[test]
    fn missing_fields_take_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("partial.toml");
        std::fs::write(&path, "num_particles = 42\n").unwrap();
        let cfg = FilterConfig::from_file(&path).unwrap();
        assert_eq!(cfg.num_particles, 42);
        assert_eq!(cfg.seed, None);
        assert_eq!(cfg.yaw_rate_threshold, DEFAULT_YAW_RATE_THRESHOLD);
        assert!(!cfg.parallel);
    }

    #[test]
    fn yaml_text_with_strategy_names() {
        let text = "num_particles: 64\nresampling_strategy: Residual\nparallel: true\n";
        let cfg = FilterConfig::from_str_as(ConfigFormat::Yaml, text).unwrap();
        assert_eq!(cfg.num_particles, 64);
        assert_eq!(cfg.resampling_strategy, ParticleResamplingStrategy::Residual);
        assert!(cfg.parallel);
        assert_eq!(cfg.averaging_strategy, ParticleAveragingStrategy::HighestWeight);
        assert!(FilterConfig::from_str_as(ConfigFormat::Json, "{ not json").is_err());
    }

    #[test]
    fn format_from_extension() {
        assert_eq!(ConfigFormat::from_path(Path::new("a.JSON")).unwrap(), ConfigFormat::Json);
        assert_eq!(ConfigFormat::from_path(Path::new("a.yml")).unwrap(), ConfigFormat::Yaml);
        assert_eq!(ConfigFormat::from_path(Path::new("a.toml")).unwrap(), ConfigFormat::Toml);
        assert!(ConfigFormat::from_path(Path::new("a")).is_err());
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("filter.ini");
        let err = custom_config().to_file(&path).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        assert!(FilterConfig::from_file(&path).is_err());
    }
}
