use std::{fs, io, path::{Path, PathBuf}};

use serde::{Deserialize, Serialize};

use crate::board::MIN_GRID_SIZE;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path:?}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config file {path:?}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Hyper-parameters of a training run.
///
/// Missing fields in a config file fall back to [`TrainConfig::default`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    /// Board edge length.
    pub grid_size: usize,
    pub episodes: usize,
    /// Learning rate.
    pub alpha: f64,
    /// Discount factor.
    pub gamma: f64,
    pub epsilon_start: f64,
    /// Exploration floor.
    pub epsilon_end: f64,
    /// Multiplier applied to epsilon after every episode.
    pub epsilon_decay: f64,
    /// Step cap per episode, training and evaluation alike.
    pub max_steps: usize,
    /// Greedy evaluation episodes run after training.
    pub eval_runs: usize,
    /// Fixed seed; `None` draws one from OS entropy.
    pub seed: Option<u64>,
}

impl Default for TrainConfig {
    fn default() -> Self {
        TrainConfig {
            grid_size: 10,
            episodes: 20_000,
            alpha: 0.6,
            gamma: 0.85,
            epsilon_start: 0.9,
            epsilon_end: 0.001,
            epsilon_decay: 0.995,
            max_steps: 10_000,
            eval_runs: 5,
            seed: None,
        }
    }
}

impl TrainConfig {
    /// Reads a TOML config file and validates it.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: TrainConfig =
            toml::from_str(&contents).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field, reason: String| Err(ConfigError::Invalid { field, reason });

        if self.grid_size < MIN_GRID_SIZE {
            return invalid(
                "grid_size",
                format!("must be at least {MIN_GRID_SIZE}, got {}", self.grid_size),
            );
        }
        if self.episodes == 0 {
            return invalid("episodes", "must be positive".to_string());
        }
        if self.max_steps == 0 {
            return invalid("max_steps", "must be positive".to_string());
        }
        if !(self.alpha > 0.0 && self.alpha <= 1.0) {
            return invalid("alpha", format!("must be in (0, 1], got {}", self.alpha));
        }
        if !(0.0..=1.0).contains(&self.gamma) {
            return invalid("gamma", format!("must be in [0, 1], got {}", self.gamma));
        }
        let epsilons = [
            ("epsilon_start", self.epsilon_start),
            ("epsilon_end", self.epsilon_end),
        ];
        for (field, value) in epsilons {
            if !(0.0..=1.0).contains(&value) {
                return invalid(field, format!("must be in [0, 1], got {value}"));
            }
        }
        if self.epsilon_end > self.epsilon_start {
            return invalid(
                "epsilon_end",
                format!("{} exceeds epsilon_start {}", self.epsilon_end, self.epsilon_start),
            );
        }
        if !(self.epsilon_decay > 0.0 && self.epsilon_decay <= 1.0) {
            return invalid(
                "epsilon_decay",
                format!("must be in (0, 1], got {}", self.epsilon_decay),
            );
        }
        Ok(())
    }

    /// The seed to use: the configured one, or a fresh one from OS entropy.
    pub fn resolve_seed(&self) -> u64 {
        self.seed.unwrap_or_else(rand::random)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = TrainConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.grid_size, 10);
        assert_eq!(config.max_steps, 10_000);
        assert_eq!(config.epsilon_decay, 0.995);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: TrainConfig = toml::from_str("episodes = 50\nseed = 7\n").unwrap();
        assert_eq!(config.episodes, 50);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.alpha, TrainConfig::default().alpha);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let cases = [
            (
                "grid_size",
                TrainConfig {
                    grid_size: 2,
                    ..TrainConfig::default()
                },
            ),
            (
                "episodes",
                TrainConfig {
                    episodes: 0,
                    ..TrainConfig::default()
                },
            ),
            (
                "alpha",
                TrainConfig {
                    alpha: 0.0,
                    ..TrainConfig::default()
                },
            ),
            (
                "gamma",
                TrainConfig {
                    gamma: 1.5,
                    ..TrainConfig::default()
                },
            ),
            (
                "epsilon_start",
                TrainConfig {
                    epsilon_start: -0.1,
                    ..TrainConfig::default()
                },
            ),
            (
                "epsilon_end",
                TrainConfig {
                    epsilon_end: 0.95,
                    ..TrainConfig::default()
                },
            ),
            (
                "epsilon_decay",
                TrainConfig {
                    epsilon_decay: 1.2,
                    ..TrainConfig::default()
                },
            ),
        ];
        for (expected, config) in cases {
            match config.validate() {
                Err(ConfigError::Invalid { field, .. }) => assert_eq!(field, expected),
                other => panic!("expected {expected} to be rejected, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "grid_size = 8\nalpha = 0.3").unwrap();
        let config = TrainConfig::from_file(file.path()).unwrap();
        assert_eq!(config.grid_size, 8);
        assert_eq!(config.alpha, 0.3);
    }

    #[test]
    fn test_from_file_errors() {
        assert!(matches!(
            TrainConfig::from_file("does/not/exist.toml"),
            Err(ConfigError::Read { .. })
        ));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "grid_size = \"big\"").unwrap();
        assert!(matches!(
            TrainConfig::from_file(file.path()),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_resolve_seed_prefers_configured_seed() {
        let config = TrainConfig {
            seed: Some(42),
            ..TrainConfig::default()
        };
        assert_eq!(config.resolve_seed(), 42);
    }
}
