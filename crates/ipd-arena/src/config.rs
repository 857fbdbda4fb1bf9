//! Tournament configuration

use ipd_match::{MatchSettings, NoiseConfig, PayoffMatrix};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Configuration for one tournament run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TournamentConfig {
    /// Rounds per trial
    pub rounds: u32,
    pub noise: NoiseConfig,
    pub payoff: PayoffMatrix,
    /// Base seed (None = draw one and record it in the report)
    pub seed: Option<u64>,
    /// Worker pool size (None = rayon's default)
    pub workers: Option<usize>,
}

impl Default for TournamentConfig {
    fn default() -> Self {
        Self {
            rounds: 100,
            noise: NoiseConfig::default(),
            payoff: PayoffMatrix::default(),
            seed: None,
            workers: None,
        }
    }
}

impl TournamentConfig {
    pub fn with_rounds(mut self, rounds: u32) -> Self {
        self.rounds = rounds;
        self
    }

    pub fn with_noise(mut self, noise: NoiseConfig) -> Self {
        self.noise = noise;
        self
    }

    pub fn with_payoff(mut self, payoff: PayoffMatrix) -> Self {
        self.payoff = payoff;
        self
    }

    /// Set random seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers);
        self
    }

    /// Parse and validate a JSON document. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: TournamentConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let level = self.noise.level;
        if !(0.0..=1.0).contains(&level) {
            return Err(ConfigError::NoiseLevel(level));
        }
        if self.noise.enabled && self.noise.trials == 0 {
            return Err(ConfigError::ZeroTrials);
        }
        if self.workers == Some(0) {
            return Err(ConfigError::ZeroWorkers);
        }
        Ok(())
    }

    /// Settings handed to every match
    pub fn match_settings(&self) -> MatchSettings {
        MatchSettings {
            rounds: self.rounds,
            payoff: self.payoff,
            noise: self.noise,
        }
    }
}
