//! Run configuration and validation.

use rand::SeedableRng;
use rand::rngs::SmallRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised when validating a run configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Indicates an invalid configuration value.
    #[error("invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Movement model driving each animal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum BehaviorMode {
    /// Independent draws each tick, no autocorrelation.
    Markov,
    /// Turning angle and step length correlated with the previous step.
    #[default]
    CorrelatedRandomWalk,
    /// Correlated random walk blended with spatial-memory attraction.
    MemoryAugmented,
}

impl BehaviorMode {
    /// Whether this mode reads the memory attraction/deterrence vectors.
    #[must_use]
    pub const fn uses_memory_blend(self) -> bool {
        matches!(self, Self::MemoryAugmented)
    }
}

/// Static configuration for a simulation run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimulationConfig {
    /// Population tag copied into every track record.
    pub population: String,
    /// Movement model for every animal in the run.
    pub behavior_mode: BehaviorMode,
    /// Number of simulated animals.
    pub animal_count: usize,
    /// Number of half-hour ticks before the run completes.
    pub tick_budget: u64,
    /// Optional RNG seed for reproducible runs.
    pub rng_seed: Option<u64>,
    /// Logistic decay rate of long-term (reference) memory strength.
    pub ref_mem_decay: f64,
    /// Logistic decay rate of short-term (working) memory strength.
    pub work_mem_decay: f64,
    /// Logistic regrowth rate of depleted food cells.
    pub food_growth_rate: f64,
    /// Ceiling on per-cell food level.
    pub max_food: f64,
    /// Baseline deterrence weight and memory-blend floor.
    pub inertia_constant: f64,
    /// Maximum number of remembered past positions per animal.
    pub memory_max: usize,
    /// Days between food regrowth sweeps.
    pub food_update_interval_days: u32,
    /// Calibration multiplier applied to the attraction vector.
    pub b_weight: f64,
    /// First-order autocorrelation coefficient for turning angles.
    pub corr_angle: f64,
    /// First-order autocorrelation coefficient for log step lengths.
    pub corr_logmov: f64,
    /// Minimum water depth (m) accepted by the land-avoidance probes.
    pub min_depth: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            population: "baseline".to_owned(),
            behavior_mode: BehaviorMode::default(),
            animal_count: 1,
            tick_budget: 15_000,
            rng_seed: None,
            ref_mem_decay: 0.10,
            work_mem_decay: 0.20,
            food_growth_rate: 0.10,
            max_food: 1.0,
            inertia_constant: 0.001,
            memory_max: 325,
            food_update_interval_days: 10,
            b_weight: 1.0,
            corr_angle: 0.26,
            corr_logmov: 0.94,
            min_depth: 1.0,
        }
    }
}

impl SimulationConfig {
    /// Validates the configuration before any simulation state is built.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.animal_count == 0 {
            return Err(ConfigError::Invalid("animal_count must be non-zero"));
        }
        if self.tick_budget == 0 {
            return Err(ConfigError::Invalid("tick_budget must be non-zero"));
        }
        if !(0.0..1.0).contains(&self.ref_mem_decay) || self.ref_mem_decay == 0.0 {
            return Err(ConfigError::Invalid("ref_mem_decay must be in (0, 1)"));
        }
        if !(0.0..1.0).contains(&self.work_mem_decay) || self.work_mem_decay == 0.0 {
            return Err(ConfigError::Invalid("work_mem_decay must be in (0, 1)"));
        }
        if self.food_growth_rate < 0.0 {
            return Err(ConfigError::Invalid("food_growth_rate must be non-negative"));
        }
        if self.max_food <= 0.0 {
            return Err(ConfigError::Invalid("max_food must be positive"));
        }
        if self.inertia_constant < 0.0 {
            return Err(ConfigError::Invalid("inertia_constant must be non-negative"));
        }
        if self.memory_max == 0 {
            return Err(ConfigError::Invalid("memory_max must be non-zero"));
        }
        if self.food_update_interval_days == 0 {
            return Err(ConfigError::Invalid(
                "food_update_interval_days must be non-zero",
            ));
        }
        if self.b_weight < 0.0 {
            return Err(ConfigError::Invalid("b_weight must be non-negative"));
        }
        if !(0.0..=1.0).contains(&self.corr_angle) {
            return Err(ConfigError::Invalid("corr_angle must be in [0, 1]"));
        }
        if !(0.0..=1.0).contains(&self.corr_logmov) {
            return Err(ConfigError::Invalid("corr_logmov must be in [0, 1]"));
        }
        if self.min_depth <= 0.0 {
            return Err(ConfigError::Invalid("min_depth must be positive"));
        }
        Ok(())
    }

    /// Returns the configured RNG, seeded from entropy if no seed is set.
    #[must_use]
    pub fn seeded_rng(&self) -> SmallRng {
        match self.rng_seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::seed_from_u64(rand::random()),
        }
    }
}
