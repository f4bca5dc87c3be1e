//! Per-animal state.

use crate::memory::SpatialMemory;
use crate::Position;
use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

/// Initial log10 step length before the first correlated draw.
const INITIAL_LOG_STEP: f64 = 0.4;

/// Biometric priors (mean, sd) by sex; females run larger.
const FEMALE_LENGTH_CM: (f64, f64) = (160.0, 10.0);
const FEMALE_WEIGHT_KG: (f64, f64) = (55.0, 6.0);
const MALE_LENGTH_CM: (f64, f64) = (145.0, 10.0);
const MALE_WEIGHT_KG: (f64, f64) = (45.0, 5.0);

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Sex {
    Female,
    Male,
}

impl Sex {
    fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        if rng.random_bool(0.5) {
            Self::Female
        } else {
            Self::Male
        }
    }
}

/// One simulated animal, mutated in place every tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Porpoise {
    pub id: u32,
    pub population: String,
    pub sex: Sex,
    pub length_cm: f64,
    pub weight_kg: f64,
    /// Continuous position in grid units, never cell-quantized.
    pub position: Position,
    /// Compass heading in degrees, [0, 360).
    pub heading: f64,
    /// Turning angle realized on the previous tick, for autocorrelation.
    pub prev_turn_angle: f64,
    /// log10 step length drawn on the previous tick, for autocorrelation.
    pub prev_log_step: f64,
    pub memory: SpatialMemory,
}

impl Porpoise {
    /// Create an animal at `position` with randomized biometrics and
    /// heading. The caller records the initial memory visit once the food
    /// level at the spawn cell is known.
    pub fn spawn<R: Rng + ?Sized>(
        id: u32,
        population: &str,
        position: Position,
        memory_max: usize,
        rng: &mut R,
    ) -> Self {
        let sex = Sex::random(rng);
        let (length_prior, weight_prior) = match sex {
            Sex::Female => (FEMALE_LENGTH_CM, FEMALE_WEIGHT_KG),
            Sex::Male => (MALE_LENGTH_CM, MALE_WEIGHT_KG),
        };
        let length_cm = Normal::new(length_prior.0, length_prior.1)
            .expect("finite parameters")
            .sample(rng)
            .max(90.0);
        let weight_kg = Normal::new(weight_prior.0, weight_prior.1)
            .expect("finite parameters")
            .sample(rng)
            .max(15.0);
        Self {
            id,
            population: population.to_owned(),
            sex,
            length_cm,
            weight_kg,
            position,
            heading: rng.random_range(0.0..360.0),
            prev_turn_angle: 0.0,
            prev_log_step: INITIAL_LOG_STEP,
            memory: SpatialMemory::new(memory_max),
        }
    }
}
