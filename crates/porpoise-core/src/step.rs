//! Stochastic step generator.
//!
//! Produces the candidate `(turning angle, step length)` pair for one tick.
//! The correlated-random-walk draws reproduce the empirically fitted
//! autocorrelation structure: both the turning angle and the log step
//! length depend on the previous step, and the turning angle widens again
//! after short steps.

use crate::config::{BehaviorMode, SimulationConfig};
use crate::sampling::{MAX_DRAWS, sample_bounded};
use rand::Rng;
use rand_distr::{Distribution, Normal};
use tracing::debug;

const MARKOV_TURN_SD: f64 = 40.0;
const MARKOV_LOGMOV_MEAN: f64 = 0.5;
const MARKOV_LOGMOV_SD: f64 = 0.25;
/// Unsigned turns beyond this get the leptokurtic amplification.
const WIDE_TURN_THRESHOLD: f64 = 60.0;

/// Bias added to the previous angle, in its own direction, before the
/// autocorrelated draw.
const PREV_ANGLE_BIAS: f64 = 24.0;
const CRW_TURN_SD: f64 = 38.0;
const INFLATION_MEAN: f64 = 96.0;
const INFLATION_SD: f64 = 28.0;
/// Step length (grid units) at which the post-step angle inflation fades
/// out entirely.
const INFLATION_STEP_CEILING: f64 = 5.5;
const CRW_LOGMOV_MEAN: f64 = 0.42;
const CRW_LOGMOV_SD: f64 = 0.48;
/// Hard physiological ceiling on the log10 step length.
const MAX_STEP_FACTOR: f64 = 1.18;

/// Candidate step for one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProposedStep {
    /// Signed turning angle in degrees.
    pub turn_angle: f64,
    /// log10 of the step length in grid units.
    pub log_step: f64,
    /// Whether any rejection loop exhausted its budget this draw.
    pub fell_back: bool,
}

impl ProposedStep {
    /// Step length in grid units.
    #[must_use]
    pub fn step_length(&self) -> f64 {
        10f64.powf(self.log_step)
    }
}

/// Draws candidate steps for the active behavior mode.
#[derive(Debug, Clone)]
pub struct StepGenerator {
    corr_angle: f64,
    corr_logmov: f64,
    max_log_step: f64,
    markov_turn: Normal<f64>,
    markov_logmov: Normal<f64>,
    crw_turn_noise: Normal<f64>,
    inflation: Normal<f64>,
    crw_logmov_noise: Normal<f64>,
}

impl StepGenerator {
    /// Build a generator from the run configuration.
    #[must_use]
    pub fn new(config: &SimulationConfig) -> Self {
        Self {
            corr_angle: config.corr_angle,
            corr_logmov: config.corr_logmov,
            max_log_step: MAX_STEP_FACTOR.log10(),
            markov_turn: Normal::new(0.0, MARKOV_TURN_SD).expect("finite parameters"),
            markov_logmov: Normal::new(MARKOV_LOGMOV_MEAN, MARKOV_LOGMOV_SD)
                .expect("finite parameters"),
            crw_turn_noise: Normal::new(0.0, CRW_TURN_SD).expect("finite parameters"),
            inflation: Normal::new(INFLATION_MEAN, INFLATION_SD).expect("finite parameters"),
            crw_logmov_noise: Normal::new(CRW_LOGMOV_MEAN, CRW_LOGMOV_SD)
                .expect("finite parameters"),
        }
    }

    /// Draw the candidate step for one tick.
    pub fn propose<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        mode: BehaviorMode,
        prev_turn_angle: f64,
        prev_log_step: f64,
    ) -> ProposedStep {
        match mode {
            BehaviorMode::Markov => self.markov(rng),
            BehaviorMode::CorrelatedRandomWalk | BehaviorMode::MemoryAugmented => {
                self.correlated(rng, prev_turn_angle, prev_log_step)
            }
        }
    }

    fn markov<R: Rng + ?Sized>(&self, rng: &mut R) -> ProposedStep {
        let mut turn = self.markov_turn.sample(rng);
        if turn.abs() > WIDE_TURN_THRESHOLD {
            turn *= rng.random_range(1.0..1.5);
        }
        ProposedStep {
            turn_angle: turn,
            log_step: self.markov_logmov.sample(rng),
            fell_back: false,
        }
    }

    fn correlated<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        prev_turn_angle: f64,
        prev_log_step: f64,
    ) -> ProposedStep {
        let mut fell_back = false;

        // Autocorrelated base angle. The previous angle is biased outward
        // in its own direction before the negative correlation is applied.
        let biased = prev_turn_angle + PREV_ANGLE_BIAS * prev_turn_angle.signum();
        let mean = biased * -self.corr_angle;
        let base = sample_bounded(
            rng,
            MAX_DRAWS,
            |rng| mean + self.crw_turn_noise.sample(rng),
            |turn: &f64| turn.abs() <= 180.0,
            |_| 90f64.copysign(mean),
        );
        if base.fell_back() {
            debug!(mean, "turn draw exhausted its budget, forcing ±90°");
            fell_back = true;
        }
        let base = base.into_value();
        let sign = if base < 0.0 { -1.0 } else { 1.0 };
        let unsigned = base.abs();

        // Turning widens again after short steps; the inflation fades
        // linearly toward zero as the previous step approaches the ceiling.
        let prev_step = 10f64.powf(prev_log_step);
        let damp = (1.0 - prev_step / INFLATION_STEP_CEILING).max(0.0);
        let inflated = sample_bounded(
            rng,
            MAX_DRAWS,
            |rng| unsigned + self.inflation.sample(rng) * damp,
            |angle: &f64| *angle < 180.0,
            |rng| rng.random_range(90.0..110.0),
        );
        if inflated.fell_back() {
            debug!(unsigned, "angle inflation exhausted its budget");
            fell_back = true;
        }
        let turn_angle = inflated.into_value() * sign;

        let ceiling = self.max_log_step;
        let log_step = sample_bounded(
            rng,
            MAX_DRAWS,
            |rng| self.corr_logmov * prev_log_step + self.crw_logmov_noise.sample(rng),
            |log_step: &f64| *log_step <= ceiling,
            |_| ceiling,
        );
        if log_step.fell_back() {
            debug!(prev_log_step, "step-length draw exhausted its budget");
            fell_back = true;
        }

        ProposedStep {
            turn_angle,
            log_step: log_step.into_value(),
            fell_back,
        }
    }
}
