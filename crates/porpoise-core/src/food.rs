//! Food-field dynamics: depletion on visit, periodic logistic regrowth.

use crate::config::SimulationConfig;
use crate::landscape::LandscapeGrid;
use crate::{Position, TICKS_PER_DAY, Tick};
use rayon::prelude::*;

/// Level a cell is reduced to when eaten, and the floor applied before
/// regrowth so depleted cells can never lock at zero.
pub const RESIDUAL_FOOD: f64 = 0.01;

/// Number of compounded half-hour sub-steps applied per regrowth sweep.
const GROWTH_SUBSTEPS: usize = 48;

/// Owns the growth and depletion rules layered on the landscape grid.
#[derive(Debug, Clone, Copy)]
pub struct FoodDynamics {
    growth_rate: f64,
    max_food: f64,
    interval_ticks: u64,
}

impl FoodDynamics {
    /// Build the dynamics with an update cadence expressed in days.
    #[must_use]
    pub fn new(growth_rate: f64, max_food: f64, interval_days: u32) -> Self {
        Self {
            growth_rate,
            max_food,
            interval_ticks: u64::from(interval_days) * TICKS_PER_DAY,
        }
    }

    /// Build the dynamics from the run configuration.
    #[must_use]
    pub fn from_config(config: &SimulationConfig) -> Self {
        Self::new(
            config.food_growth_rate,
            config.max_food,
            config.food_update_interval_days,
        )
    }

    /// Whether the regrowth sweep fires on this tick.
    #[must_use]
    pub fn due(&self, tick: Tick) -> bool {
        tick.0 > 0 && tick.0 % self.interval_ticks == 0
    }

    /// Eat the cell containing `position`: a positive level collapses to
    /// the residual in one visit. Returns the amount consumed.
    pub fn deplete(&self, grid: &mut LandscapeGrid, position: Position) -> f64 {
        let level = grid.food_level_at(position);
        if level > 0.0 {
            grid.set_food_level_at(position, RESIDUAL_FOOD);
            (level - RESIDUAL_FOOD).max(0.0)
        } else {
            0.0
        }
    }

    /// Regrow every depletable cell logistically toward the ceiling,
    /// compounding [`GROWTH_SUBSTEPS`] half-hour sub-steps. Pure per-cell
    /// map, so the sweep runs on the rayon pool.
    pub fn regrow(&self, grid: &mut LandscapeGrid) {
        if self.growth_rate <= 0.0 {
            return;
        }
        let rate = self.growth_rate;
        let ceiling = self.max_food;
        let (levels, probabilities) = grid.food_layers_mut();
        levels
            .par_iter_mut()
            .zip(probabilities.par_iter())
            .for_each(|(level, &probability)| {
                if probability.is_nan() || probability <= 0.0 {
                    return;
                }
                let mut value = level.max(RESIDUAL_FOOD);
                for _ in 0..GROWTH_SUBSTEPS {
                    value += rate * value * (1.0 - value / ceiling);
                }
                *level = value.min(ceiling);
            });
    }
}
