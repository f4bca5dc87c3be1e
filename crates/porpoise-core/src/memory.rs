//! Dual spatial memory: long-term attraction, short-term deterrence.
//!
//! Each animal remembers a bounded, most-recent-first sequence of visited
//! positions. Every entry carries the food utility observed there plus two
//! independently decaying strengths: the reference strength (how well the
//! utility is still recalled, drives attraction) and the working strength
//! (how recently the cell was depleted, drives deterrence). Keeping all
//! per-age values in one record makes misaligned histories impossible.

use crate::landscape::LandscapeGrid;
use crate::{Position, Vec2};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Strength assigned to the age-0 entry when a visit is recorded.
pub const SEED_STRENGTH: f64 = 0.999;

/// Distances below this are replaced by [`FAR_DISTANCE`] in the weighting,
/// so a just-left cell cannot blow up the attraction sum.
const NEAR_ZERO_DISTANCE: f64 = 1e-20;
const FAR_DISTANCE: f64 = 9999.0;

/// One remembered visit; index 0 in the history is "here" (age 0).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MemoryTrace {
    pub position: Position,
    pub stored_utility: f64,
    pub reference_strength: f64,
    pub working_strength: f64,
}

/// One logistic decay step: `m ← m − rate·(1−m)·m`.
///
/// For rates in (0, 1) this strictly decreases toward zero and never turns
/// negative.
#[must_use]
pub fn logistic_decay(value: f64, rate: f64) -> f64 {
    value - rate * (1.0 - value) * value
}

/// Attraction and deterrence pull computed from the memory history.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MemoryVectors {
    /// Pull toward remembered utility, already scaled by the calibration
    /// weight `B`.
    pub attraction: Vec2,
    /// Push away from recently depleted cells.
    pub deterrence: Vec2,
}

impl MemoryVectors {
    /// Net memory vector: attraction minus deterrence.
    #[must_use]
    pub fn net(&self) -> Vec2 {
        self.attraction - self.deterrence
    }
}

/// Bounded per-animal history of visited positions with decaying strengths.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpatialMemory {
    entries: VecDeque<MemoryTrace>,
    capacity: usize,
    working_updated: bool,
    expected_future_food: f64,
}

impl SpatialMemory {
    /// Create an empty history bounded at `capacity` entries.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(4096)),
            capacity,
            working_updated: false,
            expected_future_food: 0.0,
        }
    }

    /// Number of remembered entries (≤ capacity).
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries most-recent-first.
    pub fn entries(&self) -> impl Iterator<Item = &MemoryTrace> {
        self.entries.iter()
    }

    /// Remembered positions most-recent-first, age 0 included.
    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        self.entries.iter().map(|trace| trace.position)
    }

    /// Position of the age-0 entry: where the animal stood when the last
    /// visit was recorded.
    #[must_use]
    pub fn latest_position(&self) -> Option<Position> {
        self.entries.front().map(|trace| trace.position)
    }

    /// Decayed running estimate of recent foraging success.
    #[must_use]
    pub const fn expected_future_food(&self) -> f64 {
        self.expected_future_food
    }

    /// Re-arm the once-per-tick working-memory update.
    pub fn begin_tick(&mut self) {
        self.working_updated = false;
    }

    /// Decay every working strength once. Subsequent calls in the same tick
    /// are no-ops; two different callers may need the decayed values.
    pub fn update_working(&mut self, rate: f64) {
        if self.working_updated {
            return;
        }
        self.working_updated = true;
        for trace in &mut self.entries {
            trace.working_strength = logistic_decay(trace.working_strength, rate);
        }
    }

    /// Decay every reference strength once.
    pub fn decay_reference(&mut self, rate: f64) {
        for trace in &mut self.entries {
            trace.reference_strength = logistic_decay(trace.reference_strength, rate);
        }
    }

    /// Push the age-0 entry for this tick and discard entries beyond the
    /// capacity, oldest first. A `NaN` utility reads as zero.
    pub fn record_visit(&mut self, position: Position, utility: f64) {
        let stored_utility = if utility.is_nan() { 0.0 } else { utility };
        self.entries.push_front(MemoryTrace {
            position,
            stored_utility,
            reference_strength: SEED_STRENGTH,
            working_strength: SEED_STRENGTH,
        });
        self.entries.truncate(self.capacity);
        self.refresh_expected_food();
    }

    fn refresh_expected_food(&mut self) {
        self.expected_future_food = self
            .entries
            .iter()
            .map(|trace| trace.working_strength * trace.stored_utility)
            .sum();
    }

    /// Compute the attraction and deterrence vectors from every entry of
    /// age ≥ 1, as seen from `origin`. Displacements use the grid's
    /// half-extent wrap correction; the working strengths are decayed first
    /// (at most once per tick).
    pub fn navigation_vectors(
        &mut self,
        grid: &LandscapeGrid,
        origin: Position,
        b_weight: f64,
        inertia_constant: f64,
        work_mem_decay: f64,
    ) -> MemoryVectors {
        self.update_working(work_mem_decay);

        let mut attraction = Vec2::ZERO;
        let mut deterrence = Vec2::ZERO;
        for trace in self.entries.iter().skip(1) {
            let displacement = grid.displacement(origin, trace.position);
            let distance = displacement.length();
            let effective = if distance < NEAR_ZERO_DISTANCE {
                FAR_DISTANCE
            } else {
                distance
            };
            let unit = displacement.scaled(1.0 / effective);
            attraction +=
                unit.scaled(trace.stored_utility * trace.reference_strength / effective);
            deterrence += unit.scaled(inertia_constant * trace.working_strength);
        }
        MemoryVectors {
            attraction: attraction.scaled(b_weight),
            deterrence,
        }
    }
}
