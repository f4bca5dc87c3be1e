//! Core types and tick pipeline for the porpoise movement simulation.
//!
//! The engine advances one or more simulated harbor porpoises across a
//! bathymetric landscape in half-hour ticks. Each tick draws a stochastic
//! candidate step, steers it away from land, optionally blends it with
//! remembered foraging areas, commits the move, and updates the food field
//! and the animal's spatial memory.

pub mod agent;
pub mod avoidance;
pub mod config;
pub mod food;
pub mod landscape;
pub mod memory;
pub mod sampling;
pub mod simulation;
pub mod step;

pub use agent::{Porpoise, Sex};
pub use avoidance::{AvoidanceOutcome, LandAvoidance};
pub use config::{BehaviorMode, ConfigError, SimulationConfig};
pub use food::FoodDynamics;
pub use landscape::{LandscapeError, LandscapeGrid};
pub use memory::{MemoryTrace, MemoryVectors, SpatialMemory};
pub use sampling::{Sampled, sample_bounded};
pub use simulation::{
    NullSink, RunError, RunSummary, Simulation, TickEvents, TrackRecord, TrackSink,
};
pub use step::{ProposedStep, StepGenerator};

use serde::{Deserialize, Serialize};

/// High level simulation clock; one tick is half an hour of simulated time.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct Tick(pub u64);

/// Ticks per simulated day.
pub const TICKS_PER_DAY: u64 = 48;

impl Tick {
    /// Returns the next sequential tick.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// Resets the tick counter back to zero.
    #[must_use]
    pub const fn zero() -> Self {
        Self(0)
    }

    /// Elapsed simulated time in days.
    #[must_use]
    pub fn elapsed_days(self) -> f64 {
        self.0 as f64 / TICKS_PER_DAY as f64
    }
}

/// Continuous 2D position in grid units (one unit = one cell edge).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    /// Construct a new position.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Displacement vector in grid units.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    /// Construct a new vector.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Unit vector pointing along `heading_deg` (0 = north, clockwise).
    #[must_use]
    pub fn from_heading(heading_deg: f64) -> Self {
        let rad = heading_deg.to_radians();
        Self {
            x: rad.sin(),
            y: rad.cos(),
        }
    }

    /// Euclidean length.
    #[must_use]
    pub fn length(self) -> f64 {
        self.x.hypot(self.y)
    }

    /// Compass heading of the vector in degrees, normalized to [0, 360).
    ///
    /// Undefined for the zero vector; callers guard with [`Vec2::length`].
    #[must_use]
    pub fn heading_deg(self) -> f64 {
        normalize_heading(self.x.atan2(self.y).to_degrees())
    }

    /// Scale by a scalar.
    #[must_use]
    pub fn scaled(self, factor: f64) -> Self {
        Self {
            x: self.x * factor,
            y: self.y * factor,
        }
    }
}

impl std::ops::Add for Vec2 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

impl std::ops::Sub for Vec2 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}

impl std::ops::AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

/// Normalize a compass heading into [0, 360).
#[must_use]
pub fn normalize_heading(mut heading: f64) -> f64 {
    if heading.is_nan() {
        return 0.0;
    }
    heading = heading.rem_euclid(360.0);
    if heading >= 360.0 { 0.0 } else { heading }
}

/// Normalize a turning angle into (-180, 180].
#[must_use]
pub fn normalize_turn(mut angle: f64) -> f64 {
    if angle.is_nan() {
        return 0.0;
    }
    angle = angle.rem_euclid(360.0);
    if angle > 180.0 { angle - 360.0 } else { angle }
}
