//! Movement controller: the per-tick pipeline and run loop.
//!
//! Each tick every animal runs the same staged pipeline: generate a
//! candidate step, steer it around land, blend it with the memory vectors
//! (memory-augmented mode), commit the move, deplete the vacated cell, and
//! record the visit. After all animals have moved, the food field regrows
//! on its configured cadence.

use crate::agent::{Porpoise, Sex};
use crate::avoidance::{AvoidanceOutcome, LandAvoidance};
use crate::config::{ConfigError, SimulationConfig};
use crate::food::FoodDynamics;
use crate::landscape::LandscapeGrid;
use crate::step::StepGenerator;
use crate::{Position, Tick, Vec2, normalize_heading, normalize_turn};
use rand::Rng;
use rand::rngs::SmallRng;
use serde::Serialize;
use std::fmt;
use thiserror::Error;
use tracing::{error, info, warn};

/// Distance forced when the emergency deepest-neighbor override fires.
const EMERGENCY_STEP: f64 = 1.0;
/// Attempts made to find a navigable spawn cell per animal.
const SPAWN_ATTEMPTS: usize = 10_000;

/// Errors that abort a running simulation.
#[derive(Debug, Error, PartialEq)]
pub enum RunError {
    /// An animal ended on land with no viable recovery.
    #[error("animal {animal_id} stranded on land at ({x:.2}, {y:.2}) on tick {tick}")]
    NavigationFailure {
        animal_id: u32,
        tick: u64,
        x: f64,
        y: f64,
    },
}

/// One flat track row, written per animal per tick for downstream
/// calibration against telemetry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackRecord {
    pub tick: u64,
    pub animal_id: u32,
    pub population: String,
    pub sex: Sex,
    pub length_cm: f64,
    pub weight_kg: f64,
    pub x: f64,
    pub y: f64,
    pub depth: f64,
    pub elapsed_days: f64,
    pub ref_mem_decay: f64,
    pub work_mem_decay: f64,
    pub food_growth_rate: f64,
    pub max_food: f64,
}

/// Track sink invoked once per animal per tick.
pub trait TrackSink: Send {
    fn on_record(&mut self, record: &TrackRecord);
}

/// No-op track sink.
#[derive(Debug, Default)]
pub struct NullSink;

impl TrackSink for NullSink {
    fn on_record(&mut self, _record: &TrackRecord) {}
}

/// Events emitted after processing a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickEvents {
    pub tick: Tick,
    pub food_regrown: bool,
}

/// Counters accumulated across a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub ticks_completed: u64,
    pub records_emitted: u64,
    /// Step draws whose rejection loop exhausted its budget.
    pub fallback_draws: u64,
    /// Ticks on which land avoidance altered the proposed step.
    pub avoidance_interventions: u64,
    /// Committed moves reverted because the destination was land.
    pub rollbacks: u64,
}

/// Explicit simulation context: configuration, landscape, animals, RNG,
/// clock, and the track sink, all owned in one place.
pub struct Simulation {
    config: SimulationConfig,
    grid: LandscapeGrid,
    food: FoodDynamics,
    step_gen: StepGenerator,
    avoidance: LandAvoidance,
    agents: Vec<Porpoise>,
    rng: SmallRng,
    tick: Tick,
    sink: Box<dyn TrackSink>,
    stats: RunSummary,
}

impl fmt::Debug for Simulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Simulation")
            .field("tick", &self.tick)
            .field("animal_count", &self.agents.len())
            .field("grid", &(self.grid.width(), self.grid.height()))
            .finish()
    }
}

impl Simulation {
    /// Build a simulation that discards track records.
    pub fn new(config: SimulationConfig, grid: LandscapeGrid) -> Result<Self, ConfigError> {
        Self::with_sink(config, grid, Box::new(NullSink))
    }

    /// Build a simulation streaming track records into `sink`.
    pub fn with_sink(
        config: SimulationConfig,
        grid: LandscapeGrid,
        sink: Box<dyn TrackSink>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut rng = config.seeded_rng();
        let mut agents = Vec::with_capacity(config.animal_count);
        for id in 0..config.animal_count {
            let position = Self::spawn_position(&mut rng, &grid)
                .ok_or(ConfigError::Invalid("no navigable spawn cell found"))?;
            let mut animal =
                Porpoise::spawn(id as u32, &config.population, position, config.memory_max, &mut rng);
            animal.memory.record_visit(position, grid.food_level_at(position));
            agents.push(animal);
        }
        Ok(Self {
            food: FoodDynamics::from_config(&config),
            step_gen: StepGenerator::new(&config),
            avoidance: LandAvoidance::new(config.min_depth),
            config,
            grid,
            agents,
            rng,
            tick: Tick::zero(),
            sink,
            stats: RunSummary::default(),
        })
    }

    fn spawn_position(rng: &mut SmallRng, grid: &LandscapeGrid) -> Option<Position> {
        let (w, h) = (f64::from(grid.width()), f64::from(grid.height()));
        for _ in 0..SPAWN_ATTEMPTS {
            let candidate = Position::new(rng.random_range(0.0..w), rng.random_range(0.0..h));
            if grid.is_water(candidate) {
                return Some(candidate);
            }
        }
        None
    }

    /// Current simulation tick.
    #[must_use]
    pub const fn tick(&self) -> Tick {
        self.tick
    }

    /// Returns an immutable reference to the configuration.
    #[must_use]
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Immutable access to the landscape.
    #[must_use]
    pub fn grid(&self) -> &LandscapeGrid {
        &self.grid
    }

    /// Mutable access to the landscape (for scenario setup).
    #[must_use]
    pub fn grid_mut(&mut self) -> &mut LandscapeGrid {
        &mut self.grid
    }

    /// Immutable access to the animals.
    #[must_use]
    pub fn agents(&self) -> &[Porpoise] {
        &self.agents
    }

    /// Mutable access to the animals (for scenario setup).
    #[must_use]
    pub fn agents_mut(&mut self) -> &mut [Porpoise] {
        &mut self.agents
    }

    /// Counters accumulated so far.
    #[must_use]
    pub const fn summary(&self) -> RunSummary {
        self.stats
    }

    /// Replace the track sink.
    pub fn set_sink(&mut self, sink: Box<dyn TrackSink>) {
        self.sink = sink;
    }

    /// Execute one tick for every animal, then the periodic food sweep.
    pub fn step(&mut self) -> Result<TickEvents, RunError> {
        let next = self.tick.next();
        for idx in 0..self.agents.len() {
            self.step_agent(idx, next)?;
        }
        let food_regrown = self.food.due(next);
        if food_regrown {
            self.food.regrow(&mut self.grid);
        }
        self.tick = next;
        self.stats.ticks_completed = next.0;
        Ok(TickEvents {
            tick: next,
            food_regrown,
        })
    }

    /// Run until the configured tick budget is exhausted.
    pub fn run(&mut self) -> Result<RunSummary, RunError> {
        while self.tick.0 < self.config.tick_budget {
            self.step()?;
        }
        info!(
            ticks = self.stats.ticks_completed,
            records = self.stats.records_emitted,
            rollbacks = self.stats.rollbacks,
            "run complete",
        );
        Ok(self.stats)
    }

    fn step_agent(&mut self, idx: usize, tick: Tick) -> Result<(), RunError> {
        let mode = self.config.behavior_mode;
        let start_heading = self.agents[idx].heading;
        let start_position = self.agents[idx].position;
        let prev_turn = self.agents[idx].prev_turn_angle;
        let prev_log = self.agents[idx].prev_log_step;
        self.agents[idx].memory.begin_tick();

        // GenerateStep
        let proposed = self.step_gen.propose(&mut self.rng, mode, prev_turn, prev_log);
        if proposed.fell_back {
            self.stats.fallback_draws += 1;
        }
        let distance = proposed.step_length();
        let mut heading = normalize_heading(start_heading + proposed.turn_angle);
        let mut position = start_position;

        // ValidateLand
        let (resolved, outcome) = self.avoidance.resolve(
            &mut self.rng,
            &self.grid,
            &mut position,
            heading,
            distance,
            self.agents[idx].memory.positions().skip(1),
        );
        heading = resolved;
        if outcome != AvoidanceOutcome::Clear {
            self.stats.avoidance_interventions += 1;
        }

        // ApplyMemoryBlend: confidence in the walk grows with recent
        // foraging success.
        if mode.uses_memory_blend() {
            let vectors = self.agents[idx].memory.navigation_vectors(
                &self.grid,
                position,
                self.config.b_weight,
                self.config.inertia_constant,
                self.config.work_mem_decay,
            );
            let expected = self.agents[idx].memory.expected_future_food();
            let blend = self.config.inertia_constant + distance * expected;
            let combined = Vec2::from_heading(heading).scaled(blend) + vectors.net();
            if combined.length() > 1e-12 {
                heading = combined.heading_deg();
            }
        }

        // Commit, with the emergency override and rollback behind it
        let mut destination = self.grid.position_ahead(position, heading, distance, 0.0);
        if !self.grid.is_water(destination) {
            if let Some(escape) = self.avoidance.deepest_neighbor_heading(&self.grid, position) {
                heading = escape;
                destination = self.grid.position_ahead(position, heading, EMERGENCY_STEP, 0.0);
                self.stats.avoidance_interventions += 1;
            }
            if !self.grid.is_water(destination) {
                let rollback = self.agents[idx]
                    .memory
                    .latest_position()
                    .unwrap_or(start_position);
                self.stats.rollbacks += 1;
                warn!(
                    animal = self.agents[idx].id,
                    tick = tick.0,
                    "destination on land, rolling back",
                );
                destination = rollback;
                if !self.grid.is_water(destination) {
                    error!(
                        animal = self.agents[idx].id,
                        tick = tick.0,
                        "stranded with no viable recovery",
                    );
                    return Err(RunError::NavigationFailure {
                        animal_id: self.agents[idx].id,
                        tick: tick.0,
                        x: destination.x,
                        y: destination.y,
                    });
                }
            }
        }

        let realized_turn = normalize_turn(heading - start_heading);
        {
            let animal = &mut self.agents[idx];
            animal.position = destination;
            animal.heading = normalize_heading(heading);
            animal.prev_turn_angle = realized_turn;
            animal.prev_log_step = proposed.log_step;
        }

        // UpdateFood: the just-vacated cell is eaten down to the residual
        if let Some(vacated) = self.agents[idx].memory.latest_position() {
            self.food.deplete(&mut self.grid, vacated);
        }

        // UpdateMemory: decay both series, then push the age-0 entry
        let utility = self.grid.food_level_at(destination);
        {
            let work_rate = self.config.work_mem_decay;
            let ref_rate = self.config.ref_mem_decay;
            let animal = &mut self.agents[idx];
            animal.memory.update_working(work_rate);
            animal.memory.decay_reference(ref_rate);
            animal.memory.record_visit(destination, utility);
        }

        let record = {
            let animal = &self.agents[idx];
            TrackRecord {
                tick: tick.0,
                animal_id: animal.id,
                population: animal.population.clone(),
                sex: animal.sex,
                length_cm: animal.length_cm,
                weight_kg: animal.weight_kg,
                x: animal.position.x,
                y: animal.position.y,
                depth: self.grid.depth_at(animal.position),
                elapsed_days: tick.elapsed_days(),
                ref_mem_decay: self.config.ref_mem_decay,
                work_mem_decay: self.config.work_mem_decay,
                food_growth_rate: self.config.food_growth_rate,
                max_food: self.config.max_food,
            }
        };
        self.sink.on_record(&record);
        self.stats.records_emitted += 1;
        Ok(())
    }
}
