//! Multi-stage land avoidance.
//!
//! A candidate step is accepted only if the whole path ahead stays in
//! water. Otherwise the engine climbs a strict escalation ladder: turn by
//! progressively sharper jittered angles toward the deeper side, then
//! retreat along the position history, and finally force-accept. Each
//! stage runs at most once per tick, so the ladder always terminates.

use crate::landscape::LandscapeGrid;
use crate::{Position, normalize_heading};
use ordered_float::OrderedFloat;
use rand::Rng;
use tracing::{debug, warn};

/// Spacing of the depth samples taken along a candidate path.
pub const PATH_SAMPLE_INTERVAL: f64 = 0.1;

/// Turn magnitudes tried in order, before jitter.
const ESCALATION_ANGLES: [f64; 3] = [40.0, 70.0, 120.0];
/// Uniform jitter added on top of each escalation angle.
const ESCALATION_JITTER: f64 = 10.0;
/// How many history entries the retreat stage may walk back through.
const HISTORY_RETREAT_LIMIT: usize = 20;

/// How a candidate step was made safe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AvoidanceOutcome {
    /// The path was clear as proposed.
    Clear,
    /// Turned by a (signed) escalation angle toward deeper water.
    Turned { angle: f64 },
    /// Teleported back along the position history.
    Retreated { steps_back: usize },
    /// Every stage failed; the step proceeds as proposed.
    ForcedAccept,
}

/// Validates candidate steps against the bathymetry.
#[derive(Debug, Clone, Copy)]
pub struct LandAvoidance {
    min_depth: f64,
}

impl LandAvoidance {
    /// Build an avoidance engine that requires `min_depth` of water at its
    /// escalation and retreat probes.
    #[must_use]
    pub const fn new(min_depth: f64) -> Self {
        Self { min_depth }
    }

    /// Whether every depth sample along the path is navigable water.
    #[must_use]
    pub fn path_is_clear(
        &self,
        grid: &LandscapeGrid,
        origin: Position,
        heading: f64,
        distance: f64,
    ) -> bool {
        let samples = (distance / PATH_SAMPLE_INTERVAL).ceil().max(1.0) as usize;
        for i in 0..=samples {
            let d = (i as f64 * PATH_SAMPLE_INTERVAL).min(distance);
            if !grid.is_water(grid.position_ahead(origin, heading, d, 0.0)) {
                return false;
            }
        }
        true
    }

    /// Validate a candidate step and escalate until it is safe. On retreat
    /// the position is teleported to the adopted history entry. Returns the
    /// resolved heading and the stage that produced it.
    pub fn resolve<R, I>(
        &self,
        rng: &mut R,
        grid: &LandscapeGrid,
        position: &mut Position,
        heading: f64,
        distance: f64,
        history: I,
    ) -> (f64, AvoidanceOutcome)
    where
        R: Rng + ?Sized,
        I: IntoIterator<Item = Position>,
    {
        if self.path_is_clear(grid, *position, heading, distance) {
            return (heading, AvoidanceOutcome::Clear);
        }

        for base in ESCALATION_ANGLES {
            let angle = base + rng.random_range(0.0..ESCALATION_JITTER);
            let right = grid.depth_at(grid.position_ahead(*position, heading, distance, angle));
            let left = grid.depth_at(grid.position_ahead(*position, heading, distance, -angle));
            let right_clear = right > self.min_depth;
            let left_clear = left > self.min_depth;
            if !right_clear && !left_clear {
                continue;
            }
            // turn toward the deeper side, or the only clear one
            let signed = if right_clear && (!left_clear || right >= left) {
                angle
            } else {
                -angle
            };
            debug!(angle = signed, "turned toward deeper water");
            return (
                normalize_heading(heading + signed),
                AvoidanceOutcome::Turned { angle: signed },
            );
        }

        for (index, past) in history.into_iter().take(HISTORY_RETREAT_LIMIT).enumerate() {
            let toward = grid.displacement(*position, past);
            let retreat_heading = if toward.length() > 1e-12 {
                toward.heading_deg()
            } else {
                heading
            };
            let forward = grid.depth_at(grid.position_ahead(past, retreat_heading, distance, 0.0));
            if forward > self.min_depth {
                debug!(steps_back = index + 1, "retreated along the position history");
                *position = past;
                return (
                    retreat_heading,
                    AvoidanceOutcome::Retreated {
                        steps_back: index + 1,
                    },
                );
            }
        }

        warn!("land avoidance exhausted every stage, forcing the step");
        (heading, AvoidanceOutcome::ForcedAccept)
    }

    /// Heading toward the center of the deepest 8-neighbor cell, if any
    /// neighbor has depth data at all. Used as the emergency override when
    /// angular escalation failed.
    #[must_use]
    pub fn deepest_neighbor_heading(
        &self,
        grid: &LandscapeGrid,
        position: Position,
    ) -> Option<f64> {
        let wrapped = grid.wrap_position(position);
        let cx = wrapped.x.floor() as i64;
        let cy = wrapped.y.floor() as i64;
        let mut best: Option<(OrderedFloat<f64>, Position)> = None;
        for dy in -1..=1_i64 {
            for dx in -1..=1_i64 {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let depth = grid.depth_at_cell(cx + dx, cy + dy);
                if depth.is_nan() {
                    continue;
                }
                let center =
                    Position::new((cx + dx) as f64 + 0.5, (cy + dy) as f64 + 0.5);
                if best.is_none_or(|(deepest, _)| OrderedFloat(depth) > deepest) {
                    best = Some((OrderedFloat(depth), center));
                }
            }
        }
        best.map(|(_, center)| grid.displacement(wrapped, center).heading_deg())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    /// Bounded grid, all water depth 10, land (`NaN`) where `x >= land_from`.
    fn coastline(land_from: usize) -> LandscapeGrid {
        let (width, height) = (40u32, 40u32);
        let mut depth = vec![10.0; (width * height) as usize];
        for y in 0..height as usize {
            for x in land_from..width as usize {
                depth[y * width as usize + x] = f64::NAN;
            }
        }
        LandscapeGrid::from_layers(width, height, false, depth, vec![0.0; (width * height) as usize], 1.0)
            .expect("grid")
    }

    /// All land except the cell at (5, 20) and a corridor y = 20, x in 10..30.
    fn pocket_with_corridor() -> LandscapeGrid {
        let (width, height) = (40u32, 40u32);
        let mut depth = vec![f64::NAN; (width * height) as usize];
        depth[20 * width as usize + 5] = 10.0;
        for x in 10..30 {
            depth[20 * width as usize + x] = 10.0;
        }
        LandscapeGrid::from_layers(width, height, false, depth, vec![0.0; (width * height) as usize], 1.0)
            .expect("grid")
    }

    #[test]
    fn clear_path_is_accepted_unchanged() {
        let grid = coastline(39);
        let avoidance = LandAvoidance::new(1.0);
        let mut rng = SmallRng::seed_from_u64(1);
        let mut position = Position::new(10.0, 10.0);
        let (heading, outcome) =
            avoidance.resolve(&mut rng, &grid, &mut position, 45.0, 2.0, std::iter::empty());
        assert_eq!(heading, 45.0);
        assert_eq!(outcome, AvoidanceOutcome::Clear);
        assert_eq!(position, Position::new(10.0, 10.0));
    }

    #[test]
    fn escalation_turns_away_from_a_coastline() {
        let grid = coastline(30);
        let avoidance = LandAvoidance::new(1.0);
        for seed in 0..100 {
            let mut rng = SmallRng::seed_from_u64(seed);
            let mut position = Position::new(29.5, 20.0);
            let (heading, outcome) = avoidance.resolve(
                &mut rng,
                &grid,
                &mut position,
                90.0,
                1.0,
                std::iter::empty(),
            );
            assert!(
                matches!(outcome, AvoidanceOutcome::Turned { .. }),
                "seed {seed}: expected an escalation turn, got {outcome:?}"
            );
            let destination = grid.position_ahead(position, heading, 1.0, 0.0);
            assert!(
                grid.is_water(destination),
                "seed {seed}: turned step still lands on land at {destination:?}"
            );
        }
    }

    #[test]
    fn blocked_pocket_retreats_along_history() {
        let grid = pocket_with_corridor();
        let avoidance = LandAvoidance::new(1.0);
        let mut rng = SmallRng::seed_from_u64(3);
        let mut position = Position::new(5.5, 20.5);
        let history = vec![Position::new(12.5, 20.5), Position::new(14.5, 20.5)];
        let (heading, outcome) = avoidance.resolve(
            &mut rng,
            &grid,
            &mut position,
            90.0,
            1.0,
            history.into_iter(),
        );
        assert_eq!(outcome, AvoidanceOutcome::Retreated { steps_back: 1 });
        assert_eq!(position, Position::new(12.5, 20.5));
        let destination = grid.position_ahead(position, heading, 1.0, 0.0);
        assert!(grid.is_water(destination));
    }

    #[test]
    fn exhausted_ladder_forces_the_step() {
        let grid = pocket_with_corridor();
        let avoidance = LandAvoidance::new(1.0);
        let mut rng = SmallRng::seed_from_u64(4);
        let mut position = Position::new(5.5, 20.5);
        let (heading, outcome) =
            avoidance.resolve(&mut rng, &grid, &mut position, 90.0, 1.0, std::iter::empty());
        assert_eq!(outcome, AvoidanceOutcome::ForcedAccept);
        assert_eq!(heading, 90.0);
    }

    #[test]
    fn deepest_neighbor_is_selected() {
        let (width, height) = (5u32, 5u32);
        let mut depth = vec![2.0; (width * height) as usize];
        depth[(3 * width + 2) as usize] = 25.0; // cell (2, 3), due north
        depth[(2 * width + 3) as usize] = f64::NAN;
        let grid = LandscapeGrid::from_layers(
            width,
            height,
            false,
            depth,
            vec![0.0; (width * height) as usize],
            1.0,
        )
        .expect("grid");

        let avoidance = LandAvoidance::new(1.0);
        let heading = avoidance
            .deepest_neighbor_heading(&grid, Position::new(2.5, 2.5))
            .expect("a neighbor has depth data");
        assert!(heading.abs() < 1e-9, "deepest neighbor sits due north");
    }

    #[test]
    fn all_land_neighbors_yield_no_override() {
        let grid = pocket_with_corridor();
        let avoidance = LandAvoidance::new(1.0);
        assert_eq!(
            avoidance.deepest_neighbor_heading(&grid, Position::new(5.5, 20.5)),
            None
        );
    }
}
