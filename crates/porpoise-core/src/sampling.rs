//! Bounded rejection sampling.
//!
//! Several stochastic draws in the step generator must satisfy hard bounds
//! that a normal distribution cannot guarantee. Every such loop runs behind
//! a fixed attempt budget with a deterministic fallback, so the simulation
//! can never hang on an unlucky stream, and the fallback path stays
//! observable to callers and tests.

use rand::Rng;

/// Attempt budget shared by the step generator's rejection loops.
pub const MAX_DRAWS: usize = 200;

/// Outcome of a bounded rejection-sampling loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sampled<T> {
    /// A draw satisfied the predicate within the attempt budget.
    Drawn(T),
    /// The budget ran out; the value is the deterministic fallback.
    FellBack(T),
}

impl<T> Sampled<T> {
    /// Unwrap the sampled or fallback value.
    pub fn into_value(self) -> T {
        match self {
            Self::Drawn(value) | Self::FellBack(value) => value,
        }
    }

    /// Whether the attempt budget was exhausted.
    #[must_use]
    pub const fn fell_back(&self) -> bool {
        matches!(self, Self::FellBack(_))
    }
}

/// Draw from `draw` until `accept` passes, at most `max_attempts` times.
/// On exhaustion the value produced by `fallback` applies; the fallback may
/// itself consume randomness (e.g. a uniform substitute draw).
pub fn sample_bounded<T, R, D, A, F>(
    rng: &mut R,
    max_attempts: usize,
    mut draw: D,
    accept: A,
    fallback: F,
) -> Sampled<T>
where
    R: Rng + ?Sized,
    D: FnMut(&mut R) -> T,
    A: Fn(&T) -> bool,
    F: FnOnce(&mut R) -> T,
{
    for _ in 0..max_attempts {
        let candidate = draw(rng);
        if accept(&candidate) {
            return Sampled::Drawn(candidate);
        }
    }
    Sampled::FellBack(fallback(rng))
}
