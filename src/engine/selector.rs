//! Weighted random selection over scored candidates.
//!
//! Scores are squared before sampling, which sharpens the distribution
//! toward high scorers while still leaving room for exploration. The random
//! source is injectable so selection is reproducible under test.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::error::{FretpathError, Result};

/// A source of uniform random numbers in `[0, 1)`.
pub trait RandomSource {
    /// Next number in `[0, 1)`.
    fn next_f64(&mut self) -> f64;
}

impl<F: FnMut() -> f64> RandomSource for F {
    fn next_f64(&mut self) -> f64 {
        self()
    }
}

/// Thread-local generator from `rand`. The default source.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn next_f64(&mut self) -> f64 {
        rand::thread_rng().gen::<f64>()
    }
}

/// Reproducible generator seeded from a `u64`.
#[derive(Debug, Clone)]
pub struct SeededRandom {
    rng: ChaCha8Rng,
}

impl SeededRandom {
    /// Create a generator from a seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

impl RandomSource for SeededRandom {
    fn next_f64(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }
}

/// Cycles through a fixed list of values. An empty list always yields 0.
#[derive(Debug, Clone, Default)]
pub struct FixedSequence {
    values: Vec<f64>,
    index: usize,
    calls: usize,
}

impl FixedSequence {
    /// Create a sequence over `values`.
    pub fn new(values: impl Into<Vec<f64>>) -> Self {
        Self {
            values: values.into(),
            index: 0,
            calls: 0,
        }
    }

    /// Number of values drawn so far.
    pub fn calls(&self) -> usize {
        self.calls
    }
}

impl RandomSource for FixedSequence {
    fn next_f64(&mut self) -> f64 {
        self.calls += 1;
        if self.values.is_empty() {
            return 0.0;
        }
        let value = self.values[self.index % self.values.len()];
        self.index = (self.index + 1) % self.values.len();
        value
    }
}

/// Always returns the same value.
#[derive(Debug, Clone, Copy)]
pub struct ConstantRandom(pub f64);

impl RandomSource for ConstantRandom {
    fn next_f64(&mut self) -> f64 {
        self.0
    }
}

/// Pick one item, with probability proportional to its squared score.
///
/// A single item is returned without drawing a random number. When every
/// score is zero the pick is uniform; otherwise zero-score items are never
/// chosen.
pub fn select<'a, T, R>(items: &'a [T], scores: &[f64], rng: &mut R) -> Result<&'a T>
where
    R: RandomSource + ?Sized,
{
    if items.is_empty() {
        return Err(FretpathError::EmptySelection);
    }
    if items.len() != scores.len() {
        return Err(FretpathError::invalid_input(format!(
            "{} items but {} scores",
            items.len(),
            scores.len()
        )));
    }
    if let Some(bad) = scores.iter().find(|s| !s.is_finite() || **s < 0.0) {
        return Err(FretpathError::invalid_input(format!(
            "scores must be finite and non-negative, got {}",
            bad
        )));
    }

    if items.len() == 1 {
        return Ok(&items[0]);
    }

    let squared: Vec<f64> = scores.iter().map(|s| s * s).collect();
    let total: f64 = squared.iter().sum();
    let r = unit(rng.next_f64());

    if total <= 0.0 {
        let index = ((r * items.len() as f64).floor() as usize).min(items.len() - 1);
        return Ok(&items[index]);
    }

    let target = r * total;
    let mut cumulative = 0.0;
    let mut last_positive = 0;
    for (index, weight) in squared.iter().enumerate() {
        if *weight <= 0.0 {
            continue;
        }
        cumulative += weight;
        last_positive = index;
        if cumulative >= target {
            return Ok(&items[index]);
        }
    }

    // Rounding left the target just above the final cumulative sum.
    Ok(&items[last_positive])
}

fn unit(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0 - f64::EPSILON)
    } else {
        0.0
    }
}
