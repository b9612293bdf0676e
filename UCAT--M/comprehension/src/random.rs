use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Source of uniform floats in `[0, 1)` driving every random choice in the engine.
pub trait RandomSource {
    /// Next float in `[0, 1)`.
    fn next_f64(&mut self) -> f64;
}

/// ChaCha-backed source; entropy-seeded in production, fixed seed for replays.
#[derive(Debug, Clone)]
pub struct SeededRandom {
    rng: ChaCha8Rng,
}

impl SeededRandom {
    /// Seeds from OS entropy.
    #[must_use]
    pub fn from_entropy() -> Self {
        Self {
            rng: ChaCha8Rng::from_entropy(),
        }
    }

    /// Deterministic source for a given seed.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

impl Default for SeededRandom {
    fn default() -> Self {
        Self::from_entropy()
    }
}

impl RandomSource for SeededRandom {
    fn next_f64(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }
}

/// Replays a fixed list of floats, wrapping around at the end.
#[derive(Debug, Clone)]
pub struct SequenceRandom {
    values: Vec<f64>,
    cursor: usize,
}

impl SequenceRandom {
    /// Cycles through `values`. Each value is clamped into `[0, 1)`.
    #[must_use]
    pub fn new(values: Vec<f64>) -> Self {
        let values = values
            .into_iter()
            .map(|value| value.clamp(0.0, 1.0 - f64::EPSILON))
            .collect();
        Self { values, cursor: 0 }
    }

    /// Always yields `value`.
    #[must_use]
    pub fn constant(value: f64) -> Self {
        Self::new(vec![value])
    }
}

impl RandomSource for SequenceRandom {
    fn next_f64(&mut self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        let value = self.values[self.cursor % self.values.len()];
        self.cursor = self.cursor.wrapping_add(1);
        value
    }
}

/// Index in `0..len` drawn from one float; `None` when `len` is zero.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn choose_index(len: usize, rng: &mut dyn RandomSource) -> Option<usize> {
    if len == 0 {
        return None;
    }
    let raw = (rng.next_f64() * len as f64).floor() as usize;
    Some(raw.min(len - 1))
}

/// In-place Fisher-Yates shuffle.
pub fn shuffle<T>(items: &mut [T], rng: &mut dyn RandomSource) {
    for i in (1..items.len()).rev() {
        if let Some(j) = choose_index(i + 1, rng) {
            items.swap(i, j);
        }
    }
}

/// Uniformly picks one element; `None` for an empty slice.
pub fn pick<'a, T>(items: &'a [T], rng: &mut dyn RandomSource) -> Option<&'a T> {
    choose_index(items.len(), rng).and_then(|idx| items.get(idx))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_sources_replay() {
        let mut a = SeededRandom::seeded(7);
        let mut b = SeededRandom::seeded(7);
        for _ in 0..16 {
            let value = a.next_f64();
            assert!((0.0..1.0).contains(&value));
            assert!((value - b.next_f64()).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn sequence_wraps_and_clamps() {
        let mut rng = SequenceRandom::new(vec![0.25, 2.0]);
        assert!((rng.next_f64() - 0.25).abs() < f64::EPSILON);
        assert!(rng.next_f64() < 1.0);
        assert!((rng.next_f64() - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn high_draws_keep_order() {
        let mut items = vec![1, 2, 3, 4, 5];
        shuffle(&mut items, &mut SequenceRandom::constant(0.99));
        assert_eq!(items, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn zero_draws_rotate() {
        let mut items = vec!['a', 'b', 'c'];
        shuffle(&mut items, &mut SequenceRandom::constant(0.0));
        assert_eq!(items, vec!['b', 'c', 'a']);
    }

    #[test]
    fn shuffle_is_a_permutation() {
        let mut items: Vec<u32> = (0..50).collect();
        shuffle(&mut items, &mut SeededRandom::seeded(3));
        let mut sorted = items.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn pick_bounds() {
        let empty: [u8; 0] = [];
        assert!(pick(&empty, &mut SequenceRandom::constant(0.5)).is_none());
        let items = ["x", "y", "z"];
        assert_eq!(pick(&items, &mut SequenceRandom::constant(0.0)), Some(&"x"));
        assert_eq!(pick(&items, &mut SequenceRandom::constant(0.99)), Some(&"z"));
    }
}
