//! Deterministic roll streams keyed by entity and tick.
//!
//! Every probabilistic decision the engine makes draws from a stream derived
//! from `(seed, entity, tick, domain, salt)`, so a replay with the same inputs
//! reproduces the same outcomes regardless of how unrelated carriers are
//! interleaved.

use hmac::{Hmac, Mac};
use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::host::EntityId;
use crate::numbers::{clamp_probability, unit_to_index};

/// Source of roll streams for the engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Dice {
    /// Pseudo-random streams derived from a root seed.
    Seeded { seed: u64 },
    /// Every unit draw returns the given value. `0.0` makes every roll with a
    /// non-zero chance succeed; `1.0` makes every roll below certainty fail.
    Fixed { unit: f64 },
}

impl Dice {
    #[must_use]
    pub const fn seeded(seed: u64) -> Self {
        Self::Seeded { seed }
    }

    #[must_use]
    pub const fn fixed(unit: f64) -> Self {
        Self::Fixed { unit }
    }

    /// Derive the stream for one `(entity, tick, domain, salt)` tuple.
    #[must_use]
    pub fn stream(&self, entity: EntityId, tick: u64, domain: &str, salt: u64) -> RollStream {
        match *self {
            Self::Seeded { seed } => {
                let stream_seed = derive_stream_seed(seed, entity, tick, domain, salt);
                RollStream::Counting(CountingRng::new(stream_seed))
            }
            Self::Fixed { unit } => RollStream::Fixed {
                unit: clamp_probability(unit),
                draws: 0,
            },
        }
    }
}

impl Default for Dice {
    fn default() -> Self {
        Self::seeded(crate::constants::DEFAULT_SEED)
    }
}

fn derive_stream_seed(seed: u64, entity: EntityId, tick: u64, domain: &str, salt: u64) -> u64 {
    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(&seed.to_le_bytes()) else {
        return seed ^ entity.raw() ^ tick.rotate_left(17) ^ salt.rotate_left(33);
    };
    mac.update(&entity.raw().to_le_bytes());
    mac.update(&tick.to_le_bytes());
    mac.update(domain.as_bytes());
    mac.update(&salt.to_le_bytes());
    let digest = mac.finalize().into_bytes();
    let mut seed_bytes = [0_u8; 8];
    seed_bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(seed_bytes)
}

/// A single roll stream handed to one decision site.
#[derive(Debug, Clone)]
pub enum RollStream {
    Counting(CountingRng<ChaCha8Rng>),
    Fixed { unit: f64, draws: u64 },
}

impl RollStream {
    /// Uniform draw in `[0, 1)`.
    pub fn unit(&mut self) -> f64 {
        match self {
            Self::Counting(rng) => rng.gen_range(0.0..1.0),
            Self::Fixed { unit, draws } => {
                *draws = draws.saturating_add(1);
                *unit
            }
        }
    }

    /// Roll against a probability. `p <= 0` never succeeds, `p >= 1` always does.
    pub fn chance(&mut self, probability: f64) -> bool {
        if probability.is_nan() || probability <= 0.0 {
            return false;
        }
        if probability >= 1.0 {
            return true;
        }
        self.unit() < probability
    }

    /// Uniform index in `0..len`; `0` for an empty range.
    pub fn index(&mut self, len: usize) -> usize {
        if len <= 1 {
            return 0;
        }
        unit_to_index(self.unit(), len)
    }

    /// Number of draws taken from this stream.
    #[must_use]
    pub const fn draws(&self) -> u64 {
        match self {
            Self::Counting(rng) => rng.draws(),
            Self::Fixed { draws, .. } => *draws,
        }
    }
}

/// Counting wrapper for RNG streams providing instrumentation.
#[derive(Debug, Clone)]
pub struct CountingRng<R> {
    rng: R,
    draws: u64,
}

impl CountingRng<ChaCha8Rng> {
    fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            draws: 0,
        }
    }
}

impl<R: RngCore> CountingRng<R> {
    /// Number of draw calls performed against this stream.
    #[must_use]
    pub const fn draws(&self) -> u64 {
        self.draws
    }
}

impl<R: RngCore> RngCore for CountingRng<R> {
    fn next_u32(&mut self) -> u32 {
        self.draws = self.draws.saturating_add(1);
        self.rng.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.draws = self.draws.saturating_add(1);
        self.rng.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.draws = self.draws.saturating_add(1);
        self.rng.fill_bytes(dest);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.draws = self.draws.saturating_add(1);
        self.rng.try_fill_bytes(dest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_key_yields_same_sequence() {
        let dice = Dice::seeded(42);
        let mut a = dice.stream(EntityId::new(7), 3, "progression", 0);
        let mut b = dice.stream(EntityId::new(7), 3, "progression", 0);
        for _ in 0..16 {
            assert!((a.unit() - b.unit()).abs() < f64::EPSILON);
        }
        assert_eq!(a.draws(), b.draws());
    }

    #[test]
    fn different_ticks_diverge() {
        let dice = Dice::seeded(42);
        let mut a = dice.stream(EntityId::new(7), 3, "progression", 0);
        let mut b = dice.stream(EntityId::new(7), 4, "progression", 0);
        let left: Vec<f64> = (0..4).map(|_| a.unit()).collect();
        let right: Vec<f64> = (0..4).map(|_| b.unit()).collect();
        assert_ne!(left, right);
    }

    #[test]
    fn chance_edges_are_exact() {
        let mut stream = Dice::seeded(1).stream(EntityId::new(1), 0, "infect", 0);
        for _ in 0..64 {
            assert!(!stream.chance(0.0));
            assert!(stream.chance(1.0));
            assert!(!stream.chance(f64::NAN));
        }
    }

    #[test]
    fn fixed_dice_forces_outcomes() {
        let mut lucky = Dice::fixed(0.0).stream(EntityId::new(1), 0, "infect", 0);
        assert!(lucky.chance(0.01));
        assert!(!lucky.chance(0.0));
        let mut unlucky = Dice::fixed(1.0).stream(EntityId::new(1), 0, "infect", 0);
        assert!(!unlucky.chance(0.99));
        assert!(unlucky.chance(1.0));
        assert_eq!(unlucky.index(5), 4);
    }
}
