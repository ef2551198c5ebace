//! ---
//! plc_section: "11-simulation"
//! plc_subsection: "module"
//! plc_type: "source"
//! plc_scope: "code"
//! plc_description: "Injectable randomness for measurement noise and physics."
//! plc_version: "v0.1.0"
//! plc_owner: "tbd"
//! ---
use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Source of uniformly distributed samples used by sensors and physics.
pub trait NoiseSource {
    /// Draw a sample from the inclusive range `[low, high]`.
    ///
    /// Implementations return `low` when the bounds are equal and treat
    /// swapped bounds as the same range.
    fn uniform(&mut self, low: f64, high: f64) -> f64;
}

impl<N: NoiseSource + ?Sized> NoiseSource for &mut N {
    fn uniform(&mut self, low: f64, high: f64) -> f64 {
        (**self).uniform(low, high)
    }
}

impl<N: NoiseSource + ?Sized> NoiseSource for Box<N> {
    fn uniform(&mut self, low: f64, high: f64) -> f64 {
        (**self).uniform(low, high)
    }
}

fn ordered(low: f64, high: f64) -> (f64, f64) {
    if low <= high {
        (low, high)
    } else {
        (high, low)
    }
}

/// Pseudo-random noise backed by [`StdRng`].
#[derive(Debug, Clone)]
pub struct SeededNoise {
    rng: StdRng,
}

impl SeededNoise {
    /// Reproducible stream for a given seed.
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Stream seeded from operating system entropy.
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }
}

impl NoiseSource for SeededNoise {
    fn uniform(&mut self, low: f64, high: f64) -> f64 {
        let (low, high) = ordered(low, high);
        if low == high {
            return low;
        }
        Uniform::new_inclusive(low, high).sample(&mut self.rng)
    }
}

/// Deterministic source that always returns the same relative position
/// within the requested range. `0.5` yields the midpoint, so measurement
/// noise in `[-0.5, 0.5]` collapses to zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedNoise {
    fraction: f64,
}

impl FixedNoise {
    pub fn new(fraction: f64) -> Self {
        Self {
            fraction: fraction.clamp(0.0, 1.0),
        }
    }

    pub fn midpoint() -> Self {
        Self::new(0.5)
    }

    pub fn fraction(&self) -> f64 {
        self.fraction
    }
}

impl Default for FixedNoise {
    fn default() -> Self {
        Self::midpoint()
    }
}

impl NoiseSource for FixedNoise {
    fn uniform(&mut self, low: f64, high: f64) -> f64 {
        let (low, high) = ordered(low, high);
        low + (high - low) * self.fraction
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_noise_is_reproducible() {
        let mut a = SeededNoise::from_seed(42);
        let mut b = SeededNoise::from_seed(42);
        for _ in 0..32 {
            assert_eq!(a.uniform(-0.5, 0.5), b.uniform(-0.5, 0.5));
        }
    }

    #[test]
    fn seeded_noise_stays_in_range() {
        let mut noise = SeededNoise::from_seed(7);
        for _ in 0..1_000 {
            let sample = noise.uniform(0.7, 1.0);
            assert!((0.7..=1.0).contains(&sample));
        }
    }

    #[test]
    fn degenerate_and_swapped_ranges() {
        let mut noise = SeededNoise::from_entropy();
        assert_eq!(noise.uniform(0.3, 0.3), 0.3);
        let swapped = noise.uniform(0.3, 0.2);
        assert!((0.2..=0.3).contains(&swapped));
    }

    #[test]
    fn fixed_noise_interpolates() {
        let mut mid = FixedNoise::midpoint();
        assert_eq!(mid.uniform(-0.5, 0.5), 0.0);
        let mut high = FixedNoise::new(4.0);
        assert_eq!(high.fraction(), 1.0);
        assert_eq!(high.uniform(0.7, 1.0), 1.0);
        let mut low = FixedNoise::new(0.0);
        assert_eq!(low.uniform(0.04, 0.05), 0.04);
    }

    #[test]
    fn boxed_sources_delegate() {
        let mut boxed: Box<dyn NoiseSource> = Box::new(FixedNoise::new(1.0));
        assert_eq!(boxed.uniform(0.0, 2.0), 2.0);
    }
}
