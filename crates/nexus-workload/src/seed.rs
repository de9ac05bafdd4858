//! Seed tokens and the deterministic step function.
//!
//! Every selection takes a [`Seed`] by value and hands back the seed it
//! finished on, so composed selections never share mutable state. The step
//! function is a SplitMix64 finalizer: it is total, has no fixed points worth
//! caring about, and is identical at every call site.

use std::fmt;

use rand::RngCore;

/// A 64-bit selection seed.
///
/// # Example
///
/// ```rust
/// use nexus_workload::seed::Seed;
///
/// let seed = Seed::new(42);
/// assert_eq!(seed.step(), Seed::new(42).step());
/// assert_ne!(seed.step(), seed);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct Seed(u64);

impl Seed {
    /// Creates a seed from a raw value.
    #[inline]
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Applies one deterministic transition.
    #[inline]
    #[must_use]
    pub const fn step(self) -> Self {
        Self(step(self.0))
    }

    /// Returns the seed `n` positions after this one, as used for per-row and
    /// per-request seeds (`base + index`).
    #[inline]
    #[must_use]
    pub const fn offset(self, n: u64) -> Self {
        Self(self.0.wrapping_add(n))
    }

    /// Steps once and reduces the result into `[0, bound)`.
    ///
    /// Returns the index together with the stepped seed. `bound` must be
    /// non-zero.
    #[inline]
    #[must_use]
    pub fn pick(self, bound: usize) -> (usize, Self) {
        debug_assert!(bound > 0);
        let next = self.step();
        #[allow(clippy::cast_possible_truncation)]
        let index = (next.0 % bound as u64) as usize;
        (index, next)
    }
}

impl fmt::Debug for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Seed({:#018x})", self.0)
    }
}

impl fmt::Display for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Seed {
    #[inline]
    fn from(value: u64) -> Self {
        Self::new(value)
    }
}

impl From<Seed> for u64 {
    #[inline]
    fn from(seed: Seed) -> Self {
        seed.0
    }
}

/// SplitMix64 transition.
#[inline]
#[must_use]
pub const fn step(seed: u64) -> u64 {
    let mut z = seed.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// A random source driven by repeated [`Seed::step`].
///
/// Lets the value generators use the `rand` distributions while keeping the
/// whole stream a pure function of the starting seed. [`SeedRng::seed`]
/// returns the seed the stream has reached.
#[derive(Debug, Clone)]
pub struct SeedRng {
    state: Seed,
}

impl SeedRng {
    /// Starts a stream at `seed`.
    #[must_use]
    pub const fn new(seed: Seed) -> Self {
        Self { state: seed }
    }

    /// Returns the seed reached so far.
    #[must_use]
    pub const fn seed(&self) -> Seed {
        self.state
    }
}

impl RngCore for SeedRng {
    fn next_u32(&mut self) -> u32 {
        #[allow(clippy::cast_possible_truncation)]
        let value = (self.next_u64() >> 32) as u32;
        value
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self.state.step();
        self.state.0
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(8) {
            let bytes = self.next_u64().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn test_step_is_deterministic() {
        let a: Vec<u64> = std::iter::successors(Some(Seed::new(7)), |s| Some(s.step()))
            .take(16)
            .map(Seed::as_u64)
            .collect();
        let b: Vec<u64> = std::iter::successors(Some(Seed::new(7)), |s| Some(s.step()))
            .take(16)
            .map(Seed::as_u64)
            .collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_zero_seed_moves() {
        assert_ne!(Seed::new(0).step(), Seed::new(0));
        assert_eq!(step(0), 0xE220_A839_7B1D_CDAF);
    }

    #[test]
    fn test_pick_in_bounds() {
        let mut seed = Seed::new(1);
        for _ in 0..1000 {
            let (index, next) = seed.pick(3);
            assert!(index < 3);
            seed = next;
        }
    }

    #[test]
    fn test_offset_wraps() {
        assert_eq!(Seed::new(u64::MAX).offset(2), Seed::new(1));
    }

    #[test]
    fn test_rng_tracks_seed() {
        let mut rng = SeedRng::new(Seed::new(99));
        let first = rng.next_u64();
        assert_eq!(first, Seed::new(99).step().as_u64());
        assert_eq!(rng.seed(), Seed::new(99).step());

        let mut again = SeedRng::new(Seed::new(99));
        let x: i64 = rng.gen();
        again.next_u64();
        let y: i64 = again.gen();
        assert_eq!(x, y);
    }

    #[test]
    fn test_fill_bytes_partial_chunk() {
        let mut rng = SeedRng::new(Seed::new(3));
        let mut buf = [0u8; 11];
        rng.fill_bytes(&mut buf);

        let mut check = SeedRng::new(Seed::new(3));
        let head = check.next_u64().to_le_bytes();
        assert_eq!(&buf[..8], &head);
    }
}
