use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};

const RANK_STREAM_STRIDE: u64 = 0x9E37_79B9_7F4A_7C15;

/// Seedable random source owned by a system (one per rank on the worker side).
#[derive(Debug, Clone)]
pub struct SimRng {
    inner: StdRng,
}

impl SimRng {
    pub fn new(seed: u64) -> Self {
        Self {
            inner: StdRng::seed_from_u64(seed),
        }
    }

    /// Independent stream for `rank`, derived deterministically from `seed`.
    pub fn for_rank(seed: u64, rank: usize) -> Self {
        Self::new(seed.wrapping_add((rank as u64).wrapping_mul(RANK_STREAM_STRIDE)))
    }

    /// Uniform real in `[0, 1)`.
    pub fn uniform(&mut self) -> f64 {
        self.inner.r#gen()
    }
}

impl RngCore for SimRng {
    fn next_u32(&mut self) -> u32 {
        self.inner.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.inner.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.inner.fill_bytes(dest)
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.inner.try_fill_bytes(dest)
    }
}
