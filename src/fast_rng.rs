// Per-track random streams for reproducible multi-threaded sampling
//
// Photons of different tracks may be sampled on any worker thread in any
// order. Giving every track its own generator, seeded from the run seed and
// the track id, makes each track's photons independent of that scheduling.

use rand::{RngCore, SeedableRng};

/// LCG multiplier of the PCG reference generator
const PRN_MULT: u64 = 6364136223846793005;
/// LCG increment of the PCG reference generator
const PRN_ADD: u64 = 1442695040888963407;
/// Weyl increment used by SplitMix64 when deriving track seeds
const GOLDEN_GAMMA: u64 = 0x9E37_79B9_7F4A_7C15;

/// Small PCG (LCG + RXS-M-XS output) generator, one per track.
///
/// Eight bytes of state, so it is cheap to create one for every track a
/// worker picks up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TrackRng {
    state: u64,
}

impl TrackRng {
    #[inline]
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Stream for one track of a run. Different track ids give streams
    /// whose seeds are decorrelated through SplitMix64.
    pub fn for_track(run_seed: u64, track_id: u64) -> Self {
        let mixed = splitmix64(run_seed ^ splitmix64(track_id.wrapping_add(GOLDEN_GAMMA)));
        Self::new(mixed)
    }

    #[inline(always)]
    fn step(&mut self) -> u64 {
        self.state = PRN_MULT.wrapping_mul(self.state).wrapping_add(PRN_ADD);
        let word = ((self.state >> ((self.state >> 59) + 5)) ^ self.state)
            .wrapping_mul(12605985483714917081);
        (word >> 43) ^ word
    }

    /// Uniform f64 in [0, 1) from the top 53 bits.
    #[inline]
    pub fn uniform(&mut self) -> f64 {
        (self.step() >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }
}

#[inline]
fn splitmix64(mut z: u64) -> u64 {
    z = z.wrapping_add(GOLDEN_GAMMA);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

impl SeedableRng for TrackRng {
    type Seed = [u8; 8];

    fn from_seed(seed: Self::Seed) -> Self {
        Self::new(u64::from_le_bytes(seed))
    }

    fn seed_from_u64(state: u64) -> Self {
        Self::new(splitmix64(state))
    }
}

impl RngCore for TrackRng {
    #[inline(always)]
    fn next_u32(&mut self) -> u32 {
        (self.step() >> 32) as u32
    }

    #[inline(always)]
    fn next_u64(&mut self) -> u64 {
        self.step()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(8) {
            let bytes = self.step().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}
