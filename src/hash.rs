//! Perfect-hash search for the per-class mtbl lookup table (spec §4.4), used when the stolen-
//! field strategy isn't available (the host can't spare a field on every participating class).
//!
//! Grounded on `src/class/constants.rs`'s constant-pool slot search, which also walks increasing
//! table sizes looking for a collision-free placement. No dependency in this workspace provides a
//! PRNG, so multipliers are tried in a deterministic odd sequence (1, 3, 5, ...) rather than
//! drawn at random; this is still an exhaustive search of the same space, just enumerated instead
//! of sampled, and keeps the result reproducible across runs with the same class set.

use crate::class::ClassId;
use crate::error::UpdateError;

/// Attempts tried per table size before giving up and growing the table (spec §4.4).
pub const HASH_SEARCH_ATTEMPTS: u32 = 100_000;

/// A collision-free multiplicative hash from [`ClassId`] to a dense `0..size` bucket index.
#[derive(Debug, Clone, Copy)]
pub struct HashInfo {
    pub mult: u32,
    pub shift: u32,
    pub size: u32,
}

impl HashInfo {
    pub fn bucket(&self, id: ClassId) -> usize {
        // size == 1 (shift == 0) only arises from the empty-key trivial table; there's only one
        // bucket to land in, and `>> 32` on a u32 would panic.
        if self.shift == 0 {
            return 0;
        }
        ((id.0.wrapping_mul(self.mult)) >> (32 - self.shift)) as usize
    }
}

/// Searches for a collision-free `(mult, shift)` pair over `keys`, growing the table through
/// `room` 2..=6 extra address bits beyond the minimum power of two, as spec §4.4 prescribes.
pub fn search_perfect_hash(keys: &[ClassId]) -> Result<HashInfo, UpdateError> {
    if keys.is_empty() {
        return Ok(HashInfo { mult: 1, shift: 0, size: 1 });
    }
    let min_size = keys.len().next_power_of_two() as u32;

    for room in 2..=6u32 {
        let size = min_size << room;
        let shift = size.trailing_zeros();
        let mut seen = vec![false; size as usize];
        for attempt in 0..HASH_SEARCH_ATTEMPTS {
            let mult = 2 * attempt + 1;
            seen.iter_mut().for_each(|b| *b = false);
            let candidate = HashInfo { mult, shift, size };
            let mut collided = false;
            for &key in keys {
                let bucket = candidate.bucket(key);
                if seen[bucket] {
                    collided = true;
                    break;
                }
                seen[bucket] = true;
            }
            if !collided {
                return Ok(candidate);
            }
        }
    }

    Err(UpdateError::HashSearchFailed {
        attempts: HASH_SEARCH_ATTEMPTS * 5,
    })
}
