//! Z-order (Morton) curve encoding of bucket coordinates.
//!
//! Bits are interleaved as `...z1y1x1z0y0x0`, so cells that are close in
//! space get numerically close ids and bucket walks stay cache friendly.
//! Each coordinate holds at most 10 bits, giving ids below `2^30`.

use crate::constants::MAX_HASH_BITS;

const COORD_MASK: u32 = (1 << MAX_HASH_BITS) - 1;

/// Spread the low 10 bits of `v` so they occupy every third bit.
#[inline(always)]
fn spread_bits(v: u32) -> u32 {
    let mut x = v & COORD_MASK;
    x = (x | (x << 16)) & 0x0300_00ff;
    x = (x | (x << 8)) & 0x0300_f00f;
    x = (x | (x << 4)) & 0x030c_30c3;
    x = (x | (x << 2)) & 0x0924_9249;
    x
}

/// Inverse of [`spread_bits`].
#[inline(always)]
fn compact_bits(v: u32) -> u32 {
    let mut x = v & 0x0924_9249;
    x = (x ^ (x >> 2)) & 0x030c_30c3;
    x = (x ^ (x >> 4)) & 0x0300_f00f;
    x = (x ^ (x >> 8)) & 0xff00_00ff;
    x = (x ^ (x >> 16)) & COORD_MASK;
    x
}

/// Interleave three masked coordinates into one bucket id.
///
/// Callers mask each coordinate to `log2(HASH_DIM)` bits first; for
/// coordinates in `[0, HASH_DIM)` the result lies in `[0, HASH_DIM^3)`.
#[inline(always)]
pub fn encode(ix: u32, iy: u32, iz: u32) -> u32 {
    debug_assert!(ix <= COORD_MASK && iy <= COORD_MASK && iz <= COORD_MASK);
    spread_bits(ix) | (spread_bits(iy) << 1) | (spread_bits(iz) << 2)
}

/// Recover the coordinates interleaved by [`encode`].
#[inline]
pub fn decode(id: u32) -> (u32, u32, u32) {
    (compact_bits(id), compact_bits(id >> 1), compact_bits(id >> 2))
}
