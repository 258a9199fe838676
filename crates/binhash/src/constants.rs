//! Compile-time sizing for the bucket grid.
//!
//! ## Grid sizing
//!
//! The bucket grid is `HASH_DIM^3` buckets. `HASH_DIM` is a power of two so
//! that masking a cell coordinate with `HASH_DIM - 1` keeps its low
//! `HASH_BITS` bits. Cells farther apart than `HASH_DIM` along an axis share
//! a bucket; consumers re-check true distance, so that aliasing only costs
//! extra candidates.

/// Default bucket-grid resolution per axis.
pub const HASH_DIM: u32 = 64;

/// Largest supported resolution: three 10-bit coordinates fill a 30-bit id.
pub const MAX_HASH_DIM: u32 = 1 << MAX_HASH_BITS;

/// Bits per coordinate at the largest supported resolution.
pub const MAX_HASH_BITS: u32 = 10;

/// Own cell plus 26 face/edge/corner neighbors.
pub const NEIGHBORHOOD_SIZE: usize = 27;

/// Slot of the `(0, 0, 0)` offset inside a neighborhood.
pub const SELF_SLOT: usize = 13;

/// End-of-list marker for bucket heads and particle `next` links.
pub const NO_PARTICLE: u32 = u32::MAX;

/// Minimum particles per rayon task during parallel insertion.
///
/// Insertion cost varies with bucket contention, so work is split into
/// small chunks and left to rayon's work stealing.
pub const INSERT_CHUNK: usize = 256;

/// Below this particle count the parallel build falls back to the serial one.
pub const MIN_PARALLEL_PARTICLES: usize = 2048;

/// Bits kept per coordinate for a given resolution.
pub const fn hash_bits(dim: u32) -> u32 {
    dim.trailing_zeros()
}

/// Number of buckets for a given resolution.
pub const fn hash_size(dim: u32) -> usize {
    (dim as usize) * (dim as usize) * (dim as usize)
}

/// Compile-time check on a bucket-grid resolution.
///
/// Referencing `ValidDim::<DIM>::OK` fails the build for a `DIM` that is not
/// a power of two or exceeds [`MAX_HASH_DIM`].
pub(crate) struct ValidDim<const DIM: u32>;

impl<const DIM: u32> ValidDim<DIM> {
    pub(crate) const OK: () = assert!(
        DIM.is_power_of_two() && DIM <= MAX_HASH_DIM,
        "HASH_DIM must be a power of two no larger than 1024"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_sizes() {
        assert!(HASH_DIM.is_power_of_two());
        assert!(HASH_DIM <= MAX_HASH_DIM);
        assert_eq!(hash_bits(HASH_DIM), 6);
        assert_eq!(hash_size(HASH_DIM), 64 * 64 * 64);
        assert_eq!(hash_size(8), 512);
    }
}
